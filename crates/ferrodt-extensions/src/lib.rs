//! Built-in extensions for ferrodt
//!
//! - [`json`]: reads and writes JSON array or newline-delimited JSON files
//! - [`table`]: maps data items onto table-store entities
//!
//! [`register_builtins`] adds every built-in source and sink to a registry.

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod json;
pub mod table;

pub use json::{JsonFormat, JsonSink, JsonSinkSettings, JsonSource, JsonSourceSettings};
pub use table::{to_table_entity, PropertyRename, TableEntity, TableSinkSettings, WriteMode};

use ferrodt_engine::ExtensionRegistry;
use ferrodt_types::Result;
use std::sync::Arc;

/// Register every built-in extension
pub fn register_builtins(registry: &mut ExtensionRegistry) -> Result<()> {
    registry.register_source(Arc::new(JsonSource))?;
    registry.register_sink(Arc::new(JsonSink))?;
    Ok(())
}

/// Registry holding only the built-in extensions
pub fn builtin_registry() -> Result<ExtensionRegistry> {
    let mut registry = ExtensionRegistry::new();
    register_builtins(&mut registry)?;
    Ok(registry)
}
