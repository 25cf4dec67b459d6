//! Table-store entity mapping
//!
//! Table stores address every entity by a partition key and a row key and
//! reserve a handful of property names. This module turns arbitrary data items
//! into [`TableEntity`] values and decodes the sink settings that drive the
//! mapping.

mod entity;
mod settings;

pub use entity::{to_table_entity, TableEntity, RESERVED_PROPERTY_NAMES};
pub use settings::{PropertyRename, TableSinkSettings, WriteMode};
