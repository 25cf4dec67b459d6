//! Core type system and error handling for ferrodt
//!
//! This crate provides the foundational types shared by the ferrodt
//! orchestration engine and its extensions. It includes:
//!
//! - **Error handling**: One error taxonomy with kinds for every failure class
//! - **Records**: The [`DataItem`] contract and its [`Value`] model
//! - **Settings**: The opaque [`SettingsBag`] handed to each extension call
//! - **Traits**: Source and sink extension contracts over lazy item streams
//!
//! # Examples
//!
//! ```rust
//! use ferrodt_types::{DataItem, MapDataItem, Result, SettingsBag, Value};
//!
//! fn example() -> Result<()> {
//!     let settings = SettingsBag::new().with("FilePath", "people.json");
//!     assert_eq!(settings.get_str("FilePath")?, Some("people.json"));
//!
//!     let item = MapDataItem::new().with_field("Name", "Chris");
//!     assert_eq!(item.value("Name"), Some(Value::from("Chris")));
//!     Ok(())
//! }
//! # example().unwrap();
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod result;
pub mod settings;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{Error, ErrorKind};
pub use result::Result;
pub use settings::SettingsBag;
pub use traits::*;
pub use types::*;
