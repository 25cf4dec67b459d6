//! Table sink settings
//!
//! Only the key and rename settings feed [`to_table_entity`](super::to_table_entity).
//! `MaxConcurrentEntityWrites` and `WriteMode` are decoded and validated here
//! for a table-store sink built on this crate; nothing in this crate writes to
//! a table store, so they are not read here.

use ferrodt_types::{Error, Result, SettingsBag};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// How entities are written when one with the same keys already exists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteMode {
    /// Insert only; an existing entity is an error
    #[default]
    Create,
    /// Upsert, replacing the existing entity
    Replace,
    /// Upsert, merging properties into the existing entity
    Merge,
}

impl FromStr for WriteMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "create" => Ok(Self::Create),
            "replace" => Ok(Self::Replace),
            "merge" => Ok(Self::Merge),
            other => Err(Error::config(format!(
                "Unknown write mode '{other}', expected Create, Replace or Merge"
            ))),
        }
    }
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "Create"),
            Self::Replace => write!(f, "Replace"),
            Self::Merge => write!(f, "Merge"),
        }
    }
}

/// One source property written under a different name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyRename {
    /// Source property name, matched ignoring case
    #[serde(rename = "From", alias = "from", default)]
    pub from: Option<String>,
    /// Target property name
    #[serde(rename = "To", alias = "to", default)]
    pub to: Option<String>,
}

/// Settings of a table-store sink
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSinkSettings {
    /// Upper bound on concurrent entity writes
    pub max_concurrent_entity_writes: Option<usize>,
    /// Behaviour for existing entities
    pub write_mode: WriteMode,
    /// Deprecated single rename for `id`
    pub id_property_rename: Option<String>,
    /// Property renames
    pub property_renames: Vec<PropertyRename>,
    /// Field holding the partition key
    pub partition_key_field_name: Option<String>,
    /// Field holding the row key
    pub row_key_field_name: Option<String>,
}

impl TableSinkSettings {
    /// Decode from a settings bag
    pub fn from_settings(settings: &SettingsBag) -> Result<Self> {
        let max_concurrent_entity_writes = match settings.get_i64("MaxConcurrentEntityWrites")? {
            None => None,
            Some(n) if n > 0 => Some(n as usize),
            Some(n) => {
                return Err(Error::config(format!(
                    "Setting 'MaxConcurrentEntityWrites' must be positive, found {n}"
                )))
            }
        };

        Ok(Self {
            max_concurrent_entity_writes,
            write_mode: settings
                .get_non_blank_str("WriteMode")?
                .map(str::parse::<WriteMode>)
                .transpose()?
                .unwrap_or_default(),
            id_property_rename: owned(settings.get_non_blank_str("IdPropertyRename")?),
            property_renames: settings
                .get_as::<Vec<PropertyRename>>("PropertyRenames")?
                .unwrap_or_default(),
            partition_key_field_name: owned(settings.get_non_blank_str("PartitionKeyFieldName")?),
            row_key_field_name: owned(settings.get_non_blank_str("RowKeyFieldName")?),
        })
    }

    /// Effective renames keyed by source name
    ///
    /// `PropertyRenames` entries win over `IdPropertyRename` for `id`; entries
    /// with a blank side are ignored.
    pub fn property_renames(&self) -> BTreeMap<String, String> {
        let mut renames = BTreeMap::new();

        if let Some(to) = &self.id_property_rename {
            renames.insert("id".to_string(), to.clone());
        }

        for rename in &self.property_renames {
            let (Some(from), Some(to)) = (owned(rename.from.as_deref()), owned(rename.to.as_deref())) else {
                continue;
            };
            renames.retain(|existing: &String, _| !existing.eq_ignore_ascii_case(&from));
            renames.insert(from, to);
        }

        renames
    }
}

fn owned(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
