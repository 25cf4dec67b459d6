//! Data item to table entity conversion

use ferrodt_types::{DataItem, Value};
use std::collections::BTreeMap;

/// Field holding the partition key when no override is configured
pub const DEFAULT_PARTITION_KEY_FIELD: &str = "PartitionKey";
/// Field holding the row key when no override is configured
pub const DEFAULT_ROW_KEY_FIELD: &str = "RowKey";

/// Property names a table store rejects unless renamed
pub const RESERVED_PROPERTY_NAMES: &[&str] = &["id", "etag", "rid", "ResourceId"];

/// An entity ready to be written to a table store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableEntity {
    /// Partition key, stringified from the source field
    pub partition_key: Option<String>,
    /// Row key, stringified from the source field
    pub row_key: Option<String>,
    /// Remaining properties, already renamed
    pub properties: BTreeMap<String, Value>,
}

impl TableEntity {
    /// Look up a property by exact name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// Check whether a property is present
    pub fn contains_key(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// Number of keys including the partition and row key when set
    pub fn key_count(&self) -> usize {
        self.properties.len()
            + usize::from(self.partition_key.is_some())
            + usize::from(self.row_key.is_some())
    }
}

impl DataItem for TableEntity {
    fn field_names(&self) -> Vec<String> {
        let keys = [
            self.partition_key.as_ref().map(|_| DEFAULT_PARTITION_KEY_FIELD),
            self.row_key.as_ref().map(|_| DEFAULT_ROW_KEY_FIELD),
        ];
        keys.into_iter()
            .flatten()
            .map(str::to_string)
            .chain(self.properties.keys().cloned())
            .collect()
    }

    fn value(&self, name: &str) -> Option<Value> {
        match name {
            DEFAULT_PARTITION_KEY_FIELD => self.partition_key.clone().map(Value::String),
            DEFAULT_ROW_KEY_FIELD => self.row_key.clone().map(Value::String),
            _ => self.properties.get(name).cloned(),
        }
    }
}

/// Map `item` onto a table entity
///
/// The key fields default to `PartitionKey` and `RowKey`; blank overrides fall
/// back to them. Field names are compared ignoring ASCII case. `renames` maps
/// source field names (any case) to target names; reserved names without a
/// rename are dropped.
pub fn to_table_entity(
    item: &dyn DataItem,
    partition_key_field: Option<&str>,
    row_key_field: Option<&str>,
    renames: &BTreeMap<String, String>,
) -> TableEntity {
    let partition_key_field = non_blank(partition_key_field).unwrap_or(DEFAULT_PARTITION_KEY_FIELD);
    let row_key_field = non_blank(row_key_field).unwrap_or(DEFAULT_ROW_KEY_FIELD);

    let mut entity = TableEntity::default();
    for name in item.field_names() {
        let value = item.value(&name);
        if name.eq_ignore_ascii_case(partition_key_field) {
            entity.partition_key = value.and_then(key_string);
        } else if name.eq_ignore_ascii_case(row_key_field) {
            entity.row_key = value.and_then(key_string);
        } else if let Some(target) = target_name(&name, renames) {
            entity
                .properties
                .insert(target.to_string(), value.unwrap_or_default());
        }
    }
    entity
}

fn target_name<'a>(name: &'a str, renames: &'a BTreeMap<String, String>) -> Option<&'a str> {
    let renamed = renames
        .iter()
        .find(|(from, to)| from.eq_ignore_ascii_case(name) && !to.trim().is_empty())
        .map(|(_, to)| to.as_str());

    match renamed {
        Some(to) => Some(to),
        None if is_reserved(name) => None,
        None => Some(name),
    }
}

fn is_reserved(name: &str) -> bool {
    RESERVED_PROPERTY_NAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(name))
}

fn key_string(value: Value) -> Option<String> {
    (!value.is_null()).then(|| value.to_string())
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.trim().is_empty())
}
