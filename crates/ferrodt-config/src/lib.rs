//! Configuration model and loading for ferrodt
//!
//! A transfer run is described by one hierarchical configuration document:
//!
//! ```json
//! {
//!   "Source": "Json",
//!   "Sink": "Json",
//!   "SourceSettings": { "FilePath": "file-in.json" },
//!   "Operations": [
//!     { "SinkSettings": { "FilePath": "file-out.json" } },
//!     { "SinkSettings": { "FilePath": "file2.json" } }
//!   ]
//! }
//! ```
//!
//! [`RunConfig`] is the typed view over that document. It performs structural
//! binding only: values that are not configured stay `None` so that the
//! operation planner can tell "not configured" apart from "configured but
//! empty". Documents are loaded through [`ConfigBuilder`] (settings file,
//! environment variables, command line overrides) or [`ConfigLoader`].
//!
//! # Examples
//!
//! ```rust
//! use ferrodt_config::RunConfig;
//! use serde_json::json;
//!
//! let config = RunConfig::from_value(json!({
//!     "Source": "Json",
//!     "Sink": "Json",
//!     "SinkSettings": { "FilePath": "out.json" }
//! }))
//! .expect("valid configuration");
//!
//! assert_eq!(config.source.as_deref(), Some("Json"));
//! assert!(config.source_settings.is_none());
//! assert!(config.operations.is_none());
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use ferrodt_types::SettingsBag;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

pub mod builder;
pub mod error;
pub mod loader;

pub use builder::ConfigBuilder;
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;

/// Root key naming the source extension
pub const SOURCE_KEY: &str = "Source";
/// Root key naming the sink extension
pub const SINK_KEY: &str = "Sink";
/// Section holding source settings
pub const SOURCE_SETTINGS_KEY: &str = "SourceSettings";
/// Section holding sink settings
pub const SINK_SETTINGS_KEY: &str = "SinkSettings";
/// Sequence of per-operation overrides
pub const OPERATIONS_KEY: &str = "Operations";

/// Typed view over a run configuration document
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunConfig {
    /// Display name of the source extension
    #[serde(rename = "Source", skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Display name of the sink extension
    #[serde(rename = "Sink", skip_serializing_if = "Option::is_none")]
    pub sink: Option<String>,
    /// Global source settings
    #[serde(rename = "SourceSettings", skip_serializing_if = "Option::is_none")]
    pub source_settings: Option<SettingsBag>,
    /// Global sink settings
    #[serde(rename = "SinkSettings", skip_serializing_if = "Option::is_none")]
    pub sink_settings: Option<SettingsBag>,
    /// Ordered per-operation overrides
    #[serde(rename = "Operations", skip_serializing_if = "Option::is_none")]
    pub operations: Option<Vec<OperationConfig>>,
}

/// Settings overrides for one operation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OperationConfig {
    /// Source settings replacing the global ones for this operation
    #[serde(rename = "SourceSettings", skip_serializing_if = "Option::is_none")]
    pub source_settings: Option<SettingsBag>,
    /// Sink settings replacing the global ones for this operation
    #[serde(rename = "SinkSettings", skip_serializing_if = "Option::is_none")]
    pub sink_settings: Option<SettingsBag>,
}

impl RunConfig {
    /// Bind a configuration tree
    ///
    /// Keys are matched ignoring ASCII case. A `null` document binds to an
    /// empty configuration.
    pub fn from_value(value: JsonValue) -> ConfigResult<Self> {
        let root = match fold_key_case(value) {
            JsonValue::Object(map) => map,
            JsonValue::Null => Map::new(),
            _ => {
                return Err(ConfigError::invalid_value(
                    "<root>",
                    "configuration document must be a section",
                ))
            }
        };

        let operations = match lookup(&root, OPERATIONS_KEY) {
            None | Some(JsonValue::Null) => None,
            Some(value) => Some(
                sequence_entries(value)?
                    .into_iter()
                    .enumerate()
                    .map(|(index, entry)| OperationConfig::from_entry(index, entry))
                    .collect::<ConfigResult<Vec<_>>>()?,
            ),
        };

        Ok(Self {
            source: bind_name(&root, SOURCE_KEY)?,
            sink: bind_name(&root, SINK_KEY)?,
            source_settings: bind_settings(&root, SOURCE_SETTINGS_KEY, SOURCE_SETTINGS_KEY)?,
            sink_settings: bind_settings(&root, SINK_SETTINGS_KEY, SINK_SETTINGS_KEY)?,
            operations,
        })
    }

    /// Number of operations the run will execute
    pub fn operation_count(&self) -> usize {
        self.operations.as_ref().map_or(0, Vec::len).max(1)
    }
}

impl OperationConfig {
    fn from_entry(index: usize, entry: JsonValue) -> ConfigResult<Self> {
        let map = match entry {
            JsonValue::Object(map) => map,
            JsonValue::Null => Map::new(),
            _ => {
                return Err(ConfigError::invalid_value(
                    format!("{OPERATIONS_KEY}:{index}"),
                    "operation entry must be a section",
                ))
            }
        };

        Ok(Self {
            source_settings: bind_settings(
                &map,
                SOURCE_SETTINGS_KEY,
                &format!("{OPERATIONS_KEY}:{index}:{SOURCE_SETTINGS_KEY}"),
            )?,
            sink_settings: bind_settings(
                &map,
                SINK_SETTINGS_KEY,
                &format!("{OPERATIONS_KEY}:{index}:{SINK_SETTINGS_KEY}"),
            )?,
        })
    }
}

fn lookup<'a>(map: &'a Map<String, JsonValue>, key: &str) -> Option<&'a JsonValue> {
    map.get(key).or_else(|| {
        map.iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(key))
            .map(|(_, value)| value)
    })
}

fn bind_name(map: &Map<String, JsonValue>, key: &str) -> ConfigResult<Option<String>> {
    match lookup(map, key) {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::String(name)) => Ok(Some(name.clone())),
        Some(_) => Err(ConfigError::invalid_value(
            key,
            "extension name must be a string",
        )),
    }
}

fn bind_settings(
    map: &Map<String, JsonValue>,
    key: &str,
    path: &str,
) -> ConfigResult<Option<SettingsBag>> {
    match lookup(map, key) {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::Object(section)) => Ok(Some(SettingsBag::from(section.clone()))),
        // An empty section read from a flat key/value source arrives as ""
        Some(JsonValue::String(value)) if value.is_empty() => Ok(Some(SettingsBag::new())),
        Some(_) => Err(ConfigError::invalid_value(path, "settings must be a section")),
    }
}

/// Accept a real sequence or a section keyed by indices (`Operations:0:...`)
fn sequence_entries(value: &JsonValue) -> ConfigResult<Vec<JsonValue>> {
    match value {
        JsonValue::Array(entries) => Ok(entries.clone()),
        JsonValue::Object(section) => {
            let mut indexed = section
                .iter()
                .map(|(key, entry)| {
                    key.parse::<usize>()
                        .map(|index| (index, entry.clone()))
                        .map_err(|_| {
                            ConfigError::invalid_value(
                                format!("{OPERATIONS_KEY}:{key}"),
                                "operation keys must be indices",
                            )
                        })
                })
                .collect::<ConfigResult<Vec<_>>>()?;
            indexed.sort_by_key(|(index, _)| *index);
            Ok(indexed.into_iter().map(|(_, entry)| entry).collect())
        }
        _ => Err(ConfigError::invalid_value(
            OPERATIONS_KEY,
            "operations must be a sequence",
        )),
    }
}

/// Merge keys that differ only by ASCII case.
///
/// Environment-derived keys arrive lowercased from the `config` crate and
/// override keys spelled differently by a settings file; sections are merged
/// recursively, other values are replaced. The first spelling seen is kept.
fn fold_key_case(value: JsonValue) -> JsonValue {
    match value {
        JsonValue::Object(map) => {
            let (lowercase, mixed): (Vec<_>, Vec<_>) = map
                .into_iter()
                .partition(|(key, _)| *key == key.to_ascii_lowercase());

            let mut folded = Map::new();
            for (key, value) in mixed.into_iter().chain(lowercase) {
                let value = fold_key_case(value);
                let existing = folded
                    .keys()
                    .find(|candidate: &&String| candidate.eq_ignore_ascii_case(&key))
                    .cloned();
                match existing {
                    Some(existing) => {
                        let merged = match (folded.remove(&existing), value) {
                            (Some(JsonValue::Object(mut base)), JsonValue::Object(overlay)) => {
                                for (k, v) in overlay {
                                    base.insert(k, v);
                                }
                                fold_key_case(JsonValue::Object(base))
                            }
                            (_, value) => value,
                        };
                        folded.insert(existing, merged);
                    }
                    None => {
                        folded.insert(key, value);
                    }
                }
            }
            JsonValue::Object(folded)
        }
        JsonValue::Array(values) => JsonValue::Array(values.into_iter().map(fold_key_case).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_absent_values_stay_none() {
        let config = RunConfig::from_value(json!({ "Source": "testSource" })).unwrap();

        assert_eq!(config.source.as_deref(), Some("testSource"));
        assert_eq!(config.sink, None);
        assert_eq!(config.source_settings, None);
        assert_eq!(config.sink_settings, None);
        assert_eq!(config.operations, None);
        assert_eq!(config.operation_count(), 1);
    }

    #[test]
    fn test_empty_section_is_present() {
        let config = RunConfig::from_value(json!({ "SourceSettings": {} })).unwrap();
        assert_eq!(config.source_settings, Some(SettingsBag::new()));
    }

    #[test]
    fn test_operations_keep_order_and_partial_overrides() {
        let config = RunConfig::from_value(json!({
            "Source": "testSource",
            "Sink": "testSink",
            "Operations": [
                { "SinkSettings": { "FilePath": "file-out.json" } },
                { "SourceSettings": { "FilePath": "file1.json" } },
                {}
            ]
        }))
        .unwrap();

        let operations = config.operations.as_ref().unwrap();
        assert_eq!(operations.len(), 3);
        assert_eq!(config.operation_count(), 3);
        assert!(operations[0].source_settings.is_none());
        assert_eq!(
            operations[0]
                .sink_settings
                .as_ref()
                .unwrap()
                .get_str("FilePath")
                .unwrap(),
            Some("file-out.json")
        );
        assert!(operations[1].sink_settings.is_none());
        assert_eq!(operations[2], OperationConfig::default());
    }

    #[test]
    fn test_indexed_operations_section() {
        let config = RunConfig::from_value(json!({
            "operations": {
                "10": { "sinksettings": { "filepath": "c.json" } },
                "2": { "sinksettings": { "filepath": "b.json" } },
                "0": { "sinksettings": { "filepath": "a.json" } }
            }
        }))
        .unwrap();

        let paths: Vec<_> = config
            .operations
            .unwrap()
            .iter()
            .map(|op| {
                op.sink_settings
                    .as_ref()
                    .unwrap()
                    .get_str("FilePath")
                    .unwrap()
                    .unwrap()
                    .to_string()
            })
            .collect();
        assert_eq!(paths, vec!["a.json", "b.json", "c.json"]);
    }

    #[test]
    fn test_keys_are_case_insensitive() {
        let config = RunConfig::from_value(json!({
            "source": "Json",
            "SINK": "Json",
            "sourcesettings": { "FilePath": "in.json" }
        }))
        .unwrap();

        assert_eq!(config.source.as_deref(), Some("Json"));
        assert_eq!(config.sink.as_deref(), Some("Json"));
        assert!(config.source_settings.is_some());
    }

    #[test]
    fn test_lowercase_keys_override_and_merge() {
        let config = RunConfig::from_value(json!({
            "Source": "fromFile",
            "source": "fromEnv",
            "SinkSettings": { "FilePath": "file.json", "Indented": true },
            "sinksettings": { "filepath": "env.json" }
        }))
        .unwrap();

        assert_eq!(config.source.as_deref(), Some("fromEnv"));
        let sink = config.sink_settings.unwrap();
        assert_eq!(sink.get_str("FilePath").unwrap(), Some("env.json"));
        assert_eq!(sink.get_bool("Indented").unwrap(), Some(true));
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn test_structural_errors() {
        assert!(RunConfig::from_value(json!({ "Source": 5 })).is_err());
        assert!(RunConfig::from_value(json!({ "SourceSettings": ["a"] })).is_err());
        assert!(RunConfig::from_value(json!({ "Operations": "three" })).is_err());
        assert!(RunConfig::from_value(json!({ "Operations": { "first": {} } })).is_err());
        assert!(RunConfig::from_value(json!(["not", "a", "section"])).is_err());
    }

    #[test]
    fn test_serializes_with_document_keys() {
        let config = RunConfig {
            source: Some("Json".to_string()),
            sink: Some("Json".to_string()),
            source_settings: Some(SettingsBag::new().with("FilePath", "in.json")),
            ..RunConfig::default()
        };

        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(
            value,
            json!({
                "Source": "Json",
                "Sink": "Json",
                "SourceSettings": { "FilePath": "in.json" }
            })
        );
    }
}
