//! Extension settings bag
//!
//! A [`SettingsBag`] is the opaque, string-keyed configuration view handed to a
//! single read or write invocation. Values keep the shape of the configuration
//! document (scalars, sequences, nested sections); the typed accessors fail
//! with [`Error::Config`] when a value has the wrong shape instead of coercing
//! it silently. Scalar strings are parsed for booleans and integers because
//! hierarchical configuration sources (environment variables, overrides)
//! deliver every scalar as a string.
//!
//! Key lookup prefers an exact match and falls back to an ASCII
//! case-insensitive match.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Opaque key/value settings for one extension invocation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SettingsBag(Map<String, JsonValue>);

impl SettingsBag {
    /// Create an empty settings bag
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a settings bag from a configuration section
    ///
    /// `null` yields an empty bag; anything other than an object is rejected.
    pub fn from_value(value: JsonValue) -> Result<Self> {
        match value {
            JsonValue::Object(map) => Ok(Self(map)),
            JsonValue::Null => Ok(Self::new()),
            other => Err(Error::config(format!(
                "Expected a settings section, found {}",
                json_type_name(&other)
            ))),
        }
    }

    /// Add a setting, builder style
    pub fn with(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace a setting
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<JsonValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Number of top-level settings
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check whether no settings are present
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Top-level setting keys
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Borrow the underlying map
    pub fn as_map(&self) -> &Map<String, JsonValue> {
        &self.0
    }

    /// Look up a raw setting value
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.0.get(key).or_else(|| {
            self.0
                .iter()
                .find(|(candidate, _)| candidate.eq_ignore_ascii_case(key))
                .map(|(_, value)| value)
        })
    }

    /// Check whether a setting is present (null counts as absent)
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some_and(|value| !value.is_null())
    }

    /// Get a string setting
    pub fn get_str(&self, key: &str) -> Result<Option<&str>> {
        match self.get(key) {
            None | Some(JsonValue::Null) => Ok(None),
            Some(JsonValue::String(value)) => Ok(Some(value)),
            Some(other) => Err(type_mismatch(key, "a string", other)),
        }
    }

    /// Get a string setting, treating blank strings as absent
    pub fn get_non_blank_str(&self, key: &str) -> Result<Option<&str>> {
        Ok(self.get_str(key)?.filter(|value| !value.trim().is_empty()))
    }

    /// Get a required, non-blank string setting
    pub fn require_str(&self, key: &str) -> Result<&str> {
        self.get_non_blank_str(key)?
            .ok_or_else(|| Error::config(format!("Setting '{key}' is required")))
    }

    /// Get a boolean setting
    pub fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        match self.get(key) {
            None | Some(JsonValue::Null) => Ok(None),
            Some(JsonValue::Bool(value)) => Ok(Some(*value)),
            Some(JsonValue::String(value)) => {
                let value = value.trim();
                if value.eq_ignore_ascii_case("true") {
                    Ok(Some(true))
                } else if value.eq_ignore_ascii_case("false") {
                    Ok(Some(false))
                } else {
                    Err(Error::config(format!(
                        "Setting '{key}' must be a boolean, found \"{value}\""
                    )))
                }
            }
            Some(other) => Err(type_mismatch(key, "a boolean", other)),
        }
    }

    /// Get an integer setting
    pub fn get_i64(&self, key: &str) -> Result<Option<i64>> {
        match self.get(key) {
            None | Some(JsonValue::Null) => Ok(None),
            Some(JsonValue::Number(number)) => number
                .as_i64()
                .map(Some)
                .ok_or_else(|| type_mismatch(key, "an integer", &JsonValue::Number(number.clone()))),
            Some(JsonValue::String(value)) => value.trim().parse().map(Some).map_err(|_| {
                Error::config(format!(
                    "Setting '{key}' must be an integer, found \"{value}\""
                ))
            }),
            Some(other) => Err(type_mismatch(key, "an integer", other)),
        }
    }

    /// Get a nested settings section
    pub fn section(&self, key: &str) -> Result<Option<SettingsBag>> {
        match self.get(key) {
            None | Some(JsonValue::Null) => Ok(None),
            Some(JsonValue::Object(map)) => Ok(Some(Self(map.clone()))),
            Some(other) => Err(type_mismatch(key, "a section", other)),
        }
    }

    /// Decode a setting into a typed value
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key) {
            None | Some(JsonValue::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| Error::config(format!("Setting '{key}' is invalid: {e}"))),
        }
    }
}

impl From<Map<String, JsonValue>> for SettingsBag {
    fn from(map: Map<String, JsonValue>) -> Self {
        Self(map)
    }
}

fn type_mismatch(key: &str, expected: &str, found: &JsonValue) -> Error {
    Error::config(format!(
        "Setting '{key}' must be {expected}, found {}",
        json_type_name(found)
    ))
}

fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "a sequence",
        JsonValue::Object(_) => "a section",
    }
}
