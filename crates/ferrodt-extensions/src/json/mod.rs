//! JSON file source and sink
//!
//! The source accepts either a single JSON array of objects or
//! newline-delimited JSON (one object per line, blank lines ignored); the
//! layout is detected from the first non-blank line. The sink writes one of
//! the two layouts, chosen by the `Format` setting.
//!
//! | Setting    | Side   | Meaning                               |
//! |------------|--------|---------------------------------------|
//! | `FilePath` | both   | File to read or create (required)     |
//! | `Indented` | sink   | Pretty-print array output             |
//! | `Format`   | sink   | `array` or `lines`                    |
//!
//! Without `Format`, files ending in `.ndjson` or `.jsonl` are written as
//! lines and everything else as an array. `Indented` only applies to arrays;
//! asking for it with line output is a configuration error.

mod reader;
mod writer;

pub use reader::JsonSource;
pub use writer::JsonSink;

use ferrodt_types::{DataItem, Error, MapDataItem, Result, SettingsBag, Value};
use serde_json::Value as JsonValue;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Display name shared by the JSON source and sink
pub const DISPLAY_NAME: &str = "Json";

/// Settings key for the file path
pub const FILE_PATH_KEY: &str = "FilePath";
/// Settings key for indented output
pub const INDENTED_KEY: &str = "Indented";
/// Settings key for the output layout
pub const FORMAT_KEY: &str = "Format";

/// Settings understood by [`JsonSource`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonSourceSettings {
    /// File to read
    pub file_path: PathBuf,
}

impl JsonSourceSettings {
    /// Decode from a settings bag
    pub fn from_settings(settings: &SettingsBag) -> Result<Self> {
        Ok(Self {
            file_path: PathBuf::from(settings.require_str(FILE_PATH_KEY)?),
        })
    }
}

/// Output layout for [`JsonSink`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JsonFormat {
    /// One JSON array holding every item
    #[default]
    Array,
    /// Newline-delimited JSON, one compact object per line
    Lines,
}

impl FromStr for JsonFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "array" => Ok(Self::Array),
            "lines" | "ndjson" | "jsonl" => Ok(Self::Lines),
            other => Err(Error::config(format!(
                "Unknown JSON format '{other}', expected 'array' or 'lines'"
            ))),
        }
    }
}

impl fmt::Display for JsonFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Array => write!(f, "array"),
            Self::Lines => write!(f, "lines"),
        }
    }
}

/// Settings understood by [`JsonSink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonSinkSettings {
    /// File to create or truncate
    pub file_path: PathBuf,
    /// Pretty-print array output
    pub indented: bool,
    /// Output layout
    pub format: JsonFormat,
}

impl JsonSinkSettings {
    /// Decode from a settings bag
    pub fn from_settings(settings: &SettingsBag) -> Result<Self> {
        let file_path = PathBuf::from(settings.require_str(FILE_PATH_KEY)?);
        let format = match settings.get_non_blank_str(FORMAT_KEY)? {
            Some(format) => format.parse()?,
            None if is_lines_path(&file_path) => JsonFormat::Lines,
            None => JsonFormat::Array,
        };

        let indented = settings.get_bool(INDENTED_KEY)?.unwrap_or(false);
        if indented && format == JsonFormat::Lines {
            return Err(Error::config(format!(
                "'{INDENTED_KEY}' cannot be combined with line output for '{}'",
                file_path.display()
            )));
        }

        Ok(Self {
            file_path,
            indented,
            format,
        })
    }
}

/// Check whether `path` names a newline-delimited JSON file
pub fn is_lines_path(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("ndjson" | "jsonl")
    )
}

/// Convert one parsed JSON document into a data item
fn item_from_json(value: JsonValue, location: &dyn fmt::Display) -> Result<Box<dyn DataItem>> {
    match Value::from(value) {
        Value::Map(fields) => Ok(Box::new(MapDataItem::from(fields))),
        other => Err(Error::serialization(format!(
            "Expected a JSON object at {location}, found {}",
            JsonValue::from(other)
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrodt_types::ErrorKind;
    use rstest::rstest;

    #[rstest]
    #[case("array", JsonFormat::Array)]
    #[case(" Lines ", JsonFormat::Lines)]
    #[case("NDJSON", JsonFormat::Lines)]
    fn test_format_parse(#[case] input: &str, #[case] expected: JsonFormat) {
        assert_eq!(input.parse::<JsonFormat>().unwrap(), expected);
    }

    #[test]
    fn test_sink_settings_defaults() {
        let settings = JsonSinkSettings::from_settings(
            &SettingsBag::new().with("filepath", "out.json"),
        )
        .unwrap();

        assert_eq!(settings.file_path, PathBuf::from("out.json"));
        assert!(!settings.indented);
        assert_eq!(settings.format, JsonFormat::Array);
    }

    #[rstest]
    #[case("out.ndjson", None, JsonFormat::Lines)]
    #[case("out.jsonl", None, JsonFormat::Lines)]
    #[case("out.json", None, JsonFormat::Array)]
    #[case("out.ndjson", Some("array"), JsonFormat::Array)]
    fn test_format_from_extension(
        #[case] path: &str,
        #[case] format: Option<&str>,
        #[case] expected: JsonFormat,
    ) {
        let mut settings = SettingsBag::new().with("FilePath", path);
        if let Some(format) = format {
            settings.insert("Format", format);
        }
        assert_eq!(JsonSinkSettings::from_settings(&settings).unwrap().format, expected);
    }

    #[test]
    fn test_settings_errors() {
        let missing = JsonSourceSettings::from_settings(&SettingsBag::new()).unwrap_err();
        assert_eq!(missing.kind(), ErrorKind::Config);

        let bad_format = JsonSinkSettings::from_settings(
            &SettingsBag::new()
                .with("FilePath", "out.json")
                .with("Format", "csv"),
        )
        .unwrap_err();
        assert_eq!(bad_format.kind(), ErrorKind::Config);

        let bad_flag = JsonSinkSettings::from_settings(
            &SettingsBag::new()
                .with("FilePath", "out.json")
                .with("Indented", "yes"),
        )
        .unwrap_err();
        assert_eq!(bad_flag.kind(), ErrorKind::Config);
    }

    #[rstest]
    #[case(SettingsBag::new().with("FilePath", "out.ndjson"))]
    #[case(SettingsBag::new().with("FilePath", "out.json").with("Format", "lines"))]
    fn test_indented_lines_are_rejected(#[case] settings: SettingsBag) {
        let error = JsonSinkSettings::from_settings(&settings.with("Indented", true)).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Config);
        assert!(error.to_string().contains("Indented"));
    }

    #[test]
    fn test_item_from_json_requires_object() {
        let item = item_from_json(serde_json::json!({ "a": 1 }), &"line 1").unwrap();
        assert_eq!(item.value("a"), Some(Value::Int(1)));

        let error = item_from_json(serde_json::json!([1, 2]), &"line 3").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Serialization);
        assert!(error.to_string().contains("line 3"));
    }
}
