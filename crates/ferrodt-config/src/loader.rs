//! Configuration loader utilities

use crate::builder::DEFAULT_ENV_PREFIX;
use crate::{ConfigBuilder, ConfigError, ConfigResult, OperationConfig, RunConfig};
use ferrodt_types::SettingsBag;
use std::path::{Path, PathBuf};

/// Settings file names searched in the working directory, in order
pub const DEFAULT_SETTINGS_FILES: &[&str] = &[
    "migrationsettings.json",
    "ferrodt.json",
    "ferrodt.yaml",
    "ferrodt.yml",
    "ferrodt.toml",
];

/// Configuration loader with common loading patterns
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from the first default settings file found, plus environment
    pub fn load_default() -> ConfigResult<RunConfig> {
        let mut builder = ConfigBuilder::new();

        if let Some(path) = Self::settings_file_exists() {
            builder = builder.add_source_file(path);
        }

        builder.add_env_prefix(DEFAULT_ENV_PREFIX).build()
    }

    /// Load configuration from a specific file, plus environment
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<RunConfig> {
        ConfigBuilder::new()
            .add_source_file(path)
            .add_env_prefix(DEFAULT_ENV_PREFIX)
            .build()
    }

    /// Save configuration to a file, choosing the format from the extension
    pub fn save_to_file<P: AsRef<Path>>(config: &RunConfig, path: P) -> ConfigResult<()> {
        let path = path.as_ref();

        let content = match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml" | "yml") => serde_yaml::to_string(config)?,
            Some("toml") => toml::to_string_pretty(config)?,
            _ => serde_json::to_string_pretty(config)?,
        };

        std::fs::write(path, content).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Write a starter settings file for a JSON-to-JSON fan-out run
    pub fn generate_template<P: AsRef<Path>>(path: P) -> ConfigResult<()> {
        Self::save_to_file(&Self::template(), path)
    }

    /// Starter configuration: one JSON source copied to two JSON sinks
    pub fn template() -> RunConfig {
        let sink = |file: &str| OperationConfig {
            source_settings: None,
            sink_settings: Some(
                SettingsBag::new()
                    .with("FilePath", file)
                    .with("Indented", true),
            ),
        };

        RunConfig {
            source: Some("Json".to_string()),
            sink: Some("Json".to_string()),
            source_settings: Some(SettingsBag::new().with("FilePath", "data-in.json")),
            sink_settings: None,
            operations: Some(vec![sink("data-out-1.json"), sink("data-out-2.json")]),
        }
    }

    /// Find the first default settings file in the working directory
    pub fn settings_file_exists() -> Option<PathBuf> {
        DEFAULT_SETTINGS_FILES
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[rstest]
    #[case("settings.json")]
    #[case("settings.yaml")]
    #[case("settings.toml")]
    fn test_save_and_load(#[case] file_name: &str) {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(file_name);

        let original = ConfigLoader::template();
        ConfigLoader::save_to_file(&original, &path).unwrap();

        let loaded = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(loaded.source.as_deref(), Some("Json"));
        assert_eq!(loaded.sink.as_deref(), Some("Json"));
        assert_eq!(loaded.operation_count(), 2);

        let operations = loaded.operations.unwrap();
        let second = operations[1].sink_settings.as_ref().unwrap();
        assert_eq!(second.get_str("FilePath").unwrap(), Some("data-out-2.json"));
        assert_eq!(second.get_bool("Indented").unwrap(), Some(true));
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = ConfigLoader::load_from_file(temp_dir.path().join("missing.json"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_generate_template() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("migrationsettings.json");

        ConfigLoader::generate_template(&path).unwrap();
        assert!(path.exists());

        let loaded = ConfigLoader::load_from_file(&path).unwrap();
        let source = loaded.source_settings.unwrap();
        assert_eq!(source.get_str("FilePath").unwrap(), Some("data-in.json"));
        assert!(loaded.sink_settings.is_none());
    }
}
