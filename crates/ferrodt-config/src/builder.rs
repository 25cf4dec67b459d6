//! Configuration builder for flexible configuration loading

use crate::{ConfigError, ConfigResult, RunConfig};
use config::{ConfigBuilder as ConfigBuilderInner, Environment, File, FileFormat};
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default prefix for environment variable overrides
pub const DEFAULT_ENV_PREFIX: &str = "FERRODT";

/// Builder that layers configuration sources into a [`RunConfig`]
///
/// Sources are applied in the order they are added; later sources win.
/// Explicit source/sink name overrides are applied last.
#[derive(Debug)]
pub struct ConfigBuilder {
    inner: ConfigBuilderInner<config::builder::DefaultState>,
    sources: Vec<ConfigSource>,
    env_separator: String,
    source_override: Option<String>,
    sink_override: Option<String>,
}

#[derive(Debug, Clone)]
enum ConfigSource {
    File {
        path: PathBuf,
        format: FileFormat,
        required: bool,
    },
    Environment {
        prefix: String,
    },
}

impl ConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self {
            inner: config::Config::builder(),
            sources: Vec::new(),
            env_separator: "__".to_string(),
            source_override: None,
            sink_override: None,
        }
    }

    /// Add a settings file that must exist
    pub fn add_source_file<P: AsRef<Path>>(self, path: P) -> Self {
        self.push_file(path.as_ref(), true)
    }

    /// Add a settings file that is skipped when absent
    pub fn add_optional_source_file<P: AsRef<Path>>(self, path: P) -> Self {
        self.push_file(path.as_ref(), false)
    }

    fn push_file(mut self, path: &Path, required: bool) -> Self {
        let format = Self::detect_format(path);
        self.sources.push(ConfigSource::File {
            path: path.to_path_buf(),
            format,
            required,
        });
        self
    }

    /// Add environment variable source with prefix
    ///
    /// `FERRODT__SOURCESETTINGS__FILEPATH=in.json` sets `SourceSettings:FilePath`.
    pub fn add_env_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.sources.push(ConfigSource::Environment {
            prefix: prefix.into(),
        });
        self
    }

    /// Set environment variable separator (default: "__")
    pub fn env_separator<S: Into<String>>(mut self, separator: S) -> Self {
        self.env_separator = separator.into();
        self
    }

    /// Override the configured source extension name
    pub fn with_source<S: Into<String>>(mut self, name: S) -> Self {
        self.source_override = Some(name.into());
        self
    }

    /// Override the configured sink extension name
    pub fn with_sink<S: Into<String>>(mut self, name: S) -> Self {
        self.sink_override = Some(name.into());
        self
    }

    /// Build the configuration
    pub fn build(mut self) -> ConfigResult<RunConfig> {
        for source in &self.sources {
            match source {
                ConfigSource::File {
                    path,
                    format,
                    required,
                } => {
                    if *required && !path.exists() {
                        return Err(ConfigError::not_found(path.clone()));
                    }
                    debug!(path = %path.display(), "Adding settings file");
                    self.inner = self
                        .inner
                        .add_source(File::from(path.clone()).format(*format).required(*required));
                }
                ConfigSource::Environment { prefix } => {
                    self.inner = self.inner.add_source(
                        Environment::with_prefix(prefix)
                            .prefix_separator(&self.env_separator)
                            .separator(&self.env_separator),
                    );
                }
            }
        }

        let tree: JsonValue = self.inner.build()?.try_deserialize()?;
        let mut config = RunConfig::from_value(tree)?;

        if let Some(source) = self.source_override {
            config.source = Some(source);
        }
        if let Some(sink) = self.sink_override {
            config.sink = Some(sink);
        }

        Ok(config)
    }

    /// Detect file format from extension
    fn detect_format(path: &Path) -> FileFormat {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml" | "yml") => FileFormat::Yaml,
            Some("toml") => FileFormat::Toml,
            _ => FileFormat::Json,
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
