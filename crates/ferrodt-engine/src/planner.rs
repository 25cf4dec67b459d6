//! Operation planning
//!
//! Turns a bound [`RunConfig`] into the ordered list of [`Operation`]s a run
//! executes. Per-operation settings fall back to the global sections and then
//! to an empty bag, independently for the source and the sink side, which is
//! what makes fan-out and fan-in configurations work.

use crate::registry::ExtensionRegistry;
use ferrodt_config::{RunConfig, SINK_KEY, SOURCE_KEY};
use ferrodt_types::{DataSinkExtension, DataSourceExtension, Error, Result, SettingsBag};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// One source to sink pairing with its effective settings
#[derive(Clone)]
pub struct Operation {
    /// Position in the plan, starting at zero
    pub index: usize,
    /// Resolved source extension
    pub source: Arc<dyn DataSourceExtension>,
    /// Effective settings handed to the source
    pub source_settings: SettingsBag,
    /// Resolved sink extension
    pub sink: Arc<dyn DataSinkExtension>,
    /// Effective settings handed to the sink
    pub sink_settings: SettingsBag,
}

impl Operation {
    /// Display name of the source extension
    pub fn source_name(&self) -> &str {
        self.source.display_name()
    }

    /// Display name of the sink extension
    pub fn sink_name(&self) -> &str {
        self.sink.display_name()
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("index", &self.index)
            .field("source", &self.source_name())
            .field("source_settings", &self.source_settings)
            .field("sink", &self.sink_name())
            .field("sink_settings", &self.sink_settings)
            .finish()
    }
}

/// Builds operation plans against a registry
#[derive(Debug, Clone, Copy)]
pub struct Planner<'r> {
    registry: &'r ExtensionRegistry,
}

impl<'r> Planner<'r> {
    /// Create a planner resolving names against `registry`
    pub fn new(registry: &'r ExtensionRegistry) -> Self {
        Self { registry }
    }

    /// Produce the ordered operations for `config`
    ///
    /// Missing extension names are reported together as
    /// [`Error::MissingConfiguration`] before anything is looked up.
    pub fn plan(&self, config: &RunConfig) -> Result<Vec<Operation>> {
        let source_name = non_blank(config.source.as_deref());
        let sink_name = non_blank(config.sink.as_deref());

        let (source_name, sink_name) = match (source_name, sink_name) {
            (Some(source), Some(sink)) => (source, sink),
            (source, sink) => {
                let missing = [(SOURCE_KEY, source), (SINK_KEY, sink)]
                    .into_iter()
                    .filter(|(_, name)| name.is_none())
                    .map(|(key, _)| key);
                return Err(Error::missing_configuration(missing));
            }
        };

        let source = self.registry.resolve_source(source_name)?;
        let sink = self.registry.resolve_sink(sink_name)?;

        let count = config.operation_count();
        debug!(source = source_name, sink = sink_name, count, "Planning operations");

        let operations = (0..count)
            .map(|index| {
                let entry = config.operations.as_ref().and_then(|ops| ops.get(index));
                let source_settings = entry
                    .and_then(|op| op.source_settings.as_ref())
                    .or(config.source_settings.as_ref())
                    .cloned()
                    .unwrap_or_default();
                let sink_settings = entry
                    .and_then(|op| op.sink_settings.as_ref())
                    .or(config.sink_settings.as_ref())
                    .cloned()
                    .unwrap_or_default();

                Operation {
                    index,
                    source: Arc::clone(&source),
                    source_settings,
                    sink: Arc::clone(&sink),
                    sink_settings,
                }
            })
            .collect();

        Ok(operations)
    }
}

fn non_blank(name: Option<&str>) -> Option<&str> {
    name.filter(|name| !name.trim().is_empty())
}
