//! Explicit extension registry
//!
//! Extensions are registered once at process start by whoever owns the
//! process (the CLI, or a test). The planner only ever queries the registry by
//! exact, case-sensitive display name.

use ferrodt_types::{Capability, DataSinkExtension, DataSourceExtension, Error, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Registered source and sink extensions keyed by display name
#[derive(Default)]
pub struct ExtensionRegistry {
    sources: BTreeMap<String, Arc<dyn DataSourceExtension>>,
    sinks: BTreeMap<String, Arc<dyn DataSinkExtension>>,
}

impl ExtensionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source extension
    pub fn register_source(&mut self, extension: Arc<dyn DataSourceExtension>) -> Result<()> {
        let name = validated_name(Capability::Source, extension.display_name())?;
        if self.sources.contains_key(&name) {
            return Err(Error::DuplicateExtension {
                capability: Capability::Source,
                name,
            });
        }
        self.sources.insert(name, extension);
        Ok(())
    }

    /// Register a sink extension
    pub fn register_sink(&mut self, extension: Arc<dyn DataSinkExtension>) -> Result<()> {
        let name = validated_name(Capability::Sink, extension.display_name())?;
        if self.sinks.contains_key(&name) {
            return Err(Error::DuplicateExtension {
                capability: Capability::Sink,
                name,
            });
        }
        self.sinks.insert(name, extension);
        Ok(())
    }

    /// Register a source, builder style
    pub fn with_source(mut self, extension: Arc<dyn DataSourceExtension>) -> Result<Self> {
        self.register_source(extension)?;
        Ok(self)
    }

    /// Register a sink, builder style
    pub fn with_sink(mut self, extension: Arc<dyn DataSinkExtension>) -> Result<Self> {
        self.register_sink(extension)?;
        Ok(self)
    }

    /// Returns one source by display name.
    pub fn source(&self, name: &str) -> Option<Arc<dyn DataSourceExtension>> {
        self.sources.get(name).cloned()
    }

    /// Returns one sink by display name.
    pub fn sink(&self, name: &str) -> Option<Arc<dyn DataSinkExtension>> {
        self.sinks.get(name).cloned()
    }

    /// Resolve a source or fail with [`Error::ExtensionNotFound`]
    pub fn resolve_source(&self, name: &str) -> Result<Arc<dyn DataSourceExtension>> {
        self.source(name).ok_or_else(|| Error::ExtensionNotFound {
            capability: Capability::Source,
            name: name.to_string(),
            available: self.source_names(),
        })
    }

    /// Resolve a sink or fail with [`Error::ExtensionNotFound`]
    pub fn resolve_sink(&self, name: &str) -> Result<Arc<dyn DataSinkExtension>> {
        self.sink(name).ok_or_else(|| Error::ExtensionNotFound {
            capability: Capability::Sink,
            name: name.to_string(),
            available: self.sink_names(),
        })
    }

    /// Returns sorted source display names.
    pub fn source_names(&self) -> Vec<String> {
        self.sources.keys().cloned().collect()
    }

    /// Returns sorted sink display names.
    pub fn sink_names(&self) -> Vec<String> {
        self.sinks.keys().cloned().collect()
    }

    /// Total number of registrations across both capabilities
    pub fn len(&self) -> usize {
        self.sources.len() + self.sinks.len()
    }

    /// Check whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty() && self.sinks.is_empty()
    }
}

impl fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("sources", &self.source_names())
            .field("sinks", &self.sink_names())
            .finish()
    }
}

fn validated_name(capability: Capability, name: &str) -> Result<String> {
    if name.trim().is_empty() {
        return Err(Error::config(format!(
            "Cannot register a {capability} extension with a blank display name"
        )));
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ferrodt_types::{DataItemStream, ErrorKind, Extension, RunContext, SettingsBag};
    use futures::{stream, StreamExt};

    struct Named(&'static str);

    impl Extension for Named {
        fn display_name(&self) -> &str {
            self.0
        }
    }

    impl DataSourceExtension for Named {
        fn read<'a>(&'a self, _: &'a SettingsBag, _: &'a RunContext) -> DataItemStream<'a> {
            stream::empty().boxed()
        }
    }

    #[async_trait]
    impl DataSinkExtension for Named {
        async fn write(
            &self,
            _items: DataItemStream<'_>,
            _settings: &SettingsBag,
            _source: &dyn DataSourceExtension,
            _context: &RunContext,
        ) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_register_and_resolve() {
        let json = Arc::new(Named("Json"));
        let registry = ExtensionRegistry::new()
            .with_source(json.clone())
            .unwrap()
            .with_sink(json)
            .unwrap()
            .with_sink(Arc::new(Named("Cosmos-nosql")))
            .unwrap();

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.source_names(), vec!["Json".to_string()]);
        assert_eq!(
            registry.sink_names(),
            vec!["Cosmos-nosql".to_string(), "Json".to_string()]
        );
        assert_eq!(registry.resolve_source("Json").unwrap().display_name(), "Json");
        assert!(registry.resolve_sink("Cosmos-nosql").is_ok());
    }

    #[test]
    fn test_lookup_is_exact_and_capability_scoped() {
        let registry = ExtensionRegistry::new()
            .with_sink(Arc::new(Named("testSink")))
            .unwrap();

        assert!(registry.sink("testsink").is_none());
        assert!(registry.sink(" testSink").is_none());

        let error = registry.resolve_source("testSink").err().unwrap();
        assert_eq!(error.kind(), ErrorKind::Extension);
        assert!(matches!(
            error,
            Error::ExtensionNotFound {
                capability: Capability::Source,
                ..
            }
        ));
    }

    #[test]
    fn test_duplicate_and_blank_names_rejected() {
        let mut registry = ExtensionRegistry::new();
        registry.register_source(Arc::new(Named("Json"))).unwrap();

        assert!(matches!(
            registry.register_source(Arc::new(Named("Json"))),
            Err(Error::DuplicateExtension { .. })
        ));
        assert!(registry.register_sink(Arc::new(Named("Json"))).is_ok());
        assert!(registry.register_sink(Arc::new(Named("  "))).is_err());
    }
}
