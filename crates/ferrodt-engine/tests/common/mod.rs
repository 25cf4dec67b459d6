//! Recording extensions shared by the engine integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use ferrodt_config::RunConfig;
use ferrodt_engine::ExtensionRegistry;
use ferrodt_types::{
    DataItem, DataItemStream, DataSinkExtension, DataSourceExtension, Extension, MapDataItem,
    Result, RunContext, SettingsBag,
};
use futures::{stream, StreamExt};
use serde_json::Value as JsonValue;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Source yielding `Count` items (default 2) tagged with its `FilePath`
pub struct RecordingSource {
    name: String,
    reads: AtomicUsize,
    settings: Mutex<Vec<SettingsBag>>,
}

impl RecordingSource {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            reads: AtomicUsize::new(0),
            settings: Mutex::new(Vec::new()),
        })
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn settings(&self) -> Vec<SettingsBag> {
        self.settings.lock().unwrap().clone()
    }
}

impl Extension for RecordingSource {
    fn display_name(&self) -> &str {
        &self.name
    }
}

impl DataSourceExtension for RecordingSource {
    fn read<'a>(&'a self, settings: &'a SettingsBag, _context: &'a RunContext) -> DataItemStream<'a> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.settings.lock().unwrap().push(settings.clone());

        let count = settings.get_i64("Count").ok().flatten().unwrap_or(2);
        let file = settings
            .get_str("FilePath")
            .ok()
            .flatten()
            .unwrap_or_default()
            .to_string();
        let hang = settings.get_bool("Hang").ok().flatten().unwrap_or(false);

        let items = stream::iter(0..count).map(move |n| {
            Ok(Box::new(
                MapDataItem::new()
                    .with_field("n", n)
                    .with_field("file", file.clone()),
            ) as Box<dyn DataItem>)
        });
        if hang {
            items.chain(stream::pending()).boxed()
        } else {
            items.boxed()
        }
    }
}

/// Sink recording every call, the items it pulled and the source it was given
pub struct RecordingSink {
    name: String,
    writes: AtomicUsize,
    settings: Mutex<Vec<SettingsBag>>,
    items: Mutex<Vec<JsonValue>>,
    sources: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            writes: AtomicUsize::new(0),
            settings: Mutex::new(Vec::new()),
            items: Mutex::new(Vec::new()),
            sources: Mutex::new(Vec::new()),
        })
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn settings(&self) -> Vec<SettingsBag> {
        self.settings.lock().unwrap().clone()
    }

    pub fn items(&self) -> Vec<JsonValue> {
        self.items.lock().unwrap().clone()
    }

    pub fn sources(&self) -> Vec<String> {
        self.sources.lock().unwrap().clone()
    }
}

impl Extension for RecordingSink {
    fn display_name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl DataSinkExtension for RecordingSink {
    async fn write(
        &self,
        mut items: DataItemStream<'_>,
        settings: &SettingsBag,
        source: &dyn DataSourceExtension,
        context: &RunContext,
    ) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.settings.lock().unwrap().push(settings.clone());
        self.sources
            .lock()
            .unwrap()
            .push(source.display_name().to_string());

        let cancel_after = settings.get_i64("CancelAfter")?;
        let mut received = 0;
        while let Some(item) = items.next().await {
            let value = JsonValue::from(item?.to_value());
            self.items.lock().unwrap().push(value);
            received += 1;
            if cancel_after == Some(received) {
                context.cancellation().cancel();
            }
        }
        Ok(())
    }
}

/// Registry holding `source` and `sink`
pub fn registry(source: &Arc<RecordingSource>, sink: &Arc<RecordingSink>) -> Arc<ExtensionRegistry> {
    let mut registry = ExtensionRegistry::new();
    registry.register_source(source.clone()).unwrap();
    registry.register_sink(sink.clone()).unwrap();
    Arc::new(registry)
}

/// Bind a configuration document
pub fn config(document: JsonValue) -> RunConfig {
    RunConfig::from_value(document).unwrap()
}

pub fn file(path: &str) -> SettingsBag {
    SettingsBag::new().with("FilePath", path)
}
