//! JSON file sink

use super::{JsonFormat, JsonSinkSettings, DISPLAY_NAME};
use async_trait::async_trait;
use ferrodt_types::{
    DataItem, DataItemStream, DataSinkExtension, DataSourceExtension, Error, Extension, Result,
    RunContext, SettingsBag,
};
use futures::StreamExt;
use serde_json::Value as JsonValue;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, Instrument};

/// Writes items to a JSON array or newline-delimited JSON file
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSink;

impl Extension for JsonSink {
    fn display_name(&self) -> &str {
        DISPLAY_NAME
    }
}

#[async_trait]
impl DataSinkExtension for JsonSink {
    async fn write(
        &self,
        mut items: DataItemStream<'_>,
        settings: &SettingsBag,
        source: &dyn DataSourceExtension,
        context: &RunContext,
    ) -> Result<()> {
        let settings = JsonSinkSettings::from_settings(settings)?;

        async move {
            debug!(
                source = source.display_name(),
                format = %settings.format,
                "Writing JSON to {}",
                settings.file_path.display()
            );

            let mut writer = JsonFileWriter::create(&settings).await?;
            while let Some(item) = items.next().await {
                writer.write_item(item?.as_ref()).await?;
            }
            let count = writer.finish().await?;

            info!(items = count, "Wrote {}", settings.file_path.display());
            Ok(())
        }
        .instrument(context.span().clone())
        .await
    }
}

/// Buffered writer laying items out in the configured format
struct JsonFileWriter {
    writer: BufWriter<File>,
    format: JsonFormat,
    indented: bool,
    count: u64,
}

impl JsonFileWriter {
    async fn create(settings: &JsonSinkSettings) -> Result<Self> {
        let path = &settings.file_path;
        let file = File::create(path).await.map_err(|e| Error::Io {
            message: format!("Failed to create file '{}': {}", path.display(), e),
        })?;

        let mut writer = Self {
            writer: BufWriter::new(file),
            format: settings.format,
            indented: settings.indented,
            count: 0,
        };
        if writer.format == JsonFormat::Array {
            writer.put(b"[").await?;
        }
        Ok(writer)
    }

    async fn write_item(&mut self, item: &dyn DataItem) -> Result<()> {
        let value = JsonValue::from(item.to_value());

        let mut chunk = String::new();
        match self.format {
            JsonFormat::Lines => {
                chunk.push_str(&serde_json::to_string(&value)?);
                chunk.push('\n');
            }
            JsonFormat::Array if self.indented => {
                if self.count > 0 {
                    chunk.push(',');
                }
                chunk.push('\n');
                for (i, line) in serde_json::to_string_pretty(&value)?.lines().enumerate() {
                    if i > 0 {
                        chunk.push('\n');
                    }
                    chunk.push_str("  ");
                    chunk.push_str(line);
                }
            }
            JsonFormat::Array => {
                if self.count > 0 {
                    chunk.push(',');
                }
                chunk.push_str(&serde_json::to_string(&value)?);
            }
        }

        self.put(chunk.as_bytes()).await?;
        self.count += 1;
        Ok(())
    }

    /// Close the layout and flush; returns the number of items written
    async fn finish(mut self) -> Result<u64> {
        if self.format == JsonFormat::Array {
            let tail: &[u8] = if self.indented && self.count > 0 { b"\n]\n" } else { b"]\n" };
            self.put(tail).await?;
        }
        self.writer.flush().await.map_err(|e| Error::Io {
            message: format!("Failed to flush writer: {}", e),
        })?;
        Ok(self.count)
    }

    async fn put(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_all(bytes).await.map_err(|e| Error::Io {
            message: format!("Failed to write data: {}", e),
        })
    }
}
