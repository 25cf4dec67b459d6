//! JSON file source

use super::{item_from_json, JsonSourceSettings, DISPLAY_NAME};
use ferrodt_types::{
    DataItem, DataItemStream, DataSourceExtension, Error, Extension, Result, RunContext,
    SettingsBag,
};
use futures::{stream, StreamExt};
use serde::de::{self, Deserializer as _, SeqAccess, Visitor};
use serde_json::Value as JsonValue;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::sync::mpsc;
use tracing::{debug, Instrument, Span};

/// Array elements parsed ahead of the consumer
const ARRAY_READ_AHEAD: usize = 64;

/// Reads JSON arrays or newline-delimited JSON from a file
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSource;

impl Extension for JsonSource {
    fn display_name(&self) -> &str {
        DISPLAY_NAME
    }
}

impl DataSourceExtension for JsonSource {
    fn read<'a>(&'a self, settings: &'a SettingsBag, context: &'a RunContext) -> DataItemStream<'a> {
        let path = match JsonSourceSettings::from_settings(settings) {
            Ok(settings) => settings.file_path,
            Err(error) => {
                return stream::once(async move { Err::<Box<dyn DataItem>, _>(error) }).boxed()
            }
        };

        stream::unfold(ReadState::Pending(path), move |state| {
            async move {
                if context.is_cancelled() {
                    return match state {
                        ReadState::Done => None,
                        _ => Some((Err(Error::Cancelled), ReadState::Done)),
                    };
                }
                state.advance().await
            }
            .instrument(context.span().clone())
        })
        .boxed()
    }
}

enum ReadState {
    /// File not opened yet
    Pending(PathBuf),
    /// Newline-delimited input; `line` is the number of the last line read
    Lines {
        path: PathBuf,
        lines: Lines<BufReader<File>>,
        line: usize,
        buffered: Option<String>,
    },
    /// Elements of an array document, parsed one at a time off the runtime
    Array {
        elements: mpsc::Receiver<Result<JsonValue>>,
        index: usize,
    },
    Done,
}

type Step = Option<(Result<Box<dyn DataItem>>, ReadState)>;

impl ReadState {
    async fn advance(self) -> Step {
        let state = match self {
            Self::Pending(path) => match open(&path).await {
                Ok(state) => state,
                Err(error) => return Some((Err(error), Self::Done)),
            },
            state => state,
        };

        match state {
            Self::Lines {
                path,
                lines,
                line,
                buffered,
            } => next_line(path, lines, line, buffered).await,
            Self::Array {
                mut elements,
                index,
            } => match elements.recv().await? {
                Ok(element) => {
                    let item = item_from_json(element, &format_args!("array element {index}"));
                    Some((
                        item,
                        Self::Array {
                            elements,
                            index: index + 1,
                        },
                    ))
                }
                Err(error) => Some((Err(error), Self::Done)),
            },
            Self::Pending(_) | Self::Done => None,
        }
    }
}

/// Open `path` and pick the layout from the first non-blank line
async fn open(path: &Path) -> Result<ReadState> {
    let file = File::open(path).await.map_err(|e| Error::Io {
        message: format!("Failed to open file '{}': {}", path.display(), e),
    })?;
    debug!("Opened JSON file for reading: {}", path.display());

    let mut lines = BufReader::new(file).lines();
    let mut line = 0;
    loop {
        let Some(text) = lines.next_line().await.map_err(|e| read_error(path, &e))? else {
            return Ok(ReadState::Done);
        };
        line += 1;
        if text.trim().is_empty() {
            continue;
        }

        if !text.trim_start().starts_with('[') {
            return Ok(ReadState::Lines {
                path: path.to_path_buf(),
                lines,
                line: line - 1,
                buffered: Some(text),
            });
        }

        // The array is re-read from the start by a blocking parser
        drop(lines);
        debug!("Streaming JSON array document");
        return Ok(ReadState::Array {
            elements: stream_array(path.to_path_buf()),
            index: 0,
        });
    }
}

/// Parse the array at `path` on the blocking pool, sending each element as it
/// is decoded. The channel bound keeps at most [`ARRAY_READ_AHEAD`] elements
/// in memory; dropping the receiver stops the parser.
fn stream_array(path: PathBuf) -> mpsc::Receiver<Result<JsonValue>> {
    let (sender, receiver) = mpsc::channel(ARRAY_READ_AHEAD);
    let span = Span::current();

    tokio::task::spawn_blocking(move || {
        let _entered = span.enter();
        if let Err(error) = parse_array(&path, &sender) {
            // A closed receiver means nobody is waiting for the error
            let _ = sender.blocking_send(Err(error));
        }
    });

    receiver
}

fn parse_array(path: &Path, sender: &mpsc::Sender<Result<JsonValue>>) -> Result<()> {
    let file = std::fs::File::open(path).map_err(|e| Error::Io {
        message: format!("Failed to open file '{}': {}", path.display(), e),
    })?;

    let mut deserializer = serde_json::Deserializer::from_reader(std::io::BufReader::new(file));
    let parsed = (&mut deserializer)
        .deserialize_seq(ElementSender { sender })
        .and_then(|()| deserializer.end());

    match parsed {
        Ok(()) => Ok(()),
        Err(_) if sender.is_closed() => Ok(()),
        Err(e) if e.is_io() => Err(Error::Io {
            message: format!("Failed to read file '{}': {}", path.display(), e),
        }),
        Err(e) => Err(Error::serialization(format!(
            "Invalid JSON array in '{}': {}",
            path.display(),
            e
        ))),
    }
}

/// Forwards array elements into the channel instead of collecting them
struct ElementSender<'a> {
    sender: &'a mpsc::Sender<Result<JsonValue>>,
}

impl<'de> Visitor<'de> for ElementSender<'_> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON array")
    }

    fn visit_seq<A>(self, mut seq: A) -> std::result::Result<(), A::Error>
    where
        A: SeqAccess<'de>,
    {
        while let Some(element) = seq.next_element::<JsonValue>()? {
            if self.sender.blocking_send(Ok(element)).is_err() {
                return Err(de::Error::custom("array reader closed"));
            }
        }
        Ok(())
    }
}

async fn next_line(
    path: PathBuf,
    mut lines: Lines<BufReader<File>>,
    mut line: usize,
    mut buffered: Option<String>,
) -> Step {
    loop {
        let text = match buffered.take() {
            Some(text) => text,
            None => match lines.next_line().await {
                Ok(Some(text)) => text,
                Ok(None) => return None,
                Err(error) => return Some((Err(read_error(&path, &error)), ReadState::Done)),
            },
        };
        line += 1;
        if text.trim().is_empty() {
            continue;
        }

        let item = serde_json::from_str(&text)
            .map_err(|e| {
                Error::serialization(format!("Invalid JSON at {}:{}: {}", path.display(), line, e))
            })
            .and_then(|value| item_from_json(value, &format_args!("{}:{}", path.display(), line)));

        return Some((
            item,
            ReadState::Lines {
                path,
                lines,
                line,
                buffered: None,
            },
        ));
    }
}

fn read_error(path: &Path, error: &std::io::Error) -> Error {
    Error::Io {
        message: format!("Failed to read file '{}': {}", path.display(), error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrodt_types::{ErrorKind, Value};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn file_with(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn settings_for(file: &NamedTempFile) -> SettingsBag {
        SettingsBag::new().with("FilePath", file.path().to_string_lossy().to_string())
    }

    async fn read_all(settings: &SettingsBag, context: &RunContext) -> Vec<Result<Box<dyn DataItem>>> {
        JsonSource.read(settings, context).collect().await
    }

    #[tokio::test]
    async fn test_read_newline_delimited() {
        let file = file_with("{\"id\": 1, \"name\": \"a\"}\n\n{\"id\": 2, \"name\": \"b\"}\n");
        let items = read_all(&settings_for(&file), &RunContext::detached()).await;

        let ids: Vec<_> = items
            .into_iter()
            .map(|item| item.unwrap().value("id"))
            .collect();
        assert_eq!(ids, vec![Some(Value::Int(1)), Some(Value::Int(2))]);
    }

    #[tokio::test]
    async fn test_read_array_document() {
        let file = file_with("\n[\n  {\"id\": 1},\n  {\"id\": 2, \"tags\": [\"x\"]},\n  {\"id\": 3}\n]\n");
        let items = read_all(&settings_for(&file), &RunContext::detached()).await;

        assert_eq!(items.len(), 3);
        let second = items[1].as_ref().unwrap();
        let mut names = second.field_names();
        names.sort();
        assert_eq!(names, vec!["id", "tags"]);
    }

    #[tokio::test]
    async fn test_array_elements_arrive_before_the_document_ends() {
        let file = file_with("[\n{\"id\": 1},\n{\"id\": 2},\n GARBAGE");
        let settings = settings_for(&file);
        let context = RunContext::detached();
        let mut stream = JsonSource.read(&settings, &context);

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.value("id"), Some(Value::Int(1)));
        let second = stream.next().await.unwrap().unwrap();
        assert_eq!(second.value("id"), Some(Value::Int(2)));

        let error = stream.next().await.unwrap().unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Serialization);
        assert!(error.to_string().contains("line 4"));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_large_array_dropped_early() {
        let elements: Vec<String> = (0..1000).map(|i| format!("{{\"id\": {i}}}")).collect();
        let file = file_with(&format!("[{}]", elements.join(",\n")));
        let settings = settings_for(&file);
        let context = RunContext::detached();

        let taken: Vec<_> = JsonSource.read(&settings, &context).take(3).collect().await;
        let ids: Vec<_> = taken.into_iter().map(|item| item.unwrap().value("id")).collect();
        assert_eq!(ids, vec![Some(Value::Int(0)), Some(Value::Int(1)), Some(Value::Int(2))]);
    }

    #[tokio::test]
    async fn test_trailing_content_after_array_is_rejected() {
        let file = file_with("[{\"id\": 1}] {\"id\": 2}");
        let items = read_all(&settings_for(&file), &RunContext::detached()).await;

        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert_eq!(items[1].as_ref().unwrap_err().kind(), ErrorKind::Serialization);
    }

    #[tokio::test]
    async fn test_empty_file_yields_nothing() {
        let file = file_with("\n  \n");
        assert!(read_all(&settings_for(&file), &RunContext::detached()).await.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_line_reports_position() {
        let file = file_with("{\"id\": 1}\n{oops\n");
        let items = read_all(&settings_for(&file), &RunContext::detached()).await;

        assert!(items[0].is_ok());
        let error = items[1].as_ref().unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Serialization);
        assert!(error.to_string().contains(":2"));
    }

    #[tokio::test]
    async fn test_scalar_elements_are_rejected() {
        let file = file_with("[1, {\"id\": 2}]");
        let items = read_all(&settings_for(&file), &RunContext::detached()).await;

        assert!(items[0].is_err());
        assert!(items[1].is_ok());
    }

    #[tokio::test]
    async fn test_missing_file_and_settings() {
        let context = RunContext::detached();

        let missing = SettingsBag::new().with("FilePath", "/definitely/not/here.json");
        let items = read_all(&missing, &context).await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_ref().unwrap_err().kind(), ErrorKind::Io);

        let items = read_all(&SettingsBag::new(), &context).await;
        assert_eq!(items[0].as_ref().unwrap_err().kind(), ErrorKind::Config);
    }

    #[tokio::test]
    async fn test_cancelled_context_ends_stream() {
        let file = file_with("{\"id\": 1}\n{\"id\": 2}\n");
        let context = RunContext::detached();
        context.cancellation().cancel();

        let items = read_all(&settings_for(&file), &context).await;
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(Error::Cancelled)));
    }
}
