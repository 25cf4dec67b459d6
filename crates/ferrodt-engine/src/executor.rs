//! Streaming execution of a single operation

use crate::planner::Operation;
use ferrodt_types::{DataItemStream, Error, Result, RunContext};
use futures::{stream, StreamExt};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, Instrument};

/// What one finished operation transferred
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationSummary {
    /// Position of the operation in the plan
    pub index: usize,
    /// Source extension display name
    pub source: String,
    /// Sink extension display name
    pub sink: String,
    /// Items the sink pulled from the source
    pub items: u64,
    /// Wall time spent in the operation
    pub elapsed: Duration,
}

/// Run one operation's read to write pipeline
///
/// The source stream is handed to the sink unconsumed; only the sink pulls
/// items. Cancellation of the context ends the stream with
/// [`Error::Cancelled`] and aborts a sink that stops polling it.
pub async fn execute(operation: &Operation, context: &RunContext) -> Result<OperationSummary> {
    let span = info_span!(
        parent: context.span(),
        "operation",
        index = operation.index,
        source = operation.source_name(),
        sink = operation.sink_name(),
    );
    let context = context.with_span(span.clone());

    transfer(operation, &context).instrument(span).await
}

async fn transfer(operation: &Operation, context: &RunContext) -> Result<OperationSummary> {
    if context.is_cancelled() {
        return Err(Error::Cancelled);
    }

    let started = Instant::now();
    info!("Starting operation");

    let transferred = AtomicU64::new(0);
    let items = operation.source.read(&operation.source_settings, context);
    let items = until_cancelled(items, context.cancellation())
        .inspect(|item| {
            if item.is_ok() {
                transferred.fetch_add(1, Ordering::Relaxed);
            }
        })
        .boxed();

    let write = operation.sink.write(
        items,
        &operation.sink_settings,
        operation.source.as_ref(),
        context,
    );

    tokio::select! {
        biased;
        () = context.cancellation().cancelled() => return Err(Error::Cancelled),
        result = write => result?,
    }

    // A sink may swallow the stream's cancellation fault
    if context.is_cancelled() {
        return Err(Error::Cancelled);
    }

    let summary = OperationSummary {
        index: operation.index,
        source: operation.source_name().to_string(),
        sink: operation.sink_name().to_string(),
        items: transferred.load(Ordering::Relaxed),
        elapsed: started.elapsed(),
    };
    info!(items = summary.items, elapsed_ms = summary.elapsed.as_millis(), "Operation completed");

    Ok(summary)
}

/// End `items` with a single [`Error::Cancelled`] once `cancellation` fires
fn until_cancelled<'a>(
    items: DataItemStream<'a>,
    cancellation: &'a CancellationToken,
) -> DataItemStream<'a> {
    let cancelled = Box::pin(cancellation.cancelled());

    stream::unfold(Some((items, cancelled)), |state| async move {
        let (mut items, mut cancelled) = state?;
        let next = tokio::select! {
            biased;
            () = &mut cancelled => None,
            next = items.next() => Some(next),
        };

        match next {
            None => {
                debug!("Source stream cancelled");
                Some((Err(Error::Cancelled), None))
            }
            Some(Some(item)) => Some((item, Some((items, cancelled)))),
            Some(None) => None,
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ferrodt_types::{
        DataItem, DataSinkExtension, DataSourceExtension, ErrorKind, Extension, MapDataItem,
        SettingsBag,
    };
    use std::sync::{Arc, Mutex};

    /// Yields `Count` items, then never finishes when `Hang` is set
    struct Counter;

    impl Extension for Counter {
        fn display_name(&self) -> &str {
            "counter"
        }
    }

    impl DataSourceExtension for Counter {
        fn read<'a>(&'a self, settings: &'a SettingsBag, _: &'a RunContext) -> DataItemStream<'a> {
            let count = settings.get_i64("Count").ok().flatten().unwrap_or(0);
            let hang = settings.get_bool("Hang").ok().flatten().unwrap_or(false);
            let items = stream::iter(0..count).map(|n| {
                Ok(Box::new(MapDataItem::new().with_field("n", n)) as Box<dyn DataItem>)
            });
            if hang {
                items.chain(stream::pending()).boxed()
            } else {
                items.boxed()
            }
        }
    }

    /// Records values; cancels the run after `CancelAfter` items
    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<i64>>,
    }

    impl Extension for Recorder {
        fn display_name(&self) -> &str {
            "recorder"
        }
    }

    #[async_trait]
    impl DataSinkExtension for Recorder {
        async fn write(
            &self,
            mut items: DataItemStream<'_>,
            settings: &SettingsBag,
            _source: &dyn DataSourceExtension,
            context: &RunContext,
        ) -> Result<()> {
            let cancel_after = settings.get_i64("CancelAfter")?;
            while let Some(item) = items.next().await {
                let n = item?.value("n").and_then(|v| v.as_i64()).unwrap_or(-1);
                let mut seen = self.seen.lock().unwrap();
                seen.push(n);
                if cancel_after == Some(seen.len() as i64) {
                    context.cancellation().cancel();
                }
            }
            Ok(())
        }
    }

    fn operation(source: SettingsBag, sink: SettingsBag, recorder: Arc<Recorder>) -> Operation {
        Operation {
            index: 4,
            source: Arc::new(Counter),
            source_settings: source,
            sink: recorder,
            sink_settings: sink,
        }
    }

    #[tokio::test]
    async fn test_execute_counts_items_in_order() {
        let recorder = Arc::new(Recorder::default());
        let op = operation(
            SettingsBag::new().with("Count", 5),
            SettingsBag::new(),
            Arc::clone(&recorder),
        );

        let summary = execute(&op, &RunContext::detached()).await.unwrap();
        assert_eq!(summary.index, 4);
        assert_eq!(summary.items, 5);
        assert_eq!(summary.source, "counter");
        assert_eq!(summary.sink, "recorder");
        assert_eq!(*recorder.seen.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_cancelled_context_starts_nothing() {
        let recorder = Arc::new(Recorder::default());
        let op = operation(
            SettingsBag::new().with("Count", 3),
            SettingsBag::new(),
            Arc::clone(&recorder),
        );
        let context = RunContext::detached();
        context.cancellation().cancel();

        let error = execute(&op, &context).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Cancelled);
        assert!(recorder.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancellation_ends_a_hanging_source() {
        let recorder = Arc::new(Recorder::default());
        let op = operation(
            SettingsBag::new().with("Count", 2).with("Hang", true),
            SettingsBag::new().with("CancelAfter", 2),
            Arc::clone(&recorder),
        );

        let error = execute(&op, &RunContext::detached()).await.unwrap_err();
        assert!(matches!(error, Error::Cancelled));
        assert_eq!(*recorder.seen.lock().unwrap(), vec![0, 1]);
    }

    #[tokio::test]
    async fn test_until_cancelled_yields_one_fault() {
        let token = CancellationToken::new();
        token.cancel();

        let items: Vec<_> = until_cancelled(stream::pending().boxed(), &token)
            .collect()
            .await;
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(Error::Cancelled)));
    }
}
