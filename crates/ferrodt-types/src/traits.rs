//! Extension contracts
//!
//! Sources and sinks are supplied by extensions; the orchestration core only
//! selects among them by display name and wires a source's lazy item stream
//! into a sink. Both sides receive the same [`RunContext`], which carries the
//! logging span and the run-wide cancellation token explicitly.

use crate::{DataItem, Result, SettingsBag};
use async_trait::async_trait;
use futures::stream::BoxStream;
use tokio_util::sync::CancellationToken;
use tracing::Span;

/// Lazy, single-pass, forward-only sequence of data items
///
/// The stream is pulled by exactly one consumer. An `Err` item is a fault of
/// the producing extension and ends the transfer.
pub type DataItemStream<'a> = BoxStream<'a, Result<Box<dyn DataItem>>>;

/// Shared per-run state handed to every extension call
#[derive(Debug, Clone)]
pub struct RunContext {
    span: Span,
    cancellation: CancellationToken,
}

impl RunContext {
    /// Create a context from a logging span and a cancellation token
    pub fn new(span: Span, cancellation: CancellationToken) -> Self {
        Self { span, cancellation }
    }

    /// Context with a disabled span and a fresh token
    pub fn detached() -> Self {
        Self::new(Span::none(), CancellationToken::new())
    }

    /// Derive a context that logs under `span` and shares this cancellation scope
    pub fn with_span(&self, span: Span) -> Self {
        Self::new(span, self.cancellation.clone())
    }

    /// Logging span extensions should record under
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Run-wide cancellation token
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Check whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

/// Common surface of every extension
pub trait Extension: Send + Sync {
    /// Human-readable name, the sole key configuration uses to select the extension
    fn display_name(&self) -> &str;
}

/// An extension able to produce data items
pub trait DataSourceExtension: Extension {
    /// Start reading with the given settings
    ///
    /// Nothing is read until the returned stream is polled. Implementations
    /// should observe `context.cancellation()` between items.
    fn read<'a>(&'a self, settings: &'a SettingsBag, context: &'a RunContext)
        -> DataItemStream<'a>;
}

/// An extension able to consume data items
#[async_trait]
pub trait DataSinkExtension: Extension {
    /// Consume `items` to exhaustion exactly once
    ///
    /// `source` identifies the extension producing the items so that sinks can
    /// special-case provenance through its display name.
    async fn write(
        &self,
        items: DataItemStream<'_>,
        settings: &SettingsBag,
        source: &dyn DataSourceExtension,
        context: &RunContext,
    ) -> Result<()>;
}
