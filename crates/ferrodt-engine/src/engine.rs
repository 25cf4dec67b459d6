//! Run orchestration

use crate::executor::{execute, OperationSummary};
use crate::guard::ConflictGuard;
use crate::planner::{Operation, Planner};
use crate::registry::ExtensionRegistry;
use ferrodt_config::RunConfig;
use ferrodt_types::{Error, Result, RunContext};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Unique identifier for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId(Uuid);

impl RunId {
    /// Create a new run ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of a successful run
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Run identifier
    pub run_id: RunId,
    /// Per-operation summaries in plan order
    pub operations: Vec<OperationSummary>,
    /// Total wall time
    pub elapsed: Duration,
}

impl RunSummary {
    /// Items transferred across all operations
    pub fn total_items(&self) -> u64 {
        self.operations.iter().map(|op| op.items).sum()
    }
}

/// How a run ended without a fault
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// Every operation finished
    Completed(RunSummary),
    /// `Source` or `Sink` was not configured; nothing was executed
    ConfigurationMissing {
        /// Missing configuration keys
        keys: Vec<String>,
    },
}

impl RunOutcome {
    /// Process exit code for this outcome
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Completed(_) => 0,
            Self::ConfigurationMissing { .. } => 1,
        }
    }

    /// Check whether the run completed
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

/// Plans and executes transfer runs against a fixed extension registry
#[derive(Debug, Clone)]
pub struct TransferEngine {
    registry: Arc<ExtensionRegistry>,
    guard: ConflictGuard,
}

impl TransferEngine {
    /// Create an engine with the default conflict guard
    pub fn new(registry: Arc<ExtensionRegistry>) -> Self {
        Self {
            registry,
            guard: ConflictGuard::default(),
        }
    }

    /// Replace the conflict guard
    pub fn with_guard(mut self, guard: ConflictGuard) -> Self {
        self.guard = guard;
        self
    }

    /// Registered extensions
    pub fn registry(&self) -> &ExtensionRegistry {
        &self.registry
    }

    /// Plan `config` and check every operation against the conflict guard
    pub fn plan(&self, config: &RunConfig) -> Result<Vec<Operation>> {
        let operations = Planner::new(&self.registry).plan(config)?;
        for operation in &operations {
            self.guard.check(operation)?;
        }
        debug!(count = operations.len(), "Plan accepted");
        Ok(operations)
    }

    /// Execute a run
    ///
    /// Unconfigured extension names produce [`RunOutcome::ConfigurationMissing`];
    /// every other failure is returned as an error and stops the run.
    pub async fn run(&self, config: &RunConfig, cancellation: CancellationToken) -> Result<RunOutcome> {
        let run_id = RunId::new();
        let span = info_span!("run", %run_id);
        let context = RunContext::new(span.clone(), cancellation);

        async move {
            let started = Instant::now();

            let operations = match self.plan(config) {
                Ok(operations) => operations,
                Err(Error::MissingConfiguration { keys }) => {
                    warn!(missing = %keys.join(", "), "Source and sink must both be configured");
                    return Ok(RunOutcome::ConfigurationMissing { keys });
                }
                Err(error) => return Err(error),
            };

            info!(operations = operations.len(), "Starting run");
            let mut summaries = Vec::with_capacity(operations.len());
            for operation in &operations {
                summaries.push(execute(operation, &context).await?);
            }

            let summary = RunSummary {
                run_id,
                operations: summaries,
                elapsed: started.elapsed(),
            };
            info!(
                items = summary.total_items(),
                elapsed_ms = summary.elapsed.as_millis(),
                "Run completed"
            );
            Ok(RunOutcome::Completed(summary))
        }
        .instrument(span)
        .await
    }
}
