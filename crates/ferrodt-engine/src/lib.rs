//! Orchestration engine for ferrodt
//!
//! A run goes through three stages:
//!
//! 1. **Planning**: [`Planner`] resolves the configured source and sink by
//!    display name against an [`ExtensionRegistry`] and expands the
//!    `Operations` overrides into an ordered list of [`Operation`]s.
//! 2. **Guarding**: [`ConflictGuard`] rejects any operation that would
//!    recreate the very container it reads from.
//! 3. **Execution**: each operation's source stream is handed unconsumed to
//!    its sink, in plan order, under a shared cancellation token.
//!
//! # Examples
//!
//! ```rust,no_run
//! use ferrodt_config::ConfigLoader;
//! use ferrodt_engine::{ExtensionRegistry, TransferEngine};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> ferrodt_types::Result<()> {
//! let registry = Arc::new(ExtensionRegistry::new());
//! let config = ConfigLoader::load_default()?;
//!
//! let outcome = TransferEngine::new(registry)
//!     .run(&config, CancellationToken::new())
//!     .await?;
//! std::process::exit(i32::from(outcome.exit_code()));
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod engine;
pub mod executor;
pub mod guard;
pub mod planner;
pub mod registry;

pub use engine::{RunId, RunOutcome, RunSummary, TransferEngine};
pub use executor::{execute, OperationSummary};
pub use guard::{connection_string_value, ConflictGuard, StoreAddress, StoreGuard};
pub use planner::{Operation, Planner};
pub use registry::ExtensionRegistry;
