//! Result type alias for ferrodt operations

use crate::Error;

/// Result type alias for ferrodt operations
pub type Result<T> = std::result::Result<T, Error>;
