pub mod system;

use thiserror::Error;

/// A single category fetch either yields data or one of these errors.
/// Per-category failures are recovered by the aggregator; they never abort
/// the whole snapshot on their own.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("telemetry source reported no data for {0}")]
    Empty(&'static str),
    #[error("collection timed out")]
    Timeout,
    #[error("collector task failed: {0}")]
    Task(String),
}
