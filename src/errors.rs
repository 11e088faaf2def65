use std::path::PathBuf;

use thiserror::Error;

use crate::cancel::CancelReason;
use crate::model::Totals;

/// Failure raised by a `Dir::list` or `File::size` capability.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("cannot read directory {path:?}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot stat {path:?}: {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{name}: {reason}")]
    Unavailable { name: String, reason: String },

    /// The capability gave up early because its token was cancelled.
    #[error("interrupted by cancellation")]
    Interrupted,
}

#[derive(Debug, Error)]
pub enum SizeError {
    #[error("listing failed: {0}")]
    List(#[source] FsError),

    #[error("stat failed: {0}")]
    Stat(#[source] FsError),

    #[error("size computation cancelled")]
    Cancelled,

    #[error("size computation exceeded its deadline")]
    DeadlineExceeded,

    #[error("worker {id} panicked")]
    WorkerPanicked { id: usize },

    #[error("failed to spawn worker {id}: {source}")]
    Spawn {
        id: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("background size session ended without a result")]
    SessionLost,
}

impl From<CancelReason> for SizeError {
    fn from(reason: CancelReason) -> Self {
        match reason {
            CancelReason::Cancelled => Self::Cancelled,
            CancelReason::DeadlineExceeded => Self::DeadlineExceeded,
        }
    }
}

impl SizeError {
    /// True for failures coming from the filesystem capabilities rather than
    /// from the caller or the pool itself.
    pub fn is_filesystem(&self) -> bool {
        matches!(self, Self::List(_) | Self::Stat(_))
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }
}

/// First error of an aborted run, with whatever had been summed before the
/// pool shut down. `partial` is best-effort and never exceeds the true total.
#[derive(Debug, Error)]
#[error("{error} (partial: {} bytes in {} files)", .partial.total_size, .partial.file_count)]
pub struct SizeFailure {
    #[source]
    pub error: SizeError,
    pub partial: Totals,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid worker count {count}: must be between 1 and {max}")]
    InvalidWorkerCount { count: usize, max: usize },

    #[error("invalid timeout {secs}: must be a non-negative number of seconds")]
    InvalidTimeout { secs: f64 },

    #[error("cannot resolve root {path:?}: {source}")]
    Root {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("root {path:?} is not a directory")]
    NotADirectory { path: PathBuf },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_errors() {
        let list = SizeError::List(FsError::Unavailable {
            name: "a".into(),
            reason: "gone".into(),
        });
        assert!(list.is_filesystem());
        assert!(!list.is_cancellation());
        assert!(SizeError::Cancelled.is_cancellation());
        assert!(SizeError::DeadlineExceeded.is_cancellation());
        assert!(!SizeError::WorkerPanicked { id: 0 }.is_filesystem());
    }

    #[test]
    fn failure_message_mentions_partial_totals() {
        let failure = SizeFailure {
            error: SizeError::Cancelled,
            partial: Totals {
                total_size: 42,
                file_count: 3,
            },
        };
        let message = failure.to_string();
        assert!(message.contains("cancelled"));
        assert!(message.contains("42 bytes in 3 files"));
    }
}
