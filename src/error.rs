//! Error types for the listwatch engine.

use crate::watch::SubscriberId;

/// Top-level error type for watch management.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// Missing or malformed URL. Rejected before any state is touched.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A watch already exists for this subscriber.
    #[error("subscriber {0} is already watching a page")]
    AlreadyWatching(SubscriberId),

    /// No watch exists for this subscriber.
    #[error("subscriber {0} is not watching any page")]
    NotWatching(SubscriberId),

    /// The task store could not be read or written.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WatchError {
    /// Whether the error was a rejection that left all state untouched.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_) | Self::AlreadyWatching(_) | Self::NotWatching(_)
        )
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, WatchError>;
