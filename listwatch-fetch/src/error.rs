//! Error types for the listwatch-fetch crate.
//!
//! Messages are stable and user-displayable: they are forwarded verbatim to
//! subscribers when a poll fails, so they never contain request headers or
//! response bodies.

/// Errors that can occur while fetching a listing page.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The URL is empty, relative, or uses a scheme other than http(s).
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The request did not complete before the configured timeout.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Connection, TLS, redirect, or body read failure.
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-success status code.
    #[error("HTTP status {0}")]
    Status(u16),

    /// A configured CSS selector could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid fetcher configuration.
    #[error("config error: {0}")]
    Config(String),
}

impl FetchError {
    /// Classify a transport error from `reqwest`.
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Status(status.as_u16())
        } else {
            Self::Network(err.to_string())
        }
    }

    /// Whether a later retry can reasonably succeed.
    ///
    /// Configuration and selector errors are permanent; everything that
    /// depends on the remote side is transient.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::Network(_) | Self::Status(_)
        )
    }
}

/// Convenience type alias for listwatch-fetch results.
pub type Result<T> = std::result::Result<T, FetchError>;
