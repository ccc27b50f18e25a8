//! Fetcher configuration with sensible defaults.
//!
//! [`FetchConfig`] controls how listing pages are downloaded and which
//! elements count as listing entries. The defaults match the card layout of
//! the housing listing pages the bot was first written for.

use crate::error::FetchError;
use serde::{Deserialize, Serialize};

/// Configuration for downloading and parsing listing pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// CSS selector matching one element per listing entry.
    pub card_selector: String,
    /// CSS selector, relative to a card, whose text is the entry identifier.
    /// Only the first match inside each card is used.
    pub label_selector: String,
    /// HTTP request timeout in seconds.
    pub timeout_seconds: u64,
    /// Maximum number of redirects to follow.
    pub max_redirects: usize,
    /// Custom User-Agent string. If `None`, rotates through a built-in list
    /// of realistic browser User-Agents.
    pub user_agent: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            card_selector: "div.fr-card".to_owned(),
            label_selector: "a".to_owned(),
            timeout_seconds: 5,
            max_redirects: 10,
            user_agent: None,
        }
    }
}

impl FetchConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `timeout_seconds` must be greater than 0
    /// - both selectors must be non-empty
    pub fn validate(&self) -> Result<(), FetchError> {
        if self.timeout_seconds == 0 {
            return Err(FetchError::Config(
                "timeout_seconds must be greater than 0".into(),
            ));
        }
        if self.card_selector.trim().is_empty() {
            return Err(FetchError::Config("card_selector must not be empty".into()));
        }
        if self.label_selector.trim().is_empty() {
            return Err(FetchError::Config(
                "label_selector must not be empty".into(),
            ));
        }
        Ok(())
    }
}
