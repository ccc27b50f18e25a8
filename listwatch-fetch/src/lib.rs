//! # listwatch-fetch
//!
//! Downloads listing pages and extracts the identifiers of the entries they
//! list. This is the page-fetching half of listwatch; the polling and diffing
//! engine lives in the main crate and only sees [`ListingFetcher`] through a
//! trait.
//!
//! ## Design
//!
//! - One `GET` per call, no retries. Retry policy belongs to the caller.
//! - Entries are located with two CSS selectors: a card selector and a label
//!   selector evaluated inside each card.
//! - A page that lists nothing is an empty set, never an error.
//! - Page bodies are logged only at trace level.

pub mod config;
pub mod error;
pub mod extract;
pub mod http;

pub use config::FetchConfig;
pub use error::{FetchError, Result};
pub use extract::{ItemSelectors, parse_item_ids};

use std::collections::BTreeSet;
use url::Url;

/// Parse and validate a watch URL.
///
/// Only absolute `http` and `https` URLs are accepted.
///
/// # Errors
///
/// Returns [`FetchError::InvalidUrl`] for empty, relative, or non-http(s) input.
pub fn validate_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(FetchError::InvalidUrl("URL is empty".into()));
    }
    let url = Url::parse(trimmed).map_err(|e| FetchError::InvalidUrl(format!("{trimmed}: {e}")))?;
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(FetchError::InvalidUrl(format!(
                "unsupported scheme `{other}`"
            )));
        }
    }
    if url.host_str().is_none() {
        return Err(FetchError::InvalidUrl(format!("{trimmed}: missing host")));
    }
    Ok(url)
}

/// Reusable listing page fetcher.
///
/// Holds one HTTP client and the compiled selectors, so a single instance can
/// be shared by every polling task.
#[derive(Debug, Clone)]
pub struct ListingFetcher {
    client: reqwest::Client,
    selectors: ItemSelectors,
}

impl ListingFetcher {
    /// Build a fetcher from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Config`] for invalid settings and
    /// [`FetchError::Parse`] for selectors that are not valid CSS.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        config.validate()?;
        let selectors = ItemSelectors::new(&config.card_selector, &config.label_selector)?;
        let client = http::build_client(config)?;
        Ok(Self { client, selectors })
    }

    /// Download `url` and return the identifiers of the entries it lists.
    ///
    /// # Errors
    ///
    /// - [`FetchError::InvalidUrl`] if `url` is not an absolute http(s) URL
    /// - [`FetchError::Timeout`] / [`FetchError::Network`] on transport failure
    /// - [`FetchError::Status`] on a non-success status code
    pub async fn fetch_item_ids(&self, url: &str) -> Result<BTreeSet<String>> {
        let url = validate_url(url)?;
        tracing::trace!(url = %url, "fetching listing page");

        let response = self
            .client
            .get(url.clone())
            .header("Accept", "text/html,application/xhtml+xml")
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let html = response.text().await.map_err(FetchError::from_reqwest)?;
        tracing::trace!(url = %url, bytes = html.len(), "listing page received");

        Ok(parse_item_ids(&html, &self.selectors))
    }
}
