use crate::watch::types::SubscriberId;
use async_trait::async_trait;
use listwatch_fetch::{FetchError, ListingFetcher};
use std::collections::BTreeSet;
use url::Url;

/// Source of item identifiers for a watched page.
///
/// Implementations perform a single attempt per call. The polling task owns
/// retry cadence and the per-call timeout.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Return the distinct identifiers currently listed at `url`.
    async fn extract_item_ids(&self, url: &Url) -> Result<BTreeSet<String>, FetchError>;
}

#[async_trait]
impl PageFetcher for ListingFetcher {
    async fn extract_item_ids(&self, url: &Url) -> Result<BTreeSet<String>, FetchError> {
        self.fetch_item_ids(url.as_str()).await
    }
}

/// Channel through which findings and poll failures reach a subscriber.
///
/// Delivery is best effort: the engine logs a failed delivery and moves on.
#[async_trait]
pub trait DeliverySink: Send + Sync {
    /// Report newly listed items.
    async fn notify(
        &self,
        subscriber: &SubscriberId,
        title: &str,
        lines: &[String],
    ) -> anyhow::Result<()>;

    /// Report a failed poll.
    async fn error(&self, subscriber: &SubscriberId, message: &str) -> anyhow::Result<()>;
}

/// A subscriber confirmed reachable by the front-end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberHandle {
    pub id: SubscriberId,
    pub display_name: String,
}

/// Failure to resolve a persisted subscriber at resume time.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The front-end does not know this subscriber (deleted account, bad id).
    #[error("subscriber {0} not found")]
    NotFound(SubscriberId),

    /// The lookup itself failed.
    #[error("subscriber lookup failed: {0}")]
    Lookup(String),
}

/// Resolves persisted subscriber ids to reachable identities.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, id: &SubscriberId) -> Result<SubscriberHandle, ResolveError>;
}
