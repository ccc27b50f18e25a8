//! Shared fakes for integration tests.

use async_trait::async_trait;
use listwatch::watch::{
    DeliverySink, IdentityResolver, PageFetcher, ResolveError, SubscriberHandle,
};
use listwatch::{JsonTaskStore, PollPolicy, SubscriberId, WatchManager};
use listwatch_fetch::FetchError;
use std::collections::{BTreeSet, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

pub(crate) const URL_A: &str = "https://listings.example/a";
pub(crate) const URL_B: &str = "https://listings.example/b";

pub(crate) fn ids(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}

/// Replays a script of poll results, then repeats the last successful one.
pub(crate) struct ScriptedFetcher {
    script: Mutex<VecDeque<Result<BTreeSet<String>, FetchError>>>,
    last_ok: Mutex<BTreeSet<String>>,
}

impl ScriptedFetcher {
    pub(crate) fn new(script: Vec<Result<BTreeSet<String>, FetchError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            last_ok: Mutex::new(BTreeSet::new()),
        }
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn extract_item_ids(&self, _url: &Url) -> Result<BTreeSet<String>, FetchError> {
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Ok(set)) => {
                *self.last_ok.lock().unwrap() = set.clone();
                Ok(set)
            }
            Some(Err(e)) => Err(e),
            None => Ok(self.last_ok.lock().unwrap().clone()),
        }
    }
}

/// What a subscriber received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Delivered {
    Findings(SubscriberId, Vec<String>),
    Error(SubscriberId, String),
}

#[derive(Default)]
pub(crate) struct CollectingSink {
    delivered: Mutex<Vec<Delivered>>,
}

impl CollectingSink {
    pub(crate) fn delivered(&self) -> Vec<Delivered> {
        self.delivered.lock().unwrap().clone()
    }

    pub(crate) fn findings(&self) -> Vec<Vec<String>> {
        self.delivered()
            .into_iter()
            .filter_map(|d| match d {
                Delivered::Findings(_, lines) => Some(lines),
                Delivered::Error(..) => None,
            })
            .collect()
    }
}

#[async_trait]
impl DeliverySink for CollectingSink {
    async fn notify(
        &self,
        subscriber: &SubscriberId,
        _title: &str,
        lines: &[String],
    ) -> anyhow::Result<()> {
        self.delivered
            .lock()
            .unwrap()
            .push(Delivered::Findings(subscriber.clone(), lines.to_vec()));
        Ok(())
    }

    async fn error(&self, subscriber: &SubscriberId, message: &str) -> anyhow::Result<()> {
        self.delivered
            .lock()
            .unwrap()
            .push(Delivered::Error(subscriber.clone(), message.to_owned()));
        Ok(())
    }
}

/// Resolves every subscriber.
pub(crate) struct KnownEveryone;

#[async_trait]
impl IdentityResolver for KnownEveryone {
    async fn resolve(&self, id: &SubscriberId) -> Result<SubscriberHandle, ResolveError> {
        Ok(SubscriberHandle {
            id: id.clone(),
            display_name: format!("user {id}"),
        })
    }
}

/// Manager persisting to `state` with the default one-minute policy.
pub(crate) fn json_manager(
    state: &Path,
    fetcher: Arc<dyn PageFetcher>,
    sink: Arc<CollectingSink>,
) -> WatchManager {
    WatchManager::new(
        JsonTaskStore::new(state),
        fetcher,
        sink,
        PollPolicy::default(),
    )
}

/// Poll `condition` every 20ms until it holds or `limit` elapses.
pub(crate) async fn wait_until(limit: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}
