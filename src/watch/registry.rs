//! In-memory table of live watches.

use crate::watch::poller::{PollHandle, PollStatus};
use crate::watch::types::SubscriberId;
use std::collections::HashMap;
use url::Url;

/// A live watch: the URL being polled and the task polling it.
pub struct WatchEntry {
    pub url: Url,
    pub handle: PollHandle,
}

/// Live watches keyed by subscriber. Holds at most one entry per subscriber.
#[derive(Default)]
pub struct WatchRegistry {
    entries: HashMap<SubscriberId, WatchEntry>,
}

impl WatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, subscriber: &SubscriberId) -> bool {
        self.entries.contains_key(subscriber)
    }

    pub fn get(&self, subscriber: &SubscriberId) -> Option<&WatchEntry> {
        self.entries.get(subscriber)
    }

    /// Register a watch. An existing entry is never replaced; the rejected
    /// entry is handed back instead.
    pub fn insert(&mut self, subscriber: SubscriberId, entry: WatchEntry) -> Result<(), WatchEntry> {
        if self.entries.contains_key(&subscriber) {
            return Err(entry);
        }
        self.entries.insert(subscriber, entry);
        Ok(())
    }

    pub fn remove(&mut self, subscriber: &SubscriberId) -> Option<WatchEntry> {
        self.entries.remove(subscriber)
    }

    /// Registered subscribers, sorted.
    pub fn ids(&self) -> Vec<SubscriberId> {
        let mut ids: Vec<SubscriberId> = self.entries.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn status(&self, subscriber: &SubscriberId) -> Option<PollStatus> {
        self.entries.get(subscriber).map(|entry| entry.handle.status())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every entry.
    pub fn drain(&mut self) -> Vec<(SubscriberId, WatchEntry)> {
        self.entries.drain().collect()
    }
}
