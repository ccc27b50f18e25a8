//! Start/stop/resume orchestration.
//!
//! [`WatchManager`] is the only writer of both the [`WatchRegistry`] and the
//! [`TaskStore`]. Both live behind one async mutex, so start and stop calls
//! (for any subscribers) serialize their read-modify-write of the persisted
//! mapping and the registry never drifts from the store.
//!
//! Every transaction writes the store first and touches the registry only
//! once the write succeeded. A persistence failure therefore aborts the
//! operation with nothing changed.

use crate::error::{Result, WatchError};
use crate::watch::poller::{LaunchMode, PollPolicy, PollStatus, spawn_poller};
use crate::watch::registry::{WatchEntry, WatchRegistry};
use crate::watch::store::{TaskRecords, TaskStore};
use crate::watch::traits::{DeliverySink, IdentityResolver, PageFetcher};
use crate::watch::types::{SubscriberId, Watch};
use listwatch_fetch::FetchError;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use url::Url;

/// Persisted watch that was not restarted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedWatch {
    pub subscriber: SubscriberId,
    pub reason: String,
}

/// Outcome of [`WatchManager::resume_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResumeReport {
    pub resumed: Vec<SubscriberId>,
    pub skipped: Vec<SkippedWatch>,
}

/// Registry and store, always locked together.
struct WatchState {
    registry: WatchRegistry,
    store: Box<dyn TaskStore>,
}

/// Owner of every watch in the process.
pub struct WatchManager {
    state: Mutex<WatchState>,
    fetcher: Arc<dyn PageFetcher>,
    sink: Arc<dyn DeliverySink>,
    policy: PollPolicy,
}

impl WatchManager {
    pub fn new(
        store: impl TaskStore + 'static,
        fetcher: Arc<dyn PageFetcher>,
        sink: Arc<dyn DeliverySink>,
        policy: PollPolicy,
    ) -> Self {
        Self {
            state: Mutex::new(WatchState {
                registry: WatchRegistry::new(),
                store: Box::new(store),
            }),
            fetcher,
            sink,
            policy,
        }
    }

    /// Start watching `url` for `subscriber`.
    ///
    /// # Errors
    ///
    /// - [`WatchError::InvalidInput`] if `url` is empty or not an absolute http(s) URL
    /// - [`WatchError::AlreadyWatching`] if the subscriber already has a watch
    /// - [`WatchError::Persistence`] if the record cannot be written
    ///
    /// No state changes on error.
    pub async fn start(&self, subscriber: SubscriberId, url: &str) -> Result<()> {
        let url = listwatch_fetch::validate_url(url).map_err(|e| match e {
            FetchError::InvalidUrl(reason) => WatchError::InvalidInput(reason),
            other => WatchError::InvalidInput(other.to_string()),
        })?;

        let mut state = self.state.lock().await;
        if state.registry.contains(&subscriber) {
            return Err(WatchError::AlreadyWatching(subscriber));
        }

        state.store.upsert(&subscriber, url.as_str())?;

        let watch = Watch {
            subscriber: subscriber.clone(),
            url,
        };
        self.launch(&mut state.registry, watch, LaunchMode::Fresh)?;
        info!(subscriber = %subscriber, "watch started");
        Ok(())
    }

    /// Stop the subscriber's watch and wait for its polling task to exit.
    ///
    /// # Errors
    ///
    /// - [`WatchError::NotWatching`] if the subscriber has no watch
    /// - [`WatchError::Persistence`] if the record cannot be removed; the
    ///   watch keeps running in that case
    pub async fn stop(&self, subscriber: &SubscriberId) -> Result<()> {
        let entry = {
            let mut state = self.state.lock().await;
            if !state.registry.contains(subscriber) {
                return Err(WatchError::NotWatching(subscriber.clone()));
            }

            state.store.remove(subscriber)?;

            let Some(entry) = state.registry.remove(subscriber) else {
                return Err(WatchError::NotWatching(subscriber.clone()));
            };
            entry.handle.cancel();
            entry
        };

        entry.handle.join().await;
        info!(subscriber = %subscriber, url = %entry.url, "watch stopped");
        Ok(())
    }

    /// Restart a polling task for every persisted record.
    ///
    /// Records whose URL no longer parses, whose subscriber cannot be
    /// resolved, or that are already running are skipped and listed in the
    /// report; their persisted record is kept. Resumed tasks start in
    /// baseline mode: their first successful poll never notifies.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Persistence`] if the store cannot be read.
    pub async fn resume_all(&self, resolver: &dyn IdentityResolver) -> Result<ResumeReport> {
        let mut state = self.state.lock().await;
        let records = state.store.load_all()?;
        let mut report = ResumeReport::default();
        let mut ready = Vec::with_capacity(records.len());

        for (subscriber, raw_url) in records {
            if state.registry.contains(&subscriber) {
                report.skipped.push(SkippedWatch {
                    subscriber,
                    reason: "already running".to_owned(),
                });
                continue;
            }

            let url = match listwatch_fetch::validate_url(&raw_url) {
                Ok(url) => url,
                Err(e) => {
                    warn!(subscriber = %subscriber, "persisted watch has a bad URL: {e}");
                    report.skipped.push(SkippedWatch {
                        subscriber,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            match resolver.resolve(&subscriber).await {
                Ok(handle) => {
                    info!(subscriber = %subscriber, name = %handle.display_name, "resuming watch");
                    ready.push(Watch { subscriber, url });
                }
                Err(e) => {
                    warn!(subscriber = %subscriber, "cannot resume watch: {e}");
                    report.skipped.push(SkippedWatch {
                        subscriber,
                        reason: e.to_string(),
                    });
                }
            }
        }

        for watch in ready {
            let subscriber = watch.subscriber.clone();
            match self.launch(&mut state.registry, watch, LaunchMode::Resumed) {
                Ok(()) => report.resumed.push(subscriber),
                Err(e) => report.skipped.push(SkippedWatch {
                    subscriber,
                    reason: e.to_string(),
                }),
            }
        }

        info!(
            resumed = report.resumed.len(),
            skipped = report.skipped.len(),
            "resume complete"
        );
        Ok(report)
    }

    /// Subscribers with a live watch, sorted.
    pub async fn active(&self) -> Vec<SubscriberId> {
        self.state.lock().await.registry.ids()
    }

    /// Current content of the task store.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Persistence`] if the store cannot be read.
    pub async fn persisted(&self) -> Result<TaskRecords> {
        self.state.lock().await.store.load_all()
    }

    pub async fn watched_url(&self, subscriber: &SubscriberId) -> Option<Url> {
        self.state
            .lock()
            .await
            .registry
            .get(subscriber)
            .map(|entry| entry.url.clone())
    }

    /// Latest status of the subscriber's polling task.
    pub async fn status(&self, subscriber: &SubscriberId) -> Option<PollStatus> {
        self.state.lock().await.registry.status(subscriber)
    }

    /// Cancel every polling task and wait for all of them.
    ///
    /// Persisted records are kept so the watches resume on next start.
    pub async fn shutdown(&self) {
        let entries = self.state.lock().await.registry.drain();
        if entries.is_empty() {
            return;
        }

        for (_, entry) in &entries {
            entry.handle.cancel();
        }
        let count = entries.len();
        futures_util::future::join_all(entries.into_iter().map(|(_, entry)| entry.handle.join()))
            .await;
        info!(count, "all polling tasks stopped");
    }

    fn launch(&self, registry: &mut WatchRegistry, watch: Watch, mode: LaunchMode) -> Result<()> {
        let handle = spawn_poller(
            watch.subscriber.clone(),
            watch.url.clone(),
            mode,
            self.policy,
            Arc::clone(&self.fetcher),
            Arc::clone(&self.sink),
        );
        let entry = WatchEntry {
            url: watch.url,
            handle,
        };

        if let Err(duplicate) = registry.insert(watch.subscriber.clone(), entry) {
            // The registry was checked under the same lock; never leave two pollers running.
            error!(subscriber = %watch.subscriber, "duplicate watch launch rejected");
            duplicate.handle.cancel();
            return Err(WatchError::AlreadyWatching(watch.subscriber));
        }
        Ok(())
    }
}
