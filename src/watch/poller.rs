//! Polling task: one per active watch.
//!
//! Each task owns its context (subscriber, URL, cancellation token, observed
//! set) and runs until cancelled. Cancellation is only observed between
//! ticks, so at most one fetch is in flight when a stop is requested; a fetch
//! that completes after cancellation delivers nothing.
//!
//! # Diff policy
//!
//! | Poll result | Observed set | Notification |
//! |-------------|--------------|--------------|
//! | fetch error | unchanged | error notice |
//! | empty | cleared | none |
//! | first poll after resume | replaced | none (baseline) |
//! | no new ids | unchanged | none |
//! | new ids | replaced by full result | new ids |
//!
//! The observed set is only replaced when something new shows up. An item
//! that disappears and comes back without any other addition is therefore not
//! reported again.

use crate::watch::traits::{DeliverySink, PageFetcher};
use crate::watch::types::SubscriberId;
use listwatch_fetch::FetchError;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

/// Default interval between two polls of the same page.
const DEFAULT_INTERVAL_SECS: u64 = 60;

/// Default upper bound on one page fetch.
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 5;

/// Timing shared by every polling task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub fetch_timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
        }
    }
}

/// How the first successful poll of a task is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    /// Started on request: everything on the page counts as new.
    Fresh,
    /// Restored after a restart: the first poll only records a baseline.
    Resumed,
}

/// Result of applying one successful poll to an [`ObservedSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The page listed nothing; the observed set was cleared.
    Cleared,
    /// First poll after resume; `count` ids recorded without notifying.
    Baseline { count: usize },
    /// Nothing new.
    Unchanged,
    /// These ids were not in the observed set. Sorted.
    NewItems(Vec<String>),
}

/// Last known item ids for one watch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservedSet {
    ids: BTreeSet<String>,
    awaiting_baseline: bool,
}

impl ObservedSet {
    /// Empty set for the given launch mode.
    pub fn new(mode: LaunchMode) -> Self {
        Self {
            ids: BTreeSet::new(),
            awaiting_baseline: mode == LaunchMode::Resumed,
        }
    }

    pub fn ids(&self) -> &BTreeSet<String> {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn awaiting_baseline(&self) -> bool {
        self.awaiting_baseline
    }

    /// Fold a successful poll into the set.
    pub fn apply(&mut self, current: BTreeSet<String>) -> PollOutcome {
        if current.is_empty() {
            self.ids.clear();
            self.awaiting_baseline = false;
            return PollOutcome::Cleared;
        }

        if self.awaiting_baseline {
            let count = current.len();
            self.ids = current;
            self.awaiting_baseline = false;
            return PollOutcome::Baseline { count };
        }

        let new_ids: Vec<String> = current.difference(&self.ids).cloned().collect();
        if new_ids.is_empty() {
            return PollOutcome::Unchanged;
        }

        self.ids = current;
        PollOutcome::NewItems(new_ids)
    }
}

/// Notification title for `count` new items.
pub fn findings_title(count: usize) -> String {
    format!("{count} item(s) found")
}

/// Read-only progress snapshot published by a polling task after every tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollStatus {
    /// Completed ticks (successful or not).
    pub ticks: u64,
    /// Size of the observed set.
    pub observed: usize,
    /// Whether the next successful poll only records a baseline.
    pub awaiting_baseline: bool,
    /// Notifications sent for new items.
    pub notifications: u64,
    /// Message of the most recent fetch failure, cleared by the next success.
    pub last_error: Option<String>,
}

/// Owner's handle on a running polling task.
pub struct PollHandle {
    cancel: CancellationToken,
    join: JoinHandle<()>,
    status: watch::Receiver<PollStatus>,
}

impl PollHandle {
    /// Request cancellation. Takes effect at the next tick boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Latest published status.
    pub fn status(&self) -> PollStatus {
        self.status.borrow().clone()
    }

    /// Receiver that observes every status update.
    pub fn subscribe(&self) -> watch::Receiver<PollStatus> {
        self.status.clone()
    }

    /// Wait for the task to finish. Does not cancel it.
    pub async fn join(self) {
        if let Err(e) = self.join.await
            && e.is_panic()
        {
            warn!("polling task panicked: {e}");
        }
    }

    /// Cancel and wait for the task to finish.
    pub async fn stop(self) {
        self.cancel();
        self.join().await;
    }

    /// Handle around a task that finishes immediately.
    #[cfg(test)]
    pub(crate) fn detached() -> Self {
        let (_tx, status) = watch::channel(PollStatus::default());
        Self {
            cancel: CancellationToken::new(),
            join: tokio::spawn(async {}),
            status,
        }
    }
}

/// Everything one polling task owns.
struct PollingTask {
    subscriber: SubscriberId,
    url: Url,
    cancel: CancellationToken,
    observed: ObservedSet,
    policy: PollPolicy,
    fetcher: Arc<dyn PageFetcher>,
    sink: Arc<dyn DeliverySink>,
    status: PollStatus,
    status_tx: watch::Sender<PollStatus>,
}

/// Spawn a polling task on the current tokio runtime.
///
/// The first tick fires immediately.
pub fn spawn_poller(
    subscriber: SubscriberId,
    url: Url,
    mode: LaunchMode,
    policy: PollPolicy,
    fetcher: Arc<dyn PageFetcher>,
    sink: Arc<dyn DeliverySink>,
) -> PollHandle {
    let cancel = CancellationToken::new();
    let observed = ObservedSet::new(mode);
    let status = PollStatus {
        awaiting_baseline: observed.awaiting_baseline(),
        ..PollStatus::default()
    };
    let (status_tx, status_rx) = watch::channel(status.clone());

    let task = PollingTask {
        subscriber,
        url,
        cancel: cancel.clone(),
        observed,
        policy,
        fetcher,
        sink,
        status,
        status_tx,
    };

    PollHandle {
        cancel,
        join: tokio::spawn(task.run()),
        status: status_rx,
    }
}

impl PollingTask {
    async fn run(mut self) {
        debug!(subscriber = %self.subscriber, url = %self.url, "polling task started");
        let mut interval = tokio::time::interval(self.policy.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = interval.tick() => {}
            }
            self.tick().await;
        }

        info!(subscriber = %self.subscriber, url = %self.url, "polling task stopped");
    }

    async fn tick(&mut self) {
        let result = self.fetch().await;

        if self.cancel.is_cancelled() {
            debug!(subscriber = %self.subscriber, "poll finished after cancellation, result dropped");
            return;
        }

        match result {
            Err(e) => self.report_failure(e).await,
            Ok(ids) => {
                self.status.last_error = None;
                match self.observed.apply(ids) {
                    PollOutcome::Cleared => {
                        debug!(subscriber = %self.subscriber, "no items listed, observed set cleared");
                    }
                    PollOutcome::Baseline { count } => {
                        info!(subscriber = %self.subscriber, count, "baseline recorded after resume");
                    }
                    PollOutcome::Unchanged => {
                        debug!(subscriber = %self.subscriber, "no new items");
                    }
                    PollOutcome::NewItems(new_ids) => self.report_findings(&new_ids).await,
                }
            }
        }

        self.status.ticks += 1;
        self.status.observed = self.observed.len();
        self.status.awaiting_baseline = self.observed.awaiting_baseline();
        self.status_tx.send_replace(self.status.clone());
    }

    async fn fetch(&self) -> Result<BTreeSet<String>, FetchError> {
        match tokio::time::timeout(
            self.policy.fetch_timeout,
            self.fetcher.extract_item_ids(&self.url),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(format!(
                "no response within {}s",
                self.policy.fetch_timeout.as_secs()
            ))),
        }
    }

    async fn report_failure(&mut self, err: FetchError) {
        if err.is_transient() {
            warn!(subscriber = %self.subscriber, url = %self.url, "poll failed: {err}");
        } else {
            error!(subscriber = %self.subscriber, url = %self.url, "poll cannot succeed: {err}");
        }
        let message = format!("Could not download {}: {err}", self.url);
        if let Err(e) = self.sink.error(&self.subscriber, &message).await {
            warn!(subscriber = %self.subscriber, "error notice not delivered: {e}");
        }
        self.status.last_error = Some(err.to_string());
    }

    async fn report_findings(&mut self, new_ids: &[String]) {
        info!(
            subscriber = %self.subscriber,
            count = new_ids.len(),
            "new items found"
        );
        let title = findings_title(new_ids.len());
        if let Err(e) = self.sink.notify(&self.subscriber, &title, new_ids).await {
            warn!(subscriber = %self.subscriber, "notification not delivered: {e}");
        }
        self.status.notifications += 1;
    }
}
