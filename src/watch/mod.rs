//! Per-subscriber page watching.
//!
//! A subscriber registers one URL. The [`WatchManager`] persists the binding
//! in a [`TaskStore`], spawns a polling task for it, and keeps both in step.
//! Each polling task fetches the page on a fixed interval, diffs the
//! extracted item ids against the last observed set, and hands new ids to a
//! [`DeliverySink`].
//!
//! ```text
//! start ─► registry check ─► store upsert ─► spawn poller ─► register
//! stop  ─► registry lookup ─► store remove ─► cancel poller ─► unregister
//! boot  ─► store load ─► resolve subscribers ─► spawn pollers (baseline mode)
//! ```

pub mod manager;
pub mod poller;
pub mod registry;
pub mod store;
pub mod traits;
pub mod types;

pub use manager::{ResumeReport, SkippedWatch, WatchManager};
pub use poller::{LaunchMode, ObservedSet, PollHandle, PollOutcome, PollPolicy, PollStatus};
pub use registry::{WatchEntry, WatchRegistry};
pub use store::{JsonTaskStore, MemoryTaskStore, TaskRecords, TaskStore};
pub use traits::{DeliverySink, IdentityResolver, PageFetcher, ResolveError, SubscriberHandle};
pub use types::{SubscriberId, Watch};
