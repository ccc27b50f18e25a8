//! listwatch: watch listing pages and DM subscribers when new entries appear.
//!
//! # Architecture
//!
//! - **Watch engine** ([`watch`]): one polling task per subscriber, a
//!   registry of live tasks, and a persisted subscriber → URL mapping so
//!   watches survive restarts.
//! - **Page fetching** (`listwatch-fetch`): downloads a page and extracts the
//!   item identifiers it lists.
//! - **Front-end** ([`channels`]): chat adapters that accept `start`/`stop`
//!   commands and deliver findings.

pub mod app_dirs;
pub mod channels;
pub mod config;
pub mod error;
pub mod watch;


pub use config::WatchConfig;
pub use error::{Result, WatchError};
pub use watch::{JsonTaskStore, PollPolicy, SubscriberId, WatchManager};
