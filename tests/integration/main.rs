//! Integration test binary. All integration tests are compiled into a single
//! binary.

// Allow unwrap/expect in test code
#![allow(clippy::unwrap_used, clippy::expect_used)]

mod helpers;

mod page_watch_e2e;
mod restart_resume;
mod watch_lifecycle;
