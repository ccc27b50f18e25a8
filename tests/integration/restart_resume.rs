//! Watches survive a process restart through the state file.

use crate::helpers::{CollectingSink, KnownEveryone, ScriptedFetcher, URL_A, URL_B, ids, json_manager};
use async_trait::async_trait;
use listwatch::watch::{IdentityResolver, ResolveError, SubscriberHandle};
use listwatch::{SubscriberId, WatchError};
use std::sync::Arc;
use std::time::Duration;

/// Resolver that has lost track of one subscriber.
struct ForgetsOne(SubscriberId);

#[async_trait]
impl IdentityResolver for ForgetsOne {
    async fn resolve(&self, id: &SubscriberId) -> Result<SubscriberHandle, ResolveError> {
        if id == &self.0 {
            return Err(ResolveError::NotFound(id.clone()));
        }
        Ok(SubscriberHandle {
            id: id.clone(),
            display_name: id.to_string(),
        })
    }
}

#[tokio::test(start_paused = true)]
async fn resumed_watch_records_a_baseline_before_notifying() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("tasks.json");
    let me = SubscriberId::from("1");

    // First process: start a watch, see one finding, shut down.
    let first_sink = Arc::new(CollectingSink::default());
    let first = json_manager(
        &state,
        Arc::new(ScriptedFetcher::new(vec![Ok(ids(&["A"]))])),
        first_sink.clone(),
    );
    first.start(me.clone(), URL_A).await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    first.shutdown().await;
    assert_eq!(first_sink.findings(), vec![vec!["A".to_owned()]]);

    // Second process: the page gained B while we were down.
    let second_sink = Arc::new(CollectingSink::default());
    let second = json_manager(
        &state,
        Arc::new(ScriptedFetcher::new(vec![
            Ok(ids(&["A", "B"])),
            Ok(ids(&["A", "B", "C"])),
        ])),
        second_sink.clone(),
    );
    let report = second.resume_all(&KnownEveryone).await.unwrap();
    assert_eq!(report.resumed, vec![me.clone()]);
    assert_eq!(
        second.watched_url(&me).await.map(|u| u.to_string()),
        Some(URL_A.to_owned())
    );

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(second_sink.delivered().is_empty());

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(second_sink.findings(), vec![vec!["C".to_owned()]]);
    second.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn stopped_watch_is_not_resumed() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("tasks.json");

    let first = json_manager(
        &state,
        Arc::new(ScriptedFetcher::new(Vec::new())),
        Arc::new(CollectingSink::default()),
    );
    first.start(SubscriberId::from("1"), URL_A).await.unwrap();
    first.start(SubscriberId::from("2"), URL_B).await.unwrap();
    first.stop(&SubscriberId::from("1")).await.unwrap();
    first.shutdown().await;

    let second = json_manager(
        &state,
        Arc::new(ScriptedFetcher::new(Vec::new())),
        Arc::new(CollectingSink::default()),
    );
    let report = second.resume_all(&KnownEveryone).await.unwrap();

    assert_eq!(report.resumed, vec![SubscriberId::from("2")]);
    assert_eq!(second.active().await, vec![SubscriberId::from("2")]);
    second.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn unresolvable_subscriber_is_skipped_but_kept_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("tasks.json");
    std::fs::write(
        &state,
        format!(r#"{{"1": "{URL_A}", "2": "{URL_B}", "3": "not a url"}}"#),
    )
    .unwrap();

    let manager = json_manager(
        &state,
        Arc::new(ScriptedFetcher::new(Vec::new())),
        Arc::new(CollectingSink::default()),
    );
    let report = manager
        .resume_all(&ForgetsOne(SubscriberId::from("1")))
        .await
        .unwrap();

    assert_eq!(report.resumed, vec![SubscriberId::from("2")]);
    assert_eq!(report.skipped.len(), 2);
    assert_eq!(manager.persisted().await.unwrap().len(), 3);
    manager.shutdown().await;
}

#[tokio::test]
async fn corrupt_state_file_fails_resume() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("tasks.json");
    std::fs::write(&state, "[1, 2, 3]").unwrap();

    let manager = json_manager(
        &state,
        Arc::new(ScriptedFetcher::new(Vec::new())),
        Arc::new(CollectingSink::default()),
    );
    let err = manager.resume_all(&KnownEveryone).await.unwrap_err();

    assert!(matches!(err, WatchError::Persistence(_)));
    assert!(manager.active().await.is_empty());
}

#[tokio::test]
async fn missing_state_file_resumes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let manager = json_manager(
        &dir.path().join("never-written.json"),
        Arc::new(ScriptedFetcher::new(Vec::new())),
        Arc::new(CollectingSink::default()),
    );

    let report = manager.resume_all(&KnownEveryone).await.unwrap();
    assert!(report.resumed.is_empty());
    assert!(report.skipped.is_empty());
}
