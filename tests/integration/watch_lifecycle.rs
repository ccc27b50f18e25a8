//! Start/stop behaviour of the watch manager against a file-backed store.

use crate::helpers::{
    CollectingSink, Delivered, ScriptedFetcher, URL_A, URL_B, ids, json_manager,
};
use listwatch::{SubscriberId, WatchError};
use listwatch_fetch::FetchError;
use std::sync::Arc;
use std::time::Duration;

fn read_state(path: &std::path::Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[tokio::test(start_paused = true)]
async fn state_file_is_a_flat_subscriber_to_url_object() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("tasks.json");
    let manager = json_manager(
        &state,
        Arc::new(ScriptedFetcher::new(Vec::new())),
        Arc::new(CollectingSink::default()),
    );

    manager
        .start(SubscriberId::from(111_u64), URL_A)
        .await
        .unwrap();
    manager
        .start(SubscriberId::from(222_u64), URL_B)
        .await
        .unwrap();

    assert_eq!(
        read_state(&state),
        serde_json::json!({ "111": URL_A, "222": URL_B })
    );

    manager.stop(&SubscriberId::from(111_u64)).await.unwrap();
    assert_eq!(read_state(&state), serde_json::json!({ "222": URL_B }));

    manager.stop(&SubscriberId::from(222_u64)).await.unwrap();
    assert_eq!(read_state(&state), serde_json::json!({}));
}

#[tokio::test(start_paused = true)]
async fn fresh_watch_reports_everything_then_only_additions() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(CollectingSink::default());
    let fetcher = ScriptedFetcher::new(vec![
        Ok(ids(&["A", "B"])),
        Ok(ids(&["A", "B"])),
        Ok(ids(&["A", "B", "C"])),
        Ok(ids(&["B", "C"])),
    ]);
    let manager = json_manager(
        &dir.path().join("tasks.json"),
        Arc::new(fetcher),
        sink.clone(),
    );

    manager.start(SubscriberId::from("1"), URL_A).await.unwrap();
    tokio::time::sleep(Duration::from_secs(3 * 60 + 1)).await;
    manager.shutdown().await;

    assert_eq!(
        sink.findings(),
        vec![
            vec!["A".to_owned(), "B".to_owned()],
            vec!["C".to_owned()],
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn fetch_errors_are_reported_and_polling_continues() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(CollectingSink::default());
    let fetcher = ScriptedFetcher::new(vec![
        Err(FetchError::Status(503)),
        Ok(ids(&["A"])),
    ]);
    let manager = json_manager(
        &dir.path().join("tasks.json"),
        Arc::new(fetcher),
        sink.clone(),
    );
    let me = SubscriberId::from("1");

    manager.start(me.clone(), URL_A).await.unwrap();
    tokio::time::sleep(Duration::from_secs(61)).await;

    let delivered = sink.delivered();
    assert_eq!(delivered.len(), 2);
    assert!(matches!(
        &delivered[0],
        Delivered::Error(who, message)
            if who == &me && message.contains(URL_A) && message.contains("HTTP status 503")
    ));
    assert_eq!(delivered[1], Delivered::Findings(me.clone(), vec!["A".to_owned()]));
    assert_eq!(manager.active().await, vec![me]);
    manager.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn rejected_commands_leave_state_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("tasks.json");
    let manager = json_manager(
        &state,
        Arc::new(ScriptedFetcher::new(Vec::new())),
        Arc::new(CollectingSink::default()),
    );
    let me = SubscriberId::from("1");

    assert!(matches!(
        manager.stop(&me).await,
        Err(WatchError::NotWatching(_))
    ));
    assert!(!state.exists());

    assert!(matches!(
        manager.start(me.clone(), "").await,
        Err(WatchError::InvalidInput(_))
    ));
    assert!(!state.exists());

    manager.start(me.clone(), URL_A).await.unwrap();
    let before = std::fs::read_to_string(&state).unwrap();
    assert!(matches!(
        manager.start(me.clone(), URL_B).await,
        Err(WatchError::AlreadyWatching(_))
    ));
    assert_eq!(std::fs::read_to_string(&state).unwrap(), before);
    manager.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn stopped_watch_sends_nothing_more() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(CollectingSink::default());
    let fetcher = ScriptedFetcher::new(vec![Ok(ids(&["A"])), Ok(ids(&["A", "B"]))]);
    let manager = json_manager(
        &dir.path().join("tasks.json"),
        Arc::new(fetcher),
        sink.clone(),
    );
    let me = SubscriberId::from("1");

    manager.start(me.clone(), URL_A).await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    manager.stop(&me).await.unwrap();
    tokio::time::sleep(Duration::from_secs(10 * 60)).await;

    assert_eq!(sink.findings(), vec![vec!["A".to_owned()]]);
    assert!(manager.status(&me).await.is_none());
}
