//! Real fetcher against a local listing page, with a short poll interval.

use crate::helpers::{CollectingSink, wait_until};
use listwatch::{JsonTaskStore, PollPolicy, SubscriberId, WatchManager};
use listwatch_fetch::{FetchConfig, ListingFetcher};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn page(titles: &[&str]) -> String {
    let cards: String = titles
        .iter()
        .enumerate()
        .map(|(n, title)| {
            format!(r#"<div class="fr-card svelte-12dfls6"><h3><a href="/l/{n}">{title}</a></h3></div>"#)
        })
        .collect();
    format!("<html><body><main>{cards}</main></body></html>")
}

#[tokio::test]
async fn new_listing_on_served_page_is_delivered() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/annonces"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(page(&["Studio Croix-Rousse", "T2 Jean Macé"])),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/annonces"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page(&[
            "Studio Croix-Rousse",
            "T2 Jean Macé",
            "T1 Guillotière",
        ])))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(CollectingSink::default());
    let manager = WatchManager::new(
        JsonTaskStore::new(dir.path().join("tasks.json")),
        Arc::new(ListingFetcher::new(&FetchConfig::default()).unwrap()),
        sink.clone(),
        PollPolicy {
            interval: Duration::from_millis(150),
            fetch_timeout: Duration::from_secs(5),
        },
    );
    let me = SubscriberId::from("42");

    manager
        .start(me.clone(), &format!("{}/annonces", server.uri()))
        .await
        .unwrap();

    let delivered = wait_until(Duration::from_secs(10), || sink.findings().len() >= 2).await;
    manager.stop(&me).await.unwrap();

    assert!(delivered, "expected two notifications, got {:?}", sink.delivered());
    let findings = sink.findings();
    assert_eq!(
        findings[0],
        vec!["Studio Croix-Rousse".to_owned(), "T2 Jean Macé".to_owned()]
    );
    assert_eq!(findings[1], vec!["T1 Guillotière".to_owned()]);
}

#[tokio::test]
async fn unreachable_page_produces_error_notices() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(CollectingSink::default());
    let manager = WatchManager::new(
        JsonTaskStore::new(dir.path().join("tasks.json")),
        Arc::new(ListingFetcher::new(&FetchConfig::default()).unwrap()),
        sink.clone(),
        PollPolicy {
            interval: Duration::from_millis(100),
            fetch_timeout: Duration::from_secs(5),
        },
    );
    let me = SubscriberId::from("42");
    manager.start(me.clone(), &server.uri()).await.unwrap();

    let reported = wait_until(Duration::from_secs(10), || sink.delivered().len() >= 2).await;
    manager.shutdown().await;

    assert!(reported);
    assert!(sink.findings().is_empty());
    assert_eq!(manager.persisted().await.unwrap().len(), 1);
}
