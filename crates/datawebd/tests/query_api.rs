//! JSONP query endpoint tests against the real router.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use datawebd::cache::ReadingCache;
use datawebd::server;
use dataweb_common::{Block, BlockStatus, CacheEntry, Reading};
use http_body_util::BodyExt;
use serde_json::json;
use std::collections::BTreeMap;
use tower::util::ServiceExt;

async fn get(app: Router, uri: &str) -> (StatusCode, String) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

fn sample_reading() -> Reading {
    let mut reading = Reading::new("larmor_base");
    let mut blocks = BTreeMap::new();
    blocks.insert(
        "Temp1".to_string(),
        Block::new("Temp1", BlockStatus::Connected, json!(42), "NONE", true, "K").details(),
    );
    blocks.insert(
        "Spare".to_string(),
        Block::disconnected("Spare").details(),
    );
    reading.groups.insert("TEMPERATURE".to_string(), blocks);
    reading.inst_pvs.insert(
        "RUNSTATE".to_string(),
        Block::new("RUNSTATE", BlockStatus::Connected, json!("RUNNING"), "", true, "").details(),
    );
    reading
}

/// Cache with one live instrument and one that has failed its last poll.
async fn populated_cache() -> ReadingCache {
    let cache = ReadingCache::new();
    cache
        .set("LARMOR", CacheEntry::Present(sample_reading()))
        .await;
    cache.set("IMAT", CacheEntry::Unavailable).await;
    cache
}

#[tokio::test]
async fn test_liveness_summary_for_all() {
    let app = server::app(populated_cache().await);
    let (status, body) = get(app, "/?callback=myFunc&Instrument=ALL").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"myFunc({"IMAT":false,"LARMOR":true})"#);
}

#[tokio::test]
async fn test_liveness_summary_empty_cache() {
    let app = server::app(ReadingCache::new());
    let (status, body) = get(app, "/?callback=cb&Instrument=ALL").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "cb({})");
}

#[tokio::test]
async fn test_detail_round_trips_the_reading() {
    let app = server::app(populated_cache().await);
    let (status, body) = get(app, "/?callback=showInst&Instrument=LARMOR").await;

    assert_eq!(status, StatusCode::OK);
    let payload = body
        .strip_prefix("showInst(")
        .and_then(|b| b.strip_suffix(')'))
        .expect("JSONP wrapper");
    let reading: Reading = serde_json::from_str(payload).unwrap();
    assert_eq!(reading, sample_reading());
}

#[tokio::test]
async fn test_instrument_name_is_case_insensitive() {
    let app = server::app(populated_cache().await);
    let (status, body) = get(app, "/?callback=cb&Instrument=larmor").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("larmor_base"));
}

#[tokio::test]
async fn test_unavailable_instrument_is_rejected() {
    let app = server::app(populated_cache().await);
    let (status, body) = get(app, "/?callback=cb&Instrument=IMAT").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("unavailable"));
}

#[tokio::test]
async fn test_unknown_instrument_is_rejected() {
    let app = server::app(populated_cache().await);
    let (status, _body) = get(app, "/?callback=cb&Instrument=NONESUCH").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_callback_is_rejected() {
    let app = server::app(populated_cache().await);
    let (status, _body) = get(app, "/?Instrument=LARMOR").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_instrument_is_rejected() {
    let app = server::app(populated_cache().await);
    let (status, _body) = get(app, "/?callback=cb").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_callback_is_rejected() {
    let app = server::app(populated_cache().await);
    let (status, _body) = get(app, "/?callback=window.alert&Instrument=LARMOR").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_content_type_matches_original_server() {
    let app = server::app(populated_cache().await);
    let response = app
        .oneshot(
            Request::builder()
                .uri("/?callback=cb&Instrument=ALL")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "text/html"
    );
}
