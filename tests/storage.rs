use std::time::Duration;

use canopy::{
    application::store::{LookupStore, StorageError},
    config::{CacheSettings, EnvironmentSettings},
    domain::lookup::{RouteKey, RouteLookup, RouteLookupEnvelope},
    infra::storage::{
        EDGE_CONFIG_STORE_LABEL, EdgeConfigLookupStore, FILE_STORE_LABEL, FileLookupStore,
        lookup_store,
    },
};
use httpmock::{Method::GET, Method::PATCH, MockServer};
use serde_json::json;
use url::Url;

const BUILT_AT: i64 = 1_735_689_600_000;

fn envelope() -> RouteLookupEnvelope {
    let mut lookup = RouteLookup::new();
    lookup.insert(
        &RouteKey::new("funding", "grants-guide").expect("key"),
        "page-a",
    );
    lookup.insert(
        &RouteKey::new("learn", "carbon-basics").expect("key"),
        "page-d",
    );
    RouteLookupEnvelope::new(lookup, BUILT_AT)
}

fn cache_settings(dir: &std::path::Path, edge_config: Option<&str>) -> CacheSettings {
    CacheSettings {
        posts_path: dir.join("posts-cache.json"),
        lookup_path: dir.join("route-lookup-cache.json"),
        lookup_ttl: Duration::from_secs(604_800),
        lookup_key: "route-lookup-cache".to_string(),
        edge_config: edge_config.map(str::to_string),
        edge_config_api_base: Url::parse("https://api.vercel.com").expect("url"),
    }
}

fn stage(name: &str, production: bool) -> EnvironmentSettings {
    EnvironmentSettings {
        stage: name.to_string(),
        production,
    }
}

#[tokio::test]
async fn file_store_round_trips_envelope() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("route-lookup-cache.json");
    let store = FileLookupStore::new(&path);

    assert_eq!(store.get().await.expect("missing file"), None);

    store.set(&envelope()).await.expect("write");
    assert_eq!(store.get().await.expect("read"), Some(envelope()));

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).expect("file")).expect("json");
    assert_eq!(raw["entryCount"], 2);
    assert_eq!(raw["lastUpdated"], BUILT_AT);
    assert_eq!(raw["lookup"]["funding/grants-guide"], "page-a");
}

#[tokio::test]
async fn corrupt_file_is_a_read_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("route-lookup-cache.json");
    std::fs::write(&path, "{\"lookup\": ").expect("seed");

    let err = FileLookupStore::new(&path)
        .get()
        .await
        .expect_err("corrupt file");
    assert!(matches!(err, StorageError::Serde(_)));
}

#[tokio::test]
async fn edge_config_reads_item_with_bearer_token() {
    let server = MockServer::start_async().await;
    let item = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/ecfg_test/item/route-lookup-cache")
                .header("authorization", "Bearer tok-1");
            then.status(200).json_body(json!({
                "lookup": {"funding/grants-guide": "page-a", "learn/carbon-basics": "page-d"},
                "lastUpdated": BUILT_AT,
                "entryCount": 2
            }));
        })
        .await;

    let store = EdgeConfigLookupStore::new(
        &server.url("/ecfg_test?token=tok-1"),
        Url::parse(&server.url("/")).expect("url"),
        "route-lookup-cache".to_string(),
    )
    .expect("store");

    assert_eq!(store.label(), EDGE_CONFIG_STORE_LABEL);
    assert_eq!(store.get().await.expect("read"), Some(envelope()));
    item.assert_async().await;
}

#[tokio::test]
async fn edge_config_missing_item_is_absent() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/ecfg_test/item/route-lookup-cache");
            then.status(404).json_body(json!({"error": {"code": "not_found"}}));
        })
        .await;

    let store = EdgeConfigLookupStore::new(
        &server.url("/ecfg_test?token=tok-1"),
        Url::parse(&server.url("/")).expect("url"),
        "route-lookup-cache".to_string(),
    )
    .expect("store");

    assert_eq!(store.get().await.expect("read"), None);
}

#[tokio::test]
async fn edge_config_writes_upsert_through_rest_api() {
    let server = MockServer::start_async().await;
    let patch = server
        .mock_async(|when, then| {
            when.method(PATCH)
                .path("/v1/edge-config/ecfg_test/items")
                .header("authorization", "Bearer tok-1")
                .body_includes("\"operation\":\"upsert\"")
                .body_includes("\"key\":\"route-lookup-cache\"")
                .body_includes("Route lookup cache - 2 entries, updated 2025-01-01T00:00:00Z");
            then.status(200).json_body(json!({"status": "ok"}));
        })
        .await;

    let store = EdgeConfigLookupStore::new(
        &server.url("/ecfg_test?token=tok-1"),
        Url::parse(&server.url("/")).expect("url"),
        "route-lookup-cache".to_string(),
    )
    .expect("store");

    store.set(&envelope()).await.expect("write");
    patch.assert_async().await;
}

#[tokio::test]
async fn edge_config_rejected_write_is_reported() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(PATCH).path("/v1/edge-config/ecfg_test/items");
            then.status(403).body("forbidden");
        })
        .await;

    let store = EdgeConfigLookupStore::new(
        &server.url("/ecfg_test?token=tok-1"),
        Url::parse(&server.url("/")).expect("url"),
        "route-lookup-cache".to_string(),
    )
    .expect("store");

    let err = store.set(&envelope()).await.expect_err("rejected");
    match err {
        StorageError::Status { status, body } => {
            assert_eq!(status, 403);
            assert_eq!(body, "forbidden");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn backend_selection_follows_stage_and_connection() {
    let dir = tempfile::tempdir().expect("tempdir");
    let connection = "https://edge-config.vercel.com/ecfg_abc?token=tok";

    let cases = [
        (Some(connection), stage("production", true), EDGE_CONFIG_STORE_LABEL),
        (Some(connection), stage("preview", true), EDGE_CONFIG_STORE_LABEL),
        (Some(connection), stage("development", false), FILE_STORE_LABEL),
        (None, stage("production", true), FILE_STORE_LABEL),
        (Some("not a connection"), stage("production", true), FILE_STORE_LABEL),
    ];

    for (edge_config, environment, expected) in cases {
        let store = lookup_store(&cache_settings(dir.path(), edge_config), &environment);
        assert_eq!(store.label(), expected, "{edge_config:?} {}", environment.stage);
    }
}
