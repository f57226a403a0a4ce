//! RestBackend against a local axum server

use axum::extract::{Query, RawQuery};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use intelview::{
    AppConfig, Backend, EntityKind, EntityOrchestrator, FilterMap, ListMethod, OrchestratorError,
    RestBackend, SearchStatus, SelectionStatus, SharedContext, TimingConfig,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

async fn echo_list(RawQuery(query): RawQuery) -> Json<Value> {
    Json(json!({ "resultRows": [["echo", query.unwrap_or_else(|| "none".to_string())]] }))
}

async fn echo_body(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({ "result": [{ "id": "echo", "name": body.to_string() }] }))
}

async fn profile(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    let id = params.get("id").cloned().unwrap_or_default();
    Json(json!({
        "result": [{
            "equipment": { "id": id, "name": "Leopard 2", "type": "tank" },
            "operators": [{"name": "Germany"}, {"name": "Poland"}]
        }]
    }))
}

async fn suggestions(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    let q = params.get("q").cloned().unwrap_or_default();
    Json(json!({ "titles": [q, "Bradley"] }))
}

async fn countries() -> Json<Value> {
    Json(json!({ "result": [{"name": "Syria"}, {"name": "Iraq"}, {"name": "Syria"}] }))
}

/// Serve a fake API on an ephemeral port; returns its base URL
async fn spawn_api() -> String {
    let app = Router::new()
        .route("/api/equipment", get(echo_list))
        .route("/api/equipment/profile", get(profile))
        .route("/api/search/suggestions", get(suggestions))
        .route("/api/countries", get(countries))
        .route("/api/vessels", post(echo_body))
        .route("/api/broken", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/api", addr)
}

fn context(base: &str) -> Arc<SharedContext> {
    let config = AppConfig {
        api_base_url: Some(base.to_string()),
        timing: TimingConfig {
            debounce_ms: 20,
            ..TimingConfig::default()
        },
        ..AppConfig::default()
    };
    Arc::new(SharedContext::with_config(config))
}

#[tokio::test]
async fn test_get_list_sends_repeated_filter_keys() {
    let base = spawn_api().await;
    let backend = RestBackend::new(context(&base));

    let mut filters = FilterMap::new();
    filters.insert("type".to_string(), vec!["main battle".to_string(), "ifv".to_string()]);
    filters.insert("role".to_string(), Vec::new());

    let raw = backend.fetch_list(&EntityKind::equipment(), &filters).await.unwrap();
    assert_eq!(raw["resultRows"][0][1], "type=main%20battle&type=ifv");

    let raw = backend
        .fetch_list(&EntityKind::equipment(), &FilterMap::new())
        .await
        .unwrap();
    assert_eq!(raw["resultRows"][0][1], "none");
}

#[tokio::test]
async fn test_post_list_sends_filter_body() {
    let base = spawn_api().await;
    let backend = RestBackend::new(context(&base));
    let kind = EntityKind::builder("vessel")
        .list_endpoint("vessels")
        .filters(&["flag"])
        .list_method(ListMethod::Post)
        .build();

    let mut filters = FilterMap::new();
    filters.insert("flag".to_string(), vec!["PA".to_string()]);
    filters.insert("class".to_string(), Vec::new());

    let raw = backend.fetch_list(&kind, &filters).await.unwrap();
    let body: Value = serde_json::from_str(raw["result"][0]["name"].as_str().unwrap()).unwrap();
    assert_eq!(body, json!({"filters": {"flag": ["PA"]}}));
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let base = spawn_api().await;
    let backend = RestBackend::new(context(&base));
    let kind = EntityKind::builder("broken").build();

    let err = backend.fetch_list(&kind, &FilterMap::new()).await.unwrap_err();
    match err {
        OrchestratorError::Status { status, url } => {
            assert_eq!(status, 500);
            assert!(url.ends_with("/api/broken"));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_countries_load_once() {
    let base = spawn_api().await;
    let context = context(&base);
    let backend = RestBackend::new(Arc::clone(&context));

    assert!(context.countries().is_none());
    let countries = context.load_countries(&backend).await;
    assert_eq!(countries, vec!["Iraq", "Syria"]);
    assert_eq!(context.countries().unwrap(), ["Iraq", "Syria"]);
}

#[tokio::test]
async fn test_orchestrator_end_to_end() {
    let base = spawn_api().await;
    let context = context(&base);
    let backend = Arc::new(RestBackend::new(Arc::clone(&context)));
    let orchestrator = EntityOrchestrator::new(EntityKind::equipment(), context, backend);

    orchestrator.start();
    orchestrator.search("Leopard 2");
    let view = orchestrator.settled().await;
    assert_eq!(view.list.items.len(), 1);
    assert_eq!(view.search.status, SearchStatus::Ready);
    assert_eq!(view.search.candidates.len(), 1);
    assert_eq!(view.search.candidates[0].label, "Leopard 2");

    orchestrator.select_by_id("leopard 2/a7");
    let view = orchestrator.settled().await;
    assert_eq!(view.selection.status, SelectionStatus::Ready);
    let profile = view.profile().unwrap();
    assert_eq!(profile.entity_id, "leopard 2/a7");
    assert_eq!(profile.property_str("type"), Some("tank"));
    assert_eq!(profile.relation("operators").len(), 2);
    assert!(profile.relation("variants").is_empty());
}
