//! Integration tests for the capacity service API endpoints

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use capacity_lib::{
    health::components, CapacityChecker, CapacityCheckResult, CapacityMetrics, CapacityStatus,
    HealthRegistry, NodeStats, NodeStatus, TelemetryStore,
};
use capacity_service::api::{create_router, AppState, ErrorBody, MonitoringSummary};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn new_state() -> Arc<AppState> {
    Arc::new(AppState::new(
        Arc::new(TelemetryStore::new()),
        CapacityChecker::default(),
        HealthRegistry::new(),
        CapacityMetrics::new(),
        Duration::from_secs(30),
    ))
}

fn telemetry(location: &str, memory_used: f64, disk_used: f64, cpu_used: f64) -> Value {
    json!({
        "location_id": location,
        "fqdn": "node.example.com",
        "memory": { "total": 16384.0, "used": memory_used },
        "disk": { "total": 102400.0, "used": disk_used },
        "cpu": { "total": 100.0, "used": cpu_used },
        "servers": { "total": 4, "running": 4, "stopped": 0, "suspended": 0, "installing": 0 }
    })
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Vec<u8>) {
    send(
        app,
        Request::builder().uri(uri).body(Body::empty()).unwrap(),
    )
    .await
}

async fn send_json(app: &Router, method: &str, uri: &str, body: Value) -> (StatusCode, Vec<u8>) {
    send(
        app,
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

async fn report(app: &Router, node_id: &str, sample: Value) {
    let (status, _) = send_json(
        app,
        "PUT",
        &format!("/api/v1/nodes/{}/telemetry", node_id),
        sample,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_healthz_endpoint() {
    let state = new_state();
    state
        .health_registry
        .register(components::TELEMETRY_STORE)
        .await;
    let app = create_router(state);

    let (status, body) = get(&app, "/healthz").await;
    assert_eq!(status, StatusCode::OK);

    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert!(json["components"][components::TELEMETRY_STORE].is_object());
}

#[tokio::test]
async fn test_healthz_unhealthy_returns_503() {
    let state = new_state();
    state
        .health_registry
        .set_unhealthy(components::AGGREGATOR, "Aggregation failed")
        .await;
    let app = create_router(state);

    let (status, _) = get(&app, "/healthz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_readyz_follows_registry() {
    let state = new_state();
    let app = create_router(state.clone());

    let (status, _) = get(&app, "/readyz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    state.health_registry.set_ready(true).await;
    let (status, body) = get(&app, "/readyz").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["ready"], true);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = create_router(new_state());
    report(&app, "n1", telemetry("eu-west", 4096.0, 20480.0, 20.0)).await;
    get(&app, "/api/v1/capacity/check?required_memory=1024").await;

    let (status, body) = get(&app, "/metrics").await;
    assert_eq!(status, StatusCode::OK);

    let text = String::from_utf8_lossy(&body);
    assert!(text.contains("cythro_capacity_checks_total"));
    assert!(text.contains("cythro_capacity_telemetry_samples_total"));
}

#[tokio::test]
async fn test_capacity_check_accommodates_with_recommendations() {
    let app = create_router(new_state());
    report(&app, "n1", telemetry("eu-west", 4096.0, 20480.0, 20.0)).await;
    report(&app, "n2", telemetry("eu-west", 12288.0, 61440.0, 60.0)).await;
    report(&app, "n3", telemetry("us-east", 1024.0, 1024.0, 5.0)).await;

    let (status, body) = get(
        &app,
        "/api/v1/capacity/check?location_id=eu-west&required_memory=2048&required_disk=10240&include_recommendations=true",
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let result: CapacityCheckResult = serde_json::from_slice(&body).unwrap();
    assert!(result.can_accommodate);
    assert_eq!(result.location_status, CapacityStatus::Available);
    assert_eq!(result.available_nodes, 2);
    assert_eq!(result.total_capacity.memory, 32768.0);

    let recommended = result.recommended_nodes.unwrap();
    assert_eq!(recommended[0].node_id, "n1");
    assert!(recommended.iter().all(|r| r.node_id != "n3"));
}

#[tokio::test]
async fn test_capacity_check_post_body() {
    let app = create_router(new_state());
    report(&app, "n1", telemetry("eu-west", 4096.0, 20480.0, 20.0)).await;

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/v1/capacity/check",
        json!({ "node_id": "n1", "required_memory": 64000.0 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let result: CapacityCheckResult = serde_json::from_slice(&body).unwrap();
    assert!(!result.can_accommodate);
    assert!(!result.warnings.is_empty());
    assert!(result.recommended_nodes.is_none());
}

#[tokio::test]
async fn test_capacity_check_unknown_location_warns() {
    let app = create_router(new_state());
    report(&app, "n1", telemetry("eu-west", 4096.0, 20480.0, 20.0)).await;

    let (status, body) = get(&app, "/api/v1/capacity/check?location_id=ap-south").await;
    assert_eq!(status, StatusCode::OK);

    let result: CapacityCheckResult = serde_json::from_slice(&body).unwrap();
    assert!(!result.can_accommodate);
    assert_eq!(result.location_status, CapacityStatus::Full);
    assert!(result.warnings[0].contains("ap-south"));
}

#[tokio::test]
async fn test_capacity_check_rejects_bad_number() {
    let app = create_router(new_state());

    let (status, body) = get(&app, "/api/v1/capacity/check?required_memory=plenty").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let error: ErrorBody = serde_json::from_slice(&body).unwrap();
    assert!(error.error.contains("required_memory"));
}

#[tokio::test]
async fn test_monitoring_summary_groups_locations() {
    let app = create_router(new_state());
    report(&app, "n1", telemetry("eu-west", 4096.0, 20480.0, 20.0)).await;
    report(&app, "n2", telemetry("us-east", 4096.0, 20480.0, 20.0)).await;
    report(&app, "n3", telemetry("eu-west", 16000.0, 20480.0, 20.0)).await;

    let (status, body) = get(&app, "/api/v1/monitoring/summary").await;
    assert_eq!(status, StatusCode::OK);

    let summary: MonitoringSummary = serde_json::from_slice(&body).unwrap();
    assert_eq!(summary.nodes.len(), 3);
    assert_eq!(summary.locations.len(), 2);

    let eu = summary
        .locations
        .iter()
        .find(|l| l.location_id == "eu-west")
        .unwrap();
    assert_eq!(eu.total_nodes, 2);
    assert_eq!(eu.available_nodes, 1);
}

#[tokio::test]
async fn test_summary_cache_invalidated_on_ingest() {
    let app = create_router(new_state());
    report(&app, "n1", telemetry("eu-west", 4096.0, 20480.0, 20.0)).await;

    let (_, body) = get(&app, "/api/v1/monitoring/summary").await;
    let first: MonitoringSummary = serde_json::from_slice(&body).unwrap();
    assert_eq!(first.nodes.len(), 1);

    report(&app, "n2", telemetry("eu-west", 4096.0, 20480.0, 20.0)).await;

    let (_, body) = get(&app, "/api/v1/monitoring/summary").await;
    let second: MonitoringSummary = serde_json::from_slice(&body).unwrap();
    assert_eq!(second.nodes.len(), 2);
}

#[tokio::test]
async fn test_node_lookup_and_filters() {
    let app = create_router(new_state());
    report(&app, "n1", telemetry("eu-west", 4096.0, 20480.0, 20.0)).await;
    report(&app, "n2", telemetry("us-east", 4096.0, 20480.0, 20.0)).await;

    let (status, body) = get(&app, "/api/v1/nodes/n1").await;
    assert_eq!(status, StatusCode::OK);
    let node: NodeStats = serde_json::from_slice(&body).unwrap();
    assert_eq!(node.location_id, "eu-west");
    assert_eq!(node.resources.memory.percentage, 25);

    let (status, _) = get(&app, "/api/v1/nodes/missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = get(&app, "/api/v1/nodes?location_id=us-east").await;
    let nodes: Vec<NodeStats> = serde_json::from_slice(&body).unwrap();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].node_id, "n2");

    let (status, _) = get(&app, "/api/v1/nodes?status=sleeping").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_telemetry_rejected() {
    let app = create_router(new_state());

    let (status, _) = send_json(
        &app,
        "PUT",
        "/api/v1/nodes/n1/telemetry",
        telemetry("", 1.0, 1.0, 1.0),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_maintenance_toggle() {
    let app = create_router(new_state());
    report(&app, "n1", telemetry("eu-west", 4096.0, 20480.0, 20.0)).await;

    let (status, body) = send_json(
        &app,
        "PUT",
        "/api/v1/nodes/n1/maintenance",
        json!({ "enabled": true }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let node: NodeStats = serde_json::from_slice(&body).unwrap();
    assert_eq!(node.status, NodeStatus::Maintenance);

    let (_, body) = get(&app, "/api/v1/capacity/check?location_id=eu-west").await;
    let result: CapacityCheckResult = serde_json::from_slice(&body).unwrap();
    assert!(!result.can_accommodate);
    assert_eq!(result.location_status, CapacityStatus::Maintenance);

    let (_, body) = send_json(
        &app,
        "PUT",
        "/api/v1/nodes/n1/maintenance",
        json!({ "enabled": false }),
    )
    .await;
    let node: NodeStats = serde_json::from_slice(&body).unwrap();
    assert_eq!(node.status, NodeStatus::Online);

    let (status, _) = send_json(
        &app,
        "PUT",
        "/api/v1/nodes/missing/maintenance",
        json!({ "enabled": true }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_acknowledge_alert() {
    let app = create_router(new_state());
    report(&app, "n1", telemetry("eu-west", 16300.0, 20480.0, 20.0)).await;

    let (_, body) = get(&app, "/api/v1/nodes/n1").await;
    let node: NodeStats = serde_json::from_slice(&body).unwrap();
    let alert_id = node.alerts[0].id.clone();

    let uri = format!("/api/v1/nodes/n1/alerts/{}", alert_id);
    let request = Request::builder()
        .method("DELETE")
        .uri(&uri)
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    let node: NodeStats = serde_json::from_slice(&body).unwrap();
    assert!(node.alerts.iter().all(|a| a.id != alert_id));

    let request = Request::builder()
        .method("DELETE")
        .uri(&uri)
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
