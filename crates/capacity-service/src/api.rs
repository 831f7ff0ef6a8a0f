//! HTTP API for capacity checks, monitoring summaries, health and metrics

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, put},
    Json, Router,
};
use capacity_lib::{
    aggregator,
    cache::TtlCache,
    health::{ComponentStatus, HealthRegistry},
    CapacityCheckRequest, CapacityCheckResult, CapacityChecker, CapacityError, CapacityMetrics,
    LocationAggregate, NodeStats, NodeStatus, StructuredLogger, TelemetrySample, TelemetryStore,
};
use chrono::{DateTime, Utc};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};

/// Shared application state
pub struct AppState {
    pub store: Arc<TelemetryStore>,
    pub checker: CapacityChecker,
    pub health_registry: HealthRegistry,
    pub metrics: CapacityMetrics,
    pub logger: StructuredLogger,
    pub summary_cache: Arc<TtlCache<MonitoringSummary>>,
}

impl AppState {
    pub fn new(
        store: Arc<TelemetryStore>,
        checker: CapacityChecker,
        health_registry: HealthRegistry,
        metrics: CapacityMetrics,
        summary_ttl: Duration,
    ) -> Self {
        Self {
            store,
            checker,
            health_registry,
            metrics,
            logger: StructuredLogger::new("capacity-service"),
            summary_cache: Arc::new(TtlCache::new(summary_ttl)),
        }
    }

    /// Evaluate a capacity check against the current snapshot
    pub fn run_check(&self, request: &CapacityCheckRequest) -> CapacityCheckResult {
        let nodes = self.store.snapshot();

        let start = Instant::now();
        let result = self.checker.check(&nodes, request);
        self.metrics
            .observe_check(start.elapsed().as_secs_f64(), result.can_accommodate);

        self.logger.log_capacity_check(request, &result);
        result
    }

    /// Location and node summary, served from cache while fresh
    pub fn summary(&self) -> MonitoringSummary {
        self.summary_cache.get_or_insert_with(|| {
            let nodes = self.store.snapshot();

            let start = Instant::now();
            let locations = aggregator::aggregate(&nodes);
            self.metrics.observe_aggregation(start.elapsed().as_secs_f64());

            let online = nodes.iter().filter(|n| n.is_online()).count();
            self.metrics
                .set_fleet(nodes.len() as i64, online as i64, locations.len() as i64);

            MonitoringSummary {
                locations,
                nodes,
                generated_at: Utc::now(),
            }
        })
    }
}

/// Dashboard payload: every location aggregate plus the node list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringSummary {
    pub locations: Vec<LocationAggregate>,
    pub nodes: Vec<NodeStats>,
    pub generated_at: DateTime<Utc>,
}

/// API error rendered as `{ "error": ... }`
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

impl From<CapacityError> for ApiError {
    fn from(err: CapacityError) -> Self {
        match err {
            CapacityError::UnknownNode(_) | CapacityError::UnknownAlert { .. } => {
                ApiError::NotFound(err.to_string())
            }
            CapacityError::InvalidTelemetry(_) => ApiError::BadRequest(err.to_string()),
        }
    }
}

/// Capacity check in query-parameter form; every value arrives as a string
#[derive(Debug, Default, Deserialize)]
pub struct CapacityCheckQuery {
    pub location_id: Option<String>,
    pub node_id: Option<String>,
    pub required_memory: Option<String>,
    pub required_disk: Option<String>,
    pub required_cpu: Option<String>,
    pub include_recommendations: Option<String>,
}

impl CapacityCheckQuery {
    pub fn into_request(self) -> Result<CapacityCheckRequest, ApiError> {
        Ok(CapacityCheckRequest {
            location_id: non_empty(self.location_id),
            node_id: non_empty(self.node_id),
            required_memory: parse_amount("required_memory", self.required_memory)?,
            required_disk: parse_amount("required_disk", self.required_disk)?,
            required_cpu: parse_amount("required_cpu", self.required_cpu)?,
            include_recommendations: parse_flag(self.include_recommendations.as_deref()),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_amount(field: &str, value: Option<String>) -> Result<Option<f64>, ApiError> {
    match non_empty(value) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or_else(|| ApiError::BadRequest(format!("{} must be a number, got '{}'", field, raw))),
    }
}

/// `"true"` (any case) or `"1"` enable a flag; anything else disables it
pub fn parse_flag(value: Option<&str>) -> bool {
    matches!(value.map(|v| v.trim().to_ascii_lowercase()).as_deref(), Some("true") | Some("1"))
}

#[derive(Debug, Default, Deserialize)]
pub struct NodeListQuery {
    pub location_id: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MaintenanceRequest {
    pub enabled: bool,
}

/// Liveness: 200 while operational, 503 once a component is unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Result<impl IntoResponse, ApiError> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder.encode(&metric_families, &mut buffer).map_err(|e| {
        error!(error = %e, "Failed to encode metrics");
        ApiError::Internal("failed to encode metrics".to_string())
    })?;

    Ok((
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    ))
}

async fn check_capacity_query(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CapacityCheckQuery>,
) -> Result<Json<CapacityCheckResult>, ApiError> {
    let request = query.into_request()?;
    Ok(Json(state.run_check(&request)))
}

async fn check_capacity_json(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CapacityCheckRequest>,
) -> Json<CapacityCheckResult> {
    Json(state.run_check(&request))
}

async fn monitoring_summary(State(state): State<Arc<AppState>>) -> Json<MonitoringSummary> {
    Json(state.summary())
}

async fn list_nodes(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NodeListQuery>,
) -> Result<Json<Vec<NodeStats>>, ApiError> {
    let status = match non_empty(query.status) {
        Some(raw) => Some(raw.parse::<NodeStatus>().map_err(ApiError::BadRequest)?),
        None => None,
    };
    let location_id = non_empty(query.location_id);

    let nodes = state
        .store
        .snapshot()
        .into_iter()
        .filter(|n| location_id.as_ref().map(|l| &n.location_id == l).unwrap_or(true))
        .filter(|n| status.map(|s| n.status == s).unwrap_or(true))
        .collect();

    Ok(Json(nodes))
}

async fn get_node(
    State(state): State<Arc<AppState>>,
    Path(node_id): Path<String>,
) -> Result<Json<NodeStats>, ApiError> {
    state
        .store
        .get(&node_id)
        .map(Json)
        .ok_or_else(|| CapacityError::UnknownNode(node_id).into())
}

async fn put_telemetry(
    State(state): State<Arc<AppState>>,
    Path(node_id): Path<String>,
    Json(sample): Json<TelemetrySample>,
) -> Result<Json<NodeStats>, ApiError> {
    let outcome = match state.store.ingest(&node_id, sample, Utc::now()) {
        Ok(outcome) => outcome,
        Err(e) => {
            state.metrics.inc_telemetry_rejected();
            return Err(e.into());
        }
    };

    state.metrics.inc_telemetry_samples();
    state.summary_cache.invalidate();

    if outcome.status_changed() {
        state
            .logger
            .log_node_status_change(&node_id, outcome.previous_status, outcome.node.status);
    }
    for alert in &outcome.raised_alerts {
        state.logger.log_alert(&node_id, alert);
    }

    Ok(Json(outcome.node))
}

async fn put_maintenance(
    State(state): State<Arc<AppState>>,
    Path(node_id): Path<String>,
    Json(body): Json<MaintenanceRequest>,
) -> Result<Json<NodeStats>, ApiError> {
    let previous = state
        .store
        .get(&node_id)
        .map(|n| n.status)
        .ok_or_else(|| CapacityError::UnknownNode(node_id.clone()))?;

    let node = state.store.set_maintenance(&node_id, body.enabled, Utc::now())?;
    state.summary_cache.invalidate();

    if previous != node.status {
        state
            .logger
            .log_node_status_change(&node_id, previous, node.status);
    }

    Ok(Json(node))
}

async fn acknowledge_alert(
    State(state): State<Arc<AppState>>,
    Path((node_id, alert_id)): Path<(String, String)>,
) -> Result<Json<NodeStats>, ApiError> {
    let node = state.store.acknowledge_alert(&node_id, &alert_id)?;
    state.summary_cache.invalidate();
    Ok(Json(node))
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route(
            "/api/v1/capacity/check",
            get(check_capacity_query).post(check_capacity_json),
        )
        .route("/api/v1/monitoring/summary", get(monitoring_summary))
        .route("/api/v1/nodes", get(list_nodes))
        .route("/api/v1/nodes/:node_id", get(get_node))
        .route("/api/v1/nodes/:node_id/telemetry", put(put_telemetry))
        .route("/api/v1/nodes/:node_id/maintenance", put(put_maintenance))
        .route(
            "/api/v1/nodes/:node_id/alerts/:alert_id",
            delete(acknowledge_alert),
        )
        .with_state(state)
}

/// Start the API server, stopping when `shutdown` resolves
pub async fn serve(
    port: u16,
    state: Arc<AppState>,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
