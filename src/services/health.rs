use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::database::models::{Camp, Group, SystemStat, User, STAT_MESSAGES_SENT};
use crate::database::DatabaseManager;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub database: DatabaseHealth,
    pub uptime_seconds: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseHealth {
    pub status: String,
    pub connection_pool_size: u32,
    pub response_time_ms: u64,
}

/// Aggregate numbers shown on the dashboard.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatsResponse {
    pub total_users: i64,
    pub total_groups: i64,
    pub active_camps: i64,
    pub messages_sent: i64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseManager>,
    pub start_time: DateTime<Utc>,
}

/// HTTP dashboard: liveness checks plus the JSON stats endpoint.
pub struct DashboardService {
    pub router: Router,
}

impl DashboardService {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        let state = AppState {
            db,
            start_time: Utc::now(),
        };

        let router = Router::new()
            .route("/health", get(health_check))
            .route("/health/ready", get(readiness_check))
            .route("/health/live", get(liveness_check))
            .route("/api/stats", get(stats))
            .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
            .with_state(state);

        Self { router }
    }
}

async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>, StatusCode> {
    let started = std::time::Instant::now();
    if ping(&state.db).await.is_err() {
        tracing::warn!("Health check failed: database unreachable");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    let now = Utc::now();
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: now,
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: DatabaseHealth {
            status: "healthy".to_string(),
            connection_pool_size: state.db.pool.size(),
            response_time_ms: started.elapsed().as_millis() as u64,
        },
        uptime_seconds: (now - state.start_time).num_seconds().max(0) as u64,
    }))
}

async fn readiness_check(State(state): State<AppState>) -> Result<Json<&'static str>, StatusCode> {
    match ping(&state.db).await {
        Ok(()) => Ok(Json("ready")),
        Err(_) => Err(StatusCode::SERVICE_UNAVAILABLE),
    }
}

async fn liveness_check() -> Json<&'static str> {
    Json("alive")
}

async fn stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, StatusCode> {
    collect_stats(&state.db).await.map(Json).map_err(|e| {
        tracing::error!("Failed to collect dashboard stats: {}", e);
        StatusCode::SERVICE_UNAVAILABLE
    })
}

pub async fn collect_stats(db: &DatabaseManager) -> Result<StatsResponse, sqlx::Error> {
    Ok(StatsResponse {
        total_users: User::count(&db.pool).await?,
        total_groups: Group::count(&db.pool).await?,
        active_camps: Camp::count_active(&db.pool).await?,
        messages_sent: SystemStat::get_count(&db.pool, STAT_MESSAGES_SENT).await?,
        updated_at: Utc::now(),
    })
}

async fn ping(db: &DatabaseManager) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").fetch_one(&db.pool).await?;
    Ok(())
}
