use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use eduhub_core::{ConnectionState, HealthReport};
use serde::{Deserialize, Serialize};

use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LivenessResponse {
    pub status: ConnectionState,
    pub checked_at: DateTime<Utc>,
}

/// Probes every sub-service. 200 only while all three answer.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let report = state.connection.check_health().await;
    let status = if report.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}

/// Reports the current state without touching the platform.
pub async fn liveness(State(state): State<AppState>) -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: state.connection.state(),
        checked_at: Utc::now(),
    })
}
