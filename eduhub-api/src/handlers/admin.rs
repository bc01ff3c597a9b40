use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::{error::ApiResult, AppState};

#[derive(Debug, Serialize, Deserialize)]
pub struct ReconnectResponse {
    pub connected: bool,
}

pub async fn reconnect(
    State(state): State<AppState>,
) -> ApiResult<(StatusCode, Json<ReconnectResponse>)> {
    let connected = state.connection.reconnect().await?;
    let status = if connected {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    Ok((status, Json(ReconnectResponse { connected })))
}
