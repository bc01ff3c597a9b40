use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use eduhub_core::ConnectionError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Connection(
                ConnectionError::ServiceConstruction { .. }
                | ConnectionError::ReconnectExhausted { .. }
                | ConnectionError::InitializationPending
                | ConnectionError::ShutDown,
            ) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Connection(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            ApiError::Connection(ConnectionError::ServiceConstruction { .. }) => {
                "Platform service unavailable"
            }
            ApiError::Connection(ConnectionError::ReconnectExhausted { .. }) => {
                "Reconnect budget exhausted"
            }
            ApiError::Connection(ConnectionError::InitializationPending) => {
                "Connection still initializing"
            }
            ApiError::Connection(ConnectionError::ShutDown) => "Shutting down",
            ApiError::Connection(err) => {
                tracing::error!("Connection error: {:?}", err);
                "Connection error"
            }
        };

        let body = json!({
            "error": message,
            "details": self.to_string(),
        });

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
