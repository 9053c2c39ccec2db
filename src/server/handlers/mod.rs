pub mod documents;
pub mod health;
pub mod metrics;
pub mod query;
pub mod vocabulary;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::config::ServerConfig;
use crate::error::MosaicError;

/// Wrapper that converts `MosaicError` into an HTTP response.
pub struct ApiError(pub MosaicError);

impl From<MosaicError> for ApiError {
    fn from(e: MosaicError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        let body = json!({
            "error": self.0.to_string(),
            "status": status,
        });
        (
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            axum::Json(body),
        )
            .into_response()
    }
}

fn default_top_k() -> usize {
    10
}

fn validate_top_k(top_k: usize, server: &ServerConfig) -> Result<(), ApiError> {
    if top_k == 0 {
        return Err(ApiError(MosaicError::Validation("top_k must be > 0".into())));
    }
    if top_k > server.max_top_k {
        return Err(ApiError(MosaicError::Validation(format!(
            "top_k {top_k} exceeds maximum of {}",
            server.max_top_k
        ))));
    }
    Ok(())
}

fn validate_descriptor_count(count: usize, server: &ServerConfig) -> Result<(), ApiError> {
    if count > server.max_descriptors {
        return Err(ApiError(MosaicError::Validation(format!(
            "{count} descriptors exceeds maximum of {}",
            server.max_descriptors
        ))));
    }
    Ok(())
}
