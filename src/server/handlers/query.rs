use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::index::QueryOptions;
use crate::ingest::descriptors_to_features;
use crate::server::{with_index, AppState};
use crate::types::QueryHit;

use super::{default_top_k, validate_descriptor_count, validate_top_k, ApiError};

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub descriptors: Vec<Vec<f32>>,
    #[serde(default)]
    pub packed: bool,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub results: Vec<QueryHit>,
}

/// Similarity search for descriptors that are not in the index.
#[instrument(skip(state, req), fields(descriptors = req.descriptors.len(), top_k = req.top_k))]
pub async fn query_features(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    validate_top_k(req.top_k, &state.config.server)?;
    validate_descriptor_count(req.descriptors.len(), &state.config.server)?;
    let index = state.index()?;

    let features = descriptors_to_features(&req.descriptors, req.packed)?;
    let options = QueryOptions {
        limit: Some(req.top_k),
        max_candidates: state.config.index.max_candidates,
        exclude_self: false,
    };
    let results =
        with_index(index, move |index| index.query_features(&features, &options)).await?;

    info!(results = results.len(), "query complete");
    Ok(Json(QueryResponse { results }))
}
