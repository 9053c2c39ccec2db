use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use ulid::Ulid;

use crate::server::AppState;
use crate::types::Metric;

use super::ApiError;

#[derive(Debug, Serialize)]
pub struct VocabularySummary {
    pub id: Ulid,
    pub name: String,
    pub metric: Metric,
    pub words: usize,
    pub dim: usize,
    pub iterations: usize,
    pub converged: bool,
    pub trained_at: DateTime<Utc>,
}

pub async fn get_vocabulary(
    State(state): State<AppState>,
) -> Result<Json<VocabularySummary>, ApiError> {
    let vocab = state.vocabulary()?;
    Ok(Json(VocabularySummary {
        id: vocab.id(),
        name: vocab.name().to_string(),
        metric: vocab.metric(),
        words: vocab.len(),
        dim: vocab.dim(),
        iterations: vocab.iterations(),
        converged: vocab.converged(),
        trained_at: vocab.trained_at(),
    }))
}
