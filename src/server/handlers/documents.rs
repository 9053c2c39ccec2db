use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::MosaicError;
use crate::index::QueryOptions;
use crate::ingest::descriptors_to_features;
use crate::server::{with_index, AppState};
use crate::types::{AddOutcome, DocId, QueryHit};

use super::{default_top_k, validate_descriptor_count, validate_top_k, ApiError};

#[derive(Debug, Deserialize)]
pub struct AddDocumentRequest {
    pub name: String,
    #[serde(default)]
    pub descriptors: Vec<Vec<f32>>,
    /// Descriptor values are bytes to be bit-expanded.
    #[serde(default)]
    pub packed: bool,
}

#[derive(Debug, Serialize)]
pub struct AddDocumentResponse {
    pub doc_id: DocId,
    /// `false` when a document with this name was already indexed.
    pub indexed: bool,
    /// Postings written; absent for a skipped duplicate.
    pub words: Option<usize>,
}

impl From<AddOutcome> for AddDocumentResponse {
    fn from(outcome: AddOutcome) -> Self {
        match outcome {
            AddOutcome::Indexed { doc_id, words } => Self {
                doc_id,
                indexed: true,
                words: Some(words),
            },
            AddOutcome::Skipped { doc_id } => Self {
                doc_id,
                indexed: false,
                words: None,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SimilarParams {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_include_self")]
    pub include_self: bool,
}

fn default_include_self() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct SimilarResponse {
    pub query: String,
    pub results: Vec<QueryHit>,
}

#[instrument(skip(state, req), fields(name = %req.name, descriptors = req.descriptors.len()))]
pub async fn add_document(
    State(state): State<AppState>,
    Json(req): Json<AddDocumentRequest>,
) -> Result<(StatusCode, Json<AddDocumentResponse>), ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError(MosaicError::Validation(
            "document name must not be empty".into(),
        )));
    }
    validate_descriptor_count(req.descriptors.len(), &state.config.server)?;
    let index = state.index()?;

    let features = descriptors_to_features(&req.descriptors, req.packed)?;
    let name = req.name;
    let outcome = with_index(index, move |index| index.add_document(&name, &features)).await?;

    let status = if outcome.is_indexed() {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(outcome.into())))
}

#[instrument(skip(state, params), fields(top_k = params.top_k))]
pub async fn similar_documents(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<SimilarParams>,
) -> Result<Json<SimilarResponse>, ApiError> {
    validate_top_k(params.top_k, &state.config.server)?;
    let index = state.index()?;

    let options = QueryOptions {
        limit: Some(params.top_k),
        max_candidates: state.config.index.max_candidates,
        exclude_self: !params.include_self,
    };
    let query = name.clone();
    let results = with_index(index, move |index| index.query(&query, &options)).await?;

    info!(results = results.len(), "similar documents");
    Ok(Json(SimilarResponse {
        query: name,
        results,
    }))
}
