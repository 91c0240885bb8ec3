//! Handlers for the `/comparisons` resource.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use formdiff_core::comparison::ComparisonResult;
use formdiff_core::diff::FieldChange;
use formdiff_core::error::CoreError;
use formdiff_core::listing::ListRequest;
use formdiff_core::metrics::GlobalMetrics;
use formdiff_core::types::{DbId, Timestamp};
use formdiff_db::models::comparison::ComparisonSummary;
use formdiff_db::repositories::ComparisonRepo;

use crate::engine::assembler;
use crate::error::{AppError, AppResult};
use crate::query::ComparisonListParams;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response payload types
// ---------------------------------------------------------------------------

/// Body of POST /comparisons/analyze.
#[derive(Debug, Deserialize, Validate)]
pub struct AnalyzeRequest {
    #[validate(range(min = 1))]
    pub source_version_id: DbId,
    #[validate(range(min = 1))]
    pub target_version_id: DbId,
}

/// Body of POST /comparisons/ingest: a full comparison result payload,
/// typically produced by a prior analyze call.
#[derive(Debug, Deserialize, Validate)]
pub struct IngestRequest {
    #[validate(range(min = 1))]
    pub source_version_id: DbId,
    #[validate(range(min = 1))]
    pub target_version_id: DbId,
    pub metrics: GlobalMetrics,
    pub field_changes: Vec<FieldChange>,
    pub created_by: Option<DbId>,
    /// When false (the default), a prior comparison of the same version
    /// pair answers 409 instead of writing a duplicate row.
    #[serde(default)]
    pub allow_duplicate: bool,
}

/// 201 body for a successful ingest.
#[derive(Debug, Serialize)]
pub struct IngestAccepted {
    pub id: DbId,
}

/// Query parameters for GET /comparisons/check.
#[derive(Debug, Deserialize, Validate)]
pub struct CheckParams {
    #[validate(range(min = 1))]
    pub source_version_id: DbId,
    #[validate(range(min = 1))]
    pub target_version_id: DbId,
}

/// Response of GET /comparisons/check.
#[derive(Debug, Serialize)]
pub struct DuplicateCheckResponse {
    pub exists: bool,
    pub comparison_id: Option<DbId>,
    pub created_at: Option<Timestamp>,
}

/// Response of GET /comparisons.
#[derive(Debug, Serialize)]
pub struct ComparisonListResponse {
    pub items: Vec<ComparisonSummary>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/comparisons/analyze
///
/// Compare two versions and return the result without persisting it;
/// `analyzed_at` stays null until the payload is ingested.
pub async fn analyze(
    State(state): State<AppState>,
    Json(payload): Json<AnalyzeRequest>,
) -> AppResult<Json<DataResponse<ComparisonResult>>> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let result = assembler::analyze(
        &state.pool,
        payload.source_version_id,
        payload.target_version_id,
    )
    .await?;
    Ok(Json(DataResponse { data: result }))
}

/// POST /api/v1/comparisons/ingest
///
/// Persist a comparison result. Unless `allow_duplicate` is set, an
/// existing comparison of the same version pair (in either direction)
/// answers 409 with the existing id. The check is advisory: two concurrent
/// ingests of the same pair can both pass it and both commit.
pub async fn ingest(
    State(state): State<AppState>,
    Json(payload): Json<IngestRequest>,
) -> AppResult<Response> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    if !payload.allow_duplicate {
        let existing = ComparisonRepo::find_existing_pair(
            &state.pool,
            payload.source_version_id,
            payload.target_version_id,
        )
        .await?;
        if let Some(existing) = existing {
            let body = json!({
                "error": "A comparison of these versions already exists",
                "code": "DUPLICATE_COMPARISON",
                "existing_comparison_id": existing.comparison_id,
                "created_at": existing.created_at,
            });
            return Ok((StatusCode::CONFLICT, Json(body)).into_response());
        }
    }

    let result = ComparisonResult {
        source_version_id: payload.source_version_id,
        target_version_id: payload.target_version_id,
        metrics: payload.metrics,
        field_changes: payload.field_changes,
        analyzed_at: None,
    };

    let id = ComparisonRepo::save(&state.pool, &result, payload.created_by).await?;
    Ok((StatusCode::CREATED, Json(IngestAccepted { id })).into_response())
}

/// GET /api/v1/comparisons/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ComparisonResult>>> {
    let result = ComparisonRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Comparison",
            id,
        }))?;
    Ok(Json(DataResponse { data: result }))
}

/// GET /api/v1/comparisons
///
/// Paginated, sorted, searchable comparison summaries. An unrecognized
/// sort field is a validation error, not a silent fallback.
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ComparisonListParams>,
) -> AppResult<Json<ComparisonListResponse>> {
    let request = ListRequest::new(
        params.page,
        params.page_size,
        params.sort_by.as_deref(),
        params.sort_order.as_deref(),
        params.search,
    )?;

    let (items, total) = ComparisonRepo::list(&state.pool, &request).await?;
    Ok(Json(ComparisonListResponse {
        total_pages: request.total_pages(total),
        total,
        page: request.page,
        page_size: request.page_size,
        items,
    }))
}

/// GET /api/v1/comparisons/check
///
/// Bidirectional duplicate lookup. Existence is a normal query result,
/// never an error.
pub async fn check(
    State(state): State<AppState>,
    Query(params): Query<CheckParams>,
) -> AppResult<Json<DuplicateCheckResponse>> {
    params
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let found = ComparisonRepo::find_existing_pair(
        &state.pool,
        params.source_version_id,
        params.target_version_id,
    )
    .await?;

    Ok(Json(match found {
        Some(m) => DuplicateCheckResponse {
            exists: true,
            comparison_id: Some(m.comparison_id),
            created_at: Some(m.created_at),
        },
        None => DuplicateCheckResponse {
            exists: false,
            comparison_id: None,
            created_at: None,
        },
    }))
}
