pub mod comparison;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /comparisons                    list (paginated, sorted, searchable)
/// /comparisons/analyze            compare two versions (POST, no persistence)
/// /comparisons/ingest             persist a comparison result (POST)
/// /comparisons/check              bidirectional duplicate lookup
/// /comparisons/{id}               full persisted comparison
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/comparisons", comparison::router())
}
