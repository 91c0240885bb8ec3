//! Route definitions for the comparison resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::comparison;
use crate::state::AppState;

/// Routes mounted at `/comparisons`.
///
/// ```text
/// GET    /              list
/// POST   /analyze       analyze (no persistence)
/// POST   /ingest        ingest
/// GET    /check         check
/// GET    /{id}          get_by_id
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(comparison::list))
        .route("/analyze", post(comparison::analyze))
        .route("/ingest", post(comparison::ingest))
        .route("/check", get(comparison::check))
        .route("/{id}", get(comparison::get_by_id))
}
