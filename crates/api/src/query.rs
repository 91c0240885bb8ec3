//! Shared query parameter types for API handlers.

use serde::Deserialize;

/// Query parameters for the comparison list endpoint
/// (`?page=&page_size=&sort_by=&sort_order=&search=`).
///
/// Raw values; validated into a `formdiff_core::listing::ListRequest`
/// before touching the repository layer.
#[derive(Debug, Deserialize)]
pub struct ComparisonListParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub search: Option<String>,
}
