//! Persisted comparison models: parent row, per-field child rows, and the
//! joined summary used by list queries.

use formdiff_core::diff::{FieldChange, PositionChange};
use formdiff_core::metrics::GlobalMetrics;
use formdiff_core::snapshot::Position;
use formdiff_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;

/// A row from the `comparisons` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Comparison {
    pub id: DbId,
    pub source_version_id: DbId,
    pub target_version_id: DbId,
    pub modification_percentage: f64,
    pub fields_added: i32,
    pub fields_removed: i32,
    pub fields_modified: i32,
    pub fields_unchanged: i32,
    pub created_by: Option<DbId>,
    pub status: String,
    pub created_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

/// A `comparisons` row joined against both versions' metadata, as read by
/// `ComparisonRepo::find_by_id`. Page/field counts live on the version
/// rows; the changed-flags are recomputed from them on read.
#[derive(Debug, Clone, FromRow)]
pub struct ComparisonDetailRow {
    pub id: DbId,
    pub source_version_id: DbId,
    pub target_version_id: DbId,
    pub modification_percentage: f64,
    pub fields_added: i32,
    pub fields_removed: i32,
    pub fields_modified: i32,
    pub fields_unchanged: i32,
    pub created_at: Timestamp,
    pub source_page_count: i32,
    pub source_field_count: i32,
    pub target_page_count: i32,
    pub target_field_count: i32,
}

impl ComparisonDetailRow {
    /// Rebuild the aggregate metrics from the stored row.
    pub fn metrics(&self) -> GlobalMetrics {
        GlobalMetrics {
            source_page_count: self.source_page_count,
            target_page_count: self.target_page_count,
            source_field_count: self.source_field_count,
            target_field_count: self.target_field_count,
            page_count_changed: self.source_page_count != self.target_page_count,
            field_count_changed: self.source_field_count != self.target_field_count,
            fields_added: self.fields_added,
            fields_removed: self.fields_removed,
            fields_modified: self.fields_modified,
            fields_unchanged: self.fields_unchanged,
            modification_percentage: self.modification_percentage,
        }
    }
}

/// A row from the `comparison_fields` table.
#[derive(Debug, Clone, FromRow)]
pub struct ComparisonFieldRow {
    pub id: DbId,
    pub comparison_id: DbId,
    pub field_id: String,
    pub status: String,
    pub field_type: String,
    pub source_page_number: Option<i32>,
    pub target_page_number: Option<i32>,
    pub page_number_changed: bool,
    pub near_text_diff: String,
    pub source_near_text: Option<String>,
    pub target_near_text: Option<String>,
    pub value_options_diff: String,
    pub source_value_options: Option<Json<Vec<String>>>,
    pub target_value_options: Option<Json<Vec<String>>>,
    pub position_diff: String,
    pub source_position: Option<Json<Position>>,
    pub target_position: Option<Json<Position>>,
    pub position_change: Option<Json<PositionChange>>,
}

impl ComparisonFieldRow {
    /// Convert the stored row back into the domain change type.
    ///
    /// The status/diff columns are CHECK-constrained in the schema, so a
    /// parse failure here means a corrupted row and surfaces as a decode
    /// error.
    pub fn into_change(self) -> Result<FieldChange, sqlx::Error> {
        Ok(FieldChange {
            field_id: self.field_id,
            status: self.status.parse().map_err(decode_err)?,
            field_type: self.field_type,
            source_page_number: self.source_page_number,
            target_page_number: self.target_page_number,
            page_number_changed: self.page_number_changed,
            near_text_diff: self.near_text_diff.parse().map_err(decode_err)?,
            source_near_text: self.source_near_text,
            target_near_text: self.target_near_text,
            value_options_diff: self.value_options_diff.parse().map_err(decode_err)?,
            source_value_options: self.source_value_options.map(|Json(v)| v),
            target_value_options: self.target_value_options.map(|Json(v)| v),
            position_diff: self.position_diff.parse().map_err(decode_err)?,
            source_position: self.source_position.map(|Json(p)| p),
            target_position: self.target_position.map(|Json(p)| p),
            position_change: self.position_change.map(|Json(p)| p),
        })
    }
}

fn decode_err(err: formdiff_core::error::CoreError) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(err))
}

/// One comparison in a list response, joined against version and template
/// metadata from both sides.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ComparisonSummary {
    pub id: DbId,
    pub source_version_id: DbId,
    pub source_template_name: String,
    pub source_version_number: i32,
    pub target_version_id: DbId,
    pub target_template_name: String,
    pub target_version_number: i32,
    pub modification_percentage: f64,
    pub fields_added: i32,
    pub fields_removed: i32,
    pub fields_modified: i32,
    pub fields_unchanged: i32,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
}

/// The result of a duplicate lookup: the most recent prior comparison of a
/// version pair, in either direction.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DuplicateMatch {
    pub comparison_id: DbId,
    pub created_at: Timestamp,
}
