//! Template version entity model and the persisted field snapshot rows.

use formdiff_core::metrics::VersionSummary;
use formdiff_core::snapshot::{FieldSnapshot, Position};
use formdiff_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

/// A row from the `template_versions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TemplateVersion {
    pub id: DbId,
    pub template_id: DbId,
    pub version_number: i32,
    pub page_count: i32,
    pub field_count: i32,
    pub created_at: Timestamp,
}

impl TemplateVersion {
    /// The metadata slice the metrics aggregator needs.
    pub fn summary(&self) -> VersionSummary {
        VersionSummary {
            page_count: self.page_count,
            field_count: self.field_count,
        }
    }
}

/// DTO for creating a new template version.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTemplateVersion {
    pub template_id: DbId,
    pub version_number: i32,
    pub page_count: i32,
}

/// A row from the `template_fields` table.
#[derive(Debug, Clone, FromRow)]
pub struct TemplateFieldRow {
    pub id: DbId,
    pub version_id: DbId,
    pub field_id: String,
    pub field_type: String,
    pub page_number: i32,
    pub near_text: Option<String>,
    pub value_options: Option<Json<Vec<String>>>,
    pub position: Option<Json<Position>>,
}

impl TemplateFieldRow {
    /// Convert the stored row into the domain snapshot type.
    pub fn into_snapshot(self) -> FieldSnapshot {
        FieldSnapshot {
            field_id: self.field_id,
            field_type: self.field_type,
            page_number: self.page_number,
            near_text: self.near_text,
            value_options: self.value_options.map(|Json(v)| v),
            position: self.position.map(|Json(p)| p),
        }
    }
}
