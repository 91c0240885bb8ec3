//! Repository for the `template_versions` and `template_fields` tables.
//!
//! This is the field snapshot store: versions and their fields are written
//! once by the ingestion side and only ever read by the comparison engine.

use formdiff_core::snapshot::FieldSnapshot;
use formdiff_core::types::DbId;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::template_version::{CreateTemplateVersion, TemplateFieldRow, TemplateVersion};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, template_id, version_number, page_count, field_count, created_at";

const FIELD_COLUMNS: &str =
    "id, version_id, field_id, field_type, page_number, near_text, value_options, position";

/// Provides operations on template versions and their field snapshots.
pub struct TemplateVersionRepo;

impl TemplateVersionRepo {
    /// Insert a new template version with no fields yet.
    pub async fn create(
        pool: &PgPool,
        input: &CreateTemplateVersion,
    ) -> Result<TemplateVersion, sqlx::Error> {
        let query = format!(
            "INSERT INTO template_versions (template_id, version_number, page_count)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TemplateVersion>(&query)
            .bind(input.template_id)
            .bind(input.version_number)
            .bind(input.page_count)
            .fetch_one(pool)
            .await
    }

    /// Find a version by its internal ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<TemplateVersion>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM template_versions WHERE id = $1");
        sqlx::query_as::<_, TemplateVersion>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Append field snapshots to a version and refresh its field count.
    /// Uses a transaction so the count never disagrees with the rows.
    pub async fn add_fields(
        pool: &PgPool,
        version_id: DbId,
        fields: &[FieldSnapshot],
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        for field in fields {
            sqlx::query(
                "INSERT INTO template_fields
                    (version_id, field_id, field_type, page_number, near_text, value_options, position)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(version_id)
            .bind(&field.field_id)
            .bind(&field.field_type)
            .bind(field.page_number)
            .bind(&field.near_text)
            .bind(field.value_options.as_ref().map(Json))
            .bind(field.position.map(Json))
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            "UPDATE template_versions
             SET field_count = (SELECT COUNT(*) FROM template_fields WHERE version_id = $1)
             WHERE id = $1",
        )
        .bind(version_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await
    }

    /// Load all field snapshots for a version, ordered by field_id.
    pub async fn list_fields(
        pool: &PgPool,
        version_id: DbId,
    ) -> Result<Vec<FieldSnapshot>, sqlx::Error> {
        let query = format!(
            "SELECT {FIELD_COLUMNS} FROM template_fields
             WHERE version_id = $1
             ORDER BY field_id"
        );
        let rows = sqlx::query_as::<_, TemplateFieldRow>(&query)
            .bind(version_id)
            .fetch_all(pool)
            .await?;
        Ok(rows.into_iter().map(TemplateFieldRow::into_snapshot).collect())
    }
}
