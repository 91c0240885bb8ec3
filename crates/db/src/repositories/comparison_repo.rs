//! Repository for the `comparisons` and `comparison_fields` tables.

use formdiff_core::comparison::ComparisonResult;
use formdiff_core::diff::FieldChange;
use formdiff_core::listing::ListRequest;
use formdiff_core::types::DbId;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::comparison::{
    Comparison, ComparisonDetailRow, ComparisonFieldRow, ComparisonSummary, DuplicateMatch,
};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, source_version_id, target_version_id, modification_percentage, \
    fields_added, fields_removed, fields_modified, fields_unchanged, \
    created_by, status, created_at, completed_at";

const FIELD_COLUMNS: &str = "id, comparison_id, field_id, status, field_type, \
    source_page_number, target_page_number, page_number_changed, \
    near_text_diff, source_near_text, target_near_text, \
    value_options_diff, source_value_options, target_value_options, \
    position_diff, source_position, target_position, position_change";

/// Shared FROM/JOIN clause for list queries: a comparison joined against
/// both versions and their templates.
const LIST_FROM: &str = "FROM comparisons c \
    JOIN template_versions sv ON sv.id = c.source_version_id \
    JOIN templates st ON st.id = sv.template_id \
    JOIN template_versions tv ON tv.id = c.target_version_id \
    JOIN templates tt ON tt.id = tv.template_id";

/// Search filter over either side's template name. `$1` is NULL when no
/// search term was given.
const LIST_FILTER: &str =
    "($1::TEXT IS NULL OR st.name ILIKE '%' || $1 || '%' OR tt.name ILIKE '%' || $1 || '%')";

/// Errors from [`ComparisonRepo::save`].
///
/// Validation failures are distinguished from database failures so the API
/// layer can answer 400/404 instead of a blanket 500.
#[derive(Debug, thiserror::Error)]
pub enum SaveComparisonError {
    #[error("source and target versions must differ")]
    SameVersion,

    #[error("template version {0} does not exist")]
    VersionNotFound(DbId),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Provides persistence, duplicate lookup, and list queries for
/// comparisons.
pub struct ComparisonRepo;

impl ComparisonRepo {
    /// Persist a comparison result: one parent row plus all field-change
    /// rows, as a single atomic unit. Any failure rolls the whole write
    /// back; a partially-written comparison is never observable.
    ///
    /// Duplicate rejection deliberately does NOT happen here. Callers that
    /// care consult [`ComparisonRepo::find_existing_pair`] first; the
    /// check-then-save sequence is advisory, and concurrent saves of the
    /// same pair may both succeed.
    pub async fn save(
        pool: &PgPool,
        result: &ComparisonResult,
        created_by: Option<DbId>,
    ) -> Result<DbId, SaveComparisonError> {
        if result.source_version_id == result.target_version_id {
            return Err(SaveComparisonError::SameVersion);
        }

        let mut tx = pool.begin().await?;

        for version_id in [result.source_version_id, result.target_version_id] {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM template_versions WHERE id = $1)")
                    .bind(version_id)
                    .fetch_one(&mut *tx)
                    .await?;
            if !exists {
                return Err(SaveComparisonError::VersionNotFound(version_id));
            }
        }

        let comparison_id: DbId = sqlx::query_scalar(
            "INSERT INTO comparisons
                (source_version_id, target_version_id, modification_percentage,
                 fields_added, fields_removed, fields_modified, fields_unchanged,
                 created_by, status, completed_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'completed', NOW())
             RETURNING id",
        )
        .bind(result.source_version_id)
        .bind(result.target_version_id)
        .bind(result.metrics.modification_percentage)
        .bind(result.metrics.fields_added)
        .bind(result.metrics.fields_removed)
        .bind(result.metrics.fields_modified)
        .bind(result.metrics.fields_unchanged)
        .bind(created_by)
        .fetch_one(&mut *tx)
        .await?;

        for change in &result.field_changes {
            insert_field_change(&mut tx, comparison_id, change).await?;
        }

        tx.commit().await?;

        tracing::debug!(
            comparison_id,
            fields = result.field_changes.len(),
            "Comparison persisted"
        );
        Ok(comparison_id)
    }

    /// Reconstruct a full comparison result by primary key.
    ///
    /// One query for the parent joined against both versions' metadata,
    /// one query for all children ordered by field_id; no per-field reads.
    /// `analyzed_at` is set from the stored `created_at`.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<ComparisonResult>, sqlx::Error> {
        let parent = sqlx::query_as::<_, ComparisonDetailRow>(
            "SELECT c.id, c.source_version_id, c.target_version_id,
                    c.modification_percentage, c.fields_added, c.fields_removed,
                    c.fields_modified, c.fields_unchanged, c.created_at,
                    sv.page_count AS source_page_count, sv.field_count AS source_field_count,
                    tv.page_count AS target_page_count, tv.field_count AS target_field_count
             FROM comparisons c
             JOIN template_versions sv ON sv.id = c.source_version_id
             JOIN template_versions tv ON tv.id = c.target_version_id
             WHERE c.id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        let Some(parent) = parent else {
            return Ok(None);
        };

        let query = format!(
            "SELECT {FIELD_COLUMNS} FROM comparison_fields
             WHERE comparison_id = $1
             ORDER BY field_id"
        );
        let rows = sqlx::query_as::<_, ComparisonFieldRow>(&query)
            .bind(id)
            .fetch_all(pool)
            .await?;

        let field_changes: Vec<FieldChange> = rows
            .into_iter()
            .map(ComparisonFieldRow::into_change)
            .collect::<Result<_, _>>()?;

        Ok(Some(ComparisonResult {
            source_version_id: parent.source_version_id,
            target_version_id: parent.target_version_id,
            metrics: parent.metrics(),
            field_changes,
            analyzed_at: Some(parent.created_at),
        }))
    }

    /// Fetch the bare parent row by primary key.
    pub async fn find_row_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<Comparison>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM comparisons WHERE id = $1");
        sqlx::query_as::<_, Comparison>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Look for a prior comparison of the given version pair, in either
    /// direction. Returns the most recent match (created_at, then id).
    pub async fn find_existing_pair(
        pool: &PgPool,
        source_version_id: DbId,
        target_version_id: DbId,
    ) -> Result<Option<DuplicateMatch>, sqlx::Error> {
        sqlx::query_as::<_, DuplicateMatch>(
            "SELECT id AS comparison_id, created_at
             FROM comparisons
             WHERE (source_version_id = $1 AND target_version_id = $2)
                OR (source_version_id = $2 AND target_version_id = $1)
             ORDER BY created_at DESC, id DESC
             LIMIT 1",
        )
        .bind(source_version_id)
        .bind(target_version_id)
        .fetch_optional(pool)
        .await
    }

    /// Paginated, sorted, searchable list of comparison summaries.
    ///
    /// The sort column comes from the whitelist on the validated request
    /// (never raw user input); the search term filters on either side's
    /// template name before the total is counted.
    pub async fn list(
        pool: &PgPool,
        request: &ListRequest,
    ) -> Result<(Vec<ComparisonSummary>, i64), sqlx::Error> {
        let count_query = format!("SELECT COUNT(*) {LIST_FROM} WHERE {LIST_FILTER}");
        let total: i64 = sqlx::query_scalar(&count_query)
            .bind(&request.search)
            .fetch_one(pool)
            .await?;

        let page_query = format!(
            "SELECT c.id, c.source_version_id, st.name AS source_template_name,
                    sv.version_number AS source_version_number,
                    c.target_version_id, tt.name AS target_template_name,
                    tv.version_number AS target_version_number,
                    c.modification_percentage, c.fields_added, c.fields_removed,
                    c.fields_modified, c.fields_unchanged, c.created_by, c.created_at
             {LIST_FROM}
             WHERE {LIST_FILTER}
             ORDER BY c.{sort_column} {sort_order}, c.id DESC
             LIMIT $2 OFFSET $3",
            sort_column = request.sort_by.column(),
            sort_order = request.sort_order.as_sql(),
        );
        let items = sqlx::query_as::<_, ComparisonSummary>(&page_query)
            .bind(&request.search)
            .bind(request.page_size)
            .bind(request.offset())
            .fetch_all(pool)
            .await?;

        Ok((items, total))
    }

    /// Permanently delete a comparison. Its field rows go with it via the
    /// FK cascade. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM comparisons WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Insert one field-change row inside the save transaction.
async fn insert_field_change(
    tx: &mut Transaction<'_, Postgres>,
    comparison_id: DbId,
    change: &FieldChange,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO comparison_fields
            (comparison_id, field_id, status, field_type,
             source_page_number, target_page_number, page_number_changed,
             near_text_diff, source_near_text, target_near_text,
             value_options_diff, source_value_options, target_value_options,
             position_diff, source_position, target_position, position_change)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)",
    )
    .bind(comparison_id)
    .bind(&change.field_id)
    .bind(change.status.as_str())
    .bind(&change.field_type)
    .bind(change.source_page_number)
    .bind(change.target_page_number)
    .bind(change.page_number_changed)
    .bind(change.near_text_diff.as_str())
    .bind(&change.source_near_text)
    .bind(&change.target_near_text)
    .bind(change.value_options_diff.as_str())
    .bind(change.source_value_options.as_ref().map(Json))
    .bind(change.target_value_options.as_ref().map(Json))
    .bind(change.position_diff.as_str())
    .bind(change.source_position.map(Json))
    .bind(change.target_position.map(Json))
    .bind(change.position_change.as_ref().map(Json))
    .execute(&mut **tx)
    .await?;
    Ok(())
}
