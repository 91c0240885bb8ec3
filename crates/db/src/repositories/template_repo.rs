//! Repository for the `templates` table.

use formdiff_core::types::DbId;
use sqlx::PgPool;

use crate::models::template::{CreateTemplate, Template};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, created_at";

/// Provides operations on form templates.
pub struct TemplateRepo;

impl TemplateRepo {
    /// Insert a new template.
    pub async fn create(pool: &PgPool, input: &CreateTemplate) -> Result<Template, sqlx::Error> {
        let query = format!("INSERT INTO templates (name) VALUES ($1) RETURNING {COLUMNS}");
        sqlx::query_as::<_, Template>(&query)
            .bind(&input.name)
            .fetch_one(pool)
            .await
    }

    /// Find a template by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Template>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM templates WHERE id = $1");
        sqlx::query_as::<_, Template>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
