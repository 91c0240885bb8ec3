//! The comparison assembler: fetch both snapshot sets, diff, aggregate.

use formdiff_core::comparison::{assemble, ComparisonResult};
use formdiff_core::error::CoreError;
use formdiff_core::types::DbId;
use formdiff_db::repositories::TemplateVersionRepo;
use sqlx::PgPool;

use crate::error::{AppError, AppResult};

/// Compare two template versions and return the un-persisted result.
///
/// Fails with a validation error when the ids coincide or are
/// non-positive, and with a not-found error naming the offending id when
/// either version is missing. No side effects beyond reading the snapshot
/// store; persisting the result is a separate, explicit step.
pub async fn analyze(
    pool: &PgPool,
    source_version_id: DbId,
    target_version_id: DbId,
) -> AppResult<ComparisonResult> {
    if source_version_id < 1 || target_version_id < 1 {
        return Err(AppError::Core(CoreError::Validation(
            "version ids must be positive".into(),
        )));
    }
    if source_version_id == target_version_id {
        return Err(AppError::Core(CoreError::Validation(
            "source and target versions must differ".into(),
        )));
    }

    let source = TemplateVersionRepo::find_by_id(pool, source_version_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "TemplateVersion",
            id: source_version_id,
        }))?;
    let target = TemplateVersionRepo::find_by_id(pool, target_version_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "TemplateVersion",
            id: target_version_id,
        }))?;

    let source_fields = TemplateVersionRepo::list_fields(pool, source_version_id).await?;
    let target_fields = TemplateVersionRepo::list_fields(pool, target_version_id).await?;

    Ok(assemble(
        source_version_id,
        target_version_id,
        &source.summary(),
        &target.summary(),
        &source_fields,
        &target_fields,
    ))
}
