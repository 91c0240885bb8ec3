//! Integration tests for comparison persistence: transactional save,
//! read-back, duplicate lookup, and the list query.
//!
//! Prerequisite templates/versions/fields are created via the repository
//! layer, mirroring how the ingestion side populates the snapshot store.

use assert_matches::assert_matches;
use sqlx::PgPool;

use formdiff_core::comparison::{assemble, ComparisonResult};
use formdiff_core::diff::FieldChangeStatus;
use formdiff_core::listing::ListRequest;
use formdiff_core::metrics::VersionSummary;
use formdiff_core::snapshot::{FieldSnapshot, Position};
use formdiff_core::types::DbId;
use formdiff_db::models::template::CreateTemplate;
use formdiff_db::models::template_version::CreateTemplateVersion;
use formdiff_db::models::user::CreateUser;
use formdiff_db::repositories::{
    ComparisonRepo, SaveComparisonError, TemplateRepo, TemplateVersionRepo, UserRepo,
};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn text_field(id: &str, near_text: Option<&str>) -> FieldSnapshot {
    FieldSnapshot {
        field_id: id.to_string(),
        field_type: "text".to_string(),
        page_number: 1,
        near_text: near_text.map(str::to_string),
        value_options: None,
        position: None,
    }
}

fn select_field(id: &str, options: &[&str]) -> FieldSnapshot {
    FieldSnapshot {
        field_id: id.to_string(),
        field_type: "select".to_string(),
        page_number: 1,
        near_text: None,
        value_options: Some(options.iter().map(|s| s.to_string()).collect()),
        position: Some(Position {
            x0: 10.0,
            y0: 20.0,
            x1: 110.0,
            y1: 40.0,
        }),
    }
}

/// Create a template version with the given fields and return its id.
async fn setup_version(
    pool: &PgPool,
    template_name: &str,
    version_number: i32,
    fields: &[FieldSnapshot],
) -> DbId {
    // Re-use the template when an earlier call in the same test created it.
    let existing: Option<DbId> = sqlx::query_scalar("SELECT id FROM templates WHERE name = $1")
        .bind(template_name)
        .fetch_optional(pool)
        .await
        .unwrap();
    let template = match existing {
        Some(id) => TemplateRepo::find_by_id(pool, id).await.unwrap().unwrap(),
        None => TemplateRepo::create(
            pool,
            &CreateTemplate {
                name: template_name.to_string(),
            },
        )
        .await
        .unwrap(),
    };

    let version = TemplateVersionRepo::create(
        pool,
        &CreateTemplateVersion {
            template_id: template.id,
            version_number,
            page_count: 1,
        },
    )
    .await
    .unwrap();

    TemplateVersionRepo::add_fields(pool, version.id, fields)
        .await
        .unwrap();
    version.id
}

/// Diff two persisted versions through the snapshot store, exactly the way
/// the assembler does.
async fn analyze(pool: &PgPool, source_id: DbId, target_id: DbId) -> ComparisonResult {
    let source = TemplateVersionRepo::find_by_id(pool, source_id)
        .await
        .unwrap()
        .unwrap();
    let target = TemplateVersionRepo::find_by_id(pool, target_id)
        .await
        .unwrap()
        .unwrap();
    let source_fields = TemplateVersionRepo::list_fields(pool, source_id).await.unwrap();
    let target_fields = TemplateVersionRepo::list_fields(pool, target_id).await.unwrap();

    assemble(
        source_id,
        target_id,
        &source.summary(),
        &target.summary(),
        &source_fields,
        &target_fields,
    )
}

/// A synthetic result for a version pair with a chosen percentage; used by
/// the list/sort tests where only the aggregates matter.
fn synthetic_result(source_id: DbId, target_id: DbId, percentage: f64) -> ComparisonResult {
    let meta = VersionSummary {
        page_count: 1,
        field_count: 0,
    };
    let mut result = assemble(source_id, target_id, &meta, &meta, &[], &[]);
    result.metrics.modification_percentage = percentage;
    result
}

// ---------------------------------------------------------------------------
// Save + read-back
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn save_then_get_reproduces_the_result(pool: PgPool) {
    let source_id = setup_version(
        &pool,
        "Intake Form",
        1,
        &[
            text_field("applicant_name", Some("Name")),
            select_field("country", &["DE", "FR"]),
            text_field("legacy_note", None),
        ],
    )
    .await;
    let target_id = setup_version(
        &pool,
        "Intake Form",
        2,
        &[
            text_field("applicant_name", Some("Full Name")),
            select_field("country", &["DE", "FR"]),
            text_field("email", Some("E-mail")),
        ],
    )
    .await;

    let original = analyze(&pool, source_id, target_id).await;
    assert!(original.analyzed_at.is_none());

    let id = ComparisonRepo::save(&pool, &original, None).await.unwrap();
    let stored = ComparisonRepo::find_by_id(&pool, id).await.unwrap().unwrap();

    assert_eq!(stored.source_version_id, original.source_version_id);
    assert_eq!(stored.target_version_id, original.target_version_id);
    assert_eq!(stored.metrics, original.metrics);
    assert!(stored.analyzed_at.is_some());

    // Same (field_id, status) pairs in the same order.
    let original_pairs: Vec<(String, FieldChangeStatus)> = original
        .field_changes
        .iter()
        .map(|c| (c.field_id.clone(), c.status))
        .collect();
    let stored_pairs: Vec<(String, FieldChangeStatus)> = stored
        .field_changes
        .iter()
        .map(|c| (c.field_id.clone(), c.status))
        .collect();
    assert_eq!(stored_pairs, original_pairs);

    // JSONB payloads survive the round trip.
    let country = stored
        .field_changes
        .iter()
        .find(|c| c.field_id == "country")
        .unwrap();
    assert_eq!(
        country.source_value_options.as_deref(),
        Some(&["DE".to_string(), "FR".to_string()][..])
    );
    assert_eq!(country.source_position.unwrap().x1, 110.0);
}

#[sqlx::test(migrations = "./migrations")]
async fn get_missing_comparison_returns_none(pool: PgPool) {
    let found = ComparisonRepo::find_by_id(&pool, 424242).await.unwrap();
    assert!(found.is_none());
}

// ---------------------------------------------------------------------------
// Save validation and atomicity
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn save_rejects_identical_versions(pool: PgPool) {
    let version_id = setup_version(&pool, "Solo", 1, &[]).await;
    let result = synthetic_result(version_id, version_id, 0.0);

    let err = ComparisonRepo::save(&pool, &result, None).await.unwrap_err();
    assert_matches!(err, SaveComparisonError::SameVersion);
}

#[sqlx::test(migrations = "./migrations")]
async fn save_rejects_missing_version_and_names_it(pool: PgPool) {
    let version_id = setup_version(&pool, "Half", 1, &[]).await;
    let result = synthetic_result(version_id, 999_999, 0.0);

    let err = ComparisonRepo::save(&pool, &result, None).await.unwrap_err();
    assert_matches!(err, SaveComparisonError::VersionNotFound(999_999));

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comparisons")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn failed_save_leaves_no_partial_rows(pool: PgPool) {
    let source_id = setup_version(&pool, "Atomic", 1, &[]).await;
    let target_id = setup_version(&pool, "Atomic", 2, &[]).await;

    // Violates the percentage range CHECK, so the transaction cannot commit.
    let result = synthetic_result(source_id, target_id, 150.0);
    let err = ComparisonRepo::save(&pool, &result, None).await.unwrap_err();
    assert_matches!(err, SaveComparisonError::Database(_));

    let comparisons: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comparisons")
        .fetch_one(&pool)
        .await
        .unwrap();
    let fields: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comparison_fields")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(comparisons, 0);
    assert_eq!(fields, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn created_by_survives_user_deletion_as_null(pool: PgPool) {
    let source_id = setup_version(&pool, "Owned", 1, &[]).await;
    let target_id = setup_version(&pool, "Owned", 2, &[]).await;
    let user = UserRepo::create(
        &pool,
        &CreateUser {
            username: "reviewer".into(),
            display_name: None,
        },
    )
    .await
    .unwrap();

    let result = synthetic_result(source_id, target_id, 0.0);
    let id = ComparisonRepo::save(&pool, &result, Some(user.id)).await.unwrap();

    assert!(UserRepo::delete(&pool, user.id).await.unwrap());

    let row = ComparisonRepo::find_row_by_id(&pool, id).await.unwrap().unwrap();
    assert_eq!(row.created_by, None);
}

// ---------------------------------------------------------------------------
// Duplicate lookup
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn duplicate_lookup_is_bidirectional(pool: PgPool) {
    let a = setup_version(&pool, "Pairwise", 1, &[]).await;
    let b = setup_version(&pool, "Pairwise", 2, &[]).await;

    assert!(ComparisonRepo::find_existing_pair(&pool, a, b)
        .await
        .unwrap()
        .is_none());

    let result = synthetic_result(a, b, 0.0);
    let id = ComparisonRepo::save(&pool, &result, None).await.unwrap();

    let forward = ComparisonRepo::find_existing_pair(&pool, a, b).await.unwrap();
    let backward = ComparisonRepo::find_existing_pair(&pool, b, a).await.unwrap();

    assert_eq!(forward.as_ref().map(|m| m.comparison_id), Some(id));
    assert_eq!(backward.as_ref().map(|m| m.comparison_id), Some(id));
}

#[sqlx::test(migrations = "./migrations")]
async fn duplicate_lookup_prefers_the_most_recent(pool: PgPool) {
    let a = setup_version(&pool, "Repeat", 1, &[]).await;
    let b = setup_version(&pool, "Repeat", 2, &[]).await;

    let result = synthetic_result(a, b, 0.0);
    let first = ComparisonRepo::save(&pool, &result, None).await.unwrap();
    let second = ComparisonRepo::save(&pool, &result, None).await.unwrap();
    assert_ne!(first, second);

    let found = ComparisonRepo::find_existing_pair(&pool, a, b)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.comparison_id, second);
}

/// The check-then-save flow is advisory: with no uniqueness constraint on
/// the pair, two concurrent writers can both pass the check and both
/// commit. Duplicates are permitted data, not corruption.
#[sqlx::test(migrations = "./migrations")]
async fn concurrent_saves_of_the_same_pair_both_succeed(pool: PgPool) {
    let a = setup_version(&pool, "Race", 1, &[]).await;
    let b = setup_version(&pool, "Race", 2, &[]).await;
    let result = synthetic_result(a, b, 0.0);

    let (first, second) = tokio::join!(
        ComparisonRepo::save(&pool, &result, None),
        ComparisonRepo::save(&pool, &result, None),
    );
    first.unwrap();
    second.unwrap();

    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM comparisons \
         WHERE source_version_id = $1 AND target_version_id = $2",
    )
    .bind(a)
    .bind(b)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(count, 2);
}

// ---------------------------------------------------------------------------
// List query
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn list_sorts_by_percentage_and_paginates(pool: PgPool) {
    let a = setup_version(&pool, "Paged", 1, &[]).await;
    let b = setup_version(&pool, "Paged", 2, &[]).await;

    for percentage in [10.0, 50.0, 30.0] {
        ComparisonRepo::save(&pool, &synthetic_result(a, b, percentage), None)
            .await
            .unwrap();
    }

    let page1 = ListRequest::new(
        Some(1),
        Some(2),
        Some("modification_percentage"),
        Some("desc"),
        None,
    )
    .unwrap();
    let (items, total) = ComparisonRepo::list(&pool, &page1).await.unwrap();
    assert_eq!(total, 3);
    assert_eq!(page1.total_pages(total), 2);
    let percentages: Vec<f64> = items.iter().map(|i| i.modification_percentage).collect();
    assert_eq!(percentages, vec![50.0, 30.0]);

    let page2 = ListRequest::new(
        Some(2),
        Some(2),
        Some("modification_percentage"),
        Some("desc"),
        None,
    )
    .unwrap();
    let (items, _) = ComparisonRepo::list(&pool, &page2).await.unwrap();
    let percentages: Vec<f64> = items.iter().map(|i| i.modification_percentage).collect();
    assert_eq!(percentages, vec![10.0]);
}

#[sqlx::test(migrations = "./migrations")]
async fn list_search_matches_either_template_name_case_insensitively(pool: PgPool) {
    let tax_v1 = setup_version(&pool, "Tax Declaration", 1, &[]).await;
    let tax_v2 = setup_version(&pool, "Tax Declaration", 2, &[]).await;
    let hr_v1 = setup_version(&pool, "Onboarding", 1, &[]).await;
    let hr_v2 = setup_version(&pool, "Onboarding", 2, &[]).await;

    ComparisonRepo::save(&pool, &synthetic_result(tax_v1, tax_v2, 10.0), None)
        .await
        .unwrap();
    ComparisonRepo::save(&pool, &synthetic_result(hr_v1, hr_v2, 20.0), None)
        .await
        .unwrap();

    let request = ListRequest::new(None, None, None, None, Some("tax".into())).unwrap();
    let (items, total) = ComparisonRepo::list(&pool, &request).await.unwrap();

    assert_eq!(total, 1);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].source_template_name, "Tax Declaration");
    assert_eq!(items[0].source_version_number, 1);
    assert_eq!(items[0].target_version_number, 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn list_returns_empty_page_not_error_when_nothing_matches(pool: PgPool) {
    let request = ListRequest::new(None, None, None, None, Some("nothing".into())).unwrap();
    let (items, total) = ComparisonRepo::list(&pool, &request).await.unwrap();
    assert!(items.is_empty());
    assert_eq!(total, 0);
    assert_eq!(request.total_pages(total), 0);
}

// ---------------------------------------------------------------------------
// Delete cascade
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn delete_cascades_to_field_rows(pool: PgPool) {
    let source_id = setup_version(&pool, "Doomed", 1, &[text_field("f", None)]).await;
    let target_id = setup_version(&pool, "Doomed", 2, &[text_field("g", None)]).await;

    let result = analyze(&pool, source_id, target_id).await;
    let id = ComparisonRepo::save(&pool, &result, None).await.unwrap();

    let before: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comparison_fields")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(before, 2);

    assert!(ComparisonRepo::delete(&pool, id).await.unwrap());

    let after: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comparison_fields")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(after, 0);
    assert!(ComparisonRepo::find_by_id(&pool, id).await.unwrap().is_none());
}
