//! The assembled result of comparing two template versions.

use serde::{Deserialize, Serialize};

use crate::diff::{diff_fields, FieldChange};
use crate::metrics::{aggregate, GlobalMetrics, VersionSummary};
use crate::snapshot::FieldSnapshot;
use crate::types::{DbId, Timestamp};

/// A full comparison between a source and a target version.
///
/// Ephemeral until explicitly persisted: `analyzed_at` stays `None` on the
/// in-memory result of an analyze call and is set from the stored
/// `created_at` once the comparison has been saved and read back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub source_version_id: DbId,
    pub target_version_id: DbId,
    pub metrics: GlobalMetrics,
    /// Ordered by `field_id`.
    pub field_changes: Vec<FieldChange>,
    pub analyzed_at: Option<Timestamp>,
}

/// Assemble a [`ComparisonResult`] from two already-fetched snapshot sets.
///
/// Pure: snapshot fetching (and the source != target / existence checks
/// that go with it) happens at the caller's boundary.
pub fn assemble(
    source_version_id: DbId,
    target_version_id: DbId,
    source_meta: &VersionSummary,
    target_meta: &VersionSummary,
    source_fields: &[FieldSnapshot],
    target_fields: &[FieldSnapshot],
) -> ComparisonResult {
    let field_changes = diff_fields(source_fields, target_fields);
    let metrics = aggregate(&field_changes, source_meta, target_meta);

    ComparisonResult {
        source_version_id,
        target_version_id,
        metrics,
        field_changes,
        analyzed_at: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(id: &str) -> FieldSnapshot {
        FieldSnapshot {
            field_id: id.to_string(),
            field_type: "text".to_string(),
            page_number: 1,
            near_text: None,
            value_options: None,
            position: None,
        }
    }

    #[test]
    fn assemble_has_no_timestamp_until_persisted() {
        let meta = VersionSummary {
            page_count: 1,
            field_count: 1,
        };
        let result = assemble(1, 2, &meta, &meta, &[field("a")], &[field("a")]);

        assert!(result.analyzed_at.is_none());
        assert_eq!(result.source_version_id, 1);
        assert_eq!(result.target_version_id, 2);
        assert_eq!(result.metrics.fields_unchanged, 1);
        assert_eq!(result.field_changes.len(), 1);
    }

    #[test]
    fn field_changes_come_out_ordered() {
        let meta = VersionSummary {
            page_count: 1,
            field_count: 3,
        };
        let fields = vec![field("c"), field("a"), field("b")];
        let result = assemble(1, 2, &meta, &meta, &fields, &fields);

        let ids: Vec<&str> = result
            .field_changes
            .iter()
            .map(|c| c.field_id.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
