//! Aggregate change metrics over one comparison.

use serde::{Deserialize, Serialize};

use crate::diff::{FieldChange, FieldChangeStatus};

/// The slice of version metadata the aggregator needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionSummary {
    pub page_count: i32,
    pub field_count: i32,
}

/// Aggregate counts and percentage summarizing a whole comparison.
///
/// Invariant: `fields_added + fields_removed + fields_modified +
/// fields_unchanged` equals the number of distinct field ids across both
/// versions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalMetrics {
    pub source_page_count: i32,
    pub target_page_count: i32,
    pub source_field_count: i32,
    pub target_field_count: i32,
    pub page_count_changed: bool,
    pub field_count_changed: bool,
    pub fields_added: i32,
    pub fields_removed: i32,
    pub fields_modified: i32,
    pub fields_unchanged: i32,
    pub modification_percentage: f64,
}

/// Reduce a change list into [`GlobalMetrics`].
///
/// The percentage is `100 * changed / total` over the union of field ids,
/// rounded to two decimal places; the empty comparison (0/0) is 0.0.
pub fn aggregate(
    changes: &[FieldChange],
    source: &VersionSummary,
    target: &VersionSummary,
) -> GlobalMetrics {
    let mut added = 0;
    let mut removed = 0;
    let mut modified = 0;
    let mut unchanged = 0;

    for change in changes {
        match change.status {
            FieldChangeStatus::Added => added += 1,
            FieldChangeStatus::Removed => removed += 1,
            FieldChangeStatus::Modified => modified += 1,
            FieldChangeStatus::Unchanged => unchanged += 1,
        }
    }

    let total = added + removed + modified + unchanged;
    let modification_percentage = if total == 0 {
        0.0
    } else {
        round2(100.0 * f64::from(added + removed + modified) / f64::from(total))
    };

    GlobalMetrics {
        source_page_count: source.page_count,
        target_page_count: target.page_count,
        source_field_count: source.field_count,
        target_field_count: target.field_count,
        page_count_changed: source.page_count != target.page_count,
        field_count_changed: source.field_count != target.field_count,
        fields_added: added,
        fields_removed: removed,
        fields_modified: modified,
        fields_unchanged: unchanged,
        modification_percentage,
    }
}

/// Round to two decimal places for display stability.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
