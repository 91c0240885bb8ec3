//! Field-set reconciliation between two template versions.
//!
//! [`diff_fields`] takes the field snapshots of a source and a target
//! version and produces one [`FieldChange`] per field id in the union of
//! both sides, in sorted field-id order. Pure function: no I/O, no
//! side effects, deterministic output.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::snapshot::{is_choice_field_type, FieldSnapshot, Position};

// ---------------------------------------------------------------------------
// Status enums
// ---------------------------------------------------------------------------

/// Comparison outcome for a single field attribute.
///
/// - `Equal`         -- both sides carry the attribute with the same value.
/// - `Different`     -- both sides carry the attribute with differing values.
/// - `NotApplicable` -- the attribute is not comparable (field only exists
///   on one side, or the field type does not carry the attribute).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeDiff {
    Equal,
    Different,
    NotApplicable,
}

impl AttributeDiff {
    /// String representation for display, logging, and database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equal => "equal",
            Self::Different => "different",
            Self::NotApplicable => "not_applicable",
        }
    }
}

impl std::fmt::Display for AttributeDiff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttributeDiff {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "equal" => Ok(Self::Equal),
            "different" => Ok(Self::Different),
            "not_applicable" => Ok(Self::NotApplicable),
            other => Err(CoreError::Internal(format!(
                "Unknown attribute diff value '{other}'"
            ))),
        }
    }
}

/// Classification of one field id across the two versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldChangeStatus {
    Added,
    Removed,
    Modified,
    Unchanged,
}

impl FieldChangeStatus {
    /// String representation for display, logging, and database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Removed => "removed",
            Self::Modified => "modified",
            Self::Unchanged => "unchanged",
        }
    }
}

impl std::fmt::Display for FieldChangeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldChangeStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "added" => Ok(Self::Added),
            "removed" => Ok(Self::Removed),
            "modified" => Ok(Self::Modified),
            "unchanged" => Ok(Self::Unchanged),
            other => Err(CoreError::Internal(format!(
                "Unknown field change status '{other}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Change records
// ---------------------------------------------------------------------------

/// Per-axis breakdown of a position difference, with both raw rectangles.
///
/// Axes are x (left edge), y (top edge), width, and height. Present on a
/// [`FieldChange`] only when the position actually differs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionChange {
    pub x_changed: bool,
    pub y_changed: bool,
    pub width_changed: bool,
    pub height_changed: bool,
    pub source: Position,
    pub target: Position,
}

/// The reconciliation result for one field id.
///
/// Invariants:
/// - `status == Added` implies all `source_*` fields are `None`;
///   `status == Removed` is symmetric for `target_*`.
/// - `status == Unchanged` implies every attribute diff is `Equal` or
///   `NotApplicable`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldChange {
    pub field_id: String,
    pub status: FieldChangeStatus,
    pub field_type: String,
    pub source_page_number: Option<i32>,
    pub target_page_number: Option<i32>,
    pub page_number_changed: bool,
    pub near_text_diff: AttributeDiff,
    pub source_near_text: Option<String>,
    pub target_near_text: Option<String>,
    pub value_options_diff: AttributeDiff,
    pub source_value_options: Option<Vec<String>>,
    pub target_value_options: Option<Vec<String>>,
    pub position_diff: AttributeDiff,
    pub source_position: Option<Position>,
    pub target_position: Option<Position>,
    pub position_change: Option<PositionChange>,
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

/// Reconcile two field snapshot sets into a classified change list.
///
/// Matching is by `field_id`, never by list position; the output is
/// ordered by `field_id` so repeated runs (and persisted reads) agree.
/// Empty inputs are valid: an empty source produces all-`Added` output,
/// an empty target all-`Removed`.
pub fn diff_fields(source: &[FieldSnapshot], target: &[FieldSnapshot]) -> Vec<FieldChange> {
    let source_by_id: BTreeMap<&str, &FieldSnapshot> = source
        .iter()
        .map(|f| (f.field_id.as_str(), f))
        .collect();
    let target_by_id: BTreeMap<&str, &FieldSnapshot> = target
        .iter()
        .map(|f| (f.field_id.as_str(), f))
        .collect();

    let ids: BTreeSet<&str> = source_by_id
        .keys()
        .chain(target_by_id.keys())
        .copied()
        .collect();

    ids.into_iter()
        .map(
            |id| match (source_by_id.get(id), target_by_id.get(id)) {
                (None, Some(t)) => added_change(t),
                (Some(s), None) => removed_change(s),
                (Some(s), Some(t)) => compare_field(s, t),
                (None, None) => unreachable!("id came from the union of both maps"),
            },
        )
        .collect()
}

/// A field present only in the target version.
fn added_change(target: &FieldSnapshot) -> FieldChange {
    FieldChange {
        field_id: target.field_id.clone(),
        status: FieldChangeStatus::Added,
        field_type: target.field_type.clone(),
        source_page_number: None,
        target_page_number: Some(target.page_number),
        page_number_changed: false,
        near_text_diff: AttributeDiff::NotApplicable,
        source_near_text: None,
        target_near_text: target.near_text.clone(),
        value_options_diff: AttributeDiff::NotApplicable,
        source_value_options: None,
        target_value_options: target.value_options.clone(),
        position_diff: AttributeDiff::NotApplicable,
        source_position: None,
        target_position: target.position,
        position_change: None,
    }
}

/// A field present only in the source version.
fn removed_change(source: &FieldSnapshot) -> FieldChange {
    FieldChange {
        field_id: source.field_id.clone(),
        status: FieldChangeStatus::Removed,
        field_type: source.field_type.clone(),
        source_page_number: Some(source.page_number),
        target_page_number: None,
        page_number_changed: false,
        near_text_diff: AttributeDiff::NotApplicable,
        source_near_text: source.near_text.clone(),
        target_near_text: None,
        value_options_diff: AttributeDiff::NotApplicable,
        source_value_options: source.value_options.clone(),
        target_value_options: None,
        position_diff: AttributeDiff::NotApplicable,
        source_position: source.position,
        target_position: None,
        position_change: None,
    }
}

/// A field present in both versions: compare attribute by attribute.
fn compare_field(source: &FieldSnapshot, target: &FieldSnapshot) -> FieldChange {
    let near_text_diff = diff_near_text(source.near_text.as_deref(), target.near_text.as_deref());
    let value_options_diff = diff_value_options(source, target);
    let (position_diff, position_change) = diff_position(source.position, target.position);
    let page_number_changed = source.page_number != target.page_number;

    let modified = page_number_changed
        || near_text_diff == AttributeDiff::Different
        || value_options_diff == AttributeDiff::Different
        || position_diff == AttributeDiff::Different;

    let status = if modified {
        FieldChangeStatus::Modified
    } else {
        FieldChangeStatus::Unchanged
    };

    FieldChange {
        field_id: target.field_id.clone(),
        status,
        field_type: target.field_type.clone(),
        source_page_number: Some(source.page_number),
        target_page_number: Some(target.page_number),
        page_number_changed,
        near_text_diff,
        source_near_text: source.near_text.clone(),
        target_near_text: target.near_text.clone(),
        value_options_diff,
        source_value_options: source.value_options.clone(),
        target_value_options: target.value_options.clone(),
        position_diff,
        source_position: source.position,
        target_position: target.position,
        position_change,
    }
}

/// Near-text labels compare as plain strings; a missing label and an empty
/// label are the same value. Both sides always carry the slot, so the
/// result is never `NotApplicable` here.
fn diff_near_text(source: Option<&str>, target: Option<&str>) -> AttributeDiff {
    if source.unwrap_or("") == target.unwrap_or("") {
        AttributeDiff::Equal
    } else {
        AttributeDiff::Different
    }
}

/// Value options compare as ordered sequences, and only when both sides
/// are choice-type fields.
fn diff_value_options(source: &FieldSnapshot, target: &FieldSnapshot) -> AttributeDiff {
    if !is_choice_field_type(&source.field_type) || !is_choice_field_type(&target.field_type) {
        return AttributeDiff::NotApplicable;
    }
    let empty: Vec<String> = Vec::new();
    let s = source.value_options.as_ref().unwrap_or(&empty);
    let t = target.value_options.as_ref().unwrap_or(&empty);
    if s == t {
        AttributeDiff::Equal
    } else {
        AttributeDiff::Different
    }
}

/// Positions compare per axis (x, y, width, height) with exact equality.
/// Not applicable when either side lacks a rectangle.
fn diff_position(
    source: Option<Position>,
    target: Option<Position>,
) -> (AttributeDiff, Option<PositionChange>) {
    let (s, t) = match (source, target) {
        (Some(s), Some(t)) => (s, t),
        _ => return (AttributeDiff::NotApplicable, None),
    };

    let x_changed = s.x0 != t.x0;
    let y_changed = s.y0 != t.y0;
    let width_changed = s.width() != t.width();
    let height_changed = s.height() != t.height();

    if x_changed || y_changed || width_changed || height_changed {
        (
            AttributeDiff::Different,
            Some(PositionChange {
                x_changed,
                y_changed,
                width_changed,
                height_changed,
                source: s,
                target: t,
            }),
        )
    } else {
        (AttributeDiff::Equal, None)
    }
}
