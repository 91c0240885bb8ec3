//! Field snapshots: one form field as captured in a specific template
//! version.
//!
//! Snapshots are produced by the upstream extraction pipeline and stored
//! per version; the comparison engine only ever reads them.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Field type constants
// ---------------------------------------------------------------------------

pub const FIELD_TYPE_TEXT: &str = "text";
pub const FIELD_TYPE_CHECKBOX: &str = "checkbox";
pub const FIELD_TYPE_SELECT: &str = "select";
pub const FIELD_TYPE_RADIO: &str = "radio";
pub const FIELD_TYPE_LISTBOX: &str = "listbox";
pub const FIELD_TYPE_COMBOBOX: &str = "combobox";
pub const FIELD_TYPE_SIGNATURE: &str = "signature";
pub const FIELD_TYPE_BUTTON: &str = "button";

/// Field types that carry a `value_options` list. All other types (and any
/// unrecognized type string from the extractor) have no options to compare.
pub const CHOICE_FIELD_TYPES: &[&str] = &[
    FIELD_TYPE_SELECT,
    FIELD_TYPE_RADIO,
    FIELD_TYPE_LISTBOX,
    FIELD_TYPE_COMBOBOX,
];

/// Whether `field_type` is a choice type (carries value options).
pub fn is_choice_field_type(field_type: &str) -> bool {
    CHOICE_FIELD_TYPES.contains(&field_type)
}

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// Bounding rectangle of a field on its page, in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl Position {
    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }
}

// ---------------------------------------------------------------------------
// Field snapshot
// ---------------------------------------------------------------------------

/// One field as it existed in a specific template version.
///
/// `field_id` is unique within a version. `value_options` is only
/// meaningful for choice-type fields; the extractor may omit `near_text`
/// and `position` when it could not determine them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSnapshot {
    pub field_id: String,
    pub field_type: String,
    pub page_number: i32,
    pub near_text: Option<String>,
    pub value_options: Option<Vec<String>>,
    pub position: Option<Position>,
}
