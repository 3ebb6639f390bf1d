use serde::{Deserialize, Serialize};

use crate::model::field::FieldKind;

/// A page-relative rectangle expressed as percentages of the page
/// dimensions. This is the canonical coordinate representation; absolute
/// units are derived only at render time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageRect {
    pub x_pct: f64,
    pub y_pct: f64,
    pub width_pct: f64,
    pub height_pct: f64,
}

/// A human-confirmed (or auto-accepted) binding of one placeholder to one
/// catalog field. A given (template, placeholder) pair has at most one
/// confirmed mapping; saving a new set replaces the whole prior set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmedMapping {
    /// The matched placeholder text this mapping anchors to.
    pub placeholder: String,
    pub field_id: i64,
    /// Secondary required flag captured at confirmation time. The catalog's
    /// `required_for_output` wins whenever the field is still in the catalog.
    pub is_required: bool,
    pub page: usize,
    /// Explicit coordinates for position-based mappings.
    pub position: Option<PageRect>,
}

/// A confirmed mapping joined with the field metadata captured at save time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMapping {
    pub mapping: ConfirmedMapping,
    pub field_label: Option<String>,
    pub field_kind: Option<FieldKind>,
}

/// Result of a save-mappings call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SavedMappings {
    pub saved_count: usize,
}

/// A required mapping whose field has no usable value in the value source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissingField {
    pub field_id: i64,
    pub placeholder: String,
    pub label: Option<String>,
}

/// Partition of the required mappings into present and missing values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletenessReport {
    pub is_complete: bool,
    pub missing_fields: Vec<MissingField>,
    pub available_fields: Vec<i64>,
}
