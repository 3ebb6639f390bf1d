use serde::{Deserialize, Serialize};

/// A named, typed target from the external field catalog. Read-only to the
/// pipeline; supplied per invocation and never cached internally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    pub id: i64,
    pub label: String,
    pub kind: FieldKind,
    /// Whether the catalog requires a value for this field in filled output.
    pub required_for_output: bool,
}

/// Field data types as a closed enum so per-kind formatting stays
/// exhaustiveness-checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Date,
    Number,
    Checkbox,
    Dropdown,
}

impl FieldKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Date => "date",
            FieldKind::Number => "number",
            FieldKind::Checkbox => "checkbox",
            FieldKind::Dropdown => "dropdown",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "text" => Some(FieldKind::Text),
            "date" => Some(FieldKind::Date),
            "number" => Some(FieldKind::Number),
            "checkbox" => Some(FieldKind::Checkbox),
            "dropdown" => Some(FieldKind::Dropdown),
            _ => None,
        }
    }
}
