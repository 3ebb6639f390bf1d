use serde::{Deserialize, Serialize};

use crate::model::occurrence::PlaceholderOccurrence;

/// A ranked candidate pairing of a placeholder with a catalog field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingSuggestion {
    pub field_id: i64,
    pub field_label: String,
    /// Score in [0, 1]; higher means a more likely match.
    pub confidence: f64,
    pub kind: MatchKind,
    /// Human-readable explanation shown in the mapping review UI.
    pub reason: String,
}

/// Which strategy produced a suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchKind {
    ExactKeyword,
    PartialKeyword,
    Fuzzy,
    FieldKind,
}

impl MatchKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchKind::ExactKeyword => "exact_keyword",
            MatchKind::PartialKeyword => "partial_keyword",
            MatchKind::Fuzzy => "fuzzy",
            MatchKind::FieldKind => "field_kind",
        }
    }
}

/// One detected placeholder together with its ranked suggestions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceholderAnalysis {
    pub occurrence: PlaceholderOccurrence,
    /// At most five entries, sorted by confidence descending, one per field.
    pub suggestions: Vec<MappingSuggestion>,
    /// True when at least one suggestion clears the auto-map threshold.
    pub auto_mappable: bool,
}
