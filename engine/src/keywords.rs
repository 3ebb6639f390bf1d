//! Keyword tables used by the suggestion engine.
//!
//! The tables are an immutable configuration resource embedded at compile
//! time and parsed once on first use, so localization or extension means
//! editing `resources/keywords.json`, not matching logic. Callers that need
//! a different table (another locale, a tenant override) construct their
//! own `KeywordTables` and inject it into the engine.

use std::sync::OnceLock;

use serde::Deserialize;

use common::model::field::FieldKind;

const BUILTIN_TABLES: &str = include_str!("../resources/keywords.json");

static BUILTIN: OnceLock<KeywordTables> = OnceLock::new();

/// Coarse semantic category of a keyword group. Drives the auxiliary-value
/// fallback and the heuristic placement used by the filler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordCategory {
    Name,
    Phone,
    Address,
    TaxId,
    Email,
    Date,
    Number,
    Other,
}

/// One bilingual keyword group: any of `keywords` appearing in a
/// placeholder suggests catalog fields whose label matches any of
/// `keywords` or `targets`.
#[derive(Debug, Clone, Deserialize)]
pub struct ExactKeywordGroup {
    pub keywords: Vec<String>,
    pub targets: Vec<String>,
    pub category: KeywordCategory,
}

/// Maps type-indicator tokens in a placeholder to the field kinds they
/// imply.
#[derive(Debug, Clone, Deserialize)]
pub struct KindIndicatorGroup {
    pub tokens: Vec<String>,
    pub kinds: Vec<FieldKind>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeywordTables {
    /// A placeholder is auto-mappable when any suggestion reaches this.
    pub auto_map_threshold: f64,
    pub exact: Vec<ExactKeywordGroup>,
    /// Short Greek stems tested as substrings of both sides.
    pub partial_stems: Vec<String>,
    pub kind_indicators: Vec<KindIndicatorGroup>,
}

impl KeywordTables {
    /// The embedded bilingual (Greek/English) tables.
    pub fn builtin() -> &'static KeywordTables {
        BUILTIN.get_or_init(|| {
            serde_json::from_str(BUILTIN_TABLES)
                .unwrap_or_else(|e| panic!("embedded keyword tables are invalid: {e}"))
        })
    }

    /// Parses an external table, e.g. a tenant-specific localization.
    pub fn from_json(json: &str) -> Result<KeywordTables, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Category of the first keyword group whose keyword appears in
    /// `content`, compared accent-insensitively.
    pub fn category_of(&self, content: &str) -> Option<KeywordCategory> {
        let normalized = normalize(content);
        self.exact
            .iter()
            .find(|group| {
                group
                    .keywords
                    .iter()
                    .any(|kw| normalized.contains(&normalize(kw)))
            })
            .map(|group| group.category)
    }
}

/// Upper-cases and strips Greek diacritics so `Τηλέφωνο` and `ΤΗΛΕΦΩΝΟ`
/// compare equal, the way Greek all-caps text drops the tonos.
pub fn normalize(text: &str) -> String {
    text.chars()
        .flat_map(char::to_uppercase)
        .map(|c| match c {
            'Ά' => 'Α',
            'Έ' => 'Ε',
            'Ή' => 'Η',
            'Ί' | 'Ϊ' => 'Ι',
            'Ό' => 'Ο',
            'Ύ' | 'Ϋ' => 'Υ',
            'Ώ' => 'Ω',
            other => other,
        })
        .collect()
}
