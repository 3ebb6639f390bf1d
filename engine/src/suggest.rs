//! Mapping suggestions: ranking catalog fields against placeholder content.
//!
//! Four strategies run in priority order and all append candidates; none
//! short-circuits. Duplicate fields across strategies collapse to the
//! single highest-confidence suggestion (max wins, never an average), the
//! list is sorted descending and truncated to five entries.

use std::collections::HashMap;

use log::debug;

use common::model::field::Field;
use common::model::occurrence::PlaceholderOccurrence;
use common::model::suggestion::{MappingSuggestion, MatchKind, PlaceholderAnalysis};

use crate::history::MappingHistory;
use crate::keywords::{normalize, KeywordTables};

const MAX_SUGGESTIONS: usize = 5;
const EXACT_CONFIDENCE: f64 = 0.95;
const PARTIAL_CONFIDENCE: f64 = 0.75;
const FUZZY_WEIGHT: f64 = 0.8;
const FUZZY_THRESHOLD: f64 = 0.6;
const KIND_CONFIDENCE: f64 = 0.65;
const HISTORY_BOOST: f64 = 0.10;

pub struct SuggestionEngine<'a> {
    tables: &'a KeywordTables,
}

impl<'a> SuggestionEngine<'a> {
    pub fn new(tables: &'a KeywordTables) -> Self {
        SuggestionEngine { tables }
    }

    pub fn with_builtin() -> SuggestionEngine<'static> {
        SuggestionEngine {
            tables: KeywordTables::builtin(),
        }
    }

    /// Ranked suggestions for one placeholder against the supplied catalog.
    pub fn suggest(&self, content: &str, catalog: &[Field]) -> Vec<MappingSuggestion> {
        let normalized = normalize(content);
        let mut candidates: Vec<MappingSuggestion> = Vec::new();

        self.exact_keyword(&normalized, catalog, &mut candidates);
        self.partial_keyword(&normalized, catalog, &mut candidates);
        self.fuzzy(&normalized, catalog, &mut candidates);
        self.by_kind(&normalized, catalog, &mut candidates);

        dedup_rank(candidates)
    }

    /// Like `suggest`, with historical reinforcement scoped to
    /// `context_id`. A failing history lookup leaves the ranked list
    /// untouched; only this sub-step degrades silently.
    pub fn suggest_with_history(
        &self,
        content: &str,
        catalog: &[Field],
        history: &dyn MappingHistory,
        context_id: &str,
    ) -> Vec<MappingSuggestion> {
        let mut ranked = self.suggest(content, catalog);
        match history.verified_usage(context_id) {
            Ok(usage) => {
                let by_field: HashMap<i64, u32> = usage
                    .into_iter()
                    .map(|u| (u.field_id, u.usage_count))
                    .collect();
                for suggestion in &mut ranked {
                    if let Some(count) = by_field.get(&suggestion.field_id) {
                        suggestion.confidence = (suggestion.confidence + HISTORY_BOOST).min(1.0);
                        suggestion
                            .reason
                            .push_str(&format!("; verified {count} times in this context"));
                    }
                }
                ranked.sort_by(|a, b| {
                    b.confidence
                        .total_cmp(&a.confidence)
                        .then(a.field_id.cmp(&b.field_id))
                });
            }
            Err(e) => {
                debug!("history lookup failed for context {context_id}: {e}");
            }
        }
        ranked
    }

    /// True when any suggestion clears the configured threshold.
    pub fn auto_mappable(&self, suggestions: &[MappingSuggestion]) -> bool {
        suggestions
            .iter()
            .any(|s| s.confidence >= self.tables.auto_map_threshold)
    }

    /// Full per-occurrence analysis used by the background pass.
    pub fn analyze_occurrence(
        &self,
        occurrence: PlaceholderOccurrence,
        catalog: &[Field],
        history: &dyn MappingHistory,
        context_id: &str,
    ) -> PlaceholderAnalysis {
        let suggestions =
            self.suggest_with_history(&occurrence.content, catalog, history, context_id);
        let auto_mappable = self.auto_mappable(&suggestions);
        PlaceholderAnalysis {
            occurrence,
            suggestions,
            auto_mappable,
        }
    }

    fn exact_keyword(
        &self,
        normalized: &str,
        catalog: &[Field],
        out: &mut Vec<MappingSuggestion>,
    ) {
        for group in &self.tables.exact {
            let hit = group
                .keywords
                .iter()
                .find(|kw| normalized.contains(&normalize(kw)));
            let Some(keyword) = hit else { continue };
            for field in catalog {
                if field_matches_group(field, &group.keywords, &group.targets) {
                    out.push(MappingSuggestion {
                        field_id: field.id,
                        field_label: field.label.clone(),
                        confidence: EXACT_CONFIDENCE,
                        kind: MatchKind::ExactKeyword,
                        reason: format!("placeholder contains keyword '{keyword}'"),
                    });
                }
            }
        }
    }

    fn partial_keyword(
        &self,
        normalized: &str,
        catalog: &[Field],
        out: &mut Vec<MappingSuggestion>,
    ) {
        for stem in &self.tables.partial_stems {
            let stem_norm = normalize(stem);
            if !normalized.contains(&stem_norm) {
                continue;
            }
            for field in catalog {
                if normalize(&field.label).contains(&stem_norm) {
                    out.push(MappingSuggestion {
                        field_id: field.id,
                        field_label: field.label.clone(),
                        confidence: PARTIAL_CONFIDENCE,
                        kind: MatchKind::PartialKeyword,
                        reason: format!("shares stem '{stem}' with the field label"),
                    });
                }
            }
        }
    }

    fn fuzzy(&self, normalized: &str, catalog: &[Field], out: &mut Vec<MappingSuggestion>) {
        for field in catalog {
            let similarity = strsim::normalized_levenshtein(normalized, &normalize(&field.label));
            if similarity > FUZZY_THRESHOLD {
                out.push(MappingSuggestion {
                    field_id: field.id,
                    field_label: field.label.clone(),
                    confidence: similarity * FUZZY_WEIGHT,
                    kind: MatchKind::Fuzzy,
                    reason: format!("label similarity {:.0}%", similarity * 100.0),
                });
            }
        }
    }

    fn by_kind(&self, normalized: &str, catalog: &[Field], out: &mut Vec<MappingSuggestion>) {
        for group in &self.tables.kind_indicators {
            let hit = group
                .tokens
                .iter()
                .find(|token| normalized.contains(&normalize(token)));
            let Some(token) = hit else { continue };
            for field in catalog {
                if group.kinds.contains(&field.kind) {
                    out.push(MappingSuggestion {
                        field_id: field.id,
                        field_label: field.label.clone(),
                        confidence: KIND_CONFIDENCE,
                        kind: MatchKind::FieldKind,
                        reason: format!(
                            "indicator '{token}' implies a {} field",
                            field.kind.as_str()
                        ),
                    });
                }
            }
        }
    }
}

/// Case/accent-insensitive match of a field against a keyword group: the
/// label contains one of the group's tokens, or the field's kind name
/// equals a target exactly.
fn field_matches_group(field: &Field, keywords: &[String], targets: &[String]) -> bool {
    let label = normalize(&field.label);
    let kind_name = normalize(field.kind.as_str());
    keywords
        .iter()
        .chain(targets.iter())
        .any(|token| label.contains(&normalize(token)) || kind_name == normalize(token))
}

fn dedup_rank(candidates: Vec<MappingSuggestion>) -> Vec<MappingSuggestion> {
    let mut best: Vec<MappingSuggestion> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        match best.iter_mut().find(|b| b.field_id == candidate.field_id) {
            Some(existing) => {
                if candidate.confidence > existing.confidence {
                    *existing = candidate;
                }
            }
            None => best.push(candidate),
        }
    }
    best.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then(a.field_id.cmp(&b.field_id))
    });
    best.truncate(MAX_SUGGESTIONS);
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PersistenceError;
    use crate::history::{FieldUsage, NoHistory};
    use common::model::field::FieldKind;

    fn field(id: i64, label: &str, kind: FieldKind) -> Field {
        Field {
            id,
            label: label.to_string(),
            kind,
            required_for_output: false,
        }
    }

    fn catalog() -> Vec<Field> {
        vec![
            field(1, "Ονοματεπώνυμο", FieldKind::Text),
            field(2, "Τηλέφωνο", FieldKind::Text),
            field(3, "Ημερομηνία αίτησης", FieldKind::Date),
            field(7, "Address", FieldKind::Text),
            field(9, "Ποσό", FieldKind::Number),
        ]
    }

    #[test]
    fn phone_keyword_hits_greek_label() {
        let engine = SuggestionEngine::with_builtin();
        let out = engine.suggest("ΤΗΛΕΦΩΝΟ", &catalog());
        assert_eq!(out[0].field_id, 2);
        assert_eq!(out[0].kind, MatchKind::ExactKeyword);
        assert_eq!(out[0].confidence, 0.95);
    }

    #[test]
    fn address_keyword_hits_english_label() {
        let engine = SuggestionEngine::with_builtin();
        let out = engine.suggest("ΔΙΕΥΘΥΝΣΗ", &catalog());
        assert_eq!(out[0].field_id, 7);
        assert_eq!(out[0].kind, MatchKind::ExactKeyword);
        assert_eq!(out[0].confidence, 0.95);
    }

    #[test]
    fn no_duplicate_fields_and_sorted() {
        let engine = SuggestionEngine::with_builtin();
        // ΤΗΛΕΦΩΝΟ triggers exact, partial (ΤΗΛΕ) and fuzzy for field 2.
        let out = engine.suggest("ΤΗΛΕΦΩΝΟ", &catalog());
        let mut seen = std::collections::HashSet::new();
        for s in &out {
            assert!(seen.insert(s.field_id), "field {} suggested twice", s.field_id);
        }
        for pair in out.windows(2) {
            assert!(pair[0].confidence >= pair[1].confidence);
        }
        assert!(out.len() <= 5);
    }

    #[test]
    fn max_wins_over_strategies_not_average() {
        let engine = SuggestionEngine::with_builtin();
        let out = engine.suggest("ΤΗΛΕΦΩΝΟ", &catalog());
        let phone = out.iter().find(|s| s.field_id == 2).unwrap();
        // Exact keyword at 0.95 must survive the weaker partial/fuzzy hits.
        assert_eq!(phone.confidence, 0.95);
        assert_eq!(phone.kind, MatchKind::ExactKeyword);
    }

    #[test]
    fn fuzzy_matches_close_labels() {
        let engine = SuggestionEngine::with_builtin();
        let cat = vec![field(4, "Customer code", FieldKind::Text)];
        let out = engine.suggest("CUSTOMER CODES", &cat);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, MatchKind::Fuzzy);
        assert!(out[0].confidence > FUZZY_THRESHOLD * FUZZY_WEIGHT);
        assert!(out[0].confidence < 0.81);
    }

    #[test]
    fn kind_indicator_matches_date_fields() {
        let engine = SuggestionEngine::with_builtin();
        let cat = vec![field(5, "Έναρξη συμβολαίου", FieldKind::Date)];
        let out = engine.suggest("ΗΜ/ΝΙΑ ΥΠΟΒΟΛΗΣ", &cat);
        assert!(out
            .iter()
            .any(|s| s.field_id == 5 && s.kind == MatchKind::FieldKind));
    }

    #[test]
    fn unrelated_content_yields_nothing() {
        let engine = SuggestionEngine::with_builtin();
        let cat = vec![field(6, "Υποκατάστημα", FieldKind::Text)];
        assert!(engine.suggest("ΑΣΧΕΤΟ ΠΕΔΙΟ", &cat).is_empty());
    }

    struct FixedHistory(Vec<FieldUsage>);
    impl MappingHistory for FixedHistory {
        fn verified_usage(&self, _context: &str) -> Result<Vec<FieldUsage>, PersistenceError> {
            Ok(self.0.clone())
        }
    }

    struct BrokenHistory;
    impl MappingHistory for BrokenHistory {
        fn verified_usage(&self, _context: &str) -> Result<Vec<FieldUsage>, PersistenceError> {
            Err(PersistenceError::TemplateNotFound("history".into()))
        }
    }

    #[test]
    fn history_boost_caps_at_one() {
        let engine = SuggestionEngine::with_builtin();
        let history = FixedHistory(vec![FieldUsage {
            field_id: 2,
            usage_count: 4,
            avg_confidence: 0.9,
        }]);
        let out = engine.suggest_with_history("ΤΗΛΕΦΩΝΟ", &catalog(), &history, "company-1");
        let phone = out.iter().find(|s| s.field_id == 2).unwrap();
        assert_eq!(phone.confidence, 1.0);
        assert!(phone.reason.contains("verified 4 times"));
    }

    #[test]
    fn history_failure_degrades_to_unboosted() {
        let engine = SuggestionEngine::with_builtin();
        let plain = engine.suggest("ΤΗΛΕΦΩΝΟ", &catalog());
        let degraded =
            engine.suggest_with_history("ΤΗΛΕΦΩΝΟ", &catalog(), &BrokenHistory, "company-1");
        assert_eq!(plain, degraded);
    }

    #[test]
    fn auto_mappable_uses_threshold() {
        let engine = SuggestionEngine::with_builtin();
        let strong = engine.suggest("ΤΗΛΕΦΩΝΟ", &catalog());
        assert!(engine.auto_mappable(&strong));
        assert!(!engine.auto_mappable(&[]));
        let weak = engine.suggest_with_history("ΤΗΛΕΦΩΝΟ", &catalog(), &NoHistory, "c");
        assert!(engine.auto_mappable(&weak));
    }
}
