//! Placeholder detection over extracted text.
//!
//! An ordered set of lexical patterns runs independently over the same
//! text; every match yields one occurrence with the pattern's prior
//! confidence. Nothing is filtered for low confidence here: keeping or
//! discarding weak candidates is the caller's policy. Occurrences with the
//! same matched text on the same page collapse to the highest-confidence
//! instance, so a string like `[ΟΝΟΜΑ]` that satisfies three bracket
//! variants surfaces once, under the strictest pattern.

use std::sync::OnceLock;

use regex::Regex;

use common::model::occurrence::{PatternKind, PlaceholderOccurrence};

use crate::extract::split_pages;

/// Characters of surrounding text kept on each side of a match.
const CONTEXT_CHARS: usize = 50;

/// Uppercase Latin plus the unaccented Greek capital block.
const UP: &str = "A-ZΑ-Ω";
const LOW: &str = "a-zα-ω";
/// Accented Greek vowels, dialytika forms and final sigma.
const ACC: &str = "άέήίόύώϊϋΐΰΆΈΉΊΌΎΏς";

enum PatternSpec {
    Simple {
        kind: PatternKind,
        confidence: f64,
        regex: Regex,
    },
    /// Fill-in runs (`___`, `...`, `---`). When a `Label:` prefix is part
    /// of the match the occurrence is re-kinded to the colon variant and
    /// the label becomes the content; Greek-prefixed labels score lower
    /// than plain ones.
    Run {
        regex: Regex,
        bare_kind: PatternKind,
        bare_confidence: f64,
        colon_kind: Option<PatternKind>,
        latin_confidence: f64,
        greek_confidence: f64,
    },
}

static PATTERNS: OnceLock<Vec<PatternSpec>> = OnceLock::new();

fn patterns() -> &'static [PatternSpec] {
    PATTERNS.get_or_init(build_patterns)
}

fn build_patterns() -> Vec<PatternSpec> {
    let simple = |kind, confidence, pattern: String| PatternSpec::Simple {
        kind,
        confidence,
        regex: Regex::new(&pattern).unwrap_or_else(|e| panic!("bad pattern {kind:?}: {e}")),
    };

    let label = format!("[A-Za-z{UP}{LOW}{ACC}][A-Za-z0-9{UP}{LOW}{ACC} ]{{0,40}}");
    let run = |bare_kind,
               bare_confidence,
               colon_kind: Option<PatternKind>,
               latin_confidence,
               greek_confidence,
               run_body: &str| {
        let pattern = if colon_kind.is_some() {
            format!("(?:({label})\\s*:[ \\t]*)?({run_body})")
        } else {
            format!("({run_body})")
        };
        PatternSpec::Run {
            regex: Regex::new(&pattern)
                .unwrap_or_else(|e| panic!("bad run pattern {bare_kind:?}: {e}")),
            bare_kind,
            bare_confidence,
            colon_kind,
            latin_confidence,
            greek_confidence,
        }
    };

    vec![
        simple(
            PatternKind::Bracket,
            0.95,
            format!("\\[([{UP}][{UP}0-9 _]{{0,60}})\\]"),
        ),
        simple(
            PatternKind::Curly,
            0.90,
            format!("\\{{([{UP}][{UP}0-9 _]{{0,60}})\\}}"),
        ),
        simple(
            PatternKind::MixedBracket,
            0.92,
            format!("\\[([A-Za-z{UP}{LOW}][A-Za-z{UP}{LOW}0-9 _\\-]{{0,60}})\\]"),
        ),
        simple(
            PatternKind::MixedCurly,
            0.87,
            format!("\\{{([A-Za-z{UP}{LOW}][A-Za-z{UP}{LOW}0-9 _\\-]{{0,60}})\\}}"),
        ),
        simple(
            PatternKind::GreekAccentBracket,
            0.90,
            format!("\\[([{UP}{LOW}{ACC}][{UP}{LOW}{ACC}0-9 _\\-]{{0,60}})\\]"),
        ),
        simple(
            PatternKind::GreekAccentCurly,
            0.85,
            format!("\\{{([{UP}{LOW}{ACC}][{UP}{LOW}{ACC}0-9 _\\-]{{0,60}})\\}}"),
        ),
        simple(
            PatternKind::Angle,
            0.85,
            format!("<([{UP}][{UP}0-9 _]{{0,60}})>"),
        ),
        simple(
            PatternKind::Parens,
            0.82,
            format!("\\(([A-Za-z{UP}{LOW}{ACC}][A-Za-z{UP}{LOW}{ACC}0-9 _\\-]{{0,60}})\\)"),
        ),
        run(
            PatternKind::Underline,
            0.70,
            Some(PatternKind::ColonUnderline),
            0.80,
            0.70,
            "_{3,}",
        ),
        run(
            PatternKind::Dots,
            0.65,
            Some(PatternKind::ColonDots),
            0.75,
            0.70,
            "\\.{3,}",
        ),
        run(PatternKind::Dashes, 0.68, None, 0.68, 0.68, "-{3,}"),
    ]
}

fn is_greek(c: char) -> bool {
    ('\u{0370}'..='\u{03FF}').contains(&c) || ('\u{1F00}'..='\u{1FFF}').contains(&c)
}

fn char_offset(text: &str, byte_offset: usize) -> usize {
    text[..byte_offset].chars().count()
}

fn context_window(text: &str, match_start: usize, match_end: usize) -> String {
    let before: String = text[..match_start]
        .chars()
        .rev()
        .take(CONTEXT_CHARS)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    let after: String = text[match_end..].chars().take(CONTEXT_CHARS).collect();
    format!("{before}{}{after}", &text[match_start..match_end])
}

/// Runs every pattern over `text`, producing one occurrence per match.
///
/// Occurrences are deduplicated by exact matched text per page (highest
/// confidence wins) and returned sorted by confidence descending. Cost is
/// O(patterns × text length); there is no early exit.
pub fn detect(text: &str, page: usize) -> Vec<PlaceholderOccurrence> {
    let mut found: Vec<PlaceholderOccurrence> = Vec::new();

    for spec in patterns() {
        match spec {
            PatternSpec::Simple {
                kind,
                confidence,
                regex,
            } => {
                for caps in regex.captures_iter(text) {
                    let whole = caps.get(0).unwrap();
                    let content = caps
                        .get(1)
                        .map(|m| m.as_str())
                        .unwrap_or_else(|| whole.as_str());
                    found.push(occurrence(
                        text,
                        page,
                        whole.start(),
                        whole.end(),
                        content.trim().to_string(),
                        *kind,
                        *confidence,
                    ));
                }
            }
            PatternSpec::Run {
                regex,
                bare_kind,
                bare_confidence,
                colon_kind,
                latin_confidence,
                greek_confidence,
            } => {
                for caps in regex.captures_iter(text) {
                    let whole = caps.get(0).unwrap();
                    let label = colon_kind.and_then(|_| caps.get(1));
                    let (kind, confidence, content) = match (colon_kind, label) {
                        (Some(colon), Some(label)) => {
                            let label_text = label.as_str().trim();
                            let confidence = if label_text.chars().any(is_greek) {
                                *greek_confidence
                            } else {
                                *latin_confidence
                            };
                            (*colon, confidence, label_text.to_string())
                        }
                        _ => {
                            let run = caps
                                .get(2)
                                .or_else(|| caps.get(1))
                                .map(|m| m.as_str())
                                .unwrap_or_else(|| whole.as_str());
                            (*bare_kind, *bare_confidence, run.to_string())
                        }
                    };
                    found.push(occurrence(
                        text,
                        page,
                        whole.start(),
                        whole.end(),
                        content,
                        kind,
                        confidence,
                    ));
                }
            }
        }
    }

    dedup_and_sort(found)
}

/// Splits `full_text` into `page_count` approximate pages and detects per
/// page. If the split yields zero matches anywhere, the whole text is
/// re-scanned once as page 0 to tolerate extraction/pagination mismatches
/// (a placeholder cut in half at a page boundary, for instance).
pub fn analyze_text(full_text: &str, page_count: usize) -> Vec<PlaceholderOccurrence> {
    let pages = split_pages(full_text, page_count.max(1));
    let mut all: Vec<PlaceholderOccurrence> = Vec::new();
    for (index, page_text) in pages.iter().enumerate() {
        all.extend(detect(page_text, index));
    }
    if all.is_empty() {
        return detect(full_text, 0);
    }
    // Pages were detected independently; merge back into one ranked list.
    dedup_and_sort(all)
}

fn occurrence(
    text: &str,
    page: usize,
    start_byte: usize,
    end_byte: usize,
    content: String,
    kind: PatternKind,
    confidence: f64,
) -> PlaceholderOccurrence {
    PlaceholderOccurrence {
        matched_text: text[start_byte..end_byte].to_string(),
        content,
        kind,
        confidence,
        page,
        start: char_offset(text, start_byte),
        end: char_offset(text, end_byte),
        context: context_window(text, start_byte, end_byte),
    }
}

fn dedup_and_sort(found: Vec<PlaceholderOccurrence>) -> Vec<PlaceholderOccurrence> {
    let mut kept: Vec<PlaceholderOccurrence> = Vec::with_capacity(found.len());
    for occ in found {
        match kept
            .iter_mut()
            .find(|k| k.matched_text == occ.matched_text && k.page == occ.page)
        {
            Some(existing) => {
                if occ.confidence > existing.confidence {
                    *existing = occ;
                }
            }
            None => kept.push(occ),
        }
    }
    kept.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then(a.page.cmp(&b.page))
            .then(a.start.cmp(&b.start))
    });
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bracket_beats_weaker_bracket_variants() {
        let found = detect("Στοιχεία: [ΟΝΟΜΑ]", 0);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, PatternKind::Bracket);
        assert_eq!(found[0].content, "ΟΝΟΜΑ");
        assert_eq!(found[0].confidence, 0.95);
    }

    #[test]
    fn scenario_name_and_underline_run() {
        let found = detect("Όνομα: [ΟΝΟΜΑ] Τηλέφωνο: ____", 0);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].kind, PatternKind::Bracket);
        assert_eq!(found[0].content, "ΟΝΟΜΑ");
        assert_eq!(found[0].confidence, 0.95);
        assert_eq!(found[1].kind, PatternKind::ColonUnderline);
        assert_eq!(found[1].content, "Τηλέφωνο");
        assert_eq!(found[1].confidence, 0.70);
    }

    #[test]
    fn latin_label_scores_higher_than_greek() {
        let found = detect("Phone: ____", 0);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, PatternKind::ColonUnderline);
        assert_eq!(found[0].confidence, 0.80);
    }

    #[test]
    fn bare_runs_without_labels() {
        let found = detect("σημειώστε ____ και ... και ---", 0);
        let kinds: Vec<PatternKind> = found.iter().map(|o| o.kind).collect();
        assert!(kinds.contains(&PatternKind::Underline));
        assert!(kinds.contains(&PatternKind::Dots));
        assert!(kinds.contains(&PatternKind::Dashes));
    }

    #[test]
    fn curly_angle_and_parens() {
        let found = detect("{ΠΟΛΗ} <CITY> (Remarks)", 0);
        let kinds: Vec<PatternKind> = found.iter().map(|o| o.kind).collect();
        assert!(kinds.contains(&PatternKind::Curly));
        assert!(kinds.contains(&PatternKind::Angle));
        assert!(kinds.contains(&PatternKind::Parens));
    }

    #[test]
    fn mixed_case_bracket_with_dash() {
        let found = detect("[Full-Name]", 0);
        assert_eq!(found[0].kind, PatternKind::MixedBracket);
        assert_eq!(found[0].confidence, 0.92);
    }

    #[test]
    fn greek_accented_bracket() {
        let found = detect("[Διεύθυνση]", 0);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, PatternKind::GreekAccentBracket);
        assert_eq!(found[0].confidence, 0.90);
    }

    #[test]
    fn detection_is_idempotent() {
        let text = "Όνομα: [ΟΝΟΜΑ] και {ΠΟΛΗ} και ____";
        assert_eq!(detect(text, 3), detect(text, 3));
    }

    #[test]
    fn sorted_descending_by_confidence() {
        let found = detect("[ΟΝΟΜΑ] (note) ... ---", 0);
        for pair in found.windows(2) {
            assert!(pair[0].confidence >= pair[1].confidence);
        }
    }

    #[test]
    fn context_window_is_bounded() {
        let long = format!("{}[NAME]{}", "a".repeat(200), "b".repeat(200));
        let found = detect(&long, 0);
        let occ = found.iter().find(|o| o.matched_text == "[NAME]").unwrap();
        assert_eq!(occ.context.chars().count(), 50 + 6 + 50);
    }

    #[test]
    fn offsets_are_character_based() {
        let found = detect("άέή [NAME]", 0);
        let occ = found.iter().find(|o| o.matched_text == "[NAME]").unwrap();
        assert_eq!(occ.start, 4);
        assert_eq!(occ.end, 10);
    }

    #[test]
    fn fallback_rescans_unsplit_text() {
        // Splitting into two pages cuts the only placeholder in half.
        let found = analyze_text("[NAMEXY]", 2);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].page, 0);
        assert_eq!(found[0].content, "NAMEXY");
    }

    #[test]
    fn pages_are_indexed() {
        let text = format!("{}[ALPHA]{}[BETA]", "x".repeat(20), "y".repeat(20));
        let found = analyze_text(&text, 2);
        assert!(found.iter().any(|o| o.content == "ALPHA" && o.page == 0));
        assert!(found.iter().any(|o| o.content == "BETA" && o.page == 1));
    }
}
