use serde::{Deserialize, Serialize};

/// One detected instance of a placeholder pattern at a specific position in
/// the extracted text. Occurrences are ephemeral: they are recomputed on
/// every analysis pass and never persisted on their own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceholderOccurrence {
    /// The full matched substring, e.g. `[ΟΝΟΜΑ]`.
    pub matched_text: String,
    /// The captured inner content (the full match when the pattern has no
    /// capture group), e.g. `ΟΝΟΜΑ`.
    pub content: String,
    pub kind: PatternKind,
    /// Prior confidence of the pattern that produced this occurrence.
    pub confidence: f64,
    /// Zero-based logical page index.
    pub page: usize,
    /// Character offset of the match start within the page text.
    pub start: usize,
    /// Character offset one past the match end.
    pub end: usize,
    /// Up to 50 characters of surrounding text on each side.
    pub context: String,
}

/// Lexical pattern families recognized by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatternKind {
    Bracket,
    Curly,
    MixedBracket,
    MixedCurly,
    GreekAccentBracket,
    GreekAccentCurly,
    Angle,
    Parens,
    ColonUnderline,
    ColonDots,
    Underline,
    Dots,
    Dashes,
}

impl PatternKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PatternKind::Bracket => "bracket",
            PatternKind::Curly => "curly",
            PatternKind::MixedBracket => "mixed_bracket",
            PatternKind::MixedCurly => "mixed_curly",
            PatternKind::GreekAccentBracket => "greek_bracket",
            PatternKind::GreekAccentCurly => "greek_curly",
            PatternKind::Angle => "angle",
            PatternKind::Parens => "parens",
            PatternKind::ColonUnderline => "colon_underline",
            PatternKind::ColonDots => "colon_dots",
            PatternKind::Underline => "underline",
            PatternKind::Dots => "dots",
            PatternKind::Dashes => "dashes",
        }
    }
}
