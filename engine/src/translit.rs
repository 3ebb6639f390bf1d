//! Deterministic Greek → Latin transliteration.
//!
//! Used when the render font cannot encode a value: a partially readable
//! document beats a failed fill. The table follows the common romanization
//! (Θ→TH, Ξ→X, Χ→CH, Ψ→PS); accented vowels lose their tonos.

/// Returns `text` with every Greek character replaced by its Latin
/// equivalent. Non-Greek characters pass through unchanged, so the function
/// is idempotent on already-Latin text.
pub fn latinize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match greek_to_latin(c) {
            Some(mapped) => out.push_str(mapped),
            None => out.push(c),
        }
    }
    out
}

/// True when `text` contains at least one character the Greek table maps.
pub fn contains_greek(text: &str) -> bool {
    text.chars().any(|c| greek_to_latin(c).is_some())
}

fn greek_to_latin(c: char) -> Option<&'static str> {
    let mapped = match c {
        'Α' | 'Ά' => "A",
        'Β' => "V",
        'Γ' => "G",
        'Δ' => "D",
        'Ε' | 'Έ' => "E",
        'Ζ' => "Z",
        'Η' | 'Ή' => "I",
        'Θ' => "TH",
        'Ι' | 'Ί' | 'Ϊ' => "I",
        'Κ' => "K",
        'Λ' => "L",
        'Μ' => "M",
        'Ν' => "N",
        'Ξ' => "X",
        'Ο' | 'Ό' => "O",
        'Π' => "P",
        'Ρ' => "R",
        'Σ' => "S",
        'Τ' => "T",
        'Υ' | 'Ύ' | 'Ϋ' => "Y",
        'Φ' => "F",
        'Χ' => "CH",
        'Ψ' => "PS",
        'Ω' | 'Ώ' => "O",
        'α' | 'ά' => "a",
        'β' => "v",
        'γ' => "g",
        'δ' => "d",
        'ε' | 'έ' => "e",
        'ζ' => "z",
        'η' | 'ή' => "i",
        'θ' => "th",
        'ι' | 'ί' | 'ϊ' | 'ΐ' => "i",
        'κ' => "k",
        'λ' => "l",
        'μ' => "m",
        'ν' => "n",
        'ξ' => "x",
        'ο' | 'ό' => "o",
        'π' => "p",
        'ρ' => "r",
        'σ' | 'ς' => "s",
        'τ' => "t",
        'υ' | 'ύ' | 'ϋ' | 'ΰ' => "y",
        'φ' => "f",
        'χ' => "ch",
        'ψ' => "ps",
        'ω' | 'ώ' => "o",
        _ => return None,
    };
    Some(mapped)
}
