//! Text extraction from a template's source byte stream.
//!
//! The pipeline owns text and pagination only; decoding binary container
//! formats is the uploader's concern. Pages are taken from form feeds when
//! the source carries them, otherwise `split_pages` divides the text
//! proportionally by character length, which is approximate by design and
//! tolerated downstream by the detector's full-text fallback pass.

use crate::error::DocumentError;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Raw text pulled from a source document, with its logical pages.
#[derive(Debug, Clone)]
pub struct ExtractedText {
    pub text: String,
    pub pages: Vec<String>,
}

/// Decodes the source bytes into per-page text.
///
/// Empty input and invalid UTF-8 fail the whole call with a
/// `DocumentError`; the caller marks the template `Failed`.
pub fn extract_text(bytes: &[u8]) -> Result<ExtractedText, DocumentError> {
    if bytes.is_empty() {
        return Err(DocumentError::Empty);
    }
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let text = std::str::from_utf8(bytes).map_err(|_| DocumentError::Unreadable)?;
    if text.trim().is_empty() {
        return Err(DocumentError::Empty);
    }

    let pages: Vec<String> = if text.contains('\u{0c}') {
        text.split('\u{0c}').map(str::to_string).collect()
    } else {
        vec![text.to_string()]
    };

    Ok(ExtractedText {
        text: text.to_string(),
        pages,
    })
}

/// Divides `text` into `page_count` chunks of roughly equal character
/// length, respecting char boundaries. With `page_count <= 1` the whole
/// text is a single page.
pub fn split_pages(text: &str, page_count: usize) -> Vec<String> {
    if page_count <= 1 {
        return vec![text.to_string()];
    }
    let chars: Vec<char> = text.chars().collect();
    let per_page = chars.len().div_ceil(page_count);
    if per_page == 0 {
        return vec![text.to_string()];
    }
    chars
        .chunks(per_page)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_plain_utf8() {
        let out = extract_text("Όνομα: [ΟΝΟΜΑ]".as_bytes()).unwrap();
        assert_eq!(out.text, "Όνομα: [ΟΝΟΜΑ]");
        assert_eq!(out.pages.len(), 1);
    }

    #[test]
    fn strips_bom() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"hello");
        assert_eq!(extract_text(&bytes).unwrap().text, "hello");
    }

    #[test]
    fn empty_input_is_a_document_error() {
        assert!(matches!(extract_text(b""), Err(DocumentError::Empty)));
        assert!(matches!(extract_text(b"   "), Err(DocumentError::Empty)));
    }

    #[test]
    fn invalid_utf8_is_unreadable() {
        assert!(matches!(
            extract_text(&[0xFF, 0xFE, 0x00]),
            Err(DocumentError::Unreadable)
        ));
    }

    #[test]
    fn form_feed_splits_pages() {
        let out = extract_text("page one\u{0c}page two".as_bytes()).unwrap();
        assert_eq!(out.pages, vec!["page one", "page two"]);
    }

    #[test]
    fn proportional_split_respects_char_boundaries() {
        let text = "αβγδεζηθικ";
        let pages = split_pages(text, 2);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages.concat(), text);
    }
}
