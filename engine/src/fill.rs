//! Document filling: splice confirmed values into the template text and
//! render the result as a PDF.
//!
//! Filling is split in two stages. `compose` is pure text work (value
//! resolution, splicing, placement) and carries all the testable semantics;
//! `render` turns the composed document into PDF bytes with genpdf and only
//! adds the charset guard. A missing value is never an error: the
//! placeholder renders blank and the gap is visible in the output.

use std::path::{Path, PathBuf};

use genpdf::elements::{Break, Paragraph};
use genpdf::{Document, Element, Margins, SimplePageDecorator};
use log::{debug, warn};

use common::model::field::{Field, FieldKind};
use common::model::mapping::{PageRect, StoredMapping};
use common::model::value::{AuxiliaryValues, FieldValue, ValueSource};

use crate::error::{EngineError, ValidationError};
use crate::extract::ExtractedText;
use crate::keywords::{KeywordCategory, KeywordTables};
use crate::translit;

// A4, portrait.
const PAGE_WIDTH_MM: f64 = 210.0;
const PAGE_HEIGHT_MM: f64 = 297.0;
const MARGIN_MM: f64 = 10.0;

/// A value anchored to explicit page coordinates instead of placeholder
/// text.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedText {
    pub page: usize,
    pub rect: PageRect,
    pub text: String,
}

/// The composed output: per-page text with placeholders replaced, plus the
/// position-anchored values.
#[derive(Debug, Clone)]
pub struct FilledDocument {
    pub pages: Vec<String>,
    pub placed: Vec<PlacedText>,
}

/// Character repertoire the render font can encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    /// Latin-1 only; Greek values are transliterated.
    Latin1,
    Unicode,
}

impl Charset {
    fn can_encode(self, text: &str) -> bool {
        match self {
            Charset::Latin1 => text.chars().all(|c| (c as u32) <= 0xFF),
            Charset::Unicode => true,
        }
    }
}

pub struct RenderOptions {
    pub title: String,
    pub charset: Charset,
    pub font_dir: PathBuf,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            title: "Filled document".to_string(),
            charset: Charset::Unicode,
            font_dir: PathBuf::from("./fonts"),
        }
    }
}

/// Splices resolved values into the template text.
///
/// Per mapping: the direct value wins, formatted by field kind; without
/// one, the auxiliary record is consulted by keyword category of the
/// placeholder; failing both, the placeholder is replaced by blank text.
/// Mappings with explicit coordinates become `PlacedText` entries, as do
/// placeholder-anchored mappings whose text no longer appears on the page
/// (re-uploaded sources drift); those fall back to a coarse
/// category-derived position. `tables` drives the category lookups, so a
/// localized or tenant-specific table applies to filling too.
pub fn compose(
    template_id: &str,
    text: &ExtractedText,
    mappings: &[StoredMapping],
    values: &ValueSource,
    auxiliary: &AuxiliaryValues,
    catalog: &[Field],
    tables: &KeywordTables,
) -> Result<FilledDocument, ValidationError> {
    if mappings.is_empty() {
        return Err(ValidationError::NoMappings(template_id.to_string()));
    }

    let mut pages = text.pages.clone();
    if pages.is_empty() {
        pages.push(text.text.clone());
    }
    let mut placed = Vec::new();

    for stored in mappings {
        let mapping = &stored.mapping;
        let kind = stored
            .field_kind
            .or_else(|| {
                catalog
                    .iter()
                    .find(|f| f.id == mapping.field_id)
                    .map(|f| f.kind)
            })
            .unwrap_or(FieldKind::Text);
        let category = tables.category_of(&mapping.placeholder);
        let value = resolve_value(
            mapping.field_id,
            kind,
            &mapping.placeholder,
            values,
            auxiliary,
            tables,
        );

        if let Some(rect) = mapping.position {
            placed.push(PlacedText {
                page: mapping.page,
                rect,
                text: value,
            });
            continue;
        }

        let page = mapping.page.min(pages.len() - 1);
        if pages[page].contains(&mapping.placeholder) {
            pages[page] = pages[page].replace(&mapping.placeholder, &value);
        } else {
            debug!(
                "placeholder {:?} not found on page {page} of template {template_id}, placing by category",
                mapping.placeholder
            );
            placed.push(PlacedText {
                page,
                rect: fallback_rect(category),
                text: value,
            });
        }
    }

    Ok(FilledDocument { pages, placed })
}

/// Direct value, auxiliary fallback, or blank.
fn resolve_value(
    field_id: i64,
    kind: FieldKind,
    placeholder: &str,
    values: &ValueSource,
    auxiliary: &AuxiliaryValues,
    tables: &KeywordTables,
) -> String {
    if let Some(value) = values.get(&field_id) {
        if value.is_present() {
            return format_value(kind, value);
        }
    }
    let fallback = tables
        .category_of(placeholder)
        .and_then(|category| match category {
            KeywordCategory::Name => auxiliary.full_name.clone(),
            KeywordCategory::Phone => auxiliary.phone.clone(),
            KeywordCategory::Address => auxiliary.address.clone(),
            KeywordCategory::TaxId => auxiliary.tax_id.clone(),
            KeywordCategory::Email => auxiliary.email.clone(),
            _ => None,
        });
    match fallback {
        Some(text) => text,
        None => {
            debug!("no value for field {field_id} ({placeholder:?}), leaving blank");
            String::new()
        }
    }
}

fn format_value(kind: FieldKind, value: &FieldValue) -> String {
    match (kind, value) {
        (FieldKind::Checkbox, FieldValue::Bool(checked)) => {
            if *checked { "X".to_string() } else { String::new() }
        }
        (FieldKind::Date, FieldValue::Date(date)) => date.format("%d/%m/%Y").to_string(),
        (FieldKind::Number, FieldValue::Number(n)) => format_number(*n),
        (_, FieldValue::Text(s)) => s.clone(),
        (_, FieldValue::Number(n)) => format_number(*n),
        (_, FieldValue::Date(date)) => date.format("%d/%m/%Y").to_string(),
        (_, FieldValue::Bool(b)) => {
            if *b { "X".to_string() } else { String::new() }
        }
    }
}

/// Greek-convention number formatting: dot-grouped thousands, comma
/// decimals, two decimal places when the value is not integral.
fn format_number(n: f64) -> String {
    let negative = n < 0.0;
    let rounded = (n.abs() * 100.0).round() / 100.0;
    let int_part = rounded.trunc() as i64;
    let cents = ((rounded - rounded.trunc()) * 100.0).round() as i64;

    let digits = int_part.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if cents > 0 {
        out.push(',');
        out.push_str(&format!("{cents:02}"));
    }
    out
}

/// Coarse default position for a value that lost its text anchor, by the
/// semantic category of its placeholder. Stacked down the left column in a
/// stable order.
fn fallback_rect(category: Option<KeywordCategory>) -> PageRect {
    let y_pct = match category {
        Some(KeywordCategory::Name) => 20.0,
        Some(KeywordCategory::Phone) => 28.0,
        Some(KeywordCategory::Address) => 36.0,
        Some(KeywordCategory::TaxId) => 44.0,
        Some(KeywordCategory::Email) => 52.0,
        Some(KeywordCategory::Date) => 12.0,
        Some(KeywordCategory::Number) => 60.0,
        Some(KeywordCategory::Other) | None => 68.0,
    };
    PageRect {
        x_pct: 15.0,
        y_pct,
        width_pct: 40.0,
        height_pct: 4.0,
    }
}

/// Replaces Greek text the charset cannot encode with its Latin
/// transliteration. Logged at `warn`, never an error. Unencodable text
/// without Greek characters is left alone, since transliterating cannot
/// improve it.
pub fn apply_charset(mut doc: FilledDocument, charset: Charset) -> FilledDocument {
    for page in &mut doc.pages {
        if !charset.can_encode(page) && translit::contains_greek(page) {
            warn!("page text exceeds render charset, transliterating");
            *page = translit::latinize(page);
        }
    }
    for item in &mut doc.placed {
        if !charset.can_encode(&item.text) && translit::contains_greek(&item.text) {
            warn!("placed value {:?} exceeds render charset, transliterating", item.text);
            item.text = translit::latinize(item.text.as_str());
        }
    }
    doc
}

fn load_font(
    dir: &Path,
) -> Result<genpdf::fonts::FontFamily<genpdf::fonts::FontData>, genpdf::error::Error> {
    if let Ok(family) = genpdf::fonts::from_files(dir, "Arial", None) {
        return Ok(family);
    }
    genpdf::fonts::from_files(dir, "LiberationSans", None)
}

/// Percentage coordinates to millimetres on an A4 page.
fn rect_to_mm(rect: PageRect) -> (f64, f64) {
    (
        rect.x_pct / 100.0 * PAGE_WIDTH_MM,
        rect.y_pct / 100.0 * PAGE_HEIGHT_MM,
    )
}

/// Renders the composed document to PDF bytes.
///
/// Placement of position-anchored values is line-flow based: the x
/// coordinate becomes left padding in millimetres and the y coordinate
/// orders the values below the page text. A missing font directory fails
/// the call; an unencodable value does not (see `apply_charset`).
pub fn render(
    template_id: &str,
    doc: FilledDocument,
    options: &RenderOptions,
) -> Result<Vec<u8>, EngineError> {
    let doc = apply_charset(doc, options.charset);

    let font_family = load_font(&options.font_dir)
        .map_err(|e| EngineError::render(template_id, e.to_string()))?;
    let mut pdf = Document::new(font_family);
    pdf.set_title(&options.title);
    pdf.set_font_size(10);

    let mut decorator = SimplePageDecorator::new();
    decorator.set_margins(MARGIN_MM);
    pdf.set_page_decorator(decorator);

    let page_count = doc.pages.len();
    for (page_index, page) in doc.pages.iter().enumerate() {
        for line in page.split('\n') {
            pdf.push(Paragraph::new(line));
        }

        let mut placed: Vec<&PlacedText> =
            doc.placed.iter().filter(|p| p.page == page_index).collect();
        placed.sort_by(|a, b| {
            a.rect
                .y_pct
                .total_cmp(&b.rect.y_pct)
                .then(a.rect.x_pct.total_cmp(&b.rect.x_pct))
        });
        for item in placed {
            let (x_mm, _) = rect_to_mm(item.rect);
            pdf.push(Break::new(1));
            pdf.push(
                Paragraph::new(item.text.as_str()).padded(Margins::trbl(0.0, 0.0, 0.0, x_mm)),
            );
        }

        if page_index + 1 < page_count {
            pdf.push(genpdf::elements::PageBreak::new());
        }
    }

    let mut bytes = Vec::new();
    pdf.render(&mut bytes)
        .map_err(|e| EngineError::render(template_id, e.to_string()))?;
    Ok(bytes)
}
