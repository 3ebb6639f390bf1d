//! Typed error taxonomy for the pipeline.
//!
//! Render degradation (a font that cannot encode a value) and missing
//! values are deliberately *not* represented here: the first is logged and
//! worked around with transliteration, the second renders as blank text.

use thiserror::Error;

/// The source document could not be read at all. Fails the whole call;
/// the caller is expected to mark the template `Failed`.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("source document is empty")]
    Empty,
    #[error("source document is not valid UTF-8 text")]
    Unreadable,
}

/// A structurally invalid mapping request, rejected before any persistence
/// mutation happens.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("mapping at index {0} has an empty placeholder")]
    EmptyPlaceholder(usize),
    #[error("mapping at index {index} references invalid field id {field_id}")]
    InvalidFieldId { index: usize, field_id: i64 },
    #[error("no mappings configured for template {0}")]
    NoMappings(String),
}

/// Backing-store failure. A failure during save triggers rollback of the
/// in-flight replace; the prior mapping set remains authoritative.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("template {0} not found")]
    TemplateNotFound(String),
    #[error(transparent)]
    Database(#[from] rusqlite::Error),
}

/// Top-level error surfaced to callers, with enough context (template id,
/// stage) to report to a human operator.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("document error on template {template_id}: {source}")]
    Document {
        template_id: String,
        #[source]
        source: DocumentError,
    },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error("pdf rendering failed for template {template_id}: {message}")]
    Render { template_id: String, message: String },
}

impl EngineError {
    pub fn document(template_id: impl Into<String>, source: DocumentError) -> Self {
        EngineError::Document {
            template_id: template_id.into(),
            source,
        }
    }

    pub fn render(template_id: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::Render {
            template_id: template_id.into(),
            message: message.into(),
        }
    }
}
