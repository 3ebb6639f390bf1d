//! Template placeholder mapping pipeline.
//!
//! Takes a template's source text, detects fill-in placeholders (bracketed
//! tags, underline runs, dotted lines, in Greek or Latin), ranks catalog
//! fields as mapping candidates for each one, persists the human-confirmed
//! mapping set transactionally, and fills documents by splicing field
//! values back over the placeholders. Analysis runs as a background job
//! with a pollable status.

pub mod analysis;
pub mod db;
pub mod detect;
pub mod error;
pub mod extract;
pub mod fill;
pub mod history;
pub mod jobs;
pub mod keywords;
pub mod store;
pub mod suggest;
pub mod translit;

pub use analysis::{analyze_template, TemplateAnalysis};
pub use error::{DocumentError, EngineError, PersistenceError, ValidationError};
pub use store::{MappingStore, NewTemplate};
pub use suggest::SuggestionEngine;
