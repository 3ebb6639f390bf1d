//! Read-only access to prior verified mappings.
//!
//! The suggestion engine consults this to reinforce candidates that humans
//! have confirmed before in the same context (originating company). The
//! lookup is best-effort by contract: implementations report failures as
//! `PersistenceError`, and the engine degrades to the unboosted list.

use serde::{Deserialize, Serialize};

use crate::error::PersistenceError;

/// Aggregated verified usage of one field within a context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldUsage {
    pub field_id: i64,
    pub usage_count: u32,
    pub avg_confidence: f64,
}

/// Query interface over the historical mapping log.
pub trait MappingHistory {
    fn verified_usage(&self, context_id: &str) -> Result<Vec<FieldUsage>, PersistenceError>;
}

/// History source that always reports no prior usage. Useful for callers
/// without a context and for tests.
pub struct NoHistory;

impl MappingHistory for NoHistory {
    fn verified_usage(&self, _context_id: &str) -> Result<Vec<FieldUsage>, PersistenceError> {
        Ok(Vec::new())
    }
}
