use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A scalar value supplied for a catalog field at fill time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
}

impl FieldValue {
    /// A value counts as present unless it is blank text. Booleans and
    /// numbers are always present, `false` and `0` included.
    pub fn is_present(&self) -> bool {
        match self {
            FieldValue::Text(s) => !s.trim().is_empty(),
            FieldValue::Number(_) | FieldValue::Bool(_) | FieldValue::Date(_) => true,
        }
    }
}

/// Mapping from field id to the value supplied by the caller.
pub type ValueSource = HashMap<i64, FieldValue>;

/// Secondary record used when no direct value exists for a mapped field:
/// the filler falls back to these by keyword category of the placeholder.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuxiliaryValues {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub tax_id: Option<String>,
    pub email: Option<String>,
}
