use serde::{Deserialize, Serialize};

/// A document template owned by a configuration context (company + field +
/// option in the originating system). The raw source bytes live in the
/// backing store and are not carried on listing reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub company_id: String,
    pub field_id: String,
    pub option_id: String,
    /// MD5 fingerprint of the current source byte stream.
    pub source_md5: String,
    pub page_count: u32,
    pub status: AnalysisStatus,
    /// Number of placeholders found by the latest analysis pass.
    pub placeholder_count: u32,
}

/// Analysis lifecycle of a template.
///
/// Created as `Pending` on upload, `Analyzed` once detection has run,
/// `Mapped` once a mapping set is saved, `Failed` on an unrecoverable
/// extraction error. A re-upload resets the template to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisStatus {
    Pending,
    Analyzed,
    Mapped,
    Failed,
}

impl AnalysisStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisStatus::Pending => "pending",
            AnalysisStatus::Analyzed => "analyzed",
            AnalysisStatus::Mapped => "mapped",
            AnalysisStatus::Failed => "failed",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(AnalysisStatus::Pending),
            "analyzed" => Some(AnalysisStatus::Analyzed),
            "mapped" => Some(AnalysisStatus::Mapped),
            "failed" => Some(AnalysisStatus::Failed),
            _ => None,
        }
    }
}
