use serde::{Deserialize, Serialize};

/// Lifecycle of a background analysis job.
///
/// `InProgress` carries the number of pages processed so far. `Completed`
/// carries the serialized analysis result so a poller gets the payload in
/// the same response as the terminal status.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    InProgress(u32),
    Completed(String),
    Failed(String),
}
