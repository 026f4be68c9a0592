use serde::{Deserialize, Serialize};

/// Lifecycle of the local speech model
///
/// Ready and Error are terminal for a given worker instance; recovering from
/// a failed load means tearing the worker down and building a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelState {
    Idle,
    Loading,
    Ready,
    Error,
}

/// Lifecycle of a single transcription job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingState {
    Idle,
    Processing,
    Completed,
    Error,
}

/// Download progress reported while the model loads
///
/// Progress is a 0-100 percentage. Each artifact restarts at 0, so the value
/// is monotonic per file, not globally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadingProgress {
    pub progress: f32,
    pub file: Option<String>,
}

impl Default for LoadingProgress {
    fn default() -> Self {
        Self {
            progress: 0.0,
            file: None,
        }
    }
}

/// One timestamped segment of a transcript
///
/// Times are in seconds; an open-ended final segment has `end: None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptChunk {
    pub text: String,
    pub start: f64,
    pub end: Option<f64>,
}

/// Output of a transcription job, immutable once produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionResult {
    pub text: String,
    pub chunks: Option<Vec<TranscriptChunk>>,
}
