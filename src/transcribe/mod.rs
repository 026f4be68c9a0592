//! Transcription orchestration
//!
//! The orchestrator tracks two lifecycles: the model (idle → loading →
//! ready/error) and the current job (idle → processing → completed/error).
//! Actual inference happens in a background worker task that owns the model
//! exclusively and talks to the orchestrator over a message channel.

mod engine;
mod orchestrator;
mod state;
mod worker;

pub use engine::{SpeechEngine, WhisperEngine};
pub use orchestrator::{Transcriber, TranscriberStatus};
pub use state::{
    LoadingProgress, ModelState, ProcessingState, TranscriptChunk, TranscriptionResult,
};
pub use worker::{WorkerEvent, WorkerRequest};
