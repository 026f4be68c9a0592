pub mod audio;
pub mod config;
pub mod extract;
pub mod http;
pub mod stats;
pub mod store;
pub mod transcribe;

pub use audio::{encode_wav_base64, AudioClip};
pub use config::Config;
pub use extract::{
    ExtractionData, ExtractionItem, ExtractionOutcome, ExtractionResult, GeminiExtractor,
    TextExtractionResult,
};
pub use http::{create_router, AppState};
pub use stats::{monthly_summary, MonthlySummary};
pub use store::{Category, Recording, RecordingKind, Store, Wallet};
pub use transcribe::{
    LoadingProgress, ModelState, ProcessingState, SpeechEngine, Transcriber, TranscriberStatus,
    TranscriptChunk, TranscriptionResult, WhisperEngine,
};
