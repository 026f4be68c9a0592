use crate::extract::GeminiExtractor;
use crate::store::Store;
use crate::transcribe::Transcriber;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub transcriber: Arc<Transcriber>,
    pub extractor: Arc<GeminiExtractor>,
}

impl AppState {
    pub fn new(
        store: Arc<Store>,
        transcriber: Arc<Transcriber>,
        extractor: Arc<GeminiExtractor>,
    ) -> Self {
        Self {
            store,
            transcriber,
            extractor,
        }
    }
}
