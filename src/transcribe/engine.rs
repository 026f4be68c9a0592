use super::state::{LoadingProgress, TranscriptChunk, TranscriptionResult};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::info;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

/// The model behind the transcription worker.
///
/// `load` runs once per engine instance and may stream download progress;
/// `transcribe` is only called after a successful load. Implemented by the
/// whisper engine in production and by stubs in tests.
#[async_trait]
pub trait SpeechEngine: Send + 'static {
    async fn load(&mut self, progress: mpsc::UnboundedSender<LoadingProgress>) -> Result<()>;

    async fn transcribe(&mut self, samples: Vec<f32>) -> Result<TranscriptionResult>;
}

/// Whisper-backed speech engine.
///
/// Downloads the model artifact on first load (progress reported per chunk),
/// then holds the context for the lifetime of the worker. Inference is
/// CPU-heavy and runs under `spawn_blocking`.
pub struct WhisperEngine {
    artifact_url: String,
    cache_path: PathBuf,
    language: String,
    ctx: Option<WhisperContext>,
}

impl WhisperEngine {
    pub fn new(artifact_url: String, cache_path: PathBuf, language: String) -> Self {
        Self {
            artifact_url,
            cache_path,
            language,
            ctx: None,
        }
    }

    async fn download_artifact(
        &self,
        progress: &mpsc::UnboundedSender<LoadingProgress>,
    ) -> Result<()> {
        let file_name = self
            .cache_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned());

        if let Some(dir) = self.cache_path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .context("Failed to create model cache directory")?;
        }

        let response = reqwest::get(&self.artifact_url)
            .await
            .context("Failed to request model artifact")?
            .error_for_status()
            .context("Model artifact server returned an error")?;

        let total = response.content_length().unwrap_or(0);
        let mut downloaded: u64 = 0;

        let mut file = tokio::fs::File::create(&self.cache_path)
            .await
            .context("Failed to create model file")?;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("Model download interrupted")?;
            file.write_all(&chunk)
                .await
                .context("Failed to write model file")?;
            downloaded += chunk.len() as u64;

            if total > 0 {
                let _ = progress.send(LoadingProgress {
                    progress: downloaded as f32 / total as f32 * 100.0,
                    file: file_name.clone(),
                });
            }
        }

        file.flush().await.context("Failed to flush model file")?;
        info!("Model downloaded to {}", self.cache_path.display());
        Ok(())
    }
}

#[async_trait]
impl SpeechEngine for WhisperEngine {
    async fn load(&mut self, progress: mpsc::UnboundedSender<LoadingProgress>) -> Result<()> {
        if !self.cache_path.exists() {
            self.download_artifact(&progress).await?;
        }

        let path = self
            .cache_path
            .to_str()
            .ok_or_else(|| anyhow!("Invalid model path"))?
            .to_string();

        // Loading the context reads the whole artifact; keep it off the runtime
        let ctx = tokio::task::spawn_blocking(move || {
            WhisperContext::new_with_params(&path, WhisperContextParameters::default())
                .map_err(|e| anyhow!("Failed to load whisper model: {e}"))
        })
        .await
        .context("Model load task panicked")??;

        info!("Whisper model loaded");
        self.ctx = Some(ctx);
        Ok(())
    }

    async fn transcribe(&mut self, samples: Vec<f32>) -> Result<TranscriptionResult> {
        let ctx = self.ctx.take().ok_or_else(|| anyhow!("Model not loaded"))?;
        let language = self.language.clone();

        let (ctx, result) = tokio::task::spawn_blocking(move || {
            let result = run_whisper(&ctx, &language, &samples);
            (ctx, result)
        })
        .await
        .context("Transcription task panicked")?;

        self.ctx = Some(ctx);
        result
    }
}

fn run_whisper(ctx: &WhisperContext, language: &str, samples: &[f32]) -> Result<TranscriptionResult> {
    let mut state = ctx.create_state().map_err(|e| anyhow!("State error: {e}"))?;

    let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
    params.set_language(Some(language));
    params.set_print_progress(false);
    params.set_print_realtime(false);
    params.set_print_timestamps(false);

    let cpus = std::thread::available_parallelism()
        .map(|n| n.get() as i32)
        .unwrap_or(4);
    params.set_n_threads(cpus);

    state
        .full(params, samples)
        .map_err(|e| anyhow!("Transcription failed: {e}"))?;

    let mut text = String::new();
    let mut chunks = Vec::new();
    for segment in state.as_iter() {
        let seg_text = format!("{segment}");
        // Whisper reports timestamps in 10ms ticks
        chunks.push(TranscriptChunk {
            text: seg_text.trim().to_string(),
            start: segment.start_timestamp() as f64 / 100.0,
            end: Some(segment.end_timestamp() as f64 / 100.0),
        });
        text.push_str(&seg_text);
        text.push(' ');
    }

    Ok(TranscriptionResult {
        text: text.trim().to_string(),
        chunks: Some(chunks),
    })
}
