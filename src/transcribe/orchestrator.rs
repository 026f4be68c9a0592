use super::engine::SpeechEngine;
use super::state::{LoadingProgress, ModelState, ProcessingState, TranscriptionResult};
use super::worker::{self, WorkerEvent, WorkerRequest};
use anyhow::{anyhow, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Snapshot of the orchestrator lifecycle, as exposed over the control API
#[derive(Debug, Clone, Serialize)]
pub struct TranscriberStatus {
    pub model_state: ModelState,
    pub processing_state: ProcessingState,
    pub loading_progress: LoadingProgress,
    pub error: Option<String>,
}

struct Inner {
    model_state: ModelState,
    processing_state: ProcessingState,
    loading_progress: LoadingProgress,
    result: Option<TranscriptionResult>,
    error: Option<String>,
    /// In-flight jobs keyed by correlation id, completed by the event pump
    pending: HashMap<Uuid, oneshot::Sender<Result<TranscriptionResult, String>>>,
}

/// Owns the model/job lifecycle and a single background worker.
///
/// The worker is created with the orchestrator and torn down by
/// `shutdown()` (or aborted on drop); exactly one live worker per instance.
/// The orchestrator never touches the model itself, only lifecycle flags.
pub struct Transcriber {
    inner: Arc<Mutex<Inner>>,
    requests: mpsc::Sender<WorkerRequest>,
    worker_task: JoinHandle<()>,
    pump_task: JoinHandle<()>,
}

impl Transcriber {
    pub fn new<E: SpeechEngine>(engine: E) -> Self {
        let (req_tx, req_rx) = mpsc::channel(8);
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let worker_task = tokio::spawn(worker::run(engine, req_rx, event_tx));

        let inner = Arc::new(Mutex::new(Inner {
            model_state: ModelState::Idle,
            processing_state: ProcessingState::Idle,
            loading_progress: LoadingProgress::default(),
            result: None,
            error: None,
            pending: HashMap::new(),
        }));

        let pump_task = tokio::spawn(Self::pump_events(Arc::clone(&inner), event_rx));

        Self {
            inner,
            requests: req_tx,
            worker_task,
            pump_task,
        }
    }

    /// Apply worker events to the shared lifecycle state
    async fn pump_events(
        inner: Arc<Mutex<Inner>>,
        mut events: mpsc::UnboundedReceiver<WorkerEvent>,
    ) {
        while let Some(event) = events.recv().await {
            let mut state = inner.lock().await;

            match event {
                WorkerEvent::Loading(progress) => {
                    state.model_state = ModelState::Loading;
                    state.loading_progress = progress;
                }

                WorkerEvent::Loaded => {
                    state.model_state = ModelState::Ready;
                    state.loading_progress = LoadingProgress {
                        progress: 100.0,
                        file: None,
                    };
                    state.error = None;
                    info!("Speech model ready");
                }

                WorkerEvent::Processing => {
                    state.processing_state = ProcessingState::Processing;
                }

                WorkerEvent::Result { id, data } => {
                    state.processing_state = ProcessingState::Completed;
                    state.result = Some(data.clone());
                    if let Some(tx) = state.pending.remove(&id) {
                        let _ = tx.send(Ok(data));
                    }
                }

                WorkerEvent::Error { id, message } => {
                    error!("Worker error: {}", message);
                    if state.model_state == ModelState::Loading {
                        state.model_state = ModelState::Error;
                    }
                    if state.processing_state == ProcessingState::Processing {
                        state.processing_state = ProcessingState::Error;
                    }
                    state.error = Some(message.clone());
                    if let Some(id) = id {
                        if let Some(tx) = state.pending.remove(&id) {
                            let _ = tx.send(Err(message));
                        }
                    }
                }
            }
        }
    }

    /// Request a model load.
    ///
    /// No-op while a load is underway or already complete, so repeated calls
    /// issue at most one backend initialization.
    pub async fn load_model(&self) -> Result<()> {
        {
            let mut state = self.inner.lock().await;
            if matches!(state.model_state, ModelState::Loading | ModelState::Ready) {
                return Ok(());
            }

            state.model_state = ModelState::Loading;
            state.loading_progress = LoadingProgress::default();
            state.error = None;
        }

        self.requests
            .send(WorkerRequest::Load)
            .await
            .map_err(|_| anyhow!("Transcription worker is gone"))?;

        Ok(())
    }

    /// Transcribe a 16kHz mono sample buffer on the local backend.
    ///
    /// Fails fast without dispatching if the model is not ready, and rejects
    /// a second call while a job is still in flight.
    pub async fn transcribe(&self, samples: Vec<f32>) -> Result<TranscriptionResult> {
        let id = Uuid::new_v4();
        let (tx, rx) = oneshot::channel();

        {
            let mut state = self.inner.lock().await;

            if state.model_state != ModelState::Ready {
                let message = "Model is not ready. Please load the model first.".to_string();
                state.error = Some(message.clone());
                return Err(anyhow!(message));
            }

            if state.processing_state == ProcessingState::Processing {
                warn!("Rejecting transcribe call: a job is already in flight");
                return Err(anyhow!("A transcription job is already in flight"));
            }

            state.processing_state = ProcessingState::Processing;
            state.result = None;
            state.error = None;
            state.pending.insert(id, tx);
        }

        if self
            .requests
            .send(WorkerRequest::Transcribe { id, audio: samples })
            .await
            .is_err()
        {
            let mut state = self.inner.lock().await;
            state.pending.remove(&id);
            state.processing_state = ProcessingState::Error;
            let message = "Transcription worker is gone".to_string();
            state.error = Some(message.clone());
            return Err(anyhow!(message));
        }

        match rx.await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(message)) => Err(anyhow!(message)),
            Err(_) => Err(anyhow!("Transcription job was dropped")),
        }
    }

    /// Clear the job lifecycle back to idle; the model state is untouched.
    pub async fn reset(&self) {
        let mut state = self.inner.lock().await;
        state.processing_state = ProcessingState::Idle;
        state.result = None;
        state.error = None;
    }

    pub async fn status(&self) -> TranscriberStatus {
        let state = self.inner.lock().await;
        TranscriberStatus {
            model_state: state.model_state,
            processing_state: state.processing_state,
            loading_progress: state.loading_progress.clone(),
            error: state.error.clone(),
        }
    }

    pub async fn last_result(&self) -> Option<TranscriptionResult> {
        self.inner.lock().await.result.clone()
    }

    /// Tear down the worker.
    ///
    /// Any outstanding job is completed with a cancellation error rather
    /// than being lost, so callers never observe a stuck `Processing`.
    pub async fn shutdown(&self) {
        info!("Shutting down transcriber");
        self.worker_task.abort();
        self.pump_task.abort();

        let mut state = self.inner.lock().await;
        let message = "Transcription worker shut down with the job in flight".to_string();

        for (_, tx) in state.pending.drain() {
            let _ = tx.send(Err(message.clone()));
        }

        if state.processing_state == ProcessingState::Processing {
            state.processing_state = ProcessingState::Error;
            state.error = Some(message);
        }
        if state.model_state == ModelState::Loading {
            state.model_state = ModelState::Error;
        }
    }
}

impl Drop for Transcriber {
    fn drop(&mut self) {
        // Best-effort teardown for exit paths that skip shutdown()
        self.worker_task.abort();
        self.pump_task.abort();
    }
}
