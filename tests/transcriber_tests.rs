// Integration tests for the transcription orchestrator
//
// These run the real worker/orchestrator machinery against stub speech
// engines so the lifecycle transitions can be observed without a model.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use myney::transcribe::{
    LoadingProgress, ModelState, ProcessingState, SpeechEngine, Transcriber, TranscriberStatus,
    TranscriptChunk, TranscriptionResult,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::sleep;

enum LoadBehavior {
    Succeed,
    Fail(String),
    /// Emit one progress event, then wait for the gate before succeeding
    Staged {
        progress: LoadingProgress,
        gate: Option<oneshot::Receiver<()>>,
    },
}

enum TranscribeBehavior {
    Succeed(TranscriptionResult),
    Fail(String),
    /// Wait for the gate before returning the result
    Gated {
        gate: Option<oneshot::Receiver<()>>,
        result: TranscriptionResult,
    },
}

struct StubEngine {
    load_calls: Arc<AtomicUsize>,
    transcribe_calls: Arc<AtomicUsize>,
    load: LoadBehavior,
    transcribe: TranscribeBehavior,
}

impl StubEngine {
    fn new(load: LoadBehavior, transcribe: TranscribeBehavior) -> Self {
        Self {
            load_calls: Arc::new(AtomicUsize::new(0)),
            transcribe_calls: Arc::new(AtomicUsize::new(0)),
            load,
            transcribe,
        }
    }
}

#[async_trait]
impl SpeechEngine for StubEngine {
    async fn load(&mut self, progress: mpsc::UnboundedSender<LoadingProgress>) -> Result<()> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);

        match &mut self.load {
            LoadBehavior::Succeed => Ok(()),
            LoadBehavior::Fail(message) => Err(anyhow!(message.clone())),
            LoadBehavior::Staged {
                progress: staged,
                gate,
            } => {
                let _ = progress.send(staged.clone());
                if let Some(gate) = gate.take() {
                    let _ = gate.await;
                }
                Ok(())
            }
        }
    }

    async fn transcribe(&mut self, _samples: Vec<f32>) -> Result<TranscriptionResult> {
        self.transcribe_calls.fetch_add(1, Ordering::SeqCst);

        match &mut self.transcribe {
            TranscribeBehavior::Succeed(result) => Ok(result.clone()),
            TranscribeBehavior::Fail(message) => Err(anyhow!(message.clone())),
            TranscribeBehavior::Gated { gate, result } => {
                if let Some(gate) = gate.take() {
                    let _ = gate.await;
                }
                Ok(result.clone())
            }
        }
    }
}

fn sample_result() -> TranscriptionResult {
    TranscriptionResult {
        text: "an sang 50k".to_string(),
        chunks: Some(vec![TranscriptChunk {
            text: "an sang 50k".to_string(),
            start: 0.0,
            end: None,
        }]),
    }
}

async fn wait_for_status(
    transcriber: &Transcriber,
    pred: impl Fn(&TranscriberStatus) -> bool,
) -> TranscriberStatus {
    for _ in 0..200 {
        let status = transcriber.status().await;
        if pred(&status) {
            return status;
        }
        sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "status condition not reached in time: {:?}",
        transcriber.status().await
    );
}

#[tokio::test]
async fn test_load_model_is_idempotent() -> Result<()> {
    let (gate_tx, gate_rx) = oneshot::channel();
    let engine = StubEngine::new(
        LoadBehavior::Staged {
            progress: LoadingProgress {
                progress: 10.0,
                file: Some("model.bin".to_string()),
            },
            gate: Some(gate_rx),
        },
        TranscribeBehavior::Succeed(sample_result()),
    );
    let load_calls = Arc::clone(&engine.load_calls);
    let transcriber = Transcriber::new(engine);

    // Repeated calls while loading must not issue another backend load
    transcriber.load_model().await?;
    transcriber.load_model().await?;
    transcriber.load_model().await?;

    gate_tx.send(()).ok();
    wait_for_status(&transcriber, |s| s.model_state == ModelState::Ready).await;

    // And neither must a call once ready
    transcriber.load_model().await?;
    sleep(Duration::from_millis(50)).await;

    assert_eq!(load_calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn test_transcribe_fails_fast_when_not_ready() {
    let engine = StubEngine::new(
        LoadBehavior::Succeed,
        TranscribeBehavior::Succeed(sample_result()),
    );
    let transcribe_calls = Arc::clone(&engine.transcribe_calls);
    let transcriber = Transcriber::new(engine);

    // Model never loaded: the backend must not even see the request
    let result = transcriber.transcribe(vec![0.0; 16000]).await;
    assert!(result.is_err());

    let status = transcriber.status().await;
    assert_eq!(status.model_state, ModelState::Idle);
    assert!(status.error.is_some());
    assert_eq!(transcribe_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_load_event_sequence_reaches_ready() -> Result<()> {
    let (gate_tx, gate_rx) = oneshot::channel();
    let engine = StubEngine::new(
        LoadBehavior::Staged {
            progress: LoadingProgress {
                progress: 50.0,
                file: Some("model.bin".to_string()),
            },
            gate: Some(gate_rx),
        },
        TranscribeBehavior::Succeed(sample_result()),
    );
    let transcriber = Transcriber::new(engine);

    assert_eq!(transcriber.status().await.model_state, ModelState::Idle);

    transcriber.load_model().await?;
    assert_eq!(transcriber.status().await.model_state, ModelState::Loading);

    // The intermediate progress value is observable before the terminal event
    let status = wait_for_status(&transcriber, |s| s.loading_progress.progress == 50.0).await;
    assert_eq!(status.model_state, ModelState::Loading);
    assert_eq!(status.loading_progress.file.as_deref(), Some("model.bin"));

    gate_tx.send(()).ok();
    let status = wait_for_status(&transcriber, |s| s.model_state == ModelState::Ready).await;
    assert_eq!(status.loading_progress.progress, 100.0);
    assert_eq!(status.loading_progress.file, None);
    assert!(status.error.is_none());
    Ok(())
}

#[tokio::test]
async fn test_load_failure_is_terminal() -> Result<()> {
    let engine = StubEngine::new(
        LoadBehavior::Fail("network down".to_string()),
        TranscribeBehavior::Succeed(sample_result()),
    );
    let transcriber = Transcriber::new(engine);

    transcriber.load_model().await?;
    let status = wait_for_status(&transcriber, |s| s.model_state == ModelState::Error).await;
    assert_eq!(status.error.as_deref(), Some("network down"));

    // A failed model is unusable without a new worker
    assert!(transcriber.transcribe(vec![0.0]).await.is_err());
    Ok(())
}

#[tokio::test]
async fn test_transcribe_completes_and_reset_clears() -> Result<()> {
    let engine = StubEngine::new(
        LoadBehavior::Succeed,
        TranscribeBehavior::Succeed(sample_result()),
    );
    let transcriber = Transcriber::new(engine);

    transcriber.load_model().await?;
    wait_for_status(&transcriber, |s| s.model_state == ModelState::Ready).await;

    let result = transcriber.transcribe(vec![0.0; 16000]).await?;
    assert_eq!(result.text, "an sang 50k");
    let chunks = result.chunks.expect("chunks present");
    assert_eq!(chunks[0].end, None);

    let status = transcriber.status().await;
    assert_eq!(status.processing_state, ProcessingState::Completed);
    assert!(transcriber.last_result().await.is_some());

    transcriber.reset().await;
    let status = transcriber.status().await;
    assert_eq!(status.processing_state, ProcessingState::Idle);
    assert_eq!(status.model_state, ModelState::Ready);
    assert!(status.error.is_none());
    assert!(transcriber.last_result().await.is_none());
    Ok(())
}

#[tokio::test]
async fn test_second_transcribe_rejected_while_processing() -> Result<()> {
    let (gate_tx, gate_rx) = oneshot::channel();
    let engine = StubEngine::new(
        LoadBehavior::Succeed,
        TranscribeBehavior::Gated {
            gate: Some(gate_rx),
            result: sample_result(),
        },
    );
    let transcribe_calls = Arc::clone(&engine.transcribe_calls);
    let transcriber = Arc::new(Transcriber::new(engine));

    transcriber.load_model().await?;
    wait_for_status(&transcriber, |s| s.model_state == ModelState::Ready).await;

    let first = {
        let transcriber = Arc::clone(&transcriber);
        tokio::spawn(async move { transcriber.transcribe(vec![0.0; 16000]).await })
    };

    wait_for_status(&transcriber, |s| {
        s.processing_state == ProcessingState::Processing
    })
    .await;

    // The guard rejects the overlapping job without dispatching it
    let second = transcriber.transcribe(vec![0.0; 16000]).await;
    assert!(second.is_err());

    gate_tx.send(()).ok();
    let result = first.await??;
    assert_eq!(result.text, "an sang 50k");
    assert_eq!(transcribe_calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn test_transcribe_error_marks_job_only() -> Result<()> {
    let engine = StubEngine::new(
        LoadBehavior::Succeed,
        TranscribeBehavior::Fail("decode failed".to_string()),
    );
    let transcriber = Transcriber::new(engine);

    transcriber.load_model().await?;
    wait_for_status(&transcriber, |s| s.model_state == ModelState::Ready).await;

    let result = transcriber.transcribe(vec![0.0; 16000]).await;
    assert!(result.is_err());

    let status = transcriber.status().await;
    assert_eq!(status.processing_state, ProcessingState::Error);
    // The model itself is still usable
    assert_eq!(status.model_state, ModelState::Ready);
    assert_eq!(status.error.as_deref(), Some("decode failed"));
    Ok(())
}

#[tokio::test]
async fn test_shutdown_cancels_in_flight_job() -> Result<()> {
    let (gate_tx, gate_rx) = oneshot::channel();
    let engine = StubEngine::new(
        LoadBehavior::Succeed,
        TranscribeBehavior::Gated {
            gate: Some(gate_rx),
            result: sample_result(),
        },
    );
    let transcriber = Arc::new(Transcriber::new(engine));

    transcriber.load_model().await?;
    wait_for_status(&transcriber, |s| s.model_state == ModelState::Ready).await;

    let job = {
        let transcriber = Arc::clone(&transcriber);
        tokio::spawn(async move { transcriber.transcribe(vec![0.0; 16000]).await })
    };

    wait_for_status(&transcriber, |s| {
        s.processing_state == ProcessingState::Processing
    })
    .await;

    // Tear the worker down while the job is in flight; the caller must get a
    // cancellation error instead of hanging in Processing forever
    transcriber.shutdown().await;

    let result = job.await?;
    assert!(result.is_err());

    let status = transcriber.status().await;
    assert_eq!(status.processing_state, ProcessingState::Error);
    assert!(status.error.is_some());

    drop(gate_tx);
    Ok(())
}
