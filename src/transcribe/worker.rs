use super::engine::SpeechEngine;
use super::state::{LoadingProgress, TranscriptionResult};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Requests accepted by the transcription worker
#[derive(Debug)]
pub enum WorkerRequest {
    Load,
    Transcribe { id: Uuid, audio: Vec<f32> },
}

/// Events emitted by the transcription worker
///
/// A `Load` request produces zero or more `Loading` events followed by
/// exactly one terminal `Loaded` or `Error`. A `Transcribe` request produces
/// `Processing` followed by exactly one terminal `Result` or `Error`. Events
/// are delivered in emission order.
#[derive(Debug)]
pub enum WorkerEvent {
    Loading(LoadingProgress),
    Loaded,
    Processing,
    Result {
        id: Uuid,
        data: TranscriptionResult,
    },
    Error {
        id: Option<Uuid>,
        message: String,
    },
}

/// Worker loop owning the speech model.
///
/// The engine never leaves this task; the orchestrator only ever sees
/// lifecycle events. Exits when the request channel closes.
pub async fn run<E: SpeechEngine>(
    mut engine: E,
    mut requests: mpsc::Receiver<WorkerRequest>,
    events: mpsc::UnboundedSender<WorkerEvent>,
) {
    info!("Transcription worker started");
    let mut loaded = false;

    while let Some(request) = requests.recv().await {
        match request {
            WorkerRequest::Load => {
                if loaded {
                    let _ = events.send(WorkerEvent::Loaded);
                    continue;
                }

                let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
                let forward = events.clone();
                let forwarder = tokio::spawn(async move {
                    while let Some(progress) = progress_rx.recv().await {
                        let _ = forward.send(WorkerEvent::Loading(progress));
                    }
                });

                let outcome = engine.load(progress_tx).await;
                // All progress events precede the terminal event
                let _ = forwarder.await;

                match outcome {
                    Ok(()) => {
                        loaded = true;
                        let _ = events.send(WorkerEvent::Loaded);
                    }
                    Err(e) => {
                        let _ = events.send(WorkerEvent::Error {
                            id: None,
                            message: e.to_string(),
                        });
                    }
                }
            }

            WorkerRequest::Transcribe { id, audio } => {
                if !loaded {
                    warn!("Transcribe request before model load");
                    let _ = events.send(WorkerEvent::Error {
                        id: Some(id),
                        message: "Model not loaded".to_string(),
                    });
                    continue;
                }

                let _ = events.send(WorkerEvent::Processing);

                match engine.transcribe(audio).await {
                    Ok(data) => {
                        let _ = events.send(WorkerEvent::Result { id, data });
                    }
                    Err(e) => {
                        let _ = events.send(WorkerEvent::Error {
                            id: Some(id),
                            message: e.to_string(),
                        });
                    }
                }
            }
        }
    }

    info!("Transcription worker stopped");
}
