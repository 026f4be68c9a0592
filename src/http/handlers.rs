use super::state::AppState;
use crate::audio::AudioClip;
use crate::extract::{ExtractionItem, ExtractionOutcome};
use crate::stats::{self, MonthlySummary};
use crate::store::{Category, Recording, RecordingKind};
use crate::transcribe::TranscriptionResult;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use base64::Engine;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateRecordingRequest {
    /// Base64-encoded WAV clip (optional for manual entries)
    pub audio_data_base64: Option<String>,
    /// Clip length in seconds
    pub duration: Option<f64>,
    pub wallet_id: Option<String>,
    /// Manual-entry transaction fields
    pub amount: Option<f64>,
    #[serde(rename = "type")]
    pub kind: Option<RecordingKind>,
    pub category_id: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FetchRecordingRequest {
    /// URL of a WAV clip to import
    pub url: String,
    pub wallet_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRecordingRequest {
    pub transcription: Option<String>,
    pub amount: Option<f64>,
    #[serde(rename = "type")]
    pub kind: Option<RecordingKind>,
    pub category_id: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    /// Start month, `YYYY-MM`
    pub start: Option<String>,
    /// End month, `YYYY-MM`
    pub end: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TranscribeResponse {
    pub id: String,
    pub result: TranscriptionResult,
}

#[derive(Debug, Serialize)]
pub struct ExtractAllResponse {
    /// Recordings submitted to the hosted model
    pub submitted: usize,
    /// Recordings updated with extracted fields
    pub updated: usize,
    /// Per-item failures, id → error message
    pub failed: Vec<FailedExtraction>,
}

#[derive(Debug, Serialize)]
pub struct FailedExtraction {
    pub id: String,
    pub error: String,
}

#[derive(Debug, Deserialize)]
pub struct ExtractTextsRequest {
    pub texts: Vec<String>,
    /// Shared id attached to every result
    pub id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /recordings
pub async fn list_recordings(State(state): State<AppState>) -> impl IntoResponse {
    let recordings = state.store.recordings.all().await;
    (StatusCode::OK, Json(recordings))
}

/// POST /recordings
pub async fn create_recording(
    State(state): State<AppState>,
    Json(req): Json<CreateRecordingRequest>,
) -> impl IntoResponse {
    let wallet_id = match req.wallet_id {
        Some(id) => id,
        None => match state.store.wallets.all().await.first() {
            Some(wallet) => wallet.id.clone(),
            None => return error_response(StatusCode::BAD_REQUEST, "No wallet available"),
        },
    };

    let recording = Recording {
        id: state.store.recordings.next_id().await,
        duration: req.duration.unwrap_or(0.0),
        audio_data_base64: req.audio_data_base64,
        transcription: None,
        kind: req.kind,
        category_id: req.category_id,
        amount: req.amount,
        description: req.description,
        wallet_id,
        created_at: Utc::now(),
    };

    info!("Saving recording {}", recording.id);

    match state.store.recordings.save(recording.clone()).await {
        Ok(()) => (StatusCode::CREATED, Json(recording)).into_response(),
        Err(e) => {
            error!("Failed to save recording: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// POST /recordings/fetch
///
/// Import a clip from a remote URL as a new recording.
pub async fn fetch_recording(
    State(state): State<AppState>,
    Json(req): Json<FetchRecordingRequest>,
) -> impl IntoResponse {
    let clip = match AudioClip::fetch(&req.url).await {
        Ok(clip) => clip,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    let audio = match crate::audio::encode_wav_base64(&clip.to_mono(), clip.sample_rate) {
        Ok(audio) => audio,
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };

    let wallet_id = match req.wallet_id {
        Some(id) => id,
        None => match state.store.wallets.all().await.first() {
            Some(wallet) => wallet.id.clone(),
            None => return error_response(StatusCode::BAD_REQUEST, "No wallet available"),
        },
    };

    let recording = Recording {
        id: state.store.recordings.next_id().await,
        duration: clip.duration_seconds,
        audio_data_base64: Some(audio),
        transcription: None,
        kind: None,
        category_id: None,
        amount: None,
        description: None,
        wallet_id,
        created_at: Utc::now(),
    };

    match state.store.recordings.save(recording.clone()).await {
        Ok(()) => (StatusCode::CREATED, Json(recording)).into_response(),
        Err(e) => {
            error!("Failed to save fetched recording: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// PATCH /recordings/:id
pub async fn update_recording(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateRecordingRequest>,
) -> impl IntoResponse {
    let result = state
        .store
        .recordings
        .update(&id, |r| {
            if req.transcription.is_some() {
                r.transcription = req.transcription.clone();
            }
            if req.amount.is_some() {
                r.amount = req.amount;
            }
            if req.kind.is_some() {
                r.kind = req.kind;
            }
            if req.category_id.is_some() {
                r.category_id = req.category_id.clone();
            }
            if req.description.is_some() {
                r.description = req.description.clone();
            }
        })
        .await;

    match result {
        Ok(true) => match state.store.recordings.get(&id).await {
            Some(recording) => (StatusCode::OK, Json(recording)).into_response(),
            None => error_response(StatusCode::NOT_FOUND, format!("Recording {id} not found")),
        },
        Ok(false) => error_response(StatusCode::NOT_FOUND, format!("Recording {id} not found")),
        Err(e) => {
            error!("Failed to update recording: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// DELETE /recordings/:id
pub async fn delete_recording(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.recordings.delete(&id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => error_response(StatusCode::NOT_FOUND, format!("Recording {id} not found")),
        Err(e) => {
            error!("Failed to delete recording: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// GET /categories
pub async fn list_categories(State(state): State<AppState>) -> impl IntoResponse {
    let categories = state.store.categories.all().await;
    (StatusCode::OK, Json(categories))
}

/// POST /categories
pub async fn create_category(
    State(state): State<AppState>,
    Json(req): Json<CreateCategoryRequest>,
) -> impl IntoResponse {
    let category = Category {
        id: state.store.categories.next_id().await,
        name: req.name,
    };

    match state.store.categories.save(category.clone()).await {
        Ok(()) => (StatusCode::CREATED, Json(category)).into_response(),
        Err(e) => {
            error!("Failed to save category: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// GET /stats/monthly?start=YYYY-MM&end=YYYY-MM
pub async fn monthly_stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> impl IntoResponse {
    let default = stats::default_range(Utc::now());

    let start = match &query.start {
        Some(key) => match stats::parse_month(key) {
            Ok(month) => month,
            Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
        },
        None => default.0,
    };
    let end = match &query.end {
        Some(key) => match stats::parse_month(key) {
            Ok(month) => month,
            Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
        },
        None => default.1,
    };

    let recordings = state.store.recordings.all().await;
    let summaries: Vec<MonthlySummary> = stats::monthly_summary(&recordings, start, end);
    (StatusCode::OK, Json(summaries)).into_response()
}

/// POST /model/load
pub async fn load_model(State(state): State<AppState>) -> impl IntoResponse {
    match state.transcriber.load_model().await {
        Ok(()) => (StatusCode::ACCEPTED, Json(state.transcriber.status().await)).into_response(),
        Err(e) => {
            error!("Failed to request model load: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// GET /model/status
pub async fn model_status(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.transcriber.status().await))
}

/// POST /model/reset
pub async fn reset_model(State(state): State<AppState>) -> impl IntoResponse {
    state.transcriber.reset().await;
    (StatusCode::OK, Json(state.transcriber.status().await))
}

/// POST /recordings/:id/transcribe
///
/// Run the local backend on the stored clip and write the transcript back.
pub async fn transcribe_recording(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let recording = match state.store.recordings.get(&id).await {
        Some(recording) => recording,
        None => return error_response(StatusCode::NOT_FOUND, format!("Recording {id} not found")),
    };

    let audio_base64 = match recording.audio_data_base64 {
        Some(audio) => audio,
        None => {
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("Recording {id} has no audio"),
            )
        }
    };

    let wav_bytes = match base64::engine::general_purpose::STANDARD.decode(audio_base64) {
        Ok(bytes) => bytes,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, format!("Invalid audio: {e}")),
    };

    let clip = match AudioClip::from_wav_bytes(&wav_bytes) {
        Ok(clip) => clip,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, format!("Invalid audio: {e}")),
    };

    match state.transcriber.transcribe(clip.to_mono()).await {
        Ok(result) => {
            let text = result.text.clone();
            if let Err(e) = state
                .store
                .recordings
                .update(&id, |r| r.transcription = Some(text.clone()))
                .await
            {
                error!("Failed to store transcription: {}", e);
                return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
            }
            (StatusCode::OK, Json(TranscribeResponse { id, result })).into_response()
        }
        // Model not ready or a job already in flight
        Err(e) => error_response(StatusCode::CONFLICT, e.to_string()),
    }
}

/// POST /recordings/:id/extract
///
/// Run the hosted model on one stored clip and write the extracted
/// transaction fields back. Extraction failures come back in the result
/// body, never as an HTTP error.
pub async fn extract_recording(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let recording = match state.store.recordings.get(&id).await {
        Some(recording) => recording,
        None => return error_response(StatusCode::NOT_FOUND, format!("Recording {id} not found")),
    };

    let audio_base64 = match recording.audio_data_base64 {
        Some(audio) => audio,
        None => {
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("Recording {id} has no audio"),
            )
        }
    };

    let item = ExtractionItem {
        id: id.clone(),
        audio_base64,
    };
    let result = state.extractor.extract_one(&item).await;

    if let ExtractionOutcome::Data(data) = &result.data {
        let category_id = state.store.category_id_by_name(&data.category).await;
        let update = state
            .store
            .recordings
            .update(&id, |r| {
                r.amount = Some(data.amount);
                r.category_id = category_id.clone();
                r.description = Some(data.description.clone());
                r.transcription = Some(data.transcription.clone());
                r.kind = Some(data.kind);
            })
            .await;

        if let Err(e) = update {
            error!("Failed to store extraction: {}", e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
    }

    (StatusCode::OK, Json(result)).into_response()
}

/// POST /extract/texts
///
/// Extract transactions from plain text inputs, one shared id.
pub async fn extract_texts(
    State(state): State<AppState>,
    Json(req): Json<ExtractTextsRequest>,
) -> impl IntoResponse {
    let id = req.id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let results = state.extractor.extract_from_texts(&req.texts, &id).await;
    (StatusCode::OK, Json(results))
}

/// POST /extract
///
/// Batch-extract every recording still missing an amount via the hosted
/// model, constrained to the current category taxonomy, and write the
/// extracted fields back. Per-item failures are reported, not fatal.
pub async fn extract_pending(State(state): State<AppState>) -> impl IntoResponse {
    let items: Vec<ExtractionItem> = state
        .store
        .recordings
        .all()
        .await
        .into_iter()
        .filter(|r| r.amount.is_none())
        .filter_map(|r| {
            r.audio_data_base64.map(|audio| ExtractionItem {
                id: r.id,
                audio_base64: audio,
            })
        })
        .collect();

    if items.is_empty() {
        return (
            StatusCode::OK,
            Json(ExtractAllResponse {
                submitted: 0,
                updated: 0,
                failed: Vec::new(),
            }),
        )
            .into_response();
    }

    info!("Extracting {} pending recordings", items.len());

    let categories = state.store.category_names().await;
    let results = state.extractor.extract_batch(&items, &categories).await;

    let mut updated = 0;
    let mut failed = Vec::new();

    for result in results {
        match result.data {
            ExtractionOutcome::Data(data) => {
                let category_id = state.store.category_id_by_name(&data.category).await;
                let outcome = state
                    .store
                    .recordings
                    .update(&result.id, |r| {
                        r.amount = Some(data.amount);
                        r.category_id = category_id.clone();
                        r.description = Some(data.description.clone());
                        r.transcription = Some(data.transcription.clone());
                        r.kind = Some(data.kind);
                    })
                    .await;

                match outcome {
                    Ok(true) => updated += 1,
                    Ok(false) => failed.push(FailedExtraction {
                        id: result.id,
                        error: "Recording disappeared during extraction".to_string(),
                    }),
                    Err(e) => failed.push(FailedExtraction {
                        id: result.id,
                        error: e.to_string(),
                    }),
                }
            }
            ExtractionOutcome::Failure { error } => {
                failed.push(FailedExtraction {
                    id: result.id,
                    error,
                });
            }
        }
    }

    (
        StatusCode::OK,
        Json(ExtractAllResponse {
            submitted: items.len(),
            updated,
            failed,
        }),
    )
        .into_response()
}
