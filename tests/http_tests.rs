// Integration tests for the HTTP control API
//
// Each test boots the real router on an ephemeral port with a temp-dir store
// and a stub speech engine, then drives it with a plain HTTP client.

use anyhow::Result;
use async_trait::async_trait;
use myney::transcribe::{LoadingProgress, SpeechEngine, Transcriber, TranscriptionResult};
use myney::{AppState, GeminiExtractor, Store};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::mpsc;

struct NoopEngine;

#[async_trait]
impl SpeechEngine for NoopEngine {
    async fn load(&mut self, _progress: mpsc::UnboundedSender<LoadingProgress>) -> Result<()> {
        Ok(())
    }

    async fn transcribe(&mut self, _samples: Vec<f32>) -> Result<TranscriptionResult> {
        Ok(TranscriptionResult {
            text: "an sang 50k".to_string(),
            chunks: None,
        })
    }
}

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    // Held so the store outlives the server
    _data_dir: TempDir,
}

impl TestServer {
    async fn start() -> Result<Self> {
        let data_dir = TempDir::new()?;
        let store = Arc::new(Store::open(data_dir.path()).await?);
        let transcriber = Arc::new(Transcriber::new(NoopEngine));
        let extractor = Arc::new(GeminiExtractor::new(
            String::new(),
            "gemini-2.5-flash".to_string(),
            "gemini-2.5-flash-lite".to_string(),
        ));

        let app = myney::create_router(AppState::new(store, transcriber, extractor));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            base_url: format!("http://{addr}"),
            client: reqwest::Client::new(),
            _data_dir: data_dir,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[tokio::test]
async fn test_health_check() -> Result<()> {
    let server = TestServer::start().await?;

    let response = server.client.get(server.url("/health")).send().await?;
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await?, "OK");
    Ok(())
}

#[tokio::test]
async fn test_recording_crud() -> Result<()> {
    let server = TestServer::start().await?;

    // Create
    let created: Value = server
        .client
        .post(server.url("/recordings"))
        .json(&json!({ "duration": 2.5, "audio_data_base64": "AAAA" }))
        .send()
        .await?
        .json()
        .await?;
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["duration"], 2.5);

    // List
    let listed: Vec<Value> = server
        .client
        .get(server.url("/recordings"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(listed.len(), 1);

    // Patch in the extracted transaction fields
    let patched: Value = server
        .client
        .patch(server.url(&format!("/recordings/{id}")))
        .json(&json!({
            "amount": 50000.0,
            "type": "outcome",
            "description": "an sang",
            "category_id": "1"
        }))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(patched["amount"], 50000.0);
    assert_eq!(patched["type"], "outcome");

    // Delete
    let response = server
        .client
        .delete(server.url(&format!("/recordings/{id}")))
        .send()
        .await?;
    assert_eq!(response.status(), 204);

    let response = server
        .client
        .delete(server.url(&format!("/recordings/{id}")))
        .send()
        .await?;
    assert_eq!(response.status(), 404);
    Ok(())
}

#[tokio::test]
async fn test_categories_seeded_and_created() -> Result<()> {
    let server = TestServer::start().await?;

    let categories: Vec<Value> = server
        .client
        .get(server.url("/categories"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(categories.len(), 9);

    let response = server
        .client
        .post(server.url("/categories"))
        .json(&json!({ "name": "pets" }))
        .send()
        .await?;
    assert_eq!(response.status(), 201);

    let categories: Vec<Value> = server
        .client
        .get(server.url("/categories"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(categories.len(), 10);
    Ok(())
}

#[tokio::test]
async fn test_monthly_stats_endpoint() -> Result<()> {
    let server = TestServer::start().await?;

    let summaries: Vec<Value> = server
        .client
        .get(server.url("/stats/monthly?start=2026-06&end=2026-08"))
        .send()
        .await?
        .json()
        .await?;

    assert_eq!(summaries.len(), 3);
    assert_eq!(summaries[0]["month"], "2026-06");
    assert_eq!(summaries[0]["income"], 0.0);

    // Malformed month key
    let response = server
        .client
        .get(server.url("/stats/monthly?start=junk"))
        .send()
        .await?;
    assert_eq!(response.status(), 400);
    Ok(())
}

#[tokio::test]
async fn test_model_status_and_load() -> Result<()> {
    let server = TestServer::start().await?;

    let status: Value = server
        .client
        .get(server.url("/model/status"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(status["model_state"], "idle");
    assert_eq!(status["processing_state"], "idle");

    let response = server
        .client
        .post(server.url("/model/load"))
        .send()
        .await?;
    assert_eq!(response.status(), 202);
    Ok(())
}

#[tokio::test]
async fn test_transcribe_requires_ready_model() -> Result<()> {
    let server = TestServer::start().await?;

    let created: Value = server
        .client
        .post(server.url("/recordings"))
        .json(&json!({ "duration": 1.0, "audio_data_base64": "AAAA" }))
        .send()
        .await?
        .json()
        .await?;
    let id = created["id"].as_str().unwrap();

    // Invalid base64-WAV payload is rejected before the model is consulted
    let response = server
        .client
        .post(server.url(&format!("/recordings/{id}/transcribe")))
        .send()
        .await?;
    assert_eq!(response.status(), 400);

    let response = server
        .client
        .post(server.url("/recordings/missing/transcribe"))
        .send()
        .await?;
    assert_eq!(response.status(), 404);
    Ok(())
}

#[tokio::test]
async fn test_transcribe_stored_clip_end_to_end() -> Result<()> {
    let server = TestServer::start().await?;

    // Load the (stub) model and wait for it to come up
    server.client.post(server.url("/model/load")).send().await?;
    for _ in 0..200 {
        let status: Value = server
            .client
            .get(server.url("/model/status"))
            .send()
            .await?
            .json()
            .await?;
        if status["model_state"] == "ready" {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    let clip = myney::encode_wav_base64(&[0.0f32; 1600], 16000)?;
    let created: Value = server
        .client
        .post(server.url("/recordings"))
        .json(&json!({ "duration": 0.1, "audio_data_base64": clip }))
        .send()
        .await?
        .json()
        .await?;
    let id = created["id"].as_str().unwrap();

    let response: Value = server
        .client
        .post(server.url(&format!("/recordings/{id}/transcribe")))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(response["result"]["text"], "an sang 50k");

    // The transcript is written back to the store
    let listed: Vec<Value> = server
        .client
        .get(server.url("/recordings"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(listed[0]["transcription"], "an sang 50k");
    Ok(())
}

#[tokio::test]
async fn test_extract_with_nothing_pending() -> Result<()> {
    let server = TestServer::start().await?;

    // A recording that already has an amount is not re-extracted
    server
        .client
        .post(server.url("/recordings"))
        .json(&json!({ "duration": 1.0, "audio_data_base64": "AAAA", "amount": 10000.0 }))
        .send()
        .await?;

    let response: Value = server
        .client
        .post(server.url("/extract"))
        .send()
        .await?
        .json()
        .await?;

    assert_eq!(response["submitted"], 0);
    assert_eq!(response["updated"], 0);
    Ok(())
}
