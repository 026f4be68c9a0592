//! Remote extraction backend
//!
//! One hosted-model call both transcribes a clip and extracts the structured
//! transaction fields. Failures are never surfaced as errors to the caller:
//! every path converts to a per-item `{error: ...}` sentinel, and items in a
//! batch fail independently unless the request itself failed.

mod schema;

use crate::store::RecordingKind;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

pub use schema::{batch_schema, extraction_schema, text_batch_schema};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

const NO_DATA_ERROR: &str = "No data returned";

const AUDIO_PROMPT: &str = "\
Listen carefully to these audios (in base64 format) and transcribe what is said.
Then extract expense or income information from the transcription.
Respond strictly in JSON following the given schema with vietnamese language.
If you cannot understand or find any transaction, respond with:
{\"error\": \"Could not extract expense information from audio\"}

từ \"ca\" hoặc \"k\" nghĩa là nghìn đồng";

const TEXT_PROMPT: &str = "\
Analyze the following Vietnamese text to extract expense or income information.
Return the result strictly in JSON following the given schema.
If there is no valid transaction, respond with:
{\"error\": \"Could not extract expense information from text\"}

từ \"ca\" hoặc \"k\" nghĩa là nghìn đồng";

/// Transaction fields extracted from one clip or text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionData {
    pub amount: f64,
    pub category: String,
    pub description: String,
    pub transcription: String,
    #[serde(rename = "type")]
    pub kind: RecordingKind,
}

/// Per-item outcome: the extracted transaction, or the error sentinel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtractionOutcome {
    Data(ExtractionData),
    Failure { error: String },
}

impl ExtractionOutcome {
    fn failure(message: impl Into<String>) -> Self {
        Self::Failure {
            error: message.into(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }
}

/// One audio clip submitted for extraction
#[derive(Debug, Clone)]
pub struct ExtractionItem {
    pub id: String,
    pub audio_base64: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionResult {
    pub id: String,
    pub data: ExtractionOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextExtractionResult {
    pub id: String,
    pub text: String,
    pub data: ExtractionOutcome,
}

// Wire types for the generateContent endpoint

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: Blob },
}

#[derive(Serialize)]
struct Blob {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    response_mime_type: String,
    response_json_schema: Value,
}

#[derive(Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    parts: Option<Vec<CandidatePart>>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl Part {
    fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    fn wav(data: String) -> Self {
        Self::InlineData {
            inline_data: Blob {
                mime_type: "audio/wav".to_string(),
                data,
            },
        }
    }
}

/// Client for the hosted transcribe-and-extract model
pub struct GeminiExtractor {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    extract_model: String,
    text_model: String,
}

impl GeminiExtractor {
    pub fn new(api_key: String, extract_model: String, text_model: String) -> Self {
        Self::with_base_url(GEMINI_BASE_URL.to_string(), api_key, extract_model, text_model)
    }

    /// Point the client at a different models endpoint (proxies, tests).
    pub fn with_base_url(
        base_url: String,
        api_key: String,
        extract_model: String,
        text_model: String,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
            extract_model,
            text_model,
        }
    }

    /// Extract a transaction from a single base64 WAV clip.
    pub async fn extract_one(&self, item: &ExtractionItem) -> ExtractionResult {
        let parts = vec![
            Part::text(AUDIO_PROMPT),
            Part::wav(item.audio_base64.clone()),
        ];
        let schema = extraction_schema(&default_category_names());

        let data = match self.generate(&self.extract_model, parts, schema).await {
            Ok(text) => decode_single(text.as_deref()),
            Err(e) => ExtractionOutcome::failure(e.to_string()),
        };

        ExtractionResult {
            id: item.id.clone(),
            data,
        }
    }

    /// Extract transactions from many clips in one request.
    ///
    /// The response array is aligned positionally with the input; a short or
    /// sparse array yields "No data returned" for the uncovered items, and a
    /// request-level failure applies the caught message to every item.
    pub async fn extract_batch(
        &self,
        items: &[ExtractionItem],
        allowed_categories: &[String],
    ) -> Vec<ExtractionResult> {
        if items.is_empty() {
            return Vec::new();
        }

        let mut parts = vec![Part::text(AUDIO_PROMPT)];
        for item in items {
            parts.push(Part::text(format!("id: {})", item.id)));
            parts.push(Part::wav(item.audio_base64.clone()));
        }

        let schema = batch_schema(allowed_categories);
        let ids: Vec<String> = items.iter().map(|i| i.id.clone()).collect();

        match self.generate(&self.extract_model, parts, schema).await {
            Ok(text) => align_batch(text.as_deref(), &ids),
            Err(e) => {
                warn!("Batch extraction request failed: {}", e);
                let message = e.to_string();
                ids.into_iter()
                    .map(|id| ExtractionResult {
                        id,
                        data: ExtractionOutcome::failure(message.clone()),
                    })
                    .collect()
            }
        }
    }

    /// Same batching contract over plain text inputs, one shared id.
    pub async fn extract_from_texts(
        &self,
        texts: &[String],
        id: &str,
    ) -> Vec<TextExtractionResult> {
        if texts.is_empty() {
            return Vec::new();
        }

        let mut parts = vec![Part::text(TEXT_PROMPT)];
        for (index, text) in texts.iter().enumerate() {
            parts.push(Part::text(format!("Text {}:\n{}", index + 1, text)));
        }

        let schema = text_batch_schema(&default_category_names());
        let shared_ids: Vec<String> = texts.iter().map(|_| id.to_string()).collect();

        let results = match self.generate(&self.text_model, parts, schema).await {
            Ok(text) => align_batch(text.as_deref(), &shared_ids),
            Err(e) => {
                warn!("Text extraction request failed: {}", e);
                let message = e.to_string();
                shared_ids
                    .into_iter()
                    .map(|id| ExtractionResult {
                        id,
                        data: ExtractionOutcome::failure(message.clone()),
                    })
                    .collect()
            }
        };

        results
            .into_iter()
            .zip(texts.iter())
            .map(|(result, text)| TextExtractionResult {
                id: result.id,
                text: text.clone(),
                data: result.data,
            })
            .collect()
    }

    async fn generate(
        &self,
        model: &str,
        parts: Vec<Part>,
        schema: Value,
    ) -> Result<Option<String>> {
        let url = format!(
            "{}/{}:generateContent?key={}",
            self.base_url, model, self.api_key
        );

        let body = GenerateRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts,
            }],
            generation_config: Some(GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_json_schema: schema,
            }),
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("Failed to reach the hosted model")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Hosted model error {status}: {text}");
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .context("Failed to decode hosted model response")?;

        let text = response_text(parsed);
        debug!("Hosted model returned {} bytes", text.as_deref().map_or(0, str::len));
        Ok(text)
    }
}

/// The fixed taxonomy used when the caller supplies no category list
pub fn default_category_names() -> Vec<String> {
    crate::store::DEFAULT_CATEGORIES
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn response_text(response: GenerateResponse) -> Option<String> {
    response
        .candidates?
        .into_iter()
        .next()?
        .content?
        .parts?
        .into_iter()
        .next()?
        .text
}

/// Decode a single-item response body into an outcome.
fn decode_single(json_text: Option<&str>) -> ExtractionOutcome {
    match json_text {
        None => ExtractionOutcome::failure(NO_DATA_ERROR),
        Some(text) => match serde_json::from_str::<ExtractionOutcome>(text) {
            Ok(outcome) => outcome,
            Err(e) => ExtractionOutcome::failure(e.to_string()),
        },
    }
}

/// Align a batched response array with the input ids, positionally.
fn align_batch(json_text: Option<&str>, ids: &[String]) -> Vec<ExtractionResult> {
    let entries: Vec<Value> = json_text
        .and_then(|text| serde_json::from_str(text).ok())
        .unwrap_or_default();

    ids.iter()
        .enumerate()
        .map(|(index, id)| {
            let data = entries
                .get(index)
                .and_then(|entry| serde_json::from_value::<ExtractionOutcome>(entry.clone()).ok())
                .unwrap_or_else(|| ExtractionOutcome::failure(NO_DATA_ERROR));

            ExtractionResult {
                id: id.clone(),
                data,
            }
        })
        .collect()
}
