use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub model: ModelConfig,
    pub gemini: GeminiConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the JSON collection files
    pub data_dir: String,
}

#[derive(Debug, Deserialize)]
pub struct ModelConfig {
    /// Where to download the speech model artifact from
    pub artifact_url: String,
    /// Local cache path for the downloaded artifact
    pub cache_path: String,
    /// Transcription language hint (e.g. "vi")
    pub language: String,
}

#[derive(Debug, Deserialize)]
pub struct GeminiConfig {
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Model used for audio transcribe-and-extract calls
    pub extract_model: String,
    /// Model used for text-only extraction calls
    pub text_model: String,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
