use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use myney::store::Recording;
use myney::transcribe::WhisperEngine;
use myney::{AppState, Config, GeminiExtractor, Store, Transcriber};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "myney", about = "Voice-driven personal finance tracker")]
struct Args {
    /// Config file (without extension)
    #[arg(long, default_value = "config/myney")]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP control API (default)
    Serve {
        /// Override the configured HTTP port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Capture a clip from the microphone and store it as a recording
    Record {
        /// Capture length in seconds
        #[arg(long, default_value_t = 5)]
        seconds: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));

    match args.command.unwrap_or(Command::Serve { port: None }) {
        Command::Serve { port } => serve(cfg, port).await,
        Command::Record { seconds } => record(cfg, seconds).await,
    }
}

async fn serve(cfg: Config, port: Option<u16>) -> Result<()> {
    let store = Arc::new(Store::open(&cfg.storage.data_dir).await?);

    let engine = WhisperEngine::new(
        cfg.model.artifact_url.clone(),
        PathBuf::from(&cfg.model.cache_path),
        cfg.model.language.clone(),
    );
    let transcriber = Arc::new(Transcriber::new(engine));

    let api_key = std::env::var(&cfg.gemini.api_key_env).unwrap_or_else(|_| {
        warn!(
            "{} is not set; remote extraction calls will fail",
            cfg.gemini.api_key_env
        );
        String::new()
    });
    let extractor = Arc::new(GeminiExtractor::new(
        api_key,
        cfg.gemini.extract_model.clone(),
        cfg.gemini.text_model.clone(),
    ));

    let state = AppState::new(Arc::clone(&store), Arc::clone(&transcriber), extractor);
    let app = myney::create_router(state);

    let addr = format!(
        "{}:{}",
        cfg.service.http.bind,
        port.unwrap_or(cfg.service.http.port)
    );
    info!("HTTP server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await
        .context("HTTP server error")?;

    // Complete any in-flight job with a cancellation error before exiting
    transcriber.shutdown().await;

    Ok(())
}

async fn record(cfg: Config, seconds: u64) -> Result<()> {
    let store = Store::open(&cfg.storage.data_dir).await?;

    let buffer = Arc::new(Mutex::new(Vec::new()));
    let (stream, sample_rate) =
        myney::audio::start_capture(Arc::clone(&buffer)).context("Failed to start capture")?;

    info!("Recording for {}s...", seconds);
    std::thread::sleep(std::time::Duration::from_secs(seconds));
    drop(stream);

    let samples = buffer.lock().unwrap().clone();
    let duration = samples.len() as f64 / sample_rate as f64;
    let audio = myney::encode_wav_base64(&samples, sample_rate)?;

    let wallet_id = store
        .wallets
        .all()
        .await
        .first()
        .map(|w| w.id.clone())
        .context("No wallet available")?;

    let recording = Recording {
        id: store.recordings.next_id().await,
        duration,
        audio_data_base64: Some(audio),
        transcription: None,
        kind: None,
        category_id: None,
        amount: None,
        description: None,
        wallet_id,
        created_at: Utc::now(),
    };

    let id = recording.id.clone();
    store.recordings.save(recording).await?;
    info!("Saved recording {} ({:.1}s)", id, duration);

    Ok(())
}
