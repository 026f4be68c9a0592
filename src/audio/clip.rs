use anyhow::{Context, Result};
use base64::Engine;
use hound::{SampleFormat, WavReader};
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::info;

/// A decoded audio clip (float samples, interleaved if multi-channel)
pub struct AudioClip {
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<f32>,
}

impl AudioClip {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path).context("Failed to open WAV file")?;
        let clip = Self::decode(reader)?;

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            clip.duration_seconds,
            clip.sample_rate,
            clip.channels,
            clip.samples.len()
        );

        Ok(clip)
    }

    /// Decode an in-memory WAV payload (uploads, fetched clips)
    pub fn from_wav_bytes(bytes: &[u8]) -> Result<Self> {
        let reader = WavReader::new(Cursor::new(bytes)).context("Failed to parse WAV data")?;
        Self::decode(reader)
    }

    /// Download a clip over HTTP and decode it
    pub async fn fetch(url: &str) -> Result<Self> {
        info!("Fetching audio from {}", url);

        let response = reqwest::get(url)
            .await
            .context("Failed to fetch audio URL")?
            .error_for_status()
            .context("Audio URL returned an error status")?;
        let bytes = response
            .bytes()
            .await
            .context("Failed to read audio response body")?;

        Self::from_wav_bytes(&bytes)
    }

    fn decode<R: Read>(reader: WavReader<R>) -> Result<Self> {
        let spec = reader.spec();

        let samples: Vec<f32> = match spec.sample_format {
            SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<Result<Vec<_>, _>>()
                .context("Failed to read audio samples")?,
            SampleFormat::Int => {
                let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / max))
                    .collect::<Result<Vec<_>, _>>()
                    .context("Failed to read audio samples")?
            }
        };

        let duration_seconds =
            samples.len() as f64 / (spec.sample_rate as f64 * spec.channels as f64);

        Ok(Self {
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }

    /// Collapse the clip to a single channel.
    ///
    /// Stereo is downmixed per sample with the equal-power formula
    /// `(left + right) / 2 * sqrt(2)`; mono passes through unchanged.
    pub fn to_mono(&self) -> Vec<f32> {
        match self.channels {
            1 => self.samples.clone(),
            2 => {
                let scale = std::f32::consts::SQRT_2;
                self.samples
                    .chunks_exact(2)
                    .map(|pair| (pair[0] + pair[1]) / 2.0 * scale)
                    .collect()
            }
            n => {
                // Rare; average all channels
                self.samples
                    .chunks_exact(n as usize)
                    .map(|frame| frame.iter().sum::<f32>() / n as f32)
                    .collect()
            }
        }
    }
}

/// Encode mono float samples as a 16-bit PCM WAV and base64 the bytes,
/// the payload format the hosted model expects (mime audio/wav).
pub fn encode_wav_base64(samples: &[f32], sample_rate: u32) -> Result<String> {
    let mut cursor = Cursor::new(Vec::new());
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer =
        hound::WavWriter::new(&mut cursor, spec).context("Failed to create WAV writer")?;
    for &s in samples {
        let clamped = s.clamp(-1.0, 1.0);
        writer
            .write_sample((clamped * i16::MAX as f32) as i16)
            .context("Failed to write WAV sample")?;
    }
    writer.finalize().context("Failed to finalize WAV data")?;

    Ok(base64::engine::general_purpose::STANDARD.encode(cursor.into_inner()))
}
