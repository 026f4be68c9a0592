use anyhow::{anyhow, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::{Arc, Mutex};
use tracing::{error, info};

const TARGET_RATE: u32 = 16000;

/// Chosen input configuration plus the decimation needed to hit ~16kHz
struct CaptureConfig {
    stream: cpal::StreamConfig,
    effective_rate: u32,
    downsample_factor: usize,
}

/// Prefer a native 16kHz mono f32 config; otherwise take the device default
/// and decimate down to roughly the target rate.
fn pick_input_config(device: &cpal::Device) -> Result<CaptureConfig> {
    let supported: Vec<_> = device.supported_input_configs()?.collect();

    let native = supported.iter().find(|c| {
        c.channels() == 1
            && c.min_sample_rate() <= TARGET_RATE
            && c.max_sample_rate() >= TARGET_RATE
            && c.sample_format() == cpal::SampleFormat::F32
    });

    if let Some(cfg) = native {
        return Ok(CaptureConfig {
            stream: cfg.with_sample_rate(TARGET_RATE).config(),
            effective_rate: TARGET_RATE,
            downsample_factor: 1,
        });
    }

    let default_config = device.default_input_config()?;
    let rate = default_config.sample_rate();
    let factor = (rate / TARGET_RATE).max(1) as usize;
    let effective_rate = rate / factor as u32;
    info!("Using native rate {rate}Hz, downsampling by {factor}x to ~{effective_rate}Hz");

    Ok(CaptureConfig {
        stream: default_config.config(),
        effective_rate,
        downsample_factor: factor,
    })
}

/// Start capturing from the default input device.
///
/// Samples are appended to the shared buffer at ~16kHz mono f32, the format
/// the local speech model consumes. Drop the returned `Stream` to stop
/// capturing. Returns the effective sample rate alongside the stream.
pub fn start_capture(buffer: Arc<Mutex<Vec<f32>>>) -> Result<(cpal::Stream, u32)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("No input device found"))?;

    info!("Input device: {:?}", device.description());

    let capture = pick_input_config(&device)?;
    let channels = capture.stream.channels as usize;
    let factor = capture.downsample_factor;

    let stream = device.build_input_stream(
        &capture.stream,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            let mut buf = buffer.lock().unwrap();
            for (i, frame) in data.chunks(channels).enumerate() {
                if i % factor == 0 {
                    let mono = frame.iter().sum::<f32>() / channels as f32;
                    buf.push(mono);
                }
            }
        },
        |err| error!("Input stream error: {err}"),
        None,
    )?;

    stream.play()?;
    Ok((stream, capture.effective_rate))
}
