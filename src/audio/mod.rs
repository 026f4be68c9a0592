//! Audio capture and decoding
//!
//! Clips arrive three ways: opened from a WAV file, fetched from a URL, or
//! captured from the microphone. All paths normalize to f32 samples; the
//! local speech model wants 16kHz mono, the hosted model wants base64 WAV.

mod capture;
mod clip;

pub use capture::start_capture;
pub use clip::{encode_wav_base64, AudioClip};
