//! Audio acquisition behind a narrow provider contract
//!
//! The engine consumes mono samples at its canonical rate and leaves
//! decoding and resampling to an [`AudioProvider`]. The bundled
//! [`FileAudioProvider`] decodes WAV, MP3, FLAC, and OGG Vorbis with pure
//! Rust decoders.

mod decoder;
mod resample;

pub use decoder::{decode_audio, AudioData};
pub use resample::resample_to_target;

use std::path::Path;

use crate::error::ProviderError;

/// Contract the engine uses to obtain samples.
///
/// Implementations must return mono samples at exactly the requested rate;
/// resampling is the provider's responsibility.
pub trait AudioProvider: Send + Sync {
    /// Read mono samples from `source`, starting `start_seconds` in and
    /// spanning `length_seconds` when given (to end of signal otherwise).
    fn read_mono_samples(
        &self,
        source: &str,
        sample_rate: u32,
        start_seconds: f64,
        length_seconds: Option<f64>,
    ) -> Result<Vec<f32>, ProviderError>;
}

/// File-backed provider using format-specific decoders.
#[derive(Debug, Default)]
pub struct FileAudioProvider;

impl AudioProvider for FileAudioProvider {
    fn read_mono_samples(
        &self,
        source: &str,
        sample_rate: u32,
        start_seconds: f64,
        length_seconds: Option<f64>,
    ) -> Result<Vec<f32>, ProviderError> {
        let audio = decode_audio(source, sample_rate)?;
        Ok(slice_window(
            audio.samples,
            sample_rate,
            start_seconds,
            length_seconds,
        ))
    }
}

/// Cut the requested time window out of a decoded sample buffer.
pub(crate) fn slice_window(
    samples: Vec<f32>,
    sample_rate: u32,
    start_seconds: f64,
    length_seconds: Option<f64>,
) -> Vec<f32> {
    let start = (start_seconds.max(0.0) * sample_rate as f64).round() as usize;
    if start >= samples.len() {
        return Vec::new();
    }
    let end = match length_seconds {
        Some(len) => {
            let span = (len.max(0.0) * sample_rate as f64).round() as usize;
            (start + span).min(samples.len())
        }
        None => samples.len(),
    };
    samples[start..end].to_vec()
}

/// Supported audio container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Mp3,
    Flac,
    Ogg,
    Unknown,
}

impl AudioFormat {
    /// Detect format from file extension.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("wav") | Some("wave") => AudioFormat::Wav,
            Some("mp3") => AudioFormat::Mp3,
            Some("flac") => AudioFormat::Flac,
            Some("ogg") => AudioFormat::Ogg,
            _ => AudioFormat::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_detection_by_extension() {
        assert_eq!(AudioFormat::from_path(Path::new("a.wav")), AudioFormat::Wav);
        assert_eq!(AudioFormat::from_path(Path::new("a.mp3")), AudioFormat::Mp3);
        assert_eq!(
            AudioFormat::from_path(Path::new("a.flac")),
            AudioFormat::Flac
        );
        assert_eq!(AudioFormat::from_path(Path::new("a.ogg")), AudioFormat::Ogg);
        assert_eq!(
            AudioFormat::from_path(Path::new("a.xyz")),
            AudioFormat::Unknown
        );
    }

    #[test]
    fn slice_window_bounds() {
        let samples: Vec<f32> = (0..100).map(|i| i as f32).collect();
        let all = slice_window(samples.clone(), 10, 0.0, None);
        assert_eq!(all.len(), 100);

        let tail = slice_window(samples.clone(), 10, 5.0, None);
        assert_eq!(tail.len(), 50);
        assert_eq!(tail[0], 50.0);

        let mid = slice_window(samples.clone(), 10, 2.0, Some(3.0));
        assert_eq!(mid.len(), 30);
        assert_eq!(mid[0], 20.0);

        let past_end = slice_window(samples, 10, 20.0, None);
        assert!(past_end.is_empty());
    }
}
