//! Audio decoding for multiple formats

use std::path::Path;

use super::{resample_to_target, AudioFormat};
use crate::error::ProviderError;

/// Decoded audio data.
#[derive(Debug, Clone)]
pub struct AudioData {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
    pub duration_ms: u32,
}

impl AudioData {
    /// Convert to mono by averaging channels.
    pub fn to_mono(&self) -> Vec<f32> {
        if self.channels <= 1 {
            return self.samples.clone();
        }
        let mut mono = Vec::with_capacity(self.samples.len() / self.channels as usize);
        for chunk in self.samples.chunks(self.channels as usize) {
            let avg: f32 = chunk.iter().sum::<f32>() / chunk.len() as f32;
            mono.push(avg);
        }
        mono
    }
}

/// Decode an audio file to mono samples at the target sample rate.
pub fn decode_audio(path: &str, target_sample_rate: u32) -> Result<AudioData, ProviderError> {
    let path = Path::new(path);

    if !path.exists() {
        return Err(ProviderError::new(format!(
            "audio file not found: {}",
            path.display()
        )));
    }

    let mut audio = match AudioFormat::from_path(path) {
        AudioFormat::Wav => decode_wav(path)?,
        AudioFormat::Mp3 => decode_mp3(path)?,
        AudioFormat::Flac => decode_flac(path)?,
        AudioFormat::Ogg => decode_ogg(path)?,
        AudioFormat::Unknown => {
            return Err(ProviderError::new(format!(
                "unsupported audio format: {}",
                path.display()
            )));
        }
    };

    if audio.sample_rate != target_sample_rate {
        let mono = audio.to_mono();
        audio.samples = resample_to_target(&mono, audio.sample_rate, target_sample_rate);
        audio.sample_rate = target_sample_rate;
        audio.channels = 1;
    } else if audio.channels > 1 {
        audio.samples = audio.to_mono();
        audio.channels = 1;
    }
    audio.duration_ms =
        (audio.samples.len() as f64 / audio.sample_rate as f64 * 1000.0).round() as u32;

    Ok(audio)
}

fn decode_wav(path: &Path) -> Result<AudioData, ProviderError> {
    let mut reader = hound::WavReader::open(path).map_err(|e| {
        ProviderError::with_source(format!("failed to open WAV file {}", path.display()), e)
    })?;

    let spec = reader.spec();
    let sample_rate = spec.sample_rate;
    let channels = spec.channels;

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ProviderError::with_source("failed to read WAV samples", e))?,
        hound::SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| ProviderError::with_source("failed to read WAV samples", e))?
        }
    };

    Ok(finish(samples, sample_rate, channels))
}

fn decode_mp3(path: &Path) -> Result<AudioData, ProviderError> {
    let data = std::fs::read(path).map_err(|e| {
        ProviderError::with_source(format!("failed to read MP3 file {}", path.display()), e)
    })?;

    let mut decoder = minimp3::Decoder::new(&data[..]);
    let mut samples = Vec::new();
    let mut sample_rate = 0;
    let mut channels = 0;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                if sample_rate == 0 {
                    sample_rate = frame.sample_rate as u32;
                    channels = frame.channels as u16;
                }
                for &sample in &frame.data {
                    samples.push(sample as f32 / 32768.0);
                }
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => {
                return Err(ProviderError::with_source("MP3 decode error", e));
            }
        }
    }

    if sample_rate == 0 {
        return Err(ProviderError::new(format!(
            "no decodable MP3 frames in {}",
            path.display()
        )));
    }

    Ok(finish(samples, sample_rate, channels))
}

fn decode_flac(path: &Path) -> Result<AudioData, ProviderError> {
    let mut reader = claxon::FlacReader::open(path).map_err(|e| {
        ProviderError::with_source(format!("failed to open FLAC file {}", path.display()), e)
    })?;

    let info = reader.streaminfo();
    let sample_rate = info.sample_rate;
    let channels = info.channels as u16;
    let max_val = (1i64 << (info.bits_per_sample - 1)) as f32;

    let samples: Vec<f32> = reader
        .samples()
        .map(|s| s.map(|v| v as f32 / max_val))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ProviderError::with_source("failed to read FLAC samples", e))?;

    Ok(finish(samples, sample_rate, channels))
}

fn decode_ogg(path: &Path) -> Result<AudioData, ProviderError> {
    let file = std::fs::File::open(path).map_err(|e| {
        ProviderError::with_source(format!("failed to open OGG file {}", path.display()), e)
    })?;

    let mut reader = lewton::inside_ogg::OggStreamReader::new(file)
        .map_err(|e| ProviderError::with_source("failed to open OGG stream", e))?;

    let sample_rate = reader.ident_hdr.audio_sample_rate;
    let channels = reader.ident_hdr.audio_channels as u16;

    let mut samples = Vec::new();
    while let Some(packet) = reader
        .read_dec_packet_itl()
        .map_err(|e| ProviderError::with_source("OGG decode error", e))?
    {
        for &sample in &packet {
            samples.push(sample as f32 / 32768.0);
        }
    }

    Ok(finish(samples, sample_rate, channels))
}

fn finish(samples: Vec<f32>, sample_rate: u32, channels: u16) -> AudioData {
    let frames = samples.len() / channels.max(1) as usize;
    let duration_ms = (frames as f64 / sample_rate.max(1) as f64 * 1000.0).round() as u32;
    AudioData {
        samples,
        sample_rate,
        channels,
        duration_ms,
    }
}
