//! Fingerprint command: source to hashed fingerprints
//!
//! A fluent builder assembles an immutable command over a source, time
//! bounds, and a configuration. The command drives the whole pipeline:
//! framing, band reduction, image grouping, wavelet encoding, and hash
//! signature computation. Fingerprints are independent of each other, so
//! the materializing path fans images out across a worker pool and restores
//! offset order before emission.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

use crate::audio::{AudioProvider, FileAudioProvider};
use crate::bands::BandSchedule;
use crate::config::FingerprintConfig;
use crate::error::EngineError;
use crate::image::FingerprintImage;
use crate::minhash::{hash_signature, PermutationTable};
use crate::schema::SchemaId;
use crate::spectral::{self, RustFftProvider, SpectrumProvider};
use crate::stride::StrideScheduler;
use crate::wavelet;

/// Cooperative cancellation signal, checked between image groupings.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// One encoded fingerprint with its hash signature.
#[derive(Debug, Clone, PartialEq)]
pub struct HashedFingerprint {
    /// Offset of the image start within the track, seconds.
    pub start_offset_seconds: f32,
    /// Serialized signed-ternary fingerprint, little-endian by cell.
    pub bits: Vec<u8>,
    /// One 32-bit key per hash table.
    pub hash_keys: Vec<u32>,
}

enum SourceSpec {
    File(PathBuf),
    Samples(Vec<f32>),
    Provider {
        provider: Arc<dyn AudioProvider>,
        source: String,
    },
}

impl std::fmt::Debug for SourceSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceSpec::File(path) => f.debug_tuple("File").field(path).finish(),
            SourceSpec::Samples(samples) => {
                f.debug_tuple("Samples").field(&samples.len()).finish()
            }
            SourceSpec::Provider { source, .. } => {
                f.debug_struct("Provider").field("source", source).finish()
            }
        }
    }
}

/// Fluent builder over an immutable command.
pub struct FingerprintCommandBuilder {
    source: Option<SourceSpec>,
    start_seconds: f64,
    seconds_to_process: Option<f64>,
    config: FingerprintConfig,
    spectrum: Option<Arc<dyn SpectrumProvider>>,
    cancellation: CancellationToken,
}

impl FingerprintCommandBuilder {
    pub fn new() -> Self {
        Self {
            source: None,
            start_seconds: 0.0,
            seconds_to_process: None,
            config: FingerprintConfig::default(),
            spectrum: None,
            cancellation: CancellationToken::new(),
        }
    }

    /// Fingerprint an audio file through the bundled file provider.
    pub fn from_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(SourceSpec::File(path.into()));
        self
    }

    /// Fingerprint raw mono samples already at the canonical rate.
    pub fn from_samples(mut self, samples: Vec<f32>) -> Self {
        self.source = Some(SourceSpec::Samples(samples));
        self
    }

    /// Fingerprint through an external audio provider.
    pub fn from_provider(
        mut self,
        provider: Arc<dyn AudioProvider>,
        source: impl Into<String>,
    ) -> Self {
        self.source = Some(SourceSpec::Provider {
            provider,
            source: source.into(),
        });
        self
    }

    pub fn with_start_seconds(mut self, start_seconds: f64) -> Self {
        self.start_seconds = start_seconds;
        self
    }

    pub fn with_seconds_to_process(mut self, seconds: f64) -> Self {
        self.seconds_to_process = Some(seconds);
        self
    }

    pub fn with_config(mut self, config: FingerprintConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the stride without replacing the whole configuration.
    pub fn with_stride(mut self, stride: crate::stride::Stride) -> Self {
        self.config.stride = stride;
        self
    }

    pub fn with_spectrum_provider(mut self, provider: Arc<dyn SpectrumProvider>) -> Self {
        self.spectrum = Some(provider);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Validate and finalize. Configuration problems are fatal here, never
    /// later in the pipeline.
    pub fn build(self) -> Result<FingerprintCommand, EngineError> {
        self.config.validate()?;
        let source = self
            .source
            .ok_or_else(|| EngineError::invalid_config("no input source configured"))?;
        if self.start_seconds < 0.0 {
            return Err(EngineError::invalid_config("start_seconds must be >= 0"));
        }
        if let Some(seconds) = self.seconds_to_process {
            if seconds <= 0.0 {
                return Err(EngineError::invalid_config(
                    "seconds_to_process must be > 0",
                ));
            }
        }

        let spectrum = self
            .spectrum
            .unwrap_or_else(|| Arc::new(RustFftProvider::new(self.config.frame_size)));
        let permutations = PermutationTable::for_config(&self.config);
        let window = spectral::hann_window(self.config.frame_size);
        let schedule = BandSchedule::new(
            self.config.cols,
            self.config.frame_size,
            self.config.sample_rate,
            self.config.min_freq,
            self.config.max_freq,
        );

        Ok(FingerprintCommand {
            source,
            start_seconds: self.start_seconds,
            seconds_to_process: self.seconds_to_process,
            config: self.config,
            spectrum,
            permutations,
            window,
            schedule,
            cancellation: self.cancellation,
        })
    }
}

impl Default for FingerprintCommandBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// An immutable, validated fingerprinting command. Restartable by building
/// a new command from a new source; not rewindable mid-stream.
pub struct FingerprintCommand {
    source: SourceSpec,
    start_seconds: f64,
    seconds_to_process: Option<f64>,
    config: FingerprintConfig,
    spectrum: Arc<dyn SpectrumProvider>,
    permutations: Arc<PermutationTable>,
    window: Vec<f32>,
    schedule: BandSchedule,
    cancellation: CancellationToken,
}

impl std::fmt::Debug for FingerprintCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FingerprintCommand")
            .field("source", &self.source)
            .field("start_seconds", &self.start_seconds)
            .field("seconds_to_process", &self.seconds_to_process)
            .field("config", &self.config)
            .field("window_len", &self.window.len())
            .field("schedule", &self.schedule)
            .finish()
    }
}

impl FingerprintCommand {
    pub fn config(&self) -> &FingerprintConfig {
        &self.config
    }

    pub fn schema_id(&self) -> SchemaId {
        SchemaId::from_config(&self.config)
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Compute the full fingerprint set, parallelized over images.
    ///
    /// Emission order is monotonic in `start_offset_seconds`. Observing the
    /// cancellation token discards all partial results.
    pub fn compute(&self) -> Result<Vec<HashedFingerprint>, EngineError> {
        let samples = self.read_samples()?;
        let frames = self.reduced_frames(&samples);
        let starts = self.image_starts(frames.len());

        let fingerprints: Vec<Option<HashedFingerprint>> = starts
            .par_iter()
            .map(|&start| {
                if self.cancellation.is_cancelled() {
                    return None;
                }
                Some(self.encode_window(&frames, start))
            })
            .collect();

        if self.cancellation.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        Ok(fingerprints.into_iter().flatten().collect())
    }

    /// Lazy single-threaded variant of [`compute`](Self::compute).
    ///
    /// The iterator ends early when the cancellation token fires.
    pub fn stream(&self) -> Result<FingerprintStream<'_>, EngineError> {
        let samples = self.read_samples()?;
        let frames = self.reduced_frames(&samples);
        let scheduler = self.config.stride.scheduler(self.config.rows, self.config.overlap);
        let next = scheduler.first_frame();
        Ok(FingerprintStream {
            command: self,
            frames,
            scheduler,
            next,
        })
    }

    fn read_samples(&self) -> Result<Vec<f32>, EngineError> {
        let samples = match &self.source {
            SourceSpec::File(path) => FileAudioProvider.read_mono_samples(
                &path.to_string_lossy(),
                self.config.sample_rate,
                self.start_seconds,
                self.seconds_to_process,
            )?,
            SourceSpec::Samples(samples) => crate::audio::slice_window(
                samples.clone(),
                self.config.sample_rate,
                self.start_seconds,
                self.seconds_to_process,
            ),
            SourceSpec::Provider { provider, source } => provider.read_mono_samples(
                source,
                self.config.sample_rate,
                self.start_seconds,
                self.seconds_to_process,
            )?,
        };
        Ok(samples)
    }

    /// All reduced frames of the processed window, in frame order.
    fn reduced_frames(&self, samples: &[f32]) -> Vec<Vec<f32>> {
        let count = spectral::frame_count(samples.len(), self.config.frame_size, self.config.overlap);
        (0..count)
            .into_par_iter()
            .map(|frame| {
                let spectrum = spectral::magnitude_spectrum(
                    samples,
                    frame,
                    self.config.frame_size,
                    self.config.overlap,
                    &self.window,
                    self.spectrum.as_ref(),
                );
                self.schedule.reduce(&spectrum)
            })
            .collect()
    }

    /// Image start frames chosen by the stride scheduler.
    fn image_starts(&self, frame_count: usize) -> Vec<usize> {
        let mut scheduler = self.config.stride.scheduler(self.config.rows, self.config.overlap);
        let mut starts = Vec::new();
        let mut frame = scheduler.first_frame();
        while frame + self.config.rows <= frame_count {
            starts.push(frame);
            frame = scheduler.next_frame(frame);
        }
        starts
    }

    fn encode_window(&self, frames: &[Vec<f32>], start: usize) -> HashedFingerprint {
        let mut image = FingerprintImage::from_frames(frames, start, self.config.rows)
            .expect("scheduler emits only complete windows");
        wavelet::decompose(&mut image);
        let bits = wavelet::encode_top_wavelets(&image, self.config.top_wavelets);
        let hash_keys = hash_signature(
            &bits,
            &self.permutations,
            self.config.hash_tables,
            self.config.keys_per_table,
        );
        let start_offset_seconds = self.start_seconds as f32
            + (start * self.config.overlap) as f32 / self.config.sample_rate as f32;
        HashedFingerprint {
            start_offset_seconds,
            bits,
            hash_keys,
        }
    }
}

/// Lazy fingerprint sequence produced by [`FingerprintCommand::stream`].
pub struct FingerprintStream<'a> {
    command: &'a FingerprintCommand,
    frames: Vec<Vec<f32>>,
    scheduler: StrideScheduler,
    next: usize,
}

impl Iterator for FingerprintStream<'_> {
    type Item = HashedFingerprint;

    fn next(&mut self) -> Option<Self::Item> {
        if self.command.cancellation.is_cancelled() {
            return None;
        }
        let rows = self.command.config.rows;
        if self.next + rows > self.frames.len() {
            return None;
        }
        let start = self.next;
        self.next = self.scheduler.next_frame(start);
        Some(self.command.encode_window(&self.frames, start))
    }
}
