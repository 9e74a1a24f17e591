//! Spectral framing: overlapping Hann-windowed frames to magnitude spectra
//!
//! Frames are cut every `overlap` samples; a frame that would straddle the
//! end of the signal is dropped, never zero-padded. The FFT itself sits
//! behind [`SpectrumProvider`] so the transform implementation can be
//! swapped; magnitudes are always computed here.

use std::f32::consts::PI;
use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

/// Forward spectral transform of one windowed frame.
pub trait SpectrumProvider: Send + Sync {
    /// Complex spectrum of `frame`; at least `frame.len() / 2` bins.
    fn forward_real(&self, frame: &[f32]) -> Vec<Complex<f32>>;
}

/// Default provider backed by rustfft.
pub struct RustFftProvider {
    fft: Arc<dyn Fft<f32>>,
    frame_size: usize,
}

impl RustFftProvider {
    pub fn new(frame_size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(frame_size);
        Self { fft, frame_size }
    }
}

impl SpectrumProvider for RustFftProvider {
    fn forward_real(&self, frame: &[f32]) -> Vec<Complex<f32>> {
        debug_assert_eq!(frame.len(), self.frame_size);
        let mut buffer: Vec<Complex<f32>> =
            frame.iter().map(|&s| Complex::new(s, 0.0)).collect();
        self.fft.process(&mut buffer);
        buffer.truncate(self.frame_size / 2 + 1);
        buffer
    }
}

/// Precompute a Hann window of the given size.
pub fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            let x = i as f32 / (size - 1) as f32;
            0.5 * (1.0 - (2.0 * PI * x).cos())
        })
        .collect()
}

/// Number of complete frames available in `len` samples.
pub fn frame_count(len: usize, frame_size: usize, overlap: usize) -> usize {
    if len < frame_size {
        0
    } else {
        (len - frame_size) / overlap + 1
    }
}

/// Magnitude spectrum of the frame starting at sample `frame * overlap`.
///
/// The frame is pre-multiplied by `window` and the first `frame_size / 2`
/// magnitudes are returned.
pub fn magnitude_spectrum(
    samples: &[f32],
    frame: usize,
    frame_size: usize,
    overlap: usize,
    window: &[f32],
    provider: &dyn SpectrumProvider,
) -> Vec<f32> {
    let start = frame * overlap;
    let windowed: Vec<f32> = samples[start..start + frame_size]
        .iter()
        .zip(window)
        .map(|(&s, &w)| s * w)
        .collect();
    let spectrum = provider.forward_real(&windowed);
    spectrum[..frame_size / 2].iter().map(|c| c.norm()).collect()
}
