//! Logarithmic band reduction of magnitude spectra
//!
//! Collapses the FFT bins between `min_freq` and `max_freq` into a fixed
//! grid of bands whose cutoff frequencies form a geometric series. Bins
//! outside the retained range are discarded.

/// Precomputed band edges over FFT bins.
#[derive(Debug, Clone)]
pub struct BandSchedule {
    /// `[lo, hi)` bin ranges, one per band.
    edges: Vec<(usize, usize)>,
}

impl BandSchedule {
    /// Build the schedule for `bands` bands between `min_freq` and
    /// `max_freq` at the given FFT geometry.
    pub fn new(
        bands: usize,
        frame_size: usize,
        sample_rate: u32,
        min_freq: f32,
        max_freq: f32,
    ) -> Self {
        let spectrum_len = frame_size / 2;
        let bin_of = |freq: f32| -> usize {
            let bin = (freq * frame_size as f32 / sample_rate as f32).round() as usize;
            bin.min(spectrum_len)
        };

        let ratio = max_freq / min_freq;
        let mut edges = Vec::with_capacity(bands);
        let mut prev_hi = bin_of(min_freq);
        for band in 0..bands {
            let cutoff = min_freq * ratio.powf((band + 1) as f32 / bands as f32);
            let lo = prev_hi;
            // A band never collapses to zero width even when neighbouring
            // cutoffs round to the same FFT bin.
            let hi = bin_of(cutoff).max(lo + 1).min(spectrum_len.max(lo + 1));
            edges.push((lo, hi));
            prev_hi = hi;
        }

        Self { edges }
    }

    pub fn band_count(&self) -> usize {
        self.edges.len()
    }

    /// Bin range `[lo, hi)` of one band.
    pub fn band(&self, index: usize) -> (usize, usize) {
        self.edges[index]
    }

    /// Reduce one magnitude spectrum to band values: sum of magnitudes over
    /// the band divided by band width.
    pub fn reduce(&self, spectrum: &[f32]) -> Vec<f32> {
        self.edges
            .iter()
            .map(|&(lo, hi)| {
                let hi = hi.min(spectrum.len());
                if hi <= lo {
                    return 0.0;
                }
                let sum: f32 = spectrum[lo..hi].iter().sum();
                sum / (hi - lo) as f32
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_schedule() -> BandSchedule {
        BandSchedule::new(32, 2048, 5512, 318.0, 2000.0)
    }

    #[test]
    fn bands_are_contiguous_and_increasing() {
        let schedule = default_schedule();
        assert_eq!(schedule.band_count(), 32);
        for i in 0..schedule.band_count() {
            let (lo, hi) = schedule.band(i);
            assert!(hi > lo, "band {} is empty", i);
            if i > 0 {
                assert_eq!(schedule.band(i - 1).1, lo, "gap before band {}", i);
            }
        }
    }

    #[test]
    fn schedule_spans_retained_frequency_range() {
        let schedule = default_schedule();
        let (first_lo, _) = schedule.band(0);
        let (_, last_hi) = schedule.band(31);
        // 318 Hz -> bin 118, 2000 Hz -> bin 743 at 2048/5512.
        assert_eq!(first_lo, 118);
        assert_eq!(last_hi, 743);
    }

    #[test]
    fn reduce_averages_band_magnitudes() {
        let schedule = default_schedule();
        let mut spectrum = vec![0.0_f32; 1024];
        let (lo, hi) = schedule.band(0);
        for bin in lo..hi {
            spectrum[bin] = 2.0;
        }
        let reduced = schedule.reduce(&spectrum);
        assert_eq!(reduced.len(), 32);
        assert!((reduced[0] - 2.0).abs() < 1e-6);
        assert!(reduced[1..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn bins_outside_range_are_discarded() {
        let schedule = default_schedule();
        let mut spectrum = vec![0.0_f32; 1024];
        spectrum[0] = 100.0; // below min_freq
        spectrum[1000] = 100.0; // above max_freq
        let reduced = schedule.reduce(&spectrum);
        assert!(reduced.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn degenerate_band_widths_stay_positive() {
        // Many bands over a narrow range force cutoffs onto the same bin.
        let schedule = BandSchedule::new(64, 2048, 5512, 300.0, 360.0);
        for i in 0..schedule.band_count() {
            let (lo, hi) = schedule.band(i);
            assert!(hi > lo);
        }
    }
}
