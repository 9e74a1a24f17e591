//! Stride strategies for fingerprint window placement
//!
//! A stride decides where the next fingerprint image starts relative to the
//! previous one. Steps are requested in samples and translated to reduced
//! frame counts, the granularity at which images are assembled.

use serde::{Deserialize, Serialize};

use crate::rng::SplitMix64;

/// Stride strategy. One is active per command.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Stride {
    /// Fixed gap in samples after the end of the previous image.
    /// `step = 0` places images back to back.
    Static { step: usize },
    /// Gap drawn uniformly from `[min, max]` samples after the end of the
    /// previous image. Seedable for reproducibility.
    Random { min: usize, max: usize, seed: u64 },
    /// Advance `step` samples from the start of the previous image,
    /// permitting partial overlap. `step = overlap` examines every possible
    /// image start at frame granularity; this is the query default.
    Incremental { step: usize },
}

impl Stride {
    /// Default ingest stride.
    pub fn default_ingest() -> Self {
        Stride::Incremental { step: 512 }
    }

    /// Default query stride for the given hop size.
    pub fn default_query(overlap: usize) -> Self {
        Stride::Incremental { step: overlap }
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        match self {
            Stride::Random { min, max, .. } if min > max => {
                Err(format!("random stride min {} exceeds max {}", min, max))
            }
            Stride::Incremental { step: 0 } => {
                Err("incremental stride step must be > 0 samples".into())
            }
            _ => Ok(()),
        }
    }

    /// Stateful scheduler operating in frame units.
    pub(crate) fn scheduler(&self, rows: usize, overlap: usize) -> StrideScheduler {
        let rng = match self {
            Stride::Random { seed, .. } => Some(SplitMix64::new(*seed)),
            _ => None,
        };
        StrideScheduler {
            stride: *self,
            rows,
            overlap,
            rng,
        }
    }
}

/// Translates the configured stride into successive image start frames.
#[derive(Debug, Clone)]
pub(crate) struct StrideScheduler {
    stride: Stride,
    rows: usize,
    overlap: usize,
    rng: Option<SplitMix64>,
}

impl StrideScheduler {
    pub(crate) fn first_frame(&self) -> usize {
        0
    }

    /// Start frame of the image following one that starts at `current`.
    pub(crate) fn next_frame(&mut self, current: usize) -> usize {
        match self.stride {
            Stride::Static { step } => current + self.rows + self.frames_for(step),
            Stride::Random { min, max, .. } => {
                let rng = self.rng.as_mut().expect("random stride carries an rng");
                let span = (max - min) as u64 + 1;
                let step = min + rng.next_below(span) as usize;
                current + self.rows + self.frames_for(step)
            }
            Stride::Incremental { step } => current + self.frames_for(step).max(1),
        }
    }

    /// Nearest whole number of frames covering `step` samples.
    fn frames_for(&self, step: usize) -> usize {
        (step + self.overlap / 2) / self.overlap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_stride_is_back_to_back_at_zero() {
        let mut sched = Stride::Static { step: 0 }.scheduler(128, 64);
        assert_eq!(sched.first_frame(), 0);
        assert_eq!(sched.next_frame(0), 128);
        assert_eq!(sched.next_frame(128), 256);
    }

    #[test]
    fn static_stride_rounds_step_to_frames() {
        let mut sched = Stride::Static { step: 100 }.scheduler(128, 64);
        // 100 samples is closer to 2 frames than 1 at a 64-sample hop.
        assert_eq!(sched.next_frame(0), 128 + 2);
    }

    #[test]
    fn incremental_stride_advances_from_start() {
        let mut sched = Stride::Incremental { step: 64 }.scheduler(128, 64);
        assert_eq!(sched.next_frame(0), 1);
        assert_eq!(sched.next_frame(1), 2);

        let mut sched = Stride::Incremental { step: 512 }.scheduler(128, 64);
        assert_eq!(sched.next_frame(0), 8);
    }

    #[test]
    fn incremental_stride_advances_at_least_one_frame() {
        let mut sched = Stride::Incremental { step: 1 }.scheduler(128, 64);
        assert_eq!(sched.next_frame(10), 11);
    }

    #[test]
    fn random_stride_is_reproducible_per_seed() {
        let starts = |seed| {
            let mut sched = Stride::Random {
                min: 0,
                max: 512,
                seed,
            }
            .scheduler(128, 64);
            let mut frame = sched.first_frame();
            let mut out = Vec::new();
            for _ in 0..16 {
                frame = sched.next_frame(frame);
                out.push(frame);
            }
            out
        };
        assert_eq!(starts(9), starts(9));
        assert_ne!(starts(9), starts(10));
    }

    #[test]
    fn random_stride_stays_within_bounds() {
        let mut sched = Stride::Random {
            min: 64,
            max: 128,
            seed: 3,
        }
        .scheduler(128, 64);
        let mut frame = 0;
        for _ in 0..64 {
            let next = sched.next_frame(frame);
            let gap = next - frame - 128;
            assert!((1..=2).contains(&gap), "gap {} out of range", gap);
            frame = next;
        }
    }

    #[test]
    fn validation_rejects_inverted_random_bounds() {
        assert!(Stride::Random {
            min: 10,
            max: 5,
            seed: 0
        }
        .validate()
        .is_err());
        assert!(Stride::Incremental { step: 0 }.validate().is_err());
        assert!(Stride::Static { step: 0 }.validate().is_ok());
    }
}
