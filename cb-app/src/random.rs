//! Injectable randomness.
//!
//! Everything random in a conversation (termination threshold, fact-vs-question,
//! decorative link) is derived from uniform draws in `[0, 1)`, so a scripted
//! sequence of draws reproduces a whole session.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

pub trait RandomSource: Send {
    /// Uniform draw in `[0, 1)`.
    fn next_f64(&mut self) -> f64;

    /// Uniform integer in `lo..=hi`.
    fn int_inclusive(&mut self, lo: u32, hi: u32) -> u32 {
        if hi <= lo {
            return lo;
        }
        let span = f64::from(hi - lo + 1);
        let offset = (self.next_f64() * span).floor() as u32;
        lo + offset.min(hi - lo)
    }

    /// Uniform index into a collection of `len` items. `len` must be non-zero.
    fn index(&mut self, len: usize) -> usize {
        let idx = (self.next_f64() * len as f64).floor() as usize;
        idx.min(len.saturating_sub(1))
    }
}

/// Adapter over any `rand` generator.
pub struct RngSource<R> {
    rng: R,
}

impl<R: Rng + Send> RngSource<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RngSource<StdRng> {
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng + Send> RandomSource for RngSource<R> {
    fn next_f64(&mut self) -> f64 {
        self.rng.r#gen::<f64>()
    }
}

/// Replays a fixed list of draws, then repeats the last one (or 0.0 when the
/// list was empty).
#[derive(Debug, Clone, Default)]
pub struct ScriptedRandom {
    draws: VecDeque<f64>,
    last: f64,
}

impl ScriptedRandom {
    pub fn new(draws: impl IntoIterator<Item = f64>) -> Self {
        Self {
            draws: draws.into_iter().collect(),
            last: 0.0,
        }
    }
}

impl RandomSource for ScriptedRandom {
    fn next_f64(&mut self) -> f64 {
        if let Some(v) = self.draws.pop_front() {
            self.last = v;
        }
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_inclusive_maps_the_unit_interval_onto_every_value() {
        let mut rng = ScriptedRandom::new([0.0, 0.33, 0.34, 0.66, 0.67, 0.999_999]);
        let got: Vec<u32> = (0..6).map(|_| rng.int_inclusive(4, 6)).collect();
        assert_eq!(got, vec![4, 4, 5, 5, 6, 6]);
    }

    #[test]
    fn degenerate_range_returns_lower_bound_without_drawing() {
        let mut rng = ScriptedRandom::new([0.9]);
        assert_eq!(rng.int_inclusive(5, 5), 5);
        assert_eq!(rng.next_f64(), 0.9);
    }

    #[test]
    fn index_stays_in_bounds() {
        let mut rng = ScriptedRandom::new([0.0, 0.5, 0.999_999]);
        assert_eq!(rng.index(6), 0);
        assert_eq!(rng.index(6), 3);
        assert_eq!(rng.index(6), 5);
    }

    #[test]
    fn seeded_rng_threshold_is_always_in_range() {
        let mut rng = RngSource::seeded(42);
        for _ in 0..1_000 {
            let t = rng.int_inclusive(4, 6);
            assert!((4..=6).contains(&t), "threshold {t} out of range");
        }
    }
}
