//! Deterministic randomness for exercise setup.

use nalgebra::Vector3;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use std::f64::consts::TAU;

/// Random source handed to scenario builders.
///
/// A source is always derived from a parent RNG's *state*, never by drawing
/// from the parent, so the same logical seed reproduces the same sequence no
/// matter how many draws happened elsewhere in the process.
///
/// Each exercise run derives its own instance; instances are never shared.
#[derive(Debug, Clone)]
pub struct SeededRandomSource {
    rng: ChaCha8Rng,
}

impl SeededRandomSource {
    /// Derives a source from a parent generator's current state.
    pub fn from_parent(parent: &ChaCha8Rng) -> Self {
        Self { rng: parent.clone() }
    }

    /// Derives a source from a run seed.
    pub fn from_seed(seed: u64) -> Self {
        Self::from_parent(&ChaCha8Rng::seed_from_u64(seed))
    }

    /// Uniform draw in `[0, 1)`.
    pub fn unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// Uniform draw between `low` and `high`.
    pub fn uniform(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.unit()
    }

    /// Uniform draw in `[-1, 1)`.
    pub fn n11(&mut self) -> f64 {
        self.uniform(-1.0, 1.0)
    }

    /// Gaussian draw. An invalid standard deviation yields the mean.
    pub fn normal(&mut self, mean: f64, std_dev: f64) -> f64 {
        // rand_distr accepts a negative std_dev (it mirrors the curve)
        if !(std_dev.is_finite() && std_dev >= 0.0) {
            return mean;
        }
        match Normal::new(mean, std_dev) {
            Ok(dist) => dist.sample(&mut self.rng),
            Err(_) => mean,
        }
    }

    /// Returns true with probability `p`.
    pub fn chance(&mut self, p: f64) -> bool {
        self.unit() < p
    }

    /// Picks one element, or None for an empty slice.
    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        items.choose(&mut self.rng)
    }

    /// Random unit vector on the ground plane.
    pub fn direction_2d(&mut self) -> Vector3<f64> {
        let angle = self.uniform(0.0, TAU);
        Vector3::new(angle.cos(), angle.sin(), 0.0)
    }
}

impl RngCore for SeededRandomSource {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.rng.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.rng.try_fill_bytes(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parent_draws_do_not_leak_into_child() {
        let mut parent = ChaCha8Rng::seed_from_u64(7);
        let mut first = SeededRandomSource::from_parent(&parent);
        let a = first.unit();

        // Drawing from the parent afterwards does not change what a new
        // child derived from the original state would produce.
        let snapshot = parent.clone();
        let _ = parent.next_u64();
        let mut again = SeededRandomSource::from_parent(&snapshot);
        assert_eq!(a, again.unit());
    }

    #[test]
    fn test_n11_range() {
        let mut rng = SeededRandomSource::from_seed(4);
        for _ in 0..1000 {
            let v = rng.n11();
            assert!((-1.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn test_normal_invalid_std_dev_returns_mean() {
        let mut rng = SeededRandomSource::from_seed(4);
        assert_eq!(rng.normal(3.0, -1.0), 3.0);
        assert_eq!(rng.normal(3.0, f64::NAN), 3.0);
        assert_eq!(rng.normal(3.0, f64::INFINITY), 3.0);
        // Zero spread is valid and always returns the mean.
        assert_eq!(rng.normal(3.0, 0.0), 3.0);
    }

    #[test]
    fn test_choose_empty() {
        let mut rng = SeededRandomSource::from_seed(4);
        let empty: [u8; 0] = [];
        assert!(rng.choose(&empty).is_none());
        assert_eq!(rng.choose(&[9]), Some(&9));
    }

    #[test]
    fn test_direction_is_unit_length() {
        let mut rng = SeededRandomSource::from_seed(11);
        let d = rng.direction_2d();
        approx::assert_relative_eq!(d.norm(), 1.0, epsilon = 1e-12);
        assert_eq!(d.z, 0.0);
    }

    proptest! {
        #[test]
        fn prop_same_seed_same_sequence(seed in any::<u64>()) {
            let mut a = SeededRandomSource::from_seed(seed);
            let mut b = SeededRandomSource::from_seed(seed);
            for _ in 0..16 {
                prop_assert_eq!(a.uniform(-900.0, 900.0), b.uniform(-900.0, 900.0));
                prop_assert_eq!(a.next_u64(), b.next_u64());
                prop_assert_eq!(a.normal(0.0, 2.0), b.normal(0.0, 2.0));
            }
        }
    }
}
