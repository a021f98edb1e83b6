//! Randomness seam.
//!
//! Shared behind `Arc` by services that run on many tasks at once, so the
//! methods take `&self`.

use rand::RngCore;

pub trait RandomSource: Send + Sync {
    fn next_u64(&self) -> u64;

    /// Uniform float in `[0, 1)`.
    fn unit(&self) -> f64 {
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Uniform integer in `[low, high)`. `high` must be greater than `low`.
    fn in_range(&self, low: u64, high: u64) -> u64 {
        low + self.next_u64() % (high - low)
    }
}

/// Thread-local OS-seeded generator.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemRandom;

impl RandomSource for SystemRandom {
    fn next_u64(&self) -> u64 {
        rand::thread_rng().next_u64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(u64);

    impl RandomSource for Fixed {
        fn next_u64(&self) -> u64 {
            self.0
        }
    }

    #[test]
    fn unit_bounds() {
        assert_eq!(Fixed(0).unit(), 0.0);
        assert!(Fixed(u64::MAX).unit() < 1.0);
        assert!(Fixed(u64::MAX).unit() > 0.99);
    }

    #[test]
    fn in_range_bounds() {
        assert_eq!(Fixed(0).in_range(100_000, 1_000_000), 100_000);
        assert!(Fixed(u64::MAX).in_range(100_000, 1_000_000) < 1_000_000);
    }

    #[test]
    fn system_random_unit_in_range() {
        for _ in 0..100 {
            let v = SystemRandom.unit();
            assert!((0.0..1.0).contains(&v));
        }
    }
}
