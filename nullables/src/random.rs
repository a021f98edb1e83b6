//! Nullable random: deterministic random number generation.

use std::sync::Mutex;

use chainvote_verification::RandomSource;

/// A deterministic random source for testing.
///
/// Returns pre-configured values in order, wrapping around at the end.
pub struct NullRandom {
    outputs: Vec<u64>,
    index: Mutex<usize>,
}

impl NullRandom {
    /// Create with a sequence of deterministic random values.
    pub fn new(outputs: Vec<u64>) -> Self {
        assert!(!outputs.is_empty(), "NullRandom needs at least one value");
        Self {
            outputs,
            index: Mutex::new(0),
        }
    }

    /// Create with a single value that will be returned for every call.
    pub fn constant(value: u64) -> Self {
        Self::new(vec![value])
    }

    /// Every `unit()` draw is ~1.0, so probabilistic checks always pass.
    pub fn always_high() -> Self {
        Self::constant(u64::MAX)
    }

    /// Every `unit()` draw is 0.0, so probabilistic checks always fail.
    pub fn always_low() -> Self {
        Self::constant(0)
    }
}

impl RandomSource for NullRandom {
    fn next_u64(&self) -> u64 {
        let mut idx = self.index.lock().unwrap();
        let value = self.outputs[*idx % self.outputs.len()];
        *idx += 1;
        value
    }
}
