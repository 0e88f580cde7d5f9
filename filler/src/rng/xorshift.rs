//! xorshift64* random number generator
//!
//! Fast, 64-bit state, passes BigCrush. Same seed gives the same sequence,
//! which is what makes a filled event replayable.

use serde::{Deserialize, Serialize};

/// Deterministic random number generator using xorshift64*
///
/// # Example
/// ```
/// use dipsy_filler_core_rs::RngManager;
///
/// let mut rng = RngManager::new(12345);
/// let u = rng.next_f64();
/// assert!((0.0..1.0).contains(&u));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RngManager {
    state: u64,
}

impl RngManager {
    /// Create a new RNG with given seed (zero is mapped to one)
    pub fn new(seed: u64) -> Self {
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Generate next random u64 value
    pub fn next(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    /// Current internal state, usable as a seed to resume the sequence
    pub fn get_state(&self) -> u64 {
        self.state
    }

    /// Uniform f64 in [0.0, 1.0)
    pub fn next_f64(&mut self) -> f64 {
        let value = self.next();
        (value >> 11) as f64 * (1.0 / ((1u64 << 53) as f64))
    }

    /// Uniform f64 in (0.0, 1.0]
    ///
    /// Used where a strictly positive draw is needed, e.g. replacement
    /// momenta for broken partons.
    pub fn next_positive(&mut self) -> f64 {
        1.0 - self.next_f64()
    }
}
