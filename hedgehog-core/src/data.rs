//! Core data types for Hedgehog property-based testing.

use std::fmt;

/// Size parameter for controlling test data generation.
///
/// Size typically ranges from 0 to 100, where larger values
/// generate more complex test data. The runner grows it monotonically
/// over the course of a test run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Size(pub usize);

impl Size {
    /// Create a new size value.
    pub fn new(value: usize) -> Self {
        Size(value)
    }

    /// Get the inner size value.
    pub fn get(&self) -> usize {
        self.0
    }

    /// Scale size by a factor.
    pub fn scale(&self, factor: f64) -> Self {
        Size((self.0 as f64 * factor) as usize)
    }

    /// Clamp size to a maximum value.
    pub fn clamp(&self, max: usize) -> Self {
        Size(self.0.min(max))
    }
}

impl From<usize> for Size {
    fn from(value: usize) -> Self {
        Size(value)
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Size({})", self.0)
    }
}

const GOLDEN_GAMMA: u64 = 0x9e37_79b9_7f4a_7c15;
const MIX_MULTIPLIER_1: u64 = 0xbf58_476d_1ce4_e5b9;
const MIX_MULTIPLIER_2: u64 = 0x94d0_49bb_1331_11eb;

/// Splittable random seed for deterministic test generation.
///
/// A seed is the pair `(state, gamma)` of a SplitMix64 generator. Every
/// operation consumes the seed and hands back a new one alongside its result,
/// so identical seeds always replay identical sequences. `gamma` is kept odd,
/// which gives every split stream a full period.
///
/// The bounded draws are meant for test-data generation. They use a
/// multiply-high reduction which carries a slight bias towards some residues
/// and must not be used where uniformity is a security property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Seed {
    state: u64,
    gamma: u64,
}

impl Seed {
    /// Create a new seed from a single value.
    pub fn from_u64(value: u64) -> Self {
        let state = splitmix64_mix(value);
        let gamma = mix_gamma(state);
        Seed { state, gamma }
    }

    /// Rebuild a seed from its raw components, forcing `gamma` odd.
    pub fn from_parts(state: u64, gamma: u64) -> Self {
        Seed {
            state,
            gamma: gamma | 1,
        }
    }

    /// A fresh seed for a new test run.
    pub fn random() -> Self {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        Seed::from_parts(rng.gen(), rng.gen())
    }

    pub fn state(&self) -> u64 {
        self.state
    }

    pub fn gamma(&self) -> u64 {
        self.gamma
    }

    /// Split a seed into two independent seeds.
    ///
    /// The left seed keeps the current gamma, the right one derives a new
    /// state and gamma from the mixed output.
    pub fn split(self) -> (Self, Self) {
        let new_state = self.state.wrapping_add(self.gamma);
        let output = splitmix64_mix(new_state);
        let new_gamma = mix_gamma(output);

        (
            Seed {
                state: new_state,
                gamma: self.gamma,
            },
            Seed {
                state: output,
                gamma: new_gamma,
            },
        )
    }

    /// Generate the next random value and advance the seed.
    pub fn next_u64(self) -> (u64, Self) {
        let new_state = self.state.wrapping_add(self.gamma);
        let output = splitmix64_mix(new_state);
        (
            output,
            Seed {
                state: new_state,
                gamma: self.gamma,
            },
        )
    }

    /// The upper 32 bits of the next mixed value.
    pub fn next_u32(self) -> (u32, Self) {
        let (value, seed) = self.next_u64();
        ((value >> 32) as u32, seed)
    }

    /// A float uniformly drawn from `[0, 1)` with 53 bits of precision.
    pub fn next_f64(self) -> (f64, Self) {
        let (value, seed) = self.next_u64();
        ((value >> 11) as f64 * (1.0 / (1u64 << 53) as f64), seed)
    }

    /// Generate a random bool from the lowest bit of the next value.
    pub fn next_bool(self) -> (bool, Self) {
        let (value, seed) = self.next_u64();
        (value & 1 == 1, seed)
    }

    /// Generate a bounded random value in `[0, bound)`.
    ///
    /// Computes `floor(output / 2^32 * bound)` from the 32-bit output, so
    /// `bound` is expected to fit in 32 bits. Wider bounds go through
    /// [`Seed::next_bounded_u64`].
    pub fn next_bounded(self, bound: u64) -> (u64, Self) {
        if bound > u64::from(u32::MAX) + 1 {
            return self.next_bounded_u64(bound);
        }
        let (value, seed) = self.next_u32();
        ((u64::from(value) * bound) >> 32, seed)
    }

    /// Bounded draw over the full 64-bit output using a 128-bit multiply-high.
    pub fn next_bounded_u64(self, bound: u64) -> (u64, Self) {
        let (value, seed) = self.next_u64();
        (((u128::from(value) * u128::from(bound)) >> 64) as u64, seed)
    }
}

impl fmt::Display for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Seed({}, {})", self.state, self.gamma)
    }
}

/// Configuration for property testing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Maximum number of tests to run.
    pub test_limit: usize,

    /// Maximum number of shrinks to attempt.
    pub shrink_limit: usize,

    /// Maximum size parameter to use.
    pub size_limit: usize,

    /// Maximum number of discards before giving up.
    pub discard_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            test_limit: 100,
            shrink_limit: 1000,
            size_limit: 100,
            discard_limit: 100,
        }
    }
}

impl Config {
    /// Create a new config with the given number of tests.
    pub fn with_tests(mut self, tests: usize) -> Self {
        self.test_limit = tests;
        self
    }

    /// Create a new config with the given shrink limit.
    pub fn with_shrinks(mut self, shrinks: usize) -> Self {
        self.shrink_limit = shrinks;
        self
    }

    /// Create a new config with the given size limit.
    pub fn with_size_limit(mut self, size: usize) -> Self {
        self.size_limit = size;
        self
    }

    /// Create a new config with the given discard limit.
    pub fn with_discard_limit(mut self, discards: usize) -> Self {
        self.discard_limit = discards;
        self
    }

    /// Size used for the `test_num`th generated case.
    pub fn size_for(&self, test_num: usize) -> Size {
        if self.test_limit == 0 {
            return Size::new(0);
        }
        let scaled = test_num as u128 * self.size_limit as u128 / self.test_limit as u128;
        Size::new(usize::try_from(scaled).unwrap_or(usize::MAX))
    }
}

/// SplitMix64 finalizer.
fn splitmix64_mix(mut z: u64) -> u64 {
    z = z.wrapping_add(GOLDEN_GAMMA);
    z = (z ^ (z >> 30)).wrapping_mul(MIX_MULTIPLIER_1);
    z = (z ^ (z >> 27)).wrapping_mul(MIX_MULTIPLIER_2);
    z ^ (z >> 31)
}

/// Derive a gamma for a split stream. Odd times odd stays odd.
fn mix_gamma(z: u64) -> u64 {
    (splitmix64_mix(z) | 1).wrapping_mul(GOLDEN_GAMMA)
}
