//! Deterministic random source for noise injection.
//!
//! Every noise step in the engine draws from [`RandomSource`], a small
//! three-register xorshift/multiply generator. The generator is seedable
//! and fully reproducible: two instances built from the same seed produce
//! identical sequences, which is what makes emulated runs
//! regression-stable. Cryptographic strength is explicitly not a goal.
//!
//! A process-wide default instance is created lazily from wall-clock time
//! and shared behind a lock; components use it unless a caller supplies a
//! private, separately-seeded instance. Tests must always supply one.

use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::{Error, RngCore, SeedableRng};

/// Multiplier applied to the rotated register on output.
const OUTPUT_MULTIPLIER: u64 = 0x2545_F491_4F6C_DD1D;

/// Initial register values before the seed is mixed in.
///
/// Arbitrary odd constants; the only requirement is a non-zero state for
/// every seed, which holds because `INIT_Y` and `INIT_Z` are fixed.
const INIT_X: u64 = 0x9E37_79B9_7F4A_7C15;
const INIT_Y: u64 = 0xD1B5_4A32_D192_ED03;
const INIT_Z: u64 = 0x94D0_49BB_1331_11EB;

/// Number of initial outputs discarded to decorrelate state from the seed.
const WARMUP_DRAWS: usize = 3;

/// Deterministic, seedable generator producing uniform and Gaussian
/// samples.
///
/// # Example
///
/// ```
/// use placebo::RandomSource;
///
/// let mut a = RandomSource::new(42);
/// let mut b = RandomSource::new(42);
/// assert_eq!(a.next_u64(), b.next_u64());
/// ```
#[derive(Debug, Clone)]
pub struct RandomSource {
    x: u64,
    y: u64,
    z: u64,
}

impl RandomSource {
    /// Create a generator from a 64-bit seed.
    ///
    /// The seed is XOR-mixed into one register and the first few outputs
    /// are discarded so that nearby seeds do not produce correlated
    /// opening sequences.
    pub fn new(seed: u64) -> Self {
        let mut rng = Self {
            x: INIT_X ^ seed,
            y: INIT_Y,
            z: INIT_Z,
        };
        for _ in 0..WARMUP_DRAWS {
            rng.next_u64();
        }
        rng
    }

    /// Next raw 64-bit output.
    #[allow(clippy::should_implement_trait)]
    pub fn next_u64(&mut self) -> u64 {
        self.x ^= self.x << 16;
        self.x ^= self.x >> 5;
        self.x ^= self.x << 1;
        let t = self.x;
        self.x = self.y;
        self.y = self.z;
        self.z = t ^ self.x ^ self.y;
        self.z.wrapping_mul(OUTPUT_MULTIPLIER)
    }

    /// Next float in `[0, 1)`, using the 53 high bits of one draw.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Uniform sample in `[min, max)`.
    pub fn uniform(&mut self, min: f64, max: f64) -> f64 {
        self.next_f64() * (max - min) + min
    }

    /// Zero-mean Gaussian sample with the given standard deviation.
    ///
    /// Box-Muller transform from two uniform draws. The first draw is
    /// mapped into `(0, 1]` so the logarithm stays finite.
    pub fn gaussian(&mut self, std_dev: f64) -> f64 {
        let x = 1.0 - self.next_f64();
        let y = self.next_f64();
        std_dev * (-2.0 * x.ln()).sqrt() * (std::f64::consts::TAU * y).cos()
    }
}

impl RngCore for RandomSource {
    fn next_u32(&mut self) -> u32 {
        (RandomSource::next_u64(self) >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        RandomSource::next_u64(self)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let bytes = RandomSource::next_u64(self).to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for RandomSource {
    type Seed = [u8; 8];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::new(u64::from_le_bytes(seed))
    }

    fn seed_from_u64(state: u64) -> Self {
        Self::new(state)
    }
}

static DEFAULT: OnceLock<Mutex<RandomSource>> = OnceLock::new();

/// Run a closure against the process-wide default generator.
///
/// The default instance is created on first use, seeded from wall-clock
/// time. Components that were not handed an explicit [`RandomSource`]
/// draw from this one; the lock is held only for the duration of the
/// closure.
pub fn with_default<R>(f: impl FnOnce(&mut RandomSource) -> R) -> R {
    let shared = DEFAULT.get_or_init(|| {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0x5EED_5EED_5EED_5EED);
        Mutex::new(RandomSource::new(seed))
    });
    let mut rng = shared
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    f(&mut rng)
}
