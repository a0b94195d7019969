//! Per-input delta resolution: tape replay and statistical
//! reconstruction.
//!
//! A [`DeltaReader`] turns one (sample key, iteration) pair into a
//! [`DeltaSample`] using one of two modes:
//!
//! - **Tape**: replay the recorded per-iteration sample, perturbed with
//!   Gaussian noise proportional to the recorded magnitude. A finite
//!   trace serves arbitrarily long runs through ping-pong remapping,
//!   which keeps consecutive emulated inputs close in trace index and
//!   preserves the local correlation a discontinuous wrap would destroy.
//! - **Statistics**: characterize the whole cell by its mean and
//!   variance, rescale against outliers, and perturb with uniform noise.
//!   The requested iteration is ignored.
//!
//! Noise comes from the process-wide default [`RandomSource`] unless the
//! reader was handed a private, separately-seeded instance.

use std::sync::Arc;

use crate::error::{EmulationError, EmulationResult};
use crate::rng::{self, RandomSource};
use crate::store::ProfilingStore;
use crate::types::{DeltaSample, IterationKey, SampleKey};

/// How recorded traces are turned back into per-input deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// Replay recorded per-iteration samples with proportional Gaussian
    /// noise.
    Tape,
    /// Reconstruct from per-cell mean/variance with uniform noise.
    Statistics,
}

impl std::fmt::Display for ReadMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadMode::Tape => write!(f, "tape"),
            ReadMode::Statistics => write!(f, "statistics"),
        }
    }
}

/// Noise generator behind a reader: the shared process-wide default, or
/// a private instance a caller seeded explicitly.
#[derive(Debug)]
enum NoiseSource {
    Shared,
    Private(RandomSource),
}

impl NoiseSource {
    fn gaussian(&mut self, std_dev: f64) -> f64 {
        match self {
            NoiseSource::Shared => rng::with_default(|r| r.gaussian(std_dev)),
            NoiseSource::Private(r) => r.gaussian(std_dev),
        }
    }

    fn uniform(&mut self, min: f64, max: f64) -> f64 {
        match self {
            NoiseSource::Shared => rng::with_default(|r| r.uniform(min, max)),
            NoiseSource::Private(r) => r.uniform(min, max),
        }
    }
}

/// Remap an unbounded iteration into a finite trace by ping-pong replay.
///
/// Even repetitions walk the trace forward, odd repetitions walk it
/// backward, so the replayed sequence for a trace of three is
/// `[0,1,2][2,1,0][0,1,2]...`.
pub(crate) fn remap_iteration(iteration: u64, trace_size: u64) -> u64 {
    let shifted = iteration % trace_size;
    let repetition = iteration / trace_size;
    if repetition % 2 == 1 {
        (trace_size - 1) - shifted
    } else {
        shifted
    }
}

/// Streaming mean/variance accumulator, Welford's algorithm.
///
/// Variance uses the population divisor (the sample count itself); the
/// characterization below feeds it exactly `inputs_traced - 1` samples
/// and the divisor must be that same count for numeric parity with the
/// recorded profiles.
#[derive(Debug, Clone, Copy, Default)]
struct CellStats {
    count: u64,
    mean: f64,
    m2: f64,
}

impl CellStats {
    fn update(&mut self, x: f64) {
        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
    }

    fn mean(&self) -> f64 {
        self.mean
    }

    fn std_dev(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            (self.m2 / self.count as f64).sqrt()
        }
    }
}

/// Resolves one profiled key into a per-input delta sample.
#[derive(Debug)]
pub struct DeltaReader {
    store: Arc<ProfilingStore>,
    mode: ReadMode,
    noise: NoiseSource,
    /// Outlier rescale factor. Starts at 1.0 and only ever shrinks.
    rescale: f64,
}

impl DeltaReader {
    /// Create a reader that draws noise from the process-wide default
    /// generator.
    pub fn new(store: Arc<ProfilingStore>, mode: ReadMode) -> Self {
        Self {
            store,
            mode,
            noise: NoiseSource::Shared,
            rescale: 1.0,
        }
    }

    /// Create a reader with a private, explicitly seeded generator.
    ///
    /// This is the entry point tests use: a private instance makes reads
    /// reproducible without perturbing the shared default.
    pub fn with_rng(store: Arc<ProfilingStore>, mode: ReadMode, rng: RandomSource) -> Self {
        Self {
            store,
            mode,
            noise: NoiseSource::Private(rng),
            rescale: 1.0,
        }
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<ProfilingStore> {
        &self.store
    }

    /// The active reconstruction mode.
    pub fn mode(&self) -> ReadMode {
        self.mode
    }

    /// Current outlier rescale factor.
    pub fn rescale_factor(&self) -> f64 {
        self.rescale
    }

    /// Resolve one key into a delta sample.
    ///
    /// Tape mode fails fatally when the key was never traced; both modes
    /// fail when a row that should exist is absent.
    pub fn read(&mut self, key: SampleKey, iteration: u64) -> EmulationResult<DeltaSample> {
        match self.mode {
            ReadMode::Tape => self.read_tape(key, iteration),
            ReadMode::Statistics => self.read_statistics(key),
        }
    }

    fn read_tape(&mut self, key: SampleKey, iteration: u64) -> EmulationResult<DeltaSample> {
        if !self.store.is_traced(&key) {
            return Err(EmulationError::UntracedKey(key));
        }
        let metadata = self.store.metadata();
        let noise_factor = metadata.tape_noise_factor;
        let remapped = remap_iteration(iteration, metadata.trace_size());

        let row = IterationKey::new(key, remapped);
        let recorded = self
            .store
            .sample(&row)
            .ok_or(EmulationError::MissingIteration(row))?;

        let time = recorded.time + self.noise.gaussian(recorded.time.abs() * noise_factor);
        let energy = recorded.energy + self.noise.gaussian(recorded.energy.abs() * noise_factor);

        tracing::debug!(
            mode = "tape",
            %key,
            iteration,
            remapped,
            time,
            energy,
            "replayed profiled delta"
        );
        Ok(DeltaSample::new(time, energy))
    }

    /// Characterize the whole cell; the requested iteration plays no
    /// role here.
    fn read_statistics(&mut self, key: SampleKey) -> EmulationResult<DeltaSample> {
        let metadata = self.store.metadata();
        let sample_count = metadata.inputs_traced.saturating_sub(1);
        if sample_count < 2 {
            return Err(EmulationError::InsufficientTrace {
                inputs_traced: metadata.inputs_traced,
            });
        }
        let outlier_elimination = metadata.outlier_elimination;
        let time_margin = metadata.time_outlier;
        let energy_margin = metadata.energy_outlier;

        let mut time_stats = CellStats::default();
        let mut energy_stats = CellStats::default();
        for iteration in 0..sample_count {
            let row = IterationKey::new(key, iteration);
            let recorded = self
                .store
                .sample(&row)
                .ok_or(EmulationError::MissingIteration(row))?;
            time_stats.update(recorded.time);
            energy_stats.update(recorded.energy);
        }

        if outlier_elimination {
            self.shrink_rescale(time_stats.mean(), time_stats.std_dev(), time_margin);
            self.shrink_rescale(energy_stats.mean(), energy_stats.std_dev(), energy_margin);
        }

        let time_mean = time_stats.mean() * self.rescale;
        let energy_mean = energy_stats.mean() * self.rescale;

        let time_span = time_mean.abs() / 3.0;
        let energy_span = energy_mean.abs() / 3.0;
        let time = time_mean + self.noise.uniform(-time_span, time_span);
        let energy = energy_mean + self.noise.uniform(-energy_span, energy_span);

        tracing::debug!(
            mode = "statistics",
            %key,
            time_mean,
            energy_mean,
            rescale = self.rescale,
            time,
            energy,
            "reconstructed cell delta"
        );
        Ok(DeltaSample::new(time, energy))
    }

    fn shrink_rescale(&mut self, mean: f64, std_dev: f64, safety_margin: f64) {
        if std_dev != 0.0 {
            self.rescale = self.rescale.min(mean / (std_dev * safety_margin));
        }
    }
}
