//! # placebo
//!
//! Emulated timing and energy measurement for self-adaptive runtimes.
//!
//! Running on real target hardware is often infeasible during
//! development, so this crate substitutes statistically and trace-derived
//! timing and energy values for real sensors. It reconstructs physically
//! plausible, reproducible measurement sequences, including for
//! configurations that were never directly profiled, and stays cheap
//! enough to query once per processed input.
//!
//! The engine has four pieces:
//!
//! - [`ProfilingStore`]: profiled samples, metadata, and the settings
//!   tables mapping live knob snapshots to configuration ids, loaded once
//!   from an offline dump.
//! - [`DeltaReader`]: resolves one profiled cell into a per-input
//!   (time, energy) delta, either by replaying the recorded trace
//!   ([`ReadMode::Tape`]) or from the cell's statistical
//!   characterization ([`ReadMode::Statistics`]).
//! - [`Interpolator`]: synthesizes deltas for configuration pairs the
//!   sweep never profiled, pivoting through the reference
//!   configurations.
//! - [`EmulatedCounters`]: accumulates deltas as the runtime's
//!   processed-input count grows and exposes the same [`Clock`] and
//!   [`Energy`] contracts real hardware providers satisfy.
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::{atomic::AtomicU64, Arc};
//! use placebo::{
//!     Clock, DeltaReader, EmulatedCounters, Energy, InputId, Interpolator,
//!     ProfilingStore, RandomSource, ReadMode,
//! };
//!
//! let store = Arc::new(ProfilingStore::load("profiles/swaptions-odroid.json")?);
//!
//! // The runtime bumps this once per processed input.
//! let progress = Arc::new(AtomicU64::new(0));
//!
//! let reader = DeltaReader::with_rng(store, ReadMode::Tape, RandomSource::new(42));
//! let counters = EmulatedCounters::new(
//!     Interpolator::new(reader),
//!     InputId(0),
//!     Arc::new(progress.clone()),
//!     Box::new(my_knob_registry),
//! );
//!
//! // Poll from anywhere; every input is charged exactly once.
//! let elapsed = counters.read_clock()?;
//! let joules = counters.read_energy()?;
//! ```
//!
//! ## Determinism
//!
//! All noise flows through [`RandomSource`], a seedable generator with a
//! process-wide default instance. Handing components an explicitly
//! seeded instance makes an entire emulated run reproducible, which is
//! what regression suites rely on. No noise step is cryptographic.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod counters;
mod error;
mod interpolate;
mod reader;
pub mod rng;
mod store;
mod types;

pub use counters::{Clock, ConfigurationSource, EmulatedCounters, Energy, ProgressSource};
pub use error::{ConfigAxis, EmulationError, EmulationResult};
pub use interpolate::Interpolator;
pub use reader::{DeltaReader, ReadMode};
pub use rng::RandomSource;
pub use store::{Metadata, ProfilingDump, ProfilingStore, SampleRow, SettingsRow};
pub use types::{
    ConfigId, DeltaSample, InputId, IterationKey, KnobSnapshot, KnobValue, SampleKey,
};
