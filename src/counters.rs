//! Incremental emulated clock and energy counters.
//!
//! [`EmulatedCounters`] stands in for the hardware measurement providers
//! while an architecture runs in emulated mode. An external progress
//! counter grows by one per processed input; on every read the counter
//! catches up by charging each unaccounted input with one delta resolved
//! through the interpolator, then caches the totals. Every input is
//! charged exactly once no matter how irregularly the counters are
//! polled.
//!
//! The accumulators are exact signed sums (individual deltas may be
//! negative). The exposed [`Clock`] and [`Energy`] readings are
//! high-watermarked per instance so they never run backwards, which is
//! the contract real hardware providers satisfy.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::EmulationResult;
use crate::interpolate::Interpolator;
use crate::store::ProfilingStore;
use crate::types::{InputId, KnobSnapshot};

/// Monotonic time reading, emulated or real.
pub trait Clock {
    /// Current global time. Non-decreasing per instance.
    fn read_clock(&self) -> EmulationResult<f64>;
}

/// Monotonic energy reading, emulated or real.
pub trait Energy {
    /// Current global energy. Non-decreasing.
    fn read_energy(&self) -> EmulationResult<u64>;
}

/// The runtime's processed-input progress signal.
///
/// Owned and advanced by the execution thread; this engine only reads
/// it, exactly once per query.
pub trait ProgressSource: Send + Sync {
    /// Number of inputs processed so far.
    fn processed_inputs(&self) -> u64;
}

impl ProgressSource for AtomicU64 {
    fn processed_inputs(&self) -> u64 {
        self.load(Ordering::Acquire)
    }
}

/// Live knob snapshots of the running application and system.
///
/// The engine resolves these against the store's settings tables and
/// never computes configuration ids itself.
pub trait ConfigurationSource: Send + Sync {
    /// Snapshot of the application knobs at this instant.
    fn current_app_configuration(&self) -> KnobSnapshot;
    /// Snapshot of the system knobs at this instant.
    fn current_sys_configuration(&self) -> KnobSnapshot;
}

/// State mutated by the accumulation step, behind one lock.
#[derive(Debug)]
struct Accumulator {
    interpolator: Interpolator,
    processed: u64,
    global_time: f64,
    global_energy: f64,
    clock_watermark: f64,
    energy_watermark: u64,
}

/// Emulated clock/energy provider for one architecture in emulated mode.
///
/// Created when the architecture enters emulated mode and simply dropped
/// when it leaves; there is no snapshot or resume.
pub struct EmulatedCounters {
    store: Arc<ProfilingStore>,
    input: InputId,
    progress: Arc<dyn ProgressSource>,
    configuration: Box<dyn ConfigurationSource>,
    state: Mutex<Accumulator>,
}

impl std::fmt::Debug for EmulatedCounters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmulatedCounters")
            .field("input", &self.input)
            .finish_non_exhaustive()
    }
}

impl EmulatedCounters {
    /// Create counters over the given interpolator.
    ///
    /// `input` is the profiled input stream being emulated, fixed for
    /// the lifetime of the instance. `progress` is the runtime's
    /// processed-input signal; `configuration` yields the live knob
    /// snapshots each charged input is resolved under.
    pub fn new(
        interpolator: Interpolator,
        input: InputId,
        progress: Arc<dyn ProgressSource>,
        configuration: Box<dyn ConfigurationSource>,
    ) -> Self {
        let store = interpolator.store().clone();
        Self {
            store,
            input,
            progress,
            configuration,
            state: Mutex::new(Accumulator {
                interpolator,
                processed: 0,
                global_time: 0.0,
                global_energy: 0.0,
                clock_watermark: 0.0,
                energy_watermark: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Accumulator> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Charge every input up to `current_processed_inputs`.
    ///
    /// A no-op when nothing new was processed. The argument is the
    /// single snapshot of the progress counter for this invocation; the
    /// counter is never re-read mid-accumulation.
    pub fn on_query(&self, current_processed_inputs: u64) -> EmulationResult<()> {
        let mut state = self.lock();
        self.advance(&mut state, current_processed_inputs)
    }

    fn advance(&self, state: &mut Accumulator, current: u64) -> EmulationResult<()> {
        while state.processed < current {
            let index = state.processed + 1;

            let app_snapshot = self.configuration.current_app_configuration();
            let sys_snapshot = self.configuration.current_sys_configuration();
            let app_cfg = self.store.resolve_app_configuration(&app_snapshot)?;
            let sys_cfg = self.store.resolve_sys_configuration(&sys_snapshot)?;

            let delta = state
                .interpolator
                .interpolate(app_cfg, self.input, sys_cfg, index - 1)?;
            state.global_time += delta.time;
            state.global_energy += delta.energy;
            state.processed = index;

            tracing::debug!(
                input = index,
                %app_cfg,
                %sys_cfg,
                time = delta.time,
                energy = delta.energy,
                "charged emulated input"
            );
        }
        Ok(())
    }

    /// Raw signed accumulator totals `(time, energy)`.
    ///
    /// Unlike the watermarked trait readings these can decrease, and
    /// they are the values charge accounting is checked against.
    pub fn totals(&self) -> (f64, f64) {
        let state = self.lock();
        (state.global_time, state.global_energy)
    }

    /// Number of inputs charged so far.
    pub fn processed_inputs(&self) -> u64 {
        self.lock().processed
    }
}

impl Clock for EmulatedCounters {
    fn read_clock(&self) -> EmulationResult<f64> {
        let current = self.progress.processed_inputs();
        let mut state = self.lock();
        self.advance(&mut state, current)?;
        if state.global_time > state.clock_watermark {
            state.clock_watermark = state.global_time;
        }
        Ok(state.clock_watermark)
    }
}

impl Energy for EmulatedCounters {
    fn read_energy(&self) -> EmulationResult<u64> {
        let current = self.progress.processed_inputs();
        let mut state = self.lock();
        self.advance(&mut state, current)?;
        let rounded = if state.global_energy <= 0.0 {
            0
        } else {
            state.global_energy.round() as u64
        };
        if rounded > state.energy_watermark {
            state.energy_watermark = rounded;
        }
        Ok(state.energy_watermark)
    }
}
