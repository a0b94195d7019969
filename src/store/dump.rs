//! On-disk profiling dump format.
//!
//! One dump holds everything the tracing phase produced for a single
//! application on a single architecture: metadata, the traced sample
//! keys, every per-iteration delta row, and the two settings tables that
//! map live knob snapshots to configuration ids. Dumps are produced
//! offline; this crate only reads them. Deltas are stored as 64-bit
//! floats and round-trip without loss through the JSON encoding.

use serde::{Deserialize, Serialize};

use crate::types::{ConfigId, DeltaSample, KnobSnapshot, SampleKey};

/// Per-application/architecture metadata recorded by the tracing phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    /// Opaque handle of the profiled application.
    pub application: String,
    /// Opaque handle of the profiled input stream.
    pub input_stream: String,
    /// Inputs discarded at the head of each trace. Must be 0; warmup
    /// handling was never implemented by the tracing phase.
    pub warmup_inputs: u64,
    /// Inputs traced per cell.
    pub inputs_traced: u64,
    /// Relative standard deviation of tape-mode replay noise.
    pub tape_noise_factor: f64,
    /// Safety margin for time outlier rescaling.
    pub time_outlier: f64,
    /// Safety margin for energy outlier rescaling.
    pub energy_outlier: f64,
    /// Reference application configuration, the interpolation baseline.
    pub reference_app_cfg: ConfigId,
    /// Reference system configuration, the interpolation pivot.
    pub reference_sys_cfg: ConfigId,
    /// Whether statistics-mode outlier rescaling is active for this
    /// application.
    pub outlier_elimination: bool,
}

impl Metadata {
    /// Usable trace length per cell once warmup inputs are discarded.
    pub fn trace_size(&self) -> u64 {
        self.inputs_traced - self.warmup_inputs
    }
}

/// One profiled row of the dump.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleRow {
    /// The profiled cell.
    pub key: SampleKey,
    /// Iteration within the cell's trace.
    pub iteration: u64,
    /// Measured per-input increments.
    pub delta: DeltaSample,
}

/// One row of a settings table: a canonical knob snapshot and the
/// configuration id it resolves to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsRow {
    /// Canonical knob snapshot.
    pub settings: KnobSnapshot,
    /// Configuration id assigned during the profiling sweep.
    pub id: ConfigId,
}

/// Complete profiling dump for one application + architecture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfilingDump {
    /// Tracing metadata.
    pub metadata: Metadata,
    /// Sample keys that were traced ("traced configurations").
    pub traced: Vec<SampleKey>,
    /// Every profiled row.
    pub samples: Vec<SampleRow>,
    /// Application settings table.
    pub app_settings: Vec<SettingsRow>,
    /// System settings table.
    pub sys_settings: Vec<SettingsRow>,
}
