//! Error taxonomy for the emulation engine.
//!
//! Three families of failure exist, and none of them is retryable:
//!
//! 1. Configuration inconsistency: the live knob snapshot or a requested
//!    key falls outside the profiling sweep. A silent default would
//!    invalidate every measurement derived from it, so these are fatal.
//! 2. Arithmetic degeneracy: a zero interpolation pivot or a trace too
//!    short to characterize. Surfaced as errors, never as NaN/Inf.
//! 3. Load-time errors: a missing, malformed, or inconsistent profiling
//!    dump. Fatal at startup, naming the offending field; no partial
//!    load.

use crate::types::{IterationKey, SampleKey};

/// Which configuration axis a settings lookup ran against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigAxis {
    /// Application knobs.
    Application,
    /// System knobs.
    System,
}

impl std::fmt::Display for ConfigAxis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigAxis::Application => write!(f, "application"),
            ConfigAxis::System => write!(f, "system"),
        }
    }
}

/// Error produced by the emulation engine.
#[derive(Debug, thiserror::Error)]
pub enum EmulationError {
    /// The live knob snapshot does not match any profiled configuration.
    #[error("live {axis} configuration matches no profiled configuration ({knobs} knobs set)")]
    UnknownConfiguration {
        /// Axis whose settings table missed.
        axis: ConfigAxis,
        /// Number of knobs in the offending snapshot.
        knobs: usize,
    },

    /// Tape-mode lookup against a cell that was never traced.
    #[error("sample key {0} is not among the traced configurations")]
    UntracedKey(SampleKey),

    /// A profiled row that should exist is absent from the store.
    #[error("no profiled sample at {0}")]
    MissingIteration(IterationKey),

    /// The cell's trace is too short to compute statistics over.
    #[error("trace of {inputs_traced} inputs leaves fewer than 2 samples to characterize")]
    InsufficientTrace {
        /// Number of inputs traced per cell.
        inputs_traced: u64,
    },

    /// Interpolation hit a zero denominator at the reference pivot.
    #[error("zero {field} pivot at reference cell {key}")]
    ZeroPivot {
        /// Reference cell whose delta is zero.
        key: SampleKey,
        /// Which field degenerated.
        field: &'static str,
    },

    /// An interpolation quotient left the finite range.
    #[error("interpolated {field} is not finite for cell {key}")]
    NonFinite {
        /// Target cell of the interpolation.
        key: SampleKey,
        /// Which field degenerated.
        field: &'static str,
    },

    /// The profiling dump failed validation.
    #[error("invalid profiling dump, field `{field}`: {reason}")]
    InvalidDump {
        /// Name of the offending field.
        field: &'static str,
        /// What was wrong with it.
        reason: String,
    },

    /// The profiling dump could not be read.
    #[error("failed to read profiling dump")]
    Io(#[from] std::io::Error),

    /// The profiling dump could not be decoded.
    #[error("failed to decode profiling dump")]
    Malformed(#[from] serde_json::Error),
}

/// Result alias used throughout the engine.
pub type EmulationResult<T> = Result<T, EmulationError>;
