//! Cross-configuration delta synthesis.
//!
//! Profiling sweeps cover each axis against the other axis's reference
//! configuration, not the full cross product. When the runtime lands on
//! an (application, system) pair that was never directly profiled, the
//! delta is synthesized by pivoting through the references:
//!
//! ```text
//! result = f(refApp, sys) * f(app, refSys) / f(refApp, refSys)
//! ```
//!
//! elementwise over time and energy. The form is multiplicative
//! (log-linear): it assumes the relative effect of changing one axis is
//! roughly independent of the other axis's setting. A zero pivot or a
//! non-finite quotient is surfaced as an error, never coerced.

use crate::error::{EmulationError, EmulationResult};
use crate::reader::DeltaReader;
use crate::store::ProfilingStore;
use crate::types::{ConfigId, DeltaSample, InputId, SampleKey};

/// Synthesizes deltas for unprofiled configuration pairs.
#[derive(Debug)]
pub struct Interpolator {
    reader: DeltaReader,
}

impl Interpolator {
    /// Wrap a reader.
    pub fn new(reader: DeltaReader) -> Self {
        Self { reader }
    }

    /// The backing store.
    pub fn store(&self) -> &std::sync::Arc<ProfilingStore> {
        self.reader.store()
    }

    /// Resolve a delta for the given configuration pair.
    ///
    /// Pairs on either reference axis were profiled directly and read
    /// straight from the store; everything else is pivot-composed from
    /// three direct reads.
    pub fn interpolate(
        &mut self,
        app_cfg: ConfigId,
        app_input: InputId,
        sys_cfg: ConfigId,
        iteration: u64,
    ) -> EmulationResult<DeltaSample> {
        let metadata = self.reader.store().metadata();
        let reference_app = metadata.reference_app_cfg;
        let reference_sys = metadata.reference_sys_cfg;

        if app_cfg == reference_app || sys_cfg == reference_sys {
            return self
                .reader
                .read(SampleKey::new(app_cfg, app_input, sys_cfg), iteration);
        }

        let origin_key = SampleKey::new(reference_app, app_input, reference_sys);
        let target = SampleKey::new(app_cfg, app_input, sys_cfg);

        let pivot_over_ref = self
            .reader
            .read(SampleKey::new(reference_app, app_input, sys_cfg), iteration)?;
        let pivot_at_origin = self.reader.read(origin_key, iteration)?;
        let at_ref_sys = self
            .reader
            .read(SampleKey::new(app_cfg, app_input, reference_sys), iteration)?;

        let time = compose(
            pivot_over_ref.time,
            at_ref_sys.time,
            pivot_at_origin.time,
            origin_key,
            target,
            "time",
        )?;
        let energy = compose(
            pivot_over_ref.energy,
            at_ref_sys.energy,
            pivot_at_origin.energy,
            origin_key,
            target,
            "energy",
        )?;

        tracing::debug!(%target, iteration, time, energy, "interpolated delta");
        Ok(DeltaSample::new(time, energy))
    }
}

/// One field of the pivot composition, with degeneracy checks.
fn compose(
    over_ref: f64,
    at_ref_sys: f64,
    at_origin: f64,
    origin_key: SampleKey,
    target: SampleKey,
    field: &'static str,
) -> EmulationResult<f64> {
    if at_origin == 0.0 {
        return Err(EmulationError::ZeroPivot {
            key: origin_key,
            field,
        });
    }
    let value = over_ref * at_ref_sys / at_origin;
    if !value.is_finite() {
        return Err(EmulationError::NonFinite { key: target, field });
    }
    Ok(value)
}
