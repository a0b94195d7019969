//! Read-mostly repository of profiled samples.
//!
//! The store is built once from an offline [`ProfilingDump`], validated
//! all-or-nothing, and immutable afterwards. It answers three queries on
//! the hot path: point lookup of a profiled row by iteration key,
//! membership of a sample key among the traced configurations, and
//! resolution of a live knob snapshot to the configuration id the
//! profiling sweep assigned to it.

mod dump;

pub use dump::{Metadata, ProfilingDump, SampleRow, SettingsRow};

use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::error::{ConfigAxis, EmulationError, EmulationResult};
use crate::types::{ConfigId, DeltaSample, IterationKey, KnobSnapshot, SampleKey};

/// Immutable profiling repository for one application + architecture.
#[derive(Debug, Clone)]
pub struct ProfilingStore {
    metadata: Metadata,
    samples: HashMap<IterationKey, DeltaSample>,
    traced: HashSet<SampleKey>,
    app_settings: HashMap<KnobSnapshot, ConfigId>,
    sys_settings: HashMap<KnobSnapshot, ConfigId>,
}

impl ProfilingStore {
    /// Build a store from a dump, validating every field.
    ///
    /// Validation is all-or-nothing: the first inconsistency fails the
    /// whole load with an error naming the offending field. In
    /// particular, every traced cell must carry a complete trace of
    /// `inputs_traced` rows, so tape-mode lookups can never fall off the
    /// end of a cell at runtime.
    pub fn from_dump(dump: ProfilingDump) -> EmulationResult<Self> {
        let metadata = dump.metadata;

        if metadata.warmup_inputs != 0 {
            return Err(EmulationError::InvalidDump {
                field: "warmup_inputs",
                reason: format!(
                    "must be 0, got {}; warmup handling is unimplemented in the tracing phase",
                    metadata.warmup_inputs
                ),
            });
        }
        if metadata.inputs_traced == 0 {
            return Err(EmulationError::InvalidDump {
                field: "inputs_traced",
                reason: "must be at least 1".into(),
            });
        }
        if !metadata.tape_noise_factor.is_finite() || metadata.tape_noise_factor < 0.0 {
            return Err(EmulationError::InvalidDump {
                field: "tape_noise_factor",
                reason: format!("must be finite and non-negative, got {}", metadata.tape_noise_factor),
            });
        }
        for (field, value) in [
            ("time_outlier", metadata.time_outlier),
            ("energy_outlier", metadata.energy_outlier),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(EmulationError::InvalidDump {
                    field,
                    reason: format!("safety margin must be finite and positive, got {}", value),
                });
            }
        }

        let traced: HashSet<SampleKey> = dump.traced.iter().copied().collect();
        if traced.len() != dump.traced.len() {
            return Err(EmulationError::InvalidDump {
                field: "traced",
                reason: "duplicate sample keys".into(),
            });
        }

        let mut samples = HashMap::with_capacity(dump.samples.len());
        for row in &dump.samples {
            if !traced.contains(&row.key) {
                return Err(EmulationError::InvalidDump {
                    field: "samples",
                    reason: format!("row for untraced key {}", row.key),
                });
            }
            if row.iteration >= metadata.inputs_traced {
                return Err(EmulationError::InvalidDump {
                    field: "samples",
                    reason: format!(
                        "iteration {} out of range for {} traced inputs (key {})",
                        row.iteration, metadata.inputs_traced, row.key
                    ),
                });
            }
            if !row.delta.time.is_finite() || !row.delta.energy.is_finite() {
                return Err(EmulationError::InvalidDump {
                    field: "samples",
                    reason: format!("non-finite delta at key {} iteration {}", row.key, row.iteration),
                });
            }
            let prev = samples.insert(IterationKey::new(row.key, row.iteration), row.delta);
            if prev.is_some() {
                return Err(EmulationError::InvalidDump {
                    field: "samples",
                    reason: format!("duplicate row at key {} iteration {}", row.key, row.iteration),
                });
            }
        }

        // Complete traces only: every traced cell has every iteration.
        for key in &traced {
            for iteration in 0..metadata.inputs_traced {
                if !samples.contains_key(&IterationKey::new(*key, iteration)) {
                    return Err(EmulationError::InvalidDump {
                        field: "samples",
                        reason: format!("missing row at key {} iteration {}", key, iteration),
                    });
                }
            }
        }

        let app_settings = build_settings_table(dump.app_settings, "app_settings")?;
        let sys_settings = build_settings_table(dump.sys_settings, "sys_settings")?;

        Ok(Self {
            metadata,
            samples,
            traced,
            app_settings,
            sys_settings,
        })
    }

    /// Read and validate a JSON dump file.
    ///
    /// Loading happens once, synchronously, before the engine is
    /// queryable; failure is fatal and never retried.
    pub fn load(path: impl AsRef<Path>) -> EmulationResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let dump: ProfilingDump = serde_json::from_str(&text)?;
        Self::from_dump(dump)
    }

    /// Tracing metadata.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Point lookup of one profiled row.
    pub fn sample(&self, key: &IterationKey) -> Option<DeltaSample> {
        self.samples.get(key).copied()
    }

    /// Whether a cell is among the traced configurations.
    pub fn is_traced(&self, key: &SampleKey) -> bool {
        self.traced.contains(key)
    }

    /// Number of traced cells.
    pub fn traced_len(&self) -> usize {
        self.traced.len()
    }

    /// Resolve a live application knob snapshot to its configuration id.
    ///
    /// The settings tables are total over the profiling sweep; a miss
    /// means the runtime is in a configuration that was never profiled,
    /// which is fatal.
    pub fn resolve_app_configuration(&self, snapshot: &KnobSnapshot) -> EmulationResult<ConfigId> {
        self.app_settings.get(snapshot).copied().ok_or_else(|| {
            EmulationError::UnknownConfiguration {
                axis: ConfigAxis::Application,
                knobs: snapshot.len(),
            }
        })
    }

    /// Resolve a live system knob snapshot to its configuration id.
    pub fn resolve_sys_configuration(&self, snapshot: &KnobSnapshot) -> EmulationResult<ConfigId> {
        self.sys_settings.get(snapshot).copied().ok_or_else(|| {
            EmulationError::UnknownConfiguration {
                axis: ConfigAxis::System,
                knobs: snapshot.len(),
            }
        })
    }
}

fn build_settings_table(
    rows: Vec<SettingsRow>,
    field: &'static str,
) -> EmulationResult<HashMap<KnobSnapshot, ConfigId>> {
    let mut table = HashMap::with_capacity(rows.len());
    for row in rows {
        match table.insert(row.settings, row.id) {
            Some(prev) if prev != row.id => {
                return Err(EmulationError::InvalidDump {
                    field,
                    reason: format!(
                        "one snapshot maps to conflicting ids {} and {}",
                        prev, row.id
                    ),
                });
            }
            _ => {}
        }
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{InputId, KnobValue};

    fn metadata() -> Metadata {
        Metadata {
            application: "blackscholes".into(),
            input_stream: "native".into(),
            warmup_inputs: 0,
            inputs_traced: 2,
            tape_noise_factor: 0.05,
            time_outlier: 3.0,
            energy_outlier: 3.0,
            reference_app_cfg: ConfigId(0),
            reference_sys_cfg: ConfigId(0),
            outlier_elimination: false,
        }
    }

    fn cell(app: u32, input: u32, sys: u32) -> SampleKey {
        SampleKey::new(ConfigId(app), InputId(input), ConfigId(sys))
    }

    fn dump_with_one_cell() -> ProfilingDump {
        let key = cell(0, 0, 0);
        ProfilingDump {
            metadata: metadata(),
            traced: vec![key],
            samples: vec![
                SampleRow {
                    key,
                    iteration: 0,
                    delta: DeltaSample::new(10.0, 5.0),
                },
                SampleRow {
                    key,
                    iteration: 1,
                    delta: DeltaSample::new(12.0, 6.0),
                },
            ],
            app_settings: vec![SettingsRow {
                settings: KnobSnapshot::new([("threads".to_string(), KnobValue::Int(1))]),
                id: ConfigId(0),
            }],
            sys_settings: vec![SettingsRow {
                settings: KnobSnapshot::new([("freq".to_string(), KnobValue::Float(1.2))]),
                id: ConfigId(0),
            }],
        }
    }

    #[test]
    fn valid_dump_loads() {
        let store = ProfilingStore::from_dump(dump_with_one_cell()).expect("valid dump");
        assert!(store.is_traced(&cell(0, 0, 0)));
        assert!(!store.is_traced(&cell(1, 0, 0)));
        assert_eq!(
            store.sample(&IterationKey::new(cell(0, 0, 0), 1)),
            Some(DeltaSample::new(12.0, 6.0))
        );
        assert_eq!(store.metadata().trace_size(), 2);
    }

    #[test]
    fn nonzero_warmup_is_rejected() {
        let mut dump = dump_with_one_cell();
        dump.metadata.warmup_inputs = 1;
        let err = ProfilingStore::from_dump(dump).unwrap_err();
        assert!(
            matches!(err, EmulationError::InvalidDump { field: "warmup_inputs", .. }),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn row_for_untraced_key_is_rejected() {
        let mut dump = dump_with_one_cell();
        dump.samples.push(SampleRow {
            key: cell(9, 0, 0),
            iteration: 0,
            delta: DeltaSample::new(1.0, 1.0),
        });
        let err = ProfilingStore::from_dump(dump).unwrap_err();
        assert!(matches!(err, EmulationError::InvalidDump { field: "samples", .. }));
    }

    #[test]
    fn incomplete_trace_is_rejected() {
        let mut dump = dump_with_one_cell();
        dump.samples.pop();
        let err = ProfilingStore::from_dump(dump).unwrap_err();
        assert!(matches!(err, EmulationError::InvalidDump { field: "samples", .. }));
    }

    #[test]
    fn non_finite_delta_is_rejected() {
        let mut dump = dump_with_one_cell();
        dump.samples[0].delta.energy = f64::NAN;
        let err = ProfilingStore::from_dump(dump).unwrap_err();
        assert!(matches!(err, EmulationError::InvalidDump { field: "samples", .. }));
    }

    #[test]
    fn conflicting_settings_rows_are_rejected() {
        let mut dump = dump_with_one_cell();
        dump.app_settings.push(SettingsRow {
            settings: KnobSnapshot::new([("threads".to_string(), KnobValue::Int(1))]),
            id: ConfigId(1),
        });
        let err = ProfilingStore::from_dump(dump).unwrap_err();
        assert!(matches!(err, EmulationError::InvalidDump { field: "app_settings", .. }));
    }

    #[test]
    fn settings_resolution_is_total_or_fatal() {
        let store = ProfilingStore::from_dump(dump_with_one_cell()).expect("valid dump");

        let known = KnobSnapshot::new([("threads".to_string(), KnobValue::Int(1))]);
        assert_eq!(store.resolve_app_configuration(&known).unwrap(), ConfigId(0));

        let unknown = KnobSnapshot::new([("threads".to_string(), KnobValue::Int(64))]);
        let err = store.resolve_app_configuration(&unknown).unwrap_err();
        assert!(matches!(
            err,
            EmulationError::UnknownConfiguration {
                axis: ConfigAxis::Application,
                ..
            }
        ));
    }

    #[test]
    fn float_knob_snapshot_resolves_bitwise() {
        let store = ProfilingStore::from_dump(dump_with_one_cell()).expect("valid dump");
        let snap = KnobSnapshot::new([("freq".to_string(), KnobValue::Float(1.2))]);
        assert_eq!(store.resolve_sys_configuration(&snap).unwrap(), ConfigId(0));
    }

    #[test]
    fn dump_round_trips_through_json_file() {
        let dump = dump_with_one_cell();
        let path = std::env::temp_dir().join("placebo_store_roundtrip.json");
        std::fs::write(&path, serde_json::to_string(&dump).expect("serialize")).expect("write");

        let store = ProfilingStore::load(&path).expect("load");
        assert_eq!(
            store.sample(&IterationKey::new(cell(0, 0, 0), 0)),
            Some(DeltaSample::new(10.0, 5.0))
        );
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_file_is_fatal() {
        let err = ProfilingStore::load("/nonexistent/placebo.json").unwrap_err();
        assert!(matches!(err, EmulationError::Io(_)));
    }

    #[test]
    fn malformed_json_is_fatal() {
        let path = std::env::temp_dir().join("placebo_store_malformed.json");
        std::fs::write(&path, "{ not json").expect("write");
        let err = ProfilingStore::load(&path).unwrap_err();
        assert!(matches!(err, EmulationError::Malformed(_)));
        std::fs::remove_file(&path).ok();
    }
}
