//! Core data model: configuration ids, sample keys, delta samples, and
//! knob values.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Integer id of a profiled configuration (application or system axis).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConfigId(pub u32);

impl std::fmt::Display for ConfigId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Integer id of a profiled application input stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InputId(pub u32);

impl std::fmt::Display for InputId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies one profiled cell: an application configuration run on an
/// input stream under a system configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SampleKey {
    /// Application configuration id.
    pub app_cfg: ConfigId,
    /// Application input stream id.
    pub app_input: InputId,
    /// System configuration id.
    pub sys_cfg: ConfigId,
}

impl SampleKey {
    /// Create a sample key.
    pub fn new(app_cfg: ConfigId, app_input: InputId, sys_cfg: ConfigId) -> Self {
        Self {
            app_cfg,
            app_input,
            sys_cfg,
        }
    }
}

impl std::fmt::Display for SampleKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "(app={}, input={}, sys={})",
            self.app_cfg, self.app_input, self.sys_cfg
        )
    }
}

/// One profiled row: a sample key plus the iteration within the cell's
/// trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IterationKey {
    /// The profiled cell.
    pub key: SampleKey,
    /// Trace iteration, starting at zero.
    pub iteration: u64,
}

impl IterationKey {
    /// Create an iteration key.
    pub fn new(key: SampleKey, iteration: u64) -> Self {
        Self { key, iteration }
    }
}

impl std::fmt::Display for IterationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} iteration {}", self.key, self.iteration)
    }
}

/// Signed per-input increments of emulated time and energy.
///
/// Negative values are legal; a reconfiguration can make an input cheaper
/// than the running average, and nothing here clamps that.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeltaSample {
    /// Time increment for one processed input.
    pub time: f64,
    /// Energy increment for one processed input.
    pub energy: f64,
}

impl DeltaSample {
    /// Create a delta sample.
    pub fn new(time: f64, energy: f64) -> Self {
        Self { time, energy }
    }
}

/// Value of a single knob in a configuration snapshot.
///
/// A closed tagged variant: knob values are integers, floats, or text,
/// and equality/hashing are structural matches over the variant. Floats
/// compare and hash by bit pattern, so a snapshot round-trips through the
/// settings table without tolerance games.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum KnobValue {
    /// Integer-valued knob.
    Int(i64),
    /// Float-valued knob, compared bitwise.
    Float(f64),
    /// Text-valued knob.
    Text(String),
}

impl PartialEq for KnobValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (KnobValue::Int(a), KnobValue::Int(b)) => a == b,
            (KnobValue::Float(a), KnobValue::Float(b)) => a.to_bits() == b.to_bits(),
            (KnobValue::Text(a), KnobValue::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for KnobValue {}

impl Hash for KnobValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            KnobValue::Int(v) => v.hash(state),
            KnobValue::Float(v) => v.to_bits().hash(state),
            KnobValue::Text(v) => v.hash(state),
        }
    }
}

impl std::fmt::Display for KnobValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KnobValue::Int(v) => write!(f, "{}", v),
            KnobValue::Float(v) => write!(f, "{}", v),
            KnobValue::Text(v) => write!(f, "{}", v),
        }
    }
}

/// A complete knob-name to value assignment over one configuration axis,
/// in canonical (name-sorted) form.
///
/// Snapshots are the lookup keys of the settings tables, so two snapshots
/// built from the same assignments in any order are equal and hash alike.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<(String, KnobValue)>")]
pub struct KnobSnapshot(Vec<(String, KnobValue)>);

impl From<Vec<(String, KnobValue)>> for KnobSnapshot {
    fn from(pairs: Vec<(String, KnobValue)>) -> Self {
        // Dumps are produced offline; re-normalize on the way in rather
        // than trusting their ordering.
        Self::new(pairs)
    }
}

impl KnobSnapshot {
    /// Build a snapshot from knob assignments, normalizing to sorted
    /// order. If a knob name repeats, the first assignment wins.
    pub fn new(assignments: impl IntoIterator<Item = (String, KnobValue)>) -> Self {
        let mut pairs: Vec<(String, KnobValue)> = assignments.into_iter().collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        pairs.dedup_by(|a, b| a.0 == b.0);
        Self(pairs)
    }

    /// The normalized assignments.
    pub fn assignments(&self) -> &[(String, KnobValue)] {
        &self.0
    }

    /// Number of knobs in the snapshot.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the snapshot carries no knobs.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeMap<String, KnobValue>> for KnobSnapshot {
    fn from(map: BTreeMap<String, KnobValue>) -> Self {
        // Already sorted and name-unique.
        Self(map.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of<T: Hash>(value: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn knob_value_equality_is_structural() {
        assert_eq!(KnobValue::Int(3), KnobValue::Int(3));
        assert_ne!(KnobValue::Int(3), KnobValue::Float(3.0));
        assert_eq!(KnobValue::Float(0.5), KnobValue::Float(0.5));
        assert_ne!(KnobValue::Float(0.5), KnobValue::Float(0.25));
        assert_eq!(
            KnobValue::Text("fast".into()),
            KnobValue::Text("fast".into())
        );
    }

    #[test]
    fn float_knobs_hash_by_bit_pattern() {
        let a = KnobValue::Float(1.25);
        let b = KnobValue::Float(1.25);
        assert_eq!(hash_of(&a), hash_of(&b));

        // Negative zero and positive zero are distinct bit patterns.
        assert_ne!(KnobValue::Float(0.0), KnobValue::Float(-0.0));
    }

    #[test]
    fn snapshot_is_order_independent() {
        let a = KnobSnapshot::new([
            ("threads".to_string(), KnobValue::Int(4)),
            ("governor".to_string(), KnobValue::Text("performance".into())),
        ]);
        let b = KnobSnapshot::new([
            ("governor".to_string(), KnobValue::Text("performance".into())),
            ("threads".to_string(), KnobValue::Int(4)),
        ]);
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn snapshot_first_assignment_wins_on_duplicates() {
        let snap = KnobSnapshot::new([
            ("threads".to_string(), KnobValue::Int(4)),
            ("threads".to_string(), KnobValue::Int(8)),
        ]);
        assert_eq!(snap.len(), 1);
        assert_eq!(snap.assignments()[0].1, KnobValue::Int(4));
    }

    #[test]
    fn sample_key_round_trips_through_json() {
        let key = SampleKey::new(ConfigId(3), InputId(1), ConfigId(7));
        let json = serde_json::to_string(&key).expect("serialize");
        let back: SampleKey = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(key, back);
    }

    #[test]
    fn delta_sample_preserves_sign_through_json() {
        let delta = DeltaSample::new(-1.5, 0.25);
        let json = serde_json::to_string(&delta).expect("serialize");
        let back: DeltaSample = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(delta.time.to_bits(), back.time.to_bits());
        assert_eq!(delta.energy.to_bits(), back.energy.to_bits());
    }
}
