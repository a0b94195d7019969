use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use placebo::{
    ConfigId, DeltaReader, DeltaSample, InputId, Interpolator, Metadata, ProfilingDump,
    ProfilingStore, RandomSource, ReadMode, SampleKey, SampleRow,
};

const INPUT: InputId = InputId(0);
const TRACE_LEN: u64 = 64;

/// Reference-axis cells of a small sweep, trace of 64 rows each.
fn store() -> Arc<ProfilingStore> {
    let cells = [
        SampleKey::new(ConfigId(0), INPUT, ConfigId(1)),
        SampleKey::new(ConfigId(0), INPUT, ConfigId(0)),
        SampleKey::new(ConfigId(1), INPUT, ConfigId(0)),
    ];
    let samples = cells
        .iter()
        .flat_map(|&key| {
            (0..TRACE_LEN).map(move |iteration| SampleRow {
                key,
                iteration,
                delta: DeltaSample::new(10.0 + iteration as f64 * 0.25, 4.0 + iteration as f64 * 0.1),
            })
        })
        .collect();
    let dump = ProfilingDump {
        metadata: Metadata {
            application: "bench".into(),
            input_stream: "bench".into(),
            warmup_inputs: 0,
            inputs_traced: TRACE_LEN,
            tape_noise_factor: 0.05,
            time_outlier: 3.0,
            energy_outlier: 3.0,
            reference_app_cfg: ConfigId(0),
            reference_sys_cfg: ConfigId(0),
            outlier_elimination: false,
        },
        traced: cells.to_vec(),
        samples,
        app_settings: vec![],
        sys_settings: vec![],
    };
    Arc::new(ProfilingStore::from_dump(dump).expect("valid fixture"))
}

/// The engine is queried once per processed input, so the per-read cost
/// is the number that matters.
fn bench_read_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("read_path");

    group.bench_function("tape_replay", |b| {
        let mut reader = DeltaReader::with_rng(store(), ReadMode::Tape, RandomSource::new(1));
        let key = SampleKey::new(ConfigId(0), INPUT, ConfigId(0));
        let mut iteration = 0u64;
        b.iter(|| {
            iteration += 1;
            black_box(reader.read(key, iteration).expect("read"))
        });
    });

    group.bench_function("statistics_reconstruction", |b| {
        let mut reader =
            DeltaReader::with_rng(store(), ReadMode::Statistics, RandomSource::new(1));
        let key = SampleKey::new(ConfigId(0), INPUT, ConfigId(0));
        b.iter(|| black_box(reader.read(key, 0).expect("read")));
    });

    group.bench_function("pivot_interpolation", |b| {
        let reader = DeltaReader::with_rng(store(), ReadMode::Tape, RandomSource::new(1));
        let mut interpolator = Interpolator::new(reader);
        let mut iteration = 0u64;
        b.iter(|| {
            iteration += 1;
            black_box(
                interpolator
                    .interpolate(ConfigId(1), INPUT, ConfigId(1), iteration)
                    .expect("interpolate"),
            )
        });
    });

    group.finish();
}

criterion_group!(benches, bench_read_path);
criterion_main!(benches);
