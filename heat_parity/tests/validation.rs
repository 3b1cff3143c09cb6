use std::{
    env, fs,
    fs::File,
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};

use heat_core::{
    export::{export_result, write_result},
    BackendKind, HeatError, RunResult, SerialEngine, SimulationConfig, SimulationRun,
    ThreadedEngine, TimeStepper,
};
use heat_parity::{
    load_result, loader::method_path, render_report, CsvErrorMapSink, ValidationHarness,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn temp_dir(tag: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = env::temp_dir().join(format!("heat_parity_{tag}_{}_{nanos}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn run(kind: BackendKind, n: usize, nt: u64) -> RunResult {
    let cfg = SimulationConfig::default().with_grid(n, n, nt);
    let run = SimulationRun::from_config(&cfg, kind).unwrap();
    let result = match kind {
        BackendKind::Threaded => TimeStepper::new(ThreadedEngine::new(3).unwrap()).run(&run),
        _ => TimeStepper::new(SerialEngine::new()).run(&run),
    };
    result.unwrap()
}

fn write_as(dir: &PathBuf, method: &str, result: &RunResult) {
    let file = File::create(method_path(dir, method)).unwrap();
    write_result(file, result).unwrap();
}

#[test]
fn export_then_load_is_exact() {
    let dir = temp_dir("roundtrip");
    let mut result = run(BackendKind::Serial, 17, 9);
    // Perturb with values that stress shortest round-trip formatting.
    let mut rng = ChaCha8Rng::seed_from_u64(0xC0FFEE);
    for v in result.field.values_mut().iter_mut().step_by(5) {
        *v = rng.gen_range(-1.0..1.0) * 10f64.powi(rng.gen_range(-300..300));
    }

    let path = export_result(&dir, &result).unwrap();
    let loaded = load_result(&path).unwrap();
    fs::remove_dir_all(&dir).ok();

    assert_eq!(loaded.field, result.field);
    assert_eq!(loaded.metadata.grid_size, Some((17, 17)));
    assert_eq!(loaded.metadata.time_steps, Some(9));
    assert_eq!(loaded.metadata.final_time, Some(result.metadata.final_time));
    assert_eq!(loaded.metadata.threads, Some(1));
}

#[test]
fn self_comparison_reports_zero_error() {
    let dir = temp_dir("self");
    let serial = run(BackendKind::Serial, 20, 10);
    export_result(&dir, &serial).unwrap();

    let report = ValidationHarness::new(&dir)
        .with_methods(["serial"])
        .run()
        .unwrap();
    fs::remove_dir_all(&dir).ok();

    let m = report.method("serial").unwrap().comparison.metrics;
    assert_eq!(m.mse, 0.0);
    assert_eq!(m.rmse, 0.0);
    assert_eq!(m.max_abs_error, 0.0);
    assert_eq!(m.mean_abs_error, 0.0);
}

#[test]
fn mismatched_and_missing_methods_are_skipped() {
    let dir = temp_dir("skip");
    export_result(&dir, &run(BackendKind::Serial, 50, 100)).unwrap();
    export_result(&dir, &run(BackendKind::Threaded, 50, 100)).unwrap();
    write_as(&dir, "gpu", &run(BackendKind::Serial, 40, 100));
    // hybrid file intentionally absent

    let maps = dir.join("maps");
    let mut harness = ValidationHarness::new(&dir).with_sink(CsvErrorMapSink::new(&maps));
    let report = harness.run().unwrap();

    assert_eq!(report.reference_shape, (50, 50));
    assert_eq!(report.methods.len(), 1);
    let threaded = report.method("threaded").unwrap();
    assert!(threaded.comparison.metrics.max_abs_error < 1e-9);
    assert_eq!(threaded.metadata.threads, Some(3));

    let skipped: Vec<&str> = report.skipped.iter().map(|s| s.method.as_str()).collect();
    assert_eq!(skipped, ["gpu", "hybrid"]);
    assert!(report.skipped[0].reason.contains("40x40"));

    assert_eq!(harness.sink().written(), [maps.join("threaded_abs_error.csv")]);
    assert!(maps.join("threaded_abs_error.csv").exists());

    let text = render_report(&report);
    fs::remove_dir_all(&dir).ok();
    assert!(text.starts_with(&"=".repeat(80)));
    assert!(text.contains("HEAT EQUATION SOLVER ERROR ANALYSIS REPORT"));
    assert!(text.contains("ERROR METRICS COMPARISON:"));
    assert!(text.contains("METHOD: THREADED"));
    assert!(!text.contains("METHOD: GPU"));
    assert!(text.contains("SKIPPED METHODS:"));
    assert!(text.contains("INTERPRETATION GUIDE:"));
}

#[test]
fn report_is_header_only_without_comparisons() {
    let dir = temp_dir("empty");
    export_result(&dir, &run(BackendKind::Serial, 10, 3)).unwrap();

    let report = ValidationHarness::new(&dir).run().unwrap();
    fs::remove_dir_all(&dir).ok();

    assert!(report.methods.is_empty());
    assert_eq!(report.skipped.len(), 3);
    let text = render_report(&report);
    assert!(text.contains("DETAILED ANALYSIS:"));
    assert!(!text.contains("METHOD: "));
}

#[test]
fn missing_reference_is_fatal() {
    let dir = temp_dir("noref");
    let err = ValidationHarness::new(&dir).run().unwrap_err();
    fs::remove_dir_all(&dir).ok();
    assert!(matches!(err, HeatError::Io { .. }));
}

#[test]
fn metrics_json_lists_methods_and_skips() {
    let dir = temp_dir("json");
    export_result(&dir, &run(BackendKind::Serial, 12, 5)).unwrap();
    export_result(&dir, &run(BackendKind::Threaded, 12, 5)).unwrap();

    let report = ValidationHarness::new(&dir).run().unwrap();
    let path = dir.join("metrics.json");
    heat_parity::write_metrics_json(&path, &report).unwrap();
    let value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    fs::remove_dir_all(&dir).ok();

    assert_eq!(value["reference"], "serial");
    assert_eq!(value["methods"][0]["method"], "threaded");
    assert_eq!(value["methods"][0]["metrics"]["mse"], 0.0);
    assert_eq!(value["skipped"].as_array().unwrap().len(), 2);
}
