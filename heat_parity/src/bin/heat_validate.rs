use std::{env, path::PathBuf};

use anyhow::{bail, Context, Result};
use heat_parity::{
    harness::{DEFAULT_METHODS, DEFAULT_REFERENCE},
    report::DEFAULT_REPORT_FILE,
    write_metrics_json, write_report, CsvErrorMapSink, ValidationHarness,
};
use tracing_subscriber::EnvFilter;

struct CliOptions {
    dir: PathBuf,
    reference: String,
    methods: Vec<String>,
    report: PathBuf,
    json: Option<PathBuf>,
    error_maps: Option<PathBuf>,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let options = parse_options()?;
    let harness = ValidationHarness::new(&options.dir)
        .with_reference(options.reference.clone())
        .with_methods(options.methods.clone());

    let report = match options.error_maps {
        Some(ref dir) => harness
            .with_sink(CsvErrorMapSink::new(dir))
            .run()
            .context("validation failed")?,
        None => {
            let mut harness = harness;
            harness.run().context("validation failed")?
        }
    };

    println!(
        "Reference {}: shape {}x{}",
        report.reference, report.reference_shape.0, report.reference_shape.1
    );
    for entry in &report.methods {
        let m = &entry.comparison.metrics;
        println!("Errors for {} method:", entry.method);
        println!("  MSE: {:.6e}", m.mse);
        println!("  RMSE: {:.6e}", m.rmse);
        println!("  Max Absolute Error: {:.6e}", m.max_abs_error);
    }
    for skipped in &report.skipped {
        println!("Skipping {}: {}", skipped.method, skipped.reason);
    }

    write_report(&options.report, &report)?;
    println!("Report saved as '{}'", options.report.display());
    if let Some(ref path) = options.json {
        write_metrics_json(path, &report)?;
        println!("Metrics saved as '{}'", path.display());
    }
    Ok(())
}

fn parse_options() -> Result<CliOptions> {
    let mut opts = CliOptions {
        dir: PathBuf::from("."),
        reference: DEFAULT_REFERENCE.to_string(),
        methods: DEFAULT_METHODS.iter().map(|m| m.to_string()).collect(),
        report: PathBuf::from(DEFAULT_REPORT_FILE),
        json: None,
        error_maps: None,
    };

    for arg in env::args().skip(1) {
        if let Some(value) = arg.strip_prefix("--dir=") {
            opts.dir = PathBuf::from(value);
        } else if let Some(value) = arg.strip_prefix("--reference=") {
            opts.reference = value.to_string();
        } else if let Some(value) = arg.strip_prefix("--methods=") {
            opts.methods = value
                .split(',')
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string)
                .collect();
        } else if let Some(value) = arg.strip_prefix("--report=") {
            opts.report = PathBuf::from(value);
        } else if let Some(value) = arg.strip_prefix("--json=") {
            opts.json = Some(PathBuf::from(value));
        } else if let Some(value) = arg.strip_prefix("--error-maps=") {
            opts.error_maps = Some(PathBuf::from(value));
        } else {
            bail!("unrecognized argument: {arg}");
        }
    }

    Ok(opts)
}
