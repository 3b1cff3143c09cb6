//! Shared driver for the backend executables.
//!
//! Each `<method>_heat` binary takes `Nx Ny Nt` positionally, runs one backend,
//! prints the metric lines on stdout and writes `<method>_heat_distribution.csv`.
//! Diagnostics go to stderr so stdout stays machine-readable.

use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use heat_core::{
    export::export_result, summary::MetricLines, BackendKind, HeatError, RunResult,
    SerialEngine, SimulationConfig, SimulationRun, ThreadedEngine, TimeStepper,
};
use heat_gpu::{GpuContext, GpuEngine, HybridEngine};
use tracing::debug;
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn parse_dimension(value: &str, name: &str) -> Result<i64> {
    let parsed: i64 = value
        .parse()
        .with_context(|| format!("invalid {name} value {value:?} (expected integer)"))?;
    if parsed < 0 {
        let message = format!("{name} must not be negative, got {parsed}");
        return Err(HeatError::configuration(message).into());
    }
    Ok(parsed)
}

/// Builds the run configuration from `Nx Ny Nt` and the optional flags.
pub fn parse_args<I>(args: I) -> Result<SimulationConfig>
where
    I: IntoIterator<Item = String>,
{
    let mut config = SimulationConfig::default();
    let mut positional = 0usize;

    for arg in args {
        if let Some(value) = arg.strip_prefix("--threads=") {
            config.threads = Some(value.parse().context("invalid --threads value")?);
        } else if let Some(value) = arg.strip_prefix("--alpha=") {
            config.alpha = value.parse().context("invalid --alpha value")?;
        } else if let Some(value) = arg.strip_prefix("--safety=") {
            config.safety = value.parse().context("invalid --safety value")?;
        } else if let Some(value) = arg.strip_prefix("--gpu-fraction=") {
            config.gpu_fraction = value.parse().context("invalid --gpu-fraction value")?;
        } else if let Some(value) = arg.strip_prefix("--output-dir=") {
            config.output_dir = PathBuf::from(value);
        } else if arg == "--no-export" {
            config.export = false;
        } else if arg.starts_with("--") {
            bail!("unrecognized argument: {arg}");
        } else {
            match positional {
                0 => config.nx = parse_dimension(&arg, "Nx")? as usize,
                1 => config.ny = parse_dimension(&arg, "Ny")? as usize,
                2 => config.nt = parse_dimension(&arg, "Nt")? as u64,
                _ => bail!("unexpected extra argument: {arg}"),
            }
            positional += 1;
        }
    }

    config.validate()?;
    Ok(config)
}

/// Runs `kind` to completion with the engine that implements it.
pub fn run_backend(kind: BackendKind, config: &SimulationConfig) -> Result<RunResult> {
    let run = SimulationRun::from_config(config, kind)?;
    let result = match kind {
        BackendKind::Serial => TimeStepper::new(SerialEngine::new()).run(&run)?,
        BackendKind::Threaded => {
            TimeStepper::new(ThreadedEngine::new(config.worker_count())?).run(&run)?
        }
        BackendKind::Gpu => TimeStepper::new(GpuEngine::new(GpuContext::new()?)).run(&run)?,
        BackendKind::Hybrid => {
            let engine =
                HybridEngine::new(GpuContext::new()?, config.worker_count(), config.gpu_fraction)?;
            TimeStepper::new(engine).run(&run)?
        }
    };
    Ok(result)
}

/// Entry point shared by the `<method>_heat` binaries.
pub fn main_for(kind: BackendKind) -> Result<()> {
    init_tracing();
    let config = parse_args(env::args().skip(1))?;
    debug!(?config, "parsed arguments");

    let result = run_backend(kind, &config)
        .with_context(|| format!("{} run failed", kind.display_name()))?;
    print!("{}", MetricLines(&result));

    if config.export {
        export_result(&config.output_dir, &result)?;
    }
    Ok(())
}
