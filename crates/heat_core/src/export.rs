//! The result-file format shared by every backend and the validation harness.
//!
//! ```text
//! # Grid Size: 50x50
//! # Time Steps: 100
//! # Final Time: 2.5510204081632655e-1
//! # Threads: 8
//! 0,1,2,...,49
//! 1e0,9.8e-1,...
//! ```
//!
//! Comment lines carry the metadata, the first plain line labels the columns
//! and every following line is one grid row (`i` fixed, `j` increasing).
//! Values use the shortest scientific notation that parses back to the same
//! `f64`, so a reload is exact.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{HeatError, Result};
use crate::run::{BackendKind, RunResult};

pub const COMMENT_PREFIX: char = '#';
pub const DELIMITER: char = ',';
pub const KEY_GRID_SIZE: &str = "Grid Size";
pub const KEY_TIME_STEPS: &str = "Time Steps";
pub const KEY_FINAL_TIME: &str = "Final Time";
pub const KEY_THREADS: &str = "Threads";
pub const RESULT_FILE_SUFFIX: &str = "_heat_distribution.csv";

/// `<method>_heat_distribution.csv`.
pub fn result_file_name(method: &str) -> String {
    format!("{method}{RESULT_FILE_SUFFIX}")
}

pub fn result_path(dir: &Path, backend: BackendKind) -> PathBuf {
    dir.join(result_file_name(backend.method()))
}

/// Streams `result` in the result-file format.
pub fn write_result<W: Write>(mut out: W, result: &RunResult) -> io::Result<()> {
    let meta = &result.metadata;
    let (nx, ny) = result.field.shape();
    writeln!(out, "{COMMENT_PREFIX} {KEY_GRID_SIZE}: {nx}x{ny}")?;
    writeln!(out, "{COMMENT_PREFIX} {KEY_TIME_STEPS}: {}", meta.steps)?;
    writeln!(out, "{COMMENT_PREFIX} {KEY_FINAL_TIME}: {:e}", meta.final_time)?;
    writeln!(out, "{COMMENT_PREFIX} {KEY_THREADS}: {}", meta.workers)?;

    let mut line = String::with_capacity(ny * 24);
    for j in 0..ny {
        if j > 0 {
            line.push(DELIMITER);
        }
        line.push_str(&j.to_string());
    }
    writeln!(out, "{line}")?;

    for i in 0..nx {
        line.clear();
        for (j, value) in result.field.row(i).iter().enumerate() {
            if j > 0 {
                line.push(DELIMITER);
            }
            line.push_str(&format!("{value:e}"));
        }
        writeln!(out, "{line}")?;
    }
    out.flush()
}

/// Writes `result` to `<dir>/<method>_heat_distribution.csv` and returns the path.
pub fn export_result(dir: &Path, result: &RunResult) -> Result<PathBuf> {
    fs::create_dir_all(dir).map_err(|e| HeatError::io(dir, e))?;
    let path = result_path(dir, result.metadata.backend);
    let file = File::create(&path).map_err(|e| HeatError::io(&path, e))?;
    write_result(BufWriter::new(file), result).map_err(|e| HeatError::io(&path, e))?;
    info!(path = %path.display(), "exported result");
    Ok(path)
}
