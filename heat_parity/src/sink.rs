//! Hand-off point for the elementwise error maps.
//!
//! Rendering is left to whoever consumes the maps; the harness only pushes
//! each successful comparison through an [`ErrorMapSink`].

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use heat_core::export::DELIMITER;
use heat_core::{HeatError, Result};
use tracing::info;

use crate::metrics::{Comparison, ErrorMap};

pub trait ErrorMapSink {
    fn accept(&mut self, method: &str, comparison: &Comparison) -> Result<()>;
}

/// Discards every map.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ErrorMapSink for NullSink {
    fn accept(&mut self, _method: &str, _comparison: &Comparison) -> Result<()> {
        Ok(())
    }
}

/// Writes the absolute error map of each method to `<dir>/<method>_abs_error.csv`.
#[derive(Debug, Clone)]
pub struct CsvErrorMapSink {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl CsvErrorMapSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            written: Vec::new(),
        }
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

fn write_map<W: Write>(mut out: W, map: &ErrorMap) -> std::io::Result<()> {
    let mut line = String::new();
    for row in map.rows() {
        line.clear();
        for (j, value) in row.iter().enumerate() {
            if j > 0 {
                line.push(DELIMITER);
            }
            line.push_str(&format!("{value:e}"));
        }
        writeln!(out, "{line}")?;
    }
    out.flush()
}

impl ErrorMapSink for CsvErrorMapSink {
    fn accept(&mut self, method: &str, comparison: &Comparison) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| HeatError::io(&self.dir, e))?;
        let path = self.dir.join(format!("{method}_abs_error.csv"));
        let file = File::create(&path).map_err(|e| HeatError::io(&path, e))?;
        write_map(BufWriter::new(file), &comparison.abs_error)
            .map_err(|e| HeatError::io(&path, e))?;
        info!(path = %path.display(), "wrote error map");
        self.written.push(path);
        Ok(())
    }
}
