//! Reads `<method>_heat_distribution.csv` files back into fields.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use heat_core::export::{
    result_file_name, COMMENT_PREFIX, DELIMITER, KEY_FINAL_TIME, KEY_GRID_SIZE, KEY_THREADS,
    KEY_TIME_STEPS,
};
use heat_core::{Field, HeatError, Result};
use serde::Serialize;
use tracing::debug;

/// Header block of a result file. Keys absent from the file stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultMetadata {
    pub grid_size: Option<(usize, usize)>,
    pub time_steps: Option<u64>,
    pub final_time: Option<f64>,
    pub threads: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedResult {
    pub path: PathBuf,
    pub metadata: ResultMetadata,
    pub field: Field,
}

pub fn method_path(dir: &Path, method: &str) -> PathBuf {
    dir.join(result_file_name(method))
}

pub fn load_result(path: &Path) -> Result<LoadedResult> {
    let file = File::open(path).map_err(|e| HeatError::io(path, e))?;
    let loaded = parse_result(BufReader::new(file), path)?;
    let (nx, ny) = loaded.field.shape();
    debug!(path = %path.display(), nx, ny, "loaded result");
    Ok(loaded)
}

/// Parses the result format from `reader`; `path` is only used in errors.
pub fn parse_result<R: BufRead>(reader: R, path: &Path) -> Result<LoadedResult> {
    let parse_err = |line: usize, message: String| HeatError::Parse {
        path: path.to_path_buf(),
        line,
        message,
    };

    let mut metadata = ResultMetadata::default();
    let mut columns: Option<usize> = None;
    let mut values = Vec::new();
    let mut rows = 0usize;

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.map_err(|e| HeatError::io(path, e))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(comment) = line.strip_prefix(COMMENT_PREFIX) {
            if let Some((key, value)) = comment.split_once(':') {
                parse_metadata(&mut metadata, key.trim(), value.trim())
                    .map_err(|message| parse_err(line_no, message))?;
            }
            continue;
        }

        let Some(width) = columns else {
            columns = Some(parse_labels(line).map_err(|message| parse_err(line_no, message))?);
            continue;
        };

        let before = values.len();
        for cell in line.split(DELIMITER) {
            let cell = cell.trim();
            let value: f64 = cell
                .parse()
                .map_err(|_| parse_err(line_no, format!("invalid number {cell:?}")))?;
            values.push(value);
        }
        let found = values.len() - before;
        if found != width {
            return Err(parse_err(
                line_no,
                format!("row has {found} columns, header has {width}"),
            ));
        }
        rows += 1;
    }

    let Some(ny) = columns else {
        return Err(parse_err(0, "missing column header".into()));
    };
    if rows == 0 {
        return Err(parse_err(0, "no data rows".into()));
    }
    if let Some(declared) = metadata.grid_size {
        if declared != (rows, ny) {
            return Err(parse_err(
                0,
                format!(
                    "header declares {}x{} but data is {rows}x{ny}",
                    declared.0, declared.1
                ),
            ));
        }
    }

    let field = Field::new(rows, ny, values)?;
    Ok(LoadedResult {
        path: path.to_path_buf(),
        metadata,
        field,
    })
}

/// Validates the column-label row `0,1,...,ny-1` and returns `ny`.
fn parse_labels(line: &str) -> std::result::Result<usize, String> {
    let mut count = 0;
    for (expected, label) in line.split(DELIMITER).enumerate() {
        let label = label.trim();
        if label.parse::<usize>().ok() != Some(expected) {
            return Err(format!(
                "expected column label {expected}, found {label:?}; missing label row?"
            ));
        }
        count += 1;
    }
    Ok(count)
}

fn parse_metadata(meta: &mut ResultMetadata, key: &str, value: &str) -> std::result::Result<(), String> {
    let bad = |what: &str| format!("invalid {what} value {value:?}");
    match key {
        KEY_GRID_SIZE => {
            let (nx, ny) = value.split_once('x').ok_or_else(|| bad(key))?;
            let nx = nx.trim().parse().map_err(|_| bad(key))?;
            let ny = ny.trim().parse().map_err(|_| bad(key))?;
            meta.grid_size = Some((nx, ny));
        }
        KEY_TIME_STEPS => meta.time_steps = Some(value.parse().map_err(|_| bad(key))?),
        KEY_FINAL_TIME => meta.final_time = Some(value.parse().map_err(|_| bad(key))?),
        KEY_THREADS => meta.threads = Some(value.parse().map_err(|_| bad(key))?),
        _ => {}
    }
    Ok(())
}
