//! One validation pass: load the reference, compare every requested method,
//! collect the outcome into an [`ErrorReport`].
//!
//! Only a missing or unreadable reference is fatal. A comparison file that is
//! absent, malformed or shaped differently is logged and listed as skipped.

use std::path::PathBuf;

use chrono::Local;
use heat_core::{HeatError, Result};
use tracing::{info, warn};

use crate::loader::{load_result, method_path};
use crate::metrics::compare;
use crate::report::{ErrorReport, MethodResult, SkippedMethod};
use crate::sink::{ErrorMapSink, NullSink};

pub const DEFAULT_REFERENCE: &str = "serial";
pub const DEFAULT_METHODS: [&str; 3] = ["threaded", "gpu", "hybrid"];

pub struct ValidationHarness<S = NullSink> {
    dir: PathBuf,
    reference: String,
    methods: Vec<String>,
    sink: S,
}

impl ValidationHarness<NullSink> {
    /// Compares the default methods against the serial reference found in `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            reference: DEFAULT_REFERENCE.to_string(),
            methods: DEFAULT_METHODS.iter().map(|m| m.to_string()).collect(),
            sink: NullSink,
        }
    }
}

impl<S: ErrorMapSink> ValidationHarness<S> {
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = reference.into();
        self
    }

    pub fn with_methods<I, M>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<String>,
    {
        self.methods = methods.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_sink<T: ErrorMapSink>(self, sink: T) -> ValidationHarness<T> {
        ValidationHarness {
            dir: self.dir,
            reference: self.reference,
            methods: self.methods,
            sink,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn run(&mut self) -> Result<ErrorReport> {
        let reference_path = method_path(&self.dir, &self.reference);
        let reference = load_result(&reference_path)?;
        let reference_shape = reference.field.shape();
        info!(
            reference = %self.reference,
            nx = reference_shape.0,
            ny = reference_shape.1,
            "loaded reference"
        );

        let mut methods = Vec::new();
        let mut skipped = Vec::new();
        for method in &self.methods {
            let path = method_path(&self.dir, method);
            let outcome = load_result(&path)
                .and_then(|loaded| compare(&reference.field, &loaded.field).map(|c| (loaded, c)));
            let (loaded, comparison) = match outcome {
                Ok(pair) => pair,
                Err(err) => {
                    warn!(method = %method, "skipping comparison: {err}");
                    skipped.push(SkippedMethod {
                        method: method.clone(),
                        reason: skip_reason(&err),
                    });
                    continue;
                }
            };

            let m = &comparison.metrics;
            info!(
                method = %method,
                mse = m.mse,
                rmse = m.rmse,
                max_abs = m.max_abs_error,
                "compared against reference"
            );

            if let Err(err) = self.sink.accept(method, &comparison) {
                warn!(method = %method, "error map sink failed: {err}");
            }
            methods.push(MethodResult {
                method: method.clone(),
                metadata: loaded.metadata,
                comparison,
            });
        }

        info!(
            compared = methods.len(),
            skipped = skipped.len(),
            "validation pass finished"
        );
        Ok(ErrorReport {
            generated_at: Local::now(),
            reference: self.reference.clone(),
            reference_path,
            reference_shape,
            methods,
            skipped,
        })
    }
}

fn skip_reason(err: &HeatError) -> String {
    match err {
        HeatError::ShapeMismatch { expected, found } => format!(
            "shape mismatch: {}x{} vs reference {}x{}",
            found.0, found.1, expected.0, expected.1
        ),
        HeatError::Io { source, .. } => format!("unreadable result file: {source}"),
        other => other.to_string(),
    }
}
