//! Cross-backend validation: load result files, compute error metrics against
//! a reference run and write the text report.

pub mod harness;
pub mod loader;
pub mod metrics;
pub mod report;
pub mod sink;

pub use harness::ValidationHarness;
pub use loader::{load_result, LoadedResult, ResultMetadata};
pub use metrics::{compare, Comparison, ErrorMap, ErrorMetrics};
pub use report::{metrics_json, render_report, write_metrics_json, write_report, ErrorReport};
pub use sink::{CsvErrorMapSink, ErrorMapSink, NullSink};
