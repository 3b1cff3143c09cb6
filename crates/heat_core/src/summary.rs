//! The `Key: value` lines each backend executable prints on standard output.

use std::fmt;

use crate::run::RunResult;

/// Stdout contract consumed by the front-end, one `Key: value` per line in a fixed order.
pub struct MetricLines<'a>(pub &'a RunResult);

impl fmt::Display for MetricLines<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let meta = &self.0.metadata;
        writeln!(f, "Implementation: {}", meta.backend.display_name())?;
        writeln!(f, "Threads: {}", meta.workers)?;
        writeln!(f, "GridSize: {}x{}", meta.nx, meta.ny)?;
        writeln!(f, "TimeSteps: {}", meta.steps)?;
        writeln!(f, "Time: {:.6}", meta.elapsed_secs)?;
        writeln!(f, "Throughput: {:.2}", meta.throughput_mlups)?;
        writeln!(f, "CenterValue: {:.6}", self.0.field.center_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Field;
    use crate::run::{BackendKind, RunMetadata};

    #[test]
    fn prints_fixed_keys_in_order() {
        let result = RunResult {
            field: Field::new(3, 3, vec![0.0, 0.0, 0.0, 0.0, 0.4321987, 0.0, 0.0, 0.0, 0.0])
                .unwrap(),
            metadata: RunMetadata {
                backend: BackendKind::Gpu,
                nx: 3,
                ny: 3,
                steps: 10,
                final_time: 1.0,
                workers: 256,
                elapsed_secs: 0.0123456789,
                throughput_mlups: 812.346,
            },
        };
        let text = MetricLines(&result).to_string();
        assert_eq!(
            text,
            "Implementation: GPU\nThreads: 256\nGridSize: 3x3\nTimeSteps: 10\n\
             Time: 0.012346\nThroughput: 812.35\nCenterValue: 0.432199\n"
        );
    }
}
