//! Drives `Nt` double-buffered steps of a stencil engine and times them.

use std::time::Instant;

use tracing::{debug, info};

use crate::engine::StencilEngine;
use crate::error::{HeatError, Result};
use crate::grid::GridState;
use crate::run::{RunResult, SimulationRun};
use crate::Scalar;

pub struct TimeStepper<E: StencilEngine> {
    engine: E,
    divergence_limit: Option<Scalar>,
    check_interval: u64,
}

impl<E: StencilEngine> TimeStepper<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            divergence_limit: None,
            check_interval: 1,
        }
    }

    /// Fails the run with `NumericInstability` as soon as `|u|` exceeds `limit`
    /// or the field contains non-finite values.
    ///
    /// The check reads the field back inside the timed loop, so it slows the
    /// run down; see [`TimeStepper::check_every`].
    pub fn with_divergence_limit(mut self, limit: Scalar) -> Self {
        self.divergence_limit = Some(limit);
        self
    }

    /// Checks the divergence limit every `steps` steps instead of every step.
    /// The last step is always checked.
    pub fn check_every(mut self, steps: u64) -> Self {
        self.check_interval = steps.max(1);
        self
    }

    fn check_divergence(&mut self, arena: &E::Arena, step: u64, limit: Scalar) -> Result<()> {
        self.engine.synchronize()?;
        let peak = self.engine.read_back(arena)?.max_abs();
        if !peak.is_finite() || peak > limit {
            return Err(HeatError::NumericInstability { step, value: peak });
        }
        Ok(())
    }

    /// Runs the whole simulation and returns the final field with timing metadata.
    ///
    /// Only the step loop is timed. Step `n + 1` is issued after step `n` returns,
    /// and the engine is synchronized before the clock stops and before read-back.
    pub fn run(&mut self, run: &SimulationRun) -> Result<RunResult> {
        let geometry = *run.geometry();
        if geometry.nx < 3 || geometry.ny < 3 {
            return Err(HeatError::configuration(format!(
                "grid {}x{} has no interior points",
                geometry.nx, geometry.ny
            )));
        }
        info!(
            backend = %run.backend(),
            nx = geometry.nx,
            ny = geometry.ny,
            steps = run.steps(),
            dt = run.params().dt,
            stability = run.params().stability_number(),
            "starting run"
        );

        let initial = run.initial_field();
        let arenas = self.engine.allocate(&initial, run.params())?;
        let mut state = GridState::from_arenas(geometry, arenas);
        self.engine.synchronize()?;

        let start = Instant::now();
        for step in 1..=run.steps() {
            let (current, next) = state.split();
            self.engine.step(current, next)?;
            state.flip();

            if let Some(limit) = self.divergence_limit {
                if step % self.check_interval == 0 || step == run.steps() {
                    self.check_divergence(state.current(), step, limit)?;
                }
            }
        }
        self.engine.synchronize()?;
        let elapsed = start.elapsed();

        let field = self.engine.read_back(state.current())?;
        debug!(parity = state.parity(), "read back final arena");

        let result = RunResult::new(run, field, self.engine.workers(), elapsed);
        info!(
            elapsed_secs = result.metadata.elapsed_secs,
            mlups = result.metadata.throughput_mlups,
            "run finished"
        );
        Ok(result)
    }
}
