//! Network traversal: runs each layer in order and forwards its output
//! shape to the next one.

use std::time::{Duration, Instant};

use indicatif::ProgressBar;
use planner_core::{
    CommandRunner, HardwareSpec, LayerGeometry, LayerReport, Network, Pipeline, PlannerError,
    TensorShape,
};

/// What to do when a layer's stage fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop the whole run at the first failure.
    #[default]
    Abort,
    /// Log the failure, forward the inferred shape and continue.
    /// Validation errors still abort since no shape can be forwarded.
    Skip,
}

/// A layer whose stage failed under [`FailurePolicy::Skip`].
#[derive(Debug)]
pub struct SkippedLayer {
    pub layer: String,
    pub error: PlannerError,
}

/// Result of traversing a whole network.
#[derive(Debug)]
pub struct RunSummary {
    pub network: String,
    pub reports: Vec<LayerReport>,
    pub skipped: Vec<SkippedLayer>,
    pub output: TensorShape,
    /// Shared profiler report for the run.
    pub report_file: String,
    pub elapsed: Duration,
}

/// Walks a network layer by layer through a pipeline.
pub struct NetworkDriver<'a, R: CommandRunner> {
    pipeline: Pipeline<R>,
    hw: &'a HardwareSpec,
    policy: FailurePolicy,
}

impl<'a, R: CommandRunner> NetworkDriver<'a, R> {
    pub fn new(pipeline: Pipeline<R>, hw: &'a HardwareSpec, policy: FailurePolicy) -> Self {
        Self {
            pipeline,
            hw,
            policy,
        }
    }

    #[cfg(test)]
    pub fn pipeline(&self) -> &Pipeline<R> {
        &self.pipeline
    }

    /// Runs every layer of `network` starting from `input`.
    ///
    /// # Errors
    ///
    /// Returns the first validation error, or the first stage failure when
    /// the policy is [`FailurePolicy::Abort`].
    pub fn run(
        &mut self,
        network: &Network,
        input: TensorShape,
        progress_bar: &ProgressBar,
    ) -> Result<RunSummary, PlannerError> {
        let started = Instant::now();
        let mut data = input;
        let mut reports = Vec::with_capacity(network.len());
        let mut skipped = Vec::new();

        for layer in &network.layers {
            progress_bar.set_message(layer.name.clone());
            let geometry = LayerGeometry::derive(&layer.name, data, &layer.module, self.hw)?;

            match self.pipeline.run(&geometry) {
                Ok(report) => {
                    data = report.output;
                    reports.push(report);
                }
                Err(error) if error.is_stage_failure() && self.policy == FailurePolicy::Skip => {
                    tracing::warn!(layer = %layer.name, "skipping layer: {error}");
                    data = geometry.output_shape();
                    skipped.push(SkippedLayer {
                        layer: layer.name.clone(),
                        error,
                    });
                }
                Err(error) => return Err(error),
            }
            progress_bar.inc(1);
        }

        let elapsed = started.elapsed();
        tracing::info!(network = %network.name, "elapsed time: {:.1}s", elapsed.as_secs_f64());

        Ok(RunSummary {
            network: network.name.clone(),
            reports,
            skipped,
            output: data,
            report_file: self.pipeline.workspace().report_file(),
            elapsed,
        })
    }
}
