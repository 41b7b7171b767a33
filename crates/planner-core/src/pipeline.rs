//! Four-stage execution pipeline.
//!
//! Stages run strictly in order, one process at a time:
//! code generation, host compile, simulation, profiling. The first stage
//! whose process exits with the failure sentinel ends the run for that
//! layer with a stage-specific error; later stages never start.

use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::argv::{ArgvBuilder, HostCompiler, Invocation};
use crate::error::{PlannerError, Result};
use crate::geometry::LayerGeometry;
use crate::layer::{LayerKind, TensorShape};
use crate::runner::{CommandRunner, ExitOutcome, SystemRunner};
use crate::workspace::{LayerPaths, Workspace};

/// A pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Codegen,
    HostCompile,
    Execute,
    Profile,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Codegen, Stage::HostCompile, Stage::Execute, Stage::Profile];

    /// The stage that follows this one; `None` after profiling.
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Codegen => Some(Stage::HostCompile),
            Stage::HostCompile => Some(Stage::Execute),
            Stage::Execute => Some(Stage::Profile),
            Stage::Profile => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Codegen => "code generation",
            Stage::HostCompile => "host compile",
            Stage::Execute => "simulation",
            Stage::Profile => "profiling",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Knobs for a pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Ask the code generator to pre-schedule (`-p`).
    pub presched: bool,
    /// Profiler verbose output (`-v`).
    pub verbose: bool,
    /// Profiler debug logging (`-g`).
    pub debug: bool,
    pub cxx: HostCompiler,
    /// Kill a stage process that runs longer than this. `None` waits forever.
    pub stage_timeout: Option<Duration>,
}

/// Outcome of driving one layer through the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerReport {
    pub layer: String,
    pub kind: LayerKind,
    pub input: TensorShape,
    /// Shape forwarded to the next layer.
    pub output: TensorShape,
    /// Stages that ran to a non-failure exit, in order.
    pub stages_run: Vec<Stage>,
    pub elapsed: Duration,
}

impl LayerReport {
    /// False for layers that only ran shape inference.
    pub fn simulated(&self) -> bool {
        !self.stages_run.is_empty()
    }
}

/// Drives layers through the external toolchain.
pub struct Pipeline<R: CommandRunner = SystemRunner> {
    toolpath: PathBuf,
    workspace: Workspace,
    options: PipelineOptions,
    runner: R,
}

impl Pipeline<SystemRunner> {
    /// Pipeline that launches real processes. `toolpath` is the directory
    /// holding the `compiler` and `profiler` executables.
    pub fn new(toolpath: impl Into<PathBuf>, workspace: Workspace, options: PipelineOptions) -> Self {
        Self::with_runner(toolpath, workspace, options, SystemRunner)
    }
}

impl<R: CommandRunner> Pipeline<R> {
    pub fn with_runner(
        toolpath: impl Into<PathBuf>,
        workspace: Workspace,
        options: PipelineOptions,
        runner: R,
    ) -> Self {
        Self {
            toolpath: toolpath.into(),
            workspace,
            options,
            runner,
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Runs every stage for `geometry` and returns the forwarded shape.
    ///
    /// Layers that are not hardware-modeled skip all four stages.
    ///
    /// # Errors
    ///
    /// - The stage-specific failure (`CodeGenerationFailed`,
    ///   `CodeCompileFailed`, `RunCodeFailed`, `ReportFailed`) when a stage
    ///   exits with the failure sentinel.
    /// - `Launch` if a stage process cannot be started.
    /// - `StageTimedOut` if a stage exceeds the configured timeout.
    /// - `Io` if the workspace directories cannot be created.
    pub fn run(&mut self, geometry: &LayerGeometry) -> Result<LayerReport> {
        let started = Instant::now();
        let layer = geometry.layer_name.as_str();
        let mut stages_run = Vec::new();

        tracing::info!(layer, kind = %geometry.kind, input = %geometry.input_shape(), "layer start");

        if geometry.kind.is_hardware_modeled() {
            self.workspace.prepare()?;
            let paths = self.workspace.layer_paths(layer);

            let mut stage = Some(Stage::Codegen);
            while let Some(current) = stage {
                self.run_stage(current, geometry, &paths)?;
                stages_run.push(current);
                stage = current.next();
            }
        } else {
            tracing::warn!(layer, "{} is not supported yet. Just pass.", geometry.kind);
        }

        let output = geometry.output_shape();
        tracing::info!(
            layer,
            "next layer width/height is {}/{}",
            output.width,
            output.height
        );

        Ok(LayerReport {
            layer: layer.to_string(),
            kind: geometry.kind,
            input: geometry.input_shape(),
            output,
            stages_run,
            elapsed: started.elapsed(),
        })
    }

    fn invocation(&self, stage: Stage, builder: &ArgvBuilder<'_>) -> Invocation {
        match stage {
            Stage::Codegen => builder.codegen_invocation(&self.toolpath, self.options.presched),
            Stage::HostCompile => builder.host_compile_invocation(&self.options.cxx),
            Stage::Execute => builder.execute_invocation(),
            Stage::Profile => {
                builder.profiler_invocation(&self.toolpath, self.options.verbose, self.options.debug)
            }
        }
    }

    fn run_stage(&mut self, stage: Stage, geometry: &LayerGeometry, paths: &LayerPaths) -> Result<()> {
        let layer = geometry.layer_name.as_str();
        let builder = ArgvBuilder::new(geometry, paths);
        let invocation = self.invocation(stage, &builder);

        tracing::info!(layer, %stage, "stage start");
        tracing::debug!(layer, %stage, command = %invocation);

        let outcome = self
            .runner
            .run(&invocation, self.options.stage_timeout)
            .map_err(|source| PlannerError::Launch {
                stage,
                layer: layer.to_string(),
                source,
            })?;

        match outcome {
            ExitOutcome::TimedOut => {
                return Err(PlannerError::StageTimedOut {
                    stage,
                    layer: layer.to_string(),
                    timeout: self.options.stage_timeout.unwrap_or_default(),
                });
            }
            outcome if outcome.is_failure() => {
                tracing::error!(layer, %stage, "stage failed");
                return Err(PlannerError::stage_failed(stage, layer));
            }
            ExitOutcome::Terminated => {
                tracing::warn!(layer, %stage, "process ended without an exit code");
            }
            ExitOutcome::Exited(code) => {
                tracing::info!(layer, %stage, code, "stage finished");
            }
        }

        Ok(())
    }
}
