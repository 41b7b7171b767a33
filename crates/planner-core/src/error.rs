//! Error types for the planner core.
//!
//! Errors fall into two groups. Validation errors (`Config`, `Value`,
//! `UnsupportedLayer`) are raised before any external process is spawned.
//! Stage failures are raised after an external tool reports the failure
//! sentinel, and name the stage that failed.

use std::io;
use std::time::Duration;

use crate::pipeline::Stage;

/// Error type for all planner operations.
#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    /// Hardware or network description could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),

    /// The value of the input data or the layer module is wrong.
    #[error("invalid value: {0}")]
    Value(String),

    /// The layer kind has no shape inference rule.
    #[error("layer type: {0} is not supported")]
    UnsupportedLayer(String),

    #[error("simulation code generation failed for layer '{layer}'")]
    CodeGenerationFailed { layer: String },

    #[error("simulation code compile failed for layer '{layer}'")]
    CodeCompileFailed { layer: String },

    #[error("running simulation code failed for layer '{layer}'")]
    RunCodeFailed { layer: String },

    #[error("profiling report failed for layer '{layer}'")]
    ReportFailed { layer: String },

    /// The stage's process could not be started at all.
    #[error("failed to launch {stage} for layer '{layer}': {source}")]
    Launch {
        stage: Stage,
        layer: String,
        #[source]
        source: io::Error,
    },

    /// The stage's process exceeded the configured timeout and was killed.
    #[error("{stage} for layer '{layer}' timed out after {}s", timeout.as_secs_f64())]
    StageTimedOut {
        stage: Stage,
        layer: String,
        timeout: Duration,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl PlannerError {
    /// Builds the failure raised when `stage` returns the failure sentinel.
    pub fn stage_failed(stage: Stage, layer: &str) -> Self {
        let layer = layer.to_string();
        match stage {
            Stage::Codegen => PlannerError::CodeGenerationFailed { layer },
            Stage::HostCompile => PlannerError::CodeCompileFailed { layer },
            Stage::Execute => PlannerError::RunCodeFailed { layer },
            Stage::Profile => PlannerError::ReportFailed { layer },
        }
    }

    /// The pipeline stage this error originated from, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PlannerError::CodeGenerationFailed { .. } => Some(Stage::Codegen),
            PlannerError::CodeCompileFailed { .. } => Some(Stage::HostCompile),
            PlannerError::RunCodeFailed { .. } => Some(Stage::Execute),
            PlannerError::ReportFailed { .. } => Some(Stage::Profile),
            PlannerError::Launch { stage, .. } | PlannerError::StageTimedOut { stage, .. } => {
                Some(*stage)
            }
            _ => None,
        }
    }

    /// True when the error came from running an external tool rather than
    /// from validating inputs.
    pub fn is_stage_failure(&self) -> bool {
        self.stage().is_some()
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PlannerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_failed_maps_each_stage() {
        let cases = [
            (Stage::Codegen, "simulation code generation failed"),
            (Stage::HostCompile, "simulation code compile failed"),
            (Stage::Execute, "running simulation code failed"),
            (Stage::Profile, "profiling report failed"),
        ];
        for (stage, prefix) in cases {
            let err = PlannerError::stage_failed(stage, "conv_1");
            assert_eq!(err.stage(), Some(stage));
            assert!(err.to_string().starts_with(prefix), "{err}");
            assert!(err.to_string().contains("'conv_1'"));
        }
    }

    #[test]
    fn test_validation_errors_have_no_stage() {
        let err = PlannerError::UnsupportedLayer("GroupNorm".to_string());
        assert!(!err.is_stage_failure());
        assert_eq!(err.to_string(), "layer type: GroupNorm is not supported");
    }
}
