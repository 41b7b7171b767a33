//! Hardware-aware per-layer performance estimation.
//!
//! For each layer of a network, [`LayerGeometry`] infers the layer's
//! dimensions from its input shape and module, and [`Pipeline`] drives the
//! external code generator, host compiler, simulation binary and profiler
//! for it. The output shape is then forwarded to the next layer.

pub mod argv;
pub mod dataset;
pub mod error;
pub mod geometry;
pub mod hardware;
pub mod layer;
pub mod network;
pub mod pipeline;
pub mod runner;
pub mod workspace;

pub use argv::{ArgvBuilder, HostCompiler, Invocation};
pub use error::{PlannerError, Result};
pub use geometry::LayerGeometry;
pub use hardware::{HardwareSpec, HardwareSpecBuilder, PeDim, PeRole, PeStructure};
pub use layer::{LayerKind, LayerModule, TensorShape};
pub use network::{Network, NetworkLayer};
pub use pipeline::{LayerReport, Pipeline, PipelineOptions, Stage};
pub use runner::{CommandRunner, EXIT_FAILURE, ExitOutcome, SystemRunner};
pub use workspace::{LayerPaths, Workspace};
