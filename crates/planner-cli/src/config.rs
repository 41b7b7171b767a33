//! Command-line configuration for `e-planner`.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use planner_core::{HostCompiler, PipelineOptions, TensorShape, Workspace, dataset};

/// Hardware-aware per-layer performance estimation driver.
#[derive(Parser, Debug)]
#[command(
    name = "e-planner",
    author,
    version,
    about = "Drive code generation, simulation and profiling for each layer of a network"
)]
pub struct Cli {
    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run every layer of a network through the toolchain.
    Run(RunArgs),
    /// Infer and print per-layer shapes without running any tool.
    Inspect(InputArgs),
}

#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Hardware description (JSON).
    #[arg(long = "hw-config", value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    pub hw_config: PathBuf,

    /// Network description (JSON).
    #[arg(short, long, value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    pub network: PathBuf,

    /// Input tensor: imagenet, darknet, coco, or N,C,H,W.
    #[arg(short, long, default_value = "imagenet")]
    pub input: String,

    /// Batch size for named datasets.
    #[arg(long, default_value_t = 1)]
    pub batch: u32,
}

impl InputArgs {
    pub fn input_shape(&self) -> Result<TensorShape, String> {
        parse_input(&self.input, self.batch)
    }
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Directory holding the `compiler` and `profiler` executables.
    #[arg(short, long, default_value = ".")]
    pub toolpath: PathBuf,

    #[arg(short, long, default_value = planner_core::workspace::DEFAULT_OUTPUT_DIR)]
    pub output_dir: String,

    #[arg(long, default_value = planner_core::workspace::DEFAULT_LOG_DIR)]
    pub log_dir: String,

    /// Ask the code generator to pre-schedule loops.
    #[arg(short, long)]
    pub presched: bool,

    /// Pass -v to the profiler.
    #[arg(long)]
    pub profiler_verbose: bool,

    /// Pass -g to the profiler.
    #[arg(long)]
    pub profiler_debug: bool,

    /// Host C++ compiler command, with optional extra arguments.
    #[arg(long, env = "CXX", default_value = planner_core::argv::DEFAULT_CXX)]
    pub cxx: String,

    /// Kill a stage that runs longer than this many seconds.
    #[arg(long, value_name = "SECS")]
    pub stage_timeout: Option<u64>,

    /// Skip layers whose stages fail instead of aborting the run.
    #[arg(short, long)]
    pub keep_going: bool,
}

impl RunArgs {
    pub fn workspace(&self) -> Workspace {
        Workspace::new(self.output_dir.clone(), self.log_dir.clone())
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            presched: self.presched,
            verbose: self.profiler_verbose,
            debug: self.profiler_debug,
            cxx: parse_compiler_command(&self.cxx),
            stage_timeout: self.stage_timeout.map(Duration::from_secs),
        }
    }
}

/// Parses a dataset name or an explicit `N,C,H,W` shape.
pub fn parse_input(input: &str, batch: u32) -> Result<TensorShape, String> {
    if let Some(shape) = dataset::by_name(input, batch) {
        return Ok(shape);
    }

    let dims = input
        .split(',')
        .map(|d| d.trim().parse::<u32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid input shape '{input}': {e}"))?;

    match dims.as_slice() {
        &[n, c, h, w] => Ok(TensorShape::new(n, c, h, w)),
        _ => Err(format!(
            "invalid input shape '{input}': expected a dataset name or N,C,H,W"
        )),
    }
}

/// Splits a compiler command with shell-like rules, falling back to
/// whitespace splitting if the quoting is unbalanced.
pub fn parse_compiler_command(cmd: &str) -> HostCompiler {
    let parts = shlex::split(cmd)
        .filter(|parts| !parts.is_empty())
        .unwrap_or_else(|| cmd.split_whitespace().map(str::to_string).collect());

    match parts.split_first() {
        Some((program, args)) => HostCompiler {
            program: program.clone(),
            args: args.to_vec(),
        },
        None => HostCompiler::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_input_names_and_dims() {
        assert_eq!(parse_input("imagenet", 1).unwrap(), TensorShape::new(1, 3, 224, 224));
        assert_eq!(parse_input("darknet", 4).unwrap(), TensorShape::new(4, 3, 256, 256));
        assert_eq!(parse_input("1, 3, 227, 227", 8).unwrap(), TensorShape::new(1, 3, 227, 227));
        assert!(parse_input("1,3,227", 1).is_err());
        assert!(parse_input("mnist", 1).is_err());
    }

    #[test]
    fn test_parse_compiler_command() {
        let cxx = parse_compiler_command("clang++ -march=native");
        assert_eq!(cxx.program, "clang++");
        assert_eq!(cxx.args, vec!["-march=native"]);

        let quoted = parse_compiler_command(r#""/opt/my gcc/bin/g++" -I "/usr/include/sim lib""#);
        assert_eq!(quoted.program, "/opt/my gcc/bin/g++");
        assert_eq!(quoted.args, vec!["-I", "/usr/include/sim lib"]);

        assert_eq!(parse_compiler_command(""), HostCompiler::default());
    }

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::parse_from([
            "e-planner",
            "-vv",
            "run",
            "--hw-config",
            "hwcfg/simd.json",
            "--network",
            "vgg16.json",
            "--toolpath",
            "build",
            "--presched",
            "--stage-timeout",
            "60",
            "--keep-going",
        ]);
        assert_eq!(cli.verbose, 2);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.toolpath, PathBuf::from("build"));
        assert!(args.keep_going);
        let options = args.pipeline_options();
        assert!(options.presched);
        assert_eq!(options.stage_timeout, Some(Duration::from_secs(60)));
        assert_eq!(args.workspace(), Workspace::default());
    }
}
