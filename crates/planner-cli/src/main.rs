mod colors;
mod config;
mod display;
mod driver;

use std::process::ExitCode;

use anyhow::{Context, anyhow};
use clap::Parser;
use colored::Colorize;
use planner_core::{HardwareSpec, LayerGeometry, Network, Pipeline};
use tracing_subscriber::EnvFilter;

use colors::{Paint, Tone};
use config::{Cli, Commands, InputArgs, RunArgs};
use display::DisplayManager;
use driver::{FailurePolicy, NetworkDriver};

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_inputs(args: &InputArgs) -> anyhow::Result<(HardwareSpec, Network)> {
    let hw = HardwareSpec::load(&args.hw_config)
        .with_context(|| format!("failed to load hardware config '{}'", args.hw_config.display()))?;
    let network = Network::load(&args.network)
        .with_context(|| format!("failed to load network '{}'", args.network.display()))?;
    Ok((hw, network))
}

fn inspect(args: InputArgs) -> anyhow::Result<()> {
    let (hw, network) = load_inputs(&args)?;
    let input = args.input_shape().map_err(|e| anyhow!(e))?;
    let display = DisplayManager::new();

    display.show_header(&network.name, input);

    let mut data = input;
    let mut geometries = Vec::with_capacity(network.len());
    for layer in &network.layers {
        let geometry = LayerGeometry::derive(&layer.name, data, &layer.module, &hw)?;
        data = geometry.output_shape();
        geometries.push(geometry);
    }

    display.show_geometries(&geometries);
    println!("  {} {}", "output".tone(Tone::Label), data.to_string().as_str().tone(Tone::Shape));
    Ok(())
}

fn run(args: RunArgs) -> anyhow::Result<()> {
    let (hw, network) = load_inputs(&args.input)?;
    let input = args.input.input_shape().map_err(|e| anyhow!(e))?;
    let display = DisplayManager::new();

    let policy = if args.keep_going {
        FailurePolicy::Skip
    } else {
        FailurePolicy::Abort
    };
    let pipeline = Pipeline::new(args.toolpath.clone(), args.workspace(), args.pipeline_options());
    let mut driver = NetworkDriver::new(pipeline, &hw, policy);

    display.show_header(&network.name, input);

    let progress_bar = display.create_progress_bar(network.len() as u64);
    let result = driver.run(&network, input, &progress_bar);
    progress_bar.finish_and_clear();

    let summary = result?;
    display.show_summary(&summary);
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Run(args) => run(args),
        Commands::Inspect(args) => inspect(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e:#}", "Error:".tone(Tone::Failed).bold());
            ExitCode::FAILURE
        }
    }
}
