//! Headless demonstration host: not part of the kernel, just a thin CLI
//! that loads a model document, drives a [`Controller`], and prints a
//! marking trace. `KERNEL_*` environment variables override
//! [`SimulationConfig`] the same way a host embedding the kernel would.

use clap::Parser;
use hybrid_petri_kernel::{ConfigLoader, Controller, ModelDocument, RunLimits};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "petri-sim", about = "Run a hybrid Petri-net model to a fixed point or step budget")]
struct Args {
    /// Path to a model document (JSON, §6 persistence schema).
    model: PathBuf,

    /// Optional TOML configuration file. Falls back to `KERNEL_*` env vars.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Step size, overriding the config default.
    #[arg(long)]
    dt: Option<f64>,

    /// Stop after this many steps, overriding the config default.
    #[arg(long)]
    max_steps: Option<u64>,

    /// Print the marking after every step instead of only the final one.
    #[arg(long)]
    trace: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load_from_env(),
    };
    let mut config = match config {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to load configuration: {err}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(max_steps) = args.max_steps {
        config.max_steps = Some(max_steps);
    }
    let dt = args.dt.unwrap_or(config.default_dt);

    let document = match ModelDocument::load_from_file(&args.model) {
        Ok(document) => document,
        Err(err) => {
            eprintln!("failed to load model {}: {err}", args.model.display());
            return ExitCode::FAILURE;
        }
    };
    let net = match document.into_model() {
        Ok(net) => net,
        Err(err) => {
            eprintln!("failed to build net: {err}");
            return ExitCode::FAILURE;
        }
    };

    let mut controller = Controller::new(net, &config);
    if args.trace {
        controller.register_step_listener(Box::new(|time, marking| {
            let mut entries: Vec<_> = marking.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let rendered: Vec<String> = entries.iter().map(|(id, tokens)| format!("{id}={tokens}")).collect();
            println!("t={time:.4} {}", rendered.join(" "));
        }));
    }

    controller.run(
        dt,
        RunLimits {
            max_steps: config.max_steps,
            duration: None,
        },
    );

    if let Some(reason) = controller.last_error() {
        eprintln!("last step diagnostic: {reason}");
    }

    println!("final t={:.4}", controller.time());
    let mut entries: Vec<_> = controller.marking().into_iter().collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    for (id, tokens) in entries {
        println!("{id}={tokens}");
    }

    ExitCode::SUCCESS
}
