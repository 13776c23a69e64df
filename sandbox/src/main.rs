//! contract-run: load a contract module, bind a transfer reason, and time
//! repeated calls of its entry point.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use bridge_hostapi::{ReasonPayload, TransferActivation};
use bridge_sandbox::{Driver, InstancePolicy, SandboxConfig};

/// Run a contract module through the env import bridge.
#[derive(Parser)]
#[command(name = "contract-run")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the module (.wasm or .wat)
    #[arg(default_value = "transfer_back.wasm")]
    module: PathBuf,

    /// Export to call (default: contract_main, or the config file's value)
    #[arg(short, long)]
    entry: Option<String>,

    /// Number of timed invocations
    #[arg(short = 'n', long, default_value_t = 1000)]
    iterations: u64,

    /// Re-instantiate before every invocation so memory never carries over
    #[arg(long)]
    fresh_instance: bool,

    /// Fuel budget per invocation
    #[arg(long)]
    fuel: Option<u64>,

    /// Linear memory cap in 64 KiB pages
    #[arg(long)]
    max_memory_pages: Option<u32>,

    /// Transfer amount placed in the reason
    #[arg(long, default_value_t = 100_000)]
    amount: u64,

    /// Sender bytes, comma separated
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true, default_value = "0,1,2,3")]
    sender: Vec<i8>,

    /// JSON config file; flags above override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the module's exports and exit
    #[arg(long)]
    list_exports: bool,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn setup_logging(verbose: u8) -> Result<()> {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    // RUST_LOG wins over -v
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_target(false).with_writer(std::io::stderr))
        .try_init()
        .context("Failed to initialize tracing subscriber")
}

fn build_config(cli: &Cli) -> Result<SandboxConfig> {
    let mut config = match &cli.config {
        Some(path) => SandboxConfig::from_file(path)?,
        None => SandboxConfig::default(),
    };
    if let Some(entry) = &cli.entry {
        config.entry_point = entry.clone();
    }
    if cli.fresh_instance {
        config.instance_policy = InstancePolicy::Fresh;
    }
    if let Some(fuel) = cli.fuel {
        config.fuel_limit = fuel;
    }
    if let Some(pages) = cli.max_memory_pages {
        config.max_memory_pages = pages;
    }
    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    let config = build_config(&cli)?;
    let entry = config.entry_point.clone();
    let mut driver = Driver::wasmtime(config).context("Failed to create engine")?;

    driver
        .load_file(&cli.module)
        .with_context(|| format!("Failed to load {}", cli.module.display()))?;

    if cli.list_exports {
        for export in driver.exports() {
            println!("{}: {}", export.name, export.ty);
        }
        return Ok(());
    }

    driver.link().context("Failed to link imports")?;

    let sender = (!cli.sender.is_empty()).then(|| cli.sender.clone());
    let payload = ReasonPayload::transfer(
        sender.clone(),
        TransferActivation {
            sender,
            amount: cli.amount,
        },
    );
    driver
        .instantiate(&payload)
        .context("Failed to instantiate module")?;

    let run = driver.run_repeated_with(&entry, cli.iterations, |log| {
        for record in log.records() {
            println!("{}", record);
        }
    });
    let summary = match run {
        Ok(summary) => summary,
        Err(err) => {
            if let Some(log) = driver.current_log() {
                for record in log.records() {
                    println!("{}", record);
                }
            }
            return Err(err).with_context(|| format!("Failed to run '{}'", entry));
        }
    };

    println!("duration = {:?}", summary.elapsed);
    Ok(())
}
