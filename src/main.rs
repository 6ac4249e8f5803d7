//! CLI Entry Point for gpib-conf
//!
//! Provides command-line access to a GPIB bus configuration:
//! - Checking a configuration file for errors
//! - Printing it in canonical form or as JSON
//! - Resolving a board or device name to its bus address
//! - Running maximum power point tracking on a configured sourcemeter
//!   (against a simulated cell; no GPIB driver is linked)
//!
//! # Usage
//!
//! ```bash
//! gpib-conf --conf /etc/gpib.conf check
//! gpib-conf show --json
//! gpib-conf find sourcemeter
//! gpib-conf track --device sourcemeter --duration 30
//! ```

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use gpib_conf::config::{Entry, GpibConfig};
use gpib_conf::hardware::MockSolarCell;
use gpib_conf::logging;
use gpib_conf::mppt::{which_max_power, MpptTracker};
use gpib_conf::settings::{Settings, DEFAULT_SETTINGS_PATH};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "gpib-conf")]
#[command(about = "Inspect and validate GPIB bus configuration", long_about = None)]
struct Cli {
    /// Settings file
    #[arg(long, default_value = DEFAULT_SETTINGS_PATH)]
    settings: PathBuf,

    /// GPIB configuration file (overrides settings)
    #[arg(long)]
    conf: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate the configuration
    Check,

    /// Print the configuration in canonical form
    Show {
        /// Print JSON instead of gpib.conf syntax
        #[arg(long)]
        json: bool,
    },

    /// Resolve a board or device name
    Find {
        /// Name given in the configuration
        name: String,
    },

    /// Track the maximum power point of a simulated cell on a configured sourcemeter
    Track {
        /// Device name of the sourcemeter
        #[arg(long, default_value = "sourcemeter")]
        device: String,

        /// Tracking duration in seconds
        #[arg(long, default_value = "30")]
        duration: f64,

        /// Open-circuit voltage of the simulated cell
        #[arg(long, default_value = "1.1")]
        voc: f64,

        /// Short-circuit current of the simulated cell
        #[arg(long, default_value = "0.02")]
        isc: f64,

        /// Integration time in power line cycles
        #[arg(long)]
        nplc: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load_from(&cli.settings)
        .with_context(|| format!("loading settings from {}", cli.settings.display()))?;
    if let Some(conf) = cli.conf {
        settings.gpib_conf = conf;
    }
    logging::init_from_settings(&settings).map_err(|e| anyhow!(e))?;

    let config = GpibConfig::load(&settings.gpib_conf).with_context(|| {
        format!("invalid GPIB configuration {}", settings.gpib_conf.display())
    })?;

    match cli.command {
        Commands::Check => check(&config, &settings),
        Commands::Show { json } => show(&config, json),
        Commands::Find { name } => find(&config, &name),
        Commands::Track {
            device,
            duration,
            voc,
            isc,
            nplc,
        } => track(&config, &device, duration, voc, isc, nplc).await,
    }
}

fn check(config: &GpibConfig, settings: &Settings) -> Result<()> {
    println!("{}: OK", settings.gpib_conf.display());
    for board in &config.interfaces {
        println!(
            "  {} [{}] pad {} sad {} timeout {}",
            board.label(),
            board.board_type,
            board.pad,
            board.sad,
            board.timeout
        );
        for device in config.devices_on(board.minor) {
            println!("    {} pad {} sad {}", device.label(), device.pad, device.sad);
        }
    }
    Ok(())
}

fn show(config: &GpibConfig, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(config)?);
    } else {
        print!("{config}");
    }
    Ok(())
}

fn find(config: &GpibConfig, name: &str) -> Result<()> {
    let entry = config
        .find(name)
        .ok_or_else(|| anyhow!("no board or device named '{name}'"))?;
    let (minor, pad, sad) = entry.address();
    match entry {
        Entry::Board(board) => {
            println!(
                "board '{name}' ({}) on /dev/gpib{minor}, pad {pad} sad {sad}",
                board.board_type
            );
        }
        Entry::Device { board, .. } => {
            println!(
                "device '{name}' on {} /dev/gpib{minor}, pad {pad} sad {sad}",
                board.label()
            );
        }
    }
    Ok(())
}

async fn track(
    config: &GpibConfig,
    device: &str,
    duration: f64,
    voc: f64,
    isc: f64,
    nplc: Option<f64>,
) -> Result<()> {
    let meter = config
        .device(device)
        .ok_or_else(|| anyhow!("no device named '{device}' in configuration"))?;
    let board = config
        .interface(meter.minor)
        .ok_or_else(|| anyhow!("device '{device}' has no board"))?;
    let duration = Duration::try_from_secs_f64(duration)
        .map_err(|e| anyhow!("invalid duration {duration}: {e}"))?;

    info!(
        device,
        board = %board.label(),
        pad = meter.pad,
        sad = meter.sad,
        "Using simulated cell in place of the bus instrument"
    );

    let cell = Arc::new(MockSolarCell::new(voc, isc));
    let mut tracker = MpptTracker::new(cell.clone());
    tracker.voc = Some(cell.voc());

    let readings = tracker.launch(duration, nplc).await?;
    let best = which_max_power(&readings).ok_or_else(|| anyhow!("no readings taken"))?;
    println!(
        "{} readings; best {:.4} mW at {:.2} mV and {:.2} mA",
        readings.len(),
        best.power * 1000.0,
        best.voltage * 1000.0,
        best.current * 1000.0
    );
    Ok(())
}
