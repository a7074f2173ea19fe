// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! GridSense acquisition daemon CLI
//!
//! # Usage
//!
//! ```bash
//! # Run against real hardware (requires the `hardware` feature)
//! gridsense-daq --config sensors.json --db gridsense.db
//!
//! # Run without hardware, sampling a synthetic waveform
//! gridsense-daq --simulate --rate 100
//!
//! # Inspect the store
//! gridsense-daq stats
//! gridsense-daq latest --sensor 1 --count 5
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use gridsense_daq::{
    DaqConfig, MeasurementStore, SensorKind, ShutdownFlag, SimulatedAdc, SqliteStore,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "gridsense-daq")]
#[command(about = "GridSense sensor acquisition daemon", long_about = None)]
struct Args {
    /// Configuration file (JSON); defaults to one voltage sensor on
    /// channel 2 when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Database path (SQLite file); overrides the config file
    #[arg(short, long)]
    db: Option<String>,

    /// Aggregate sample rate in Hz; overrides the config file
    #[arg(short, long)]
    rate: Option<u32>,

    /// Reference voltage; overrides the config file
    #[arg(long)]
    vref: Option<f64>,

    /// PGA gain code (0-6); overrides the config file
    #[arg(short, long)]
    gain: Option<u8>,

    /// Seconds between batch flushes; overrides the config file
    #[arg(short, long)]
    write_interval: Option<f64>,

    /// Sample a synthetic waveform instead of real hardware
    #[arg(long)]
    simulate: bool,

    /// Log filter when RUST_LOG is unset (e.g. "debug", "gridsense_daq=trace")
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show store statistics
    Stats,
    /// Show the most recent batches for a sensor
    Latest {
        /// Sensor id
        #[arg(short, long)]
        sensor: u32,

        /// Number of batches
        #[arg(short, long, default_value_t = 5)]
        count: usize,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level)),
        )
        .init();
    let config = load_config(&args)?;

    let store = SqliteStore::open(&config.db_path)?;

    if let Some(cmd) = args.command {
        return handle_command(cmd, store);
    }

    config.validate()?;
    tracing::info!("GridSense acquisition daemon starting...");
    tracing::info!("  Database: {}", config.db_path);
    tracing::info!("  Sensors: {}", config.sensors.len());
    tracing::info!("  Sample rate: {} Hz", config.sample_rate_hz);
    tracing::info!("  Flush interval: {} s", config.write_interval_secs);

    let shutdown = ShutdownFlag::new();
    let handler_flag = shutdown.clone();
    ctrlc::set_handler(move || {
        tracing::info!("interrupt received, shutting down");
        handler_flag.request();
    })?;

    if args.simulate {
        tracing::info!("Running with simulated ADC");
        let adc = SimulatedAdc::new(config.vref);
        gridsense_daq::pipeline::run(&config, adc, store, shutdown)?;
    } else {
        #[cfg(feature = "hardware")]
        {
            let adc = gridsense_daq::hw::open_adc(&config)?;
            gridsense_daq::pipeline::run(&config, adc, store, shutdown)?;
        }
        #[cfg(not(feature = "hardware"))]
        {
            drop(store);
            anyhow::bail!("built without the `hardware` feature; use --simulate");
        }
    }

    Ok(())
}

/// Load the config file (or the single-sensor default) and apply CLI
/// overrides on top.
fn load_config(args: &Args) -> Result<DaqConfig> {
    let mut config = match &args.config {
        Some(path) => DaqConfig::from_file(path)?,
        None => DaqConfig::builder()
            .sensor(2, 1, "Voltage Sensor Ch2", SensorKind::Voltage)
            .build(),
    };
    if let Some(db) = &args.db {
        config.db_path = db.clone();
    }
    if let Some(rate) = args.rate {
        config.sample_rate_hz = rate;
    }
    if let Some(vref) = args.vref {
        config.vref = vref;
    }
    if let Some(gain) = args.gain {
        config.gain = gain;
    }
    if let Some(secs) = args.write_interval {
        config.write_interval_secs = secs;
    }
    Ok(config)
}

fn handle_command(cmd: Commands, mut store: SqliteStore) -> Result<()> {
    match cmd {
        Commands::Stats => {
            let count = store.count()?;
            let max_id = store.max_id()?;
            println!("Batches stored: {}", count);
            println!("Highest batch id: {}", max_id);
        }
        Commands::Latest { sensor, count } => {
            let rows = store.latest(sensor, count)?;
            if rows.is_empty() {
                println!("No batches stored for sensor {}.", sensor);
            }
            for m in &rows {
                println!(
                    "  id={}, time={}, samples={}, rms={:.2}, name='{}'",
                    m.id,
                    m.time.to_rfc3339(),
                    m.sensdata.len(),
                    m.rmsvalue,
                    m.sname
                );
            }
        }
    }

    Ok(())
}
