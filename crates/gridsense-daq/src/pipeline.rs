// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Acquisition pipeline
//!
//! Wires the sampler and batch writer onto their threads, supervises
//! them, and joins both on shutdown. The sampler gets a short join
//! deadline; the writer gets a longer one since it must drain the queue
//! and run a final flush before exiting.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{error, info, warn};

use crate::adc::AdcSource;
use crate::config::{ConfigError, DaqConfig};
use crate::queue;
use crate::sampler::Sampler;
use crate::shutdown::ShutdownFlag;
use crate::store::{MeasurementStore, StoreError};
use crate::writer::BatchWriter;

/// Poll period of the supervision loop.
const SUPERVISE_INTERVAL: Duration = Duration::from_millis(200);

/// Join deadline for the sampler thread.
const SAMPLER_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Join deadline for the writer thread (covers the final flush).
const WRITER_JOIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Pipeline startup failure.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("store initialization failed: {0}")]
    Store(#[from] StoreError),

    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        source: std::io::Error,
    },
}

/// Run the acquisition pipeline until `shutdown` is requested or a
/// worker dies. Blocks the calling thread for the pipeline lifetime.
pub fn run<A, S>(
    config: &DaqConfig,
    adc: A,
    store: S,
    shutdown: ShutdownFlag,
) -> Result<(), PipelineError>
where
    A: AdcSource + Send + 'static,
    S: MeasurementStore + Send + 'static,
{
    config.validate()?;

    let capacity = config.queue_capacity();
    let (tx, rx) = queue::bounded(capacity);
    info!(
        sensors = config.sensors.len(),
        sample_rate_hz = config.sample_rate_hz,
        queue_capacity = capacity,
        "starting acquisition pipeline"
    );

    let sampler = Sampler::new(adc, config, tx, shutdown.clone());
    let writer = BatchWriter::new(store, config, rx, shutdown.clone())?;

    let sampler_handle = spawn_worker("gs-sampler", move || sampler.run())?;
    let writer_handle = spawn_worker("gs-writer", move || writer.run())?;

    // Supervise: a worker exiting early (panic or fatal fault) takes the
    // whole pipeline down.
    while !shutdown.is_requested() {
        if sampler_handle.is_finished() {
            warn!("sampler thread exited, shutting down pipeline");
            shutdown.request();
            break;
        }
        if writer_handle.is_finished() {
            warn!("batch writer thread exited, shutting down pipeline");
            shutdown.request();
            break;
        }
        shutdown.sleep(SUPERVISE_INTERVAL);
    }

    join_with_deadline("gs-sampler", sampler_handle, SAMPLER_JOIN_TIMEOUT);
    join_with_deadline("gs-writer", writer_handle, WRITER_JOIN_TIMEOUT);
    info!("acquisition pipeline stopped");
    Ok(())
}

fn spawn_worker<F>(name: &'static str, body: F) -> Result<JoinHandle<()>, PipelineError>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name(name.to_string())
        .spawn(body)
        .map_err(|source| PipelineError::Spawn { name, source })
}

/// Join a worker, giving up after `deadline`. A thread that misses its
/// deadline is logged and left detached; cancellation stays cooperative.
fn join_with_deadline(name: &str, handle: JoinHandle<()>, deadline: Duration) {
    let start = std::time::Instant::now();
    while !handle.is_finished() {
        if start.elapsed() >= deadline {
            error!(thread = name, "worker did not stop within its join deadline");
            return;
        }
        thread::sleep(Duration::from_millis(20));
    }
    if handle.join().is_err() {
        error!(thread = name, "worker panicked");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adc::{AdcError, SimulatedAdc};
    use crate::config::SensorKind;
    use crate::sqlite::SqliteStore;

    fn config() -> DaqConfig {
        DaqConfig::builder()
            .sensor(2, 1, "Voltage Sensor Ch2", SensorKind::Voltage)
            .sample_rate_hz(100)
            .write_interval_secs(0.1)
            .build()
    }

    #[test]
    fn test_invalid_config_rejected_before_spawn() {
        let config = DaqConfig::builder().build();
        let result = run(
            &config,
            SimulatedAdc::new(5.0),
            SqliteStore::open_in_memory().unwrap(),
            ShutdownFlag::new(),
        );
        assert!(matches!(result, Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_pipeline_stops_on_request() {
        let shutdown = ShutdownFlag::new();
        let stopper = shutdown.clone();
        let stop_thread = thread::spawn(move || {
            thread::sleep(Duration::from_millis(300));
            stopper.request();
        });

        let result = run(
            &config(),
            SimulatedAdc::new(5.0),
            SqliteStore::open_in_memory().unwrap(),
            shutdown,
        );
        assert!(result.is_ok());
        stop_thread.join().unwrap();
    }

    #[test]
    fn test_sampler_fault_takes_pipeline_down() {
        struct FaultyAdc;
        impl AdcSource for FaultyAdc {
            fn select_channel(&mut self, _channel: u8) -> Result<(), AdcError> {
                Ok(())
            }
            fn read_current(&mut self) -> Result<i32, AdcError> {
                Err(AdcError::Bus("spi gone".to_string()))
            }
            fn read_channel(&mut self, _channel: u8) -> Result<i32, AdcError> {
                Err(AdcError::Bus("spi gone".to_string()))
            }
        }

        let shutdown = ShutdownFlag::new();
        let result = run(
            &config(),
            FaultyAdc,
            SqliteStore::open_in_memory().unwrap(),
            shutdown.clone(),
        );
        assert!(result.is_ok());
        assert!(shutdown.is_requested());
    }
}
