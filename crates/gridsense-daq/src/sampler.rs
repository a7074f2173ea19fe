// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Sample scheduler
//!
//! Produces one timestamped record per scheduling cycle at the target
//! aggregate rate. With a single configured sensor the mux is set once
//! and every sample uses the low-overhead read path; with several, each
//! cycle walks the channel list and a timeout on any channel discards the
//! whole cycle so a record never carries misaligned per-channel readings.

use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{error, info, warn};

use crate::adc::{AdcError, AdcSource};
use crate::config::{DaqConfig, SensorConfig};
use crate::queue::{PushError, QueueProducer};
use crate::sample::{code_to_voltage, SampleRecord};
use crate::shutdown::ShutdownFlag;

/// Bound on a blocking push into the sample queue.
const PUSH_TIMEOUT: Duration = Duration::from_millis(500);

/// Back-off after a conversion timeout before the next cycle.
const READ_BACKOFF: Duration = Duration::from_millis(100);

/// Paced producer of [`SampleRecord`]s. Owns the ADC handle for the
/// process lifetime; runs on its own thread.
pub struct Sampler<A: AdcSource> {
    adc: A,
    sensors: Vec<SensorConfig>,
    cycle: Duration,
    vref: f64,
    queue: QueueProducer,
    shutdown: ShutdownFlag,
}

impl<A: AdcSource> Sampler<A> {
    /// Build a sampler from validated configuration.
    pub fn new(adc: A, config: &DaqConfig, queue: QueueProducer, shutdown: ShutdownFlag) -> Self {
        Self {
            adc,
            sensors: config.sensors.clone(),
            cycle: config.cycle_interval(),
            vref: config.vref,
            queue,
            shutdown,
        }
    }

    /// Sampling loop. Returns when shutdown is requested or on a fatal
    /// bus fault (which itself requests shutdown).
    pub fn run(mut self) {
        info!(
            sensors = self.sensors.len(),
            cycle_ms = self.cycle.as_millis() as u64,
            "sampler started"
        );
        if self.sensors.len() == 1 {
            self.run_single_channel();
        } else {
            self.run_multi_channel();
        }
        info!("sampler finished");
    }

    /// Fast path: mux committed once, then plain conversion reads.
    fn run_single_channel(&mut self) {
        let sensor = self.sensors[0].clone();
        if let Err(e) = self.adc.select_channel(sensor.channel) {
            error!(channel = sensor.channel, error = %e, "failed to select channel, stopping");
            self.shutdown.request();
            return;
        }

        while !self.shutdown.is_requested() {
            let cycle_start = Instant::now();
            let taken_at = Utc::now();
            match self.adc.read_current() {
                Ok(code) => {
                    let volts = code_to_voltage(code, self.vref);
                    self.enqueue(SampleRecord {
                        taken_at,
                        readings: vec![(sensor.sensor_id, volts)],
                    });
                }
                Err(AdcError::Timeout) => {
                    warn!(channel = sensor.channel, "conversion timed out, sample dropped");
                    self.shutdown.sleep(READ_BACKOFF);
                }
                Err(e) => {
                    error!(error = %e, "bus fault while sampling, stopping pipeline");
                    self.shutdown.request();
                    return;
                }
            }
            self.pace(cycle_start);
        }
    }

    /// Cycle over every configured channel; a timeout anywhere discards
    /// the cycle's readings entirely.
    fn run_multi_channel(&mut self) {
        while !self.shutdown.is_requested() {
            let cycle_start = Instant::now();
            let taken_at = Utc::now();
            let mut readings = Vec::with_capacity(self.sensors.len());
            let mut cycle_ok = true;

            for sensor in &self.sensors {
                match self.adc.read_channel(sensor.channel) {
                    Ok(code) => {
                        readings.push((sensor.sensor_id, code_to_voltage(code, self.vref)));
                    }
                    Err(AdcError::Timeout) => {
                        warn!(
                            channel = sensor.channel,
                            "conversion timed out, discarding cycle"
                        );
                        cycle_ok = false;
                        break;
                    }
                    Err(e) => {
                        error!(error = %e, "bus fault while sampling, stopping pipeline");
                        self.shutdown.request();
                        return;
                    }
                }
            }

            if cycle_ok {
                self.enqueue(SampleRecord { taken_at, readings });
                self.pace(cycle_start);
            } else {
                self.shutdown.sleep(READ_BACKOFF);
            }
        }
    }

    fn enqueue(&mut self, record: SampleRecord) {
        match self.queue.push(record, PUSH_TIMEOUT) {
            Ok(()) => {}
            Err(PushError::Full) => warn!("sample queue full, record dropped"),
            Err(PushError::Disconnected) => {
                warn!("batch writer stopped, halting sampler");
                self.shutdown.request();
            }
        }
    }

    /// Sleep the remainder of the cycle budget, interruptibly.
    fn pace(&self, cycle_start: Instant) {
        let elapsed = cycle_start.elapsed();
        if elapsed < self.cycle {
            self.shutdown.sleep(self.cycle - elapsed);
        }
    }
}
