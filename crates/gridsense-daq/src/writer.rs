// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Batch aggregator and writer
//!
//! Drains the sample queue into per-sensor open batches and flushes them
//! to the store. Flush triggers: the write interval elapsing, any batch
//! reaching 90 % of its maximum length (forced, logged), or shutdown with
//! data pending. Each sensor's batch is persisted in its own transaction;
//! one sensor's failure never blocks another's. Batches are cleared at
//! the end of every flush cycle whether or not the insert succeeded:
//! at-most-once persistence with error logging, not resubmission.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::config::{DaqConfig, SensorConfig};
use crate::queue::{PopError, QueueConsumer};
use crate::sample::{clamp_numeric, rms, SampleRecord, NUMERIC_MAX, NUMERIC_MIN};
use crate::shutdown::ShutdownFlag;
use crate::store::{Measurement, MeasurementStore, StoreError};

/// Bound on a blocking pop from the sample queue.
const POP_TIMEOUT: Duration = Duration::from_millis(100);

/// Idle pause when the producer is gone but shutdown is not yet flagged.
const IDLE_SLEEP: Duration = Duration::from_millis(50);

/// Consumer side of the pipeline. Owns the store connection for the
/// process lifetime; runs on its own thread.
pub struct BatchWriter<S: MeasurementStore> {
    store: S,
    queue: QueueConsumer,
    shutdown: ShutdownFlag,
    sensors: HashMap<u32, SensorConfig>,
    /// Flush order follows the configured sensor table.
    flush_order: Vec<u32>,
    write_interval: Duration,
    force_flush_len: usize,
    /// Last persisted (or reclaimed) batch id.
    last_id: i64,
    open: HashMap<u32, Vec<(DateTime<Utc>, f64)>>,
}

impl<S: MeasurementStore> BatchWriter<S> {
    /// Build a writer, seeding the batch id counter from the store so a
    /// restart never reuses an already-persisted id.
    pub fn new(
        mut store: S,
        config: &DaqConfig,
        queue: QueueConsumer,
        shutdown: ShutdownFlag,
    ) -> Result<Self, StoreError> {
        let last_id = store.max_id()?;
        let sensors: HashMap<u32, SensorConfig> = config
            .sensors
            .iter()
            .map(|s| (s.sensor_id, s.clone()))
            .collect();
        let flush_order = config.sensors.iter().map(|s| s.sensor_id).collect();
        Ok(Self {
            store,
            queue,
            shutdown,
            sensors,
            flush_order,
            write_interval: config.write_interval(),
            force_flush_len: config.force_flush_len(),
            last_id,
            open: HashMap::new(),
        })
    }

    /// Drain-and-flush loop. After shutdown is requested it keeps
    /// draining until the queue is empty and performs a final flush of
    /// any non-empty batches before returning.
    pub fn run(mut self) {
        info!(seed_id = self.last_id, "batch writer started");
        let mut last_flush = Instant::now();

        loop {
            let stopping = self.shutdown.is_requested();

            match self.queue.pop(POP_TIMEOUT) {
                Ok(record) => self.absorb(record),
                Err(PopError::Timeout) => {}
                Err(PopError::Disconnected) => {
                    if !stopping {
                        self.shutdown.sleep(IDLE_SLEEP);
                    }
                }
            }

            let oversize = self.open.values().any(|b| b.len() >= self.force_flush_len);
            let interval_due = last_flush.elapsed() >= self.write_interval;

            if (interval_due || oversize || stopping) && self.has_open_data() {
                if oversize {
                    warn!("open batch reached 90% of capacity, forcing early flush");
                }
                self.flush_all();
                last_flush = Instant::now();
            }

            if stopping && self.queue.is_empty() && !self.has_open_data() {
                break;
            }
        }
        info!("batch writer finished");
    }

    fn has_open_data(&self) -> bool {
        self.open.values().any(|b| !b.is_empty())
    }

    /// Fan a record out into per-sensor open batches, preserving
    /// enqueue order.
    fn absorb(&mut self, record: SampleRecord) {
        for (sensor_id, volts) in record.readings {
            if self.sensors.contains_key(&sensor_id) {
                self.open
                    .entry(sensor_id)
                    .or_default()
                    .push((record.taken_at, volts));
            } else {
                warn!(sensor_id, "reading for unconfigured sensor, ignored");
            }
        }
    }

    /// One flush cycle over every sensor with a non-empty batch. An
    /// empty batch is never flushed.
    fn flush_all(&mut self) {
        for sensor_id in self.flush_order.clone() {
            let Some(batch) = self.open.get_mut(&sensor_id) else {
                continue;
            };
            if batch.is_empty() {
                continue;
            }
            // Cleared regardless of the insert outcome below.
            let samples = std::mem::take(batch);
            self.flush_sensor(sensor_id, &samples);
        }
    }

    fn flush_sensor(&mut self, sensor_id: u32, samples: &[(DateTime<Utc>, f64)]) {
        let sensor = &self.sensors[&sensor_id];
        let id = self.last_id + 1;
        let measurement = build_measurement(id, sensor, samples);
        self.last_id = id;

        match self.store.insert(&measurement) {
            Ok(()) => debug!(
                id,
                sensor_id,
                samples = measurement.sensdata.len(),
                rms = measurement.rmsvalue,
                "batch persisted"
            ),
            Err(e) => {
                // Reclaim the id so the next successful flush reuses it.
                self.last_id -= 1;
                error!(id, sensor_id, error = %e, "batch insert failed, id reclaimed");
            }
        }
    }
}

/// Assemble the persisted row: clamp voltage and delta-ms independently,
/// compute RMS over the clamped voltages, clamp the RMS.
fn build_measurement(
    id: i64,
    sensor: &SensorConfig,
    samples: &[(DateTime<Utc>, f64)],
) -> Measurement {
    let start_time = samples[0].0;
    let mut sensdata = Vec::with_capacity(samples.len());
    let mut clamped_volts = Vec::with_capacity(samples.len());

    for (taken_at, volts) in samples {
        if *volts > NUMERIC_MAX || *volts < NUMERIC_MIN {
            warn!(sensor_id = sensor.sensor_id, volts, "voltage clamped for storage");
        }
        let v = clamp_numeric(*volts);
        let delta_ms = (*taken_at - start_time)
            .num_microseconds()
            .map_or_else(|| (*taken_at - start_time).num_milliseconds() as f64, |us| {
                us as f64 / 1000.0
            });
        sensdata.push([v, clamp_numeric(delta_ms)]);
        clamped_volts.push(v);
    }

    Measurement {
        id,
        sensor_id: sensor.sensor_id,
        sensdata,
        time: start_time,
        rmsvalue: clamp_numeric(rms(&clamped_volts)),
        sname: sensor.name.clone(),
        stype: sensor.kind,
        thd: 0.0,
        pf: 0.0,
    }
}
