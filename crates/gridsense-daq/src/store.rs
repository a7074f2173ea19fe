// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Measurement store abstraction
//!
//! Defines the persisted row shape and the trait storage backends
//! implement. The REST layer and cloud relay consume these rows with
//! `latest`; this core only produces them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SensorKind;

/// One persisted batch: a bounded, time-ordered group of clamped samples
/// for a single sensor. Never empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Measurement {
    /// Strictly increasing batch id, process-wide.
    pub id: i64,

    /// Configured sensor id.
    pub sensor_id: u32,

    /// Ordered `[clamped_voltage, clamped_delta_ms]` pairs.
    pub sensdata: Vec<[f64; 2]>,

    /// Timestamp of the batch's first sample.
    pub time: DateTime<Utc>,

    /// RMS over the clamped voltage series, itself clamped.
    pub rmsvalue: f64,

    /// Sensor name.
    pub sname: String,

    /// Sensor type.
    pub stype: SensorKind,

    /// Total harmonic distortion placeholder, always 0.
    pub thd: f64,

    /// Power factor placeholder, always 0.
    pub pf: f64,
}

/// Store error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("malformed sensdata column: {0}")]
    Sensdata(#[from] serde_json::Error),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Storage backend for measurement batches.
///
/// The connection is exclusively owned by the batch writer thread, hence
/// the `&mut self` receivers.
pub trait MeasurementStore {
    /// Largest batch id currently persisted, 0 when empty. Seeds the
    /// process-wide id counter so restarts never reuse an id.
    fn max_id(&mut self) -> Result<i64, StoreError>;

    /// Insert one batch as a single transaction: either the whole row
    /// lands or nothing does.
    fn insert(&mut self, measurement: &Measurement) -> Result<(), StoreError>;

    /// Most recent `count` batches for a sensor, newest first.
    fn latest(&mut self, sensor_id: u32, count: usize) -> Result<Vec<Measurement>, StoreError>;

    /// Total number of persisted batches.
    fn count(&mut self) -> Result<usize, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measurement_serialization() {
        let m = Measurement {
            id: 7,
            sensor_id: 1,
            sensdata: vec![[1.0, 0.0], [-1.0, 10.0]],
            time: Utc::now(),
            rmsvalue: 1.0,
            sname: "Voltage Sensor Ch2".to_string(),
            stype: SensorKind::Voltage,
            thd: 0.0,
            pf: 0.0,
        };
        let json = serde_json::to_string(&m).unwrap();
        let back: Measurement = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, 7);
        assert_eq!(back.sensdata, m.sensdata);
        assert_eq!(back.stype, SensorKind::Voltage);
    }
}
