// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Sample conversion and numeric bounds
//!
//! Voltage derivation from raw codes and the NUMERIC(5,2) envelope every
//! persisted value is clamped into.

use chrono::{DateTime, Utc};

/// Largest positive 24-bit code, corresponding to full-scale Vref.
pub const FULL_SCALE_CODE: i32 = 0x7F_FFFF;

/// Upper bound of the NUMERIC(5,2) storage envelope.
pub const NUMERIC_MAX: f64 = 999.99;

/// Lower bound of the NUMERIC(5,2) storage envelope.
pub const NUMERIC_MIN: f64 = -999.99;

/// One record per successful scheduling cycle: a shared wall timestamp
/// and the voltage read for each configured sensor, in sensor-table order.
#[derive(Debug, Clone)]
pub struct SampleRecord {
    /// Wall-clock instant the cycle's readings were taken.
    pub taken_at: DateTime<Utc>,

    /// `(sensor_id, volts)` per configured sensor.
    pub readings: Vec<(u32, f64)>,
}

/// Linear voltage derivation: `code / 0x7FFFFF * vref`.
pub fn code_to_voltage(code: i32, vref: f64) -> f64 {
    f64::from(code) / f64::from(FULL_SCALE_CODE) * vref
}

/// Clamp into `[-999.99, 999.99]` and round to 2 decimal places.
pub fn clamp_numeric(value: f64) -> f64 {
    round2(value.clamp(NUMERIC_MIN, NUMERIC_MAX))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Root-mean-square of a voltage series; 0 for an empty series.
pub fn rms(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean_sq = values.iter().map(|v| v * v).sum::<f64>() / values.len() as f64;
    mean_sq.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voltage_linearity() {
        assert_eq!(code_to_voltage(0, 5.0), 0.0);
        assert!((code_to_voltage(FULL_SCALE_CODE, 5.0) - 5.0).abs() < 1e-9);
        assert!((code_to_voltage(FULL_SCALE_CODE / 2, 5.0) - 2.5).abs() < 1e-6);
        assert!((code_to_voltage(-FULL_SCALE_CODE, 5.0) + 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_clamp_bounds() {
        assert_eq!(clamp_numeric(1050.0), 999.99);
        assert_eq!(clamp_numeric(-1200.0), -999.99);
    }

    #[test]
    fn test_clamp_rounds_in_range_values() {
        assert_eq!(clamp_numeric(1.005001), 1.01);
        assert_eq!(clamp_numeric(-3.14159), -3.14);
        assert_eq!(clamp_numeric(10.0), 10.0);
    }

    #[test]
    fn test_rms_of_constant_series() {
        for n in 1..5 {
            let series = vec![-2.5; n];
            assert!((rms(&series) - 2.5).abs() < 1e-12);
        }
    }

    #[test]
    fn test_rms_empty_is_zero() {
        assert_eq!(rms(&[]), 0.0);
    }
}
