// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Acquisition daemon configuration
//!
//! The sensor table and rates are runtime configuration, loaded from a
//! JSON file or assembled with [`DaqConfig::builder`], and validated once
//! at startup. Sensor ids must be unique across the table; channels are
//! 0-7.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use gridsense_ads1256::{DataRate, Gain};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Measured quantity a sensor reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensorKind {
    Current,
    Voltage,
}

impl SensorKind {
    /// Database representation.
    pub fn as_str(self) -> &'static str {
        match self {
            SensorKind::Current => "Current",
            SensorKind::Voltage => "Voltage",
        }
    }
}

/// Parse failure for a stored sensor type string.
#[derive(Debug, Error)]
#[error("unknown sensor type {0:?}")]
pub struct ParseSensorKindError(String);

impl FromStr for SensorKind {
    type Err = ParseSensorKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Current" => Ok(SensorKind::Current),
            "Voltage" => Ok(SensorKind::Voltage),
            other => Err(ParseSensorKindError(other.to_string())),
        }
    }
}

/// One configured sensor: an ADC channel mapped to a database identity.
///
/// Immutable for the process lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    /// ADC input channel (0-7).
    pub channel: u8,

    /// Unique id used in persisted rows.
    pub sensor_id: u32,

    /// Display name stored alongside each batch.
    pub name: String,

    /// Sensor type stored alongside each batch.
    pub kind: SensorKind,
}

/// SPI and GPIO line assignments for the hardware backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardwareConfig {
    /// SPI character device.
    pub spi_device: String,

    /// SPI clock in Hz (must stay below fCLKIN/4, about 1.92 MHz).
    pub spi_hz: u32,

    /// GPIO character device.
    pub gpio_chip: String,

    /// Reset line offset (BCM numbering).
    pub rst_line: u32,

    /// DRDY line offset (BCM numbering).
    pub drdy_line: u32,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            spi_device: "/dev/spidev0.0".to_string(),
            spi_hz: 1_000_000,
            gpio_chip: "/dev/gpiochip0".to_string(),
            rst_line: 18,
            drdy_line: 17,
        }
    }
}

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("no sensors configured")]
    NoSensors,

    #[error("duplicate sensor id {0}")]
    DuplicateSensorId(u32),

    #[error("sensor {sensor_id}: channel {channel} out of range (0-7)")]
    ChannelOutOfRange { sensor_id: u32, channel: u8 },

    #[error("gain code {0} out of range (0-6)")]
    InvalidGain(u8),

    #[error("no DRATE code for {0} samples per second")]
    UnsupportedRate(u32),

    #[error("reference voltage must be positive, got {0}")]
    InvalidVref(f64),

    #[error("write interval must be positive, got {0}")]
    InvalidWriteInterval(f64),
}

/// Acquisition daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaqConfig {
    /// Sensor table (channel -> database identity).
    pub sensors: Vec<SensorConfig>,

    /// Target aggregate ADC rate in samples per second.
    pub sample_rate_hz: u32,

    /// Measured reference voltage.
    pub vref: f64,

    /// PGA gain code (0-6 -> x1..x64).
    pub gain: u8,

    /// Seconds between flush cycles of the batch writer.
    pub write_interval_secs: f64,

    /// SQLite database path.
    pub db_path: String,

    /// Hardware backend settings.
    #[serde(default)]
    pub hardware: HardwareConfig,
}

impl Default for DaqConfig {
    fn default() -> Self {
        Self {
            sensors: Vec::new(),
            sample_rate_hz: 1000,
            vref: 5.0,
            gain: 0,
            write_interval_secs: 1.0,
            db_path: "gridsense.db".to_string(),
            hardware: HardwareConfig::default(),
        }
    }
}

impl DaqConfig {
    /// Create a new config builder.
    pub fn builder() -> DaqConfigBuilder {
        DaqConfigBuilder::default()
    }

    /// Load from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Validate the sensor table and rates. Called once at startup;
    /// failures abort before any hardware is touched.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sensors.is_empty() {
            return Err(ConfigError::NoSensors);
        }
        let mut seen = std::collections::HashSet::new();
        for sensor in &self.sensors {
            if !seen.insert(sensor.sensor_id) {
                return Err(ConfigError::DuplicateSensorId(sensor.sensor_id));
            }
            if sensor.channel > 7 {
                return Err(ConfigError::ChannelOutOfRange {
                    sensor_id: sensor.sensor_id,
                    channel: sensor.channel,
                });
            }
        }
        if Gain::from_code(self.gain).is_none() {
            return Err(ConfigError::InvalidGain(self.gain));
        }
        if DataRate::from_sps(self.sample_rate_hz).is_none() {
            return Err(ConfigError::UnsupportedRate(self.sample_rate_hz));
        }
        if !(self.vref > 0.0) {
            return Err(ConfigError::InvalidVref(self.vref));
        }
        if !(self.write_interval_secs > 0.0) {
            return Err(ConfigError::InvalidWriteInterval(self.write_interval_secs));
        }
        Ok(())
    }

    /// Wall time budget of one scheduling cycle (all channels once).
    pub fn cycle_interval(&self) -> Duration {
        let cycles_per_second = self.per_sensor_rate();
        if cycles_per_second > 0.0 {
            Duration::from_secs_f64(1.0 / cycles_per_second)
        } else {
            Duration::from_millis(10)
        }
    }

    /// Effective record rate: aggregate rate divided across sensors.
    pub fn per_sensor_rate(&self) -> f64 {
        if self.sensors.is_empty() {
            0.0
        } else {
            f64::from(self.sample_rate_hz) / self.sensors.len() as f64
        }
    }

    /// Queue capacity: about 5 seconds of expected record throughput.
    pub fn queue_capacity(&self) -> usize {
        ((self.per_sensor_rate() * 5.0) as usize).max(16)
    }

    /// Open-batch length that forces an early flush (90 % of capacity).
    pub fn force_flush_len(&self) -> usize {
        (self.queue_capacity() * 9 / 10).max(1)
    }

    /// Flush interval as a duration.
    pub fn write_interval(&self) -> Duration {
        Duration::from_secs_f64(self.write_interval_secs)
    }
}

/// Config builder for fluent API.
#[derive(Debug, Default)]
pub struct DaqConfigBuilder {
    sensors: Vec<SensorConfig>,
    sample_rate_hz: Option<u32>,
    vref: Option<f64>,
    gain: Option<u8>,
    write_interval_secs: Option<f64>,
    db_path: Option<String>,
}

impl DaqConfigBuilder {
    /// Add a sensor to the table.
    pub fn sensor(
        mut self,
        channel: u8,
        sensor_id: u32,
        name: impl Into<String>,
        kind: SensorKind,
    ) -> Self {
        self.sensors.push(SensorConfig {
            channel,
            sensor_id,
            name: name.into(),
            kind,
        });
        self
    }

    /// Set the aggregate sample rate in Hz.
    pub fn sample_rate_hz(mut self, rate: u32) -> Self {
        self.sample_rate_hz = Some(rate);
        self
    }

    /// Set the reference voltage.
    pub fn vref(mut self, vref: f64) -> Self {
        self.vref = Some(vref);
        self
    }

    /// Set the PGA gain code (0-6).
    pub fn gain(mut self, gain: u8) -> Self {
        self.gain = Some(gain);
        self
    }

    /// Set the flush interval in seconds.
    pub fn write_interval_secs(mut self, secs: f64) -> Self {
        self.write_interval_secs = Some(secs);
        self
    }

    /// Set the database path.
    pub fn db_path(mut self, path: impl Into<String>) -> Self {
        self.db_path = Some(path.into());
        self
    }

    /// Build the configuration.
    pub fn build(self) -> DaqConfig {
        let defaults = DaqConfig::default();
        DaqConfig {
            sensors: self.sensors,
            sample_rate_hz: self.sample_rate_hz.unwrap_or(defaults.sample_rate_hz),
            vref: self.vref.unwrap_or(defaults.vref),
            gain: self.gain.unwrap_or(defaults.gain),
            write_interval_secs: self
                .write_interval_secs
                .unwrap_or(defaults.write_interval_secs),
            db_path: self.db_path.unwrap_or(defaults.db_path),
            hardware: defaults.hardware,
        }
    }
}
