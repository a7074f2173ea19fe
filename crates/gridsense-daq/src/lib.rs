// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! GridSense acquisition daemon
//!
//! Continuous sampling of ADS1256-attached sensors into a relational
//! store. Two worker threads connected by a bounded queue:
//!
//! - the sampler paces conversions at the configured rate and pushes
//!   timestamped records, dropping the newest when the queue is full;
//! - the batch writer drains records into per-sensor batches and flushes
//!   each batch as one transaction on an interval (or early when a batch
//!   nears capacity).
//!
//! The pipeline in [`pipeline::run`] spawns and supervises both workers
//! and joins them on cooperative shutdown. Storage sits behind the
//! [`store::MeasurementStore`] trait with a SQLite backend; the ADC sits
//! behind [`adc::AdcSource`] with a simulated backend for runs without
//! hardware.

pub mod adc;
pub mod config;
pub mod pipeline;
pub mod queue;
pub mod sample;
pub mod sampler;
pub mod shutdown;
pub mod sqlite;
pub mod store;
pub mod writer;

#[cfg(feature = "hardware")]
pub mod hw;

pub use adc::{AdcError, AdcSource, SimulatedAdc};
pub use config::{ConfigError, DaqConfig, HardwareConfig, SensorConfig, SensorKind};
pub use pipeline::PipelineError;
pub use sample::SampleRecord;
pub use shutdown::ShutdownFlag;
pub use sqlite::SqliteStore;
pub use store::{Measurement, MeasurementStore, StoreError};
