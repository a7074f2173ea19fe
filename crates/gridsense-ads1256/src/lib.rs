// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! ADS1256 driver
//!
//! Register-level driver for the TI ADS1256 24-bit delta-sigma ADC,
//! generic over the `embedded-hal` 1.0 SPI and GPIO traits.
//!
//! The driver owns the reset line and the DRDY (data-ready, active-low)
//! line; chip-select is handled by the [`SpiDevice`] implementation, which
//! also gives multi-byte register bursts a single uninterrupted
//! chip-select window.
//!
//! # Concurrency
//!
//! Not internally synchronized. The bus must be exclusively owned by one
//! thread for the lifetime of the driver; no two callers may interleave
//! bus operations.
//!
//! # Example
//!
//! ```ignore
//! use gridsense_ads1256::{Ads1256, DataRate, Gain};
//!
//! let mut adc = Ads1256::new(spi, rst, drdy, delay);
//! adc.init(Gain::X1, DataRate::Sps1000)?;
//! adc.set_channel(2)?;
//! let code = adc.read_conversion()?;
//! ```
//!
//! [`SpiDevice`]: embedded_hal::spi::SpiDevice

mod driver;
mod proto;

pub use driver::{sign_extend_24, Ads1256, Error, InputMode, CHIP_ID, DRDY_TIMEOUT};
pub use proto::{Command, DataRate, Gain, Register};
