// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Hardware backend (Linux spidev + gpiochip)
//!
//! Opens the kernel SPI device and the RST/DRDY GPIO lines and brings up
//! the converter. Chip select is driven by the kernel spidev driver, so
//! every bus transaction from the driver runs under one CS assertion.

use anyhow::{anyhow, Context, Result};
use gridsense_ads1256::{Ads1256, DataRate, Gain};
use linux_embedded_hal::gpio_cdev::{Chip, LineRequestFlags};
use linux_embedded_hal::spidev::{SpiModeFlags, SpidevOptions};
use linux_embedded_hal::{CdevPin, Delay, SpidevDevice};
use tracing::info;

use crate::config::DaqConfig;

/// Converter handle over the Linux SPI and GPIO character devices.
pub type HwAdc = Ads1256<SpidevDevice, CdevPin, CdevPin, Delay>;

/// Open the bus and bring the converter up with the configured gain and
/// data rate.
pub fn open_adc(config: &DaqConfig) -> Result<HwAdc> {
    let hw = &config.hardware;

    let mut spi = SpidevDevice::open(&hw.spi_device)
        .with_context(|| format!("failed to open SPI device {}", hw.spi_device))?;
    // ADS1256 clocks data on SCLK falling edge: SPI mode 1.
    let options = SpidevOptions::new()
        .bits_per_word(8)
        .max_speed_hz(hw.spi_hz)
        .mode(SpiModeFlags::SPI_MODE_1)
        .build();
    spi.0
        .configure(&options)
        .with_context(|| format!("failed to configure SPI device {}", hw.spi_device))?;

    let mut chip = Chip::new(&hw.gpio_chip)
        .with_context(|| format!("failed to open GPIO chip {}", hw.gpio_chip))?;
    let rst = chip
        .get_line(hw.rst_line)
        .and_then(|line| line.request(LineRequestFlags::OUTPUT, 1, "gridsense-rst"))
        .with_context(|| format!("failed to request RST line {}", hw.rst_line))?;
    let rst = CdevPin::new(rst).context("failed to wrap RST line")?;
    let drdy = chip
        .get_line(hw.drdy_line)
        .and_then(|line| line.request(LineRequestFlags::INPUT, 0, "gridsense-drdy"))
        .with_context(|| format!("failed to request DRDY line {}", hw.drdy_line))?;
    let drdy = CdevPin::new(drdy).context("failed to wrap DRDY line")?;

    let gain = Gain::from_code(config.gain)
        .ok_or_else(|| anyhow!("gain code {} out of range", config.gain))?;
    let rate = DataRate::from_sps(config.sample_rate_hz)
        .ok_or_else(|| anyhow!("no DRATE code for {} SPS", config.sample_rate_hz))?;

    let mut adc = Ads1256::new(spi, rst, drdy, Delay);
    adc.init(gain, rate)
        .map_err(|e| anyhow!("converter bring-up failed: {e}"))?;
    info!(
        spi = %hw.spi_device,
        spi_hz = hw.spi_hz,
        gain = config.gain,
        sps = config.sample_rate_hz,
        "converter initialized"
    );
    Ok(adc)
}
