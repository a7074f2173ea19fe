// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! ADC seam between the sampler and the driver
//!
//! [`AdcSource`] is the narrow interface the sampler drives. The real
//! implementation wraps [`Ads1256`]; [`SimulatedAdc`] backs `--simulate`
//! runs and tests without hardware attached.

use std::fmt::Debug;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiDevice;
use gridsense_ads1256::{Ads1256, Error as DriverError};
use thiserror::Error;

use crate::sample::FULL_SCALE_CODE;

/// Read failure as seen by the sampler.
#[derive(Debug, Error)]
pub enum AdcError {
    /// Conversion-ready wait timed out. Recoverable: drop the sample or
    /// cycle and keep going.
    #[error("timed out waiting for conversion")]
    Timeout,

    /// Anything else on the bus. Escalated to pipeline shutdown.
    #[error("ADC bus fault: {0}")]
    Bus(String),
}

/// Conversion source the sampler drives.
///
/// Exactly one thread owns the source for the process lifetime.
pub trait AdcSource {
    /// Select the single-ended input channel without starting a
    /// conversion.
    fn select_channel(&mut self, channel: u8) -> Result<(), AdcError>;

    /// Read the latest completed conversion on the selected channel
    /// (single-channel fast path, no SYNC/WAKEUP per sample).
    fn read_current(&mut self) -> Result<i32, AdcError>;

    /// Select `channel`, commit it with SYNC/WAKEUP, and read one
    /// conversion (multi-channel path).
    fn read_channel(&mut self, channel: u8) -> Result<i32, AdcError>;
}

fn map_driver_err<SpiE: Debug, PinE: Debug>(err: DriverError<SpiE, PinE>) -> AdcError {
    match err {
        DriverError::ConversionTimeout => AdcError::Timeout,
        other => AdcError::Bus(other.to_string()),
    }
}

impl<SPI, RST, DRDY, D, PinE> AdcSource for Ads1256<SPI, RST, DRDY, D>
where
    SPI: SpiDevice,
    SPI::Error: Debug,
    RST: OutputPin<Error = PinE>,
    DRDY: InputPin<Error = PinE>,
    D: DelayNs,
    PinE: Debug,
{
    fn select_channel(&mut self, channel: u8) -> Result<(), AdcError> {
        self.set_channel(channel).map_err(map_driver_err)
    }

    fn read_current(&mut self) -> Result<i32, AdcError> {
        Ads1256::read_current(self).map_err(map_driver_err)
    }

    fn read_channel(&mut self, channel: u8) -> Result<i32, AdcError> {
        self.set_channel(channel).map_err(map_driver_err)?;
        self.read_conversion().map_err(map_driver_err)
    }
}

/// Synthetic source producing a per-channel sine wave, used by
/// `--simulate` and in tests.
pub struct SimulatedAdc {
    selected: u8,
    step: u64,
    /// Peak amplitude in volts of the synthetic waveform.
    amplitude: f64,
    vref: f64,
}

impl SimulatedAdc {
    /// Waveform with a 1 V peak against the given reference voltage.
    pub fn new(vref: f64) -> Self {
        Self {
            selected: 0,
            step: 0,
            amplitude: 1.0,
            vref,
        }
    }

    fn synth_code(&mut self, channel: u8) -> i32 {
        // Channel-offset sine so different sensors produce distinct data.
        let phase = self.step as f64 / 50.0 + f64::from(channel);
        self.step += 1;
        let volts = self.amplitude * phase.sin();
        (volts / self.vref * f64::from(FULL_SCALE_CODE)) as i32
    }
}

impl AdcSource for SimulatedAdc {
    fn select_channel(&mut self, channel: u8) -> Result<(), AdcError> {
        self.selected = channel;
        Ok(())
    }

    fn read_current(&mut self) -> Result<i32, AdcError> {
        let channel = self.selected;
        Ok(self.synth_code(channel))
    }

    fn read_channel(&mut self, channel: u8) -> Result<i32, AdcError> {
        self.selected = channel;
        Ok(self.synth_code(channel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::code_to_voltage;

    #[test]
    fn test_simulated_codes_stay_in_range() {
        let mut adc = SimulatedAdc::new(5.0);
        for channel in 0..4 {
            let code = adc.read_channel(channel).unwrap();
            let volts = code_to_voltage(code, 5.0);
            assert!(volts.abs() <= 1.0 + 1e-6);
        }
    }

    #[test]
    fn test_simulated_waveform_advances() {
        let mut adc = SimulatedAdc::new(5.0);
        adc.select_channel(1).unwrap();
        let a = adc.read_current().unwrap();
        let b = adc.read_current().unwrap();
        assert_ne!(a, b);
    }
}
