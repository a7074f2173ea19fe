// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! ADS1256 command sequencing
//!
//! Deterministic driver state machine over the serial bus:
//!
//! ```text
//! Uninitialized -> Reset -> IdChecked -> Configured -> Ready <-> Converting
//! ```
//!
//! A conversion timeout returns the driver to ready (retryable); a failed
//! chip-id read during [`Ads1256::init`] is fatal and aborts startup.

use std::time::{Duration, Instant};

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::{Operation, SpiDevice};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::proto::{Command, DataRate, Gain, Register};

/// Factory chip id in the STATUS register top nibble.
pub const CHIP_ID: u8 = 3;

/// Default bound on a single DRDY wait.
pub const DRDY_TIMEOUT: Duration = Duration::from_secs(1);

/// Interval between DRDY polls.
const DRDY_POLL_US: u32 = 5;

/// Driver error.
///
/// `ConversionTimeout` is recoverable (drop the sample and retry); the
/// remaining variants indicate caller errors or bus faults.
#[derive(Debug, Error)]
pub enum Error<SpiE, PinE> {
    /// SPI transfer failed.
    #[error("SPI transfer failed: {0:?}")]
    Spi(SpiE),

    /// GPIO line could not be driven or read.
    #[error("GPIO access failed: {0:?}")]
    Pin(PinE),

    /// DRDY did not assert within the timeout.
    #[error("timed out waiting for conversion ready")]
    ConversionTimeout,

    /// Single-ended channel outside 0-7. Rejected before any bus write.
    #[error("channel {0} out of range (0-7)")]
    InvalidChannel(u8),

    /// Differential pair outside 0-3. Rejected before any bus write.
    #[error("differential pair {0} out of range (0-3)")]
    InvalidPair(u8),
}

/// Input multiplexer mode selected by the last channel command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    /// AINx against AINCOM.
    #[default]
    SingleEnded,
    /// Fixed P/N pin pairs.
    Differential,
}

/// Sign-extend a 24-bit two's-complement word to `i32`.
pub fn sign_extend_24(raw: u32) -> i32 {
    ((raw << 8) as i32) >> 8
}

/// ADS1256 driver.
///
/// Owns the reset and DRDY lines; chip-select belongs to the
/// [`SpiDevice`]. See the crate docs for the ownership contract.
pub struct Ads1256<SPI, RST, DRDY, D> {
    spi: SPI,
    rst: RST,
    drdy: DRDY,
    delay: D,
    mode: InputMode,
}

impl<SPI, RST, DRDY, D, PinE> Ads1256<SPI, RST, DRDY, D>
where
    SPI: SpiDevice,
    RST: OutputPin<Error = PinE>,
    DRDY: InputPin<Error = PinE>,
    D: DelayNs,
{
    /// Wrap the bus handles. No bus traffic until [`init`](Self::init).
    pub fn new(spi: SPI, rst: RST, drdy: DRDY, delay: D) -> Self {
        Self {
            spi,
            rst,
            drdy,
            delay,
            mode: InputMode::default(),
        }
    }

    /// Give back the bus handles.
    pub fn release(self) -> (SPI, RST, DRDY, D) {
        (self.spi, self.rst, self.drdy, self.delay)
    }

    /// Currently selected input mode.
    pub fn input_mode(&self) -> InputMode {
        self.mode
    }

    /// Full startup sequence: hardware reset, chip-id verification,
    /// default gain/rate configuration.
    ///
    /// An unexpected chip id is logged and tolerated; a failed id read
    /// (bus fault or DRDY timeout) aborts startup.
    pub fn init(&mut self, gain: Gain, rate: DataRate) -> Result<(), Error<SPI::Error, PinE>> {
        self.reset()?;
        self.delay.delay_ms(100);

        match self.read_chip_id() {
            Ok(CHIP_ID) => debug!(chip_id = CHIP_ID, "chip id verified"),
            Ok(other) => warn!(
                chip_id = other,
                expected = CHIP_ID,
                "unexpected chip id, continuing"
            ),
            Err(e) => return Err(e),
        }

        self.configure(gain, rate)?;
        info!(gain = gain.factor(), drate = rate.bits(), "ADS1256 ready");
        Ok(())
    }

    /// Hardware reset: RST high, 200 ms, low, 200 ms, high.
    pub fn reset(&mut self) -> Result<(), Error<SPI::Error, PinE>> {
        self.rst.set_high().map_err(Error::Pin)?;
        self.delay.delay_ms(200);
        self.rst.set_low().map_err(Error::Pin)?;
        self.delay.delay_ms(200);
        self.rst.set_high().map_err(Error::Pin)?;
        Ok(())
    }

    /// Poll DRDY (active-low) until asserted or `timeout` elapses.
    pub fn wait_ready(&mut self, timeout: Duration) -> Result<(), Error<SPI::Error, PinE>> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.drdy.is_low().map_err(Error::Pin)? {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(Error::ConversionTimeout);
            }
            self.delay.delay_us(DRDY_POLL_US);
        }
    }

    /// Read the chip id from the STATUS register top nibble.
    ///
    /// A read failure is distinct from a valid id of 0: failures surface
    /// as `Err`, never as a sentinel id.
    pub fn read_chip_id(&mut self) -> Result<u8, Error<SPI::Error, PinE>> {
        self.wait_ready(DRDY_TIMEOUT)?;
        let status = self.read_register(Register::Status)?;
        Ok(status >> 4)
    }

    /// Configure gain and data rate.
    ///
    /// STATUS, MUX, ADCON, and DRATE are written as one 4-register burst
    /// inside a single chip-select window, so a concurrent conversion
    /// never observes a partially configured device.
    pub fn configure(
        &mut self,
        gain: Gain,
        rate: DataRate,
    ) -> Result<(), Error<SPI::Error, PinE>> {
        self.wait_ready(DRDY_TIMEOUT)?;

        let buf = [
            Command::Wreg.opcode() | Register::Status.addr(),
            0x03, // register count - 1
            1 << 2, // STATUS: MSB first, auto-calibration on, buffer off
            0x08, // MUX: AIN0 vs AINCOM until a channel is selected
            gain.code(), // ADCON: clock out off, sensor detect off
            rate.bits(),
        ];
        self.spi.write(&buf).map_err(Error::Spi)?;
        self.delay.delay_ms(1);
        Ok(())
    }

    /// Select single-ended input `channel` (0-7) against AINCOM.
    pub fn set_channel(&mut self, channel: u8) -> Result<(), Error<SPI::Error, PinE>> {
        if channel > 7 {
            return Err(Error::InvalidChannel(channel));
        }
        self.write_register(Register::Mux, (channel << 4) | 0x08)?;
        self.mode = InputMode::SingleEnded;
        Ok(())
    }

    /// Select differential pair `pair` (0-3): P = AIN(2p), N = AIN(2p+1).
    pub fn set_diff_pair(&mut self, pair: u8) -> Result<(), Error<SPI::Error, PinE>> {
        if pair > 3 {
            return Err(Error::InvalidPair(pair));
        }
        let positive = pair * 2;
        self.write_register(Register::Mux, (positive << 4) | (positive + 1))?;
        self.mode = InputMode::Differential;
        Ok(())
    }

    /// Commit the currently selected mux with SYNC/WAKEUP and read one
    /// conversion.
    pub fn read_conversion(&mut self) -> Result<i32, Error<SPI::Error, PinE>> {
        self.write_command(Command::Sync)?;
        self.write_command(Command::Wakeup)?;
        self.read_current()
    }

    /// Read the latest completed conversion on the already-selected
    /// channel, without re-issuing SYNC/WAKEUP.
    ///
    /// This is the low-overhead path for a fixed single channel. Never
    /// returns a partially read value: a DRDY timeout yields
    /// [`Error::ConversionTimeout`] before any data bytes are clocked.
    pub fn read_current(&mut self) -> Result<i32, Error<SPI::Error, PinE>> {
        self.wait_ready(DRDY_TIMEOUT)?;
        let mut data = [0u8; 3];
        self.spi
            .transaction(&mut [
                Operation::Write(&[Command::Rdata.opcode()]),
                Operation::Read(&mut data),
            ])
            .map_err(Error::Spi)?;
        let raw = (u32::from(data[0]) << 16) | (u32::from(data[1]) << 8) | u32::from(data[2]);
        Ok(sign_extend_24(raw))
    }

    /// Read all 8 single-ended channels in order.
    ///
    /// When differential mode is active this returns an empty vector with
    /// a warning; intentional behavior, not an error.
    pub fn read_all_channels(&mut self) -> Result<Vec<i32>, Error<SPI::Error, PinE>> {
        if self.mode == InputMode::Differential {
            warn!("read_all_channels called while differential mode is active");
            return Ok(Vec::new());
        }
        let mut codes = Vec::with_capacity(8);
        for channel in 0..8 {
            self.set_channel(channel)?;
            codes.push(self.read_conversion()?);
        }
        Ok(codes)
    }

    /// Enter standby mode.
    pub fn standby(&mut self) -> Result<(), Error<SPI::Error, PinE>> {
        self.write_command(Command::Standby)
    }

    /// Run offset and gain self-calibration and wait for completion.
    pub fn self_calibrate(&mut self) -> Result<(), Error<SPI::Error, PinE>> {
        self.write_command(Command::SelfCal)?;
        self.wait_ready(DRDY_TIMEOUT)
    }

    fn write_command(&mut self, cmd: Command) -> Result<(), Error<SPI::Error, PinE>> {
        self.spi.write(&[cmd.opcode()]).map_err(Error::Spi)
    }

    fn write_register(
        &mut self,
        reg: Register,
        value: u8,
    ) -> Result<(), Error<SPI::Error, PinE>> {
        self.spi
            .write(&[Command::Wreg.opcode() | reg.addr(), 0x00, value])
            .map_err(Error::Spi)
    }

    fn read_register(&mut self, reg: Register) -> Result<u8, Error<SPI::Error, PinE>> {
        let mut data = [0u8; 1];
        self.spi
            .transaction(&mut [
                Operation::Write(&[Command::Rreg.opcode() | reg.addr(), 0x00]),
                Operation::Read(&mut data),
            ])
            .map_err(Error::Spi)?;
        Ok(data[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::convert::Infallible;

    /// Scripted SPI double: records every chip-select transaction's
    /// written bytes and serves queued read payloads.
    #[derive(Default)]
    struct MockSpi {
        transactions: Vec<Vec<u8>>,
        reads: VecDeque<Vec<u8>>,
    }

    impl MockSpi {
        fn queue_read(&mut self, data: &[u8]) {
            self.reads.push_back(data.to_vec());
        }
    }

    impl embedded_hal::spi::ErrorType for MockSpi {
        type Error = Infallible;
    }

    impl SpiDevice for MockSpi {
        fn transaction(
            &mut self,
            operations: &mut [Operation<'_, u8>],
        ) -> Result<(), Self::Error> {
            let mut written = Vec::new();
            for op in operations.iter_mut() {
                match op {
                    Operation::Write(bytes) => written.extend_from_slice(bytes),
                    Operation::Read(buf) => {
                        let data = self.reads.pop_front().unwrap_or_else(|| vec![0; buf.len()]);
                        buf.copy_from_slice(&data[..buf.len()]);
                    }
                    _ => {}
                }
            }
            self.transactions.push(written);
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockPin {
        /// Recorded output transitions (true = high).
        writes: Vec<bool>,
        /// Scripted input levels; exhausted defaults to low (DRDY ready).
        levels: VecDeque<bool>,
    }

    impl embedded_hal::digital::ErrorType for MockPin {
        type Error = Infallible;
    }

    impl OutputPin for MockPin {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.writes.push(false);
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.writes.push(true);
            Ok(())
        }
    }

    impl InputPin for MockPin {
        fn is_high(&mut self) -> Result<bool, Self::Error> {
            Ok(self.levels.pop_front().unwrap_or(false))
        }

        fn is_low(&mut self) -> Result<bool, Self::Error> {
            self.is_high().map(|h| !h)
        }
    }

    struct NoDelay;

    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    fn driver() -> Ads1256<MockSpi, MockPin, MockPin, NoDelay> {
        Ads1256::new(
            MockSpi::default(),
            MockPin::default(),
            MockPin::default(),
            NoDelay,
        )
    }

    #[test]
    fn test_sign_extension() {
        assert_eq!(sign_extend_24(0xFFFFFF), -1);
        assert_eq!(sign_extend_24(0x800000), -8_388_608);
        assert_eq!(sign_extend_24(0x000001), 1);
        assert_eq!(sign_extend_24(0x7FFFFF), 8_388_607);
        assert_eq!(sign_extend_24(0), 0);
    }

    #[test]
    fn test_reset_toggles_line() {
        let mut adc = driver();
        adc.reset().unwrap();
        let (_, rst, _, _) = adc.release();
        assert_eq!(rst.writes, vec![true, false, true]);
    }

    #[test]
    fn test_set_channel_writes_mux() {
        let mut adc = driver();
        adc.set_channel(2).unwrap();
        let (spi, _, _, _) = adc.release();
        assert_eq!(spi.transactions, vec![vec![0x51, 0x00, (2 << 4) | 0x08]]);
    }

    #[test]
    fn test_set_channel_out_of_range_no_bus_write() {
        let mut adc = driver();
        assert!(matches!(adc.set_channel(8), Err(Error::InvalidChannel(8))));
        let (spi, _, _, _) = adc.release();
        assert!(spi.transactions.is_empty());
    }

    #[test]
    fn test_diff_pair_mapping() {
        let mut adc = driver();
        adc.set_diff_pair(0).unwrap();
        adc.set_diff_pair(3).unwrap();
        assert_eq!(adc.input_mode(), InputMode::Differential);
        let (spi, _, _, _) = adc.release();
        // pair 0 -> P=AIN0, N=AIN1; pair 3 -> P=AIN6, N=AIN7
        assert_eq!(spi.transactions[0], vec![0x51, 0x00, 0x01]);
        assert_eq!(spi.transactions[1], vec![0x51, 0x00, 0x67]);
    }

    #[test]
    fn test_diff_pair_out_of_range_no_bus_write() {
        let mut adc = driver();
        assert!(matches!(adc.set_diff_pair(4), Err(Error::InvalidPair(4))));
        let (spi, _, _, _) = adc.release();
        assert!(spi.transactions.is_empty());
    }

    #[test]
    fn test_configure_is_single_burst() {
        let mut adc = driver();
        adc.configure(Gain::X4, DataRate::Sps1000).unwrap();
        let (spi, _, _, _) = adc.release();
        assert_eq!(
            spi.transactions,
            vec![vec![0x50, 0x03, 0x04, 0x08, 0x02, 0xA1]]
        );
    }

    #[test]
    fn test_read_conversion_sequence_and_assembly() {
        let mut adc = driver();
        adc.spi.queue_read(&[0x12, 0x34, 0x56]);
        let code = adc.read_conversion().unwrap();
        assert_eq!(code, 0x123456);
        let (spi, _, _, _) = adc.release();
        // SYNC, WAKEUP, then RDATA with the 3-byte read in one window.
        assert_eq!(spi.transactions[0], vec![0xFC]);
        assert_eq!(spi.transactions[1], vec![0x00]);
        assert_eq!(spi.transactions[2], vec![0x01]);
    }

    #[test]
    fn test_read_conversion_negative() {
        let mut adc = driver();
        adc.spi.queue_read(&[0xFF, 0xFF, 0xFF]);
        assert_eq!(adc.read_conversion().unwrap(), -1);
    }

    #[test]
    fn test_wait_ready_timeout_is_recoverable() {
        let mut adc = driver();
        // DRDY held high (not ready) long enough to exhaust the timeout.
        for _ in 0..64 {
            adc.drdy.levels.push_back(true);
        }
        let err = adc.wait_ready(Duration::from_millis(0)).unwrap_err();
        assert!(matches!(err, Error::ConversionTimeout));
        // A later read with DRDY asserted succeeds.
        adc.spi.queue_read(&[0x00, 0x00, 0x01]);
        assert_eq!(adc.read_current().unwrap(), 1);
    }

    #[test]
    fn test_read_chip_id_top_nibble() {
        let mut adc = driver();
        adc.spi.queue_read(&[0x30]);
        assert_eq!(adc.read_chip_id().unwrap(), 3);
    }

    #[test]
    fn test_read_all_channels_rejected_in_diff_mode() {
        let mut adc = driver();
        adc.set_diff_pair(1).unwrap();
        let writes_before = adc.spi.transactions.len();
        let codes = adc.read_all_channels().unwrap();
        assert!(codes.is_empty());
        assert_eq!(adc.spi.transactions.len(), writes_before);
    }

    #[test]
    fn test_read_all_channels_single_ended() {
        let mut adc = driver();
        for i in 0..8u8 {
            adc.spi.queue_read(&[0x00, 0x00, i]);
        }
        let codes = adc.read_all_channels().unwrap();
        assert_eq!(codes, (0..8).collect::<Vec<i32>>());
    }
}
