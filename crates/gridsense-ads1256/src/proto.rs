// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! ADS1256 protocol constants
//!
//! Command opcodes, register addresses, gain codes, and the DRATE lookup
//! table. These are fixed by the hardware (datasheet tables 23/24), so
//! they are plain enums rather than runtime maps.

/// SPI command opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    /// Complete SYNC and exit standby mode.
    Wakeup = 0x00,
    /// Read one conversion result.
    Rdata = 0x01,
    /// Read data continuously.
    Rdatac = 0x03,
    /// Stop reading data continuously.
    Sdatac = 0x0F,
    /// Read from register (OR with register address).
    Rreg = 0x10,
    /// Write to register (OR with register address).
    Wreg = 0x50,
    /// Offset and gain self-calibration.
    SelfCal = 0xF0,
    /// Offset self-calibration.
    SelfOCal = 0xF1,
    /// Gain self-calibration.
    SelfGCal = 0xF2,
    /// System offset calibration.
    SysOCal = 0xF3,
    /// System gain calibration.
    SysGCal = 0xF4,
    /// Synchronize the A/D conversion.
    Sync = 0xFC,
    /// Enter standby mode.
    Standby = 0xFD,
    /// Reset to power-up register values.
    Reset = 0xFE,
}

impl Command {
    /// Opcode byte as sent on the wire.
    pub fn opcode(self) -> u8 {
        self as u8
    }
}

/// Register addresses 0-10.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Register {
    Status = 0x00,
    Mux = 0x01,
    Adcon = 0x02,
    Drate = 0x03,
    Io = 0x04,
    Ofc0 = 0x05,
    Ofc1 = 0x06,
    Ofc2 = 0x07,
    Fsc0 = 0x08,
    Fsc1 = 0x09,
    Fsc2 = 0x0A,
}

impl Register {
    /// Register address.
    pub fn addr(self) -> u8 {
        self as u8
    }
}

/// Programmable gain amplifier setting, codes 0-6 mapping to x1..x64.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Gain {
    X1 = 0,
    X2 = 1,
    X4 = 2,
    X8 = 3,
    X16 = 4,
    X32 = 5,
    X64 = 6,
}

impl Gain {
    /// ADCON register gain code.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Gain from its register code (0-6).
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Gain::X1),
            1 => Some(Gain::X2),
            2 => Some(Gain::X4),
            3 => Some(Gain::X8),
            4 => Some(Gain::X16),
            5 => Some(Gain::X32),
            6 => Some(Gain::X64),
            _ => None,
        }
    }

    /// Amplification factor.
    pub fn factor(self) -> u8 {
        1 << self.code()
    }
}

/// Output data rate, with the DRATE register byte fixed per datasheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DataRate {
    Sps30000 = 0xF0,
    Sps15000 = 0xE0,
    Sps7500 = 0xD0,
    Sps3750 = 0xC0,
    Sps2000 = 0xB0,
    Sps1000 = 0xA1,
    Sps500 = 0x92,
    Sps100 = 0x82,
    Sps60 = 0x72,
    Sps50 = 0x63,
    Sps30 = 0x53,
    Sps25 = 0x43,
    Sps15 = 0x33,
    Sps10 = 0x20,
    Sps5 = 0x13,
    /// 2.5 samples per second.
    Sps2p5 = 0x03,
}

impl DataRate {
    /// DRATE register byte.
    pub fn bits(self) -> u8 {
        self as u8
    }

    /// Rate from an integer samples-per-second value.
    ///
    /// Returns `None` for rates the hardware does not support (and for
    /// 2.5 SPS, which has no integer representation; use
    /// [`DataRate::Sps2p5`] directly).
    pub fn from_sps(sps: u32) -> Option<Self> {
        match sps {
            30000 => Some(DataRate::Sps30000),
            15000 => Some(DataRate::Sps15000),
            7500 => Some(DataRate::Sps7500),
            3750 => Some(DataRate::Sps3750),
            2000 => Some(DataRate::Sps2000),
            1000 => Some(DataRate::Sps1000),
            500 => Some(DataRate::Sps500),
            100 => Some(DataRate::Sps100),
            60 => Some(DataRate::Sps60),
            50 => Some(DataRate::Sps50),
            30 => Some(DataRate::Sps30),
            25 => Some(DataRate::Sps25),
            15 => Some(DataRate::Sps15),
            10 => Some(DataRate::Sps10),
            5 => Some(DataRate::Sps5),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_opcodes() {
        assert_eq!(Command::Wakeup.opcode(), 0x00);
        assert_eq!(Command::Rdata.opcode(), 0x01);
        assert_eq!(Command::Rdatac.opcode(), 0x03);
        assert_eq!(Command::Sdatac.opcode(), 0x0F);
        assert_eq!(Command::Rreg.opcode(), 0x10);
        assert_eq!(Command::Wreg.opcode(), 0x50);
        assert_eq!(Command::SelfCal.opcode(), 0xF0);
        assert_eq!(Command::Sync.opcode(), 0xFC);
        assert_eq!(Command::Standby.opcode(), 0xFD);
        assert_eq!(Command::Reset.opcode(), 0xFE);
    }

    #[test]
    fn test_register_addresses() {
        assert_eq!(Register::Status.addr(), 0);
        assert_eq!(Register::Mux.addr(), 1);
        assert_eq!(Register::Adcon.addr(), 2);
        assert_eq!(Register::Drate.addr(), 3);
        assert_eq!(Register::Fsc2.addr(), 10);
    }

    #[test]
    fn test_gain_codes() {
        assert_eq!(Gain::X1.code(), 0);
        assert_eq!(Gain::X64.code(), 6);
        assert_eq!(Gain::X64.factor(), 64);
        assert_eq!(Gain::from_code(3), Some(Gain::X8));
        assert_eq!(Gain::from_code(7), None);
    }

    #[test]
    fn test_drate_table() {
        assert_eq!(DataRate::Sps30000.bits(), 0xF0);
        assert_eq!(DataRate::Sps2000.bits(), 0xB0);
        assert_eq!(DataRate::Sps1000.bits(), 0xA1);
        assert_eq!(DataRate::Sps100.bits(), 0x82);
        assert_eq!(DataRate::Sps2p5.bits(), 0x03);
        assert_eq!(DataRate::from_sps(1000), Some(DataRate::Sps1000));
        assert_eq!(DataRate::from_sps(2000), Some(DataRate::Sps2000));
        assert_eq!(DataRate::from_sps(1234), None);
    }
}
