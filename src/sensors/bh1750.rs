//! BH1750 ambient-light sensor over the bit-banged bus.
//!
//! The part straps to one of two addresses depending on its ADDR pin;
//! initialisation tries the preferred address and falls back to the other
//! one automatically, so the same firmware runs on both board revisions.
//! Raw counts convert to lux by the datasheet factor 1.2.

use crate::bus::I2cBus;
use crate::error::BusError;
use crate::time::MillisClock;

/// ADDR pin low.
pub const ADDR_LO: u8 = 0x23;
/// ADDR pin high.
pub const ADDR_HI: u8 = 0x5C;

const CMD_POWER_ON: u8 = 0x01;
const CMD_RESET: u8 = 0x07;

/// Measurement mode opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Mode {
    ContHiRes = 0x10,
    ContHiRes2 = 0x11,
    ContLoRes = 0x13,
    OneShotHiRes = 0x20,
    OneShotHiRes2 = 0x21,
    OneShotLoRes = 0x23,
}

impl Mode {
    pub const fn code(self) -> u8 {
        self as u8
    }

    pub const fn is_one_shot(self) -> bool {
        self.code() & 0x20 != 0
    }

    /// Worst-case conversion time, padded for the slow bus.
    pub const fn conversion_ms(self) -> u32 {
        match self {
            Self::ContLoRes | Self::OneShotLoRes => 30,
            _ => 180,
        }
    }
}

pub struct Bh1750 {
    addr: u8,
    mode: Mode,
}

impl Bh1750 {
    /// Power on (with address fallback), reset, and set the working mode.
    pub fn init<B: I2cBus>(bus: &mut B, prefer_addr: u8, mode: Mode) -> Result<Self, BusError> {
        let mut addr = prefer_addr;
        if bus.write(addr, &[CMD_POWER_ON]).is_err() {
            addr = if prefer_addr == ADDR_LO { ADDR_HI } else { ADDR_LO };
            bus.write(addr, &[CMD_POWER_ON])?;
        }
        bus.write(addr, &[CMD_RESET])?;
        bus.write(addr, &[mode.code()])?;
        Ok(Self { addr, mode })
    }

    /// Address the device actually answered on.
    pub fn address(&self) -> u8 {
        self.addr
    }

    /// Read the light level in lux.
    ///
    /// One-shot modes trigger a conversion and busy-wait for it to finish;
    /// continuous modes read the latest result directly.
    pub fn read_lux<B: I2cBus, C: MillisClock>(
        &self,
        bus: &mut B,
        clock: &C,
    ) -> Result<f32, BusError> {
        if self.mode.is_one_shot() {
            bus.write(self.addr, &[self.mode.code()])?;
            let start = clock.now_ms();
            while clock.now_ms().wrapping_sub(start) < self.mode.conversion_ms() {
                core::hint::spin_loop();
            }
        }

        let mut buf = [0u8; 2];
        bus.read(self.addr, &mut buf)?;
        let raw = u16::from_be_bytes(buf);
        Ok(f32::from(raw) / 1.2)
    }
}
