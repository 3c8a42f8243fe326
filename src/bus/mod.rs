//! Software-bitbanged I2C master.
//!
//! Drives a push-pull clock line and an open-drain data line through the
//! `embedded-hal` digital traits. The open-drain data line is modelled the
//! usual way: `set_high` releases the line (the external pull-up raises it),
//! `set_low` drives it, and the pin doubles as an input for ACK and data
//! sampling.
//!
//! Timing is deliberately slow (hundreds of microseconds per half-bit) to
//! tolerate a noisy, high-capacitance field harness; the exact values are a
//! deployment parameter carried in [`BusTiming`].
//!
//! ## Failure contract
//!
//! Any unacknowledged byte aborts the transaction immediately with
//! [`BusError::Nack`] *after* cleanly issuing a stop, so the bus is released
//! and the next transaction starts from idle. The engine never retries —
//! retry policy belongs to the caller.

use embedded_hal::digital::{InputPin, OutputPin};

use crate::error::BusError;
use crate::time::MicrosClock;

// ── Seam trait ────────────────────────────────────────────────

/// Byte-level bus operations, so device drivers (light sensor, self-test)
/// do not care which engine implements them.
pub trait I2cBus {
    /// Write `data` to the 7-bit address.
    fn write(&mut self, addr7: u8, data: &[u8]) -> Result<(), BusError>;

    /// Fill `buf` from the 7-bit address.
    fn read(&mut self, addr7: u8, buf: &mut [u8]) -> Result<(), BusError>;

    /// Address-only transaction: start, one address byte, observe the ACK,
    /// stop. Side-effect-free on the bus state.
    fn probe(&mut self, addr7: u8) -> Result<bool, BusError>;
}

// ── Timing ────────────────────────────────────────────────────

/// Half-bit delays in microseconds.
#[derive(Debug, Clone, Copy)]
pub struct BusTiming {
    /// Data setup time before a clock edge.
    pub setup_us: u32,
    /// Start-condition hold time.
    pub hold_us: u32,
    /// Clock low period.
    pub low_us: u32,
    /// Clock high period.
    pub high_us: u32,
    /// Wait for the released data line to rise through the pull-up RC.
    pub rise_us: u32,
}

impl Default for BusTiming {
    /// Ultra-slow profile for heavily loaded lines.
    fn default() -> Self {
        Self {
            setup_us: 50,
            hold_us: 50,
            low_us: 500,
            high_us: 500,
            rise_us: 1000,
        }
    }
}

// ── Engine ────────────────────────────────────────────────────

pub struct SoftI2c<SCL, SDA, C> {
    scl: SCL,
    sda: SDA,
    clock: C,
    timing: BusTiming,
}

impl<SCL, SDA, C> SoftI2c<SCL, SDA, C>
where
    SCL: OutputPin,
    SDA: InputPin + OutputPin,
    C: MicrosClock,
{
    pub fn new(scl: SCL, sda: SDA, clock: C) -> Self {
        Self::with_timing(scl, sda, clock, BusTiming::default())
    }

    pub fn with_timing(scl: SCL, sda: SDA, clock: C, timing: BusTiming) -> Self {
        Self {
            scl,
            sda,
            clock,
            timing,
        }
    }

    /// Release both lines and check that the data line settles high.
    /// A stuck-low data line means a dead bus or missing pull-up.
    pub fn bus_idle(&mut self) -> Result<bool, BusError> {
        self.scl_high()?;
        self.sda_release()?;
        self.clock.delay_us(self.timing.rise_us);
        self.sda_read()
    }

    // ── Line primitives ───────────────────────────────────────

    fn scl_high(&mut self) -> Result<(), BusError> {
        self.scl.set_high().map_err(|_| BusError::Gpio)
    }

    fn scl_low(&mut self) -> Result<(), BusError> {
        self.scl.set_low().map_err(|_| BusError::Gpio)
    }

    /// Open-drain release: high-impedance, pulled up externally.
    fn sda_release(&mut self) -> Result<(), BusError> {
        self.sda.set_high().map_err(|_| BusError::Gpio)
    }

    fn sda_low(&mut self) -> Result<(), BusError> {
        self.sda.set_low().map_err(|_| BusError::Gpio)
    }

    fn sda_read(&mut self) -> Result<bool, BusError> {
        self.sda.is_high().map_err(|_| BusError::Gpio)
    }

    // ── Protocol primitives ───────────────────────────────────

    /// START: data falls while the clock is high.
    fn start(&mut self) -> Result<(), BusError> {
        self.scl_high()?;
        self.sda_release()?;
        self.clock.delay_us(self.timing.rise_us);
        self.sda_low()?;
        self.clock.delay_us(self.timing.hold_us);
        self.scl_low()?;
        self.clock.delay_us(self.timing.low_us);
        Ok(())
    }

    /// STOP: data rises while the clock is high.
    fn stop(&mut self) -> Result<(), BusError> {
        self.sda_low()?;
        self.clock.delay_us(self.timing.setup_us);
        self.scl_high()?;
        self.clock.delay_us(self.timing.high_us);
        self.sda_release()?;
        self.clock.delay_us(self.timing.rise_us);
        Ok(())
    }

    fn write_bit(&mut self, bit: bool) -> Result<(), BusError> {
        if bit {
            self.sda_release()?;
            self.clock.delay_us(self.timing.rise_us);
        } else {
            self.sda_low()?;
            self.clock.delay_us(self.timing.setup_us);
        }
        self.scl_high()?;
        self.clock.delay_us(self.timing.high_us);
        self.scl_low()?;
        self.clock.delay_us(self.timing.low_us);
        Ok(())
    }

    fn read_bit(&mut self) -> Result<bool, BusError> {
        self.sda_release()?;
        self.clock.delay_us(self.timing.rise_us);
        self.scl_high()?;
        self.clock.delay_us(self.timing.high_us);
        let bit = self.sda_read()?;
        self.scl_low()?;
        self.clock.delay_us(self.timing.low_us);
        Ok(bit)
    }

    /// Clock out one byte MSB-first, then sample the ACK bit.
    /// Returns `true` if the receiver acknowledged (pulled the line low).
    fn write_byte(&mut self, value: u8) -> Result<bool, BusError> {
        for i in (0..8).rev() {
            self.write_bit(value & (1 << i) != 0)?;
        }
        Ok(!self.read_bit()?)
    }

    /// Clock in one byte MSB-first, then drive the ACK bit ourselves:
    /// low to request more, released on the final byte of a read.
    fn read_byte(&mut self, ack: bool) -> Result<u8, BusError> {
        let mut value = 0u8;
        for _ in 0..8 {
            value = (value << 1) | u8::from(self.read_bit()?);
        }
        self.write_bit(!ack)?;
        Ok(value)
    }

    // ── Transactions ──────────────────────────────────────────

    fn write_impl(&mut self, addr7: u8, data: &[u8]) -> Result<(), BusError> {
        self.start()?;
        if !self.write_byte(addr7 << 1)? {
            self.stop()?;
            return Err(BusError::Nack);
        }
        for &byte in data {
            if !self.write_byte(byte)? {
                self.stop()?;
                return Err(BusError::Nack);
            }
        }
        self.stop()
    }

    fn read_impl(&mut self, addr7: u8, buf: &mut [u8]) -> Result<(), BusError> {
        self.start()?;
        if !self.write_byte((addr7 << 1) | 1)? {
            self.stop()?;
            return Err(BusError::Nack);
        }
        let last = buf.len().saturating_sub(1);
        for (i, slot) in buf.iter_mut().enumerate() {
            *slot = self.read_byte(i < last)?;
        }
        self.stop()
    }

    fn probe_impl(&mut self, addr7: u8) -> Result<bool, BusError> {
        self.start()?;
        let ack = self.write_byte(addr7 << 1)?;
        self.stop()?;
        Ok(ack)
    }
}

impl<SCL, SDA, C> I2cBus for SoftI2c<SCL, SDA, C>
where
    SCL: OutputPin,
    SDA: InputPin + OutputPin,
    C: MicrosClock,
{
    fn write(&mut self, addr7: u8, data: &[u8]) -> Result<(), BusError> {
        self.write_impl(addr7, data)
    }

    fn read(&mut self, addr7: u8, buf: &mut [u8]) -> Result<(), BusError> {
        self.read_impl(addr7, buf)
    }

    fn probe(&mut self, addr7: u8) -> Result<bool, BusError> {
        self.probe_impl(addr7)
    }
}
