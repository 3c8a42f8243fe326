//! DHT11 single-wire pulse decoder.
//!
//! The sensor shares one open-drain line with the MCU: the host drives it
//! low for tens of milliseconds to request a measurement, releases it, and
//! the sensor answers with an ~80 µs low / ~80 µs high handshake followed by
//! 40 self-timed bit pulses. Bit value is encoded in the *high* phase width:
//! above [`DhtTiming::bit_one_threshold_us`] decodes as 1.
//!
//! All pulse widths are measured against the free-running microsecond
//! counter — they are far shorter than one millisecond tick.
//!
//! ## Rate limiting
//!
//! Reads are refused ([`SensorError::Busy`]) during the power-on warm-up
//! window and inside the minimum inter-read spacing, without touching the
//! line. The spacing is keyed to the last *successful* read, so a caller may
//! retry a failed read immediately.

use embedded_hal::digital::{InputPin, OutputPin};

use crate::error::SensorError;
use crate::time::{MicrosClock, MillisClock};

// ── Reading ───────────────────────────────────────────────────

/// One validated measurement. Integer-valued: the frame reserves fractional
/// bytes but this sensor always reports them as zero, so they are checksummed
/// and discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvReading {
    pub humidity_pct: u8,
    pub temperature_c: u8,
}

/// Validate a 40-bit frame: byte 4 must equal the truncated sum of bytes
/// 0..4. On success the reading is byte 0 (humidity) and byte 2
/// (temperature); a mismatch discards the whole frame.
pub fn decode_frame(bytes: &[u8; 5]) -> Result<EnvReading, SensorError> {
    let sum = bytes[0]
        .wrapping_add(bytes[1])
        .wrapping_add(bytes[2])
        .wrapping_add(bytes[3]);
    if sum != bytes[4] {
        return Err(SensorError::ChecksumMismatch);
    }
    Ok(EnvReading {
        humidity_pct: bytes[0],
        temperature_c: bytes[2],
    })
}

// ── Timing ────────────────────────────────────────────────────

/// Protocol timing, a deployment parameter. Thresholds are deliberately
/// looser than nominal to tolerate jitter on a long harness.
#[derive(Debug, Clone, Copy)]
pub struct DhtTiming {
    /// No reads before this much time since power-on (ms).
    pub warmup_ms: u32,
    /// Minimum spacing between successful reads (ms).
    pub min_interval_ms: u32,
    /// Line-health settle time with the pull-up enabled (µs).
    pub line_check_us: u32,
    /// Host start pulse width (µs).
    pub start_low_us: u32,
    /// Settle after releasing the start pulse (µs).
    pub settle_us: u32,
    /// Deadline for each response handshake phase (µs).
    pub response_timeout_us: u32,
    /// Minimum accepted duration of each handshake phase (µs).
    pub response_min_us: u32,
    /// Deadline for each bit's low phase (µs).
    pub bit_low_timeout_us: u32,
    /// Minimum accepted bit low phase (µs).
    pub bit_low_min_us: u32,
    /// Deadline for each bit's high phase (µs).
    pub bit_high_timeout_us: u32,
    /// High phase longer than this decodes as a 1 bit (µs).
    pub bit_one_threshold_us: u32,
}

impl Default for DhtTiming {
    fn default() -> Self {
        Self {
            warmup_ms: 1500,
            min_interval_ms: 1000,
            line_check_us: 1000,
            start_low_us: 25_000,
            settle_us: 30,
            response_timeout_us: 120,
            response_min_us: 60,
            bit_low_timeout_us: 100,
            bit_low_min_us: 30,
            bit_high_timeout_us: 120,
            bit_one_threshold_us: 45,
        }
    }
}

// ── Driver ────────────────────────────────────────────────────

pub struct Dht11<P, C> {
    pin: P,
    clock: C,
    timing: DhtTiming,
    last_read_ms: Option<u32>,
}

impl<P, C> Dht11<P, C>
where
    P: InputPin + OutputPin,
    C: MicrosClock + MillisClock,
{
    pub fn new(pin: P, clock: C) -> Self {
        Self::with_timing(pin, clock, DhtTiming::default())
    }

    pub fn with_timing(pin: P, clock: C, timing: DhtTiming) -> Self {
        Self {
            pin,
            clock,
            timing,
            last_read_ms: None,
        }
    }

    /// Run one full measurement cycle.
    pub fn read(&mut self) -> Result<EnvReading, SensorError> {
        let now = self.clock.now_ms();
        if now < self.timing.warmup_ms {
            return Err(SensorError::Busy);
        }
        if let Some(last) = self.last_read_ms {
            if now.wrapping_sub(last) < self.timing.min_interval_ms {
                return Err(SensorError::Busy);
            }
        }

        // Line health: with the pull-up enabled the line must read high; a
        // held-low line means the device is absent or miswired.
        self.release()?;
        self.clock.delay_us(self.timing.line_check_us);
        if !self.line_high()? {
            return Err(SensorError::LineHeldLow);
        }

        // Start: drive low, then release and let the sensor take over.
        self.pin.set_low().map_err(|_| SensorError::Gpio)?;
        self.clock.delay_us(self.timing.start_low_us);
        self.release()?;
        self.clock.delay_us(self.timing.settle_us);

        // Response handshake: ~80 µs low, ~80 µs high, loose thresholds.
        if self.pulse_in(false, self.timing.response_timeout_us)? < self.timing.response_min_us {
            return Err(SensorError::NoResponse);
        }
        if self.pulse_in(true, self.timing.response_timeout_us)? < self.timing.response_min_us {
            return Err(SensorError::NoResponse);
        }

        // 40 bits, MSB-first into 5 bytes.
        let mut bytes = [0u8; 5];
        for i in 0..40 {
            if self.pulse_in(false, self.timing.bit_low_timeout_us)? < self.timing.bit_low_min_us {
                return Err(SensorError::NoResponse);
            }
            let high_us = self.pulse_in(true, self.timing.bit_high_timeout_us)?;
            bytes[i / 8] <<= 1;
            bytes[i / 8] |= u8::from(high_us > self.timing.bit_one_threshold_us);
        }

        let reading = decode_frame(&bytes)?;
        self.last_read_ms = Some(self.clock.now_ms());
        Ok(reading)
    }

    // ── Line helpers ──────────────────────────────────────────

    fn release(&mut self) -> Result<(), SensorError> {
        self.pin.set_high().map_err(|_| SensorError::Gpio)
    }

    fn line_high(&mut self) -> Result<bool, SensorError> {
        self.pin.is_high().map_err(|_| SensorError::Gpio)
    }

    /// Wait for the line to reach `level`, then time how long it holds it.
    /// The entry wait and the hold measurement each get `timeout_us`.
    fn pulse_in(&mut self, level: bool, timeout_us: u32) -> Result<u32, SensorError> {
        let entry = self.clock.now_us();
        while self.line_high()? != level {
            if self.clock.now_us().wrapping_sub(entry) > timeout_us {
                return Err(SensorError::NoResponse);
            }
        }
        let start = self.clock.now_us();
        while self.line_high()? == level {
            if self.clock.now_us().wrapping_sub(start) > timeout_us {
                return Err(SensorError::NoResponse);
            }
        }
        Ok(self.clock.now_us().wrapping_sub(start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Simulated time step per clock read (µs). The busy-wait loops advance
    /// simulated time simply by reading the clock.
    const STEP_US: u32 = 2;

    #[derive(Debug, Clone, Copy)]
    struct Segment {
        start: u32,
        len: u32,
        high: bool,
    }

    struct SimState {
        t_us: u32,
        driven_low_since: Option<u32>,
        /// Set when the host releases the line after a full start pulse;
        /// the response schedule is anchored here.
        release_t: Option<u32>,
        schedule: Vec<Segment>,
        baseline_high: bool,
        drive_ops: u32,
    }

    #[derive(Clone)]
    struct Sim(Rc<RefCell<SimState>>);

    impl Sim {
        fn new(schedule: Vec<Segment>) -> Self {
            Self(Rc::new(RefCell::new(SimState {
                // Start well past the warm-up window.
                t_us: 2_000_000,
                driven_low_since: None,
                release_t: None,
                schedule,
                baseline_high: true,
                drive_ops: 0,
            })))
        }

        fn drive_ops(&self) -> u32 {
            self.0.borrow().drive_ops
        }
    }

    struct SimLine(Sim);
    struct SimClock(Sim);

    impl MicrosClock for SimClock {
        fn now_us(&self) -> u32 {
            let mut s = self.0 .0.borrow_mut();
            s.t_us = s.t_us.wrapping_add(STEP_US);
            s.t_us
        }
    }

    impl MillisClock for SimClock {
        fn now_ms(&self) -> u32 {
            self.0 .0.borrow().t_us / 1000
        }
    }

    impl embedded_hal::digital::ErrorType for SimLine {
        type Error = Infallible;
    }

    impl OutputPin for SimLine {
        fn set_low(&mut self) -> Result<(), Infallible> {
            let mut s = self.0 .0.borrow_mut();
            let t = s.t_us;
            s.driven_low_since = Some(t);
            s.drive_ops += 1;
            Ok(())
        }
        fn set_high(&mut self) -> Result<(), Infallible> {
            let mut s = self.0 .0.borrow_mut();
            let t = s.t_us;
            if let Some(since) = s.driven_low_since.take() {
                // A long-enough low pulse is a start request; the simulated
                // sensor begins its response schedule at the release point.
                if t.wrapping_sub(since) >= 15_000 {
                    s.release_t = Some(t);
                }
            }
            s.drive_ops += 1;
            Ok(())
        }
    }

    impl InputPin for SimLine {
        fn is_high(&mut self) -> Result<bool, Infallible> {
            let s = self.0 .0.borrow();
            if s.driven_low_since.is_some() {
                return Ok(false);
            }
            let Some(rt) = s.release_t else {
                return Ok(s.baseline_high);
            };
            let off = s.t_us.wrapping_sub(rt);
            for seg in &s.schedule {
                if off >= seg.start && off < seg.start + seg.len {
                    return Ok(seg.high);
                }
            }
            Ok(true)
        }
        fn is_low(&mut self) -> Result<bool, Infallible> {
            self.is_high().map(|h| !h)
        }
    }

    /// Build the sensor's response waveform for a 5-byte frame.
    fn schedule_for(bytes: [u8; 5]) -> Vec<Segment> {
        let mut segs = Vec::new();
        let mut t = 10; // sensor settle before the handshake
        segs.push(Segment {
            start: t,
            len: 85,
            high: false,
        });
        t += 85;
        segs.push(Segment {
            start: t,
            len: 80,
            high: true,
        });
        t += 80;
        for i in 0..40 {
            segs.push(Segment {
                start: t,
                len: 55,
                high: false,
            });
            t += 55;
            let one = bytes[i / 8] & (1 << (7 - i % 8)) != 0;
            let len = if one { 70 } else { 28 };
            segs.push(Segment {
                start: t,
                len,
                high: true,
            });
            t += len;
        }
        segs.push(Segment {
            start: t,
            len: 55,
            high: false,
        });
        segs
    }

    fn frame(h: u8, t: u8) -> [u8; 5] {
        [h, 0, t, 0, h.wrapping_add(t)]
    }

    fn driver(sim: &Sim) -> Dht11<SimLine, SimClock> {
        Dht11::new(SimLine(sim.clone()), SimClock(sim.clone()))
    }

    #[test]
    fn decodes_valid_frame() {
        let sim = Sim::new(schedule_for(frame(62, 27)));
        let mut dht = driver(&sim);
        let reading = dht.read().unwrap();
        assert_eq!(reading.humidity_pct, 62);
        assert_eq!(reading.temperature_c, 27);
    }

    #[test]
    fn corrupted_checksum_rejects_whole_frame() {
        let mut bytes = frame(62, 27);
        bytes[4] = bytes[4].wrapping_add(1);
        let sim = Sim::new(schedule_for(bytes));
        let mut dht = driver(&sim);
        assert_eq!(dht.read(), Err(SensorError::ChecksumMismatch));
    }

    #[test]
    fn refuses_before_warmup() {
        let sim = Sim::new(schedule_for(frame(50, 25)));
        sim.0.borrow_mut().t_us = 500_000; // 500 ms since power-on
        let mut dht = driver(&sim);
        assert_eq!(dht.read(), Err(SensorError::Busy));
        assert_eq!(sim.drive_ops(), 0, "busy result must not touch the line");
    }

    #[test]
    fn second_read_inside_spacing_is_busy_without_line_activity() {
        let sim = Sim::new(schedule_for(frame(50, 25)));
        let mut dht = driver(&sim);
        dht.read().unwrap();

        let ops_after_first = sim.drive_ops();
        assert_eq!(dht.read(), Err(SensorError::Busy));
        assert_eq!(sim.drive_ops(), ops_after_first);
    }

    #[test]
    fn held_low_line_aborts_immediately() {
        let sim = Sim::new(Vec::new());
        sim.0.borrow_mut().baseline_high = false;
        let mut dht = driver(&sim);
        assert_eq!(dht.read(), Err(SensorError::LineHeldLow));
    }

    #[test]
    fn missing_response_times_out() {
        // Healthy line but no device: it stays high after the start pulse.
        let sim = Sim::new(Vec::new());
        let mut dht = driver(&sim);
        assert_eq!(dht.read(), Err(SensorError::NoResponse));
    }

    #[test]
    fn failed_read_does_not_arm_spacing_limiter() {
        let sim = Sim::new(Vec::new());
        let mut dht = driver(&sim);
        assert_eq!(dht.read(), Err(SensorError::NoResponse));
        // An immediate retry must reach the line again (not be Busy).
        assert_eq!(dht.read(), Err(SensorError::NoResponse));
    }
}
