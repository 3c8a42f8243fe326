//! Monotonic clock traits.
//!
//! Bus and pulse timing needs sub-millisecond precision, so the drivers spin
//! against a free-running microsecond counter (a cycle counter divided by the
//! core clock on real hardware) instead of sleeping. Scheduling and rate
//! limiting use a coarse millisecond tick. Both counters wrap; all
//! comparisons go through `wrapping_sub`.

/// Free-running microsecond counter.
///
/// Implementations read a hardware cycle counter; the value wraps at
/// `u32::MAX` (about 71 minutes), which is fine because every interval the
/// drivers measure is a few milliseconds at most.
pub trait MicrosClock {
    fn now_us(&self) -> u32;

    /// Busy-wait for `us` microseconds. Deliberately a spin loop: the pulse
    /// widths being generated are shorter than any sleep granularity.
    fn delay_us(&self, us: u32) {
        let start = self.now_us();
        while self.now_us().wrapping_sub(start) < us {
            core::hint::spin_loop();
        }
    }
}

/// Millisecond tick source (wall-clock since boot, wrapping).
pub trait MillisClock {
    fn now_ms(&self) -> u32;
}

impl<C: MicrosClock> MicrosClock for &C {
    fn now_us(&self) -> u32 {
        (*self).now_us()
    }
}

impl<C: MillisClock> MillisClock for &C {
    fn now_ms(&self) -> u32 {
        (*self).now_ms()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    /// Test clock that advances a fixed step on every read, so spin loops
    /// terminate deterministically.
    struct SteppingClock {
        t_us: Cell<u32>,
        step: u32,
    }

    impl MicrosClock for SteppingClock {
        fn now_us(&self) -> u32 {
            let t = self.t_us.get();
            self.t_us.set(t.wrapping_add(self.step));
            t
        }
    }

    #[test]
    fn delay_us_spins_past_target() {
        let clock = SteppingClock {
            t_us: Cell::new(0),
            step: 3,
        };
        clock.delay_us(100);
        assert!(clock.t_us.get() >= 100);
    }

    #[test]
    fn delay_us_handles_counter_wrap() {
        let clock = SteppingClock {
            t_us: Cell::new(u32::MAX - 10),
            step: 3,
        };
        clock.delay_us(50);
        // Wrapped through zero without hanging.
        assert!(clock.t_us.get() < 100);
    }
}
