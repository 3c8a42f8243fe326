//! Power-on self test.
//!
//! Runs once at boot, before the control loop: checks the supply rail,
//! probes both light-sensor addresses and takes one reading, and attempts a
//! few environment reads (the sensor needs its warm-up window, so failures
//! here are advisory). The report is rendered on the boot screen by the
//! embedding binary.

/// Accepted supply window for a 3.3 V rail fed from 5 V.
pub const VDD_MIN_MV: u16 = 3000;
pub const VDD_MAX_MV: u16 = 3600;

pub fn vdd_in_range(mv: u16) -> bool {
    (VDD_MIN_MV..=VDD_MAX_MV).contains(&mv)
}

/// Outcome of the boot-time hardware check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelfTestReport {
    pub vdd_mv: u16,
    pub vdd_ok: bool,
    /// Both bus lines settle high when released (pull-ups present, no
    /// stuck device). Address probing is skipped when this fails.
    pub bus_idle: bool,
    /// A light sensor acknowledged one of its two addresses.
    pub light_found: bool,
    /// The address it answered on (0 when not found).
    pub light_addr: u8,
    /// Initialisation and a first reading succeeded.
    pub light_read_ok: bool,
    /// At least one environment read attempt produced a valid frame.
    pub env_ok: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vdd_window() {
        assert!(vdd_in_range(3300));
        assert!(vdd_in_range(3000));
        assert!(vdd_in_range(3600));
        assert!(!vdd_in_range(2999));
        assert!(!vdd_in_range(3601));
    }
}
