//! Temperature/humidity alarm derivation.
//!
//! Each quantity is tracked independently with a hysteresis band: the
//! abnormal flag trips when the reading reaches an outer threshold and
//! clears only strictly inside the band, so a reading sitting on the
//! boundary cannot chatter. Beeps are requested through distinct patterns
//! for "temperature only", "humidity only", and "both" (more urgent), each
//! gated by its own cooldown timer.

use heapless::Vec;
use log::{info, warn};

use crate::config::MonitorConfig;
use crate::sensors::dht11::EnvReading;

// ── Beep patterns ─────────────────────────────────────────────

/// A buzzer request: `times` pulses of `on_ms`/`off_ms` at `freq_hz`.
/// Playback is an external collaborator's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeepPattern {
    pub times: u8,
    pub on_ms: u16,
    pub off_ms: u16,
    pub freq_hz: u16,
}

/// Both quantities abnormal at once.
pub const BEEP_BOTH: BeepPattern = BeepPattern {
    times: 5,
    on_ms: 90,
    off_ms: 60,
    freq_hz: 2700,
};

/// Temperature abnormal.
pub const BEEP_TEMP: BeepPattern = BeepPattern {
    times: 2,
    on_ms: 120,
    off_ms: 120,
    freq_hz: 2400,
};

/// Humidity abnormal.
pub const BEEP_HUMI: BeepPattern = BeepPattern {
    times: 3,
    on_ms: 110,
    off_ms: 100,
    freq_hz: 2200,
};

/// Confirmation chirp when leaving manual fan mode.
pub const BEEP_MANUAL_EXIT: BeepPattern = BeepPattern {
    times: 1,
    on_ms: 80,
    off_ms: 0,
    freq_hz: 1800,
};

// ── Monitor ───────────────────────────────────────────────────

pub struct AlarmMonitor {
    temp_abnormal: bool,
    humi_abnormal: bool,
    /// `None` until the first beep of each category, so a freshly tripped
    /// alarm sounds immediately.
    last_temp_beep_ms: Option<u32>,
    last_humi_beep_ms: Option<u32>,
    last_both_beep_ms: Option<u32>,
}

impl AlarmMonitor {
    pub fn new() -> Self {
        Self {
            temp_abnormal: false,
            humi_abnormal: false,
            last_temp_beep_ms: None,
            last_humi_beep_ms: None,
            last_both_beep_ms: None,
        }
    }

    pub fn temp_abnormal(&self) -> bool {
        self.temp_abnormal
    }

    pub fn humi_abnormal(&self) -> bool {
        self.humi_abnormal
    }

    pub fn any_abnormal(&self) -> bool {
        self.temp_abnormal || self.humi_abnormal
    }

    /// Evaluate one validated reading. Returns the beep patterns due now
    /// (at most one per category, already cooldown-gated).
    pub fn update(
        &mut self,
        config: &MonitorConfig,
        reading: &EnvReading,
        now_ms: u32,
    ) -> Vec<BeepPattern, 2> {
        let temp = i32::from(reading.temperature_c);
        let humi = i32::from(reading.humidity_pct);

        if !self.temp_abnormal {
            if temp >= config.temp_high_c || temp <= config.temp_low_c {
                warn!("alarm: temperature abnormal ({temp} C)");
                self.temp_abnormal = true;
            }
        } else if temp < config.temp_high_c - config.temp_hyst_c
            && temp > config.temp_low_c + config.temp_hyst_c
        {
            info!("alarm: temperature back to normal ({temp} C)");
            self.temp_abnormal = false;
        }

        if !self.humi_abnormal {
            if humi >= config.humi_high_pct || humi <= config.humi_low_pct {
                warn!("alarm: humidity abnormal ({humi} %)");
                self.humi_abnormal = true;
            }
        } else if humi < config.humi_high_pct - config.humi_hyst_pct
            && humi > config.humi_low_pct + config.humi_hyst_pct
        {
            info!("alarm: humidity back to normal ({humi} %)");
            self.humi_abnormal = false;
        }

        let mut beeps = Vec::new();
        let cooldown = config.alarm_cooldown_ms;
        let expired =
            |last: Option<u32>| last.is_none_or(|t| now_ms.wrapping_sub(t) >= cooldown);

        if self.temp_abnormal && self.humi_abnormal {
            if expired(self.last_both_beep_ms) {
                let _ = beeps.push(BEEP_BOTH);
                // The combined pattern also refreshes the per-category
                // timers so the single-category beeps stay quiet.
                self.last_both_beep_ms = Some(now_ms);
                self.last_temp_beep_ms = Some(now_ms);
                self.last_humi_beep_ms = Some(now_ms);
            }
            return beeps;
        }

        if self.temp_abnormal && expired(self.last_temp_beep_ms) {
            let _ = beeps.push(BEEP_TEMP);
            self.last_temp_beep_ms = Some(now_ms);
        }
        if self.humi_abnormal && expired(self.last_humi_beep_ms) {
            let _ = beeps.push(BEEP_HUMI);
            self.last_humi_beep_ms = Some(now_ms);
        }
        beeps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MonitorConfig;

    fn cfg() -> MonitorConfig {
        MonitorConfig::default()
    }

    fn reading(t: u8, h: u8) -> EnvReading {
        EnvReading {
            temperature_c: t,
            humidity_pct: h,
        }
    }

    #[test]
    fn temperature_hysteresis_clears_strictly_inside_band() {
        let c = cfg();
        let mut alarm = AlarmMonitor::new();

        alarm.update(&c, &reading(36, 50), 0);
        assert!(alarm.temp_abnormal(), "36 C is above the 35 C trigger");

        alarm.update(&c, &reading(34, 50), 1000);
        assert!(
            alarm.temp_abnormal(),
            "34 C sits on high - hyst and must not clear yet"
        );

        alarm.update(&c, &reading(33, 50), 2000);
        assert!(!alarm.temp_abnormal(), "33 C is strictly inside the band");
    }

    #[test]
    fn low_temperature_also_trips() {
        let c = cfg();
        let mut alarm = AlarmMonitor::new();
        alarm.update(&c, &reading(20, 50), 0);
        assert!(alarm.temp_abnormal());
        alarm.update(&c, &reading(26, 50), 1000);
        assert!(!alarm.temp_abnormal());
    }

    #[test]
    fn humidity_tracked_independently() {
        let c = cfg();
        let mut alarm = AlarmMonitor::new();
        alarm.update(&c, &reading(27, 85), 0);
        assert!(alarm.humi_abnormal());
        assert!(!alarm.temp_abnormal());
    }

    #[test]
    fn beep_patterns_by_category() {
        let c = cfg();
        let mut alarm = AlarmMonitor::new();

        let beeps = alarm.update(&c, &reading(36, 50), 100_000);
        assert_eq!(beeps.as_slice(), [BEEP_TEMP]);

        let mut alarm = AlarmMonitor::new();
        let beeps = alarm.update(&c, &reading(27, 85), 100_000);
        assert_eq!(beeps.as_slice(), [BEEP_HUMI]);

        let mut alarm = AlarmMonitor::new();
        let beeps = alarm.update(&c, &reading(36, 85), 100_000);
        assert_eq!(beeps.as_slice(), [BEEP_BOTH]);
    }

    #[test]
    fn cooldown_gates_repeated_beeps() {
        let c = cfg();
        let mut alarm = AlarmMonitor::new();

        let t0 = 100_000;
        assert_eq!(alarm.update(&c, &reading(36, 50), t0).len(), 1);
        assert!(
            alarm
                .update(&c, &reading(36, 50), t0 + c.alarm_cooldown_ms / 2)
                .is_empty(),
            "still cooling down"
        );
        assert_eq!(
            alarm
                .update(&c, &reading(36, 50), t0 + c.alarm_cooldown_ms)
                .len(),
            1
        );
    }

    #[test]
    fn combined_beep_refreshes_category_cooldowns() {
        let c = cfg();
        let mut alarm = AlarmMonitor::new();

        let t0 = 100_000;
        assert_eq!(alarm.update(&c, &reading(36, 85), t0).as_slice(), [BEEP_BOTH]);

        // Humidity recovers; temperature stays abnormal but its cooldown
        // was refreshed by the combined beep.
        let beeps = alarm.update(&c, &reading(36, 50), t0 + 1000);
        assert!(!alarm.humi_abnormal());
        assert!(beeps.is_empty());
    }
}
