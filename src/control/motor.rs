//! Fan motor control: manual override state machine plus the
//! temperature-to-duty curve for automatic mode.
//!
//! Short press enters manual mode (fan on) or toggles it while already
//! manual; long press returns to automatic. The duty is recomputed every
//! tick as a pure function of mode, manual switch, and the latest valid
//! temperature — there is no hidden ramp state.

use crate::config::MonitorConfig;
use crate::drivers::button::ButtonEvent;
use log::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorMode {
    Auto,
    Manual,
}

/// Automatic duty curve. Flat 0 up to the on-threshold, then a ramp that
/// starts at the floor duty (the fan must be effective as soon as it spins)
/// and reaches 100% at the max-threshold.
pub fn auto_duty(config: &MonitorConfig, temp_c: i32) -> u8 {
    if temp_c <= config.fan_on_temp_c {
        return 0;
    }
    if temp_c >= config.fan_max_temp_c {
        return 100;
    }
    let span = config.fan_max_temp_c - config.fan_on_temp_c;
    let delta = temp_c - config.fan_on_temp_c;
    let floor = i32::from(config.fan_floor_pct);
    let duty = floor + delta * (100 - floor) / span;
    duty.clamp(0, 100) as u8
}

pub struct MotorController {
    mode: MotorMode,
    manual_on: bool,
    duty_pct: u8,
}

impl MotorController {
    pub fn new() -> Self {
        Self {
            mode: MotorMode::Auto,
            manual_on: false,
            duty_pct: 0,
        }
    }

    /// Apply a button gesture. Returns `true` when the mode changed.
    pub fn on_button(&mut self, event: ButtonEvent) -> bool {
        match event {
            ButtonEvent::ShortPress => {
                if self.mode == MotorMode::Auto {
                    self.mode = MotorMode::Manual;
                    self.manual_on = true;
                    info!("motor: manual mode, fan on");
                    true
                } else {
                    self.manual_on = !self.manual_on;
                    info!("motor: manual fan {}", if self.manual_on { "on" } else { "off" });
                    false
                }
            }
            ButtonEvent::LongPress => {
                let was_manual = self.mode == MotorMode::Manual;
                self.mode = MotorMode::Auto;
                if was_manual {
                    info!("motor: back to auto mode");
                }
                was_manual
            }
        }
    }

    /// Recompute the target duty from the latest valid temperature
    /// (`None` when no reading is currently valid — fan stays off in auto).
    pub fn update(&mut self, config: &MonitorConfig, temp_c: Option<i32>) -> u8 {
        self.duty_pct = match self.mode {
            MotorMode::Manual => {
                if self.manual_on {
                    100
                } else {
                    0
                }
            }
            MotorMode::Auto => temp_c.map_or(0, |t| auto_duty(config, t)),
        };
        self.duty_pct
    }

    pub fn mode(&self) -> MotorMode {
        self.mode
    }

    pub fn manual_on(&self) -> bool {
        self.manual_on
    }

    pub fn duty_pct(&self) -> u8 {
        self.duty_pct
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> MonitorConfig {
        MonitorConfig::default()
    }

    #[test]
    fn duty_curve_boundaries() {
        let c = cfg();
        assert_eq!(auto_duty(&c, 20), 0);
        assert_eq!(auto_duty(&c, 32), 0, "on-threshold is exclusive");
        assert_eq!(auto_duty(&c, 33), 58, "ramp is anchored at the floor duty");
        assert_eq!(auto_duty(&c, 38), 100);
        assert_eq!(auto_duty(&c, 40), 100);
    }

    #[test]
    fn duty_curve_is_monotonic() {
        let c = cfg();
        let mut prev = 0;
        for t in 20..45 {
            let d = auto_duty(&c, t);
            assert!(d >= prev, "duty must not decrease with temperature");
            prev = d;
        }
    }

    #[test]
    fn short_press_enters_manual_then_toggles() {
        let mut m = MotorController::new();
        assert!(m.on_button(ButtonEvent::ShortPress));
        assert_eq!(m.mode(), MotorMode::Manual);
        assert!(m.manual_on());

        assert!(!m.on_button(ButtonEvent::ShortPress));
        assert!(!m.manual_on());
        assert_eq!(m.mode(), MotorMode::Manual, "toggle stays in manual");
    }

    #[test]
    fn long_press_returns_to_auto() {
        let mut m = MotorController::new();
        m.on_button(ButtonEvent::ShortPress);
        assert!(m.on_button(ButtonEvent::LongPress));
        assert_eq!(m.mode(), MotorMode::Auto);
    }

    #[test]
    fn manual_duty_ignores_temperature() {
        let c = cfg();
        let mut m = MotorController::new();
        m.on_button(ButtonEvent::ShortPress);
        assert_eq!(m.update(&c, Some(20)), 100);
        m.on_button(ButtonEvent::ShortPress);
        assert_eq!(m.update(&c, Some(40)), 0);
    }

    #[test]
    fn auto_duty_needs_a_valid_reading() {
        let c = cfg();
        let mut m = MotorController::new();
        assert_eq!(m.update(&c, None), 0);
        assert_eq!(m.update(&c, Some(36)), auto_duty(&c, 36));
    }
}
