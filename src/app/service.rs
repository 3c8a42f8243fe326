//! Monitor service — the application core.
//!
//! [`MonitorService`] owns the control state machines (fan mode, alarms,
//! heartbeat) and the reading caches, and orchestrates one control cycle per
//! [`tick`](MonitorService::tick) call:
//!
//! 1. button scans (fixed cadence) → fan mode changes, page cycling
//! 2. supply-voltage gate — below the threshold, sensor polling and alarms
//!    are suspended but reporting continues
//! 3. light poll, environment poll (with one immediate retry on failure)
//! 4. alarm evaluation → beep requests
//! 5. fan duty derivation → PWM
//! 6. periodic status report over the uplink
//!
//! Readings are superseded wholesale on success and kept (marked stale) on
//! failure, so one flaky sensor never blanks the whole display.

use core::fmt::Write as _;

use heapless::String;
use log::warn;

use crate::config::MonitorConfig;
use crate::control::alarm::{AlarmMonitor, BEEP_MANUAL_EXIT};
use crate::control::motor::{MotorController, MotorMode};
use crate::drivers::button::ButtonEvent;
use crate::drivers::heartbeat::Heartbeat;
use crate::sensors::dht11::EnvReading;

use super::events::{MonitorEvent, REPORT_CAP};
use super::ports::{ActuatorPort, EventSink, SensorPort, UplinkPort};

// ───────────────────────────────────────────────────────────────
// Reading cache
// ───────────────────────────────────────────────────────────────

/// Last validated environment reading plus when it became valid.
#[derive(Debug, Clone, Copy)]
pub struct CachedReading {
    pub reading: EnvReading,
    pub valid_since_ms: u32,
}

// ───────────────────────────────────────────────────────────────
// MonitorService
// ───────────────────────────────────────────────────────────────

pub struct MonitorService {
    config: MonitorConfig,
    motor: MotorController,
    alarm: AlarmMonitor,
    heartbeat: Heartbeat,

    env: Option<CachedReading>,
    /// Latest environment poll attempt succeeded.
    env_fresh: bool,
    lux: Option<f32>,
    /// Latest light poll attempt succeeded.
    lux_fresh: bool,
    vdd_mv: u16,
    low_vdd: bool,

    started: bool,
    next_button_ms: u32,
    next_env_ms: u32,
    next_lux_ms: u32,
    next_report_ms: u32,

    last_report: String<REPORT_CAP>,
}

impl MonitorService {
    pub fn new(config: MonitorConfig) -> Self {
        let heartbeat = Heartbeat::new(config.heartbeat_period_ms, config.heartbeat_on_ms);
        Self {
            config,
            motor: MotorController::new(),
            alarm: AlarmMonitor::new(),
            heartbeat,
            env: None,
            env_fresh: false,
            lux: None,
            lux_fresh: false,
            vdd_mv: 0,
            low_vdd: false,
            started: false,
            next_button_ms: 0,
            next_env_ms: 0,
            next_lux_ms: 0,
            next_report_ms: 0,
            last_report: String::new(),
        }
    }

    /// Run one control cycle. Call continuously from the main loop; the
    /// service spaces its own sub-tasks with internal deadlines.
    pub fn tick(
        &mut self,
        now_ms: u32,
        hw: &mut (impl SensorPort + ActuatorPort),
        uplink: &mut impl UplinkPort,
        sink: &mut impl EventSink,
    ) {
        if !self.started {
            self.started = true;
            self.next_button_ms = now_ms;
            self.next_env_ms = now_ms;
            self.next_lux_ms = now_ms;
            // First report a full interval after start, like every later one.
            self.next_report_ms = now_ms.wrapping_add(self.config.report_interval_ms);
        }

        self.scan_buttons(now_ms, hw, sink);

        hw.set_heartbeat_led(self.heartbeat.tick(now_ms));

        // Supply gate: below the threshold the DHT start pulse would brown
        // the rail out further, so sensor polling and alarms pause.
        self.vdd_mv = hw.read_vdd_mv();
        let low = self.vdd_mv < self.config.low_vdd_mv;
        if low && !self.low_vdd {
            warn!("low supply voltage: {} mV", self.vdd_mv);
            sink.emit(&MonitorEvent::LowVdd { mv: self.vdd_mv });
        }
        self.low_vdd = low;

        if due(now_ms, self.next_lux_ms) {
            self.next_lux_ms = now_ms.wrapping_add(self.config.lux_read_interval_ms);
            match hw.read_lux() {
                Ok(lux) => {
                    self.lux = Some(lux);
                    self.lux_fresh = true;
                }
                Err(_) => self.lux_fresh = false,
            }
        }

        if !self.low_vdd && due(now_ms, self.next_env_ms) {
            self.next_env_ms = now_ms.wrapping_add(self.config.env_read_interval_ms);
            self.poll_env(now_ms, hw, sink);
        }

        // Fan duty is a pure function of mode + latest valid temperature.
        let temp = if self.env_fresh {
            self.env.map(|c| i32::from(c.reading.temperature_c))
        } else {
            None
        };
        let duty = self.motor.update(&self.config, temp);
        hw.set_fan_duty(duty);

        if due(now_ms, self.next_report_ms) {
            self.next_report_ms = now_ms.wrapping_add(self.config.report_interval_ms);
            self.send_report(uplink, sink);
        }
    }

    // ── Sub-tasks ─────────────────────────────────────────────

    fn scan_buttons(
        &mut self,
        now_ms: u32,
        hw: &mut (impl SensorPort + ActuatorPort),
        sink: &mut impl EventSink,
    ) {
        if !due(now_ms, self.next_button_ms) {
            return;
        }
        self.next_button_ms = now_ms.wrapping_add(self.config.button_scan_interval_ms);

        if let Some(event) = hw.poll_fan_button(now_ms) {
            let left_manual =
                self.motor.on_button(event) && event == ButtonEvent::LongPress;
            if left_manual {
                hw.beep(BEEP_MANUAL_EXIT);
            }
            sink.emit(&MonitorEvent::ModeChanged {
                mode: self.motor.mode(),
                manual_on: self.motor.manual_on(),
            });
        }

        if hw.poll_page_button(now_ms) == Some(ButtonEvent::ShortPress) {
            sink.emit(&MonitorEvent::PageAdvance);
        }
    }

    fn poll_env(
        &mut self,
        now_ms: u32,
        hw: &mut (impl SensorPort + ActuatorPort),
        sink: &mut impl EventSink,
    ) {
        // One immediate retry: a single bad frame on a long harness is
        // common, two in a row means the sensor is really unavailable.
        let result = hw.read_env().or_else(|_| hw.read_env());
        match result {
            Ok(reading) => {
                self.env = Some(CachedReading {
                    reading,
                    valid_since_ms: now_ms,
                });
                self.env_fresh = true;
            }
            Err(e) => {
                warn!("environment read failed: {e}");
                self.env_fresh = false;
            }
        }

        if self.env_fresh {
            if let Some(cached) = self.env {
                let was = (self.alarm.temp_abnormal(), self.alarm.humi_abnormal());
                let beeps = self.alarm.update(&self.config, &cached.reading, now_ms);
                for beep in beeps {
                    hw.beep(beep);
                }
                let now_flags = (self.alarm.temp_abnormal(), self.alarm.humi_abnormal());
                if now_flags != was {
                    sink.emit(&MonitorEvent::AlarmChanged {
                        temperature: now_flags.0,
                        humidity: now_flags.1,
                    });
                }
            }
        }
    }

    fn send_report(&mut self, uplink: &mut impl UplinkPort, sink: &mut impl EventSink) {
        let env = if self.env_fresh {
            self.env.map(|c| c.reading)
        } else {
            None
        };
        let lux = if self.lux_fresh { self.lux } else { None };
        let line = format_report(self.vdd_mv, env.as_ref(), lux);

        let delivered = match uplink.send_line(&line) {
            Ok(()) => true,
            Err(e) => {
                warn!("uplink send failed: {e}");
                false
            }
        };
        self.last_report = line.clone();
        sink.emit(&MonitorEvent::ReportSent { line, delivered });
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn mode(&self) -> MotorMode {
        self.motor.mode()
    }

    pub fn fan_duty(&self) -> u8 {
        self.motor.duty_pct()
    }

    /// Last validated reading, stale or not; `env_valid` tells which.
    pub fn env(&self) -> Option<CachedReading> {
        self.env
    }

    /// Latest environment poll attempt succeeded.
    pub fn env_valid(&self) -> bool {
        self.env_fresh
    }

    pub fn alarm(&self) -> &AlarmMonitor {
        &self.alarm
    }

    pub fn vdd_mv(&self) -> u16 {
        self.vdd_mv
    }

    pub fn low_vdd(&self) -> bool {
        self.low_vdd
    }

    /// The most recently attempted report line (for the display page).
    pub fn last_report(&self) -> &str {
        &self.last_report
    }
}

/// Wrap-aware "deadline reached" check.
fn due(now_ms: u32, deadline_ms: u32) -> bool {
    now_ms.wrapping_sub(deadline_ms) < u32::MAX / 2
}

/// Format the upstream status line: `VDD=<mV>[ T=<t>C H=<h>%][ L=<lux>]`.
/// Environment and light fields appear only while their reading is valid.
pub fn format_report(
    vdd_mv: u16,
    env: Option<&EnvReading>,
    lux: Option<f32>,
) -> String<REPORT_CAP> {
    let mut line: String<REPORT_CAP> = String::new();
    let _ = write!(line, "VDD={vdd_mv}");
    if let Some(r) = env {
        let _ = write!(line, " T={}C H={}%", r.temperature_c, r.humidity_pct);
    }
    if let Some(lux) = lux {
        let lux = (lux + 0.5) as i32;
        let _ = write!(line, " L={lux}");
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_with_all_fields() {
        let reading = EnvReading {
            temperature_c: 27,
            humidity_pct: 62,
        };
        let line = format_report(3312, Some(&reading), Some(123.4));
        assert_eq!(line.as_str(), "VDD=3312 T=27C H=62% L=123");
    }

    #[test]
    fn report_omits_invalid_fields() {
        assert_eq!(format_report(3300, None, None).as_str(), "VDD=3300");

        let reading = EnvReading {
            temperature_c: 30,
            humidity_pct: 55,
        };
        assert_eq!(
            format_report(3300, Some(&reading), None).as_str(),
            "VDD=3300 T=30C H=55%"
        );
        assert_eq!(
            format_report(3300, None, Some(0.2)).as_str(),
            "VDD=3300 L=0"
        );
    }

    #[test]
    fn report_rounds_lux_to_nearest() {
        assert_eq!(format_report(3300, None, Some(99.6)).as_str(), "VDD=3300 L=100");
    }
}
