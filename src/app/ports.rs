//! Port traits — the boundary between the monitor core and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ MonitorService (domain)
//! ```
//!
//! Driven adapters (sensor hardware, actuators, the modem uplink, event
//! sinks) implement these traits. The [`MonitorService`] consumes them via
//! generics, so the domain core never touches hardware directly and the
//! whole control cycle runs under test with recording mocks.
//!
//! [`MonitorService`]: super::service::MonitorService

use crate::control::alarm::BeepPattern;
use crate::drivers::button::ButtonEvent;
use crate::error::{BusError, ModemError, SensorError};
use crate::sensors::dht11::EnvReading;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: the domain calls this to obtain inputs.
pub trait SensorPort {
    /// One environment (temperature/humidity) measurement attempt.
    fn read_env(&mut self) -> Result<EnvReading, SensorError>;

    /// One ambient-light read in lux.
    fn read_lux(&mut self) -> Result<f32, BusError>;

    /// Supply voltage in millivolts.
    fn read_vdd_mv(&mut self) -> u16;

    /// Poll the fan-control button; call on the button-scan cadence.
    fn poll_fan_button(&mut self, now_ms: u32) -> Option<ButtonEvent>;

    /// Poll the page-cycling button.
    fn poll_page_button(&mut self, now_ms: u32) -> Option<ButtonEvent>;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the domain calls this to command outputs.
pub trait ActuatorPort {
    /// Set the fan PWM duty (0–100).
    fn set_fan_duty(&mut self, pct: u8);

    /// Request a beep pattern (playback is asynchronous to the loop).
    fn beep(&mut self, pattern: BeepPattern);

    /// Drive the heartbeat LED.
    fn set_heartbeat_led(&mut self, on: bool);
}

// ───────────────────────────────────────────────────────────────
// Uplink port (driven adapter: domain → modem session)
// ───────────────────────────────────────────────────────────────

/// Carries one newline-framed status line upstream.
pub trait UplinkPort {
    fn send_line(&mut self, line: &str) -> Result<(), ModemError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / display)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`MonitorEvent`](super::events::MonitorEvent)s
/// through this port. Adapters decide where they go — serial log, display
/// page renderer, etc.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::MonitorEvent);
}

// ───────────────────────────────────────────────────────────────
// External collaborator interfaces
// ───────────────────────────────────────────────────────────────
//
// These wrap the platform pieces the crate does not implement: PWM compare
// registers, beep playback, the ADC voltage reference path, and a bare LED
// pin. The hardware adapter composes them with the in-crate drivers.

/// Fan PWM output.
pub trait FanPwm {
    fn set_duty_pct(&mut self, pct: u8);
}

/// Buzzer pattern playback.
pub trait Buzzer {
    fn play(&mut self, pattern: BeepPattern);
}

/// Supply-voltage measurement.
pub trait VddSense {
    fn read_mv(&mut self) -> u16;
}

/// Simple on/off indicator LED.
pub trait StatusLed {
    fn set(&mut self, on: bool);
}
