//! Outbound application events.
//!
//! The [`MonitorService`](super::service::MonitorService) emits these through
//! the [`EventSink`](super::ports::EventSink) port. Adapters on the other
//! side decide what to do with them — log to serial, redraw a display page,
//! etc.

use heapless::String;

use crate::control::motor::MotorMode;

/// Capacity of one formatted status line.
pub const REPORT_CAP: usize = 64;

/// Structured events emitted by the monitor core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    /// A periodic status report was attempted; `delivered` is false when
    /// the uplink refused or timed out (the line is still shown locally).
    ReportSent {
        line: String<REPORT_CAP>,
        delivered: bool,
    },

    /// Fan mode or manual switch changed via the button.
    ModeChanged { mode: MotorMode, manual_on: bool },

    /// Alarm flags changed; both current flags carried.
    AlarmChanged { temperature: bool, humidity: bool },

    /// The page-cycling button was pressed.
    PageAdvance,

    /// Supply voltage dropped below the gate; sensor polling and alarms
    /// are suspended until it recovers.
    LowVdd { mv: u16 },
}
