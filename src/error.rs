//! Unified error types for the monitor firmware core.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! top-level control loop's error handling uniform. All variants are `Copy`
//! so they can be cheaply passed through the service and event sinks without
//! allocation. No unwinding anywhere: every fallible operation reports
//! failure through its return contract.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A bit-banged bus transaction failed.
    Bus(BusError),
    /// The pulse-protocol sensor could not produce a valid frame.
    Sensor(SensorError),
    /// The modem session reported a failure.
    Modem(ModemError),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus(e) => write!(f, "bus: {e}"),
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Modem(e) => write!(f, "modem: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Bus errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// A byte was not acknowledged; the engine has already issued a stop.
    Nack,
    /// The data line would not rise with both lines released — dead bus or
    /// missing pull-up.
    HeldLow,
    /// A GPIO operation on one of the bus lines failed.
    Gpio,
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nack => write!(f, "byte not acknowledged"),
            Self::HeldLow => write!(f, "data line held low"),
            Self::Gpio => write!(f, "GPIO access failed"),
        }
    }
}

impl From<BusError> for Error {
    fn from(e: BusError) -> Self {
        Self::Bus(e)
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// Too soon: still in the power-on warm-up window or inside the minimum
    /// inter-read spacing. The data line was not touched.
    Busy,
    /// The shared line reads low with the pull-up enabled — missing device
    /// or miswiring.
    LineHeldLow,
    /// The device never produced a valid response handshake or bit pulse
    /// within its deadline.
    NoResponse,
    /// The frame checksum did not match; the whole frame was discarded.
    ChecksumMismatch,
    /// A GPIO operation on the sensor line failed.
    Gpio,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Busy => write!(f, "device busy"),
            Self::LineHeldLow => write!(f, "line held low"),
            Self::NoResponse => write!(f, "no response"),
            Self::ChecksumMismatch => write!(f, "checksum mismatch"),
            Self::Gpio => write!(f, "GPIO access failed"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Modem session errors
// ---------------------------------------------------------------------------

/// Initialisation phases, reported by [`ModemError::Phase`] so the caller
/// can diagnose exactly where attachment failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitPhase {
    /// Basic `AT` handshake (retried per config — some firmware is slow
    /// to respond after power-up).
    Handshake,
    /// `AT+CFUN=1` full-function mode.
    RadioFunction,
    /// `AT+CGATT=1` packet-network attach.
    Attach,
    /// `AT+CGDCONT` PDP context / APN setup.
    ApnContext,
    /// `AT+QIOPEN` command acknowledgement.
    SocketOpen,
    /// The unsolicited `+QIOPEN: 1,0` socket-ready notification.
    SocketNotify,
}

impl fmt::Display for InitPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Handshake => write!(f, "handshake"),
            Self::RadioFunction => write!(f, "radio function"),
            Self::Attach => write!(f, "network attach"),
            Self::ApnContext => write!(f, "APN context"),
            Self::SocketOpen => write!(f, "socket open"),
            Self::SocketNotify => write!(f, "socket notify"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModemError {
    /// No reply at all before the deadline.
    Timeout,
    /// Replies were received but none contained the expected substring.
    MismatchedReply,
    /// The device reported a plain `ERROR`.
    DeviceError,
    /// The device reported a structured `+CME ERROR` code.
    CmeError,
    /// The session is not initialised (attach/socket-open incomplete).
    NotReady,
    /// A UART write to the modem failed.
    Uart,
    /// An initialisation step failed; the tag names the step.
    Phase(InitPhase),
}

impl fmt::Display for ModemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::MismatchedReply => write!(f, "unexpected reply"),
            Self::DeviceError => write!(f, "device reported ERROR"),
            Self::CmeError => write!(f, "device reported +CME ERROR"),
            Self::NotReady => write!(f, "session not ready"),
            Self::Uart => write!(f, "UART write failed"),
            Self::Phase(p) => write!(f, "init failed at {p}"),
        }
    }
}

impl From<ModemError> for Error {
    fn from(e: ModemError) -> Self {
        Self::Modem(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
