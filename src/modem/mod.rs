//! NB-IoT modem AT-command session manager (Quectel BC260Y-class).
//!
//! Line-oriented text protocol over a byte transport: commands go out
//! CRLF-terminated, replies come back as CR/LF-delimited lines matched by
//! substring. The session sequences the attach/configure/open-socket
//! handshake and carries outbound status lines over a stateless UDP socket.
//!
//! Two asynchronous acknowledgements matter and are easy to conflate:
//! `AT+QIOPEN` answers `OK` immediately, but the socket is only usable after
//! the unsolicited `+QIOPEN: 1,0` notification arrives — the two are waited
//! for separately, with separate timeouts. Likewise `AT+QISEND` answers with
//! a bare `>` prompt byte (not a line), after which the raw payload and a
//! 0x1A end-of-data byte are written.
//!
//! Session state is monotonic: `attached` and `socket_open` only go
//! false→true; a failed step keeps whatever progress was already made.

pub mod line;

use core::fmt::Write as _;

use heapless::{String, Vec};
use log::{info, warn};

use crate::error::{InitPhase, ModemError};
use crate::time::MillisClock;
use line::LineAccumulator;

/// Reply line capacity.
pub const LINE_CAP: usize = 160;
/// Outbound datagram capacity, CRLF framing included.
pub const PAYLOAD_CAP: usize = 300;

/// End-of-data marker after a raw payload (Ctrl-Z).
const EOD: u8 = 0x1A;

// ── Transport seam ────────────────────────────────────────────

/// Byte-level UART access to the modem. The receive side is polled; on real
/// hardware the implementation drains the interrupt-filled ring buffer.
pub trait ModemTransport {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), ModemError>;

    /// Non-blocking: the next received byte, if any.
    fn poll_byte(&mut self) -> Option<u8>;
}

impl<T: ModemTransport + ?Sized> ModemTransport for &mut T {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), ModemError> {
        (**self).write_all(bytes)
    }

    fn poll_byte(&mut self) -> Option<u8> {
        (**self).poll_byte()
    }
}

// ── Configuration ─────────────────────────────────────────────

/// Session timeouts and retry counts. The handshake retry count and the
/// socket-ready notification timeout are empirically chosen for this modem
/// model, hence configurable rather than hard-coded.
#[derive(Debug, Clone, Copy)]
pub struct ModemConfig {
    pub handshake_retries: u8,
    pub handshake_timeout_ms: u32,
    /// Retries get a longer deadline — some firmware is slow right after
    /// power-up.
    pub handshake_retry_timeout_ms: u32,
    pub radio_timeout_ms: u32,
    pub attach_timeout_ms: u32,
    pub apn_timeout_ms: u32,
    pub diag_timeout_ms: u32,
    pub close_timeout_ms: u32,
    pub open_timeout_ms: u32,
    pub socket_notify_timeout_ms: u32,
    pub prompt_timeout_ms: u32,
    pub send_ack_timeout_ms: u32,
    /// Per-read slice inside a substring wait.
    pub line_poll_ms: u32,
    /// Idle window after which a terminator-less line is committed.
    pub idle_commit_ms: u32,
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self {
            handshake_retries: 1,
            handshake_timeout_ms: 1000,
            handshake_retry_timeout_ms: 1500,
            radio_timeout_ms: 2500,
            attach_timeout_ms: 8000,
            apn_timeout_ms: 2000,
            diag_timeout_ms: 1000,
            close_timeout_ms: 1000,
            open_timeout_ms: 3000,
            socket_notify_timeout_ms: 10_000,
            prompt_timeout_ms: 2000,
            send_ack_timeout_ms: 5000,
            line_poll_ms: 200,
            idle_commit_ms: 50,
        }
    }
}

// ── Session ───────────────────────────────────────────────────

pub struct ModemSession<T, C> {
    transport: T,
    clock: C,
    cfg: ModemConfig,
    rx: LineAccumulator<LINE_CAP>,
    attached: bool,
    socket_open: bool,
}

impl<T, C> ModemSession<T, C>
where
    T: ModemTransport,
    C: MillisClock,
{
    pub fn new(transport: T, clock: C) -> Self {
        Self::with_config(transport, clock, ModemConfig::default())
    }

    pub fn with_config(transport: T, clock: C, cfg: ModemConfig) -> Self {
        Self {
            transport,
            clock,
            cfg,
            rx: LineAccumulator::new(cfg.idle_commit_ms),
            attached: false,
            socket_open: false,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn is_socket_open(&self) -> bool {
        self.socket_open
    }

    // ── Line I/O ──────────────────────────────────────────────

    /// Read one reply line, waiting at most `timeout_ms`. Returns whatever
    /// accumulated (possibly empty) when the deadline expires mid-line.
    pub fn read_line(&mut self, timeout_ms: u32) -> Vec<u8, LINE_CAP> {
        let start = self.clock.now_ms();
        loop {
            while let Some(byte) = self.transport.poll_byte() {
                self.rx.push_byte(byte, self.clock.now_ms());
            }
            let now = self.clock.now_ms();
            if let Some(line) = self.rx.poll(now) {
                return line;
            }
            if now.wrapping_sub(start) >= timeout_ms {
                return self.rx.take_partial();
            }
            core::hint::spin_loop();
        }
    }

    /// Wait until a reply line contains `expect`, a device error marker, or
    /// the deadline passes. Each line is searched independently.
    pub fn wait_for(&mut self, expect: &str, timeout_ms: u32) -> Result<(), ModemError> {
        let start = self.clock.now_ms();
        let mut saw_reply = false;
        loop {
            let line = self.read_line(self.cfg.line_poll_ms);
            if !line.is_empty() {
                saw_reply = true;
                if contains(&line, expect) {
                    return Ok(());
                }
                // The specific error-code marker embeds the generic one, so
                // it must be checked first.
                if contains(&line, "+CME ERROR") {
                    return Err(ModemError::CmeError);
                }
                if contains(&line, "ERROR") {
                    return Err(ModemError::DeviceError);
                }
            }
            if self.clock.now_ms().wrapping_sub(start) >= timeout_ms {
                return Err(if saw_reply {
                    ModemError::MismatchedReply
                } else {
                    ModemError::Timeout
                });
            }
        }
    }

    /// Send a CRLF-terminated command and wait for `expect` in the reply.
    pub fn send_command(
        &mut self,
        cmd: &str,
        expect: &str,
        timeout_ms: u32,
    ) -> Result<(), ModemError> {
        self.transport.write_all(cmd.as_bytes())?;
        self.transport.write_all(b"\r\n")?;
        self.wait_for(expect, timeout_ms)
    }

    /// Wait for a bare prompt byte. Non-prompt bytes keep flowing into the
    /// line accumulator so no reply text is lost.
    fn wait_prompt(&mut self, prompt: u8, timeout_ms: u32) -> Result<(), ModemError> {
        let start = self.clock.now_ms();
        loop {
            while let Some(byte) = self.transport.poll_byte() {
                if byte == prompt {
                    return Ok(());
                }
                self.rx.push_byte(byte, self.clock.now_ms());
            }
            if self.clock.now_ms().wrapping_sub(start) >= timeout_ms {
                return Err(ModemError::Timeout);
            }
            core::hint::spin_loop();
        }
    }

    // ── Attach / socket handshake ─────────────────────────────

    /// Run the fixed attach sequence. Each step's failure is fatal and
    /// tagged with its phase; progress made before the failure is kept.
    pub fn initialize(&mut self, apn: &str, host: &str, port: u16) -> Result<(), ModemError> {
        info!("modem: initializing (apn={apn}, host={host}:{port})");

        // Basic handshake, with configurable retries.
        let mut ok = self
            .send_command("AT", "OK", self.cfg.handshake_timeout_ms)
            .is_ok();
        for _ in 0..self.cfg.handshake_retries {
            if ok {
                break;
            }
            ok = self
                .send_command("AT", "OK", self.cfg.handshake_retry_timeout_ms)
                .is_ok();
        }
        if !ok {
            return Err(ModemError::Phase(InitPhase::Handshake));
        }

        self.send_command("AT+CFUN=1", "OK", self.cfg.radio_timeout_ms)
            .map_err(|_| ModemError::Phase(InitPhase::RadioFunction))?;

        self.send_command("AT+CGATT=1", "OK", self.cfg.attach_timeout_ms)
            .map_err(|_| ModemError::Phase(InitPhase::Attach))?;
        self.attached = true;

        let mut cmd: String<96> = String::new();
        write!(cmd, "AT+CGDCONT=1,\"IP\",\"{apn}\"")
            .map_err(|_| ModemError::Phase(InitPhase::ApnContext))?;
        self.send_command(&cmd, "OK", self.cfg.apn_timeout_ms)
            .map_err(|_| ModemError::Phase(InitPhase::ApnContext))?;

        // Registration / signal queries are diagnostic only.
        let _ = self.send_command("AT+CEREG?", "OK", self.cfg.diag_timeout_ms);
        let _ = self.send_command("AT+CSQ", "OK", self.cfg.diag_timeout_ms);

        self.open_udp(host, port)
    }

    /// Open UDP socket 1 on PDP profile 1. Closes any stale socket first
    /// (result ignored), then waits — separately from the command's own OK —
    /// for the unsolicited socket-ready notification.
    fn open_udp(&mut self, host: &str, port: u16) -> Result<(), ModemError> {
        let _ = self.send_command("AT+QICLOSE=1", "OK", self.cfg.close_timeout_ms);

        let mut cmd: String<112> = String::new();
        write!(cmd, "AT+QIOPEN=1,1,\"UDP\",\"{host}\",{port},0,0,0")
            .map_err(|_| ModemError::Phase(InitPhase::SocketOpen))?;
        self.send_command(&cmd, "OK", self.cfg.open_timeout_ms)
            .map_err(|_| ModemError::Phase(InitPhase::SocketOpen))?;

        self.wait_for("+QIOPEN: 1,0", self.cfg.socket_notify_timeout_ms)
            .map_err(|_| ModemError::Phase(InitPhase::SocketNotify))?;

        self.socket_open = true;
        info!("modem: socket open");
        Ok(())
    }

    // ── Data path ─────────────────────────────────────────────

    /// Send one CRLF-framed text line over the open socket.
    ///
    /// Overlong lines are truncated to the payload capacity. No retries —
    /// retry policy belongs to the caller.
    pub fn send_line(&mut self, text: &str) -> Result<(), ModemError> {
        if !self.attached || !self.socket_open {
            return Err(ModemError::NotReady);
        }

        let mut payload: Vec<u8, PAYLOAD_CAP> = Vec::new();
        let take = text.len().min(PAYLOAD_CAP - 2);
        if payload.extend_from_slice(&text.as_bytes()[..take]).is_err() {
            return Err(ModemError::Uart);
        }
        let _ = payload.push(b'\r');
        let _ = payload.push(b'\n');

        let mut cmd: String<48> = String::new();
        write!(cmd, "AT+QISEND=1,{}", payload.len()).map_err(|_| ModemError::Uart)?;
        self.transport.write_all(cmd.as_bytes())?;
        self.transport.write_all(b"\r\n")?;
        self.wait_prompt(b'>', self.cfg.prompt_timeout_ms)?;

        self.transport.write_all(&payload)?;
        self.transport.write_all(&[EOD])?;

        self.wait_for("SEND OK", self.cfg.send_ack_timeout_ms)
            .inspect_err(|e| warn!("modem: send not acknowledged: {e}"))
    }
}

/// Substring search over a raw reply line.
fn contains(line: &[u8], needle: &str) -> bool {
    let needle = needle.as_bytes();
    if needle.len() > line.len() {
        return false;
    }
    line.windows(needle.len()).any(|w| w == needle)
}
