//! Receive-side line accumulation.
//!
//! The UART receive path (interrupt completion handler on real hardware)
//! produces bytes; the session manager consumes whole lines. This is a
//! single-producer/single-consumer mailbox: the producer appends bytes and
//! commits a line on a CR/LF terminator; the consumer additionally commits a
//! line that stopped arriving without a terminator once a short idle window
//! has passed. The two sides never touch the same byte index concurrently
//! by construction, so no lock is needed.
//!
//! Terminator bytes arriving while the buffer is empty are skipped, so CRLF
//! pairs collapse instead of producing spurious empty lines. Bytes past the
//! line capacity are dropped — truncate, never overflow.

use heapless::{Deque, Vec};

/// Committed lines waiting for the consumer.
const QUEUE_DEPTH: usize = 4;

pub struct LineAccumulator<const N: usize> {
    buf: Vec<u8, N>,
    ready: Deque<Vec<u8, N>, QUEUE_DEPTH>,
    last_rx_ms: u32,
    idle_commit_ms: u32,
}

impl<const N: usize> LineAccumulator<N> {
    pub fn new(idle_commit_ms: u32) -> Self {
        Self {
            buf: Vec::new(),
            ready: Deque::new(),
            last_rx_ms: 0,
            idle_commit_ms,
        }
    }

    /// Producer side: feed one received byte.
    pub fn push_byte(&mut self, byte: u8, now_ms: u32) {
        self.last_rx_ms = now_ms;
        if byte == b'\r' || byte == b'\n' {
            if !self.buf.is_empty() {
                self.commit();
            }
            return;
        }
        // Full buffer: drop the byte, keep the line prefix.
        let _ = self.buf.push(byte);
    }

    /// Consumer side: take the next committed line, also committing a
    /// terminator-less line once the idle window has elapsed.
    pub fn poll(&mut self, now_ms: u32) -> Option<Vec<u8, N>> {
        if self.ready.is_empty()
            && !self.buf.is_empty()
            && now_ms.wrapping_sub(self.last_rx_ms) >= self.idle_commit_ms
        {
            self.commit();
        }
        self.ready.pop_front()
    }

    /// Consumer side: drain whatever has accumulated, committed or not.
    /// Used when a read deadline expires mid-line.
    pub fn take_partial(&mut self) -> Vec<u8, N> {
        if let Some(line) = self.ready.pop_front() {
            return line;
        }
        core::mem::take(&mut self.buf)
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty() && self.ready.is_empty()
    }

    fn commit(&mut self) {
        let line = core::mem::take(&mut self.buf);
        if self.ready.push_back(line).is_err() {
            // Consumer has fallen QUEUE_DEPTH lines behind; drop the newest.
            log::warn!("rx line queue full, dropping line");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_str<const N: usize>(acc: &mut LineAccumulator<N>, s: &str, now_ms: u32) {
        for &b in s.as_bytes() {
            acc.push_byte(b, now_ms);
        }
    }

    #[test]
    fn commits_on_terminator() {
        let mut acc = LineAccumulator::<32>::new(50);
        push_str(&mut acc, "OK\r\n", 10);
        assert_eq!(acc.poll(10).as_deref(), Some(&b"OK"[..]));
        assert_eq!(acc.poll(10), None);
    }

    #[test]
    fn collapses_crlf_pairs_and_leading_terminators() {
        let mut acc = LineAccumulator::<32>::new(50);
        push_str(&mut acc, "\r\n\r\nREADY\r\n\r\n", 10);
        assert_eq!(acc.poll(10).as_deref(), Some(&b"READY"[..]));
        assert_eq!(acc.poll(10), None);
    }

    #[test]
    fn idle_timeout_commits_unterminated_line() {
        let mut acc = LineAccumulator::<32>::new(50);
        push_str(&mut acc, "> ", 100);
        assert_eq!(acc.poll(120), None, "still within the idle window");
        assert_eq!(acc.poll(160).as_deref(), Some(&b"> "[..]));
    }

    #[test]
    fn overlong_line_is_truncated_not_overflowed() {
        let mut acc = LineAccumulator::<8>::new(50);
        push_str(&mut acc, "ABCDEFGHIJKL\r\n", 10);
        assert_eq!(acc.poll(10).as_deref(), Some(&b"ABCDEFGH"[..]));
    }

    #[test]
    fn queues_multiple_lines_in_order() {
        let mut acc = LineAccumulator::<32>::new(50);
        push_str(&mut acc, "OK\r\n+QIOPEN: 1,0\r\n", 10);
        assert_eq!(acc.poll(10).as_deref(), Some(&b"OK"[..]));
        assert_eq!(acc.poll(10).as_deref(), Some(&b"+QIOPEN: 1,0"[..]));
    }

    #[test]
    fn take_partial_returns_in_flight_bytes() {
        let mut acc = LineAccumulator::<32>::new(50);
        push_str(&mut acc, "SEND", 10);
        assert_eq!(acc.take_partial().as_slice(), b"SEND");
        assert!(acc.is_empty());
    }
}
