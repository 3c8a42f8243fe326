//! Debounced button driver with short and long press detection.
//!
//! ## Hardware
//!
//! Momentary switch polled from the main loop on a fixed cadence (10 ms).
//! Active-low with external pull-up by default.
//!
//! ## Gesture detection
//!
//! | Gesture      | Condition                                   | Event        |
//! |--------------|---------------------------------------------|--------------|
//! | Short press  | Release before the long-press threshold     | `ShortPress` |
//! | Long press   | Held for the threshold (default 1.5 s)      | `LongPress`  |
//!
//! A long press fires exactly once per physical hold, and the release after
//! it never emits a trailing short press. The raw level must be stable for
//! the settle window (default 20 ms) before the accepted level changes.

use embedded_hal::digital::InputPin;

/// Button events emitted after debounce and classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    ShortPress,
    LongPress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Pressed { since_ms: u32 },
    /// Long press already reported; swallow everything until release.
    LongReported,
}

pub struct Button<P> {
    pin: P,
    active_low: bool,
    settle_ms: u32,
    long_press_ms: u32,
    /// Debounced (accepted) pressed level.
    accepted: bool,
    last_edge_ms: u32,
    phase: Phase,
}

impl<P: InputPin> Button<P> {
    pub fn new(pin: P, active_low: bool, settle_ms: u32, long_press_ms: u32) -> Self {
        Self {
            pin,
            active_low,
            settle_ms,
            long_press_ms,
            accepted: false,
            last_edge_ms: 0,
            phase: Phase::Idle,
        }
    }

    /// Call on the polling cadence. Reads the pin and classifies.
    pub fn poll(&mut self, now_ms: u32) -> Option<ButtonEvent> {
        let Ok(level_high) = self.pin.is_high() else {
            return None;
        };
        let raw_pressed = level_high != self.active_low;
        self.feed(now_ms, raw_pressed)
    }

    /// Debounce + gesture state machine, separated from the pin read so
    /// tests can drive raw waveforms directly.
    pub fn feed(&mut self, now_ms: u32, raw_pressed: bool) -> Option<ButtonEvent> {
        // Debounce: the raw level must disagree with the accepted level for
        // the whole settle window before it is taken over.
        if raw_pressed != self.accepted {
            if now_ms.wrapping_sub(self.last_edge_ms) >= self.settle_ms {
                self.accepted = raw_pressed;
                self.last_edge_ms = now_ms;
            }
        } else {
            self.last_edge_ms = now_ms;
        }

        match self.phase {
            Phase::Idle => {
                if self.accepted {
                    self.phase = Phase::Pressed { since_ms: now_ms };
                }
                None
            }
            Phase::Pressed { since_ms } => {
                if self.accepted {
                    if now_ms.wrapping_sub(since_ms) >= self.long_press_ms {
                        self.phase = Phase::LongReported;
                        return Some(ButtonEvent::LongPress);
                    }
                    None
                } else {
                    self.phase = Phase::Idle;
                    Some(ButtonEvent::ShortPress)
                }
            }
            Phase::LongReported => {
                if !self.accepted {
                    self.phase = Phase::Idle;
                }
                None
            }
        }
    }

    /// Debounced pressed state.
    pub fn is_pressed(&self) -> bool {
        self.accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;

    /// Pin stub; tests drive `feed` directly.
    struct StubPin;
    impl embedded_hal::digital::ErrorType for StubPin {
        type Error = Infallible;
    }
    impl InputPin for StubPin {
        fn is_high(&mut self) -> Result<bool, Infallible> {
            Ok(true)
        }
        fn is_low(&mut self) -> Result<bool, Infallible> {
            Ok(false)
        }
    }

    fn button() -> Button<StubPin> {
        Button::new(StubPin, true, 20, 1500)
    }

    /// Drive `feed` every 10 ms over `[from, to)` with a constant level.
    fn hold(btn: &mut Button<StubPin>, from_ms: u32, to_ms: u32, pressed: bool) -> Vec<ButtonEvent> {
        (from_ms..to_ms)
            .step_by(10)
            .filter_map(|t| btn.feed(t, pressed))
            .collect()
    }

    #[test]
    fn no_events_without_press() {
        let mut btn = button();
        assert!(hold(&mut btn, 0, 200, false).is_empty());
    }

    #[test]
    fn short_press_on_release() {
        let mut btn = button();
        assert!(hold(&mut btn, 0, 100, true).is_empty());
        assert_eq!(hold(&mut btn, 100, 160, false), vec![ButtonEvent::ShortPress]);
    }

    #[test]
    fn bounce_shorter_than_settle_window_is_ignored() {
        let mut btn = button();
        hold(&mut btn, 0, 100, false);
        // 10 ms blips never survive the 20 ms settle window.
        for t in (100..300).step_by(20) {
            assert_eq!(btn.feed(t, true), None);
            assert_eq!(btn.feed(t + 10, false), None);
            assert!(!btn.is_pressed());
        }
    }

    #[test]
    fn long_press_fires_exactly_once() {
        let mut btn = button();
        let events = hold(&mut btn, 0, 3000, true);
        assert_eq!(events, vec![ButtonEvent::LongPress]);
    }

    #[test]
    fn release_after_long_press_is_silent() {
        let mut btn = button();
        hold(&mut btn, 0, 2000, true);
        assert!(hold(&mut btn, 2000, 2200, false).is_empty());
        // The machine is back in idle: a fresh short press works.
        hold(&mut btn, 2200, 2300, true);
        assert_eq!(
            hold(&mut btn, 2300, 2400, false),
            vec![ButtonEvent::ShortPress]
        );
    }

    #[test]
    fn held_past_threshold_never_emits_short() {
        let mut btn = button();
        let mut events = hold(&mut btn, 0, 1600, true);
        events.extend(hold(&mut btn, 1600, 1800, false));
        assert_eq!(events, vec![ButtonEvent::LongPress]);
    }
}
