use core_events::{KeyPress, KeyToken, ModMask, NamedKey};
use std::time::{Duration, Instant};
use tracing::trace;

/// Default window in which a key following a bare Escape is folded into an
/// ALT-modified press.
pub const ESCAPE_TIMEOUT: Duration = Duration::from_millis(50);

/// Resolves the Escape/ALT ambiguity on terminals that deliver ALT+key as an
/// ESC prefix byte followed by the key.
///
/// An Escape press is held pending; a second press arriving within the
/// timeout is emitted as one logical press with ALT set. When the timeout
/// lapses with nothing following, the pending press surfaces as a bare
/// Escape. Timestamps are injected so the machine is testable without real
/// clocks; the caller polls `deadline()` to schedule the flush.
#[derive(Debug)]
pub struct EscapeResolver {
    pending: Option<Instant>,
    timeout: Duration,
}

impl Default for EscapeResolver {
    fn default() -> Self {
        Self::new(ESCAPE_TIMEOUT)
    }
}

impl EscapeResolver {
    pub fn new(timeout: Duration) -> Self {
        Self {
            pending: None,
            timeout,
        }
    }

    /// Feeds one press; returns zero, one, or two resolved presses in order.
    pub fn feed(&mut self, press: KeyPress, now: Instant) -> Vec<KeyPress> {
        let is_esc = press.token == KeyToken::Named(NamedKey::Esc) && press.mods.is_empty();

        let Some(since) = self.pending.take() else {
            if is_esc {
                self.pending = Some(now);
                return Vec::new();
            }
            return vec![press];
        };

        if now.duration_since(since) > self.timeout {
            // Stale prefix: surface the bare Escape, then treat the new
            // press independently.
            let mut out = vec![KeyPress::plain(KeyToken::Named(NamedKey::Esc))];
            out.extend(self.feed(press, now));
            return out;
        }

        if is_esc {
            // ESC ESC: first resolves bare, second starts a new prefix.
            self.pending = Some(now);
            return vec![KeyPress::plain(KeyToken::Named(NamedKey::Esc))];
        }

        trace!(target: "input.fsm", token = ?press.token, "alt_prefix_resolved");
        vec![KeyPress::new(press.token, press.mods | ModMask::ALT)]
    }

    /// Flushes a pending Escape whose window has lapsed.
    pub fn poll(&mut self, now: Instant) -> Option<KeyPress> {
        let since = self.pending?;
        if now.duration_since(since) > self.timeout {
            self.pending = None;
            trace!(target: "input.fsm", "escape_timeout_bare");
            Some(KeyPress::plain(KeyToken::Named(NamedKey::Esc)))
        } else {
            None
        }
    }

    /// Instant at which `poll` would flush, for the caller's timer.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.map(|t| t + self.timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn esc() -> KeyPress {
        KeyPress::plain(KeyToken::Named(NamedKey::Esc))
    }

    fn ch(c: char) -> KeyPress {
        KeyPress::plain(KeyToken::Char(c))
    }

    #[test]
    fn alt_sequence_resolves_to_single_press() {
        let mut fsm = EscapeResolver::default();
        let t0 = Instant::now();
        assert!(fsm.feed(esc(), t0).is_empty());
        let out = fsm.feed(ch('x'), t0 + Duration::from_millis(10));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].token, KeyToken::Char('x'));
        assert!(out[0].mods.contains(ModMask::ALT));
    }

    #[test]
    fn stale_prefix_yields_bare_escape_then_key() {
        let mut fsm = EscapeResolver::default();
        let t0 = Instant::now();
        assert!(fsm.feed(esc(), t0).is_empty());
        let out = fsm.feed(ch('x'), t0 + Duration::from_millis(500));
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], esc());
        assert_eq!(out[1], ch('x'));
    }

    #[test]
    fn poll_flushes_expired_escape() {
        let mut fsm = EscapeResolver::default();
        let t0 = Instant::now();
        fsm.feed(esc(), t0);
        assert!(fsm.poll(t0 + Duration::from_millis(10)).is_none());
        assert_eq!(fsm.poll(t0 + Duration::from_millis(100)), Some(esc()));
        assert!(fsm.deadline().is_none());
    }

    #[test]
    fn double_escape_emits_first_keeps_second_pending() {
        let mut fsm = EscapeResolver::default();
        let t0 = Instant::now();
        fsm.feed(esc(), t0);
        let out = fsm.feed(esc(), t0 + Duration::from_millis(5));
        assert_eq!(out, vec![esc()]);
        assert!(fsm.deadline().is_some());
    }

    #[test]
    fn non_escape_passes_through() {
        let mut fsm = EscapeResolver::default();
        let out = fsm.feed(ch('q'), Instant::now());
        assert_eq!(out, vec![ch('q')]);
    }
}
