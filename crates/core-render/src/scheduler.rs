//! Redraw coalescing.
//!
//! Producers report damage with `mark*` and ask for a flush via
//! `request`. The first request after an idle period arms the scheduler and
//! returns a deadline one coalescing delay in the future; the event loop
//! sleeps until then and calls `consume` to take the merged damage and paint
//! once. Requests landing while armed merge silently, so a burst of rapid
//! state changes costs a single physical flush.

use crate::layout::WindowId;
use core_events::{REDRAW_FLUSHES, REDRAW_REQUESTS};
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use tracing::trace;

/// Delay between the first redraw request and the physical flush.
pub const COALESCE_DELAY: Duration = Duration::from_millis(12);

/// Merged damage for one flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Damage {
    /// Repaint everything (resize, theme change, paint-failure recovery).
    Full,
    /// Repaint only the named windows.
    Windows(Vec<WindowId>),
    /// Only the cursor cell toggled (blink).
    CursorOnly,
}

#[derive(Debug)]
pub struct RedrawScheduler {
    delay: Duration,
    armed: bool,
    full: bool,
    windows: Vec<WindowId>,
    cursor_only: bool,
}

impl Default for RedrawScheduler {
    fn default() -> Self {
        Self::new(COALESCE_DELAY)
    }
}

impl RedrawScheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            armed: false,
            full: false,
            windows: Vec::new(),
            cursor_only: false,
        }
    }

    pub fn mark_full(&mut self) {
        self.full = true;
    }

    pub fn mark_window(&mut self, id: WindowId) {
        if !self.windows.contains(&id) {
            self.windows.push(id);
        }
    }

    pub fn mark_cursor(&mut self) {
        self.cursor_only = true;
    }

    /// Arms the coalescing timer. Returns the flush deadline on the first
    /// request of a burst, `None` while already armed.
    pub fn request(&mut self, now: Instant) -> Option<Instant> {
        REDRAW_REQUESTS.fetch_add(1, Ordering::Relaxed);
        if self.armed {
            return None;
        }
        self.armed = true;
        trace!(target: "render.scheduler", delay_ms = self.delay.as_millis() as u64, "redraw armed");
        Some(now + self.delay)
    }

    pub fn armed(&self) -> bool {
        self.armed
    }

    /// Takes the merged damage and disarms. Precedence: full > windows >
    /// cursor-only; with no marks at all a full paint is assumed (callers
    /// that request without marking want everything).
    pub fn consume(&mut self) -> Damage {
        REDRAW_FLUSHES.fetch_add(1, Ordering::Relaxed);
        self.armed = false;
        let full = std::mem::take(&mut self.full);
        let windows = std::mem::take(&mut self.windows);
        let cursor_only = std::mem::take(&mut self.cursor_only);
        let damage = if full || (windows.is_empty() && !cursor_only) {
            Damage::Full
        } else if !windows.is_empty() {
            Damage::Windows(windows)
        } else {
            Damage::CursorOnly
        };
        trace!(target: "render.scheduler", ?damage, "redraw consumed");
        damage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_request_arms_rest_merge() {
        let mut s = RedrawScheduler::new(Duration::from_millis(10));
        let t0 = Instant::now();
        let deadline = s.request(t0).expect("first request arms");
        assert_eq!(deadline, t0 + Duration::from_millis(10));
        assert!(s.request(t0 + Duration::from_millis(1)).is_none());
        assert!(s.armed());
        s.consume();
        assert!(!s.armed());
        assert!(s.request(t0 + Duration::from_millis(20)).is_some());
    }

    #[test]
    fn full_beats_window_damage() {
        let mut s = RedrawScheduler::default();
        s.mark_window(WindowId::Chat);
        s.mark_full();
        s.mark_cursor();
        assert_eq!(s.consume(), Damage::Full);
    }

    #[test]
    fn window_marks_dedupe_and_merge() {
        let mut s = RedrawScheduler::default();
        s.mark_window(WindowId::Chat);
        s.mark_window(WindowId::Chat);
        s.mark_window(WindowId::Status);
        assert_eq!(
            s.consume(),
            Damage::Windows(vec![WindowId::Chat, WindowId::Status])
        );
    }

    #[test]
    fn cursor_only_when_nothing_else() {
        let mut s = RedrawScheduler::default();
        s.mark_cursor();
        assert_eq!(s.consume(), Damage::CursorOnly);
    }

    #[test]
    fn bare_request_means_full() {
        let mut s = RedrawScheduler::default();
        s.request(Instant::now());
        assert_eq!(s.consume(), Damage::Full);
    }

    #[test]
    fn damage_resets_after_consume() {
        let mut s = RedrawScheduler::default();
        s.mark_window(WindowId::Tree);
        s.consume();
        s.mark_cursor();
        assert_eq!(s.consume(), Damage::CursorOnly);
    }
}
