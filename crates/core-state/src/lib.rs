//! Mutable client state owned by the event loop: the edit buffer with its
//! undo delta log, chat scrollback position, and tree selection.
//!
//! Rendered line buffers are NOT held here; builders rebuild them wholesale
//! and hand them to the renderer per draw. This crate only tracks where the
//! user is looking and what they have typed.

pub mod edit;

pub use edit::{DELTA_HISTORY_MAX, DeltaKind, EditBuffer, EditDelta};

/// Scrollback offset into the chat buffer, counted in physical lines up
/// from the bottom. Zero means pinned to the newest message.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ChatScroll {
    offset: usize,
}

impl ChatScroll {
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn at_bottom(&self) -> bool {
        self.offset == 0
    }

    /// Scrolls up by `n` lines, clamped so at least one screenful of the
    /// buffer remains below the viewport top.
    pub fn scroll_up(&mut self, n: usize, total_lines: usize, viewport: usize) {
        let max = total_lines.saturating_sub(viewport);
        self.offset = (self.offset + n).min(max);
    }

    pub fn scroll_down(&mut self, n: usize) {
        self.offset = self.offset.saturating_sub(n);
    }

    pub fn jump_to_bottom(&mut self) {
        self.offset = 0;
    }

    /// New lines arrived while scrolled up: keep the viewport anchored on
    /// the same content instead of letting it drift.
    pub fn compensate_new_lines(&mut self, n: usize) {
        if self.offset > 0 {
            self.offset += n;
        }
    }
}

/// Cursor and scroll window over the flat tree listing.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TreeCursor {
    pub selected: usize,
    pub scroll: usize,
}

impl TreeCursor {
    pub fn move_up(&mut self, n: usize) {
        self.selected = self.selected.saturating_sub(n);
    }

    pub fn move_down(&mut self, n: usize, line_count: usize) {
        self.selected = (self.selected + n).min(line_count.saturating_sub(1));
    }

    /// Clamps after a rebuild shrinks the listing, then scrolls the window
    /// so the selection stays visible.
    pub fn ensure_visible(&mut self, line_count: usize, viewport: usize) {
        self.selected = self.selected.min(line_count.saturating_sub(1));
        if self.selected < self.scroll {
            self.scroll = self.selected;
        } else if viewport > 0 && self.selected >= self.scroll.saturating_add(viewport) {
            self.scroll = self.selected + 1 - viewport;
        }
    }
}
