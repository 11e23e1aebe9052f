use core_text::{next_boundary, prev_boundary};
use std::collections::VecDeque;
use tracing::trace;

/// Maximum number of deltas retained in the undo log.
pub const DELTA_HISTORY_MAX: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaKind {
    Insert,
    Delete,
}

/// One reversible edit. `index` is a byte offset into the buffer at the
/// moment the delta was applied; `text` is what was inserted or removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditDelta {
    pub index: usize,
    pub text: String,
    pub kind: DeltaKind,
}

/// Single-line edit buffer with a byte cursor, an optional selection anchor,
/// and a bounded delta log for undo/redo.
///
/// The log is a queue of applied deltas; `applied` marks how many of them are
/// currently in effect. Undo steps `applied` back and reverses one delta,
/// redo steps it forward. Recording a new edit truncates everything past
/// `applied`, so redo history is discarded on divergence. When the log
/// exceeds [`DELTA_HISTORY_MAX`] the oldest entry is evicted.
///
/// Consecutive same-kind contiguous edits coalesce into one delta so a burst
/// of typing (or backspacing) undoes as a single step.
#[derive(Debug, Default)]
pub struct EditBuffer {
    text: String,
    cursor: usize,
    anchor: Option<usize>,
    deltas: VecDeque<EditDelta>,
    applied: usize,
}

impl EditBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.applied
    }

    pub fn redo_depth(&self) -> usize {
        self.deltas.len() - self.applied
    }

    /// Normalized selection byte range, `None` when empty or collapsed.
    pub fn selection(&self) -> Option<(usize, usize)> {
        let anchor = self.anchor?;
        if anchor == self.cursor {
            return None;
        }
        Some((anchor.min(self.cursor), anchor.max(self.cursor)))
    }

    pub fn clear_selection(&mut self) {
        self.anchor = None;
    }

    /// Replaces the whole buffer and wipes history (channel switch).
    pub fn reset(&mut self, text: String) {
        self.cursor = text.len();
        self.text = text;
        self.anchor = None;
        self.deltas.clear();
        self.applied = 0;
    }

    /// Inserts at the cursor, replacing the selection if one is active.
    pub fn insert(&mut self, s: &str) {
        if s.is_empty() {
            return;
        }
        self.delete_selection();
        let at = self.cursor;
        self.text.insert_str(at, s);
        self.cursor = at + s.len();
        self.record(EditDelta {
            index: at,
            text: s.to_string(),
            kind: DeltaKind::Insert,
        });
    }

    /// Removes the grapheme before the cursor, or the selection if active.
    pub fn backspace(&mut self) {
        if self.delete_selection() {
            return;
        }
        if self.cursor == 0 {
            return;
        }
        let start = prev_boundary(&self.text, self.cursor);
        let removed = self.text[start..self.cursor].to_string();
        self.text.replace_range(start..self.cursor, "");
        self.cursor = start;
        self.record(EditDelta {
            index: start,
            text: removed,
            kind: DeltaKind::Delete,
        });
    }

    /// Removes the grapheme after the cursor, or the selection if active.
    pub fn delete_forward(&mut self) {
        if self.delete_selection() {
            return;
        }
        if self.cursor == self.text.len() {
            return;
        }
        let end = next_boundary(&self.text, self.cursor);
        let removed = self.text[self.cursor..end].to_string();
        self.text.replace_range(self.cursor..end, "");
        self.record(EditDelta {
            index: self.cursor,
            text: removed,
            kind: DeltaKind::Delete,
        });
    }

    fn delete_selection(&mut self) -> bool {
        let Some((a, b)) = self.selection() else {
            self.anchor = None;
            return false;
        };
        let removed = self.text[a..b].to_string();
        self.text.replace_range(a..b, "");
        self.cursor = a;
        self.anchor = None;
        self.record(EditDelta {
            index: a,
            text: removed,
            kind: DeltaKind::Delete,
        });
        true
    }

    /// Cursor movement. `extend` keeps/creates a selection anchor (shifted
    /// movement); plain movement collapses any active selection.
    pub fn move_left(&mut self, extend: bool) {
        self.pre_move(extend);
        self.cursor = prev_boundary(&self.text, self.cursor);
    }

    pub fn move_right(&mut self, extend: bool) {
        self.pre_move(extend);
        if self.cursor < self.text.len() {
            self.cursor = next_boundary(&self.text, self.cursor);
        }
    }

    pub fn move_home(&mut self, extend: bool) {
        self.pre_move(extend);
        self.cursor = 0;
    }

    pub fn move_end(&mut self, extend: bool) {
        self.pre_move(extend);
        self.cursor = self.text.len();
    }

    fn pre_move(&mut self, extend: bool) {
        if extend {
            if self.anchor.is_none() {
                self.anchor = Some(self.cursor);
            }
        } else {
            self.anchor = None;
        }
    }

    /// Reverses the most recent applied delta. No-op on an exhausted log.
    pub fn undo(&mut self) -> bool {
        if self.applied == 0 {
            trace!(target: "state.undo", "undo_noop_empty");
            return false;
        }
        self.applied -= 1;
        let delta = &self.deltas[self.applied];
        match delta.kind {
            DeltaKind::Insert => {
                self.text
                    .replace_range(delta.index..delta.index + delta.text.len(), "");
                self.cursor = delta.index;
            }
            DeltaKind::Delete => {
                self.text.insert_str(delta.index, &delta.text);
                self.cursor = delta.index + delta.text.len();
            }
        }
        self.anchor = None;
        trace!(
            target: "state.undo",
            undo_depth = self.applied,
            redo_depth = self.deltas.len() - self.applied,
            "undo_pop"
        );
        true
    }

    /// Re-applies the next unapplied delta. No-op when fully applied.
    pub fn redo(&mut self) -> bool {
        if self.applied == self.deltas.len() {
            trace!(target: "state.undo", "redo_noop_empty");
            return false;
        }
        let delta = &self.deltas[self.applied];
        match delta.kind {
            DeltaKind::Insert => {
                self.text.insert_str(delta.index, &delta.text);
                self.cursor = delta.index + delta.text.len();
            }
            DeltaKind::Delete => {
                self.text
                    .replace_range(delta.index..delta.index + delta.text.len(), "");
                self.cursor = delta.index;
            }
        }
        self.applied += 1;
        self.anchor = None;
        trace!(
            target: "state.undo",
            undo_depth = self.applied,
            redo_depth = self.deltas.len() - self.applied,
            "redo_pop"
        );
        true
    }

    fn record(&mut self, delta: EditDelta) {
        // Diverging from a past state discards the redo tail.
        if self.applied < self.deltas.len() {
            self.deltas.truncate(self.applied);
            trace!(target: "state.undo", "redo_cleared_on_new_edit");
        }

        if let Some(last) = self.deltas.back_mut()
            && last.kind == delta.kind
            && coalesce(last, &delta)
        {
            trace!(target: "state.undo", depth = self.deltas.len(), "delta_coalesced");
            return;
        }

        self.deltas.push_back(delta);
        self.applied += 1;
        if self.deltas.len() > DELTA_HISTORY_MAX {
            self.deltas.pop_front();
            self.applied -= 1;
            trace!(target: "state.undo", "delta_log_trimmed");
        }
        trace!(
            target: "state.undo",
            undo_depth = self.applied,
            "delta_recorded"
        );
    }
}

/// Merges `next` into `last` when they form one contiguous run: appended
/// insertions, repeated backspaces, or repeated forward deletes.
fn coalesce(last: &mut EditDelta, next: &EditDelta) -> bool {
    match next.kind {
        DeltaKind::Insert if next.index == last.index + last.text.len() => {
            last.text.push_str(&next.text);
            true
        }
        DeltaKind::Delete if next.index + next.text.len() == last.index => {
            last.index = next.index;
            last.text = format!("{}{}", next.text, last.text);
            true
        }
        DeltaKind::Delete if next.index == last.index => {
            last.text.push_str(&next.text);
            true
        }
        _ => false,
    }
}
