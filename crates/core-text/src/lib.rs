//! Text measurement primitives: display width, truncation, and
//! grapheme-aware boundary helpers for the edit buffer.

pub mod width;

pub use width::{char_width, display_width, is_wide, truncate_to_width};

use unicode_segmentation::UnicodeSegmentation;

/// Byte index of the grapheme boundary preceding `idx` in `text`.
/// Returns 0 when `idx` is at or before the first boundary.
pub fn prev_boundary(text: &str, idx: usize) -> usize {
    let mut prev = 0;
    for (start, _) in text.grapheme_indices(true) {
        if start >= idx {
            break;
        }
        prev = start;
    }
    prev
}

/// Byte index of the grapheme boundary following `idx` in `text`.
/// Returns `text.len()` when `idx` is at or past the last boundary.
pub fn next_boundary(text: &str, idx: usize) -> usize {
    for (start, g) in text.grapheme_indices(true) {
        if start >= idx {
            return start + g.len();
        }
    }
    text.len()
}
