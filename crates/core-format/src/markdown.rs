//! Markdown resolution: locate code spans and URLs, strip bold/italic/
//! underline delimiters and escapes, and mask spoilers — while keeping every
//! previously recorded range expressed in offsets of the evolving string.
//!
//! All offsets are character offsets (not bytes) into the current text.
//! Every removal goes through `remove_at`, which shifts each recorded
//! boundary at or after the removal point by the removed width; boundaries
//! strictly before are untouched. After `resolve_markdown` returns, all
//! ranges are absolute offsets into the final string and need no further
//! correction until line wrapping.

use crate::style::{Attr, AttrRange, RangeStyle, Span};
use core_text::char_width;
use tracing::trace;

pub const SPOILER_GLYPH: char = '█';

/// Upper bound on delimiter strip operations for one message. Adversarial
/// input (a wall of asterisks) stops formatting instead of spinning.
const MAX_STRIPS: usize = 64;

/// Markdown punctuation a backslash may escape.
const ESCAPABLE: &str = "*_~`|\\>#-";

/// The fully resolved single-line message: final text plus range families,
/// each in character offsets of `text`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormattedLine {
    pub text: String,
    /// Markdown attribute spans (bold/italic/underline).
    pub attrs: Vec<AttrRange>,
    pub urls: Vec<Span>,
    pub code: Vec<Span>,
    pub spoilers: Vec<Span>,
}

impl FormattedLine {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Shift every recorded boundary right by `k` characters; used when a
    /// header is prepended to the content after resolution.
    pub fn shift_right(&mut self, k: usize) {
        for r in &mut self.attrs {
            r.start += k;
            r.end += k;
        }
        for s in self
            .urls
            .iter_mut()
            .chain(&mut self.code)
            .chain(&mut self.spoilers)
        {
            s.start += k;
            s.end += k;
        }
    }
}

struct Stripper {
    chars: Vec<char>,
    attrs: Vec<AttrRange>,
    urls: Vec<Span>,
    code: Vec<Span>,
    spoilers: Vec<Span>,
}

impl Stripper {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            attrs: Vec::new(),
            urls: Vec::new(),
            code: Vec::new(),
            spoilers: Vec::new(),
        }
    }

    /// Shift every boundary at or after `p` left by `k` (floored at `p` so a
    /// boundary inside a removed region collapses onto it).
    fn shift_left(&mut self, p: usize, k: usize) {
        let adjust = |b: &mut usize| {
            if *b >= p {
                *b = p.max(*b - k.min(*b - p));
            }
        };
        for r in &mut self.attrs {
            adjust(&mut r.start);
            adjust(&mut r.end);
        }
        for s in self
            .urls
            .iter_mut()
            .chain(&mut self.code)
            .chain(&mut self.spoilers)
        {
            adjust(&mut s.start);
            adjust(&mut s.end);
        }
    }

    /// Shift every boundary at or after `p` right by `k` (insertions).
    fn shift_right_from(&mut self, p: usize, k: usize) {
        for r in &mut self.attrs {
            if r.start >= p {
                r.start += k;
            }
            if r.end >= p {
                r.end += k;
            }
        }
        for s in self
            .urls
            .iter_mut()
            .chain(&mut self.code)
            .chain(&mut self.spoilers)
        {
            if s.start >= p {
                s.start += k;
            }
            if s.end >= p {
                s.end += k;
            }
        }
    }

    /// Remove `k` characters at `p` and shift all recorded ranges.
    fn remove_at(&mut self, p: usize, k: usize) {
        self.chars.drain(p..p + k);
        self.shift_left(p, k);
    }

    /// True when offset `i` sits inside a code span or URL; such content is
    /// exempt from further markdown interpretation.
    fn exempt(&self, i: usize) -> bool {
        self.code.iter().any(|s| s.contains(i)) || self.urls.iter().any(|s| s.contains(i))
    }

    fn escaped(&self, i: usize) -> bool {
        i > 0 && self.chars[i - 1] == '\\'
    }

    fn matches_at(&self, i: usize, pat: &[char]) -> bool {
        self.chars.len() >= i + pat.len() && self.chars[i..i + pat.len()] == *pat
    }

    // ---- discovery passes ------------------------------------------------

    fn find_urls(&mut self) {
        let text: String = self.chars.iter().collect();
        let re = crate::entity_url_regex();
        for m in re.find_iter(&text) {
            let start = text[..m.start()].chars().count();
            let end = start + m.as_str().chars().count();
            self.urls.push(Span::new(start, end));
        }
    }

    /// Strip fenced blocks then inline backtick spans, recording content
    /// spans and shifting previously found URL spans.
    fn strip_code(&mut self) {
        let fence: [char; 3] = ['`', '`', '`'];
        let mut guard = 0;
        while guard < MAX_STRIPS {
            guard += 1;
            let Some(open) = self.find_delim(&fence, 0) else {
                break;
            };
            let Some(close) = self.find_delim(&fence, open + 3) else {
                break;
            };
            self.remove_at(close, 3);
            self.remove_at(open, 3);
            self.code.push(Span::new(open, close - 3));
        }
        let tick = ['`'];
        let mut guard = 0;
        while guard < MAX_STRIPS {
            guard += 1;
            let Some(open) = self.find_delim(&tick, 0) else {
                break;
            };
            let Some(close) = self.find_delim(&tick, open + 1) else {
                break;
            };
            if close == open + 1 {
                // Empty span; drop both ticks without recording.
                self.remove_at(open, 2);
                continue;
            }
            self.remove_at(close, 1);
            self.remove_at(open, 1);
            self.code.push(Span::new(open, close - 1));
        }
    }

    /// First occurrence of `pat` at or after `from` that is neither exempt
    /// nor escaped. Single-character delimiters refuse positions inside a
    /// run of the same character so `**` is never half-matched by `*`.
    fn find_delim(&self, pat: &[char], from: usize) -> Option<usize> {
        let n = self.chars.len();
        let mut i = from;
        while i + pat.len() <= n {
            if self.matches_at(i, pat) && !self.exempt(i) && !self.escaped(i) {
                if pat.len() == 1 {
                    let c = pat[0];
                    let run_left = i > 0 && self.chars[i - 1] == c;
                    let run_right = i + 1 < n && self.chars[i + 1] == c;
                    if run_left || run_right {
                        i += 1;
                        continue;
                    }
                }
                return Some(i);
            }
            i += 1;
        }
        None
    }

    fn strip_markdown_delims(&mut self) {
        let kinds: [(&[char], Attr); 4] = [
            (&['*', '*'], Attr::BOLD),
            (&['_', '_'], Attr::UNDERLINE),
            (&['*'], Attr::ITALIC),
            (&['_'], Attr::ITALIC),
        ];
        let mut strips = 0;
        loop {
            // Earliest pair across kinds; longer delimiters listed first so
            // "**" wins over "*" at the same position.
            let mut best: Option<(usize, usize, usize, Attr)> = None;
            for (pat, bits) in kinds {
                if let Some(open) = self.find_delim(pat, 0)
                    && let Some(close) = self.find_delim(pat, open + pat.len())
                    && close > open + pat.len()
                    && best.is_none_or(|(o, ..)| open < o)
                {
                    best = Some((open, close, pat.len(), bits));
                }
            }
            let Some((open, close, width, bits)) = best else {
                break;
            };
            self.remove_at(close, width);
            self.remove_at(open, width);
            self.integrate(AttrRange::attr(bits, open, close - width));
            strips += 1;
            if strips >= MAX_STRIPS {
                trace!(target: "format.markdown", strips, "delimiter strip bound reached");
                break;
            }
        }
    }

    /// Fold a freshly discovered span into the recorded set: coincident
    /// spans merge by OR of their bits, full nesting inherits the enclosing
    /// bits in either direction, and a partial overlap sharing exactly one
    /// boundary ORs into the existing span.
    fn integrate(&mut self, new: AttrRange) {
        let RangeStyle::Attr(mut new_bits) = new.style else {
            self.attrs.push(new);
            return;
        };
        let mut coincident = false;
        for ex in &mut self.attrs {
            let RangeStyle::Attr(ref mut ex_bits) = ex.style else {
                continue;
            };
            if ex.start == new.start && ex.end == new.end {
                *ex_bits |= new_bits;
                coincident = true;
            } else if new.start >= ex.start && new.end <= ex.end {
                new_bits |= *ex_bits;
            } else if ex.start >= new.start && ex.end <= new.end {
                *ex_bits |= new_bits;
            } else if ex.start == new.start || ex.end == new.end {
                *ex_bits |= new_bits;
            }
        }
        if !coincident {
            self.attrs.push(AttrRange::attr(new_bits, new.start, new.end));
        }
    }

    fn strip_escapes(&mut self) {
        let mut i = 0;
        while i + 1 < self.chars.len() {
            if self.chars[i] == '\\' && ESCAPABLE.contains(self.chars[i + 1]) && !self.exempt(i) {
                self.remove_at(i, 1);
                // Skip the now-literal character so "\\\\" strips once.
                i += 1;
            } else {
                i += 1;
            }
        }
    }

    /// Replace `||spoiler||` spans with the block glyph repeated to the
    /// spoiler's original display width. Spoiler ordinals found in
    /// `revealed` keep their text (delimiters still stripped).
    fn mask_spoilers(&mut self, revealed: &[usize]) {
        let bars: [char; 2] = ['|', '|'];
        let mut ordinal = 0usize;
        let mut guard = 0;
        while guard < MAX_STRIPS {
            guard += 1;
            let Some(open) = self.find_delim(&bars, 0) else {
                break;
            };
            let Some(close) = self.find_delim(&bars, open + 2) else {
                break;
            };
            if close == open + 2 {
                self.remove_at(open, 4.min(self.chars.len() - open));
                continue;
            }
            if revealed.contains(&ordinal) {
                self.remove_at(close, 2);
                self.remove_at(open, 2);
                self.spoilers.push(Span::new(open, close - 2));
            } else {
                let width: usize = self.chars[open + 2..close].iter().copied().map(char_width).sum();
                let region = close + 2 - open;
                self.remove_at(open, region);
                self.chars
                    .splice(open..open, std::iter::repeat_n(SPOILER_GLYPH, width));
                self.shift_right_from(open, width);
                self.spoilers.push(Span::new(open, open + width));
            }
            ordinal += 1;
        }
    }
}

/// Resolve markdown in an entity-resolved message. `revealed` lists spoiler
/// ordinals the user has opened.
pub fn resolve_markdown(text: &str, revealed: &[usize]) -> FormattedLine {
    let mut st = Stripper::new(text);
    st.find_urls();
    st.strip_code();
    st.strip_markdown_delims();
    st.strip_escapes();
    st.mask_spoilers(revealed);
    FormattedLine {
        text: st.chars.iter().collect(),
        attrs: st.attrs,
        urls: st.urls,
        code: st.code,
        spoilers: st.spoilers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bold_and_italic_scenario() {
        let out = resolve_markdown("**bold** and _ital_", &[]);
        assert_eq!(out.text, "bold and ital");
        assert_eq!(
            out.attrs,
            vec![
                AttrRange::attr(Attr::BOLD, 0, 4),
                AttrRange::attr(Attr::ITALIC, 9, 13),
            ]
        );
    }

    #[test]
    fn underline_double_underscore() {
        let out = resolve_markdown("__under__", &[]);
        assert_eq!(out.text, "under");
        assert_eq!(out.attrs, vec![AttrRange::attr(Attr::UNDERLINE, 0, 5)]);
    }

    #[test]
    fn nested_span_inherits_outer_bits() {
        let out = resolve_markdown("**bold *both* bold**", &[]);
        assert_eq!(out.text, "bold both bold");
        // Outer bold found first, inner span inherits BOLD.
        assert_eq!(out.attrs[0], AttrRange::attr(Attr::BOLD, 0, 14));
        assert_eq!(out.attrs[1], AttrRange::attr(Attr::BOLD | Attr::ITALIC, 5, 9));
    }

    #[test]
    fn coincident_spans_or_merge() {
        let out = resolve_markdown("**_x y_**", &[]);
        assert_eq!(out.text, "x y");
        assert_eq!(out.attrs.len(), 1);
        assert_eq!(out.attrs[0], AttrRange::attr(Attr::BOLD | Attr::ITALIC, 0, 3));
    }

    #[test]
    fn range_shift_invariance() {
        // URL recorded first; stripping "**" before it must shift both
        // boundaries by exactly the removed width, twice (open + close).
        let out = resolve_markdown("**b** https://example.com x", &[]);
        assert_eq!(out.text, "b https://example.com x");
        assert_eq!(out.urls, vec![Span::new(2, 21)]);
        // A strip after the URL must leave it untouched.
        let out = resolve_markdown("https://example.com **b**", &[]);
        assert_eq!(out.urls, vec![Span::new(0, 19)]);
    }

    #[test]
    fn code_span_exempt_from_markdown() {
        let out = resolve_markdown("`**not bold**` **yes**", &[]);
        assert_eq!(out.text, "**not bold** yes");
        assert_eq!(out.code, vec![Span::new(0, 12)]);
        assert_eq!(out.attrs, vec![AttrRange::attr(Attr::BOLD, 13, 16)]);
    }

    #[test]
    fn fenced_block_recorded() {
        let out = resolve_markdown("x ```let a = 1;``` y", &[]);
        assert_eq!(out.text, "x let a = 1; y");
        assert_eq!(out.code, vec![Span::new(2, 12)]);
    }

    #[test]
    fn escaped_markdown_is_literal() {
        let out = resolve_markdown(r"\*not italic\*", &[]);
        assert_eq!(out.text, "*not italic*");
        assert!(out.attrs.is_empty());
    }

    #[test]
    fn escape_strip_shifts_ranges() {
        let out = resolve_markdown(r"\* **b**", &[]);
        assert_eq!(out.text, "* b");
        assert_eq!(out.attrs, vec![AttrRange::attr(Attr::BOLD, 2, 3)]);
    }

    #[test]
    fn spoiler_masked_to_original_width() {
        let out = resolve_markdown("a ||secret|| b", &[]);
        assert_eq!(out.text, format!("a {} b", "█".repeat(6)));
        assert_eq!(out.spoilers, vec![Span::new(2, 8)]);
    }

    #[test]
    fn wide_spoiler_content_masks_display_width() {
        // One wide char masks to two block glyphs.
        let out = resolve_markdown("||界||", &[]);
        assert_eq!(out.text, "██");
        assert_eq!(out.spoilers, vec![Span::new(0, 2)]);
    }

    #[test]
    fn revealed_spoiler_keeps_text() {
        let out = resolve_markdown("||one|| ||two||", &[1]);
        assert_eq!(out.text, format!("{} two", "█".repeat(3)));
        assert_eq!(out.spoilers, vec![Span::new(0, 3), Span::new(4, 7)]);
    }

    #[test]
    fn unmatched_delimiters_left_alone() {
        let out = resolve_markdown("**never closed", &[]);
        assert_eq!(out.text, "**never closed");
        assert!(out.attrs.is_empty());
    }

    #[test]
    fn adversarial_star_wall_terminates() {
        let wall = "*".repeat(500);
        let out = resolve_markdown(&wall, &[]);
        assert!(out.text.chars().count() <= 500);
    }

    #[test]
    fn partial_overlap_or_merge() {
        // Shares one boundary with an existing span; defined behavior is an
        // attribute OR into the existing range, not rejection.
        let out = resolve_markdown("__**x** y__", &[]);
        assert!(!out.attrs.is_empty());
        let has_or = out.attrs.iter().any(|r| match r.style {
            RangeStyle::Attr(bits) => bits.contains(Attr::BOLD | Attr::UNDERLINE),
            RangeStyle::Color(_) => false,
        });
        assert!(has_or, "expected OR-merged bits, got {:?}", out.attrs);
    }

    #[test]
    fn shift_right_moves_all_families() {
        let mut line = resolve_markdown("**b** `c` https://e.co ||s||", &[]);
        let before = line.clone();
        line.shift_right(7);
        assert_eq!(line.attrs[0].start, before.attrs[0].start + 7);
        assert_eq!(line.urls[0].end, before.urls[0].end + 7);
        assert_eq!(line.code[0].start, before.code[0].start + 7);
        assert_eq!(line.spoilers[0].end, before.spoilers[0].end + 7);
    }
}
