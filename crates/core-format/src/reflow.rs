//! Line reflow: split one logical (unbounded-width) formatted line into
//! width-bounded physical lines on word boundaries, re-anchoring every
//! recorded range to each physical line's local offsets.
//!
//! Breaks happen at the last whitespace or embedded newline at or before the
//! width boundary; with no break candidate the line is hard-broken at the
//! character boundary nearest the limit, never inside a two-column
//! character. The consumed break character is dropped. Wrapped remainders
//! are prefixed by the continuation template (indent plus an optional
//! two-column quote glyph), and local range offsets account for that prefix.

use crate::markdown::FormattedLine;
use crate::style::{AttrRange, Span};
use core_text::{char_width, is_wide};
use tracing::warn;

/// Hard cap on emitted physical lines per logical line; pathological input
/// (no breakable whitespace, width 1) truncates instead of looping.
const MAX_PHYSICAL_LINES: usize = 200;

/// Format template applied to wrapped remainder lines.
#[derive(Debug, Clone, Default)]
pub struct ContinuationTemplate {
    pub indent: String,
    /// Rendered between indent and text; occupies two columns when present.
    pub quote_glyph: Option<String>,
}

impl ContinuationTemplate {
    pub fn indent_only(indent: impl Into<String>) -> Self {
        Self {
            indent: indent.into(),
            quote_glyph: None,
        }
    }

    fn prefix(&self) -> String {
        match &self.quote_glyph {
            Some(g) => format!("{}{}", self.indent, g),
            None => self.indent.clone(),
        }
    }
}

/// One terminal row produced by reflow. Range families carry offsets local
/// to `text`.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalLine {
    pub text: String,
    pub attrs: Vec<AttrRange>,
    pub urls: Vec<Span>,
    pub code: Vec<Span>,
    pub spoilers: Vec<Span>,
    pub has_wide: bool,
    pub continuation: bool,
}

fn clip_spans(spans: &[Span], base: usize, end: usize, local_shift: usize) -> Vec<Span> {
    spans
        .iter()
        .filter_map(|s| {
            let start = s.start.max(base);
            let stop = s.end.min(end);
            if start < stop {
                Some(Span::new(start - base + local_shift, stop - base + local_shift))
            } else {
                None
            }
        })
        .collect()
}

fn clip_attrs(ranges: &[AttrRange], base: usize, end: usize, local_shift: usize) -> Vec<AttrRange> {
    ranges
        .iter()
        .filter_map(|r| {
            let start = r.start.max(base);
            let stop = r.end.min(end);
            if start < stop {
                Some(AttrRange {
                    style: r.style,
                    start: start - base + local_shift,
                    end: stop - base + local_shift,
                })
            } else {
                None
            }
        })
        .collect()
}

/// Split `line` into physical lines no wider than `max_width` columns.
pub fn reflow(
    line: &FormattedLine,
    max_width: usize,
    cont: &ContinuationTemplate,
) -> Vec<PhysicalLine> {
    let chars: Vec<char> = line.text.chars().collect();
    let max_width = max_width.max(1);
    let mut out = Vec::new();
    let mut base = 0usize;

    loop {
        if out.len() >= MAX_PHYSICAL_LINES {
            warn!(
                target: "format.reflow",
                emitted = out.len(),
                remaining = chars.len() - base,
                "physical line bound reached; truncating"
            );
            break;
        }
        let (prefix, continuation) = if out.is_empty() {
            (String::new(), false)
        } else {
            (cont.prefix(), true)
        };
        let prefix_chars = prefix.chars().count();
        let prefix_width: usize = prefix.chars().map(char_width).sum();
        let avail = max_width.saturating_sub(prefix_width).max(1);

        // Walk forward until the width budget or an embedded newline stops us.
        let mut width = 0usize;
        let mut fit = 0usize; // chars consumed from `base`
        let mut newline_at: Option<usize> = None;
        while base + fit < chars.len() {
            let c = chars[base + fit];
            if c == '\n' {
                newline_at = Some(fit);
                break;
            }
            let w = char_width(c);
            if width + w > avail {
                break;
            }
            width += w;
            fit += 1;
        }

        let exhausted = base + fit >= chars.len();
        let (take, removed) = if let Some(nl) = newline_at {
            (nl, 1) // drop the newline
        } else if exhausted {
            (fit, 0)
        } else if chars[base + fit] == ' ' {
            // The boundary itself lands on a space: break exactly there.
            (fit, 1)
        } else {
            // Otherwise the last whitespace before the boundary.
            match chars[base..base + fit].iter().rposition(|c| *c == ' ') {
                Some(ws) => (ws, 1),
                None => (fit, 0), // hard break; never lands inside a wide char
            }
        };

        let slice: String = chars[base..base + take].iter().collect();
        let end = base + take;
        let mut text = format!("{prefix}{slice}");
        let mut code = clip_spans(&line.code, base, end, prefix_chars);
        let attrs = clip_attrs(&line.attrs, base, end, prefix_chars);
        let urls = clip_spans(&line.urls, base, end, prefix_chars);
        let spoilers = clip_spans(&line.spoilers, base, end, prefix_chars);

        // Code-block fills must reach the line's visual end: right-pad the
        // text and stretch the covering code span over the padding.
        if !code.is_empty() {
            let line_width: usize = text.chars().map(char_width).sum();
            if line_width < max_width {
                let pad = max_width - line_width;
                text.extend(std::iter::repeat_n(' ', pad));
                let text_chars = text.chars().count();
                if let Some(last) = code.last_mut()
                    && last.end == prefix_chars + take
                {
                    last.end = text_chars;
                }
            }
        }

        out.push(PhysicalLine {
            has_wide: text.chars().any(is_wide),
            text,
            attrs,
            urls,
            code,
            spoilers,
            continuation,
        });

        base = end + removed;
        if base >= chars.len() {
            break;
        }
    }

    if out.is_empty() {
        out.push(PhysicalLine {
            text: String::new(),
            attrs: Vec::new(),
            urls: Vec::new(),
            code: Vec::new(),
            spoilers: Vec::new(),
            has_wide: false,
            continuation: false,
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::resolve_markdown;
    use crate::style::Attr;
    use core_text::display_width;
    use proptest::prelude::*;

    fn plain(text: &str) -> FormattedLine {
        FormattedLine::plain(text)
    }

    #[test]
    fn short_line_unsplit() {
        let out = reflow(&plain("hello world"), 80, &ContinuationTemplate::default());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text, "hello world");
        assert!(!out[0].continuation);
    }

    #[test]
    fn wraps_on_word_boundary() {
        let out = reflow(
            &plain("alpha beta gamma"),
            10,
            &ContinuationTemplate::default(),
        );
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].text, "alpha beta");
        assert_eq!(out[1].text, "gamma");
    }

    #[test]
    fn hard_break_exact_columns() {
        // 200 chars, no spaces, width 40: five full lines, no wide splits.
        let msg = "x".repeat(200);
        let out = reflow(&plain(&msg), 40, &ContinuationTemplate::default());
        assert_eq!(out.len(), 5);
        for l in &out {
            assert_eq!(display_width(&l.text), 40);
        }
    }

    #[test]
    fn never_splits_wide_char() {
        let msg = "界".repeat(10);
        let out = reflow(&plain(&msg), 5, &ContinuationTemplate::default());
        for l in &out {
            assert!(display_width(&l.text) <= 5);
            assert_eq!(display_width(&l.text) % 2, 0, "wide char split in {:?}", l.text);
        }
    }

    #[test]
    fn embedded_newline_forces_break() {
        let out = reflow(&plain("one\ntwo"), 80, &ContinuationTemplate::default());
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].text, "one");
        assert_eq!(out[1].text, "two");
    }

    #[test]
    fn continuation_prefix_shifts_ranges() {
        let line = resolve_markdown("**bold** plus some trailing words here", &[]);
        let cont = ContinuationTemplate::indent_only("  ");
        let out = reflow(&line, 12, &cont);
        assert!(out.len() > 1);
        assert_eq!(out[0].attrs, vec![AttrRange::attr(Attr::BOLD, 0, 4)]);
        for l in &out[1..] {
            assert!(l.text.starts_with("  "));
            for r in &l.attrs {
                assert!(r.start >= 2);
            }
        }
    }

    #[test]
    fn quote_glyph_offsets_by_two_columns() {
        let line = resolve_markdown("aaaa bbbb **cc**", &[]);
        let cont = ContinuationTemplate {
            indent: String::new(),
            quote_glyph: Some("▌ ".into()),
        };
        let out = reflow(&line, 10, &cont);
        assert!(out.len() >= 2);
        let last = out.last().unwrap();
        assert!(last.text.starts_with("▌ "));
        for r in &last.attrs {
            assert!(r.start >= 2);
        }
    }

    #[test]
    fn ranges_clipped_across_lines() {
        // Bold span crosses the wrap point; each side carries its clipped part.
        let line = resolve_markdown("**aaaa bbbb**", &[]);
        let out = reflow(&line, 7, &ContinuationTemplate::default());
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].text, "aaaa");
        assert_eq!(out[0].attrs, vec![AttrRange::attr(Attr::BOLD, 0, 4)]);
        assert_eq!(out[1].text, "bbbb");
        assert_eq!(out[1].attrs, vec![AttrRange::attr(Attr::BOLD, 0, 4)]);
    }

    #[test]
    fn code_line_right_padded() {
        let line = resolve_markdown("`let x = 1;`", &[]);
        let out = reflow(&line, 20, &ContinuationTemplate::default());
        assert_eq!(out.len(), 1);
        assert_eq!(display_width(&out[0].text), 20);
        assert_eq!(out[0].code[0].end, out[0].text.chars().count());
    }

    #[test]
    fn pathological_input_terminates() {
        let msg = "y".repeat(10_000);
        let out = reflow(&plain(&msg), 1, &ContinuationTemplate::default());
        assert_eq!(out.len(), MAX_PHYSICAL_LINES);
    }

    #[test]
    fn empty_input_single_empty_line() {
        let out = reflow(&plain(""), 40, &ContinuationTemplate::default());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text, "");
    }

    proptest! {
        #[test]
        fn width_bound_holds(s in "[a-z 界]{0,200}", max in 4usize..60) {
            let out = reflow(&plain(&s), max, &ContinuationTemplate::indent_only(" "));
            for l in &out {
                prop_assert!(display_width(&l.text) <= max);
            }
        }

        #[test]
        fn coverage_round_trip(words in proptest::collection::vec("[a-z]{1,8}", 1..20), max in 10usize..40) {
            // Space-separated words: concatenating the slices and re-adding
            // one removed break per split reproduces the logical line.
            let s = words.join(" ");
            let out = reflow(&plain(&s), max, &ContinuationTemplate::default());
            let joined = out
                .iter()
                .map(|l| l.text.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            prop_assert_eq!(joined, s);
        }
    }
}
