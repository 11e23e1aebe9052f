//! Attribute-range model shared by the formatting pipeline and renderer.
//!
//! A range tags a half-open interval of a line's characters with either a
//! color-pair handle or a combinable text attribute. Ranges may overlap;
//! resolution is an explicit contract, not an accident of insertion order:
//! the first range in list order that covers a column wins. Producers must
//! therefore push more-specific ranges before general ones.

bitflags::bitflags! {
    /// Combinable text attributes carried by markdown spans.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Attr: u8 {
        const BOLD      = 0b0000_0001;
        const ITALIC    = 0b0000_0010;
        const UNDERLINE = 0b0000_0100;
    }
}

/// Stable handle into the renderer's color-pair registry. Allocated
/// explicitly, never derived from ambient global state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ColorPair(pub u16);

/// Style carried by one attribute range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RangeStyle {
    Attr(Attr),
    Color(ColorPair),
}

/// `(style, start, end)` — half-open character-offset interval into one
/// rendered line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttrRange {
    pub style: RangeStyle,
    pub start: usize,
    pub end: usize,
}

impl AttrRange {
    pub fn attr(bits: Attr, start: usize, end: usize) -> Self {
        Self {
            style: RangeStyle::Attr(bits),
            start,
            end,
        }
    }

    pub fn color(pair: ColorPair, start: usize, end: usize) -> Self {
        Self {
            style: RangeStyle::Color(pair),
            start,
            end,
        }
    }

    #[inline]
    pub fn covers(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// First covering range wins. Returns `None` when no range covers `offset`,
/// in which case the line's default style applies.
pub fn style_at(ranges: &[AttrRange], offset: usize) -> Option<RangeStyle> {
    ranges.iter().find(|r| r.covers(offset)).map(|r| r.style)
}

/// A bare `(start, end)` character interval used for url/code/spoiler spans
/// before they are assigned palette colors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    #[inline]
    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_covering_range_wins() {
        let ranges = [
            AttrRange::attr(Attr::BOLD, 2, 6),
            AttrRange::attr(Attr::ITALIC, 0, 10),
        ];
        assert_eq!(style_at(&ranges, 3), Some(RangeStyle::Attr(Attr::BOLD)));
        assert_eq!(style_at(&ranges, 0), Some(RangeStyle::Attr(Attr::ITALIC)));
        assert_eq!(style_at(&ranges, 7), Some(RangeStyle::Attr(Attr::ITALIC)));
        assert_eq!(style_at(&ranges, 10), None);
    }

    #[test]
    fn half_open_boundaries() {
        let r = AttrRange::color(ColorPair(1), 4, 8);
        assert!(!r.covers(3));
        assert!(r.covers(4));
        assert!(r.covers(7));
        assert!(!r.covers(8));
    }
}
