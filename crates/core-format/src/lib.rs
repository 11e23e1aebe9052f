//! Rich-text formatting pipeline: entity substitution, markdown resolution
//! with offset-tracked ranges, and width-aware line reflow.
//!
//! Pipeline order is fixed: `entity::resolve_entities` (pure string to
//! string) feeds `markdown::resolve_markdown` (ranges in final-string
//! offsets) feeds `reflow::reflow` (ranges re-anchored per physical line).

pub mod entity;
pub mod markdown;
pub mod reflow;
pub mod style;

pub use entity::{EntityContext, resolve_entities};
pub use markdown::{FormattedLine, SPOILER_GLYPH, resolve_markdown};
pub use reflow::{ContinuationTemplate, PhysicalLine, reflow};
pub use style::{Attr, AttrRange, ColorPair, RangeStyle, Span, style_at};

use regex::Regex;
use std::sync::OnceLock;

/// Plain URL pattern shared by the markdown resolver (URL spans are exempt
/// from markdown interpretation and later colored/clickable).
pub(crate) fn entity_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"https?://[^\s<>]+").unwrap())
}
