//! Per-cell line painting with first-covering-range style resolution.

use crate::batch_writer::BatchWriter;
use crate::color::ColorRegistry;
use crate::layout::Region;
use core_chat::RenderedLine;
use core_format::{Attr, ColorPair, RangeStyle, style_at};
use core_text::char_width;
use crossterm::style::Color;

/// Paints one rendered line into a region row, clipping at the region's
/// right edge and padding the remainder with the default style. A wide
/// character that would straddle the edge is dropped and padded instead.
pub fn paint_line(
    w: &mut BatchWriter,
    registry: &ColorRegistry,
    region: Region,
    row: u16,
    line: &RenderedLine,
) {
    w.move_to(region.x, region.y + row);
    let (def_fg, def_bg) = registry.get(line.default_color);
    let mut col = 0u16;
    for (i, c) in line.text.chars().enumerate() {
        let width = char_width(c) as u16;
        if col + width > region.width {
            break;
        }
        let (fg, bg, attrs) = match style_at(&line.ranges, i) {
            Some(RangeStyle::Color(pair)) => {
                let (f, b) = registry.get(pair);
                (f, b, Attr::empty())
            }
            Some(RangeStyle::Attr(a)) => (def_fg, def_bg, a),
            None => (def_fg, def_bg, Attr::empty()),
        };
        w.set_style(fg, bg, attrs);
        w.print_char(c);
        col += width;
    }
    pad(w, def_fg, def_bg, region.width - col);
}

/// Paints plain chrome text (title, status, member rows) in one style.
pub fn paint_plain(
    w: &mut BatchWriter,
    registry: &ColorRegistry,
    region: Region,
    row: u16,
    text: &str,
    color: ColorPair,
) {
    let (fg, bg) = registry.get(color);
    w.move_to(region.x, region.y + row);
    w.set_style(fg, bg, Attr::empty());
    let (clipped, width) = core_text::truncate_to_width(text, region.width as usize);
    w.print_str(clipped);
    pad(w, fg, bg, region.width.saturating_sub(width as u16));
}

pub fn blank_row(w: &mut BatchWriter, registry: &ColorRegistry, region: Region, row: u16) {
    let (fg, bg) = registry.get(ColorPair(0));
    w.move_to(region.x, region.y + row);
    w.set_style(fg, bg, Attr::empty());
    pad(w, fg, bg, region.width);
}

fn pad(w: &mut BatchWriter, fg: Color, bg: Color, cols: u16) {
    if cols == 0 {
        return;
    }
    w.set_style(fg, bg, Attr::empty());
    for _ in 0..cols {
        w.print_char(' ');
    }
}
