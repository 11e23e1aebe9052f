//! Frame assembly: paints every window from the current buffers into one
//! batched flush.

use crate::batch_writer::BatchWriter;
use crate::color::ColorRegistry;
use crate::layout::{Layout, WindowId};
use crate::paint::{blank_row, paint_line, paint_plain};
use anyhow::Result;
use core_chat::ChatBuffer;
use core_format::ColorPair;
use core_text::display_width;
use core_tree::{TreeBuffer, code_state, is_dropdown_end};
use std::io::Write;
use tracing::debug;

/// Color handles for window chrome and tree states, allocated from the
/// registry at startup by the config layer.
#[derive(Debug, Clone, Copy)]
pub struct RenderTheme {
    pub chrome: ColorPair,
    /// Indexed by tree state category (normal through active-mentioned).
    pub tree_states: [ColorPair; 6],
    pub tree_selected: ColorPair,
    pub input: ColorPair,
    pub selection: ColorPair,
    pub cursor: ColorPair,
    pub popup: ColorPair,
    pub popup_selected: ColorPair,
}

/// Everything one draw needs, borrowed from the owning loop for the
/// duration of the flush.
pub struct Frame<'a> {
    pub chat: &'a ChatBuffer,
    /// Lines scrolled up from the bottom.
    pub chat_scroll: usize,
    pub tree: &'a TreeBuffer,
    pub tree_selected: usize,
    pub tree_scroll: usize,
    pub members: Option<&'a [String]>,
    pub title: &'a str,
    pub status: &'a str,
    pub input_text: &'a str,
    /// Byte offset into `input_text`.
    pub input_cursor: usize,
    pub input_selection: Option<(usize, usize)>,
    pub assist_items: Option<(&'a [String], usize)>,
    pub cursor_visible: bool,
}

pub struct Renderer {
    pub registry: ColorRegistry,
    pub theme: RenderTheme,
    pub layout: Layout,
    show_members: bool,
}

impl Renderer {
    pub fn new(registry: ColorRegistry, theme: RenderTheme, cols: u16, rows: u16) -> Self {
        Self {
            registry,
            theme,
            layout: Layout::compute(cols, rows, false),
            show_members: false,
        }
    }

    pub fn resize(&mut self, cols: u16, rows: u16) {
        self.layout = Layout::compute(cols, rows, self.show_members);
        debug!(target: "render.flush", cols, rows, "layout recomputed");
    }

    pub fn set_members_visible(&mut self, visible: bool) {
        self.show_members = visible;
        self.layout = Layout::compute(self.layout.cols, self.layout.rows, visible);
    }

    pub fn members_visible(&self) -> bool {
        self.show_members
    }

    /// Paints a full frame into `out`. Returns `(commands, cells)` for the
    /// flush log. Errors bubble to the caller, which recovers by forcing a
    /// resize and repainting.
    pub fn draw_to(&mut self, out: &mut impl Write, frame: &Frame<'_>) -> Result<(u64, u64)> {
        if let Some((items, _)) = frame.assist_items {
            self.layout.open_popup(items.len().min(8) as u16);
        } else {
            self.layout.close_popup();
        }

        let mut w = BatchWriter::new();
        paint_plain(
            &mut w,
            &self.registry,
            self.layout.title,
            0,
            frame.title,
            self.theme.chrome,
        );
        self.draw_tree(&mut w, frame);
        self.draw_chat(&mut w, frame);
        if let (Some(region), Some(members)) = (self.layout.members, frame.members) {
            for row in 0..region.height {
                match members.get(row as usize) {
                    Some(name) => {
                        paint_plain(&mut w, &self.registry, region, row, name, self.theme.chrome)
                    }
                    None => blank_row(&mut w, &self.registry, region, row),
                }
            }
        }
        self.draw_input(&mut w, frame);
        paint_plain(
            &mut w,
            &self.registry,
            self.layout.status,
            0,
            frame.status,
            self.theme.chrome,
        );
        if let Some((items, selected)) = frame.assist_items {
            self.draw_popup(&mut w, items, selected);
        }

        let (cmds, cells) = w.flush(out)?;
        debug!(target: "render.flush", cmds, cells, "frame flushed");
        Ok((cmds, cells))
    }

    /// Bottom-up: chat line 0 is the visual bottom of the window.
    fn draw_chat(&self, w: &mut BatchWriter, frame: &Frame<'_>) {
        let region = self.layout.chat;
        for i in 0..region.height {
            let row = region.height - 1 - i;
            match frame.chat.lines.get(frame.chat_scroll + i as usize) {
                Some(line) => paint_line(w, &self.registry, region, row, line),
                None => blank_row(w, &self.registry, region, row),
            }
        }
    }

    fn draw_tree(&self, w: &mut BatchWriter, frame: &Frame<'_>) {
        let region = self.layout.tree;
        let visible: Vec<usize> = (0..frame.tree.codes.len())
            .filter(|i| !is_dropdown_end(frame.tree.codes[*i]))
            .collect();
        for row in 0..region.height {
            let Some(&idx) = visible.get(frame.tree_scroll + row as usize) else {
                blank_row(w, &self.registry, region, row);
                continue;
            };
            let color = if frame.tree_scroll + row as usize == frame.tree_selected {
                self.theme.tree_selected
            } else {
                let state = code_state(frame.tree.codes[idx]) as usize;
                self.theme.tree_states[state.min(5)]
            };
            paint_plain(w, &self.registry, region, row, &frame.tree.lines[idx], color);
        }
    }

    /// Input line with selection highlight and a blink-phased cursor cell.
    fn draw_input(&self, w: &mut BatchWriter, frame: &Frame<'_>) {
        let region = self.layout.input;
        let (fg, bg) = self.registry.get(self.theme.input);
        let (sel_fg, sel_bg) = self.registry.get(self.theme.selection);
        let (cur_fg, cur_bg) = self.registry.get(self.theme.cursor);

        w.move_to(region.x, region.y);
        let mut col = 0u16;
        let mut byte = 0usize;
        let mut cursor_drawn = false;
        for c in frame.input_text.chars() {
            let width = core_text::char_width(c) as u16;
            if col + width > region.width {
                break;
            }
            let selected = frame
                .input_selection
                .is_some_and(|(a, b)| byte >= a && byte < b);
            let at_cursor = byte == frame.input_cursor;
            if at_cursor && frame.cursor_visible {
                w.set_style(cur_fg, cur_bg, core_format::Attr::empty());
                cursor_drawn = true;
            } else if selected {
                w.set_style(sel_fg, sel_bg, core_format::Attr::empty());
            } else {
                w.set_style(fg, bg, core_format::Attr::empty());
            }
            w.print_char(c);
            col += width;
            byte += c.len_utf8();
        }
        // Cursor at end of text paints one highlighted space.
        if !cursor_drawn && frame.cursor_visible && col < region.width {
            w.set_style(cur_fg, cur_bg, core_format::Attr::empty());
            w.print_char(' ');
            col += 1;
        }
        w.set_style(fg, bg, core_format::Attr::empty());
        for _ in col..region.width {
            w.print_char(' ');
        }
    }

    fn draw_popup(&self, w: &mut BatchWriter, items: &[String], selected: usize) {
        let Some(region) = self.layout.popup else {
            return;
        };
        for row in 0..region.height {
            let idx = row as usize;
            let color = if idx == selected {
                self.theme.popup_selected
            } else {
                self.theme.popup
            };
            let text = items.get(idx).map(String::as_str).unwrap_or("");
            paint_plain(w, &self.registry, region, row, text, color);
        }
    }

    /// Column occupied by the input cursor, for terminal cursor placement.
    pub fn input_cursor_column(&self, text: &str, cursor: usize) -> u16 {
        let prefix = &text[..cursor.min(text.len())];
        (self.layout.input.x as usize + display_width(prefix))
            .min(self.layout.input.x as usize + self.layout.input.width.saturating_sub(1) as usize)
            as u16
    }

    /// Windows whose damage requires repainting wide-character chat lines
    /// even on a partial flush.
    pub fn wide_damage(&self, chat: &ChatBuffer, damaged: &[WindowId]) -> bool {
        damaged.contains(&WindowId::Chat) && !chat.wide_lines.is_empty()
    }
}
