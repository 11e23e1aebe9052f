//! Queues cell writes and groups consecutive same-style prints into single
//! terminal `Print` commands, so a burst of per-cell paints costs one escape
//! sequence per style run instead of one per cell.
//!
//! `print_commands` and `cells` give the command/cell ratio; assertions and
//! periodic logs use them to confirm batching is effective.

use anyhow::Result;
use core_format::Attr;
use crossterm::style::{
    Attribute, Color, Print, SetAttribute, SetBackgroundColor, SetForegroundColor,
};
use crossterm::{
    cursor::MoveTo,
    queue,
    terminal::{Clear, ClearType},
};
use std::io::Write;

#[derive(Debug, Clone, PartialEq)]
enum Command {
    MoveTo(u16, u16),
    ClearLine,
    Style { fg: Color, bg: Color, attrs: Attr },
    Print(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct StyleState {
    fg: Color,
    bg: Color,
    attrs: Attr,
}

#[derive(Debug, Default)]
pub struct BatchWriter {
    cmds: Vec<Command>,
    pending: String,
    current: Option<StyleState>,
    pub print_commands: u64,
    pub cells: u64,
}

impl BatchWriter {
    pub fn new() -> Self {
        Self::default()
    }

    fn flush_pending(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let s = std::mem::take(&mut self.pending);
        self.cmds.push(Command::Print(s));
        self.print_commands += 1;
    }

    pub fn move_to(&mut self, x: u16, y: u16) {
        self.flush_pending();
        self.cmds.push(Command::MoveTo(x, y));
    }

    pub fn clear_line(&mut self) {
        self.flush_pending();
        self.cmds.push(Command::ClearLine);
    }

    /// Sets the style for subsequent prints; a no-op when unchanged, which
    /// keeps same-style runs in one batch.
    pub fn set_style(&mut self, fg: Color, bg: Color, attrs: Attr) {
        let next = StyleState { fg, bg, attrs };
        if self.current == Some(next) {
            return;
        }
        self.flush_pending();
        self.current = Some(next);
        self.cmds.push(Command::Style { fg, bg, attrs });
    }

    pub fn print_char(&mut self, c: char) {
        self.pending.push(c);
        self.cells += 1;
    }

    pub fn print_str(&mut self, s: &str) {
        if s.is_empty() {
            return;
        }
        self.pending.push_str(s);
        self.cells += s.chars().count() as u64;
    }

    /// Queues everything into `out` and flushes once.
    pub fn flush(mut self, out: &mut impl Write) -> Result<(u64, u64)> {
        self.flush_pending();
        for c in &self.cmds {
            match c {
                Command::MoveTo(x, y) => queue!(out, MoveTo(*x, *y))?,
                Command::ClearLine => queue!(out, Clear(ClearType::CurrentLine))?,
                Command::Style { fg, bg, attrs } => {
                    queue!(
                        out,
                        SetAttribute(Attribute::Reset),
                        SetForegroundColor(*fg),
                        SetBackgroundColor(*bg)
                    )?;
                    if attrs.contains(Attr::BOLD) {
                        queue!(out, SetAttribute(Attribute::Bold))?;
                    }
                    if attrs.contains(Attr::ITALIC) {
                        queue!(out, SetAttribute(Attribute::Italic))?;
                    }
                    if attrs.contains(Attr::UNDERLINE) {
                        queue!(out, SetAttribute(Attribute::Underlined))?;
                    }
                }
                Command::Print(s) => queue!(out, Print(s))?,
            }
        }
        queue!(out, SetAttribute(Attribute::Reset))?;
        out.flush()?;
        Ok((self.print_commands, self.cells))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_style_run_is_one_command() {
        let mut w = BatchWriter::new();
        w.move_to(0, 0);
        w.set_style(Color::Reset, Color::Reset, Attr::empty());
        w.print_char('a');
        w.print_char('b');
        w.set_style(Color::Reset, Color::Reset, Attr::empty());
        w.print_char('c');
        w.set_style(Color::Red, Color::Reset, Attr::BOLD);
        w.print_char('x');
        let mut out = Vec::new();
        let (cmds, cells) = w.flush(&mut out).unwrap();
        assert_eq!(cmds, 2, "abc run and x run");
        assert_eq!(cells, 4);
        assert!(!out.is_empty());
    }

    #[test]
    fn movement_breaks_batch() {
        let mut w = BatchWriter::new();
        w.set_style(Color::Reset, Color::Reset, Attr::empty());
        w.print_char('a');
        w.move_to(0, 1);
        w.print_char('b');
        let mut out = Vec::new();
        let (cmds, _) = w.flush(&mut out).unwrap();
        assert_eq!(cmds, 2);
    }
}
