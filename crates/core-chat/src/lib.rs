//! Chat buffer construction: drives the entity/markdown/reflow pipeline per
//! message and produces the line buffer the renderer paints.
//!
//! The buffer is ordered for bottom-up rendering: index 0 is the visual
//! bottom (the newest message's last sub-line) and indices grow upward into
//! history. Messages arrive oldest→newest; the builder walks them newest
//! first and appends each message's sub-lines in reverse display order so
//! the renderer can paint `lines[i]` at `bottom_row - i` directly.
//!
//! Buffers are rebuilt whole when source data changes, never patched, and
//! are owned by the builder's caller; the renderer only borrows them for
//! the duration of one draw.

use chrono::{DateTime, Datelike, Utc};
use core_format::{
    AttrRange, ColorPair, ContinuationTemplate, EntityContext, FormattedLine, PhysicalLine,
    reflow, resolve_entities, resolve_markdown,
};
use core_model::{BlockedPolicy, DeletedPolicy, Message, MessageId, Viewer};
use core_text::{display_width, is_wide, truncate_to_width};
use tracing::debug;

pub const BLOCKED_AUTHOR: &str = "blocked";
pub const BLOCKED_CONTENT: &str = "[blocked message]";
pub const NEW_MARKER_TEXT: &str = "new messages";

/// Color-pair handles for every element the chat window paints. The
/// `*_mention` variants apply to a message that mentions the viewer.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub text: ColorPair,
    pub text_mention: ColorPair,
    pub timestamp: ColorPair,
    pub author: ColorPair,
    pub url: ColorPair,
    pub url_mention: ColorPair,
    pub code: ColorPair,
    pub code_mention: ColorPair,
    pub spoiler: ColorPair,
    pub spoiler_mention: ColorPair,
    pub separator: ColorPair,
    pub new_marker: ColorPair,
    pub reply: ColorPair,
    pub reactions: ColorPair,
    pub edited: ColorPair,
    pub deleted: ColorPair,
    pub pending: ColorPair,
}

/// Sub-kind recorded per rendered line for click/selection lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    DateSeparator,
    NewMarker,
    ReplyHeader,
    Interaction,
    Content,
    Continuation,
    Reactions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineMeta {
    pub message_id: MessageId,
    pub kind: LineKind,
}

/// One finished terminal line: width-bounded text, ordered attribute ranges
/// (first covering wins), a default color, and a wide-character flag.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedLine {
    pub text: String,
    pub ranges: Vec<AttrRange>,
    pub default_color: ColorPair,
    pub has_wide: bool,
}

#[derive(Debug, Default, Clone)]
pub struct ChatBuffer {
    pub lines: Vec<RenderedLine>,
    /// Parallel to `lines`; `None` for lines with no source message.
    pub meta: Vec<Option<LineMeta>>,
    /// Line count per message, in build (newest-first) order.
    pub lines_per_message: Vec<(MessageId, usize)>,
    /// Indices of lines containing double-width glyphs, for partial redraws.
    pub wide_lines: Vec<usize>,
}

impl ChatBuffer {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Message under a given buffer line, for click/selection lookup.
    pub fn message_at(&self, line: usize) -> Option<LineMeta> {
        self.meta.get(line).copied().flatten()
    }
}

pub struct ChatBuilder<'a> {
    pub ctx: EntityContext<'a>,
    pub viewer: &'a Viewer,
    pub palette: &'a Palette,
    /// Chat window width in columns.
    pub width: usize,
    pub blocked_policy: BlockedPolicy,
    pub deleted_policy: DeletedPolicy,
}

impl<'a> ChatBuilder<'a> {
    /// Build the full buffer from `messages` (ordered oldest→newest).
    pub fn build(&self, messages: &[Message]) -> ChatBuffer {
        let mut buf = ChatBuffer::default();
        for (i, msg) in messages.iter().enumerate().rev() {
            let prev = if i > 0 { Some(&messages[i - 1]) } else { None };
            let sub = self.message_lines(msg, prev, messages);
            if sub.is_empty() {
                continue;
            }
            buf.lines_per_message.push((msg.id, sub.len()));
            for (line, meta) in sub.into_iter().rev() {
                if line.has_wide {
                    buf.wide_lines.push(buf.lines.len());
                }
                buf.lines.push(line);
                buf.meta.push(meta);
            }
        }
        debug!(
            target: "chat.build",
            messages = messages.len(),
            lines = buf.lines.len(),
            wide_lines = buf.wide_lines.len(),
            "chat buffer rebuilt"
        );
        buf
    }

    /// Sub-lines for one message in display (top→bottom) order.
    fn message_lines(
        &self,
        msg: &Message,
        prev: Option<&Message>,
        all: &[Message],
    ) -> Vec<(RenderedLine, Option<LineMeta>)> {
        let blocked = self.viewer.is_blocked(msg.author.id);
        if blocked && self.blocked_policy == BlockedPolicy::Hidden {
            return Vec::new();
        }
        if msg.deleted && self.deleted_policy == DeletedPolicy::Hidden {
            return Vec::new();
        }

        let mut out = Vec::new();
        if self.needs_date_separator(msg, prev) {
            out.push(self.separator_line(msg.id, &format_date(msg.timestamp)));
        }
        if self.needs_new_marker(msg, prev) {
            out.push(self.new_marker_line(msg.id));
        }
        if let Some(reply_id) = msg.reply_to {
            // The referenced message may have scrolled out of the fetched
            // window; degrade to a generic header rather than dropping it.
            let line = match all.iter().find(|m| m.id == reply_id) {
                Some(referenced) => self.reply_header_resolved(referenced),
                None => {
                    let (text, _) = truncate_to_width("╭─ in reply to", self.width);
                    plain_line(text.to_string(), self.palette.reply)
                }
            };
            out.push((
                line,
                Some(LineMeta {
                    message_id: msg.id,
                    kind: LineKind::ReplyHeader,
                }),
            ));
        }
        if let Some(inter) = &msg.interaction {
            let text = format!("⚡ @{} used /{}", inter.user_name, inter.command_name);
            let (text, _) = truncate_to_width(&text, self.width);
            out.push((
                plain_line(text.to_string(), self.palette.reply),
                Some(LineMeta {
                    message_id: msg.id,
                    kind: LineKind::Interaction,
                }),
            ));
        }
        self.content_lines(msg, blocked, &mut out);
        if !msg.reactions.is_empty() && !msg.deleted {
            out.push(self.reactions_line(msg));
        }
        out
    }

    fn needs_date_separator(&self, msg: &Message, prev: Option<&Message>) -> bool {
        match prev {
            None => true,
            Some(p) => {
                let (a, b) = (p.timestamp, msg.timestamp);
                (a.year(), a.ordinal()) != (b.year(), b.ordinal())
            }
        }
    }

    fn needs_new_marker(&self, msg: &Message, prev: Option<&Message>) -> bool {
        let Some(seen) = self.viewer.last_seen else {
            return false;
        };
        msg.id > seen && prev.is_none_or(|p| p.id <= seen)
    }

    fn separator_line(&self, id: MessageId, label: &str) -> (RenderedLine, Option<LineMeta>) {
        (
            plain_line(rule_with_label(label, self.width), self.palette.separator),
            Some(LineMeta {
                message_id: id,
                kind: LineKind::DateSeparator,
            }),
        )
    }

    fn new_marker_line(&self, id: MessageId) -> (RenderedLine, Option<LineMeta>) {
        (
            plain_line(
                rule_with_label(NEW_MARKER_TEXT, self.width),
                self.palette.new_marker,
            ),
            Some(LineMeta {
                message_id: id,
                kind: LineKind::NewMarker,
            }),
        )
    }

    /// Reply header with the referenced message resolved from the buffer.
    pub fn reply_header_resolved(&self, referenced: &Message) -> RenderedLine {
        let snippet = resolve_entities(&referenced.content, &self.ctx);
        let text = format!(
            "╭─ @{}: {}",
            referenced.author.display_name(),
            snippet.replace('\n', " ")
        );
        let (text, _) = truncate_to_width(&text, self.width);
        plain_line(text.to_string(), self.palette.reply)
    }

    fn content_lines(
        &self,
        msg: &Message,
        blocked: bool,
        out: &mut Vec<(RenderedLine, Option<LineMeta>)>,
    ) {
        let masked = blocked && self.blocked_policy == BlockedPolicy::Masked;
        let deleted = msg.deleted;
        let mentioned = !masked && !deleted && self.viewer.mentioned_in(msg);

        let author: &str = if masked {
            BLOCKED_AUTHOR
        } else {
            msg.author.display_name()
        };
        let header = format!("{} {} ", msg.timestamp.format("%H:%M"), author);
        let header_len = header.chars().count();
        let ts_len = 5;

        // Formatting is disabled for masked and deleted content.
        let mut formatted: FormattedLine = if masked {
            FormattedLine::plain(BLOCKED_CONTENT)
        } else if deleted {
            FormattedLine::plain(msg.content.clone())
        } else {
            let resolved = resolve_entities(&msg.content, &self.ctx);
            resolve_markdown(&resolved, &msg.revealed_spoilers)
        };

        if !masked && !deleted {
            for embed in &msg.embeds {
                let label = embed
                    .title
                    .as_deref()
                    .or(embed.description.as_deref())
                    .unwrap_or("embed");
                append_block(&mut formatted, &format!("[embed: {label}]"));
            }
            for sticker in &msg.stickers {
                append_block(&mut formatted, &format!("[sticker: {}]", sticker.name));
            }
        }

        formatted.shift_right(header_len);
        formatted.text = format!("{header}{}", formatted.text);

        if msg.edited && !deleted {
            let start = formatted.text.chars().count();
            formatted.text.push_str(" (edited)");
            formatted
                .attrs
                .push(AttrRange::color(self.palette.edited, start, start + 9));
        }

        let default_color = if deleted {
            self.palette.deleted
        } else if msg.pending {
            self.palette.pending
        } else if mentioned {
            self.palette.text_mention
        } else {
            self.palette.text
        };

        let cont = ContinuationTemplate::indent_only(" ".repeat(ts_len + 1));
        let physical = reflow(&formatted, self.width.max(8), &cont);
        for (n, phys) in physical.into_iter().enumerate() {
            let kind = if n == 0 {
                LineKind::Content
            } else {
                LineKind::Continuation
            };
            let line = self.assemble(phys, n == 0, mentioned, default_color);
            out.push((
                line,
                Some(LineMeta {
                    message_id: msg.id,
                    kind,
                }),
            ));
        }
    }

    /// Combine one physical line's range families into the final ordered
    /// range list: code, spoiler, url colors first (most specific), then
    /// markdown attributes, then header colors.
    fn assemble(
        &self,
        phys: PhysicalLine,
        first: bool,
        mentioned: bool,
        default_color: ColorPair,
    ) -> RenderedLine {
        let p = self.palette;
        let (code, spoiler, url) = if mentioned {
            (p.code_mention, p.spoiler_mention, p.url_mention)
        } else {
            (p.code, p.spoiler, p.url)
        };
        let mut ranges = Vec::new();
        for s in &phys.code {
            ranges.push(AttrRange::color(code, s.start, s.end));
        }
        for s in &phys.spoilers {
            ranges.push(AttrRange::color(spoiler, s.start, s.end));
        }
        for s in &phys.urls {
            ranges.push(AttrRange::color(url, s.start, s.end));
        }
        ranges.extend(phys.attrs.iter().copied());
        if first {
            ranges.push(AttrRange::color(p.timestamp, 0, 5));
            // Author span runs from after "HH:MM " to the next space.
            let chars: Vec<char> = phys.text.chars().collect();
            let mut end = 6;
            while end < chars.len() && chars[end] != ' ' {
                end += 1;
            }
            if end > 6 {
                ranges.push(AttrRange::color(p.author, 6, end));
            }
        }
        RenderedLine {
            has_wide: phys.text.chars().any(is_wide),
            text: phys.text,
            ranges,
            default_color,
        }
    }

    fn reactions_line(&self, msg: &Message) -> (RenderedLine, Option<LineMeta>) {
        let parts: Vec<String> = msg
            .reactions
            .iter()
            .map(|r| format!("[{} {}]", r.emoji_name, r.count))
            .collect();
        let text = format!("      {}", parts.join(" "));
        let (text, _) = truncate_to_width(&text, self.width);
        (
            plain_line(text.to_string(), self.palette.reactions),
            Some(LineMeta {
                message_id: msg.id,
                kind: LineKind::Reactions,
            }),
        )
    }
}

fn plain_line(text: String, color: ColorPair) -> RenderedLine {
    RenderedLine {
        has_wide: text.chars().any(is_wide),
        text,
        ranges: Vec::new(),
        default_color: color,
    }
}

fn append_block(line: &mut FormattedLine, block: &str) {
    if line.text.is_empty() {
        line.text.push_str(block);
    } else {
        line.text.push('\n');
        line.text.push_str(block);
    }
}

fn format_date(ts: DateTime<Utc>) -> String {
    ts.format("%-d %B %Y").to_string()
}

/// "── label ──────" padded with rules to `width` columns.
fn rule_with_label(label: &str, width: usize) -> String {
    let head = format!("── {label} ");
    let used = display_width(&head);
    let fill = width.saturating_sub(used);
    format!("{head}{}", "─".repeat(fill))
}
