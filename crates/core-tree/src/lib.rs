//! Guild/folder/category/channel/thread tree as a flat line buffer.
//!
//! Two deterministic passes build the listing: pass 1 sorts every membership
//! list by server-declared position; pass 2 walks the sorted structure
//! emitting one line plus one integer status code per visible node, skipping
//! hidden nodes and propagating unseen/mention state upward. A final
//! connector pass rewrites leading indentation glyphs by inspecting only
//! neighboring status codes.
//!
//! Status code layout: `type*100 + category*10 + expand_flag`. Codes at or
//! above `DROPDOWN_END_BASE` are drop-down terminators: they close the
//! nesting level `code - DROPDOWN_END_BASE` and are never rendered.

use core_model::{Channel, ChannelKind, Guild, GuildFolder};
use core_text::truncate_to_width;
use tracing::debug;

pub const TYPE_FOLDER: u32 = 1;
pub const TYPE_GUILD: u32 = 2;
pub const TYPE_CATEGORY: u32 = 3;
pub const TYPE_CHANNEL: u32 = 4;
pub const TYPE_THREAD: u32 = 5;
pub const TYPE_DM: u32 = 6;

/// Mutually exclusive state categories (`(code / 10) % 10`).
pub const STATE_NORMAL: u32 = 0;
pub const STATE_MUTED: u32 = 1;
pub const STATE_MENTIONED: u32 = 2;
pub const STATE_UNSEEN: u32 = 3;
pub const STATE_ACTIVE: u32 = 4;
pub const STATE_ACTIVE_MENTIONED: u32 = 5;

pub const DROPDOWN_END_BASE: u32 = 1000;

#[inline]
pub fn code_type(code: u32) -> u32 {
    code / 100
}

#[inline]
pub fn code_state(code: u32) -> u32 {
    (code / 10) % 10
}

#[inline]
pub fn code_expanded(code: u32) -> bool {
    code % 10 == 1
}

#[inline]
pub fn is_dropdown_end(code: u32) -> bool {
    code >= DROPDOWN_END_BASE
}

fn make_code(node_type: u32, state: u32, expanded: bool) -> u32 {
    node_type * 100 + state * 10 + u32::from(expanded)
}

/// Aggregated unread state bubbled from children to their drop-down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Rollup {
    unseen: bool,
    mentioned: bool,
}

impl Rollup {
    fn absorb(&mut self, other: Rollup) {
        self.unseen |= other.unseen;
        self.mentioned |= other.mentioned;
    }
}

/// Flat tree listing: one display line and one status code per entry.
/// Terminator entries carry an empty line and a code ≥ `DROPDOWN_END_BASE`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TreeBuffer {
    pub lines: Vec<String>,
    pub codes: Vec<u32>,
    /// Channel/guild id per line for click dispatch; `None` on terminators.
    pub ids: Vec<Option<u64>>,
}

impl TreeBuffer {
    fn push(&mut self, line: String, code: u32, id: Option<u64>) {
        self.lines.push(line);
        self.codes.push(code);
        self.ids.push(id);
    }

    /// Number of renderable (non-terminator) lines.
    pub fn visible_len(&self) -> usize {
        self.codes.iter().filter(|c| !is_dropdown_end(**c)).count()
    }
}

pub struct TreeBuilder<'a> {
    pub folders: &'a [GuildFolder],
    pub guilds: &'a [Guild],
    pub channels: &'a [Channel],
    /// Currently open channel, painted with the active state.
    pub active_channel: Option<u64>,
    /// Tree window width in columns.
    pub width: usize,
}

impl<'a> TreeBuilder<'a> {
    pub fn build(&self) -> TreeBuffer {
        let mut buf = TreeBuffer::default();

        // Pass 1: sorted working copies, server-declared position order.
        let mut folders: Vec<&GuildFolder> = self.folders.iter().collect();
        folders.sort_by_key(|f| f.position);
        let mut guilds: Vec<&Guild> = self.guilds.iter().collect();
        guilds.sort_by_key(|g| g.position);

        // Pass 2: emit loose guilds and folders interleaved by position.
        for folder in &folders {
            self.emit_folder(folder, &guilds, &mut buf);
        }
        for guild in guilds.iter().filter(|g| g.folder_id.is_none()) {
            self.emit_guild(guild, 0, &mut buf);
        }

        let connected = connect(buf);
        debug!(
            target: "tree.build",
            lines = connected.lines.len(),
            visible = connected.visible_len(),
            "tree buffer rebuilt"
        );
        connected
    }

    fn emit_folder(&self, folder: &GuildFolder, guilds: &[&Guild], buf: &mut TreeBuffer) {
        let members: Vec<&&Guild> = guilds
            .iter()
            .filter(|g| g.folder_id == Some(folder.id))
            .collect();
        if members.is_empty() {
            return;
        }
        let slot = buf.codes.len();
        buf.push(String::new(), 0, None);

        let mut roll = Rollup::default();
        if !folder.collapsed {
            for guild in &members {
                roll.absorb(self.emit_guild(guild, 1, buf));
            }
            buf.push(String::new(), DROPDOWN_END_BASE + 1, None);
        } else {
            for guild in &members {
                roll.absorb(self.guild_rollup(guild));
            }
        }

        let state = rollup_state(roll, false);
        buf.codes[slot] = make_code(TYPE_FOLDER, state, !folder.collapsed);
        let name = folder.name.as_deref().unwrap_or("folder");
        buf.lines[slot] = self.node_line(0, name, !folder.collapsed);
        buf.ids[slot] = Some(folder.id);
    }

    fn emit_guild(&self, guild: &Guild, depth: usize, buf: &mut TreeBuffer) -> Rollup {
        let slot = buf.codes.len();
        buf.push(String::new(), 0, None);

        let mut channels: Vec<&Channel> = self
            .channels
            .iter()
            .filter(|c| c.guild_id == Some(guild.id) && c.parent_id.is_none())
            .collect();
        channels.sort_by_key(|c| c.position);

        let mut roll = Rollup::default();
        if !guild.collapsed {
            for ch in &channels {
                match ch.kind {
                    ChannelKind::Category => roll.absorb(self.emit_category(ch, depth + 1, buf)),
                    _ => roll.absorb(self.emit_channel(ch, depth + 1, buf)),
                }
            }
            buf.push(String::new(), DROPDOWN_END_BASE + depth as u32 + 1, None);
        } else {
            roll = self.guild_rollup(guild);
        }

        let state = if guild.muted && !roll.mentioned {
            STATE_MUTED
        } else {
            rollup_state(roll, false)
        };
        buf.codes[slot] = make_code(TYPE_GUILD, state, !guild.collapsed);
        buf.lines[slot] = self.node_line(depth, &guild.name, !guild.collapsed);
        buf.ids[slot] = Some(guild.id);
        roll
    }

    fn emit_category(&self, cat: &Channel, depth: usize, buf: &mut TreeBuffer) -> Rollup {
        let mut children: Vec<&Channel> = self
            .channels
            .iter()
            .filter(|c| c.parent_id == Some(cat.id))
            .collect();
        children.sort_by_key(|c| c.position);

        if self.hidden(cat) {
            // Hidden categories contribute nothing, children included.
            return Rollup::default();
        }

        let slot = buf.codes.len();
        buf.push(String::new(), 0, None);

        let mut roll = Rollup::default();
        if !cat.collapsed {
            for ch in &children {
                roll.absorb(self.emit_channel(ch, depth + 1, buf));
            }
            buf.push(String::new(), DROPDOWN_END_BASE + depth as u32 + 1, None);
        } else {
            for ch in &children {
                roll.absorb(channel_rollup(ch));
            }
        }

        let state = if cat.muted && !roll.mentioned {
            STATE_MUTED
        } else {
            rollup_state(roll, false)
        };
        buf.codes[slot] = make_code(TYPE_CATEGORY, state, !cat.collapsed);
        buf.lines[slot] = self.node_line(depth, &cat.name, !cat.collapsed);
        buf.ids[slot] = Some(cat.id);
        roll
    }

    fn emit_channel(&self, ch: &Channel, depth: usize, buf: &mut TreeBuffer) -> Rollup {
        if self.hidden(ch) {
            return Rollup::default();
        }
        let roll = channel_rollup(ch);

        let mut threads: Vec<&Channel> = self
            .channels
            .iter()
            .filter(|c| c.parent_id == Some(ch.id) && c.kind == ChannelKind::Text && c.joined)
            .collect();
        threads.sort_by_key(|c| c.position);
        let has_threads = !threads.is_empty();

        let slot = buf.codes.len();
        buf.push(String::new(), 0, None);

        let mut total = roll;
        if has_threads && !ch.collapsed {
            for t in &threads {
                let t_roll = channel_rollup(t);
                total.absorb(t_roll);
                let state = self.channel_state(t, t_roll);
                let code = make_code(TYPE_THREAD, state, false);
                let line = self.node_line(depth + 1, &t.name, false);
                buf.push(line, code, Some(t.id));
            }
            buf.push(String::new(), DROPDOWN_END_BASE + depth as u32 + 1, None);
        } else {
            for t in &threads {
                total.absorb(channel_rollup(t));
            }
        }

        let node_type = match ch.kind {
            ChannelKind::Dm | ChannelKind::GroupDm => TYPE_DM,
            _ => TYPE_CHANNEL,
        };
        let state = self.channel_state(ch, total);
        buf.codes[slot] = make_code(node_type, state, has_threads && !ch.collapsed);
        buf.lines[slot] = self.node_line(depth, &ch.name, has_threads && !ch.collapsed);
        buf.ids[slot] = Some(ch.id);
        total
    }

    /// Muted with nothing unread, permission-denied, and non-joined forum
    /// threads are hidden entirely.
    fn hidden(&self, ch: &Channel) -> bool {
        if !ch.visible {
            return true;
        }
        if ch.muted && !ch.unseen && ch.mention_count == 0 && self.active_channel != Some(ch.id) {
            return true;
        }
        if ch.kind == ChannelKind::Forum && !ch.joined {
            return true;
        }
        false
    }

    fn channel_state(&self, ch: &Channel, roll: Rollup) -> u32 {
        let active = self.active_channel == Some(ch.id);
        if active && (ch.mention_count > 0 || roll.mentioned) {
            STATE_ACTIVE_MENTIONED
        } else if active {
            STATE_ACTIVE
        } else if ch.muted && ch.mention_count == 0 && !roll.mentioned {
            STATE_MUTED
        } else if ch.mention_count > 0 || roll.mentioned {
            STATE_MENTIONED
        } else if ch.unseen || roll.unseen {
            STATE_UNSEEN
        } else {
            STATE_NORMAL
        }
    }

    fn guild_rollup(&self, guild: &Guild) -> Rollup {
        let mut roll = Rollup::default();
        for ch in self
            .channels
            .iter()
            .filter(|c| c.guild_id == Some(guild.id))
        {
            roll.absorb(channel_rollup(ch));
        }
        roll
    }

    /// Indentation plus expand/branch glyph plus truncated name.
    fn node_line(&self, depth: usize, name: &str, expanded: bool) -> String {
        let mut line = String::new();
        for _ in 0..depth {
            line.push_str("│ ");
        }
        if depth > 0 {
            // Branch glyph; the connector pass may rewrite it to a corner.
            line.pop();
            line.pop();
            line.push_str("├─");
        }
        line.push(if expanded { '▾' } else { '▸' });
        line.push(' ');
        let budget = self.width.saturating_sub(2 * depth + 2);
        let (name, _) = truncate_to_width(name, budget.max(1));
        line.push_str(name);
        line
    }
}

fn channel_rollup(ch: &Channel) -> Rollup {
    if ch.muted {
        // Muted channels never propagate unread state upward.
        return Rollup::default();
    }
    Rollup {
        unseen: ch.unseen,
        mentioned: ch.mention_count > 0,
    }
}

fn rollup_state(roll: Rollup, muted: bool) -> u32 {
    if muted && !roll.mentioned {
        STATE_MUTED
    } else if roll.mentioned {
        STATE_MENTIONED
    } else if roll.unseen {
        STATE_UNSEEN
    } else {
        STATE_NORMAL
    }
}

/// Connector pass: a node directly followed by a drop-down terminator for
/// its own (or a shallower) level is the last child of its parent, so its
/// branch glyph becomes a corner. Only `codes[i+1]` is consulted.
fn connect(mut buf: TreeBuffer) -> TreeBuffer {
    for i in 0..buf.lines.len() {
        if is_dropdown_end(buf.codes[i]) {
            continue;
        }
        let Some(next) = buf.codes.get(i + 1) else {
            continue;
        };
        if is_dropdown_end(*next)
            && let Some(pos) = buf.lines[i].rfind("├─")
        {
            buf.lines[i].replace_range(pos..pos + "├─".len(), "└─");
        }
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guild(id: u64, position: i32) -> Guild {
        Guild {
            id,
            name: format!("guild{id}"),
            position,
            folder_id: None,
            muted: false,
            collapsed: false,
        }
    }

    fn channel(id: u64, guild_id: u64, position: i32) -> Channel {
        Channel {
            id,
            guild_id: Some(guild_id),
            parent_id: None,
            kind: ChannelKind::Text,
            name: format!("chan{id}"),
            position,
            muted: false,
            visible: true,
            unseen: false,
            mention_count: 0,
            joined: false,
            collapsed: false,
        }
    }

    fn builder<'a>(
        guilds: &'a [Guild],
        channels: &'a [Channel],
        folders: &'a [GuildFolder],
    ) -> TreeBuilder<'a> {
        TreeBuilder {
            folders,
            guilds,
            channels,
            active_channel: None,
            width: 24,
        }
    }

    #[test]
    fn status_code_arithmetic_holds() {
        let guilds = [guild(1, 0)];
        let mut chans = vec![channel(10, 1, 0), channel(11, 1, 1)];
        chans[0].unseen = true;
        chans[1].mention_count = 2;
        let b = builder(&guilds, &chans, &[]);
        let buf = b.build();
        for code in buf.codes.iter().filter(|c| !is_dropdown_end(**c)) {
            assert!(code % 10 <= 1, "expand flag out of range: {code}");
            assert!(code_state(*code) <= STATE_ACTIVE_MENTIONED, "bad state: {code}");
            assert!((1..=6).contains(&code_type(*code)), "bad type: {code}");
        }
    }

    #[test]
    fn channels_sorted_by_position() {
        let guilds = [guild(1, 0)];
        let chans = vec![channel(10, 1, 2), channel(11, 1, 0), channel(12, 1, 1)];
        let b = builder(&guilds, &chans, &[]);
        let buf = b.build();
        let names: Vec<&str> = buf
            .lines
            .iter()
            .zip(&buf.codes)
            .filter(|(_, c)| code_type(**c) == TYPE_CHANNEL)
            .map(|(l, _)| l.trim_start_matches(['│', ' ', '├', '─', '└', '▸', '▾']))
            .collect();
        assert_eq!(names, vec!["chan11", "chan12", "chan10"]);
    }

    #[test]
    fn mention_propagates_to_guild() {
        let guilds = [guild(1, 0)];
        let mut chans = vec![channel(10, 1, 0)];
        chans[0].mention_count = 1;
        let b = builder(&guilds, &chans, &[]);
        let buf = b.build();
        let guild_code = buf
            .codes
            .iter()
            .find(|c| code_type(**c) == TYPE_GUILD)
            .copied()
            .unwrap();
        assert_eq!(code_state(guild_code), STATE_MENTIONED);
    }

    #[test]
    fn muted_without_unread_hidden() {
        let guilds = [guild(1, 0)];
        let mut chans = vec![channel(10, 1, 0), channel(11, 1, 1)];
        chans[0].muted = true;
        let b = builder(&guilds, &chans, &[]);
        let buf = b.build();
        assert!(!buf.lines.iter().any(|l| l.contains("chan10")));
        assert!(buf.lines.iter().any(|l| l.contains("chan11")));
    }

    #[test]
    fn muted_channel_does_not_propagate_unseen() {
        let guilds = [guild(1, 0)];
        let mut chans = vec![channel(10, 1, 0), channel(11, 1, 1)];
        chans[0].muted = true;
        chans[0].unseen = true;
        chans[0].mention_count = 1; // visible (mentions bypass mute-hide)
        let b = builder(&guilds, &chans, &[]);
        let buf = b.build();
        let guild_code = buf
            .codes
            .iter()
            .find(|c| code_type(**c) == TYPE_GUILD)
            .copied()
            .unwrap();
        assert_eq!(code_state(guild_code), STATE_NORMAL);
    }

    #[test]
    fn active_channel_marked() {
        let guilds = [guild(1, 0)];
        let chans = vec![channel(10, 1, 0)];
        let mut b = builder(&guilds, &chans, &[]);
        b.active_channel = Some(10);
        let buf = b.build();
        let code = buf
            .codes
            .iter()
            .find(|c| code_type(**c) == TYPE_CHANNEL)
            .copied()
            .unwrap();
        assert_eq!(code_state(code), STATE_ACTIVE);
    }

    #[test]
    fn collapsed_guild_children_not_emitted_state_still_bubbles() {
        let mut g = guild(1, 0);
        g.collapsed = true;
        let guilds = [g];
        let mut chans = vec![channel(10, 1, 0)];
        chans[0].mention_count = 3;
        let b = builder(&guilds, &chans, &[]);
        let buf = b.build();
        assert!(!buf.lines.iter().any(|l| l.contains("chan10")));
        let guild_code = buf
            .codes
            .iter()
            .find(|c| code_type(**c) == TYPE_GUILD)
            .copied()
            .unwrap();
        assert_eq!(code_state(guild_code), STATE_MENTIONED);
        assert!(!code_expanded(guild_code));
    }

    #[test]
    fn last_child_gets_corner_glyph() {
        let guilds = [guild(1, 0)];
        let chans = vec![channel(10, 1, 0), channel(11, 1, 1)];
        let b = builder(&guilds, &chans, &[]);
        let buf = b.build();
        let chan_lines: Vec<&String> = buf
            .lines
            .iter()
            .zip(&buf.codes)
            .filter(|(_, c)| code_type(**c) == TYPE_CHANNEL)
            .map(|(l, _)| l)
            .collect();
        assert!(chan_lines[0].contains("├─"));
        assert!(chan_lines[1].contains("└─"));
    }

    #[test]
    fn terminators_are_not_visible() {
        let guilds = [guild(1, 0)];
        let chans = vec![channel(10, 1, 0)];
        let b = builder(&guilds, &chans, &[]);
        let buf = b.build();
        assert!(buf.codes.iter().any(|c| is_dropdown_end(*c)));
        assert!(buf.visible_len() < buf.codes.len());
        for (line, code) in buf.lines.iter().zip(&buf.codes) {
            if is_dropdown_end(*code) {
                assert!(line.is_empty());
            }
        }
    }

    #[test]
    fn folder_groups_member_guilds() {
        let folder = GuildFolder {
            id: 500,
            name: Some("work".into()),
            position: 0,
            collapsed: false,
        };
        let mut g1 = guild(1, 0);
        g1.folder_id = Some(500);
        let mut g2 = guild(2, 1);
        g2.folder_id = Some(500);
        let guilds = [g1, g2];
        let chans: Vec<Channel> = vec![];
        let b = builder(&guilds, &chans, std::slice::from_ref(&folder));
        let buf = b.build();
        let folder_code = buf.codes.iter().find(|c| code_type(**c) == TYPE_FOLDER);
        assert!(folder_code.is_some());
        assert!(buf.lines.iter().any(|l| l.contains("work")));
        assert!(buf.lines.iter().any(|l| l.contains("guild1")));
    }

    #[test]
    fn forum_thread_not_joined_hidden() {
        let guilds = [guild(1, 0)];
        let mut forum = channel(10, 1, 0);
        forum.kind = ChannelKind::Forum;
        let chans = vec![forum];
        let b = builder(&guilds, &chans, &[]);
        let buf = b.build();
        assert!(!buf.lines.iter().any(|l| l.contains("chan10")));
    }
}
