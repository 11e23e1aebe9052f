//! Client state owned by the event loop: protocol records, the rendered
//! buffers rebuilt from them, and the action handling that mutates both.

use chrono::Utc;
use core_chat::{ChatBuffer, ChatBuilder, LineKind, Palette};
use core_config::ConfigFile;
use core_format::EntityContext;
use core_input::{Action, AssistKind, InputDispatcher};
use core_model::{
    BlockedPolicy, Channel, ChannelId, ChannelKind, DeletedPolicy, Guild, GuildFolder, Message,
    Presence, PresenceStatus, Role, User, Viewer,
};
use core_render::{Frame, Renderer, WindowId};
use core_state::{ChatScroll, TreeCursor};
use core_tree::{TreeBuffer, TreeBuilder, is_dropdown_end};
use tracing::{debug, info};

/// Windows reachable with Tab focus cycling, in order.
const FOCUS_ORDER: [WindowId; 3] = [WindowId::Input, WindowId::Chat, WindowId::Tree];

pub struct App {
    pub users: Vec<User>,
    pub roles: Vec<Role>,
    pub channels: Vec<Channel>,
    pub guilds: Vec<Guild>,
    pub folders: Vec<GuildFolder>,
    pub messages: Vec<Message>,
    pub presences: Vec<Presence>,
    pub viewer: Viewer,
    pub active_channel: ChannelId,

    pub chat: ChatBuffer,
    pub tree: TreeBuffer,
    pub chat_scroll: ChatScroll,
    pub tree_cursor: TreeCursor,
    pub focus: WindowId,
    pub cursor_visible: bool,
    pub status: String,
    pub assist_items: Vec<String>,
    pub assist_selected: usize,
    pub quit: bool,

    palette: Palette,
    blocked_policy: BlockedPolicy,
    deleted_policy: DeletedPolicy,
    next_message_id: u64,
}

impl App {
    pub fn new(palette: Palette, cfg: &ConfigFile) -> Self {
        let mut app = Self {
            users: Vec::new(),
            roles: Vec::new(),
            channels: Vec::new(),
            guilds: Vec::new(),
            folders: Vec::new(),
            messages: Vec::new(),
            presences: Vec::new(),
            viewer: Viewer {
                user_id: 1,
                role_ids: vec![],
                blocked: vec![],
                last_seen: None,
            },
            active_channel: 0,
            chat: ChatBuffer::default(),
            tree: TreeBuffer::default(),
            chat_scroll: ChatScroll::default(),
            tree_cursor: TreeCursor::default(),
            focus: WindowId::Input,
            cursor_visible: true,
            status: String::from("ready"),
            assist_items: Vec::new(),
            assist_selected: 0,
            quit: false,
            palette,
            blocked_policy: cfg.display.blocked,
            deleted_policy: cfg.display.deleted,
            next_message_id: 1,
        };
        app.seed_demo_data();
        app
    }

    /// Standalone sample hierarchy and history; a protocol client would
    /// replace these vectors wholesale.
    fn seed_demo_data(&mut self) {
        self.users = vec![
            User {
                id: 1,
                name: "you".into(),
                nick: None,
                bot: false,
            },
            User {
                id: 2,
                name: "alice".into(),
                nick: Some("al".into()),
                bot: false,
            },
            User {
                id: 3,
                name: "helper".into(),
                nick: None,
                bot: true,
            },
        ];
        self.roles = vec![Role {
            id: 20,
            name: "regulars".into(),
            color: 0x00AA00,
            position: 1,
            hoist: true,
        }];
        self.guilds = vec![Guild {
            id: 100,
            name: "cordial dev".into(),
            position: 0,
            folder_id: None,
            muted: false,
            collapsed: false,
        }];
        let chan = |id, name: &str, position| Channel {
            id,
            guild_id: Some(100),
            parent_id: None,
            kind: ChannelKind::Text,
            name: name.into(),
            position,
            muted: false,
            visible: true,
            unseen: false,
            mention_count: 0,
            joined: false,
            collapsed: false,
        };
        self.channels = vec![chan(200, "general", 0), chan(201, "rust-help", 1)];
        self.presences = vec![Presence {
            user_id: 2,
            status: PresenceStatus::Online,
            typing_in: None,
        }];
        self.active_channel = 200;

        let now = Utc::now();
        let mut push = |author: usize, content: &str, mentions: Vec<u64>| {
            let id = self.next_message_id;
            self.next_message_id += 1;
            self.messages.push(Message {
                id,
                channel_id: 200,
                author: self.users[author].clone(),
                timestamp: now - chrono::Duration::minutes(30 - id as i64),
                content: content.into(),
                reply_to: None,
                mentions,
                mention_roles: vec![],
                mention_everyone: false,
                reactions: vec![],
                embeds: vec![],
                stickers: vec![],
                interaction: None,
                edited: false,
                deleted: false,
                pending: false,
                revealed_spoilers: vec![],
            });
        };
        push(1, "welcome to **cordial**", vec![]);
        push(1, "try `cargo doc --open` for the api tour", vec![]);
        push(2, "<@1> the spoiler test: ||surprise||", vec![1]);
        self.viewer.last_seen = Some(2);
    }

    pub fn rebuild_chat(&mut self, width: usize) {
        let builder = ChatBuilder {
            ctx: EntityContext {
                users: &self.users,
                roles: &self.roles,
                channels: &self.channels,
                now: Utc::now(),
            },
            viewer: &self.viewer,
            palette: &self.palette,
            width,
            blocked_policy: self.blocked_policy,
            deleted_policy: self.deleted_policy,
        };
        let visible: Vec<Message> = self
            .messages
            .iter()
            .filter(|m| m.channel_id == self.active_channel)
            .cloned()
            .collect();
        self.chat = builder.build(&visible);
        debug!(target: "chat.build", lines = self.chat.lines.len(), "chat rebuilt");
    }

    pub fn rebuild_tree(&mut self, width: usize) {
        self.tree = TreeBuilder {
            folders: &self.folders,
            guilds: &self.guilds,
            channels: &self.channels,
            active_channel: Some(self.active_channel),
            width,
        }
        .build();
        self.tree_cursor
            .ensure_visible(self.tree.visible_len(), usize::MAX);
    }

    /// Member names for the optional member column, online first.
    pub fn member_names(&self) -> Vec<String> {
        let mut names: Vec<(bool, String)> = self
            .users
            .iter()
            .map(|u| {
                let online = self
                    .presences
                    .iter()
                    .any(|p| p.user_id == u.id && p.status != PresenceStatus::Offline);
                let marker = if online { "●" } else { "○" };
                (online, format!("{marker} {}", u.display_name()))
            })
            .collect();
        names.sort_by(|a, b| b.0.cmp(&a.0));
        names.into_iter().map(|(_, n)| n).collect()
    }

    /// Status-line text: typing indicator wins over the idle summary.
    pub fn status_line(&self) -> String {
        let typing: Vec<&str> = self
            .presences
            .iter()
            .filter(|p| p.typing_in == Some(self.active_channel))
            .filter_map(|p| self.users.iter().find(|u| u.id == p.user_id))
            .map(|u| u.display_name())
            .collect();
        match typing.as_slice() {
            [] => self.status.clone(),
            [one] => format!("{one} is typing..."),
            many => format!("{} people are typing...", many.len()),
        }
    }

    pub fn title_line(&self) -> String {
        let name = self
            .channels
            .iter()
            .find(|c| c.id == self.active_channel)
            .map(|c| c.name.as_str())
            .unwrap_or("no channel");
        format!("cordial - #{name}")
    }

    /// Completion candidates for the open assist.
    pub fn refresh_assist(&mut self, dispatcher: &InputDispatcher) {
        let Some(assist) = dispatcher.assist() else {
            self.assist_items.clear();
            self.assist_selected = 0;
            return;
        };
        let q = assist.query.to_lowercase();
        self.assist_items = match assist.kind {
            AssistKind::Channel => self
                .channels
                .iter()
                .filter(|c| c.kind == ChannelKind::Text && c.name.to_lowercase().starts_with(&q))
                .map(|c| format!("#{}", c.name))
                .collect(),
            AssistKind::User => self
                .users
                .iter()
                .filter(|u| u.display_name().to_lowercase().starts_with(&q))
                .map(|u| format!("@{}", u.display_name()))
                .collect(),
            AssistKind::Emoji => Vec::new(),
            AssistKind::Sticker => Vec::new(),
            AssistKind::Command => ["shrug", "me", "spoiler"]
                .iter()
                .filter(|c| c.starts_with(&q))
                .map(|c| format!("/{c}"))
                .collect(),
        };
        self.assist_selected = self.assist_selected.min(
            self.assist_items.len().saturating_sub(1),
        );
    }

    /// Applies one action code. Buffer rebuilds happen lazily at draw time;
    /// this only mutates state and records what became dirty.
    pub fn apply_action(
        &mut self,
        action: Action,
        dispatcher: &mut InputDispatcher,
        renderer: &mut Renderer,
    ) {
        let chat_height = renderer.layout.chat.height as usize;
        match action {
            Action::Quit => self.quit = true,
            Action::Redraw => {}
            Action::SendMessage => {
                let content = dispatcher.take_text();
                if !content.trim().is_empty() {
                    self.send_message(content);
                }
                self.chat_scroll.jump_to_bottom();
            }
            Action::EditLastMessage => self.edit_last_message(dispatcher),
            Action::DeleteLastMessage => {
                if let Some(msg) = self.last_own_message_mut() {
                    msg.deleted = true;
                }
            }
            Action::RevealSpoiler => self.reveal_spoilers_at(self.chat_scroll.offset()),
            Action::OpenSelected => self.open_selected(),
            Action::JoinThread => {
                if let Some(id) = self.selected_tree_id()
                    && let Some(ch) = self.channels.iter_mut().find(|c| c.id == id)
                {
                    ch.joined = true;
                    info!(target: "tree.build", channel = ch.id, "thread joined");
                }
            }
            Action::ToggleCollapse => self.toggle_collapse(),
            Action::MarkChannelRead => self.mark_read(self.active_channel),
            Action::ScrollUp => {
                self.chat_scroll.scroll_up(1, self.chat.lines.len(), chat_height)
            }
            Action::ScrollDown => self.chat_scroll.scroll_down(1),
            Action::PageUp => {
                // Page step keeps one line of overlap for continuity.
                let step = chat_height.saturating_sub(1).max(1);
                self.chat_scroll
                    .scroll_up(step, self.chat.lines.len(), chat_height)
            }
            Action::PageDown => {
                let step = chat_height.saturating_sub(1).max(1);
                self.chat_scroll.scroll_down(step)
            }
            Action::JumpToBottom => self.chat_scroll.jump_to_bottom(),
            Action::TreeUp => self.tree_cursor.move_up(1),
            Action::TreeDown => self.tree_cursor.move_down(1, self.tree.visible_len()),
            Action::FocusNext => {
                let i = FOCUS_ORDER.iter().position(|w| *w == self.focus).unwrap_or(0);
                self.focus = FOCUS_ORDER[(i + 1) % FOCUS_ORDER.len()];
            }
            Action::FocusChat => self.focus = WindowId::Chat,
            Action::FocusTree => self.focus = WindowId::Tree,
            Action::ToggleMemberList => {
                let visible = !renderer.members_visible();
                renderer.set_members_visible(visible);
            }
            Action::AssistNext => {
                if !self.assist_items.is_empty() {
                    self.assist_selected = (self.assist_selected + 1) % self.assist_items.len();
                }
            }
            Action::AssistPrev => {
                if !self.assist_items.is_empty() {
                    self.assist_selected = self
                        .assist_selected
                        .checked_sub(1)
                        .unwrap_or(self.assist_items.len() - 1);
                }
            }
            Action::AssistAccept => {
                if let Some(item) = self.assist_items.get(self.assist_selected).cloned() {
                    dispatcher.accept_assist(&format!("{item} "));
                }
                self.assist_items.clear();
                self.assist_selected = 0;
            }
            Action::AssistDismiss => {
                self.assist_items.clear();
                self.assist_selected = 0;
            }
        }
    }

    fn send_message(&mut self, content: String) {
        let id = self.next_message_id;
        self.next_message_id += 1;
        let author = self
            .users
            .iter()
            .find(|u| u.id == self.viewer.user_id)
            .cloned()
            .unwrap_or(User {
                id: self.viewer.user_id,
                name: "you".into(),
                nick: None,
                bot: false,
            });
        self.messages.push(Message {
            id,
            channel_id: self.active_channel,
            author,
            timestamp: Utc::now(),
            content,
            reply_to: None,
            mentions: vec![],
            mention_roles: vec![],
            mention_everyone: false,
            reactions: vec![],
            embeds: vec![],
            stickers: vec![],
            interaction: None,
            edited: false,
            deleted: false,
            pending: true,
            revealed_spoilers: vec![],
        });
        self.viewer.last_seen = Some(id);
        info!(target: "chat.build", id, "message queued");
    }

    fn last_own_message_mut(&mut self) -> Option<&mut Message> {
        let channel = self.active_channel;
        let user = self.viewer.user_id;
        self.messages
            .iter_mut()
            .rev()
            .find(|m| m.channel_id == channel && m.author.id == user && !m.deleted)
    }

    fn edit_last_message(&mut self, dispatcher: &mut InputDispatcher) {
        let draft = dispatcher.take_text();
        if let Some(msg) = self.last_own_message_mut() {
            if draft.trim().is_empty() {
                return;
            }
            msg.content = draft;
            msg.edited = true;
        }
    }

    /// Tree entry id under the cursor, skipping terminator entries.
    fn selected_tree_id(&self) -> Option<u64> {
        let idx = (0..self.tree.codes.len())
            .filter(|i| !is_dropdown_end(self.tree.codes[*i]))
            .nth(self.tree_cursor.selected)?;
        self.tree.ids[idx]
    }

    fn open_selected(&mut self) {
        let Some(id) = self.selected_tree_id() else {
            return;
        };
        if let Some(ch) = self.channels.iter().find(|c| c.id == id) {
            match ch.kind {
                ChannelKind::Category => self.toggle_collapse(),
                _ => {
                    self.active_channel = id;
                    self.mark_read(id);
                    self.chat_scroll.jump_to_bottom();
                    info!(target: "tree.build", channel = id, "channel opened");
                }
            }
        } else {
            // Guild or folder row: toggle its drop-down.
            self.toggle_collapse();
        }
    }

    fn toggle_collapse(&mut self) {
        let Some(id) = self.selected_tree_id() else {
            return;
        };
        if let Some(g) = self.guilds.iter_mut().find(|g| g.id == id) {
            g.collapsed = !g.collapsed;
        } else if let Some(f) = self.folders.iter_mut().find(|f| f.id == id) {
            f.collapsed = !f.collapsed;
        } else if let Some(c) = self.channels.iter_mut().find(|c| c.id == id) {
            c.collapsed = !c.collapsed;
        }
    }

    fn mark_read(&mut self, id: ChannelId) {
        if let Some(ch) = self.channels.iter_mut().find(|c| c.id == id) {
            ch.unseen = false;
            ch.mention_count = 0;
        }
        if let Some(last) = self
            .messages
            .iter()
            .filter(|m| m.channel_id == id)
            .next_back()
        {
            self.viewer.last_seen = Some(last.id);
        }
    }

    /// Click on a chat row: reveal the spoilers of the message under it.
    pub fn reveal_spoilers_at(&mut self, buffer_line: usize) {
        let Some(meta) = self.chat.message_at(buffer_line) else {
            return;
        };
        if !matches!(meta.kind, LineKind::Content | LineKind::Continuation) {
            return;
        }
        if let Some(msg) = self.messages.iter_mut().find(|m| m.id == meta.message_id) {
            let spoilers = msg.content.matches("||").count() / 2;
            msg.revealed_spoilers = (0..spoilers).collect();
            debug!(target: "chat.build", id = msg.id, spoilers, "spoilers revealed");
        }
    }

    /// Chat buffer index for a clicked chat-region row (bottom-up mapping).
    pub fn chat_line_at_row(&self, renderer: &Renderer, row: u16) -> Option<usize> {
        let region = renderer.layout.chat;
        if row < region.y || row > region.bottom() {
            return None;
        }
        let from_bottom = (region.bottom() - row) as usize;
        let idx = self.chat_scroll.offset() + from_bottom;
        (idx < self.chat.lines.len()).then_some(idx)
    }

    pub fn frame<'a>(
        &'a self,
        dispatcher: &'a InputDispatcher,
        members: Option<&'a [String]>,
        title: &'a str,
        status: &'a str,
    ) -> Frame<'a> {
        Frame {
            chat: &self.chat,
            chat_scroll: self.chat_scroll.offset(),
            tree: &self.tree,
            tree_selected: self.tree_cursor.selected,
            tree_scroll: self.tree_cursor.scroll,
            members,
            title,
            status,
            input_text: dispatcher.edit().text(),
            input_cursor: dispatcher.edit().cursor(),
            input_selection: dispatcher.edit().selection(),
            assist_items: (!self.assist_items.is_empty())
                .then_some((self.assist_items.as_slice(), self.assist_selected)),
            cursor_visible: self.cursor_visible && self.focus == WindowId::Input,
        }
    }
}
