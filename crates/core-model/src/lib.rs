//! Protocol record types consumed by the layout and rendering core.
//!
//! These are plain data structs mirroring what the protocol client hands
//! over: already decoded, read-only to this core. Optional protocol fields
//! are explicit `Option`s. The only in-place mutation anywhere downstream is
//! blocked-message masking, which is local and non-persistent.

use chrono::{DateTime, Utc};
use serde::Deserialize;

pub type UserId = u64;
pub type RoleId = u64;
pub type ChannelId = u64;
pub type GuildId = u64;
pub type MessageId = u64;
pub type EmojiId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    /// Per-guild nickname, preferred for display when present.
    pub nick: Option<String>,
    pub bot: bool,
}

impl User {
    pub fn display_name(&self) -> &str {
        self.nick.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    /// Packed 0xRRGGBB; zero means "no color assigned".
    pub color: u32,
    pub position: i32,
    /// Hoisted roles get their own member-list section.
    pub hoist: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Text,
    Voice,
    Category,
    Announcement,
    Forum,
    Dm,
    GroupDm,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub id: ChannelId,
    pub guild_id: Option<GuildId>,
    pub parent_id: Option<ChannelId>,
    pub kind: ChannelKind,
    pub name: String,
    pub position: i32,
    pub muted: bool,
    /// False when permissions hide this channel from us entirely.
    pub visible: bool,
    pub unseen: bool,
    pub mention_count: u32,
    /// Threads only: whether we have joined the thread.
    pub joined: bool,
    pub collapsed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Guild {
    pub id: GuildId,
    pub name: String,
    pub position: i32,
    pub folder_id: Option<u64>,
    pub muted: bool,
    pub collapsed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildFolder {
    pub id: u64,
    pub name: Option<String>,
    pub position: i32,
    pub collapsed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reaction {
    pub emoji_name: String,
    pub emoji_id: Option<EmojiId>,
    pub count: u32,
    pub me: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Embed {
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sticker {
    pub name: String,
}

/// Bot interaction header data ("X used /command").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interaction {
    pub user_name: String,
    pub command_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub author: User,
    pub timestamp: DateTime<Utc>,
    pub content: String,
    pub reply_to: Option<MessageId>,
    pub mentions: Vec<UserId>,
    pub mention_roles: Vec<RoleId>,
    pub mention_everyone: bool,
    pub reactions: Vec<Reaction>,
    pub embeds: Vec<Embed>,
    pub stickers: Vec<Sticker>,
    pub interaction: Option<Interaction>,
    pub edited: bool,
    pub deleted: bool,
    /// Sent locally, not yet acknowledged by the server.
    pub pending: bool,
    /// Spoiler ordinals the user has clicked open this session.
    pub revealed_spoilers: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceStatus {
    Online,
    Idle,
    Dnd,
    Offline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presence {
    pub user_id: UserId,
    pub status: PresenceStatus,
    pub typing_in: Option<ChannelId>,
}

/// How messages from blocked authors are displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockedPolicy {
    /// Drop the message entirely.
    Hidden,
    /// Placeholder author and content, formatting disabled.
    #[default]
    Masked,
    Shown,
}

/// How deleted messages are displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeletedPolicy {
    #[default]
    Hidden,
    /// Flat "deleted" color, no markdown formatting.
    Shown,
}

/// The viewer's identity plus everything needed for mention-of-me checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: UserId,
    pub role_ids: Vec<RoleId>,
    pub blocked: Vec<UserId>,
    /// Newest message id already seen; drives the "new messages" separator.
    pub last_seen: Option<MessageId>,
}

impl Viewer {
    pub fn is_blocked(&self, id: UserId) -> bool {
        self.blocked.contains(&id)
    }

    /// Direct mention, role mention, or @everyone.
    pub fn mentioned_in(&self, msg: &Message) -> bool {
        msg.mention_everyone
            || msg.mentions.contains(&self.user_id)
            || msg.mention_roles.iter().any(|r| self.role_ids.contains(r))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn msg(author_id: UserId) -> Message {
        Message {
            id: 1,
            channel_id: 10,
            author: User {
                id: author_id,
                name: "ana".into(),
                nick: None,
                bot: false,
            },
            timestamp: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            content: String::new(),
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
            pending: false,
            revealed_spoilers: vec![],
        }
    }

    #[test]
    fn mention_of_me_via_role() {
        let viewer = Viewer {
            user_id: 7,
            role_ids: vec![42],
            blocked: vec![],
            last_seen: None,
        };
        let mut m = msg(3);
        assert!(!viewer.mentioned_in(&m));
        m.mention_roles.push(42);
        assert!(viewer.mentioned_in(&m));
    }

    #[test]
    fn mention_everyone_counts() {
        let viewer = Viewer {
            user_id: 7,
            role_ids: vec![],
            blocked: vec![],
            last_seen: None,
        };
        let mut m = msg(3);
        m.mention_everyone = true;
        assert!(viewer.mentioned_in(&m));
    }

    #[test]
    fn nick_preferred_for_display() {
        let u = User {
            id: 1,
            name: "ana".into(),
            nick: Some("Ana Banana".into()),
            bot: false,
        };
        assert_eq!(u.display_name(), "Ana Banana");
    }
}
