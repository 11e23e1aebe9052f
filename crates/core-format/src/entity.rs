//! Inline entity substitution: mentions, custom emoji, channel/message
//! links, and timestamp tokens become human-readable text.
//!
//! Runs before markdown resolution on the raw message content, so it works
//! purely string-to-string; no offset bookkeeping is required here. Each
//! token kind is matched by one pattern, left to right, non-overlapping.
//! Unresolvable channels render as a fixed placeholder; unresolvable
//! user/role references are left untouched.

use chrono::{DateTime, Local, TimeZone, Utc};
use core_model::{Channel, Role, User};
use regex::{Captures, Regex};
use std::sync::OnceLock;

pub const UNKNOWN_CHANNEL: &str = "#unknown-channel";

fn re_user() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<@!?(\d+)>").unwrap())
}

fn re_role() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<@&(\d+)>").unwrap())
}

fn re_channel() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<#(\d+)>").unwrap())
}

fn re_emoji() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<a?:([A-Za-z0-9_~]+):\d+>").unwrap())
}

fn re_timestamp() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<t:(-?\d+)(?::([tTdDfFR]))?>").unwrap())
}

fn re_link() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"https://(?:\w+\.)?discord(?:app)?\.com/channels/(?:\d+|@me)/(\d+)(/\d+)?")
            .unwrap()
    })
}

/// Reference lists used to resolve tokens, supplied by the protocol client.
pub struct EntityContext<'a> {
    pub users: &'a [User],
    pub roles: &'a [Role],
    pub channels: &'a [Channel],
    /// "Now" for relative timestamps; injected so tests are deterministic.
    pub now: DateTime<Utc>,
}

impl<'a> EntityContext<'a> {
    fn user_name(&self, id: u64) -> Option<&str> {
        self.users
            .iter()
            .find(|u| u.id == id)
            .map(|u| u.display_name())
    }

    fn role_name(&self, id: u64) -> Option<&str> {
        self.roles
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.name.as_str())
    }

    fn channel_name(&self, id: u64) -> Option<&str> {
        self.channels
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.name.as_str())
    }
}

/// Substitute every supported token kind in `content`.
pub fn resolve_entities(content: &str, ctx: &EntityContext<'_>) -> String {
    // Links before bare channel mentions so the channel pattern cannot see
    // the ids embedded in a link it already consumed.
    let out = re_link().replace_all(content, |caps: &Captures| {
        let channel = caps[1].parse::<u64>().ok().and_then(|id| ctx.channel_name(id));
        match (channel, caps.get(2).is_some()) {
            (Some(name), true) => format!("#{name} > message"),
            (Some(name), false) => format!("#{name}"),
            (None, _) => UNKNOWN_CHANNEL.to_string(),
        }
    });
    let out = re_user().replace_all(&out, |caps: &Captures| {
        match caps[1].parse::<u64>().ok().and_then(|id| ctx.user_name(id)) {
            Some(name) => format!("@{name}"),
            None => caps[0].to_string(),
        }
    });
    let out = re_role().replace_all(&out, |caps: &Captures| {
        match caps[1].parse::<u64>().ok().and_then(|id| ctx.role_name(id)) {
            Some(name) => format!("@{name}"),
            None => caps[0].to_string(),
        }
    });
    let out = re_channel().replace_all(&out, |caps: &Captures| {
        match caps[1]
            .parse::<u64>()
            .ok()
            .and_then(|id| ctx.channel_name(id))
        {
            Some(name) => format!("#{name}"),
            None => UNKNOWN_CHANNEL.to_string(),
        }
    });
    let out = re_emoji().replace_all(&out, |caps: &Captures| format!(":{}:", &caps[1]));
    let out = re_timestamp().replace_all(&out, |caps: &Captures| {
        let secs = caps[1].parse::<i64>().unwrap_or(0);
        let code = caps.get(2).map(|m| m.as_str()).unwrap_or("f");
        format_timestamp(secs, code, ctx.now)
    });
    out.into_owned()
}

/// One of six fixed absolute formats, or relative when the code is `R`.
fn format_timestamp(secs: i64, code: &str, now: DateTime<Utc>) -> String {
    let Some(when) = Utc.timestamp_opt(secs, 0).single() else {
        return String::new();
    };
    if code == "R" {
        return relative_time(when, now);
    }
    let local = when.with_timezone(&Local);
    let fmt = match code {
        "t" => "%H:%M",
        "T" => "%H:%M:%S",
        "d" => "%d/%m/%Y",
        "D" => "%d %B %Y",
        "F" => "%A, %d %B %Y %H:%M",
        _ => "%d %B %Y %H:%M",
    };
    local.format(fmt).to_string()
}

/// "N units ago" / "in N units"; month = 30 days, year = 365 days.
fn relative_time(when: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = (now - when).num_seconds();
    let (magnitude, future) = if delta < 0 {
        (-delta, true)
    } else {
        (delta, false)
    };
    let (n, unit) = if magnitude < 60 {
        (magnitude, "second")
    } else if magnitude < 3600 {
        (magnitude / 60, "minute")
    } else if magnitude < 86_400 {
        (magnitude / 3600, "hour")
    } else if magnitude < 30 * 86_400 {
        (magnitude / 86_400, "day")
    } else if magnitude < 365 * 86_400 {
        (magnitude / (30 * 86_400), "month")
    } else {
        (magnitude / (365 * 86_400), "year")
    };
    let plural = if n == 1 { "" } else { "s" };
    if future {
        format!("in {n} {unit}{plural}")
    } else {
        format!("{n} {unit}{plural} ago")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_model::ChannelKind;

    fn ctx<'a>(
        users: &'a [User],
        roles: &'a [Role],
        channels: &'a [Channel],
    ) -> EntityContext<'a> {
        EntityContext {
            users,
            roles,
            channels,
            now: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        }
    }

    fn user(id: u64, name: &str) -> User {
        User {
            id,
            name: name.into(),
            nick: None,
            bot: false,
        }
    }

    fn channel(id: u64, name: &str) -> Channel {
        Channel {
            id,
            guild_id: Some(1),
            parent_id: None,
            kind: ChannelKind::Text,
            name: name.into(),
            position: 0,
            muted: false,
            visible: true,
            unseen: false,
            mention_count: 0,
            joined: false,
            collapsed: false,
        }
    }

    #[test]
    fn user_mention_resolves() {
        let users = [user(5, "ana")];
        let out = resolve_entities("hi <@5>!", &ctx(&users, &[], &[]));
        assert_eq!(out, "hi @ana!");
    }

    #[test]
    fn unknown_user_left_as_is() {
        let out = resolve_entities("hi <@5>!", &ctx(&[], &[], &[]));
        assert_eq!(out, "hi <@5>!");
    }

    #[test]
    fn unknown_channel_placeholder() {
        let out = resolve_entities("see <#99>", &ctx(&[], &[], &[]));
        assert_eq!(out, format!("see {UNKNOWN_CHANNEL}"));
    }

    #[test]
    fn channel_mention_and_emoji() {
        let channels = [channel(9, "general")];
        let out = resolve_entities("<#9> <:wave:123>", &ctx(&[], &[], &channels));
        assert_eq!(out, "#general :wave:");
    }

    #[test]
    fn message_link_resolves_through_channel() {
        let channels = [channel(22, "dev")];
        let out = resolve_entities(
            "https://discord.com/channels/1/22/333",
            &ctx(&[], &[], &channels),
        );
        assert_eq!(out, "#dev > message");
    }

    #[test]
    fn relative_timestamp_past_and_future() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let c = EntityContext {
            users: &[],
            roles: &[],
            channels: &[],
            now,
        };
        let out = resolve_entities("<t:1699992800:R>", &c);
        assert_eq!(out, "2 hours ago");
        let out = resolve_entities("<t:1700000300:R>", &c);
        assert_eq!(out, "in 5 minutes");
    }

    #[test]
    fn singular_relative_unit() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let c = EntityContext {
            users: &[],
            roles: &[],
            channels: &[],
            now,
        };
        assert_eq!(resolve_entities("<t:1699996400:R>", &c), "1 hour ago");
    }

    #[test]
    fn invalid_timestamp_renders_empty() {
        let c = ctx(&[], &[], &[]);
        let out = resolve_entities("x <t:99999999999999:t> y", &c);
        assert_eq!(out, "x  y");
    }
}
