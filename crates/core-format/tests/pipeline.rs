//! End-to-end pipeline: entity substitution feeds markdown resolution feeds
//! reflow, with every range surviving in final-string offsets.

use chrono::{TimeZone, Utc};
use core_format::{
    Attr, ContinuationTemplate, EntityContext, reflow, resolve_entities, resolve_markdown,
};
use core_model::{Channel, ChannelKind, Role, User};
use core_text::display_width;

fn ctx<'a>(users: &'a [User], roles: &'a [Role], channels: &'a [Channel]) -> EntityContext<'a> {
    EntityContext {
        users,
        roles,
        channels,
        now: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
    }
}

fn user(id: u64, name: &str, nick: Option<&str>) -> User {
    User {
        id,
        name: name.into(),
        nick: nick.map(Into::into),
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

/// Rebuilds the logical line from physical lines: strip continuation
/// prefixes, re-add the one space removed per boundary break.
fn reconstruct(lines: &[core_format::PhysicalLine], cont: &ContinuationTemplate) -> String {
    let mut out = String::new();
    for (i, line) in lines.iter().enumerate() {
        let mut text = line.text.as_str();
        if line.continuation {
            text = text.strip_prefix(cont.indent.as_str()).unwrap_or(text);
        }
        if i > 0 {
            out.push(' ');
        }
        out.push_str(text.trim_end());
    }
    out
}

#[test]
fn mention_bold_url_flows_through_all_stages() {
    let users = [user(2, "alice", Some("al"))];
    let channels = [channel(7, "general")];
    let resolved = resolve_entities("<@2> see **this** in <#7> https://example.com/x", &ctx(&users, &[], &channels));
    assert_eq!(resolved, "@al see **this** in #general https://example.com/x");

    let formatted = resolve_markdown(&resolved, &[]);
    assert_eq!(formatted.text, "@al see this in #general https://example.com/x");
    assert_eq!(formatted.attrs.len(), 1);
    let bold = formatted.attrs[0];
    let chars: Vec<char> = formatted.text.chars().collect();
    let covered: String = chars[bold.start..bold.end].iter().collect();
    assert_eq!(covered, "this");

    // Wide enough for the URL to stay whole, narrow enough to force a split.
    let cont = ContinuationTemplate::indent_only("  ");
    let lines = reflow(&formatted, 28, &cont);
    assert!(lines.len() > 1, "narrow width must split the line");
    for line in &lines {
        assert!(
            display_width(&line.text) <= 28,
            "line too wide: {:?}",
            line.text
        );
    }
    assert_eq!(reconstruct(&lines, &cont), formatted.text);
}

#[test]
fn bold_range_survives_reflow_on_its_physical_line() {
    let formatted = resolve_markdown("plain words then **bold tail**", &[]);
    let cont = ContinuationTemplate::indent_only("  ");
    let lines = reflow(&formatted, 12, &cont);

    let mut found = false;
    for line in &lines {
        let chars: Vec<char> = line.text.chars().collect();
        for r in &line.attrs {
            assert!(r.style == core_format::RangeStyle::Attr(Attr::BOLD));
            let covered: String = chars[r.start..r.end.min(chars.len())].iter().collect();
            assert!(
                "bold tail".contains(covered.trim_end()),
                "bold range covers {covered:?}"
            );
            found = true;
        }
    }
    assert!(found, "bold span must survive the reflow");
}

#[test]
fn spoiler_masking_persists_into_physical_lines() {
    let formatted = resolve_markdown("before ||hidden words here|| after", &[]);
    assert!(formatted.text.contains('█'));
    let lines = reflow(&formatted, 10, &ContinuationTemplate::indent_only(""));
    let merged: String = lines.iter().map(|l| l.text.clone()).collect();
    assert!(merged.contains('█'));
    assert!(!merged.contains("hidden"));
    let spoiler_spans: usize = lines.iter().map(|l| l.spoilers.len()).sum();
    assert!(spoiler_spans >= 1, "spoiler span must be carried per line");
}

#[test]
fn unknown_channel_mention_degrades_to_placeholder() {
    let resolved = resolve_entities("look at <#999>", &ctx(&[], &[], &[]));
    assert_eq!(resolved, "look at #unknown-channel");
}

#[test]
fn wide_chars_never_straddle_the_width_limit() {
    let formatted = resolve_markdown("日本語のテキストです and ascii tail", &[]);
    let lines = reflow(&formatted, 7, &ContinuationTemplate::indent_only(""));
    for line in &lines {
        assert!(display_width(&line.text) <= 7);
    }
    assert!(lines.iter().any(|l| l.has_wide));
}
