//! Maps the config theme (color names) onto registry handles for the chat
//! palette and window chrome.

use core_chat::Palette;
use core_config::ThemeConfig;
use core_render::{ColorRegistry, RenderTheme};
use crossterm::style::Color;
use tracing::warn;

/// Unknown color names degrade to the terminal default.
fn parse(name: &str) -> Color {
    Color::try_from(name).unwrap_or_else(|_| {
        warn!(target: "config.theme", name, "unknown color name, using default");
        Color::Reset
    })
}

pub struct Theme {
    pub palette: Palette,
    pub render: RenderTheme,
}

pub fn build(registry: &mut ColorRegistry, cfg: &ThemeConfig) -> Theme {
    let text = parse(&cfg.text);
    let mention = parse(&cfg.mention);
    let chrome = parse(&cfg.chrome);
    let accent = parse(&cfg.accent);
    let url = parse(&cfg.url);
    let code = parse(&cfg.code);
    let spoiler = parse(&cfg.spoiler);

    let plain = registry.alloc(text, Color::Reset);
    let on_mention = registry.alloc(text, Color::DarkYellow);
    let palette = Palette {
        text: plain,
        text_mention: on_mention,
        timestamp: registry.alloc(parse(&cfg.timestamp), Color::Reset),
        author: registry.alloc(parse(&cfg.author), Color::Reset),
        url: registry.alloc(url, Color::Reset),
        url_mention: registry.alloc(url, Color::DarkYellow),
        code: registry.alloc(code, Color::DarkGrey),
        code_mention: registry.alloc(code, Color::DarkYellow),
        spoiler: registry.alloc(spoiler, spoiler),
        spoiler_mention: registry.alloc(spoiler, Color::DarkYellow),
        separator: registry.alloc(chrome, Color::Reset),
        new_marker: registry.alloc(mention, Color::Reset),
        reply: registry.alloc(chrome, Color::Reset),
        reactions: registry.alloc(chrome, Color::Reset),
        edited: registry.alloc(chrome, Color::Reset),
        deleted: registry.alloc(Color::DarkRed, Color::Reset),
        pending: registry.alloc(Color::DarkGrey, Color::Reset),
    };

    let selected = registry.alloc(Color::Black, Color::White);
    let render = RenderTheme {
        chrome: registry.alloc(chrome, Color::Reset),
        tree_states: [
            registry.alloc(chrome, Color::Reset),           // normal
            registry.alloc(Color::DarkGrey, Color::Reset),  // muted
            registry.alloc(mention, Color::Reset),          // mentioned
            registry.alloc(text, Color::Reset),             // unseen
            registry.alloc(accent, Color::Reset),           // active
            registry.alloc(mention, Color::DarkYellow),     // active+mentioned
        ],
        tree_selected: selected,
        input: plain,
        selection: selected,
        cursor: registry.alloc(Color::Black, accent),
        popup: registry.alloc(text, Color::DarkGrey),
        popup_selected: selected,
    };

    Theme { palette, render }
}
