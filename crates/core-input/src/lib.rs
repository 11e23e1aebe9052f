//! Input dispatch: logical key translation, the Escape/ALT resolver,
//! chained key bindings, edit-buffer mutation, and assist detection.
//!
//! The dispatcher owns the edit buffer and returns opaque [`Action`] codes;
//! the embedding loop turns those into protocol requests and redraws. Mouse
//! events are translated here but routed to windows by the caller, which
//! owns the layout.

pub mod actions;
pub mod assist;
pub mod fsm;
mod translate;

pub use actions::Action;
pub use assist::{Assist, AssistKind, AssistTriggers, MIN_QUERY_LEN};
pub use fsm::{ESCAPE_TIMEOUT, EscapeResolver};

use core_events::{KeyPress, KeyToken, ModMask, NamedKey};
use core_state::EditBuffer;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

mod async_service;
pub use async_service::{InputShutdown, spawn_input_task};

/// Window for the second key of a chained binding.
pub const CHORD_TIMEOUT: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone)]
enum Binding {
    Do(Action),
    /// First key of a two-key chain; maps the second key to an action.
    Prefix(HashMap<KeyPress, Action>),
}

/// Key-to-action table with optional two-key chains.
#[derive(Debug, Clone, Default)]
pub struct Keymap {
    bindings: HashMap<KeyPress, Binding>,
}

impl Keymap {
    pub fn bind(&mut self, press: KeyPress, action: Action) {
        self.bindings.insert(press, Binding::Do(action));
    }

    pub fn bind_chain(&mut self, first: KeyPress, second: KeyPress, action: Action) {
        match self
            .bindings
            .entry(first)
            .or_insert_with(|| Binding::Prefix(HashMap::new()))
        {
            Binding::Prefix(map) => {
                map.insert(second, action);
            }
            Binding::Do(_) => {
                // A plain binding on the prefix key wins; the chain is
                // rejected rather than silently shadowed.
                debug!(target: "input.keymap", "chain_rejected_prefix_bound");
            }
        }
    }

    /// Baseline bindings; the config layer may override on top.
    pub fn standard() -> Self {
        let mut map = Self::default();
        let ctrl = |c| KeyPress::new(KeyToken::Char(c), ModMask::CTRL);
        let alt = |k| KeyPress::new(KeyToken::Named(k), ModMask::ALT);
        let named = |k| KeyPress::plain(KeyToken::Named(k));

        map.bind(ctrl('c'), Action::Quit);
        map.bind(ctrl('l'), Action::Redraw);
        map.bind(named(NamedKey::PageUp), Action::PageUp);
        map.bind(named(NamedKey::PageDown), Action::PageDown);
        map.bind(alt(NamedKey::Up), Action::TreeUp);
        map.bind(alt(NamedKey::Down), Action::TreeDown);
        map.bind(alt(NamedKey::Enter), Action::OpenSelected);
        map.bind(alt(NamedKey::End), Action::JumpToBottom);
        map.bind(KeyPress::plain(KeyToken::Named(NamedKey::Tab)), Action::FocusNext);

        map.bind_chain(ctrl('k'), KeyPress::plain(KeyToken::Char('m')), Action::ToggleMemberList);
        map.bind_chain(ctrl('k'), KeyPress::plain(KeyToken::Char('t')), Action::FocusTree);
        map.bind_chain(ctrl('k'), KeyPress::plain(KeyToken::Char('c')), Action::FocusChat);
        map.bind_chain(ctrl('k'), KeyPress::plain(KeyToken::Char('r')), Action::MarkChannelRead);
        map
    }
}

/// Central key dispatcher. Resolution order per press: pending chain,
/// assist-popup keys, keymap, then edit-buffer defaults.
pub struct InputDispatcher {
    edit: EditBuffer,
    keymap: Keymap,
    triggers: AssistTriggers,
    chord: Option<(KeyPress, Instant)>,
    chord_timeout: Duration,
    assist: Option<Assist>,
    pasting: bool,
    paste_chars: usize,
}

impl Default for InputDispatcher {
    fn default() -> Self {
        Self::new(Keymap::standard(), AssistTriggers::default(), CHORD_TIMEOUT)
    }
}

impl InputDispatcher {
    pub fn new(keymap: Keymap, triggers: AssistTriggers, chord_timeout: Duration) -> Self {
        Self {
            edit: EditBuffer::new(),
            keymap,
            triggers,
            chord: None,
            chord_timeout,
            assist: None,
            pasting: false,
            paste_chars: 0,
        }
    }

    pub fn edit(&self) -> &EditBuffer {
        &self.edit
    }

    pub fn assist(&self) -> Option<&Assist> {
        self.assist.as_ref()
    }

    pub fn chord_pending(&self) -> bool {
        self.chord.is_some()
    }

    /// Drains the edit buffer for a send, resetting history.
    pub fn take_text(&mut self) -> String {
        let text = self.edit.text().to_string();
        self.edit.reset(String::new());
        self.assist = None;
        text
    }

    /// Replaces the assist query (trigger through cursor) with `completion`.
    pub fn accept_assist(&mut self, completion: &str) {
        let Some(found) = self.assist.take() else {
            return;
        };
        let text = self.edit.text();
        let tail = text[self.edit.cursor()..].to_string();
        let mut next = text[..found.start].to_string();
        next.push_str(completion);
        let cursor = next.len();
        next.push_str(&tail);
        self.edit.reset(next);
        // reset leaves the cursor at the end; walk it back before the tail.
        while self.edit.cursor() > cursor {
            self.edit.move_left(false);
        }
    }

    pub fn handle_key(&mut self, press: KeyPress, now: Instant) -> Option<Action> {
        trace!(target: "input.dispatch", token = ?press.token, mods = press.mods.bits(), "key");

        if let Some((first, at)) = self.chord.take() {
            if now.duration_since(at) <= self.chord_timeout
                && let Some(Binding::Prefix(map)) = self.keymap.bindings.get(&first)
            {
                if let Some(action) = map.get(&press) {
                    trace!(target: "input.dispatch", code = action.code(), "chain_resolved");
                    return Some(*action);
                }
                // Unknown second key cancels the chain and swallows the press.
                return None;
            }
            // Expired chain: fall through and treat the press normally.
        }

        if self.assist.is_some()
            && let Some(action) = self.assist_key(&press)
        {
            return Some(action);
        }

        match self.keymap.bindings.get(&press) {
            Some(Binding::Do(action)) => return Some(*action),
            Some(Binding::Prefix(_)) => {
                self.chord = Some((press, now));
                return None;
            }
            None => {}
        }

        self.edit_key(&press)
    }

    /// Keys captured by an open assist popup.
    fn assist_key(&mut self, press: &KeyPress) -> Option<Action> {
        match press.token {
            KeyToken::Named(NamedKey::Tab) if press.mods.contains(ModMask::SHIFT) => {
                Some(Action::AssistPrev)
            }
            KeyToken::Named(NamedKey::Tab) | KeyToken::Named(NamedKey::Down) => {
                Some(Action::AssistNext)
            }
            KeyToken::Named(NamedKey::Up) => Some(Action::AssistPrev),
            KeyToken::Named(NamedKey::Enter) => Some(Action::AssistAccept),
            KeyToken::Named(NamedKey::Esc) => {
                self.assist = None;
                Some(Action::AssistDismiss)
            }
            _ => None,
        }
    }

    fn edit_key(&mut self, press: &KeyPress) -> Option<Action> {
        let extend = press.mods.contains(ModMask::SHIFT);
        let mut action = None;
        match press.token {
            KeyToken::Char(c) if !press.mods.intersects(ModMask::CTRL | ModMask::ALT) => {
                let mut buf = [0u8; 4];
                self.edit.insert(c.encode_utf8(&mut buf));
            }
            KeyToken::Char('z') if press.mods.contains(ModMask::CTRL) => {
                if extend {
                    self.edit.redo();
                } else {
                    self.edit.undo();
                }
            }
            KeyToken::Char('y') if press.mods.contains(ModMask::CTRL) => {
                self.edit.redo();
            }
            KeyToken::Char('a') if press.mods.contains(ModMask::CTRL) => {
                self.edit.move_home(false);
                self.edit.move_end(true);
            }
            KeyToken::Named(NamedKey::Backspace) => self.edit.backspace(),
            KeyToken::Named(NamedKey::Delete) => self.edit.delete_forward(),
            KeyToken::Named(NamedKey::Left) => self.edit.move_left(extend),
            KeyToken::Named(NamedKey::Right) => self.edit.move_right(extend),
            KeyToken::Named(NamedKey::Home) => self.edit.move_home(extend),
            KeyToken::Named(NamedKey::End) => self.edit.move_end(extend),
            KeyToken::Named(NamedKey::Esc) => self.edit.clear_selection(),
            KeyToken::Named(NamedKey::Enter) if !self.edit.is_empty() => {
                action = Some(Action::SendMessage);
            }
            _ => return None,
        }
        self.assist = assist::detect(self.edit.text(), self.edit.cursor(), &self.triggers);
        action
    }

    pub fn paste_start(&mut self) {
        self.pasting = true;
        self.paste_chars = 0;
    }

    /// Inserts pasted text as one undo step; newlines collapse to spaces in
    /// the single-line buffer.
    pub fn paste_chunk(&mut self, data: &str) {
        let flat: String = data
            .chars()
            .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
            .filter(|c| !c.is_control())
            .collect();
        self.paste_chars += flat.chars().count();
        self.edit.insert(&flat);
    }

    pub fn paste_end(&mut self) {
        self.pasting = false;
        debug!(target: "input.paste", chars = self.paste_chars, "paste_committed");
        self.assist = assist::detect(self.edit.text(), self.edit.cursor(), &self.triggers);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ch(c: char) -> KeyPress {
        KeyPress::plain(KeyToken::Char(c))
    }

    fn named(k: NamedKey) -> KeyPress {
        KeyPress::plain(KeyToken::Named(k))
    }

    fn ctrl(c: char) -> KeyPress {
        KeyPress::new(KeyToken::Char(c), ModMask::CTRL)
    }

    fn type_str(d: &mut InputDispatcher, s: &str) {
        let now = Instant::now();
        for c in s.chars() {
            d.handle_key(ch(c), now);
        }
    }

    #[test]
    fn printable_keys_fill_edit_buffer() {
        let mut d = InputDispatcher::default();
        type_str(&mut d, "hi there");
        assert_eq!(d.edit().text(), "hi there");
    }

    #[test]
    fn enter_sends_when_nonempty() {
        let mut d = InputDispatcher::default();
        assert_eq!(d.handle_key(named(NamedKey::Enter), Instant::now()), None);
        type_str(&mut d, "hello");
        assert_eq!(
            d.handle_key(named(NamedKey::Enter), Instant::now()),
            Some(Action::SendMessage)
        );
        assert_eq!(d.take_text(), "hello");
        assert_eq!(d.edit().text(), "");
    }

    #[test]
    fn chained_binding_resolves() {
        let mut d = InputDispatcher::default();
        let t0 = Instant::now();
        assert_eq!(d.handle_key(ctrl('k'), t0), None);
        assert!(d.chord_pending());
        assert_eq!(
            d.handle_key(ch('m'), t0 + Duration::from_millis(100)),
            Some(Action::ToggleMemberList)
        );
    }

    #[test]
    fn expired_chain_falls_through_to_edit() {
        let mut d = InputDispatcher::default();
        let t0 = Instant::now();
        d.handle_key(ctrl('k'), t0);
        assert_eq!(d.handle_key(ch('m'), t0 + Duration::from_secs(5)), None);
        assert_eq!(d.edit().text(), "m");
    }

    #[test]
    fn unknown_second_key_cancels_chain() {
        let mut d = InputDispatcher::default();
        let t0 = Instant::now();
        d.handle_key(ctrl('k'), t0);
        assert_eq!(d.handle_key(ch('q'), t0 + Duration::from_millis(10)), None);
        assert_eq!(d.edit().text(), "");
        assert!(!d.chord_pending());
    }

    #[test]
    fn assist_opens_and_accepts() {
        let mut d = InputDispatcher::default();
        type_str(&mut d, "ping @al");
        let found = d.assist().expect("user assist open");
        assert_eq!(found.kind, AssistKind::User);
        assert_eq!(found.query, "al");

        assert_eq!(
            d.handle_key(named(NamedKey::Enter), Instant::now()),
            Some(Action::AssistAccept)
        );
        d.accept_assist("@alice ");
        assert_eq!(d.edit().text(), "ping @alice ");
        assert!(d.assist().is_none());
    }

    #[test]
    fn assist_esc_dismisses_without_editing() {
        let mut d = InputDispatcher::default();
        type_str(&mut d, "#gen");
        assert!(d.assist().is_some());
        assert_eq!(
            d.handle_key(named(NamedKey::Esc), Instant::now()),
            Some(Action::AssistDismiss)
        );
        assert!(d.assist().is_none());
        assert_eq!(d.edit().text(), "#gen");
    }

    #[test]
    fn paste_flattens_newlines_single_undo() {
        let mut d = InputDispatcher::default();
        d.paste_start();
        d.paste_chunk("two\nlines");
        d.paste_end();
        assert_eq!(d.edit().text(), "two lines");
    }

    #[test]
    fn undo_redo_via_keys() {
        let mut d = InputDispatcher::default();
        type_str(&mut d, "abc");
        d.handle_key(ctrl('z'), Instant::now());
        assert_eq!(d.edit().text(), "");
        d.handle_key(ctrl('y'), Instant::now());
        assert_eq!(d.edit().text(), "abc");
    }

    #[test]
    fn tab_cycles_focus_outside_assist() {
        let mut d = InputDispatcher::default();
        assert_eq!(
            d.handle_key(named(NamedKey::Tab), Instant::now()),
            Some(Action::FocusNext)
        );
    }
}
