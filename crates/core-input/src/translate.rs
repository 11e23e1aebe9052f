use core_events::{KeyPress, KeyToken, ModMask, MouseButton, MouseEvent, MouseEventKind, NamedKey};
use crossterm::event::{
    KeyCode as CKeyCode, KeyEvent as CKeyEvent, KeyEventKind as CKeyEventKind,
    KeyModifiers as CKeyModifiers, MouseButton as CMouseButton, MouseEvent as CMouseEvent,
    MouseEventKind as CMouseEventKind,
};

/// Maps a crossterm key event into a logical key press.
///
/// Returns `None` for release events and key codes we do not support
/// (media keys, lock keys).
pub(crate) fn map_key_event(event: &CKeyEvent) -> Option<KeyPress> {
    if event.kind == CKeyEventKind::Release {
        return None;
    }
    let token = map_key_token(&event.code)?;
    Some(KeyPress::new(token, map_mod_mask(event.modifiers)))
}

fn map_key_token(code: &CKeyCode) -> Option<KeyToken> {
    let token = match code {
        CKeyCode::Char(c) => KeyToken::Char(*c),
        CKeyCode::Enter => KeyToken::Named(NamedKey::Enter),
        CKeyCode::Esc => KeyToken::Named(NamedKey::Esc),
        CKeyCode::Backspace => KeyToken::Named(NamedKey::Backspace),
        CKeyCode::Tab | CKeyCode::BackTab => KeyToken::Named(NamedKey::Tab),
        CKeyCode::Up => KeyToken::Named(NamedKey::Up),
        CKeyCode::Down => KeyToken::Named(NamedKey::Down),
        CKeyCode::Left => KeyToken::Named(NamedKey::Left),
        CKeyCode::Right => KeyToken::Named(NamedKey::Right),
        CKeyCode::Home => KeyToken::Named(NamedKey::Home),
        CKeyCode::End => KeyToken::Named(NamedKey::End),
        CKeyCode::PageUp => KeyToken::Named(NamedKey::PageUp),
        CKeyCode::PageDown => KeyToken::Named(NamedKey::PageDown),
        CKeyCode::Insert => KeyToken::Named(NamedKey::Insert),
        CKeyCode::Delete => KeyToken::Named(NamedKey::Delete),
        CKeyCode::F(n) => KeyToken::Named(NamedKey::F(*n)),
        _ => return None,
    };
    Some(token)
}

pub(crate) fn map_mod_mask(mods: CKeyModifiers) -> ModMask {
    let mut out = ModMask::empty();
    if mods.contains(CKeyModifiers::CONTROL) {
        out |= ModMask::CTRL;
    }
    if mods.contains(CKeyModifiers::ALT) {
        out |= ModMask::ALT;
    }
    if mods.contains(CKeyModifiers::SHIFT) {
        out |= ModMask::SHIFT;
    }
    out
}

/// Maps a crossterm mouse event; horizontal scroll is dropped.
pub(crate) fn map_mouse_event(event: &CMouseEvent) -> Option<MouseEvent> {
    let kind = match event.kind {
        CMouseEventKind::Down(b) => MouseEventKind::Down(map_button(b)?),
        CMouseEventKind::Up(b) => MouseEventKind::Up(map_button(b)?),
        CMouseEventKind::Drag(b) => MouseEventKind::Drag(map_button(b)?),
        CMouseEventKind::ScrollUp => MouseEventKind::ScrollUp,
        CMouseEventKind::ScrollDown => MouseEventKind::ScrollDown,
        CMouseEventKind::Moved => MouseEventKind::Moved,
        CMouseEventKind::ScrollLeft | CMouseEventKind::ScrollRight => return None,
    };
    Some(MouseEvent {
        kind,
        column: event.column,
        row: event.row,
        mods: map_mod_mask(event.modifiers),
    })
}

fn map_button(b: CMouseButton) -> Option<MouseButton> {
    match b {
        CMouseButton::Left => Some(MouseButton::Left),
        CMouseButton::Middle => Some(MouseButton::Middle),
        CMouseButton::Right => Some(MouseButton::Right),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState as CKeyEventState;

    fn key_event(code: CKeyCode, modifiers: CKeyModifiers, kind: CKeyEventKind) -> CKeyEvent {
        CKeyEvent {
            code,
            modifiers,
            kind,
            state: CKeyEventState::empty(),
        }
    }

    #[test]
    fn maps_basic_char() {
        let ev = key_event(
            CKeyCode::Char('a'),
            CKeyModifiers::NONE,
            CKeyEventKind::Press,
        );
        let press = map_key_event(&ev).expect("char should map");
        assert!(matches!(press.token, KeyToken::Char('a')));
        assert!(press.mods.is_empty());
    }

    #[test]
    fn maps_modifiers_into_mask() {
        let ev = key_event(
            CKeyCode::Char('d'),
            CKeyModifiers::CONTROL | CKeyModifiers::SHIFT,
            CKeyEventKind::Press,
        );
        let press = map_key_event(&ev).expect("ctrl-shift-d should map");
        assert!(press.mods.contains(ModMask::CTRL));
        assert!(press.mods.contains(ModMask::SHIFT));
    }

    #[test]
    fn release_events_dropped() {
        let ev = key_event(
            CKeyCode::Char('a'),
            CKeyModifiers::NONE,
            CKeyEventKind::Release,
        );
        assert!(map_key_event(&ev).is_none());
    }

    #[test]
    fn unsupported_keys_return_none() {
        let ev = key_event(
            CKeyCode::CapsLock,
            CKeyModifiers::NONE,
            CKeyEventKind::Press,
        );
        assert!(map_key_event(&ev).is_none());
    }

    #[test]
    fn scroll_maps_and_horizontal_dropped() {
        let base = CMouseEvent {
            kind: CMouseEventKind::ScrollUp,
            column: 3,
            row: 7,
            modifiers: CKeyModifiers::NONE,
        };
        let ev = map_mouse_event(&base).expect("scroll should map");
        assert!(matches!(ev.kind, MouseEventKind::ScrollUp));
        assert_eq!((ev.column, ev.row), (3, 7));

        let horiz = CMouseEvent {
            kind: CMouseEventKind::ScrollLeft,
            ..base
        };
        assert!(map_mouse_event(&horiz).is_none());
    }
}
