/// Completion-assist detection over the edit buffer.
///
/// An assist opens when the cursor sits after a trigger character plus a
/// query of at least [`MIN_QUERY_LEN`] word characters with no intervening
/// whitespace. The trigger must start a word (buffer start or preceded by
/// whitespace), so mid-word punctuation never opens a popup.
pub const MIN_QUERY_LEN: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssistKind {
    Channel,
    User,
    Emoji,
    Sticker,
    Command,
}

/// Trigger characters, one per assist kind. Configurable so deployments can
/// remap or disable (by assigning an unreachable character) each popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssistTriggers {
    pub channel: char,
    pub user: char,
    pub emoji: char,
    pub sticker: char,
    pub command: char,
}

impl Default for AssistTriggers {
    fn default() -> Self {
        Self {
            channel: '#',
            user: '@',
            emoji: ':',
            sticker: ';',
            command: '/',
        }
    }
}

impl AssistTriggers {
    fn kind_of(&self, c: char) -> Option<AssistKind> {
        if c == self.channel {
            Some(AssistKind::Channel)
        } else if c == self.user {
            Some(AssistKind::User)
        } else if c == self.emoji {
            Some(AssistKind::Emoji)
        } else if c == self.sticker {
            Some(AssistKind::Sticker)
        } else if c == self.command {
            Some(AssistKind::Command)
        } else {
            None
        }
    }
}

/// An open assist: the trigger's byte offset and the query typed so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assist {
    pub kind: AssistKind,
    /// Byte offset of the trigger character in the buffer.
    pub start: usize,
    pub query: String,
}

/// Scans backward from the cursor for an open assist. Returns `None` when
/// the query is too short, broken by whitespace, or the trigger is mid-word.
pub fn detect(text: &str, cursor: usize, triggers: &AssistTriggers) -> Option<Assist> {
    let head = &text[..cursor];
    let mut query_chars = 0usize;
    for (idx, c) in head.char_indices().rev() {
        if c.is_whitespace() {
            return None;
        }
        if let Some(kind) = triggers.kind_of(c) {
            let word_start = head[..idx]
                .chars()
                .next_back()
                .is_none_or(|p| p.is_whitespace());
            if !word_start || query_chars < MIN_QUERY_LEN {
                return None;
            }
            return Some(Assist {
                kind,
                start: idx,
                query: head[idx + c.len_utf8()..].to_string(),
            });
        }
        query_chars += 1;
    }
    None
}
