/// Opaque action codes returned to the embedding client.
///
/// The core never performs protocol work itself; the caller turns a code
/// into a send/edit/join request. Discriminants are explicit and stable:
/// they are the wire contract with the embedder, grouped by decade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Action {
    Quit = 1,
    Redraw = 2,

    SendMessage = 10,
    EditLastMessage = 11,
    DeleteLastMessage = 12,
    RevealSpoiler = 13,

    OpenSelected = 20,
    JoinThread = 21,
    ToggleCollapse = 22,
    MarkChannelRead = 23,

    ScrollUp = 30,
    ScrollDown = 31,
    PageUp = 32,
    PageDown = 33,
    JumpToBottom = 34,

    TreeUp = 40,
    TreeDown = 41,

    FocusNext = 50,
    FocusChat = 51,
    FocusTree = 52,
    ToggleMemberList = 53,

    AssistNext = 60,
    AssistPrev = 61,
    AssistAccept = 62,
    AssistDismiss = 63,
}

impl Action {
    pub fn code(self) -> i32 {
        self as i32
    }
}
