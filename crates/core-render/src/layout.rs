//! Window layout: fixed chrome rows, a tree column, an optional member
//! column, and the chat filling the remainder. Recomputed on every resize;
//! mouse events are routed by hit-testing the regions in z-order.

pub const TREE_WIDTH: u16 = 24;
pub const MEMBERS_WIDTH: u16 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowId {
    Title,
    Tree,
    Chat,
    Members,
    Input,
    Status,
    Popup,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Region {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl Region {
    pub fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, col: u16, row: u16) -> bool {
        col >= self.x && col < self.x + self.width && row >= self.y && row < self.y + self.height
    }

    /// Bottom row index inside the region (inclusive).
    pub fn bottom(&self) -> u16 {
        self.y + self.height.saturating_sub(1)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Layout {
    pub cols: u16,
    pub rows: u16,
    pub title: Region,
    pub tree: Region,
    pub chat: Region,
    pub members: Option<Region>,
    pub input: Region,
    pub status: Region,
    /// Assist popup, anchored above the input line while open.
    pub popup: Option<Region>,
}

impl Layout {
    /// Splits the terminal into regions. Degrades gracefully on tiny
    /// terminals: side columns shrink before the chat does, and the chat
    /// never drops below one column/row.
    pub fn compute(cols: u16, rows: u16, show_members: bool) -> Self {
        let title = Region::new(0, 0, cols, 1);
        let status = Region::new(0, rows.saturating_sub(1), cols, 1);
        let input = Region::new(0, rows.saturating_sub(2), cols, 1);
        let body_rows = rows.saturating_sub(3).max(1);

        let tree_w = TREE_WIDTH.min(cols / 4);
        let members_w = if show_members {
            MEMBERS_WIDTH.min(cols / 4)
        } else {
            0
        };
        let chat_w = cols.saturating_sub(tree_w + members_w).max(1);

        let tree = Region::new(0, 1, tree_w, body_rows);
        let chat = Region::new(tree_w, 1, chat_w, body_rows);
        let members = (members_w > 0).then(|| Region::new(tree_w + chat_w, 1, members_w, body_rows));

        Self {
            cols,
            rows,
            title,
            tree,
            chat,
            members,
            input,
            status,
            popup: None,
        }
    }

    /// Opens the assist popup: `lines` rows anchored directly above the
    /// input, clamped to the chat region.
    pub fn open_popup(&mut self, lines: u16) {
        let height = lines.min(self.chat.height);
        let y = self.input.y.saturating_sub(height);
        self.popup = Some(Region::new(
            self.chat.x,
            y,
            self.chat.width.min(40),
            height,
        ));
    }

    pub fn close_popup(&mut self) {
        self.popup = None;
    }

    /// Hit test in z-order: the popup floats above everything else.
    pub fn window_at(&self, col: u16, row: u16) -> Option<WindowId> {
        if let Some(p) = self.popup
            && p.contains(col, row)
        {
            return Some(WindowId::Popup);
        }
        let fixed = [
            (WindowId::Title, self.title),
            (WindowId::Input, self.input),
            (WindowId::Status, self.status),
            (WindowId::Tree, self.tree),
            (WindowId::Chat, self.chat),
        ];
        for (id, region) in fixed {
            if region.contains(col, row) {
                return Some(id);
            }
        }
        if let Some(m) = self.members
            && m.contains(col, row)
        {
            return Some(WindowId::Members);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regions_tile_the_terminal() {
        let l = Layout::compute(120, 40, true);
        assert_eq!(l.title.height, 1);
        assert_eq!(l.status.y, 39);
        assert_eq!(l.input.y, 38);
        assert_eq!(l.tree.width + l.chat.width + l.members.unwrap().width, 120);
        assert_eq!(l.chat.height, 37);
    }

    #[test]
    fn window_at_routes_clicks() {
        let l = Layout::compute(120, 40, true);
        assert_eq!(l.window_at(0, 0), Some(WindowId::Title));
        assert_eq!(l.window_at(5, 10), Some(WindowId::Tree));
        assert_eq!(l.window_at(50, 10), Some(WindowId::Chat));
        assert_eq!(l.window_at(110, 10), Some(WindowId::Members));
        assert_eq!(l.window_at(50, 38), Some(WindowId::Input));
        assert_eq!(l.window_at(50, 39), Some(WindowId::Status));
    }

    #[test]
    fn popup_takes_z_priority() {
        let mut l = Layout::compute(120, 40, false);
        let (col, row) = (l.chat.x + 1, 35);
        assert_eq!(l.window_at(col, row), Some(WindowId::Chat));
        l.open_popup(5);
        assert_eq!(l.window_at(col, row), Some(WindowId::Popup));
        l.close_popup();
        assert_eq!(l.window_at(col, row), Some(WindowId::Chat));
    }

    #[test]
    fn tiny_terminal_keeps_chat_alive() {
        let l = Layout::compute(4, 2, true);
        assert!(l.chat.width >= 1);
        assert!(l.chat.height >= 1);
    }
}
