//! Types shared between the navigation core, the engine, and overlay renderers.
use serde::{Deserialize, Serialize};

/// Pointer into the loaded action tree.
///
/// Each element is an index into the `actions` list of the group reached by
/// the previous steps, so the path doubles as the backtrack history: every
/// prefix names one previously entered group. The cursor never borrows the
/// tree, which lets a reload swap the tree out from under it; callers reset
/// the cursor whenever that happens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Cursor {
    /// Indices into the parent group's `actions` vector for each descent step.
    path: Vec<u32>,
}

impl Cursor {
    /// Construct a cursor from an explicit path.
    pub fn new(path: Vec<u32>) -> Self {
        Self { path }
    }

    /// Logical depth equals the number of elements in the path (root = 0).
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    /// Push an index step into the location path.
    pub fn push(&mut self, idx: u32) {
        self.path.push(idx);
    }

    /// Pop a step from the location path. Returns the popped index if any.
    pub fn pop(&mut self) -> Option<u32> {
        self.path.pop()
    }

    /// Clear the path, returning to root.
    pub fn clear(&mut self) {
        self.path.clear();
    }

    /// Borrow the immutable path for inspection/logging.
    pub fn path(&self) -> &[u32] {
        &self.path
    }

    /// True when the cursor sits at the tree root.
    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }
}

/// A raw keystroke delivered by the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    /// Close the overlay.
    Escape,
    /// Go back one level.
    Backspace,
    /// A printable character.
    Char(char),
}

impl Key {
    /// Parse a key token: `esc`/`escape`, `backspace`/`bs`, or a single character.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "esc" | "escape" => return Some(Self::Escape),
            "backspace" | "bs" => return Some(Self::Backspace),
            _ => {}
        }
        let mut chars = token.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if !c.is_control() => Some(Self::Char(c)),
            _ => None,
        }
    }
}

/// One row of the option list under the active group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayEntry {
    /// Key that selects this entry.
    pub key: String,
    /// Effective label: friendly name, or a truncated value for unnamed actions.
    pub label: String,
    /// True when selecting the entry descends into a group.
    pub is_group: bool,
}

/// Everything the overlay needs to render one frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Overlay {
    /// Large label: the key of the current group, if any.
    pub display: Option<String>,
    /// Friendly name of the current group, when it has a non-empty one.
    pub title: Option<String>,
    /// Visible children of the active group, in declaration order.
    pub entries: Vec<OverlayEntry>,
    /// Whether the option list is disclosed.
    pub options_visible: bool,
    /// Whether the full cheat sheet is disclosed.
    pub cheatsheet_visible: bool,
}

/// Notification severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotifyKind {
    /// Informational.
    Info,
    /// Non-blocking problem, such as a failed dispatch.
    Warn,
    /// Blocking problem, such as a config that failed to load.
    Error,
    /// Completed operation.
    Success,
}

/// Messages sent from the engine to the overlay and other UI listeners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MsgToUI {
    /// The overlay opened at the root.
    Show(Overlay),
    /// The cursor or a disclosure flag changed while open.
    Update(Overlay),
    /// The overlay closed and navigation state was cleared.
    Hide,
    /// A keystroke matched nothing; drives the shake affordance.
    Miss,
    /// The configuration was reloaded from disk.
    Reloaded {
        /// False when the load fell back to an empty tree.
        ok: bool,
    },
    /// Notification request for the UI. Errors about config are blocking.
    Notify {
        /// Severity.
        kind: NotifyKind,
        /// Short heading.
        title: String,
        /// Body text.
        text: String,
    },
}

/// Channel helpers for UI messages.
pub mod ipc {
    use super::MsgToUI;

    /// Tokio unbounded sender for UI messages.
    pub type UiTx = tokio::sync::mpsc::UnboundedSender<MsgToUI>;
    /// Tokio unbounded receiver for UI messages.
    pub type UiRx = tokio::sync::mpsc::UnboundedReceiver<MsgToUI>;

    /// Create a standard unbounded UI channel (sender, receiver).
    pub fn ui_channel() -> (UiTx, UiRx) {
        tokio::sync::mpsc::unbounded_channel::<MsgToUI>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_push_pop() {
        let mut c = Cursor::default();
        assert!(c.is_root());
        c.push(2);
        c.push(0);
        assert_eq!(c.path(), &[2, 0]);
        assert_eq!(c.pop(), Some(0));
        assert_eq!(c.depth(), 1);
        c.clear();
        assert!(c.is_root());
        assert_eq!(c.pop(), None);
    }

    #[test]
    fn key_tokens() {
        assert_eq!(Key::parse("esc"), Some(Key::Escape));
        assert_eq!(Key::parse("bs"), Some(Key::Backspace));
        assert_eq!(Key::parse("t"), Some(Key::Char('t')));
        assert_eq!(Key::parse("?"), Some(Key::Char('?')));
        assert_eq!(Key::parse("tt"), None);
        assert_eq!(Key::parse(""), None);
        assert_eq!(Key::parse("\t"), None);
    }

    #[test]
    fn overlay_serializes_for_renderers() {
        let msg = MsgToUI::Update(Overlay {
            display: Some("o".into()),
            title: None,
            entries: vec![OverlayEntry {
                key: "s".into(),
                label: "Safari".into(),
                is_group: false,
            }],
            options_visible: true,
            cheatsheet_visible: false,
        });
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"Safari\""));
        let back: MsgToUI = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }
}
