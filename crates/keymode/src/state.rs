use leader_protocol::{Cursor, Key};
use tracing::{debug, trace};

use crate::{Action, Group, Node};

/// Result of handling a key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyResponse {
    /// Nothing changed.
    Ok,
    /// The cursor or display changed; the overlay stays open.
    Moved,
    /// A leaf was reached. State is already reset; the caller closes the overlay and
    /// hands the action to the dispatcher.
    Dispatch(Action),
    /// Escape: the caller closes the overlay. State is already reset.
    Close,
    /// No child of the active group matches the key. State is unchanged.
    Miss,
}

/// Tracks the cursor within the action tree and the label shown to the user.
///
/// The tree itself is passed in on every call and never stored, so a reload can replace it
/// at any time; callers reset the state when that happens.
#[derive(Debug, Default)]
pub struct State {
    /// Current position; each prefix of the path is one entry of the backtrack history.
    cursor: Cursor,
    /// Label to render: the key of the last group entered, if any.
    display: Option<String>,
}

impl State {
    /// Create a new state at the root with an empty display.
    pub fn new() -> Self {
        Self::default()
    }

    /// Process one keystroke against `root`.
    pub fn handle_key(&mut self, root: &Group, key: &Key) -> KeyResponse {
        if root.resolve(&self.cursor).is_none() {
            debug!(path = ?self.cursor.path(), "cursor does not fit tree, resetting");
            self.reset();
        }
        match key {
            Key::Escape => {
                self.reset();
                KeyResponse::Close
            }
            Key::Backspace => self.back(root),
            Key::Char(c) => self.select(root, *c),
        }
    }

    /// Go back one level, or clear the display when already at root.
    fn back(&mut self, root: &Group) -> KeyResponse {
        if self.cursor.pop().is_some() {
            self.display = self.active(root).key.clone();
            trace!(path = ?self.cursor.path(), "popped");
            return KeyResponse::Moved;
        }
        if self.display.is_none() {
            return KeyResponse::Ok;
        }
        self.reset();
        KeyResponse::Moved
    }

    /// Resolve a printable key against the active group.
    fn select(&mut self, root: &Group, c: char) -> KeyResponse {
        let active = self.active(root);
        match active.find(c) {
            Some((idx, Node::Group(g))) => {
                self.cursor.push(idx as u32);
                self.display = g.key.clone();
                trace!(key = %c, path = ?self.cursor.path(), "entered group");
                KeyResponse::Moved
            }
            Some((_, Node::Action(a))) => {
                let action = a.clone();
                debug!(key = %c, kind = action.kind.as_str(), "leaf reached");
                self.reset();
                KeyResponse::Dispatch(action)
            }
            None => {
                trace!(key = %c, "no match");
                KeyResponse::Miss
            }
        }
    }

    /// The group the user is inside: the cursor target, or `root` when at root.
    pub fn active<'a>(&self, root: &'a Group) -> &'a Group {
        root.resolve(&self.cursor).unwrap_or(root)
    }

    /// The entered group, or `None` at root.
    pub fn current<'a>(&self, root: &'a Group) -> Option<&'a Group> {
        if self.cursor.is_root() {
            return None;
        }
        root.resolve(&self.cursor)
    }

    /// Previously entered groups, outermost first. Empty at root.
    pub fn history<'a>(&self, root: &'a Group) -> Vec<&'a Group> {
        let path = self.cursor.path();
        let mut out = Vec::with_capacity(path.len());
        let mut cur = root;
        for idx in path {
            out.push(cur);
            match cur.actions.get(*idx as usize) {
                Some(Node::Group(next)) => cur = next,
                _ => break,
            }
        }
        out
    }

    /// Reset to root and clear the display.
    pub fn reset(&mut self) {
        self.cursor.clear();
        self.display = None;
    }

    /// Get the current depth (0 = root).
    pub fn depth(&self) -> usize {
        self.cursor.depth()
    }

    /// Return the current cursor.
    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    /// Label to render, if any.
    pub fn display(&self) -> Option<&str> {
        self.display.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use config::{ActionKind, decode_str};

    use super::*;

    fn tree() -> Group {
        decode_str(
            r#"{"actions":[
                {"key":"t","type":"application","value":"/Applications/Terminal.app"},
                {"key":"g","type":"group","friendly":"One","actions":[
                    {"key":"h","type":"group","actions":[
                        {"key":"x","type":"command","value":"echo deep"}
                    ]},
                    {"key":"u","type":"url","value":"https://example.com"}
                ]},
                {"key":"e","type":"group","actions":[]}
            ]}"#,
        )
        .unwrap()
    }

    fn press(state: &mut State, root: &Group, c: char) -> KeyResponse {
        state.handle_key(root, &Key::Char(c))
    }

    #[test]
    fn enter_and_back_to_root() {
        let root = tree();
        let mut s = State::new();
        assert_eq!(press(&mut s, &root, 'g'), KeyResponse::Moved);
        assert_eq!(s.depth(), 1);
        assert_eq!(s.display(), Some("g"));
        assert_eq!(s.current(&root).and_then(|g| g.title()), Some("One"));
        assert_eq!(s.history(&root).len(), 1);

        assert_eq!(s.handle_key(&root, &Key::Backspace), KeyResponse::Moved);
        assert_eq!(s.depth(), 0);
        assert!(s.history(&root).is_empty());
        assert_eq!(s.display(), None);
        assert!(s.current(&root).is_none());
    }

    #[test]
    fn backspace_pops_one_level() {
        let root = tree();
        let mut s = State::new();
        press(&mut s, &root, 'g');
        press(&mut s, &root, 'h');
        assert_eq!(s.depth(), 2);
        assert_eq!(s.display(), Some("h"));

        s.handle_key(&root, &Key::Backspace);
        assert_eq!(s.depth(), 1);
        assert_eq!(s.display(), Some("g"));
        assert_eq!(s.active(&root).key.as_deref(), Some("g"));

        s.handle_key(&root, &Key::Backspace);
        assert_eq!(s.depth(), 0);
        assert_eq!(s.display(), None);
    }

    #[test]
    fn backspace_at_untouched_root_is_noop() {
        let root = tree();
        let mut s = State::new();
        assert_eq!(s.handle_key(&root, &Key::Backspace), KeyResponse::Ok);
        assert_eq!(s.depth(), 0);
    }

    #[test]
    fn leaf_at_depth_dispatches_and_resets() {
        let root = tree();
        let mut s = State::new();
        press(&mut s, &root, 'g');
        press(&mut s, &root, 'h');
        match press(&mut s, &root, 'x') {
            KeyResponse::Dispatch(a) => {
                assert_eq!(a.kind, ActionKind::Command);
                assert_eq!(a.value, "echo deep");
            }
            other => panic!("{other:?}"),
        }
        assert_eq!(s.depth(), 0);
        assert_eq!(s.display(), None);
    }

    #[test]
    fn miss_leaves_state_unchanged() {
        let root = tree();
        let mut s = State::new();
        press(&mut s, &root, 'g');
        let before = s.cursor().clone();
        assert_eq!(press(&mut s, &root, 'z'), KeyResponse::Miss);
        assert_eq!(s.cursor(), &before);
        assert_eq!(s.display(), Some("g"));
    }

    #[test]
    fn empty_group_always_misses() {
        let root = tree();
        let mut s = State::new();
        press(&mut s, &root, 'e');
        for c in ['t', 'g', 'e', 'x'] {
            assert_eq!(press(&mut s, &root, c), KeyResponse::Miss);
        }
        assert_eq!(s.depth(), 1);
        assert_eq!(s.handle_key(&root, &Key::Escape), KeyResponse::Close);
        assert_eq!(s.depth(), 0);
    }

    #[test]
    fn uppercase_input_matches() {
        let root = tree();
        let mut s = State::new();
        assert_eq!(press(&mut s, &root, 'G'), KeyResponse::Moved);
        assert!(matches!(press(&mut s, &root, 'U'), KeyResponse::Dispatch(_)));
    }

    #[test]
    fn stale_cursor_resets_on_new_tree() {
        let root = tree();
        let mut s = State::new();
        press(&mut s, &root, 'g');
        press(&mut s, &root, 'h');
        let smaller = Group::empty();
        assert_eq!(press(&mut s, &smaller, 'x'), KeyResponse::Miss);
        assert_eq!(s.depth(), 0);
    }
}
