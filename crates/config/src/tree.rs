//! The action tree: groups of actions and nested groups, keyed by single characters.

use leader_protocol::{Cursor, OverlayEntry};

/// Values longer than this are shortened when shown as a label.
const LABEL_MAX: usize = 20;
/// Characters kept from each end of a shortened value.
const LABEL_KEEP: usize = 10;

/// What a leaf action does when selected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// Launch the application bundle or executable at `value`.
    Application,
    /// Open `value` as a URI without foregrounding this app.
    Url,
    /// Run `value` through the user's shell.
    Command,
    /// Reveal `value` in the platform file browser.
    Folder,
    /// A `type` this build does not understand; kept so the rest of the tree loads.
    Unknown(String),
}

impl ActionKind {
    /// Parse a leaf `type` string. Never fails: unrecognized names become `Unknown`.
    pub fn parse(s: &str) -> Self {
        match s {
            "application" => Self::Application,
            "url" => Self::Url,
            "command" => Self::Command,
            "folder" => Self::Folder,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// The wire name written to the `type` field.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Application => "application",
            Self::Url => "url",
            Self::Command => "command",
            Self::Folder => "folder",
            Self::Unknown(s) => s,
        }
    }
}

/// A leaf node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    /// Key selecting this action within its parent.
    pub key: String,
    /// Effect to perform.
    pub kind: ActionKind,
    /// Payload whose meaning depends on `kind`.
    pub value: String,
    /// Human-readable label; empty when unset.
    pub friendly: String,
}

impl Action {
    /// Create an action with no friendly label.
    pub fn new(key: impl Into<String>, kind: ActionKind, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind,
            value: value.into(),
            friendly: String::new(),
        }
    }

    /// Attach a friendly label.
    pub fn with_friendly(mut self, friendly: impl Into<String>) -> Self {
        self.friendly = friendly.into();
        self
    }

    /// Label shown in the option list: the friendly name, or a shortened value.
    pub fn label(&self) -> String {
        if self.friendly.is_empty() {
            truncate_value(&self.value)
        } else {
            self.friendly.clone()
        }
    }
}

/// An interior node. The root group has no key.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Group {
    /// Key selecting this group within its parent; `None` only for the root.
    pub key: Option<String>,
    /// Optional human-readable label.
    pub friendly: Option<String>,
    /// Children in declaration order.
    pub actions: Vec<Node>,
}

/// A child of a group: either a leaf action or a nested group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Leaf.
    Action(Action),
    /// Nested group.
    Group(Group),
}

impl Node {
    /// The key this node is selected by, if any.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Action(a) => Some(&a.key),
            Self::Group(g) => g.key.as_deref(),
        }
    }

    /// Case-insensitive comparison of this node's key against a typed character.
    pub fn matches(&self, ch: char) -> bool {
        let Some(key) = self.key() else {
            return false;
        };
        key.to_lowercase() == ch.to_lowercase().collect::<String>()
    }

    /// Row rendered in the option list for this node.
    pub fn entry(&self) -> OverlayEntry {
        match self {
            Self::Action(a) => OverlayEntry {
                key: a.key.clone(),
                label: a.label(),
                is_group: false,
            },
            Self::Group(g) => OverlayEntry {
                key: g.key.clone().unwrap_or_default(),
                label: g.friendly.clone().unwrap_or_default(),
                is_group: true,
            },
        }
    }
}

impl From<Action> for Node {
    fn from(a: Action) -> Self {
        Self::Action(a)
    }
}

impl From<Group> for Node {
    fn from(g: Group) -> Self {
        Self::Group(g)
    }
}

impl Group {
    /// An empty root group, used whenever a config cannot be loaded.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a keyed group with the given children.
    pub fn new(key: impl Into<String>, actions: Vec<Node>) -> Self {
        Self {
            key: Some(key.into()),
            friendly: None,
            actions,
        }
    }

    /// Create an unkeyed root group with the given children.
    pub fn root(actions: Vec<Node>) -> Self {
        Self {
            key: None,
            friendly: None,
            actions,
        }
    }

    /// Attach a friendly label.
    pub fn with_friendly(mut self, friendly: impl Into<String>) -> Self {
        self.friendly = Some(friendly.into());
        self
    }

    /// Find the first child whose key matches `ch`, in declaration order.
    ///
    /// Keys differing only in case are indistinguishable here; the first one declared wins.
    pub fn find(&self, ch: char) -> Option<(usize, &Node)> {
        self.actions.iter().enumerate().find(|(_, n)| n.matches(ch))
    }

    /// Resolve the group a cursor points at. Returns `self` for an empty path and `None`
    /// when the path does not describe a chain of groups in this tree.
    pub fn resolve(&self, cursor: &Cursor) -> Option<&Self> {
        let mut cur = self;
        for idx in cursor.path() {
            match cur.actions.get(*idx as usize)? {
                Node::Group(next) => cur = next,
                Node::Action(_) => return None,
            }
        }
        Some(cur)
    }

    /// Option-list rows for this group's children.
    pub fn entries(&self) -> Vec<OverlayEntry> {
        self.actions.iter().map(Node::entry).collect()
    }

    /// Friendly label when set and non-empty.
    pub fn title(&self) -> Option<&str> {
        self.friendly.as_deref().filter(|f| !f.is_empty())
    }
}

/// Shorten long values to `first10...last10`.
fn truncate_value(value: &str) -> String {
    let count = value.chars().count();
    if count <= LABEL_MAX {
        return value.to_string();
    }
    let head: String = value.chars().take(LABEL_KEEP).collect();
    let tail: String = value.chars().skip(count - LABEL_KEEP).collect();
    format!("{head}...{tail}")
}
