//! JSON wire format for the action tree.
//!
//! Every child record carries a `type` discriminator. It is resolved before the
//! variant-specific fields are checked: `group` requires `actions`, anything
//! else is a leaf and requires `value`. The root record may omit `type`.

use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{self, Unexpected},
    ser::SerializeMap,
};

use crate::{Action, ActionKind, Error, Group, Node};

/// Discriminator value for interior nodes.
const GROUP: &str = "group";

/// Every field any record may carry. Which ones are required depends on `type`.
#[derive(Deserialize)]
struct RawNode {
    /// Selecting key; required for every non-root record.
    key: Option<String>,
    /// Discriminator.
    #[serde(rename = "type")]
    kind: Option<String>,
    /// Leaf payload.
    value: Option<String>,
    /// Optional label.
    friendly: Option<String>,
    /// Group children.
    actions: Option<Vec<Node>>,
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawNode::deserialize(deserializer)?;
        let kind = raw.kind.ok_or_else(|| de::Error::missing_field("type"))?;
        let key = raw.key.ok_or_else(|| de::Error::missing_field("key"))?;
        if kind == GROUP {
            let actions = raw
                .actions
                .ok_or_else(|| de::Error::missing_field("actions"))?;
            return Ok(Self::Group(Group {
                key: Some(key),
                friendly: raw.friendly,
                actions,
            }));
        }
        let value = raw.value.ok_or_else(|| de::Error::missing_field("value"))?;
        Ok(Self::Action(Action {
            key,
            kind: ActionKind::parse(&kind),
            value,
            friendly: raw.friendly.unwrap_or_default(),
        }))
    }
}

impl Serialize for Node {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        match self {
            Self::Action(a) => {
                map.serialize_entry("key", &a.key)?;
                map.serialize_entry("type", a.kind.as_str())?;
                map.serialize_entry("value", &a.value)?;
                if !a.friendly.is_empty() {
                    map.serialize_entry("friendly", &a.friendly)?;
                }
            }
            Self::Group(g) => {
                map.serialize_entry("key", g.key.as_deref().unwrap_or_default())?;
                map.serialize_entry("type", GROUP)?;
                map.serialize_entry("actions", &g.actions)?;
                if let Some(friendly) = &g.friendly {
                    map.serialize_entry("friendly", friendly)?;
                }
            }
        }
        map.end()
    }
}

/// Top-level document: a group whose own key and label are ignored.
struct Root(Group);

impl<'de> Deserialize<'de> for Root {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawNode::deserialize(deserializer)?;
        if let Some(kind) = raw.kind.as_deref()
            && kind != GROUP
        {
            return Err(de::Error::invalid_value(
                Unexpected::Str(kind),
                &"\"group\" at the top level",
            ));
        }
        let actions = raw
            .actions
            .ok_or_else(|| de::Error::missing_field("actions"))?;
        Ok(Self(Group::root(actions)))
    }
}

/// Borrowed root for encoding.
struct RootRef<'a>(&'a Group);

impl Serialize for RootRef<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("type", GROUP)?;
        map.serialize_entry("actions", &self.0.actions)?;
        map.end()
    }
}

/// Decode a config document.
pub fn decode(bytes: &[u8]) -> Result<Group, Error> {
    serde_json::from_slice::<Root>(bytes)
        .map(|r| r.0)
        .map_err(|e| Error::decode(&e, &String::from_utf8_lossy(bytes)))
}

/// Decode a config document from a string.
pub fn decode_str(source: &str) -> Result<Group, Error> {
    decode(source.as_bytes())
}

/// Encode a tree as pretty-printed JSON with a trailing newline.
pub fn encode(root: &Group) -> Result<Vec<u8>, Error> {
    let mut out = serde_json::to_vec_pretty(&RootRef(root)).map_err(|e| Error::Write {
        path: None,
        message: e.to_string(),
    })?;
    out.push(b'\n');
    Ok(out)
}
