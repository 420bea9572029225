//! Built-in defaults: the bootstrap document and preference values.

/// Written to disk on first run when no config file exists.
pub const DEFAULT_CONFIG: &str = r#"{
  "type": "group",
  "actions": [
    { "key": "t", "type": "application", "value": "/System/Applications/Utilities/Terminal.app", "friendly": "Terminal" },
    {
      "key": "o",
      "type": "group",
      "friendly": "Operating System",
      "actions": [
        { "key": "s", "type": "application", "value": "/Applications/Safari.app", "friendly": "Safari" },
        { "key": "e", "type": "application", "value": "/Applications/Mail.app", "friendly": "Mail" },
        { "key": "i", "type": "application", "value": "/System/Applications/Music.app", "friendly": "Music" },
        { "key": "m", "type": "application", "value": "/Applications/Messages.app", "friendly": "Apple Messages" }
      ]
    },
    {
      "key": "r",
      "type": "group",
      "friendly": "Raycast",
      "actions": [
        { "key": "e", "type": "url", "value": "raycast://extensions/raycast/emoji-symbols/search-emoji-symbols", "friendly": "Emoji" },
        { "key": "p", "type": "url", "value": "raycast://confetti", "friendly": "Confetti" },
        { "key": "c", "type": "url", "value": "raycast://extensions/raycast/system/open-camera", "friendly": "Camera" }
      ]
    }
  ]
}
"#;

/// Config file name inside the config directory.
pub const CONFIG_FILE: &str = "config.json";
/// Preferences file name inside the app directory.
pub const PREFS_FILE: &str = "prefs.json";
/// App directory under `$HOME`.
pub const APP_DIR: &str = ".leaderkey";

/// Seconds of idle time before the option list appears.
pub const OPTIONS_DELAY: f64 = 1.5;
/// Seconds of idle time before the cheat sheet appears.
pub const CHEATSHEET_DELAY: f64 = 1.0;
/// Key that reveals disclosures configured as `on_trigger`.
pub const TRIGGER_KEY: char = '?';

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Node, decode_str};

    #[test]
    fn default_document_decodes() {
        let g = decode_str(DEFAULT_CONFIG).unwrap();
        let keys: Vec<_> = g.actions.iter().filter_map(Node::key).collect();
        assert_eq!(keys, ["t", "o", "r"]);
        match &g.actions[1] {
            Node::Group(o) => {
                assert_eq!(o.title(), Some("Operating System"));
                assert_eq!(o.actions.len(), 4);
            }
            Node::Action(_) => panic!("expected group"),
        }
    }
}
