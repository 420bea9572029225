//! Action tree, JSON codec, preferences and the hot-reloading config store.
#![warn(unsafe_op_in_unsafe_fn)]

use std::{
    env,
    path::{Path, PathBuf},
};

mod codec;
pub mod defaults;
mod error;
mod prefs;
mod store;
mod tree;

pub use codec::{decode, decode_str, encode};
pub use error::Error;
pub use leader_protocol::Cursor;
pub use prefs::{Disclosure, DisclosureMode, Policy, Prefs};
pub use store::{ConfigStore, OnChange};
pub use tree::{Action, ActionKind, Group, Node};

/// The app directory (`~/.leaderkey`), home of preferences and the default config location.
pub fn app_dir() -> PathBuf {
    let mut p = PathBuf::from(env::var_os("HOME").unwrap_or_default());
    p.push(defaults::APP_DIR);
    p
}

/// Path of the preferences file (`~/.leaderkey/prefs.json`).
pub fn prefs_path() -> PathBuf {
    app_dir().join(defaults::PREFS_FILE)
}

/// Resolve the effective config path.
///
/// Policy:
/// 1) Use `explicit` when provided.
/// 2) Else `<prefs.config_dir>/config.json` when a directory override is set.
/// 3) Else `~/.leaderkey/config.json`.
///
/// The file need not exist; the store writes the default document on first load.
pub fn resolve_config_path(explicit: Option<&Path>, prefs: &Prefs) -> PathBuf {
    match explicit {
        Some(path) => path.to_path_buf(),
        None => prefs.config_path(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins() {
        let prefs = Prefs {
            config_dir: Some(PathBuf::from("/tmp/lk")),
            ..Prefs::default()
        };
        assert_eq!(
            resolve_config_path(Some(Path::new("/etc/x.json")), &prefs),
            PathBuf::from("/etc/x.json")
        );
        assert_eq!(
            resolve_config_path(None, &prefs),
            PathBuf::from("/tmp/lk/config.json")
        );
        let default = resolve_config_path(None, &Prefs::default());
        assert!(default.ends_with(".leaderkey/config.json"));
    }
}
