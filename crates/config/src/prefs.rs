//! User preferences: watching, config location, and disclosure policies.

use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, defaults};

/// How a disclosure (option list or cheat sheet) becomes visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisclosureMode {
    /// Never shown automatically.
    Never,
    /// Shown as soon as the overlay opens and kept shown.
    Always,
    /// Shown when the trigger key is pressed.
    OnTrigger,
    /// Shown after a period of idle time following the last keystroke.
    AfterDelay,
}

/// Resolved visibility policy handed to the disclosure timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Hidden.
    Never,
    /// Shown.
    Always,
    /// Toggled by the trigger key.
    OnTrigger,
    /// Shown once this much idle time has passed.
    AfterDelay(Duration),
}

impl Policy {
    /// Visibility while idle: before any timer fires and after the overlay closes.
    pub fn idle_visible(self) -> bool {
        matches!(self, Self::Always)
    }
}

/// One disclosure channel's settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Disclosure {
    /// Visibility mode.
    pub mode: DisclosureMode,
    /// Delay in seconds, used by `after_delay`.
    pub delay: f64,
}

impl Disclosure {
    /// Resolve into a timer policy. Negative or non-finite delays become zero.
    pub fn policy(&self) -> Policy {
        match self.mode {
            DisclosureMode::Never => Policy::Never,
            DisclosureMode::Always => Policy::Always,
            DisclosureMode::OnTrigger => Policy::OnTrigger,
            DisclosureMode::AfterDelay => Policy::AfterDelay(
                Duration::try_from_secs_f64(self.delay).unwrap_or(Duration::ZERO),
            ),
        }
    }
}

/// Named preferences read and written by the settings surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Prefs {
    /// Reload automatically when the config file changes on disk.
    pub watch_config_file: bool,
    /// Directory holding `config.json`; `None` uses the app directory.
    pub config_dir: Option<PathBuf>,
    /// Whether the menu-bar icon is shown.
    pub show_menubar_icon: bool,
    /// Option list disclosure.
    pub options: Disclosure,
    /// Cheat sheet disclosure.
    pub cheatsheet: Disclosure,
    /// Key that toggles `on_trigger` disclosures.
    pub trigger_key: char,
}

impl Default for Prefs {
    fn default() -> Self {
        Self {
            watch_config_file: false,
            config_dir: None,
            show_menubar_icon: true,
            options: Disclosure {
                mode: DisclosureMode::AfterDelay,
                delay: defaults::OPTIONS_DELAY,
            },
            cheatsheet: Disclosure {
                mode: DisclosureMode::OnTrigger,
                delay: defaults::CHEATSHEET_DELAY,
            },
            trigger_key: defaults::TRIGGER_KEY,
        }
    }
}

impl Prefs {
    /// Load preferences, returning defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let text = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no prefs file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(Error::Read {
                    path: Some(path.to_path_buf()),
                    message: e.to_string(),
                });
            }
        };
        serde_json::from_str(&text).map_err(|e| Error::decode(&e, &text).with_path(path))
    }

    /// Persist preferences as pretty JSON, creating the parent directory if needed.
    pub fn save(&self, path: &Path) -> Result<(), Error> {
        let write_err = |e: &dyn ToString| Error::Write {
            path: Some(path.to_path_buf()),
            message: e.to_string(),
        };
        let mut out = serde_json::to_vec_pretty(self).map_err(|e| write_err(&e))?;
        out.push(b'\n');
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| write_err(&e))?;
        }
        fs::write(path, out).map_err(|e| write_err(&e))
    }

    /// Directory that holds the config file under these preferences.
    pub fn config_dir(&self) -> PathBuf {
        self.config_dir.clone().unwrap_or_else(crate::app_dir)
    }

    /// Full path to the config file under these preferences.
    pub fn config_path(&self) -> PathBuf {
        self.config_dir().join(defaults::CONFIG_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let p = Prefs::load(&dir.path().join("prefs.json")).unwrap();
        assert_eq!(p, Prefs::default());
        assert!(!p.watch_config_file);
        assert_eq!(p.options.policy(), Policy::AfterDelay(Duration::from_millis(1500)));
        assert_eq!(p.cheatsheet.policy(), Policy::OnTrigger);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("prefs.json");
        let prefs = Prefs {
            watch_config_file: true,
            config_dir: Some(dir.path().to_path_buf()),
            cheatsheet: Disclosure {
                mode: DisclosureMode::Always,
                delay: 0.0,
            },
            ..Prefs::default()
        };
        prefs.save(&path).unwrap();
        assert_eq!(Prefs::load(&path).unwrap(), prefs);
        assert_eq!(prefs.config_path(), dir.path().join("config.json"));
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        fs::write(&path, r#"{"options": {"mode": "never", "delay": 2.0}}"#).unwrap();
        let p = Prefs::load(&path).unwrap();
        assert_eq!(p.options.policy(), Policy::Never);
        assert!(p.show_menubar_icon);
        assert_eq!(p.trigger_key, '?');
    }

    #[test]
    fn unknown_pref_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        fs::write(&path, r#"{"wacth_config_file": true}"#).unwrap();
        let err = Prefs::load(&path).unwrap_err();
        assert!(err.is_decode());
        assert_eq!(err.path(), Some(path.as_path()));
    }

    #[test]
    fn bad_delay_is_zero() {
        let d = Disclosure {
            mode: DisclosureMode::AfterDelay,
            delay: -3.0,
        };
        assert_eq!(d.policy(), Policy::AfterDelay(Duration::ZERO));
        assert!(Policy::Always.idle_visible());
        assert!(!Policy::OnTrigger.idle_visible());
    }
}
