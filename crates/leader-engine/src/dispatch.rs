//! Performing a leaf action's external effect.
//!
//! Dispatch is fire-and-forget: [`ActionDispatcher::dispatch`] hands the action to the
//! blocking pool and returns immediately, and launchers only start helpers. Start failures
//! are logged and surfaced as a warning notification; they never reopen the overlay.

use std::{
    env,
    path::{Path, PathBuf},
    process::{Child, Command, Output, Stdio},
    sync::Arc,
    thread,
};

use config::{Action, ActionKind};
use leader_protocol::NotifyKind;
use tracing::{debug, info, warn};
use url::Url;

use crate::{DispatchError, notification::NotificationDispatcher};

/// Notification title for dispatch failures.
const FAILURE_TITLE: &str = "Action failed";

/// Platform operations used to perform actions.
///
/// Implementations start the effect and return without waiting for it to finish. The
/// dispatcher calls them off the engine's context.
pub trait Launcher: Send + Sync {
    /// Open or activate the application bundle or executable at `path`.
    fn open_application(&self, path: &Path) -> Result<(), DispatchError>;

    /// Open `url` with its default handler without activating it.
    fn open_url(&self, url: &Url) -> Result<(), DispatchError>;

    /// Run `command` through the user's login shell.
    fn run_command(&self, command: &str) -> Result<(), DispatchError>;

    /// Reveal `path` in the system file manager.
    fn reveal(&self, path: &Path) -> Result<(), DispatchError>;
}

/// Expand a leading `~` to `$HOME`.
pub fn expand_home(value: &str) -> PathBuf {
    let home = || env::var_os("HOME").map(PathBuf::from);
    if value == "~" {
        return home().unwrap_or_else(|| PathBuf::from(value));
    }
    if let Some(rest) = value.strip_prefix("~/")
        && let Some(home) = home()
    {
        return home.join(rest);
    }
    PathBuf::from(value)
}

/// Performs actions and reports their failures.
#[derive(Clone)]
pub struct ActionDispatcher {
    /// Platform operations.
    launcher: Arc<dyn Launcher>,
    /// Failure reporting.
    notifier: NotificationDispatcher,
}

impl ActionDispatcher {
    /// Create a dispatcher over `launcher`, reporting failures through `notifier`.
    pub fn new(launcher: Arc<dyn Launcher>, notifier: NotificationDispatcher) -> Self {
        Self { launcher, notifier }
    }

    /// Perform `action` on the current thread and return its outcome.
    pub fn execute(&self, action: &Action) -> Result<(), DispatchError> {
        info!(key = %action.key, kind = action.kind.as_str(), value = %action.value, "dispatch");
        match &action.kind {
            ActionKind::Application => self.launcher.open_application(&expand_home(&action.value)),
            ActionKind::Url => {
                let url = Url::parse(&action.value).map_err(|e| DispatchError::InvalidUrl {
                    value: action.value.clone(),
                    message: e.to_string(),
                })?;
                self.launcher.open_url(&url)
            }
            ActionKind::Command => self.launcher.run_command(&action.value),
            ActionKind::Folder => self.launcher.reveal(&expand_home(&action.value)),
            ActionKind::Unknown(kind) => Err(DispatchError::Unsupported { kind: kind.clone() }),
        }
    }

    /// Perform `action` in the background. Must be called within a tokio runtime.
    pub fn dispatch(&self, action: Action) {
        let this = self.clone();
        tokio::task::spawn_blocking(move || {
            if let Err(e) = this.execute(&action) {
                warn!(key = %action.key, error = %e, "dispatch failed");
                let title = FAILURE_TITLE.to_string();
                let sent = this
                    .notifier
                    .send_notification(NotifyKind::Warn, title, e.to_string());
                if let Err(err) = sent {
                    debug!(error = %err, "failed to deliver dispatch failure");
                }
            }
        });
    }
}

/// Launcher backed by the platform's opener (`open` on macOS, `xdg-open` elsewhere).
///
/// Helpers are started and never awaited. Only a failure to start is returned; exit status
/// and output are logged once the helper finishes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLauncher;

impl SystemLauncher {
    /// The user's shell, falling back to zsh.
    fn shell() -> String {
        env::var("SHELL").unwrap_or_else(|_| "/bin/zsh".to_string())
    }

    /// Start `cmd` and hand the child to a reaper. `capture` keeps stdout and stderr for
    /// the exit log; otherwise they are discarded.
    fn spawn(
        kind: &'static str,
        value: &str,
        cmd: &mut Command,
        capture: bool,
    ) -> Result<(), DispatchError> {
        let sink = || if capture { Stdio::piped() } else { Stdio::null() };
        let child = cmd
            .stdin(Stdio::null())
            .stdout(sink())
            .stderr(sink())
            .spawn()
            .map_err(|e| DispatchError::Spawn {
                kind: kind.to_string(),
                value: value.to_string(),
                message: e.to_string(),
            })?;
        debug!(kind, value, pid = child.id(), "helper spawned");
        reap(kind, value.to_string(), child);
        Ok(())
    }

    /// Command that opens its argument with the default handler.
    fn opener() -> Command {
        if cfg!(target_os = "macos") {
            Command::new("open")
        } else {
            Command::new("xdg-open")
        }
    }
}

impl Launcher for SystemLauncher {
    fn open_application(&self, path: &Path) -> Result<(), DispatchError> {
        let value = path.display().to_string();
        if cfg!(target_os = "macos") {
            Self::spawn("application", &value, Self::opener().arg(path), false)
        } else {
            Self::spawn("application", &value, &mut Command::new(path), false)
        }
    }

    fn open_url(&self, url: &Url) -> Result<(), DispatchError> {
        let mut cmd = Self::opener();
        if cfg!(target_os = "macos") {
            cmd.arg("-g");
        }
        Self::spawn("url", url.as_str(), cmd.arg(url.as_str()), false)
    }

    fn run_command(&self, command: &str) -> Result<(), DispatchError> {
        let shell = Self::shell();
        Self::spawn(
            "command",
            command,
            Command::new(shell).arg("-lc").arg(command),
            true,
        )
    }

    fn reveal(&self, path: &Path) -> Result<(), DispatchError> {
        let value = path.display().to_string();
        if cfg!(target_os = "macos") {
            Self::spawn("folder", &value, Self::opener().arg("-R").arg(path), false)
        } else {
            let target = if path.is_dir() {
                path
            } else {
                path.parent().unwrap_or(path)
            };
            Self::spawn("folder", &value, Self::opener().arg(target), false)
        }
    }
}

/// Wait for `child` on a detached thread so it is reaped without holding up shutdown.
fn reap(kind: &'static str, value: String, child: Child) {
    let spawned = thread::Builder::new()
        .name("leaderkey-reaper".to_string())
        .spawn(move || match child.wait_with_output() {
            Ok(output) if output.status.success() => {
                debug!(kind, value = %value, "helper exited cleanly");
            }
            Ok(output) => warn!(
                kind,
                value = %value,
                status = %output.status,
                output = %combined_output(&output),
                "helper failed"
            ),
            Err(e) => warn!(kind, value = %value, error = %e, "failed to wait for helper"),
        });
    if let Err(e) = spawned {
        warn!(error = %e, "failed to start reaper thread");
    }
}

/// Stdout and stderr joined, with leading and trailing blank lines removed.
fn combined_output(output: &Output) -> String {
    let mut combined = String::new();
    let out = String::from_utf8_lossy(&output.stdout);
    let err = String::from_utf8_lossy(&output.stderr);
    if !out.is_empty() {
        combined.push_str(&out);
    }
    if !err.is_empty() {
        if !combined.is_empty() && !combined.ends_with('\n') {
            combined.push('\n');
        }
        combined.push_str(&err);
    }
    let lines: Vec<&str> = combined.lines().collect();
    let first = lines.iter().position(|l| !l.trim().is_empty());
    let last = lines.iter().rposition(|l| !l.trim().is_empty());
    match (first, last) {
        (Some(s), Some(e)) if s <= e => lines[s..=e].join("\n"),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use leader_protocol::{
        MsgToUI,
        ipc::{UiRx, ui_channel},
    };
    use tokio::time::timeout;

    use super::*;
    use crate::test_support::{Launched, RecordingLauncher};

    fn dispatcher() -> (ActionDispatcher, Arc<RecordingLauncher>, UiRx) {
        let (tx, rx) = ui_channel();
        let launcher = Arc::new(RecordingLauncher::default());
        let d = ActionDispatcher::new(launcher.clone(), NotificationDispatcher::new(tx));
        (d, launcher, rx)
    }

    #[test]
    fn routes_each_kind() {
        let (d, launcher, _rx) = dispatcher();
        d.execute(&Action::new("t", ActionKind::Application, "/Applications/Terminal.app"))
            .unwrap();
        d.execute(&Action::new("u", ActionKind::Url, "raycast://confetti"))
            .unwrap();
        d.execute(&Action::new("c", ActionKind::Command, "echo hi"))
            .unwrap();
        d.execute(&Action::new("f", ActionKind::Folder, "/tmp"))
            .unwrap();
        assert_eq!(
            launcher.launched(),
            vec![
                Launched::Application(PathBuf::from("/Applications/Terminal.app")),
                Launched::Url("raycast://confetti".to_string()),
                Launched::Command("echo hi".to_string()),
                Launched::Reveal(PathBuf::from("/tmp")),
            ]
        );
    }

    #[test]
    fn invalid_url_is_rejected() {
        let (d, launcher, _rx) = dispatcher();
        let err = d
            .execute(&Action::new("u", ActionKind::Url, "not a url"))
            .unwrap_err();
        assert!(matches!(err, DispatchError::InvalidUrl { .. }));
        assert!(launcher.launched().is_empty());
    }

    #[test]
    fn unknown_kind_is_unsupported() {
        let (d, launcher, _rx) = dispatcher();
        let err = d
            .execute(&Action::new("x", ActionKind::Unknown("shortcut".into()), "v"))
            .unwrap_err();
        assert_eq!(
            err,
            DispatchError::Unsupported {
                kind: "shortcut".into()
            }
        );
        assert!(launcher.launched().is_empty());
    }

    #[tokio::test]
    async fn background_failure_notifies() {
        let (d, launcher, mut rx) = dispatcher();
        launcher.fail_next();
        d.dispatch(Action::new("c", ActionKind::Command, "false"));
        let msg = timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        match msg {
            MsgToUI::Notify { kind, title, .. } => {
                assert_eq!(kind, NotifyKind::Warn);
                assert_eq!(title, FAILURE_TITLE);
            }
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn home_is_expanded() {
        let Some(home) = env::var_os("HOME") else {
            return;
        };
        assert_eq!(expand_home("~/bin"), PathBuf::from(home).join("bin"));
        assert_eq!(expand_home("/abs"), PathBuf::from("/abs"));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn application_launch_returns_before_exit() {
        use std::{fs, os::unix::fs::PermissionsExt, time::Instant};

        let dir = tempfile::tempdir().unwrap();
        let app = dir.path().join("slow-app");
        fs::write(&app, "#!/bin/sh\nsleep 3\nexit 2\n").unwrap();
        fs::set_permissions(&app, fs::Permissions::from_mode(0o755)).unwrap();

        let started = Instant::now();
        SystemLauncher.open_application(&app).unwrap();
        assert!(started.elapsed() < Duration::from_secs(2));

        let err = SystemLauncher
            .open_application(&dir.path().join("missing-app"))
            .unwrap_err();
        assert!(matches!(err, DispatchError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn output_is_trimmed() {
        use std::{os::unix::process::ExitStatusExt, process::ExitStatus};
        let output = Output {
            status: ExitStatus::from_raw(256),
            stdout: b"\n\nout\n".to_vec(),
            stderr: b"err\n\n".to_vec(),
        };
        assert_eq!(combined_output(&output), "out\nerr");
    }
}
