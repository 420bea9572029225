//! Test support utilities for leader-engine unit and integration tests.
//! These helpers are public so the integration suite can share them.

use std::{
    path::{Path, PathBuf},
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use leader_protocol::{MsgToUI, NotifyKind, ipc::UiRx};
use parking_lot::Mutex;
use tokio::time::{Instant, sleep, timeout};
use url::Url;

use crate::{DispatchError, Launcher};

/// One recorded launcher call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Launched {
    /// `open_application`
    Application(PathBuf),
    /// `open_url`
    Url(String),
    /// `run_command`
    Command(String),
    /// `reveal`
    Reveal(PathBuf),
}

/// Launcher that records calls instead of touching the system.
#[derive(Debug, Default)]
pub struct RecordingLauncher {
    /// Calls in order.
    calls: Mutex<Vec<Launched>>,
    /// Fail the next call after recording it.
    fail: AtomicBool,
}

impl RecordingLauncher {
    /// Snapshot of recorded calls.
    pub fn launched(&self) -> Vec<Launched> {
        self.calls.lock().clone()
    }

    /// Make the next call return a failure.
    pub fn fail_next(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    /// Record `call` and return the configured outcome.
    fn record(&self, call: Launched) -> Result<(), DispatchError> {
        let value = format!("{call:?}");
        self.calls.lock().push(call);
        if self.fail.swap(false, Ordering::SeqCst) {
            return Err(DispatchError::Spawn {
                kind: "test".into(),
                value,
                message: "No such file or directory".into(),
            });
        }
        Ok(())
    }

    /// Wait until at least `n` calls were recorded, up to `timeout_ms` of wall time.
    pub async fn wait_for(&self, n: usize, timeout_ms: u64) -> bool {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            if self.calls.lock().len() >= n {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            sleep(Duration::from_millis(2)).await;
        }
    }
}

impl Launcher for RecordingLauncher {
    fn open_application(&self, path: &Path) -> Result<(), DispatchError> {
        self.record(Launched::Application(path.to_path_buf()))
    }

    fn open_url(&self, url: &Url) -> Result<(), DispatchError> {
        self.record(Launched::Url(url.as_str().to_string()))
    }

    fn run_command(&self, command: &str) -> Result<(), DispatchError> {
        self.record(Launched::Command(command.to_string()))
    }

    fn reveal(&self, path: &Path) -> Result<(), DispatchError> {
        self.record(Launched::Reveal(path.to_path_buf()))
    }
}

/// Drain every UI message already queued.
pub fn drain(rx: &mut UiRx) -> Vec<MsgToUI> {
    let mut out = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        out.push(msg);
    }
    out
}

/// Receive a notification of `kind` with a specific `title` within `timeout_ms`.
pub async fn recv_notify_with_title(
    rx: &mut UiRx,
    want_kind: NotifyKind,
    want_title: &str,
    timeout_ms: u64,
) -> bool {
    timeout(Duration::from_millis(timeout_ms), async {
        while let Some(msg) = rx.recv().await {
            if let MsgToUI::Notify { kind, title, .. } = msg
                && kind == want_kind
                && title == want_title
            {
                return true;
            }
        }
        false
    })
    .await
    .unwrap_or(false)
}
