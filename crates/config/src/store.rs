//! On-disk config store with bootstrap, hot reload and save.
//!
//! The store owns the canonical tree. The watcher callback runs on the
//! notification thread and must only signal; the owner calls [`ConfigStore::reload`]
//! from its own context in response.

use std::{
    ffi::OsStr,
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, trace, warn};

use crate::{Error, Group, decode, defaults::DEFAULT_CONFIG, encode};

/// Callback fired when the watched file changes.
pub type OnChange = Arc<dyn Fn() + Send + Sync>;

/// Single source of truth for the config file.
pub struct ConfigStore {
    /// Path of the config document.
    path: PathBuf,
    /// Last successfully loaded tree, or an empty root after a failure.
    root: Group,
    /// Registered change callback; kept while paused so watching can resume.
    on_change: Option<OnChange>,
    /// Live watcher, if watching is active.
    watcher: Option<RecommendedWatcher>,
}

impl ConfigStore {
    /// Create a store for `path` holding an empty tree. Nothing is read until [`Self::load`].
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            root: Group::empty(),
            on_change: None,
            watcher: None,
        }
    }

    /// Path of the config document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The current tree.
    pub fn root(&self) -> &Group {
        &self.root
    }

    /// True while a watcher is active.
    pub fn is_watching(&self) -> bool {
        self.watcher.is_some()
    }

    /// Load the config, writing the built-in default document first if the file is absent.
    ///
    /// On any error the tree falls back to an empty root so callers always hold a valid tree;
    /// the error is returned for the caller to surface.
    pub fn load(&mut self) -> Result<&Group, Error> {
        let read = self.read(true);
        self.apply(read)
    }

    /// Re-read the config after a change. A missing file is an error here, never bootstrapped,
    /// so a file briefly absent during an editor's replace is not overwritten.
    pub fn reload(&mut self) -> Result<&Group, Error> {
        let read = self.read(false);
        self.apply(read)
    }

    /// Install a freshly read tree, or the empty root on failure.
    fn apply(&mut self, read: Result<Group, Error>) -> Result<&Group, Error> {
        match read {
            Ok(root) => {
                info!(path = %self.path.display(), children = root.actions.len(), "config loaded");
                self.root = root;
                Ok(&self.root)
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "config load failed, using empty tree");
                self.root = Group::empty();
                Err(e)
            }
        }
    }

    /// Bootstrap if allowed and needed, then read and decode.
    fn read(&self, bootstrap: bool) -> Result<Group, Error> {
        if bootstrap && !self.path.exists() {
            self.bootstrap()?;
        }
        let bytes = fs::read(&self.path).map_err(|e| self.read_err(&e))?;
        decode(&bytes).map_err(|e| e.with_path(&self.path))
    }

    /// Write the default document.
    fn bootstrap(&self) -> Result<(), Error> {
        info!(path = %self.path.display(), "writing default config");
        self.write(DEFAULT_CONFIG.as_bytes())
    }

    /// Write raw bytes, creating the parent directory if needed.
    fn write(&self, bytes: &[u8]) -> Result<(), Error> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.write_err(&e))?;
        }
        fs::write(&self.path, bytes).map_err(|e| self.write_err(&e))
    }

    /// Serialize `root` and overwrite the file, then reload.
    ///
    /// Watching is paused around the write so the store does not react to its own change.
    /// A failed write leaves the in-memory tree untouched.
    pub fn save(&mut self, root: &Group) -> Result<&Group, Error> {
        let bytes = encode(root).map_err(|e| e.with_path(&self.path))?;
        let resume = self.pause();
        let written = self.write(&bytes);
        let resumed = if resume { self.resume() } else { Ok(()) };
        self.finish_save(written, resumed)
    }

    /// Reload after a successful write, then surface any failure to resume watching.
    fn finish_save(
        &mut self,
        written: Result<(), Error>,
        resumed: Result<(), Error>,
    ) -> Result<&Group, Error> {
        written?;
        debug!(path = %self.path.display(), "config saved");
        self.reload()?;
        resumed?;
        Ok(&self.root)
    }

    /// Point the store at a different file. Watching follows the new path.
    pub fn set_path(&mut self, path: impl Into<PathBuf>) -> Result<(), Error> {
        let resume = self.pause();
        self.path = path.into();
        if resume {
            self.resume()?;
        }
        Ok(())
    }

    /// Begin watching the config file. `on_change` fires once per relevant filesystem event.
    pub fn watch(&mut self, on_change: impl Fn() + Send + Sync + 'static) -> Result<(), Error> {
        self.on_change = Some(Arc::new(on_change));
        self.resume()
    }

    /// Stop watching and forget the callback.
    pub fn unwatch(&mut self) {
        self.watcher = None;
        self.on_change = None;
    }

    /// Drop the live watcher, keeping the callback. Returns whether one was active.
    fn pause(&mut self) -> bool {
        let active = self.watcher.take().is_some();
        if active {
            trace!("config watch paused");
        }
        active
    }

    /// (Re)start the watcher with the registered callback.
    ///
    /// The parent directory is watched rather than the file itself so editors that replace
    /// the file on save keep triggering events.
    fn resume(&mut self) -> Result<(), Error> {
        let Some(on_change) = self.on_change.clone() else {
            return Ok(());
        };
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .to_path_buf();
        let name = self.path.file_name().map(|n| n.to_os_string());
        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| match res {
                Ok(event) if is_relevant(&event, name.as_deref()) => {
                    trace!(kind = ?event.kind, "config file event");
                    on_change();
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "config watcher error"),
            },
            notify::Config::default(),
        )
        .map_err(|e| self.watch_err(&e))?;
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|e| self.watch_err(&e))?;
        debug!(path = %self.path.display(), "watching config");
        self.watcher = Some(watcher);
        Ok(())
    }

    /// Build a read error for this store's path.
    fn read_err(&self, e: &io::Error) -> Error {
        Error::Read {
            path: Some(self.path.clone()),
            message: e.to_string(),
        }
    }

    /// Build a write error for this store's path.
    fn write_err(&self, e: &io::Error) -> Error {
        Error::Write {
            path: Some(self.path.clone()),
            message: e.to_string(),
        }
    }

    /// Build a watch error for this store's path.
    fn watch_err(&self, e: &notify::Error) -> Error {
        Error::Watch {
            path: Some(self.path.clone()),
            message: e.to_string(),
        }
    }
}

/// Content changes to the watched file name; access events and siblings are ignored.
fn is_relevant(event: &Event, name: Option<&OsStr>) -> bool {
    let kind_ok = matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    );
    kind_ok
        && event
            .paths
            .iter()
            .any(|p| name.is_some_and(|n| p.file_name() == Some(n)))
}
