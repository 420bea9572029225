//! Leader Engine
//!
//! The engine owns every piece of mutable navigation state and applies all changes from a
//! single event loop:
//! - keystrokes and hotkey toggles from the UI layer
//! - config file change signals from the store's watcher
//! - disclosure timer firings
//!
//! Leaf actions are handed to the [`ActionDispatcher`], which starts them off the loop and
//! never waits for them to finish.
//!
//! Drive it with [`Engine::run`], or step it by hand with [`Engine::step`] and
//! [`Engine::pump`]. External producers feed it through an [`EngineHandle`].
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

mod disclosure;
mod dispatch;
mod error;
mod notification;
pub mod test_support;
mod timer;

use config::{Action, ActionKind, ConfigStore, Error as ConfigError, Group, Prefs};
use keymode::{KeyResponse, State};
use leader_protocol::{Key, MsgToUI, Overlay, ipc::UiTx};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

pub use disclosure::{Channel, Disclosure};
pub use dispatch::{ActionDispatcher, Launcher, SystemLauncher, expand_home};
pub use error::{DispatchError, Error, Result};
pub use notification::NotificationDispatcher;
pub use timer::Timer;

/// Notification title for config load and save failures.
const CONFIG_TITLE: &str = "Config";
/// Notification title for preference persistence failures.
const PREFS_TITLE: &str = "Preferences";

/// Requests accepted by the engine.
#[derive(Debug, Clone)]
pub enum Input {
    /// Global hotkey: open at root, or close when already open.
    Toggle,
    /// A keystroke while the overlay has focus.
    Key(Key),
    /// Reload the config from disk.
    Reload,
    /// Persist an edited tree and reload it.
    Save(Group),
    /// Replace preferences.
    SetPrefs(Prefs),
    /// Reveal the config file in the file manager.
    RevealConfig,
    /// Stop the event loop.
    Shutdown,
}

/// Everything the loop reacts to.
#[derive(Debug)]
enum Event {
    /// Request from the UI layer.
    Input(Input),
    /// A disclosure timer elapsed.
    Fired(Channel, u64),
    /// The watcher saw the config file change.
    ConfigChanged,
}

/// Cloneable sender for feeding inputs to a running engine.
#[derive(Clone, Debug)]
pub struct EngineHandle {
    /// Engine event queue.
    tx: mpsc::UnboundedSender<Event>,
}

impl EngineHandle {
    /// Queue an input. Fails once the engine has been dropped.
    pub fn send(&self, input: Input) -> Result<()> {
        self.tx.send(Event::Input(input)).map_err(|_| Error::Stopped)
    }
}

/// Serialized runtime tying the config store, navigation state, disclosure timers and
/// dispatcher together.
pub struct Engine {
    /// Canonical tree and file watcher.
    store: ConfigStore,
    /// Current preferences.
    prefs: Prefs,
    /// Where preferences are persisted, if anywhere.
    prefs_path: Option<PathBuf>,
    /// When false the config path was given explicitly and ignores `prefs.config_dir`.
    follow_prefs_dir: bool,
    /// Cursor and display.
    state: State,
    /// Option list and cheat sheet visibility.
    disclosure: Disclosure,
    /// Whether the overlay is showing.
    open: bool,
    /// UI messages.
    notifier: NotificationDispatcher,
    /// Leaf action execution.
    dispatcher: ActionDispatcher,
    /// Sender side of the event queue, cloned into timers and the watcher.
    tx: mpsc::UnboundedSender<Event>,
    /// Receiver side of the event queue.
    rx: mpsc::UnboundedReceiver<Event>,
}

impl Engine {
    /// Create an engine. Nothing is loaded until [`Engine::start`].
    ///
    /// Must be called within a tokio runtime, since disclosure timers spawn tasks.
    pub fn new(
        store: ConfigStore,
        prefs: Prefs,
        launcher: Arc<dyn Launcher>,
        ui_tx: UiTx,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let fire_tx = tx.clone();
        let disclosure = Disclosure::new(
            prefs.options.policy(),
            prefs.cheatsheet.policy(),
            move |channel, generation| {
                if fire_tx.send(Event::Fired(channel, generation)).is_err() {
                    trace!("engine gone, timer firing dropped");
                }
            },
        );
        let notifier = NotificationDispatcher::new(ui_tx);
        let dispatcher = ActionDispatcher::new(launcher, notifier.clone());
        Self {
            store,
            prefs,
            prefs_path: None,
            follow_prefs_dir: true,
            state: State::new(),
            disclosure,
            open: false,
            notifier,
            dispatcher,
            tx,
            rx,
        }
    }

    /// Persist preference changes to `path`.
    pub fn with_prefs_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.prefs_path = Some(path.into());
        self
    }

    /// Keep the current config path even when `config_dir` changes in preferences.
    pub fn pin_config_path(mut self) -> Self {
        self.follow_prefs_dir = false;
        self
    }

    /// A handle for queuing inputs from other tasks or threads.
    pub fn handle(&self) -> EngineHandle {
        EngineHandle {
            tx: self.tx.clone(),
        }
    }

    /// Initial load and, if enabled, start watching the config file.
    pub fn start(&mut self) -> Result<()> {
        self.load(true)?;
        self.apply_watch()
    }

    /// Run the event loop until [`Input::Shutdown`] or the UI channel closes.
    pub async fn run(mut self) -> Result<()> {
        loop {
            match self.step().await {
                Ok(true) => {}
                Ok(false) => break,
                Err(Error::ChannelClosed) => {
                    debug!("UI channel closed, stopping engine");
                    break;
                }
                Err(e) => warn!(error = %e, "engine event failed"),
            }
        }
        self.store.unwatch();
        info!("engine stopped");
        Ok(())
    }

    /// Wait for and apply one event. Returns false on shutdown.
    pub async fn step(&mut self) -> Result<bool> {
        match self.rx.recv().await {
            Some(event) => self.apply(event),
            None => Ok(false),
        }
    }

    /// Apply every event already queued without waiting. Returns how many were applied.
    pub fn pump(&mut self) -> Result<usize> {
        let mut n = 0;
        while let Ok(event) = self.rx.try_recv() {
            n += 1;
            if !self.apply(event)? {
                break;
            }
        }
        Ok(n)
    }

    /// Apply an input directly, bypassing the queue.
    pub fn input(&mut self, input: Input) -> Result<()> {
        self.apply(Event::Input(input)).map(|_| ())
    }

    /// Apply one event. Returns false on shutdown.
    fn apply(&mut self, event: Event) -> Result<bool> {
        trace!(?event, "event");
        match event {
            Event::Input(Input::Toggle) => self.toggle()?,
            Event::Input(Input::Key(key)) => self.on_key(&key)?,
            Event::Input(Input::Reload) | Event::ConfigChanged => self.reload()?,
            Event::Input(Input::Save(root)) => self.save(&root)?,
            Event::Input(Input::SetPrefs(prefs)) => self.set_prefs(prefs)?,
            Event::Input(Input::RevealConfig) => self.reveal_config(),
            Event::Input(Input::Shutdown) => return Ok(false),
            Event::Fired(channel, generation) => {
                if self.disclosure.fired(channel, generation) && self.open {
                    debug!(?channel, "disclosed");
                    self.send_update()?;
                }
            }
        }
        Ok(true)
    }

    /// Open when closed, close when open.
    fn toggle(&mut self) -> Result<()> {
        if self.open {
            self.close()
        } else {
            self.open()
        }
    }

    /// Show the overlay at root and arm disclosure timers.
    fn open(&mut self) -> Result<()> {
        self.state.reset();
        self.disclosure.reset();
        self.open = true;
        self.disclosure.on_transition();
        debug!("overlay open");
        self.notifier.send_show(self.overlay())
    }

    /// Hide the overlay, clear navigation and cancel timers.
    fn close(&mut self) -> Result<()> {
        self.state.reset();
        self.disclosure.reset();
        self.open = false;
        debug!("overlay closed");
        self.notifier.send(MsgToUI::Hide)
    }

    /// Route a keystroke through the state machine.
    fn on_key(&mut self, key: &Key) -> Result<()> {
        if !self.open {
            trace!(?key, "key ignored while closed");
            return Ok(());
        }
        match self.state.handle_key(self.store.root(), key) {
            KeyResponse::Ok => Ok(()),
            KeyResponse::Moved => {
                self.disclosure.on_transition();
                self.send_update()
            }
            KeyResponse::Dispatch(action) => {
                self.dispatcher.dispatch(action);
                self.close()
            }
            KeyResponse::Close => self.close(),
            KeyResponse::Miss => self.on_miss(key),
        }
    }

    /// No child matched: toggle trigger-driven panels for the trigger key, else reveal options.
    fn on_miss(&mut self, key: &Key) -> Result<()> {
        if let Key::Char(c) = key
            && *c == self.prefs.trigger_key
        {
            let options = self.disclosure.trigger(Channel::Options);
            let cheatsheet = self.disclosure.trigger(Channel::Cheatsheet);
            if options || cheatsheet {
                debug!(options, cheatsheet, "trigger key toggled disclosure");
                return self.send_update();
            }
        }
        self.disclosure.force(Channel::Options);
        self.notifier.send(MsgToUI::Miss)?;
        self.send_update()
    }

    /// Re-read the config after a change, reporting failures and resetting navigation.
    fn reload(&mut self) -> Result<()> {
        self.load(false)
    }

    /// Read the config, writing the default document first when `bootstrap` is set.
    fn load(&mut self, bootstrap: bool) -> Result<()> {
        let loaded = if bootstrap {
            self.store.load()
        } else {
            self.store.reload()
        };
        let ok = match loaded {
            Ok(_) => true,
            Err(e) => {
                self.report_config_error(&e)?;
                false
            }
        };
        self.after_reload(ok)
    }

    /// Persist `root` through the store.
    fn save(&mut self, root: &Group) -> Result<()> {
        match self.store.save(root) {
            Ok(_) => self.after_reload(true),
            Err(e @ ConfigError::Write { .. }) => self.report_config_error(&e),
            // Written and reloaded; only watching could not resume.
            Err(e @ ConfigError::Watch { .. }) => {
                self.report_config_error(&e)?;
                self.after_reload(true)
            }
            Err(e) => {
                self.report_config_error(&e)?;
                self.after_reload(false)
            }
        }
    }

    /// Any outstanding cursor refers to the old tree: treat a reload as Escape.
    fn after_reload(&mut self, ok: bool) -> Result<()> {
        if self.open {
            self.close()?;
        } else {
            self.state.reset();
            self.disclosure.reset();
        }
        info!(ok, "config reloaded");
        self.notifier.send(MsgToUI::Reloaded { ok })
    }

    /// Surface a config error as a blocking notification.
    fn report_config_error(&self, e: &ConfigError) -> Result<()> {
        warn!(error = %e, "config error");
        self.notifier.send_error(CONFIG_TITLE, e.pretty())
    }

    /// Start or stop the watcher to match preferences.
    fn apply_watch(&mut self) -> Result<()> {
        if !self.prefs.watch_config_file {
            if self.store.is_watching() {
                debug!("config watch disabled");
                self.store.unwatch();
            }
            return Ok(());
        }
        if self.store.is_watching() {
            return Ok(());
        }
        let tx = self.tx.clone();
        let watched = self.store.watch(move || {
            if tx.send(Event::ConfigChanged).is_err() {
                trace!("engine gone, config change dropped");
            }
        });
        match watched {
            Ok(()) => {
                info!(path = %self.store.path().display(), "watching config");
                Ok(())
            }
            Err(e) => self.report_config_error(&e),
        }
    }

    /// Swap preferences, following config directory and watch changes.
    fn set_prefs(&mut self, prefs: Prefs) -> Result<()> {
        let moved = self.follow_prefs_dir && prefs.config_dir != self.prefs.config_dir;
        self.prefs = prefs;
        self.disclosure
            .set_policies(self.prefs.options.policy(), self.prefs.cheatsheet.policy());
        if moved {
            let path = self.prefs.config_path();
            info!(path = %path.display(), "config location changed");
            if let Err(e) = self.store.set_path(path) {
                self.report_config_error(&e)?;
            }
            self.load(true)?;
        } else if self.open {
            self.disclosure.on_transition();
            self.send_update()?;
        }
        self.apply_watch()?;
        if let Some(path) = &self.prefs_path
            && let Err(e) = self.prefs.save(path)
        {
            warn!(error = %e, "failed to persist preferences");
            self.notifier.send_error(PREFS_TITLE, e.pretty())?;
        }
        Ok(())
    }

    /// Reveal the config file through the dispatcher.
    fn reveal_config(&self) {
        let value = self.store.path().display().to_string();
        self.dispatcher.dispatch(Action::new("", ActionKind::Folder, value));
    }

    /// Send the current frame.
    fn send_update(&self) -> Result<()> {
        self.notifier.send_update(self.overlay())
    }

    /// Build the view model for the current state.
    pub fn overlay(&self) -> Overlay {
        let root = self.store.root();
        Overlay {
            display: self.state.display().map(str::to_string),
            title: self
                .state
                .current(root)
                .and_then(Group::title)
                .map(str::to_string),
            entries: self.state.active(root).entries(),
            options_visible: self.disclosure.visible(Channel::Options),
            cheatsheet_visible: self.disclosure.visible(Channel::Cheatsheet),
        }
    }

    /// Whether the overlay is showing.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Current navigation depth (0 = root).
    pub fn depth(&self) -> usize {
        self.state.depth()
    }

    /// Navigation state.
    pub fn state(&self) -> &State {
        &self.state
    }

    /// The current tree.
    pub fn root(&self) -> &Group {
        self.store.root()
    }

    /// Current preferences.
    pub fn prefs(&self) -> &Prefs {
        &self.prefs
    }

    /// Path of the config file in use.
    pub fn config_path(&self) -> &Path {
        self.store.path()
    }

    /// Whether the config watcher is active.
    pub fn is_watching(&self) -> bool {
        self.store.is_watching()
    }

    /// Visibility of a disclosure channel.
    pub fn visible(&self, channel: Channel) -> bool {
        self.disclosure.visible(channel)
    }
}
