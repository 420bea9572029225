//! Binary entrypoint for leaderkey.
//!
//! Without a subcommand the engine runs headless: key tokens are read from stdin and
//! overlay frames are printed to stdout. `leaderkey check` validates a config file.
use std::{
    fs,
    path::{Path, PathBuf},
    process,
    sync::Arc,
};

use clap::{Parser, Subcommand};
use config::{ConfigStore, Error as ConfigError, Prefs, resolve_config_path};
use leader_engine::{Engine, SystemLauncher};
use leader_protocol::ipc::ui_channel;
use tracing::{error, info, warn};

/// Stdin key-token driver.
mod driver;
/// Text rendering of UI messages.
mod render;

#[derive(Parser, Debug)]
#[command(name = "leaderkey", about = "Keyboard-driven leader key launcher", version)]
/// Command-line interface for the `leaderkey` binary.
struct Cli {
    /// Optional subcommand.
    #[command(subcommand)]
    command: Option<Command>,

    /// Logging controls
    #[command(flatten)]
    log: logging::LogArgs,

    /// Optional path to the config file (overrides the preferences directory)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Optional path to the preferences file (defaults to ~/.leaderkey/prefs.json)
    #[arg(long, value_name = "PATH")]
    prefs: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
/// Top-level CLI subcommands.
enum Command {
    /// Load and validate the configuration then exit.
    Check {
        /// Path to configuration file to check (defaults to ~/.leaderkey/config.json)
        path: Option<PathBuf>,

        /// Print the re-encoded configuration to stdout
        #[arg(long)]
        dump: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(&cli.log);

    let prefs_path = cli.prefs.clone().unwrap_or_else(config::prefs_path);
    let prefs = load_prefs(&prefs_path);

    if let Some(Command::Check { path, dump }) = &cli.command {
        let explicit = path.as_deref().or(cli.config.as_deref());
        let resolved = resolve_config_path(explicit, &prefs);
        process::exit(check(&resolved, *dump));
    }

    if let Err(e) = run(&cli, prefs, prefs_path).await {
        error!("{}", e);
        process::exit(1);
    }
}

/// Load preferences, reporting a malformed file and falling back to defaults.
fn load_prefs(path: &Path) -> Prefs {
    match Prefs::load(path) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{}", e.pretty());
            warn!(path = %path.display(), "using default preferences");
            Prefs::default()
        }
    }
}

/// Validate the config at `path` without bootstrapping it. Returns the process exit code.
fn check(path: &Path, dump: bool) -> i32 {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            let err = ConfigError::Read {
                path: Some(path.to_path_buf()),
                message: e.to_string(),
            };
            eprintln!("{}", err.pretty());
            return 1;
        }
    };
    let root = match config::decode(&bytes) {
        Ok(root) => root,
        Err(e) => {
            eprintln!("{}", e.with_path(path).pretty());
            return 1;
        }
    };
    if !dump {
        println!("OK");
        return 0;
    }
    match config::encode(&root) {
        Ok(out) => {
            print!("{}", String::from_utf8_lossy(&out));
            0
        }
        Err(e) => {
            eprintln!("{}", e.pretty());
            1
        }
    }
}

/// Run the engine against stdin until EOF, `quit` or Ctrl-C.
async fn run(cli: &Cli, prefs: Prefs, prefs_path: PathBuf) -> leader_engine::Result<()> {
    let config_path = resolve_config_path(cli.config.as_deref(), &prefs);
    info!(config = %config_path.display(), "starting leaderkey");

    let (ui_tx, ui_rx) = ui_channel();
    let mut engine = Engine::new(
        ConfigStore::new(&config_path),
        prefs,
        Arc::new(SystemLauncher),
        ui_tx,
    )
    .with_prefs_path(prefs_path);
    if cli.config.is_some() {
        engine = engine.pin_config_path();
    }
    engine.start()?;

    let renderer = tokio::spawn(render::run(ui_rx));
    driver::spawn(engine.handle());
    engine.run().await?;

    if let Err(e) = renderer.await {
        warn!(error = %e, "renderer task failed");
    }
    Ok(())
}
