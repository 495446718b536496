mod controller;
mod error;
mod format;
mod host;
mod menu;
mod mpris;
mod prefs;
mod selector;
#[cfg(test)]
mod test_utils;
mod ui;

use crate::controller::OverlayController;
use crate::error::AppError;
use crate::menu::{HostMenu, KeyMenu, MenuCommand, StdinMenu};
use crate::mpris::MprisHost;
use crate::mpris::connection::get_dbus_conn;
use crate::prefs::{JsonPreferenceStore, default_prefs_path};
use crate::selector::{DEFAULT_PLAYER_PATTERN, PlayerSelector, TieBreak};
use crate::ui::overlay::{TerminalOverlay, TerminalSession};
use crate::ui::pipe::{PipeFormat, PipeSink};
use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

const MIN_INTERVAL_MS: u64 = 10;

/// Application configuration from CLI
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Always-on-screen playback time of the primary media player")]
pub struct Config {
    /// Print the overlay state to stdout instead of drawing it (reads commands from stdin)
    #[arg(long)]
    pipe: bool,
    /// With --pipe, emit JSON lines instead of plain text
    #[arg(long, requires = "pipe")]
    json: bool,
    /// How often to look for the primary player, in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 50)]
    interval_ms: u64,
    /// Regular expression a player's bus name must match to be followed.
    /// If not given, the TIMEOVERLAY_PLAYER env var is used as a fallback.
    #[arg(long, value_name = "REGEX")]
    player: Option<String>,
    /// Blocklist for MPRIS player service names (comma-separated, case-insensitive)
    #[arg(
        long = "block",
        value_name = "SERVICE1,SERVICE2",
        value_delimiter = ',',
        default_value = "playerctld"
    )]
    block: Vec<String>,
    /// Which player to follow when several match
    #[arg(long, value_enum, default_value_t = TieBreak::First)]
    pick: TieBreak,
    /// Preferences file (defaults to <config dir>/timeoverlay/prefs.json)
    #[arg(long, value_name = "PATH")]
    prefs: Option<PathBuf>,
    /// Enable debug logging to stderr (redirect stderr when using the overlay)
    #[arg(long)]
    pub debug_log: bool,
}

impl Config {
    fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(MIN_INTERVAL_MS))
    }

    fn player_pattern(&self) -> &str {
        self.player.as_deref().unwrap_or(DEFAULT_PLAYER_PATTERN)
    }

    /// Selection rule for the configured options. Without `--player` the
    /// precompiled default pattern is used.
    fn selector(&self) -> Result<PlayerSelector, regex::Error> {
        let selector = match self.player.as_deref() {
            Some(pattern) => PlayerSelector::new(pattern, self.block.clone(), self.pick)?,
            None => PlayerSelector::default()
                .with_block_list(self.block.clone())
                .with_tie_break(self.pick),
        };
        Ok(selector)
    }

    fn prefs_path(&self) -> PathBuf {
        self.prefs.clone().unwrap_or_else(default_prefs_path)
    }
}

fn player_pattern_from_env_if_empty(cli: &mut Config) {
    if cli.player.is_none()
        && let Ok(s) = std::env::var("TIMEOVERLAY_PLAYER")
    {
        let s = s.trim();
        if !s.is_empty() {
            cli.player = Some(s.to_string());
        }
    }
}

fn init_logging(debug_log: bool) {
    let default_directive = if debug_log { "timeoverlay=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn log_session_end<H, S, P>(controller: &OverlayController<H, S, P>) {
    tracing::debug!(
        attached = controller.attachment().tracked().is_some(),
        enabled = controller.preference().enabled,
        "Stopped"
    );
}

async fn run_app(cfg: Config) -> Result<(), AppError> {
    let selector = cfg.selector()?;
    let conn = get_dbus_conn().await?;
    let (event_tx, event_rx) = mpsc::channel(64);
    let (command_tx, command_rx) = mpsc::channel(8);
    let host = MprisHost::new(conn, selector, event_tx);
    let store = JsonPreferenceStore::new(cfg.prefs_path());
    tracing::debug!(path = %store.path().display(), pattern = cfg.player_pattern(), "Starting");

    if cfg.pipe {
        let format = if cfg.json { PipeFormat::Json } else { PipeFormat::Plain };
        let sink = PipeSink::new(std::io::stdout(), format);
        let mut menu = StdinMenu::spawn(command_tx);
        menu.register_command("Quit", MenuCommand::Quit);
        let mut controller = OverlayController::start(host, sink, store, &mut menu).await;
        controller::run(&mut controller, cfg.interval(), event_rx, command_rx).await;
        log_session_end(&controller);
    } else {
        // Restores the terminal when dropped, including on early return.
        let (_session, terminal) = TerminalSession::enter()?;
        let mut menu = KeyMenu::spawn(command_tx);
        menu.register_command("Quit", MenuCommand::Quit);
        let overlay = TerminalOverlay::new(terminal);
        let mut controller = OverlayController::start(host, overlay, store, &mut menu).await;
        controller.sink_mut().set_hint(menu.hint());
        controller::run(&mut controller, cfg.interval(), event_rx, command_rx).await;
        log_session_end(&controller);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut cfg = Config::parse();
    player_pattern_from_env_if_empty(&mut cfg);
    init_logging(cfg.debug_log);

    // Print error if any, for better diagnostics
    if let Err(e) = run_app(cfg).await {
        eprintln!("Error: {}", e);
        return Err(e.into());
    }
    Ok(())
}
