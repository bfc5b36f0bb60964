mod action;
mod app;
mod app_state;
mod component;
mod components;
mod focus;
mod log_capture;
mod theme;
mod widgets;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use ytradio_core::config::Config;
use ytradio_core::{
    platform, PlaybackLauncher, Player, ProcessRegistry, RadioOrchestrator, StateStore,
    YtMusicClient,
};

#[derive(Parser, Debug)]
#[command(name = "ytradio", about = "YouTube Music radio in the terminal")]
struct Cli {
    /// Resume the remembered song or radio session right away
    #[arg(long)]
    resume: bool,

    /// Config file to use instead of ~/.config/ytradio/config.toml
    #[arg(long, env = "YTRADIO_CONFIG")]
    config: Option<PathBuf>,

    /// Start even if the player binary cannot be run
    #[arg(long)]
    skip_player_check: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ── Load config ──────────────────────────────────────────────────────────
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    // ── Logging: file + log panel capture ───────────────────────────────────
    let log_path = config.paths.log_file.clone();
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("cannot open log file {}", log_path.display()))?;

    let (log_tx, log_rx) = broadcast::channel::<String>(256);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(log_file)
                .with_ansi(false),
        )
        .with(log_capture::LogCapture::new(log_tx))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(
                    "info,ytradio_core=debug,ytradio=debug,hyper_util=warn,reqwest=warn",
                )
            }),
        )
        .init();

    // Print log path to stderr so the operator can tail it immediately.
    eprintln!("ytradio log: {}", log_path.display());
    info!("ytradio starting, config {:?}", cli.config.clone().unwrap_or_else(Config::config_path));

    if !cli.skip_player_check {
        check_player(&config.player.binary)?;
    }

    // ── Build the pieces ─────────────────────────────────────────────────────
    let catalog = Arc::new(YtMusicClient::new(&config.catalog)?);
    let (launcher, events_rx) = PlaybackLauncher::new(
        config.player.clone(),
        Some(config.paths.player_log.clone()),
        ProcessRegistry::new(),
    );
    let launcher = Arc::new(launcher);
    let store = StateStore::new(config.state.state_file.clone());
    let orchestrator = RadioOrchestrator::new(catalog, launcher.clone(), store);

    if orchestrator.restore().await {
        info!("previous session restored from {:?}", config.state.state_file);
    }

    spawn_signal_handler(launcher.clone());

    // ── Run TUI ──────────────────────────────────────────────────────────────
    let app = app::App::new(orchestrator, config.catalog.search_limit, cli.resume);
    let result = app.run(events_rx, log_rx).await;
    if let Err(e) = &result {
        error!("TUI exited with error: {:#}", e);
    }
    info!("ytradio exiting");

    // The blocking terminal reader never returns on its own; don't let the
    // runtime wait for it.
    std::process::exit(if result.is_ok() { 0 } else { 1 })
}

/// Fail early with install hints when the player can't be run.
fn check_player(binary: &str) -> anyhow::Result<()> {
    let Some(path) = platform::resolve_binary(binary) else {
        bail!(
            "player '{}' not found.\n{}\n(or pass --skip-player-check)",
            binary,
            platform::player_install_hint()
        );
    };
    let output = std::process::Command::new(&path)
        .arg("--version")
        .output()
        .with_context(|| format!("cannot run {}", path.display()))?;
    if !output.status.success() {
        bail!(
            "'{} --version' failed ({}).\n{}",
            path.display(),
            output.status,
            platform::player_install_hint()
        );
    }
    let version = String::from_utf8_lossy(&output.stdout);
    info!(
        "player: {}",
        version.lines().next().unwrap_or("unknown version")
    );
    Ok(())
}

/// SIGINT/SIGTERM/SIGHUP sent to the process stop every player we started
/// before exiting, then put the terminal back.
fn spawn_signal_handler(launcher: Arc<PlaybackLauncher>) {
    tokio::spawn(async move {
        let name = wait_for_signal().await;
        warn!("received {}, stopping all players", name);
        let killed = launcher.terminate_all().await;
        info!("stopped {} player process(es)", killed);
        app::restore_terminal();
        std::process::exit(0);
    });
}

#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut term, mut hup) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::hangup()),
    ) {
        (Ok(t), Ok(h)) => (t, h),
        _ => {
            warn!("cannot install SIGTERM/SIGHUP handlers, using ctrl-c only");
            let _ = tokio::signal::ctrl_c().await;
            return "SIGINT";
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => "SIGINT",
        _ = term.recv() => "SIGTERM",
        _ = hup.recv() => "SIGHUP",
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    let _ = tokio::signal::ctrl_c().await;
    "ctrl-c"
}
