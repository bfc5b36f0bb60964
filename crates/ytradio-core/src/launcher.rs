/// Player process launcher.
///
/// Architecture:
///
/// ```text
///   PlaybackLauncher::play(song, origin)
///         │
///         ├── terminate every registered child, scan for look-alikes
///         ├── spawn player  ──► ProcessRegistry.register(id, entry)
///         └── monitor task  ← owns the Child
///                 ├── child exits          → registry.remove(id)
///                 │                          → PlaybackEvent::Finished on events_tx
///                 ├── MonitorControl::Terminate → SIGTERM, grace, SIGKILL, ack
///                 └── MonitorControl::Detach    → drop Child, process keeps running
/// ```
///
/// Only a natural exit of a still-registered child produces an event, so a
/// stop or a disconnect can never look like "song finished".
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sysinfo::{Signal, System};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::config::PlayerConfig;
use crate::error::SpawnError;
use crate::platform;
use crate::registry::{MonitorControl, PlaybackId, ProcessRegistry, RegistryEntry};
use crate::song::Song;

/// How long a child gets between SIGTERM and SIGKILL.
pub const TERM_GRACE: Duration = Duration::from_secs(2);
const YT_DLP_TIMEOUT: Duration = Duration::from_secs(15);

/// Who asked for a playback. Only `Radio` playbacks auto-advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackOrigin {
    Manual,
    Radio,
}

#[derive(Debug, Clone)]
pub enum PlaybackEvent {
    Finished {
        id: PlaybackId,
        origin: PlaybackOrigin,
        song: Song,
        success: bool,
    },
}

/// What the orchestrator needs from a player backend.
#[async_trait]
pub trait Player: Send + Sync {
    /// Stop whatever this app is playing and start `song`.
    async fn play(&self, song: &Song, origin: PlaybackOrigin) -> Result<PlaybackId, SpawnError>;

    /// Forget the current playback without killing it.
    fn disconnect_current(&self) -> Option<PlaybackId>;

    /// Terminate every owned playback and any look-alike player left by an
    /// earlier session. Returns how many processes were signalled.
    async fn terminate_all(&self) -> usize;
}

// ── launcher ──────────────────────────────────────────────────────────────────

pub struct PlaybackLauncher {
    config: PlayerConfig,
    player_log: Option<PathBuf>,
    registry: ProcessRegistry,
    events_tx: mpsc::Sender<PlaybackEvent>,
    next_id: AtomicU64,
    current: Mutex<Option<PlaybackId>>,
}

impl PlaybackLauncher {
    pub fn new(
        config: PlayerConfig,
        player_log: Option<PathBuf>,
        registry: ProcessRegistry,
    ) -> (Self, mpsc::Receiver<PlaybackEvent>) {
        let (events_tx, events_rx) = mpsc::channel(64);
        let launcher = Self {
            config,
            player_log,
            registry,
            events_tx,
            next_id: AtomicU64::new(1),
            current: Mutex::new(None),
        };
        (launcher, events_rx)
    }

    pub fn registry(&self) -> &ProcessRegistry {
        &self.registry
    }

    pub fn current(&self) -> Option<PlaybackId> {
        *self.current_slot()
    }

    fn current_slot(&self) -> std::sync::MutexGuard<'_, Option<PlaybackId>> {
        self.current.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn binary_stem(&self) -> String {
        binary_stem(&self.config.binary)
    }

    /// Terminate every registered child and wait for each to go away.
    async fn terminate_registered(&self) -> usize {
        let entries = self.registry.drain();
        let count = entries.len();
        for (id, entry) in entries {
            debug!("player: terminating {} (pid {:?})", id, entry.pid);
            terminate_via_monitor(&entry).await;
        }
        *self.current_slot() = None;
        count
    }

    async fn scan_lookalikes(&self) -> usize {
        if self.config.signature.is_empty() {
            return 0;
        }
        let name = self.binary_stem();
        let signature = self.config.signature.clone();
        let spare = self.registry.pids();
        match tokio::task::spawn_blocking(move || kill_lookalikes(&name, &signature, &spare)).await
        {
            Ok(n) => n,
            Err(e) => {
                warn!("player: look-alike scan panicked: {}", e);
                0
            }
        }
    }

    /// Direct audio URL from yt-dlp, or the watch URL if that fails.
    async fn resolve_locator(&self, song: &Song) -> String {
        let url = song.stream_url();
        if !self.config.resolve_with_yt_dlp {
            return url;
        }
        let Some(bin) = platform::find_yt_dlp_binary() else {
            warn!("player: yt-dlp requested but not found; using watch URL");
            return url;
        };
        let mut cmd = Command::new(bin);
        cmd.args(["-f", "bestaudio", "-g", "--no-playlist", url.as_str()])
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        match tokio::time::timeout(YT_DLP_TIMEOUT, cmd.output()).await {
            Ok(Ok(out)) if out.status.success() => {
                let stdout = String::from_utf8_lossy(&out.stdout);
                match stdout.lines().map(str::trim).find(|l| !l.is_empty()) {
                    Some(direct) => direct.to_string(),
                    None => url,
                }
            }
            Ok(Ok(out)) => {
                warn!("player: yt-dlp exited with {}", out.status);
                url
            }
            Ok(Err(e)) => {
                warn!("player: yt-dlp failed to run: {}", e);
                url
            }
            Err(_) => {
                warn!("player: yt-dlp timed out");
                url
            }
        }
    }

    fn stderr_sink(&self) -> Stdio {
        let Some(path) = &self.player_log else {
            return Stdio::null();
        };
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match std::fs::OpenOptions::new().create(true).append(true).open(path) {
            Ok(f) => Stdio::from(f),
            Err(e) => {
                warn!("player: cannot open {:?}: {}", path, e);
                Stdio::null()
            }
        }
    }
}

#[async_trait]
impl Player for PlaybackLauncher {
    async fn play(&self, song: &Song, origin: PlaybackOrigin) -> Result<PlaybackId, SpawnError> {
        self.terminate_registered().await;
        let swept = self.scan_lookalikes().await;
        if swept > 0 {
            info!("player: stopped {} stray player process(es)", swept);
        }

        let binary = platform::resolve_binary(&self.config.binary)
            .ok_or_else(|| SpawnError::BinaryNotFound(self.config.binary.clone()))?;
        let locator = self.resolve_locator(song).await;
        let args = build_args(&self.config, &locator);

        let mut cmd = Command::new(&binary);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(self.stderr_sink())
            .kill_on_drop(false);
        // Own process group: a Ctrl-C or hangup aimed at the terminal must not
        // take the music down with it.
        #[cfg(unix)]
        cmd.process_group(0);

        let child = cmd.spawn()?;
        let pid = child.id();
        let id = PlaybackId(self.next_id.fetch_add(1, Ordering::Relaxed));
        info!(
            "player: {} started {:?} for {} [{:?}] (pid {:?})",
            id, binary, song.video_id, origin, pid
        );

        let (control_tx, control_rx) = mpsc::unbounded_channel();
        self.registry.register(
            id,
            RegistryEntry {
                pid,
                spawned_at: Utc::now(),
                video_id: song.video_id.clone(),
                control: control_tx,
            },
        );
        *self.current_slot() = Some(id);

        tokio::spawn(monitor(
            child,
            id,
            origin,
            song.clone(),
            self.registry.clone(),
            self.events_tx.clone(),
            control_rx,
        ));

        Ok(id)
    }

    fn disconnect_current(&self) -> Option<PlaybackId> {
        let id = self.current_slot().take()?;
        // Already exited on its own: nothing left to hand off.
        let entry = self.registry.remove(id)?;
        let _ = entry.control.send(MonitorControl::Detach);
        info!("player: {} detached (pid {:?})", id, entry.pid);
        Some(id)
    }

    async fn terminate_all(&self) -> usize {
        let owned = self.terminate_registered().await;
        let strays = self.scan_lookalikes().await;
        info!("player: terminated {} owned, {} stray", owned, strays);
        owned + strays
    }
}

// ── monitor ───────────────────────────────────────────────────────────────────

async fn monitor(
    mut child: Child,
    id: PlaybackId,
    origin: PlaybackOrigin,
    song: Song,
    registry: ProcessRegistry,
    events_tx: mpsc::Sender<PlaybackEvent>,
    mut control_rx: mpsc::UnboundedReceiver<MonitorControl>,
) {
    tokio::select! {
        status = child.wait() => {
            let success = match &status {
                Ok(s) => s.success(),
                Err(e) => {
                    warn!("player: wait on {} failed: {}", id, e);
                    false
                }
            };
            // Not registered any more means someone stopped or detached us
            // while the exit was in flight.
            if registry.remove(id).is_some() {
                debug!("player: {} exited (success={})", id, success);
                let _ = events_tx
                    .send(PlaybackEvent::Finished { id, origin, song, success })
                    .await;
            }
        }
        ctl = control_rx.recv() => match ctl {
            Some(MonitorControl::Terminate(ack)) => {
                terminate_child(&mut child).await;
                let _ = ack.send(());
            }
            Some(MonitorControl::Detach) | None => {
                debug!("player: monitor for {} released", id);
            }
        }
    }
}

async fn terminate_via_monitor(entry: &RegistryEntry) {
    let (ack_tx, ack_rx) = oneshot::channel();
    if entry.control.send(MonitorControl::Terminate(ack_tx)).is_err() {
        return;
    }
    // The monitor may already have seen the exit and dropped the ack.
    let _ = tokio::time::timeout(TERM_GRACE + Duration::from_secs(1), ack_rx).await;
}

async fn terminate_child(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            // SAFETY: plain signal delivery to a pid we spawned and have not reaped.
            unsafe {
                libc::kill(pid as libc::pid_t, libc::SIGTERM);
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = child.start_kill();
    }

    if tokio::time::timeout(TERM_GRACE, child.wait()).await.is_err() {
        warn!("player: child ignored SIGTERM, killing");
        let _ = child.kill().await;
    }
}

// ── helpers ───────────────────────────────────────────────────────────────────

fn binary_stem(binary: &str) -> String {
    Path::new(binary)
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Configured args, a volume flag when the player is mpv, then the locator.
pub fn build_args(config: &PlayerConfig, locator: &str) -> Vec<String> {
    let mut args = config.args.clone();
    if binary_stem(&config.binary) == "mpv" {
        args.push(format!("--volume={}", config.volume.min(100)));
    }
    args.push(locator.to_string());
    args
}

/// A process is a look-alike when its executable matches ours and one of
/// its arguments carries a signature substring.
pub fn is_lookalike(name: &str, cmd: &[String], binary: &str, signature: &[String]) -> bool {
    if binary_stem(name) != binary {
        return false;
    }
    cmd.iter()
        .any(|arg| signature.iter().any(|sig| !sig.is_empty() && arg.contains(sig.as_str())))
}

/// Best-effort sweep of the OS process table. Blocking.
pub fn kill_lookalikes(binary: &str, signature: &[String], spare: &[u32]) -> usize {
    // `new_all` loads command lines; a bare process refresh leaves `cmd()` empty.
    let system = System::new_all();
    let me = sysinfo::get_current_pid().ok();

    let mut killed = 0;
    for (pid, process) in system.processes() {
        if Some(*pid) == me || spare.contains(&pid.as_u32()) {
            continue;
        }
        if !is_lookalike(process.name(), process.cmd(), binary, signature) {
            continue;
        }
        info!("player: killing stray {} (pid {})", process.name(), pid);
        let sent = process
            .kill_with(Signal::Term)
            .unwrap_or_else(|| process.kill());
        if sent {
            killed += 1;
        }
    }
    killed
}
