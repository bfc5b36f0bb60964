//! RadioOrchestrator: wires queue, guard, player and state file together.
//!
//! Every operation runs under one session lock, so operations are applied
//! one after another. The advance guard sits in front of that lock: a skip
//! and an end-of-track that race each other are settled by the guard without
//! waiting, and the loser is told the radio is already advancing.
//!
//! Readers (the UI) never take the session lock; they watch a [`RadioView`]
//! that is republished after every change.

use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::catalog::CatalogProvider;
use crate::error::{FetchError, SpawnError};
use crate::guard::{AdvanceGuard, AdvancePermit};
use crate::launcher::{PlaybackOrigin, Player};
use crate::radio::{RadioQueue, RadioState, REFILL_THRESHOLD};
use crate::registry::PlaybackId;
use crate::song::Song;
use crate::store::{PersistedSnapshot, StateStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Playing,
    Advancing,
}

/// What the UI renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RadioView {
    pub radio: RadioState,
    pub now_playing: Option<Song>,
    pub last_played: Option<Song>,
    /// A parked radio session exists that `resume` would restart.
    pub resumable: bool,
}

/// Result of one orchestrator operation. `Display` gives the status line.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    RadioStarted {
        seed: Song,
        now_playing: Option<Song>,
        queued: usize,
    },
    RadioStartFailed {
        seed: Song,
        reason: String,
    },
    Advanced {
        song: Song,
        queued: usize,
    },
    AlreadyAdvancing,
    QueueExhausted,
    RadioStopped,
    RadioNotActive,
    Playing {
        song: Song,
        radio_stopped: bool,
    },
    SpawnFailed {
        song: Song,
        reason: String,
    },
    Disconnected,
    NothingPlaying,
    Resumed {
        song: Song,
        radio: bool,
    },
    NothingToResume,
    StoppedAll {
        killed: usize,
    },
    QueueVisibility(bool),
    Saved,
    /// A completion event that did not qualify for an automatic advance.
    Ignored,
}

impl Outcome {
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Outcome::RadioStartFailed { .. } | Outcome::SpawnFailed { .. }
        )
    }

    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            Outcome::AlreadyAdvancing
                | Outcome::QueueExhausted
                | Outcome::RadioNotActive
                | Outcome::NothingPlaying
                | Outcome::NothingToResume
        )
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::RadioStarted {
                seed,
                now_playing: Some(song),
                queued,
            } => write!(
                f,
                "Radio started from {}: playing {} ({} queued)",
                seed.title, song, queued
            ),
            Outcome::RadioStarted { seed, .. } => write!(
                f,
                "Radio started from {}, but no related songs were found",
                seed.title
            ),
            Outcome::RadioStartFailed { seed, reason } => {
                write!(f, "Failed to start radio from {}: {}", seed.title, reason)
            }
            Outcome::Advanced { song, queued } => {
                write!(f, "Radio: {} ({} queued)", song, queued)
            }
            Outcome::AlreadyAdvancing => write!(f, "Already advancing, please wait"),
            Outcome::QueueExhausted => write!(f, "No more songs in radio queue"),
            Outcome::RadioStopped => write!(f, "Radio stopped"),
            Outcome::RadioNotActive => write!(f, "Radio is not active"),
            Outcome::Playing {
                song,
                radio_stopped: true,
            } => write!(f, "Radio stopped. Playing: {}", song),
            Outcome::Playing { song, .. } => write!(f, "Playing: {}", song),
            Outcome::SpawnFailed { song, reason } => {
                write!(f, "Failed to play {}: {}", song, reason)
            }
            Outcome::Disconnected => write!(
                f,
                "Disconnected from playback. Music continues in background. \
                 Press 'p' to resume or ^s to stop."
            ),
            Outcome::NothingPlaying => write!(f, "Nothing is playing"),
            Outcome::Resumed { song, radio: true } => write!(f, "Resumed radio: {}", song),
            Outcome::Resumed { song, .. } => write!(f, "Resumed: {}", song),
            Outcome::NothingToResume => write!(f, "No song to resume. Play a song first."),
            Outcome::StoppedAll { killed } => {
                write!(f, "Stopped all music ({} player process(es))", killed)
            }
            Outcome::QueueVisibility(true) => write!(f, "Radio queue shown"),
            Outcome::QueueVisibility(false) => write!(f, "Radio queue hidden"),
            Outcome::Saved => write!(f, "Session saved; music keeps playing in the background"),
            Outcome::Ignored => Ok(()),
        }
    }
}

#[derive(Debug, Default)]
struct Session {
    radio: RadioState,
    last_played_song: Option<Song>,
    was_radio_active_when_disconnected: bool,
    disconnected_radio_state: Option<RadioState>,
    /// Set by stop/disconnect; completion events are ignored while set.
    stop_monitoring: bool,
    current: Option<(PlaybackId, PlaybackOrigin)>,
}

impl Session {
    fn to_snapshot(&self) -> PersistedSnapshot {
        PersistedSnapshot {
            radio_state: self.radio.clone(),
            last_played_song: self.last_played_song.clone(),
            was_radio_active_when_disconnected: self.was_radio_active_when_disconnected,
            disconnected_radio_state: self.disconnected_radio_state.clone(),
            saved_at: chrono::Utc::now(),
        }
    }

    fn view(&self) -> RadioView {
        RadioView {
            radio: self.radio.clone(),
            now_playing: self.current.as_ref().and(self.last_played_song.clone()),
            last_played: self.last_played_song.clone(),
            resumable: self.was_radio_active_when_disconnected
                && self.disconnected_radio_state.is_some(),
        }
    }

    /// Move the live radio into the parked slot that `resume` restores from.
    fn park_radio(&mut self) {
        if self.radio.active {
            self.was_radio_active_when_disconnected = true;
            self.disconnected_radio_state = Some(self.radio.clone());
        }
    }

    fn end_radio(&mut self) {
        self.radio.reset();
        self.stop_monitoring = true;
    }
}

struct Inner {
    catalog: Arc<dyn CatalogProvider>,
    player: Arc<dyn Player>,
    store: StateStore,
    guard: AdvanceGuard,
    session: Mutex<Session>,
    view_tx: watch::Sender<RadioView>,
}

#[derive(Clone)]
pub struct RadioOrchestrator {
    inner: Arc<Inner>,
}

impl RadioOrchestrator {
    pub fn new(
        catalog: Arc<dyn CatalogProvider>,
        player: Arc<dyn Player>,
        store: StateStore,
    ) -> Self {
        let (view_tx, _) = watch::channel(RadioView::default());
        Self {
            inner: Arc::new(Inner {
                catalog,
                player,
                store,
                guard: AdvanceGuard::new(),
                session: Mutex::new(Session::default()),
                view_tx,
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<RadioView> {
        self.inner.view_tx.subscribe()
    }

    pub fn view(&self) -> RadioView {
        self.inner.view_tx.borrow().clone()
    }

    pub fn phase(&self) -> Phase {
        if !self.inner.view_tx.borrow().radio.active {
            Phase::Idle
        } else if self.inner.guard.is_held() {
            Phase::Advancing
        } else {
            Phase::Playing
        }
    }

    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<Song>, FetchError> {
        self.inner.catalog.search(query, limit).await
    }

    // ── lifecycle ─────────────────────────────────────────────────────────────

    /// Pull the remembered session from disk without playing anything. The
    /// live radio always starts inactive since nothing is being monitored yet.
    pub async fn restore(&self) -> bool {
        let Some(snap) = self.inner.store.load().await else {
            return false;
        };
        let mut s = self.inner.session.lock().await;
        s.last_played_song = snap.last_played_song;
        s.radio.queue_visible = snap.radio_state.queue_visible;
        s.was_radio_active_when_disconnected = snap.was_radio_active_when_disconnected;
        s.disconnected_radio_state = snap.disconnected_radio_state;
        if snap.radio_state.active && s.disconnected_radio_state.is_none() {
            s.was_radio_active_when_disconnected = true;
            s.disconnected_radio_state = Some(snap.radio_state);
        }
        info!(
            "orchestrator: restored session (last song {:?}, radio parked: {})",
            s.last_played_song.as_ref().map(|x| &x.video_id),
            s.was_radio_active_when_disconnected
        );
        self.publish(&s);
        true
    }

    pub async fn start_radio(&self, seed: Song) -> Outcome {
        let mut s = self.inner.session.lock().await;
        self.inner.guard.force_release();

        let mut queue = RadioQueue::new();
        if let Err(e) = queue.start(&seed, self.inner.catalog.as_ref()).await {
            warn!("orchestrator: radio start from {} failed: {}", seed.video_id, e);
            return Outcome::RadioStartFailed {
                seed,
                reason: e.to_string(),
            };
        }

        s.radio = RadioState {
            active: true,
            queue,
            current_song: None,
            seed_song: Some(seed.clone()),
            queue_visible: true,
        };
        s.stop_monitoring = false;
        s.was_radio_active_when_disconnected = false;
        s.disconnected_radio_state = None;
        info!(
            "orchestrator: radio started from {} with {} songs",
            seed.video_id,
            s.radio.queue.len()
        );

        let outcome = match s.radio.queue.pop_next() {
            Some(first) => {
                s.radio.current_song = Some(first.clone());
                match self.play_locked(&mut s, &first, PlaybackOrigin::Radio).await {
                    Ok(_) => Outcome::RadioStarted {
                        seed,
                        now_playing: Some(first),
                        queued: s.radio.queue.len(),
                    },
                    Err(e) => Outcome::SpawnFailed {
                        song: first,
                        reason: e.to_string(),
                    },
                }
            }
            None => Outcome::RadioStarted {
                seed,
                now_playing: None,
                queued: 0,
            },
        };
        self.commit(&s).await;
        outcome
    }

    /// Skip to the next radio song.
    pub async fn manual_next(&self) -> Outcome {
        let Some(permit) = self.inner.guard.try_acquire() else {
            debug!("orchestrator: manual next rejected, already advancing");
            return Outcome::AlreadyAdvancing;
        };
        let mut s = self.inner.session.lock().await;
        if !s.radio.active {
            return Outcome::RadioNotActive;
        }
        self.advance(permit, &mut s).await
    }

    /// Completion hand-off from the player monitor. Advances only for a
    /// radio playback that is still the current one.
    pub async fn on_playback_finished(&self, id: PlaybackId, origin: PlaybackOrigin) -> Outcome {
        if origin != PlaybackOrigin::Radio {
            let mut s = self.inner.session.lock().await;
            if s.current.map(|(cur, _)| cur) == Some(id) {
                s.current = None;
                self.publish(&s);
            }
            return Outcome::Ignored;
        }
        let Some(permit) = self.inner.guard.try_acquire() else {
            debug!("orchestrator: auto advance for {} rejected, already advancing", id);
            return Outcome::AlreadyAdvancing;
        };
        let mut s = self.inner.session.lock().await;
        let is_current = s.current.map(|(cur, _)| cur) == Some(id);
        if !s.radio.active || s.stop_monitoring || !is_current {
            debug!(
                "orchestrator: ignoring finish of {} (active={}, stop={}, current={})",
                id, s.radio.active, s.stop_monitoring, is_current
            );
            if is_current {
                s.current = None;
                self.publish(&s);
            }
            return Outcome::Ignored;
        }
        info!("orchestrator: {} finished, advancing", id);
        self.advance(permit, &mut s).await
    }

    /// Shared by manual and automatic advance. Holding `_permit` is what
    /// makes this single-flight.
    async fn advance(&self, _permit: AdvancePermit, s: &mut Session) -> Outcome {
        let catalog = self.inner.catalog.as_ref();

        if s.radio.queue.is_empty() {
            if let Some(seed) = s.radio.refill_seed().cloned() {
                s.radio
                    .queue
                    .refill_if_low(REFILL_THRESHOLD, &seed, &[], catalog)
                    .await;
            }
        }

        let Some(next) = s.radio.queue.pop_next() else {
            self.commit(s).await;
            return Outcome::QueueExhausted;
        };
        s.radio.current_song = Some(next.clone());
        let played = self.play_locked(s, &next, PlaybackOrigin::Radio).await;

        // Seed top-ups from the song now playing so the radio drifts.
        s.radio
            .queue
            .refill_if_low(REFILL_THRESHOLD, &next, &[], catalog)
            .await;
        self.commit(s).await;

        match played {
            Ok(_) => Outcome::Advanced {
                song: next,
                queued: s.radio.queue.len(),
            },
            Err(e) => Outcome::SpawnFailed {
                song: next,
                reason: e.to_string(),
            },
        }
    }

    /// One-off playback of a search result. Ends any radio session.
    pub async fn play_song(&self, song: Song) -> Outcome {
        let mut s = self.inner.session.lock().await;
        let radio_stopped = s.radio.active;
        if radio_stopped {
            s.end_radio();
            self.inner.guard.force_release();
        }
        let outcome = match self.play_locked(&mut s, &song, PlaybackOrigin::Manual).await {
            Ok(_) => Outcome::Playing {
                song,
                radio_stopped,
            },
            Err(e) => Outcome::SpawnFailed {
                song,
                reason: e.to_string(),
            },
        };
        self.commit(&s).await;
        outcome
    }

    /// Always leaves the radio inactive and empty. The current song plays
    /// out but nothing follows it.
    pub async fn stop_radio(&self) -> Outcome {
        let mut s = self.inner.session.lock().await;
        let was_active = s.radio.active;
        s.end_radio();
        self.inner.guard.force_release();
        self.commit(&s).await;
        if was_active {
            info!("orchestrator: radio stopped");
            Outcome::RadioStopped
        } else {
            Outcome::RadioNotActive
        }
    }

    /// Let go of the player without stopping it.
    pub async fn disconnect(&self) -> Outcome {
        let mut s = self.inner.session.lock().await;
        let detached = self.inner.player.disconnect_current();
        if detached.is_none() && !s.radio.active {
            return Outcome::NothingPlaying;
        }
        s.park_radio();
        s.end_radio();
        s.current = None;
        self.inner.guard.force_release();
        self.commit(&s).await;
        info!("orchestrator: disconnected from {:?}", detached);
        Outcome::Disconnected
    }

    /// Restart the remembered song; restores the parked radio if there is
    /// one.
    pub async fn resume(&self) -> Outcome {
        let snapshot = self.inner.store.load().await;
        let mut s = self.inner.session.lock().await;
        if let Some(snap) = snapshot {
            if s.last_played_song.is_none() {
                s.last_played_song = snap.last_played_song;
            }
            if !s.was_radio_active_when_disconnected && snap.was_radio_active_when_disconnected {
                s.was_radio_active_when_disconnected = true;
                s.disconnected_radio_state = snap.disconnected_radio_state;
            }
        }

        let Some(song) = s.last_played_song.clone() else {
            return Outcome::NothingToResume;
        };

        let parked = if s.was_radio_active_when_disconnected {
            s.disconnected_radio_state.take()
        } else {
            None
        };
        s.was_radio_active_when_disconnected = false;

        let radio = parked.is_some();
        let origin = match parked {
            Some(mut restored) => {
                restored.active = true;
                restored.current_song = Some(song.clone());
                s.radio = restored;
                s.stop_monitoring = false;
                self.inner.guard.force_release();
                PlaybackOrigin::Radio
            }
            None => PlaybackOrigin::Manual,
        };

        let outcome = match self.play_locked(&mut s, &song, origin).await {
            Ok(_) => Outcome::Resumed { song, radio },
            Err(e) => Outcome::SpawnFailed {
                song,
                reason: e.to_string(),
            },
        };
        self.commit(&s).await;
        outcome
    }

    /// Kill every player we own or recognise. The radio is parked so `p`
    /// can bring it back.
    pub async fn stop_all(&self) -> Outcome {
        let mut s = self.inner.session.lock().await;
        let killed = self.inner.player.terminate_all().await;
        s.park_radio();
        s.end_radio();
        s.current = None;
        self.inner.guard.force_release();
        self.commit(&s).await;
        Outcome::StoppedAll { killed }
    }

    /// Ordinary exit: persist, park the radio, leave the music running.
    pub async fn quit(&self) -> Outcome {
        let mut s = self.inner.session.lock().await;
        s.park_radio();
        s.stop_monitoring = true;
        self.commit(&s).await;
        info!("orchestrator: state saved for quit");
        Outcome::Saved
    }

    pub async fn toggle_queue_visible(&self) -> Outcome {
        let mut s = self.inner.session.lock().await;
        s.radio.queue_visible = !s.radio.queue_visible;
        self.commit(&s).await;
        Outcome::QueueVisibility(s.radio.queue_visible)
    }

    // ── helpers ───────────────────────────────────────────────────────────────

    /// Spawn failures are reported, but the song still counts as last played.
    async fn play_locked(
        &self,
        s: &mut Session,
        song: &Song,
        origin: PlaybackOrigin,
    ) -> Result<PlaybackId, SpawnError> {
        s.last_played_song = Some(song.clone());
        match self.inner.player.play(song, origin).await {
            Ok(id) => {
                s.current = Some((id, origin));
                Ok(id)
            }
            Err(e) => {
                warn!("orchestrator: could not play {}: {}", song.video_id, e);
                s.current = None;
                Err(e)
            }
        }
    }

    async fn commit(&self, s: &Session) {
        self.inner.store.save(&s.to_snapshot()).await;
        self.publish(s);
    }

    fn publish(&self, s: &Session) {
        self.inner.view_tx.send_replace(s.view());
    }
}
