#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{Notify, Semaphore};

use ytradio_core::{
    CatalogProvider, FetchError, PlaybackId, PlaybackOrigin, Player, RadioOrchestrator, Song,
    SpawnError, StateStore,
};

pub fn song(id: &str) -> Song {
    Song::new(format!("Title {id}"), format!("Artist {id}"), id)
}

pub fn songs(ids: &[&str]) -> Vec<Song> {
    ids.iter().map(|id| song(id)).collect()
}

// ── catalog ───────────────────────────────────────────────────────────────────

/// Related songs keyed by seed id; unknown seeds get an empty list.
#[derive(Default)]
pub struct FakeCatalog {
    related: Mutex<HashMap<String, Vec<Song>>>,
    pub fail: AtomicBool,
    pub calls: Mutex<Vec<(String, usize)>>,
}

impl FakeCatalog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set(&self, seed: &str, ids: &[&str]) {
        self.related
            .lock()
            .unwrap()
            .insert(seed.to_string(), songs(ids));
    }

    pub fn calls(&self) -> Vec<(String, usize)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CatalogProvider for FakeCatalog {
    async fn related_songs(&self, seed_id: &str, limit: usize) -> Result<Vec<Song>, FetchError> {
        self.calls
            .lock()
            .unwrap()
            .push((seed_id.to_string(), limit));
        if self.fail.load(Ordering::SeqCst) {
            return Err(FetchError::Api("catalog unavailable".into()));
        }
        let mut list = self
            .related
            .lock()
            .unwrap()
            .get(seed_id)
            .cloned()
            .unwrap_or_default();
        list.truncate(limit);
        Ok(list)
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Song>, FetchError> {
        self.related_songs(query, limit).await
    }
}

// ── player ────────────────────────────────────────────────────────────────────

/// Records every call. When gated, `play` announces itself on `entered` and
/// then blocks until `open_gate`.
pub struct FakePlayer {
    pub plays: Mutex<Vec<(String, PlaybackOrigin)>>,
    next_id: AtomicU64,
    current: Mutex<Option<PlaybackId>>,
    pub fail_spawn: AtomicBool,
    pub disconnects: AtomicUsize,
    pub terminations: AtomicUsize,
    gated: AtomicBool,
    gate: Semaphore,
    pub entered: Notify,
}

impl FakePlayer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            plays: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
            current: Mutex::new(None),
            fail_spawn: AtomicBool::new(false),
            disconnects: AtomicUsize::new(0),
            terminations: AtomicUsize::new(0),
            gated: AtomicBool::new(false),
            gate: Semaphore::new(0),
            entered: Notify::new(),
        })
    }

    pub fn close_gate(&self) {
        self.gated.store(true, Ordering::SeqCst);
    }

    pub fn open_gate(&self) {
        self.gated.store(false, Ordering::SeqCst);
        self.gate.add_permits(64);
    }

    pub fn played_ids(&self) -> Vec<String> {
        self.plays
            .lock()
            .unwrap()
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn play_count(&self) -> usize {
        self.plays.lock().unwrap().len()
    }

    pub fn current(&self) -> Option<PlaybackId> {
        *self.current.lock().unwrap()
    }
}

#[async_trait]
impl Player for FakePlayer {
    async fn play(&self, song: &Song, origin: PlaybackOrigin) -> Result<PlaybackId, SpawnError> {
        if self.gated.load(Ordering::SeqCst) {
            self.entered.notify_one();
            let permit = self.gate.acquire().await.expect("gate closed");
            permit.forget();
        }
        self.plays
            .lock()
            .unwrap()
            .push((song.video_id.clone(), origin));
        if self.fail_spawn.load(Ordering::SeqCst) {
            *self.current.lock().unwrap() = None;
            return Err(SpawnError::BinaryNotFound("fake".into()));
        }
        let id = PlaybackId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        *self.current.lock().unwrap() = Some(id);
        Ok(id)
    }

    fn disconnect_current(&self) -> Option<PlaybackId> {
        let id = self.current.lock().unwrap().take();
        if id.is_some() {
            self.disconnects.fetch_add(1, Ordering::SeqCst);
        }
        id
    }

    async fn terminate_all(&self) -> usize {
        let had = self.current.lock().unwrap().take().is_some();
        self.terminations.fetch_add(1, Ordering::SeqCst);
        usize::from(had)
    }
}

// ── harness ───────────────────────────────────────────────────────────────────

pub struct Harness {
    pub catalog: Arc<FakeCatalog>,
    pub player: Arc<FakePlayer>,
    pub orchestrator: RadioOrchestrator,
    pub store: StateStore,
    pub dir: tempfile::TempDir,
}

impl Harness {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));
        let catalog = FakeCatalog::new();
        let player = FakePlayer::new();
        let orchestrator = RadioOrchestrator::new(catalog.clone(), player.clone(), store.clone());
        Self {
            catalog,
            player,
            orchestrator,
            store,
            dir,
        }
    }

    /// A second process on the same state file, as after a restart.
    pub fn restart(&self) -> (Arc<FakePlayer>, RadioOrchestrator) {
        let player = FakePlayer::new();
        let orchestrator =
            RadioOrchestrator::new(self.catalog.clone(), player.clone(), self.store.clone());
        (player, orchestrator)
    }

    pub fn queue_ids(&self) -> Vec<String> {
        self.orchestrator
            .view()
            .radio
            .queue
            .iter()
            .map(|s| s.video_id.clone())
            .collect()
    }
}
