//! Radio queue model and refill policy.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::catalog::CatalogProvider;
use crate::error::FetchError;
use crate::song::Song;

/// Songs requested when a radio session starts.
pub const INITIAL_FETCH: usize = 20;
/// Queue length below which a top-up is requested.
pub const REFILL_THRESHOLD: usize = 5;
/// Songs requested per top-up.
pub const REFILL_FETCH: usize = 15;

/// Pending songs, head first. Holds at most one entry per `video_id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RadioQueue {
    songs: VecDeque<Song>,
}

impl RadioQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Song> {
        self.songs.iter()
    }

    pub fn contains(&self, video_id: &str) -> bool {
        self.songs.iter().any(|s| s.video_id == video_id)
    }

    pub fn clear(&mut self) {
        self.songs.clear();
    }

    pub fn pop_next(&mut self) -> Option<Song> {
        self.songs.pop_front()
    }

    pub fn needs_refill(&self, threshold: usize) -> bool {
        self.songs.len() < threshold
    }

    /// Append `songs` in order, skipping anything already queued, repeated
    /// within `songs` itself, or matching `exclude`. Returns how many were
    /// added.
    pub fn extend_dedup(&mut self, songs: Vec<Song>, exclude: &[&str]) -> usize {
        let mut added = 0;
        for song in songs {
            if exclude.contains(&song.video_id.as_str()) || self.contains(&song.video_id) {
                continue;
            }
            self.songs.push_back(song);
            added += 1;
        }
        added
    }

    /// Fetch the initial queue for `seed`. The queue is only replaced when
    /// the fetch succeeds; the seed itself never lands in it.
    pub async fn start(
        &mut self,
        seed: &Song,
        catalog: &dyn CatalogProvider,
    ) -> Result<usize, FetchError> {
        let related = catalog.related_songs(&seed.video_id, INITIAL_FETCH).await?;
        self.songs.clear();
        let added = self.extend_dedup(related, &[seed.video_id.as_str()]);
        debug!("radio: started from {} with {} songs", seed.video_id, added);
        Ok(added)
    }

    /// Top up from `seed` when fewer than `threshold` songs remain. A failed
    /// fetch is logged and leaves the queue as it was. Returns how many songs
    /// were added.
    pub async fn refill_if_low(
        &mut self,
        threshold: usize,
        seed: &Song,
        exclude: &[&str],
        catalog: &dyn CatalogProvider,
    ) -> usize {
        if !self.needs_refill(threshold) {
            return 0;
        }
        match catalog.related_songs(&seed.video_id, REFILL_FETCH).await {
            Ok(related) => {
                let mut skip: Vec<&str> = exclude.to_vec();
                skip.push(seed.video_id.as_str());
                let added = self.extend_dedup(related, &skip);
                debug!("radio: refilled {} songs from {}", added, seed.video_id);
                added
            }
            Err(e) => {
                warn!("radio: refill from {} failed: {}", seed.video_id, e);
                0
            }
        }
    }
}

/// Everything the radio needs to carry across a restart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RadioState {
    pub active: bool,
    #[serde(default)]
    pub queue: RadioQueue,
    #[serde(default)]
    pub current_song: Option<Song>,
    #[serde(default)]
    pub seed_song: Option<Song>,
    #[serde(default)]
    pub queue_visible: bool,
}

impl RadioState {
    /// Back to inactive. `queue_visible` is a UI preference and survives.
    pub fn reset(&mut self) {
        self.active = false;
        self.queue.clear();
        self.current_song = None;
        self.seed_song = None;
    }

    /// Song to derive related tracks from: what is playing now, else the seed.
    pub fn refill_seed(&self) -> Option<&Song> {
        self.current_song.as_ref().or(self.seed_song.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct StubCatalog {
        related: Mutex<Result<Vec<Song>, String>>,
        calls: AtomicUsize,
        last_limit: AtomicUsize,
    }

    impl StubCatalog {
        fn returning(songs: Vec<Song>) -> Self {
            Self {
                related: Mutex::new(Ok(songs)),
                calls: AtomicUsize::new(0),
                last_limit: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                related: Mutex::new(Err("boom".into())),
                calls: AtomicUsize::new(0),
                last_limit: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CatalogProvider for StubCatalog {
        async fn related_songs(&self, _seed: &str, limit: usize) -> Result<Vec<Song>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.last_limit.store(limit, Ordering::SeqCst);
            self.related
                .lock()
                .unwrap()
                .clone()
                .map_err(FetchError::Api)
        }

        async fn search(&self, _q: &str, _limit: usize) -> Result<Vec<Song>, FetchError> {
            Ok(Vec::new())
        }
    }

    fn song(id: &str) -> Song {
        Song::new(format!("title {}", id), "artist", id)
    }

    fn ids(q: &RadioQueue) -> Vec<&str> {
        q.iter().map(|s| s.video_id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_start_excludes_seed_and_dupes() {
        let catalog = StubCatalog::returning(vec![song("a"), song("b"), song("a"), song("c")]);
        let mut q = RadioQueue::new();
        let added = q.start(&song("a"), &catalog).await.unwrap();
        assert_eq!(added, 2);
        assert_eq!(ids(&q), vec!["b", "c"]);
        assert_eq!(catalog.last_limit.load(Ordering::SeqCst), INITIAL_FETCH);
    }

    #[tokio::test]
    async fn test_start_failure_keeps_queue() {
        let catalog = StubCatalog::failing();
        let mut q = RadioQueue::new();
        q.extend_dedup(vec![song("x")], &[]);
        assert!(q.start(&song("seed"), &catalog).await.is_err());
        assert_eq!(ids(&q), vec!["x"]);
    }

    #[tokio::test]
    async fn test_refill_skipped_when_full_enough() {
        let catalog = StubCatalog::returning(vec![song("z")]);
        let mut q = RadioQueue::new();
        q.extend_dedup((0..5).map(|i| song(&i.to_string())).collect(), &[]);
        let added = q.refill_if_low(REFILL_THRESHOLD, &song("seed"), &[], &catalog).await;
        assert_eq!(added, 0);
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_refill_dedups_and_excludes() {
        let catalog = StubCatalog::returning(vec![song("y"), song("cur"), song("z"), song("seed")]);
        let mut q = RadioQueue::new();
        q.extend_dedup(vec![song("y")], &[]);
        let added = q
            .refill_if_low(REFILL_THRESHOLD, &song("seed"), &["cur"], &catalog)
            .await;
        assert_eq!(added, 1);
        assert_eq!(ids(&q), vec!["y", "z"]);
        assert_eq!(catalog.last_limit.load(Ordering::SeqCst), REFILL_FETCH);
    }

    #[tokio::test]
    async fn test_refill_failure_is_silent() {
        let catalog = StubCatalog::failing();
        let mut q = RadioQueue::new();
        q.extend_dedup(vec![song("y")], &[]);
        let added = q.refill_if_low(REFILL_THRESHOLD, &song("seed"), &[], &catalog).await;
        assert_eq!(added, 0);
        assert_eq!(ids(&q), vec!["y"]);
    }

    #[test]
    fn test_reset_keeps_visibility() {
        let mut state = RadioState {
            active: true,
            queue: RadioQueue::new(),
            current_song: Some(song("a")),
            seed_song: Some(song("s")),
            queue_visible: true,
        };
        state.queue.extend_dedup(vec![song("b")], &[]);
        state.reset();
        assert!(!state.active);
        assert!(state.queue.is_empty());
        assert!(state.current_song.is_none());
        assert!(state.seed_song.is_none());
        assert!(state.queue_visible);
    }

    #[test]
    fn test_refill_seed_prefers_current() {
        let mut state = RadioState::default();
        assert!(state.refill_seed().is_none());
        state.seed_song = Some(song("s"));
        assert_eq!(state.refill_seed().unwrap().video_id, "s");
        state.current_song = Some(song("c"));
        assert_eq!(state.refill_seed().unwrap().video_id, "c");
    }

    #[test]
    fn test_queue_serializes_as_list() {
        let mut q = RadioQueue::new();
        q.extend_dedup(vec![song("a")], &[]);
        let v = serde_json::to_value(&q).unwrap();
        assert!(v.is_array());
    }
}
