//! ProcessRegistry: which player processes this app currently owns.
//!
//! An entry exists from the moment a player is spawned until it exits, is
//! stopped, or is handed off to the background (disconnect). Each entry keeps
//! the control channel of the task that monitors the child, which is the only
//! place the `Child` itself lives.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

/// Identifies one spawned playback for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlaybackId(pub u64);

impl std::fmt::Display for PlaybackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Instructions for a monitor task.
#[derive(Debug)]
pub enum MonitorControl {
    /// SIGTERM, bounded wait, SIGKILL; ack once the child is gone.
    Terminate(oneshot::Sender<()>),
    /// Stop watching and leave the child running.
    Detach,
}

#[derive(Debug, Clone)]
pub struct RegistryEntry {
    pub pid: Option<u32>,
    pub spawned_at: DateTime<Utc>,
    pub video_id: String,
    pub control: mpsc::UnboundedSender<MonitorControl>,
}

#[derive(Debug, Clone, Default)]
pub struct ProcessRegistry {
    entries: Arc<Mutex<HashMap<PlaybackId, RegistryEntry>>>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // A panicking holder can't leave the map half-updated: every operation
    // is a single insert/remove.
    fn lock(&self) -> MutexGuard<'_, HashMap<PlaybackId, RegistryEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn register(&self, id: PlaybackId, entry: RegistryEntry) {
        self.lock().insert(id, entry);
    }

    pub fn remove(&self, id: PlaybackId) -> Option<RegistryEntry> {
        self.lock().remove(&id)
    }

    pub fn contains(&self, id: PlaybackId) -> bool {
        self.lock().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Remove and return every entry, oldest first.
    pub fn drain(&self) -> Vec<(PlaybackId, RegistryEntry)> {
        let mut all: Vec<_> = self.lock().drain().collect();
        all.sort_by_key(|(id, _)| *id);
        all
    }

    pub fn pids(&self) -> Vec<u32> {
        self.lock().values().filter_map(|e| e.pid).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(pid: u32) -> (RegistryEntry, mpsc::UnboundedReceiver<MonitorControl>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            RegistryEntry {
                pid: Some(pid),
                spawned_at: Utc::now(),
                video_id: format!("v{}", pid),
                control: tx,
            },
            rx,
        )
    }

    #[test]
    fn test_register_remove() {
        let reg = ProcessRegistry::new();
        let (e, _rx) = entry(10);
        reg.register(PlaybackId(1), e);
        assert!(reg.contains(PlaybackId(1)));
        assert_eq!(reg.pids(), vec![10]);
        assert!(reg.remove(PlaybackId(1)).is_some());
        assert!(reg.remove(PlaybackId(1)).is_none());
        assert!(reg.is_empty());
    }

    #[test]
    fn test_drain_is_ordered_and_empties() {
        let reg = ProcessRegistry::new();
        let (a, _ra) = entry(1);
        let (b, _rb) = entry(2);
        reg.register(PlaybackId(7), b);
        reg.register(PlaybackId(3), a);
        let drained = reg.drain();
        assert_eq!(
            drained.iter().map(|(id, _)| *id).collect::<Vec<_>>(),
            vec![PlaybackId(3), PlaybackId(7)]
        );
        assert_eq!(reg.len(), 0);
    }

    #[test]
    fn test_clones_share_entries() {
        let reg = ProcessRegistry::new();
        let other = reg.clone();
        let (e, _rx) = entry(5);
        reg.register(PlaybackId(1), e);
        assert!(other.contains(PlaybackId(1)));
    }
}
