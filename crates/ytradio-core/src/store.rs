//! StateStore: the one JSON snapshot that lets a new process pick up a
//! radio session still playing in the background.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::PersistenceError;
use crate::radio::RadioState;
use crate::song::Song;

/// Snapshots older than this are ignored on load.
pub const MAX_SNAPSHOT_AGE_HOURS: i64 = 24;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSnapshot {
    pub radio_state: RadioState,
    #[serde(default)]
    pub last_played_song: Option<Song>,
    #[serde(default)]
    pub was_radio_active_when_disconnected: bool,
    #[serde(default)]
    pub disconnected_radio_state: Option<RadioState>,
    pub saved_at: DateTime<Utc>,
}

impl PersistedSnapshot {
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.saved_at) <= Duration::hours(MAX_SNAPSHOT_AGE_HOURS)
    }
}

#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rewrite the whole file. Never fails from the caller's point of view.
    pub async fn save(&self, snapshot: &PersistedSnapshot) {
        if let Err(e) = self.try_save(snapshot).await {
            warn!("state: failed to save {:?}: {}", self.path, e);
        }
    }

    async fn try_save(&self, snapshot: &PersistedSnapshot) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(snapshot)?;
        // Write-then-rename so a crash mid-write can't leave half a file.
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!("state: saved {:?}", self.path);
        Ok(())
    }

    pub async fn load(&self) -> Option<PersistedSnapshot> {
        self.load_at(Utc::now()).await
    }

    /// `None` when the file is missing, unparsable, or older than
    /// [`MAX_SNAPSHOT_AGE_HOURS`] relative to `now`.
    pub async fn load_at(&self, now: DateTime<Utc>) -> Option<PersistedSnapshot> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("state: cannot read {:?}: {}", self.path, e);
                return None;
            }
        };
        let snapshot: PersistedSnapshot = match serde_json::from_str(&content) {
            Ok(s) => s,
            Err(e) => {
                warn!("state: ignoring unparsable {:?}: {}", self.path, e);
                return None;
            }
        };
        if !snapshot.is_fresh_at(now) {
            debug!("state: snapshot from {} is stale", snapshot.saved_at);
            return None;
        }
        Some(snapshot)
    }
}
