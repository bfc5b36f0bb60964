pub mod catalog;
pub mod config;
pub mod error;
pub mod guard;
pub mod launcher;
pub mod orchestrator;
pub mod platform;
pub mod radio;
pub mod registry;
pub mod song;
pub mod store;

pub use catalog::{CatalogProvider, YtMusicClient};
pub use error::{FetchError, ParseError, PersistenceError, SpawnError};
pub use launcher::{PlaybackEvent, PlaybackLauncher, PlaybackOrigin, Player};
pub use orchestrator::{Outcome, Phase, RadioOrchestrator, RadioView};
pub use radio::{RadioQueue, RadioState};
pub use registry::{PlaybackId, ProcessRegistry};
pub use song::{song_from_catalog_entry, Song};
pub use store::{PersistedSnapshot, StateStore};
