use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ParseError;

pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// A single catalog track. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    pub title: String,
    pub artist: String,
    /// Catalog key (YouTube video id). Unique per track.
    pub video_id: String,
    #[serde(default)]
    pub duration: Option<String>,
}

impl Song {
    pub fn new(
        title: impl Into<String>,
        artist: impl Into<String>,
        video_id: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            video_id: video_id.into(),
            duration: None,
        }
    }

    pub fn with_duration(mut self, duration: impl Into<String>) -> Self {
        self.duration = Some(duration.into());
        self
    }

    /// Identity used for dedup: two entries with the same id are the same
    /// track even if their metadata differs.
    pub fn same_track(&self, other: &Song) -> bool {
        self.video_id == other.video_id
    }

    /// Locator handed to the player.
    pub fn stream_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.video_id)
    }

    /// `Title - Artist`, the form used in status lines.
    pub fn display_name(&self) -> String {
        format!("{} - {}", self.title, self.artist)
    }
}

impl std::fmt::Display for Song {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Build a `Song` from a normalised catalog entry:
///
/// ```json
/// { "title": "...", "artists": [{"name": "..."}], "videoId": "...", "duration": "3:21" }
/// ```
///
/// `duration` may also arrive as `{"text": "3:21"}`. Missing title/artist
/// fall back to placeholders; a missing `videoId` is an error since the
/// track could never be played.
pub fn song_from_catalog_entry(raw: &Value) -> Result<Song, ParseError> {
    let obj = raw.as_object().ok_or(ParseError::NotAnObject)?;

    let video_id = obj
        .get("videoId")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or(ParseError::MissingVideoId)?;

    let title = obj
        .get("title")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or(UNKNOWN_TITLE);

    let artist = obj
        .get("artists")
        .and_then(Value::as_array)
        .and_then(|a| a.first())
        .and_then(|a| a.get("name"))
        .and_then(Value::as_str)
        .or_else(|| obj.get("artist").and_then(Value::as_str))
        .filter(|s| !s.is_empty())
        .unwrap_or(UNKNOWN_ARTIST);

    let duration = match obj.get("duration") {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Object(d)) => d
            .get("text")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    };

    Ok(Song {
        title: title.to_string(),
        artist: artist.to_string(),
        video_id: video_id.to_string(),
        duration,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_full_entry() {
        let raw = json!({
            "title": "Windowlicker",
            "artists": [{"name": "Aphex Twin"}, {"name": "someone else"}],
            "videoId": "UBS4Gi1y_nc",
            "duration": "6:07"
        });
        let song = song_from_catalog_entry(&raw).unwrap();
        assert_eq!(song.title, "Windowlicker");
        assert_eq!(song.artist, "Aphex Twin");
        assert_eq!(song.video_id, "UBS4Gi1y_nc");
        assert_eq!(song.duration.as_deref(), Some("6:07"));
    }

    #[test]
    fn test_parse_defaults() {
        let raw = json!({ "videoId": "abc" });
        let song = song_from_catalog_entry(&raw).unwrap();
        assert_eq!(song.title, UNKNOWN_TITLE);
        assert_eq!(song.artist, UNKNOWN_ARTIST);
        assert_eq!(song.duration, None);
    }

    #[test]
    fn test_parse_duration_object() {
        let raw = json!({ "videoId": "abc", "duration": {"text": "4:20"} });
        let song = song_from_catalog_entry(&raw).unwrap();
        assert_eq!(song.duration.as_deref(), Some("4:20"));
    }

    #[test]
    fn test_parse_empty_artists() {
        let raw = json!({ "videoId": "abc", "title": "T", "artists": [] });
        let song = song_from_catalog_entry(&raw).unwrap();
        assert_eq!(song.artist, UNKNOWN_ARTIST);
    }

    #[test]
    fn test_parse_missing_id() {
        let raw = json!({ "title": "no id" });
        assert_eq!(
            song_from_catalog_entry(&raw),
            Err(ParseError::MissingVideoId)
        );
        assert_eq!(
            song_from_catalog_entry(&json!("nope")),
            Err(ParseError::NotAnObject)
        );
    }

    #[test]
    fn test_same_track_ignores_metadata() {
        let a = Song::new("A", "x", "id1");
        let b = Song::new("A (remaster)", "y", "id1");
        assert!(a.same_track(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn test_stream_url() {
        let s = Song::new("t", "a", "dQw4w9WgXcQ");
        assert_eq!(s.stream_url(), "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
    }

    #[test]
    fn test_serde_roundtrip_is_lossless() {
        let s = Song::new("t", "a", "id").with_duration("1:00");
        let json = serde_json::to_string(&s).unwrap();
        let back: Song = serde_json::from_str(&json).unwrap();
        assert_eq!(s, back);
    }
}
