//! Catalog access: the `CatalogProvider` seam and a YouTube Music client.
//!
//! The client speaks the InnerTube JSON API used by the music.youtube.com web
//! app. Responses are deeply nested renderer trees; we walk them for the two
//! renderer kinds we care about, flatten each hit into a catalog entry
//! (`title`, `artists`, `videoId`, `duration`) and let
//! [`song_from_catalog_entry`] do the final validation.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::CatalogConfig;
use crate::error::FetchError;
use crate::song::{song_from_catalog_entry, Song};

/// Anything that can answer "what plays well after this track" and free-text
/// search. Calls are idempotent and failures are non-fatal to callers.
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    async fn related_songs(&self, seed_id: &str, limit: usize) -> Result<Vec<Song>, FetchError>;

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Song>, FetchError>;
}

// ── InnerTube constants ───────────────────────────────────────────────────────

const CLIENT_NAME: &str = "WEB_REMIX";
const CLIENT_VERSION: &str = "1.20240101.01.00";
/// `params` value that restricts search results to songs.
const SONGS_FILTER: &str = "EgWKAQIIAWoMEA4QChADEAQQCRAF";
/// Watch-next playlist prefix that turns a video id into its radio mix.
const RADIO_PLAYLIST_PREFIX: &str = "RDAMVM";

// ── client ────────────────────────────────────────────────────────────────────

pub struct YtMusicClient {
    http: reqwest::Client,
    base_url: String,
    language: String,
}

impl YtMusicClient {
    pub fn new(config: &CatalogConfig) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0")
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            language: config.language.clone(),
        })
    }

    fn context(&self) -> Value {
        json!({
            "client": {
                "clientName": CLIENT_NAME,
                "clientVersion": CLIENT_VERSION,
                "hl": self.language,
            }
        })
    }

    async fn post(&self, endpoint: &str, mut body: Value) -> Result<Value, FetchError> {
        body["context"] = self.context();
        let url = format!("{}/{}?prettyPrint=false", self.base_url, endpoint);
        debug!("catalog: POST {}", url);

        let resp = self
            .http
            .post(&url)
            .header("Origin", "https://music.youtube.com")
            .json(&body)
            .send()
            .await
            .map_err(classify)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Api(format!("{} returned {}", endpoint, status)));
        }
        resp.json::<Value>().await.map_err(classify)
    }
}

fn classify(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Http(e)
    }
}

#[async_trait]
impl CatalogProvider for YtMusicClient {
    async fn related_songs(&self, seed_id: &str, limit: usize) -> Result<Vec<Song>, FetchError> {
        let body = json!({
            "videoId": seed_id,
            "playlistId": format!("{}{}", RADIO_PLAYLIST_PREFIX, seed_id),
            "isAudioOnly": true,
            "enablePersistentPlaylistPanel": true,
            "tunerSettingValue": "AUTOMIX_SETTING_NORMAL",
        });
        let resp = self.post("next", body).await?;
        let songs = parse_watch_playlist(&resp, limit);
        debug!("catalog: {} related songs for {}", songs.len(), seed_id);
        Ok(songs)
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Song>, FetchError> {
        let body = json!({ "query": query, "params": SONGS_FILTER });
        let resp = self.post("search", body).await?;
        let songs = parse_search_results(&resp, limit);
        debug!("catalog: {} results for {:?}", songs.len(), query);
        Ok(songs)
    }
}

// ── response walking ──────────────────────────────────────────────────────────

/// Collect every value stored under `key`, depth first, in document order.
fn collect_key<'a>(v: &'a Value, key: &str, out: &mut Vec<&'a Value>) {
    match v {
        Value::Object(map) => {
            for (k, child) in map {
                if k == key {
                    out.push(child);
                } else {
                    collect_key(child, key, out);
                }
            }
        }
        Value::Array(items) => {
            for child in items {
                collect_key(child, key, out);
            }
        }
        _ => {}
    }
}

/// First string stored under `key` anywhere below `v`.
fn find_str<'a>(v: &'a Value, key: &str) -> Option<&'a str> {
    let mut hits = Vec::new();
    collect_key(v, key, &mut hits);
    hits.into_iter().find_map(Value::as_str)
}

fn runs(v: Option<&Value>) -> Vec<&str> {
    v.and_then(|t| t.get("runs"))
        .and_then(Value::as_array)
        .map(|runs| {
            runs.iter()
                .filter_map(|r| r.get("text").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default()
}

fn looks_like_duration(s: &str) -> bool {
    let mut parts = 0;
    for p in s.split(':') {
        if p.is_empty() || !p.chars().all(|c| c.is_ascii_digit()) {
            return false;
        }
        parts += 1;
    }
    (2..=3).contains(&parts)
}

fn to_songs(entries: Vec<Value>, limit: usize) -> Vec<Song> {
    let mut songs = Vec::with_capacity(entries.len().min(limit));
    for entry in entries {
        if songs.len() >= limit {
            break;
        }
        match song_from_catalog_entry(&entry) {
            Ok(song) => songs.push(song),
            Err(e) => debug!("catalog: skipping entry: {}", e),
        }
    }
    songs
}

/// Flatten `playlistPanelVideoRenderer` nodes from a `next` response.
pub(crate) fn parse_watch_playlist(resp: &Value, limit: usize) -> Vec<Song> {
    let mut nodes = Vec::new();
    collect_key(resp, "playlistPanelVideoRenderer", &mut nodes);

    let entries = nodes
        .into_iter()
        .map(|node| {
            let title = runs(node.get("title")).first().copied().unwrap_or_default();
            let mut byline = runs(node.get("longBylineText"));
            if byline.is_empty() {
                byline = runs(node.get("shortBylineText"));
            }
            let artist = byline.first().copied().unwrap_or_default();
            let duration = runs(node.get("lengthText")).first().copied();
            json!({
                "title": title,
                "artists": [{ "name": artist }],
                "videoId": node.get("videoId").and_then(Value::as_str),
                "duration": duration,
            })
        })
        .collect();

    to_songs(entries, limit)
}

/// Flatten `musicResponsiveListItemRenderer` nodes from a `search` response.
pub(crate) fn parse_search_results(resp: &Value, limit: usize) -> Vec<Song> {
    let mut nodes = Vec::new();
    collect_key(resp, "musicResponsiveListItemRenderer", &mut nodes);

    let entries = nodes
        .into_iter()
        .filter_map(|node| {
            let columns: Vec<&Value> = node
                .get("flexColumns")
                .and_then(Value::as_array)?
                .iter()
                .filter_map(|c| c.get("musicResponsiveListItemFlexColumnRenderer"))
                .collect();
            let title = runs(columns.first().and_then(|c| c.get("text")));
            let detail = runs(columns.get(1).and_then(|c| c.get("text")));
            let video_id = node
                .get("playlistItemData")
                .and_then(|p| p.get("videoId"))
                .and_then(Value::as_str)
                .or_else(|| find_str(node, "videoId"));
            Some(json!({
                "title": title.first(),
                "artists": [{ "name": detail.first() }],
                "videoId": video_id,
                "duration": detail.iter().rev().find(|s| looks_like_duration(s)),
            }))
        })
        .collect();

    to_songs(entries, limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn panel_item(id: &str, title: &str, artist: &str, len: &str) -> Value {
        json!({
            "playlistPanelVideoRenderer": {
                "videoId": id,
                "title": { "runs": [{ "text": title }] },
                "longBylineText": { "runs": [{ "text": artist }, { "text": " • " }, { "text": "Album" }] },
                "lengthText": { "runs": [{ "text": len }] }
            }
        })
    }

    #[test]
    fn test_parse_watch_playlist() {
        let resp = json!({
            "contents": { "singleColumnMusicWatchNextResultsRenderer": { "tabbedRenderer": {
                "watchNextTabbedResultsRenderer": { "tabs": [{ "tabRenderer": { "content": {
                    "musicQueueRenderer": { "content": { "playlistPanelRenderer": { "contents": [
                        panel_item("id1", "Seed", "Artist A", "3:00"),
                        panel_item("id2", "Second", "Artist B", "4:01"),
                        { "automixPreviewVideoRenderer": {} },
                        panel_item("id3", "Third", "Artist C", "2:59"),
                    ]}}}
                }}}]}
            }}}
        });
        let songs = parse_watch_playlist(&resp, 10);
        assert_eq!(songs.len(), 3);
        assert_eq!(songs[1].video_id, "id2");
        assert_eq!(songs[1].artist, "Artist B");
        assert_eq!(songs[1].duration.as_deref(), Some("4:01"));

        let limited = parse_watch_playlist(&resp, 2);
        assert_eq!(limited.len(), 2);
    }

    #[test]
    fn test_parse_search_results() {
        let item = |id: Option<&str>, title: &str| {
            let mut node = json!({
                "flexColumns": [
                    { "musicResponsiveListItemFlexColumnRenderer": { "text": { "runs": [{ "text": title }] } } },
                    { "musicResponsiveListItemFlexColumnRenderer": { "text": { "runs": [
                        { "text": "Boards of Canada" }, { "text": " • " },
                        { "text": "Geogaddi" }, { "text": " • " }, { "text": "5:09" }
                    ] } } }
                ]
            });
            if let Some(id) = id {
                node["playlistItemData"] = json!({ "videoId": id });
            }
            json!({ "musicResponsiveListItemRenderer": node })
        };
        let resp = json!({ "contents": { "sectionListRenderer": { "contents": [
            { "musicShelfRenderer": { "contents": [
                item(Some("v1"), "Dawn Chorus"),
                item(None, "no id here"),
                item(Some("v2"), "Music Is Math"),
            ] } }
        ] } } });

        let songs = parse_search_results(&resp, 20);
        assert_eq!(songs.len(), 2);
        assert_eq!(songs[0].title, "Dawn Chorus");
        assert_eq!(songs[0].artist, "Boards of Canada");
        assert_eq!(songs[0].duration.as_deref(), Some("5:09"));
        assert_eq!(songs[1].video_id, "v2");
    }

    #[test]
    fn test_looks_like_duration() {
        assert!(looks_like_duration("3:45"));
        assert!(looks_like_duration("1:02:03"));
        assert!(!looks_like_duration("Geogaddi"));
        assert!(!looks_like_duration("3:"));
        assert!(!looks_like_duration("2002"));
    }
}
