use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

use super::platform;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Player executable. A bare name is looked up on PATH.
    #[serde(default = "default_player_binary")]
    pub binary: String,
    /// Extra arguments placed before the stream locator.
    #[serde(default = "default_player_args")]
    pub args: Vec<String>,
    /// 0–100.
    #[serde(default = "default_volume")]
    pub volume: u8,
    /// Resolve the direct audio URL with yt-dlp before spawning the player.
    #[serde(default)]
    pub resolve_with_yt_dlp: bool,
    /// Argument substrings that mark a foreign player process as one of ours
    /// (left behind by an earlier session).
    #[serde(default = "default_signature")]
    pub signature: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_language")]
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
    /// Player stderr goes here instead of the terminal.
    #[serde(default = "default_player_log")]
    pub player_log: PathBuf,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            binary: default_player_binary(),
            args: default_player_args(),
            volume: default_volume(),
            resolve_with_yt_dlp: false,
            signature: default_signature(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            search_limit: default_search_limit(),
            timeout_secs: default_timeout_secs(),
            language: default_language(),
        }
    }
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            state_file: default_state_file(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            log_file: default_log_file(),
            player_log: default_player_log(),
        }
    }
}

fn default_player_binary() -> String {
    platform::mpv_binary_name().to_string()
}

fn default_player_args() -> Vec<String> {
    vec![
        "--no-video".to_string(),
        "--really-quiet".to_string(),
        "--no-terminal".to_string(),
    ]
}

fn default_volume() -> u8 {
    80
}

fn default_signature() -> Vec<String> {
    vec!["youtube.com".to_string(), "--no-video".to_string()]
}

fn default_base_url() -> String {
    "https://music.youtube.com/youtubei/v1".to_string()
}

fn default_search_limit() -> usize {
    20
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_language() -> String {
    "en".to_string()
}

fn default_state_file() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".ytradio_state.json")
}

fn default_log_file() -> PathBuf {
    platform::data_dir().join("ytradio.log")
}

fn default_player_log() -> PathBuf {
    platform::data_dir().join("player-stderr.log")
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load `path`, creating it with defaults on first run, then apply
    /// environment overrides.
    pub fn load_from(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            config
        } else {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content)?
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn save_to(&self, path: &std::path::Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }

    /// `YTRADIO_SEARCH_LIMIT`, `YTRADIO_VOLUME` (clamped to 0–100) and
    /// `YTRADIO_MPV`. Unparsable values are ignored with a warning.
    pub fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(raw) = var("YTRADIO_SEARCH_LIMIT") {
            match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => self.catalog.search_limit = n,
                _ => warn!("ignoring YTRADIO_SEARCH_LIMIT={:?}", raw),
            }
        }
        if let Some(raw) = var("YTRADIO_VOLUME") {
            match raw.trim().parse::<i64>() {
                Ok(v) => self.player.volume = v.clamp(0, 100) as u8,
                Err(_) => warn!("ignoring YTRADIO_VOLUME={:?}", raw),
            }
        }
        if let Some(bin) = var("YTRADIO_MPV") {
            if !bin.trim().is_empty() {
                self.player.binary = bin;
            }
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            player: PlayerConfig::default(),
            catalog: CatalogConfig::default(),
            state: StateConfig::default(),
            paths: PathsConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.player.volume, 80);
        assert_eq!(config.catalog.search_limit, 20);
        assert_eq!(config.catalog.timeout_secs, 10);
        assert!(config.player.args.contains(&"--no-video".to_string()));
        assert!(config.state.state_file.ends_with(".ytradio_state.json"));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str("[player]\nvolume = 30\n").unwrap();
        assert_eq!(config.player.volume, 30);
        assert_eq!(config.player.binary, default_player_binary());
        assert_eq!(config.catalog.search_limit, 20);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_env_overrides(env(&[
            ("YTRADIO_SEARCH_LIMIT", "7"),
            ("YTRADIO_VOLUME", "250"),
            ("YTRADIO_MPV", "/opt/mpv"),
        ]));
        assert_eq!(config.catalog.search_limit, 7);
        assert_eq!(config.player.volume, 100);
        assert_eq!(config.player.binary, "/opt/mpv");

        config.apply_env_overrides(env(&[("YTRADIO_VOLUME", "-5"), ("YTRADIO_SEARCH_LIMIT", "x")]));
        assert_eq!(config.player.volume, 0);
        assert_eq!(config.catalog.search_limit, 7);
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.catalog.language, "en");
    }
}
