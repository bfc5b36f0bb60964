use std::path::{Path, PathBuf};

pub fn data_dir() -> PathBuf {
    // ~/.local/share/ytradio on every unix, including macOS
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".local")
            .join("share")
            .join("ytradio")
    }
    #[cfg(windows)]
    {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ytradio")
    }
}

pub fn config_dir() -> PathBuf {
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("ytradio")
    }

    #[cfg(windows)]
    {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ytradio")
    }
}

#[cfg(unix)]
pub fn mpv_binary_name() -> &'static str {
    "mpv"
}

#[cfg(windows)]
pub fn mpv_binary_name() -> &'static str {
    "mpv.exe"
}

#[cfg(unix)]
fn yt_dlp_binary_names() -> &'static [&'static str] {
    &["yt-dlp"]
}

#[cfg(windows)]
fn yt_dlp_binary_names() -> &'static [&'static str] {
    &["yt-dlp.exe", "yt-dlp"]
}

fn find_on_path(names: &[&str]) -> Option<PathBuf> {
    let path = std::env::var("PATH").ok()?;
    #[cfg(unix)]
    let sep = ":";
    #[cfg(windows)]
    let sep = ";";
    for dir in path.split(sep) {
        for name in names {
            let p = PathBuf::from(dir).join(name);
            if p.exists() {
                return Some(p);
            }
        }
    }
    None
}

/// Resolve a configured player binary: paths are taken as-is when they
/// exist, bare names are searched on PATH.
pub fn resolve_binary(configured: &str) -> Option<PathBuf> {
    let as_path = Path::new(configured);
    if as_path.components().count() > 1 {
        return as_path.exists().then(|| as_path.to_path_buf());
    }
    find_on_path(&[configured])
}

/// Find yt-dlp.
///
/// Searches in order:
/// 1. YT_DLP_PATH environment variable
/// 2. PATH
pub fn find_yt_dlp_binary() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("YT_DLP_PATH") {
        let p = PathBuf::from(path);
        if p.exists() {
            return Some(p);
        }
    }

    find_on_path(yt_dlp_binary_names())
}

/// Per-OS hint shown when the player is missing.
pub fn player_install_hint() -> &'static str {
    if cfg!(target_os = "macos") {
        "brew install mpv"
    } else if cfg!(windows) {
        "winget install mpv  (or download from https://mpv.io)"
    } else {
        "sudo apt install mpv  /  sudo dnf install mpv  /  sudo pacman -S mpv"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirs_are_namespaced() {
        assert!(data_dir().ends_with("ytradio"));
        assert!(config_dir().ends_with("ytradio"));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_binary() {
        assert_eq!(resolve_binary("/bin/sh"), Some(PathBuf::from("/bin/sh")));
        assert_eq!(resolve_binary("/definitely/not/here"), None);
        assert!(resolve_binary("sh").is_some());
        assert_eq!(resolve_binary("ytradio-no-such-binary"), None);
    }
}
