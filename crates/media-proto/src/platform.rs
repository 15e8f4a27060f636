use std::path::PathBuf;

const APP_DIR: &str = "media-picker";

/// `~/<xdg>/media-picker` on unix; the platform directory elsewhere.
fn app_dir(xdg: &[&str], fallback: Option<PathBuf>) -> PathBuf {
    let base = if cfg!(unix) {
        dirs::home_dir().map(|home| xdg.iter().fold(home, |p, part| p.join(part)))
    } else {
        fallback
    };
    base.unwrap_or_else(std::env::temp_dir).join(APP_DIR)
}

/// Log file and other runtime data. XDG layout on macOS too.
pub fn data_dir() -> PathBuf {
    app_dir(&[".local", "share"], dirs::data_local_dir())
}

pub fn config_dir() -> PathBuf {
    app_dir(&[".config"], dirs::config_dir())
}

pub fn mpv_binary_name() -> &'static str {
    if cfg!(windows) {
        "mpv.exe"
    } else {
        "mpv"
    }
}

/// Find the mpv binary used by the native player: `MPV_PATH`, then PATH.
pub fn find_mpv_binary() -> Option<PathBuf> {
    if let Some(explicit) = std::env::var_os("MPV_PATH").map(PathBuf::from) {
        if explicit.exists() {
            return Some(explicit);
        }
    }
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(mpv_binary_name()))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirs_are_app_scoped() {
        assert!(config_dir().ends_with(APP_DIR));
        assert!(data_dir().ends_with(APP_DIR));
        assert_ne!(config_dir(), data_dir());
    }
}
