//! Default paths for janitor components
//!
//! Paths are user-writable by default (no root required):
//! - Config: `$XDG_CONFIG_HOME/janitor/config.toml` or `~/.config/janitor/config.toml`
//! - Data: `$XDG_DATA_HOME/janitor` or `~/.local/share/janitor`
//! - Reports: `<data dir>/reports`

use std::path::PathBuf;

/// Environment variable for overriding the config file path
pub const JANITOR_CONFIG_ENV: &str = "JANITOR_CONFIG";

/// Config filename within the config directory
const CONFIG_FILENAME: &str = "config.toml";

/// Application subdirectory name
const APP_DIR: &str = "janitor";

/// Reports subdirectory within the data directory
const REPORTS_DIR: &str = "reports";

/// Get the default config file path.
///
/// Order of precedence:
/// 1. `$JANITOR_CONFIG` environment variable (if set)
/// 2. `$XDG_CONFIG_HOME/janitor/config.toml` (if XDG_CONFIG_HOME is set)
/// 3. `~/.config/janitor/config.toml` (fallback)
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(JANITOR_CONFIG_ENV) {
        return PathBuf::from(path);
    }

    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join(APP_DIR).join(CONFIG_FILENAME);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join(CONFIG_FILENAME);
    }

    PathBuf::from("/etc").join(APP_DIR).join(CONFIG_FILENAME)
}

/// Get the default data directory.
///
/// `$XDG_DATA_HOME/janitor`, falling back to `~/.local/share/janitor`.
/// The binary's `--data-dir` / `JANITOR_DATA_DIR` override takes precedence.
pub fn default_data_dir() -> PathBuf {
    if let Ok(data_home) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(data_home).join(APP_DIR);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR);
    }

    // Last resort
    PathBuf::from("/tmp").join(APP_DIR).join("data")
}

/// Get the default report directory for a given data directory.
pub fn report_dir_in(data_dir: &std::path::Path) -> PathBuf {
    data_dir.join(REPORTS_DIR)
}
