//! Configuration file loading and data folder resolution
//!
//! Resolution priority for every setting:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! `clap` handles 1 and 2 in the binaries; this module provides 3 and 4.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Application directory name under the platform config/data dirs
pub const APP_DIR: &str = "cowatch";

/// Default hub port
pub const DEFAULT_PORT: u16 = 3100;

/// Default hub bind address
pub const DEFAULT_BIND: &str = "0.0.0.0";

/// Contents of `config.toml`; every key is optional
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ConfigFile {
    pub data_folder: Option<PathBuf>,
    pub port: Option<u16>,
    pub bind: Option<String>,
    pub static_dir: Option<PathBuf>,
}

impl ConfigFile {
    /// Parse a config file from disk
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load the first config file found in the platform locations.
    ///
    /// A missing file yields the empty config; an unparsable one is logged and
    /// ignored so a typo never prevents startup.
    pub fn discover() -> Self {
        let Some(path) = find_config_file() else {
            debug!("No config file found, using defaults");
            return Self::default();
        };
        match Self::from_path(&path) {
            Ok(config) => {
                debug!("Loaded config file {}", path.display());
                config
            }
            Err(e) => {
                warn!("Ignoring config file: {}", e);
                Self::default()
            }
        }
    }
}

/// Resolve the data folder: CLI/env value first, then config file, then OS default
pub fn resolve_data_folder(explicit: Option<&Path>, config: &ConfigFile) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if let Some(path) = &config.data_folder {
        return path.clone();
    }
    default_data_folder()
}

/// Platform config file location, if one exists
fn find_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc").join(APP_DIR).join("config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// OS-dependent default data folder
pub fn default_data_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/cowatch
        dirs::data_local_dir()
            .map(|d| d.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from("/var/lib").join(APP_DIR))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/cowatch
        dirs::data_dir()
            .map(|d| d.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support").join(APP_DIR))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\cowatch
        dirs::data_local_dir()
            .map(|d| d.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData").join(APP_DIR))
    } else {
        PathBuf::from("./cowatch_data")
    }
}
