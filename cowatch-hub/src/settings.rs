//! Hub settings
//!
//! `clap` covers command-line arguments and environment variables; anything
//! left unset falls back to the TOML config file, then to compiled defaults.

use clap::Parser;
use cowatch_common::config::{resolve_data_folder, ConfigFile, DEFAULT_BIND, DEFAULT_PORT};
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Command-line arguments for cowatch-hub
#[derive(Parser, Debug, Default)]
#[command(name = "cowatch-hub")]
#[command(about = "Relay hub for synchronized playback sessions")]
#[command(version)]
pub struct CliArgs {
    /// Port to listen on
    #[arg(short, long, env = "COWATCH_PORT")]
    pub port: Option<u16>,

    /// Address to bind
    #[arg(short, long, env = "COWATCH_BIND")]
    pub bind: Option<String>,

    /// Folder holding session/session.db
    #[arg(short, long, env = "COWATCH_DATA_FOLDER")]
    pub data_folder: Option<PathBuf>,

    /// Directory with index.html and static/ to serve
    #[arg(short, long, env = "COWATCH_STATIC_DIR")]
    pub static_dir: Option<PathBuf>,

    /// Explicit config file (skips platform discovery)
    #[arg(short, long, env = "COWATCH_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Fully resolved hub settings
#[derive(Debug, Clone, PartialEq)]
pub struct HubSettings {
    pub port: u16,
    pub bind: String,
    pub data_folder: PathBuf,
    pub static_dir: Option<PathBuf>,
}

impl HubSettings {
    /// Resolve from arguments plus the discovered (or explicit) config file
    pub fn load(args: &CliArgs) -> Result<Self> {
        let file = match &args.config {
            Some(path) => ConfigFile::from_path(path)?,
            None => ConfigFile::discover(),
        };
        Ok(Self::resolve(args, &file))
    }

    pub fn resolve(args: &CliArgs, file: &ConfigFile) -> Self {
        Self {
            port: args.port.or(file.port).unwrap_or(DEFAULT_PORT),
            bind: args
                .bind
                .clone()
                .or_else(|| file.bind.clone())
                .unwrap_or_else(|| DEFAULT_BIND.to_string()),
            data_folder: resolve_data_folder(args.data_folder.as_deref(), file),
            static_dir: args.static_dir.clone().or_else(|| file.static_dir.clone()),
        }
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.bind, self.port)
            .parse()
            .map_err(|e| Error::Http(format!("Invalid bind address {}:{}: {}", self.bind, self.port, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_nothing_set() {
        let settings = HubSettings::resolve(&CliArgs::default(), &ConfigFile::default());
        assert_eq!(settings.port, DEFAULT_PORT);
        assert_eq!(settings.bind, DEFAULT_BIND);
        assert!(settings.static_dir.is_none());
    }

    #[test]
    fn test_args_override_config_file() {
        let args = CliArgs {
            port: Some(4000),
            ..Default::default()
        };
        let file = ConfigFile {
            port: Some(5000),
            bind: Some("127.0.0.1".to_string()),
            ..Default::default()
        };
        let settings = HubSettings::resolve(&args, &file);
        assert_eq!(settings.port, 4000);
        assert_eq!(settings.bind, "127.0.0.1");
    }

    #[test]
    fn test_socket_addr() {
        let settings = HubSettings::resolve(
            &CliArgs {
                bind: Some("127.0.0.1".to_string()),
                port: Some(3100),
                ..Default::default()
            },
            &ConfigFile::default(),
        );
        assert_eq!(settings.socket_addr().unwrap().port(), 3100);

        let bad = HubSettings {
            bind: "not an address".to_string(),
            ..settings
        };
        assert!(bad.socket_addr().is_err());
    }
}
