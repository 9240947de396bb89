//! Client configuration
//!
//! Read from `~/.lovelink/config.toml`. The file is created with defaults the
//! first time it is read; a file that fails to parse is left untouched and the
//! defaults are used for this run. `LOVELINK_SERVER` overrides the server address.

pub mod structs;

use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

pub use structs::Config;

pub const SERVER_ENV: &str = "LOVELINK_SERVER";

/// Base directory for everything the client persists
pub fn base_dir() -> PathBuf {
    match home::home_dir() {
        Some(path) => path.join(".lovelink"),
        None => PathBuf::from(".lovelink"),
    }
}

pub fn config_path() -> PathBuf {
    base_dir().join("config.toml")
}

/// Read the config from its default location
pub fn read() -> Config {
    let mut config = read_from(&config_path());

    if let Ok(server) = std::env::var(SERVER_ENV) {
        if !server.trim().is_empty() {
            log::debug!("{SERVER_ENV} set, using server {server}");
            config.server_url = server;
        }
    }

    config
}

pub fn read_from(path: &Path) -> Config {
    match fs::read_to_string(path) {
        Ok(contents) => match parse(&contents) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("Failed to parse {}: {err}, using defaults", path.display());
                Config::default()
            }
        },
        Err(_) => {
            let config = Config::default();
            if let Err(err) = write_to(path, &config) {
                log::warn!("Could not create {}: {err}", path.display());
            } else {
                log::info!("Created default config at {}", path.display());
            }
            config
        }
    }
}

pub fn parse(contents: &str) -> Result<Config> {
    Ok(toml::from_str(contents)?)
}

pub fn write_to(path: &Path, config: &Config) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let contents = toml::to_string(config)?;
    fs::write(path, contents)?;
    Ok(())
}

impl Config {
    pub fn storage_path(&self) -> PathBuf {
        self.storage_path
            .clone()
            .unwrap_or_else(|| base_dir().join("storage.json"))
    }
}
