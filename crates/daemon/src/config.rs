// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration: TOML file plus command-line overrides.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use pairlog_adapters::ClientConfig;
use pairlog_engine::{OverlayConfig, ReplicationConfig};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {0}: {1}")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Daemon configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub listen: SocketAddr,
    /// Holds the commit log, the pid lock and (by default) the object store
    pub data_dir: PathBuf,
    /// API key required in `X-Api-Key` when set
    pub token: Option<String>,
    /// Base URI of the peer's log surface, e.g. `http://host:4001/log`
    pub peer: Option<String>,
    pub object_prefix: String,
    pub object_dir: Option<PathBuf>,
    #[serde(with = "humantime_serde")]
    pub flush_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub snapshot_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub repair_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub peer_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub peer_connect_timeout: Duration,
    pub peer_retries: u32,
    /// Daemon log file; stderr when absent
    pub log_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 4000)),
            data_dir: PathBuf::from("./data"),
            token: None,
            peer: None,
            object_prefix: "pairlog".to_string(),
            object_dir: None,
            flush_interval: Duration::from_secs(1),
            snapshot_interval: Duration::from_secs(60),
            repair_interval: Duration::from_secs(3),
            peer_timeout: Duration::from_secs(1),
            peer_connect_timeout: Duration::from_secs(3),
            peer_retries: 3,
            log_path: None,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.peer_retries == 0 {
            return Err(ConfigError::Invalid("peer_retries must be at least 1".into()));
        }
        for (name, interval) in [
            ("flush_interval", self.flush_interval),
            ("snapshot_interval", self.snapshot_interval),
            ("repair_interval", self.repair_interval),
        ] {
            if interval.is_zero() {
                return Err(ConfigError::Invalid(format!("{} must be non-zero", name)));
            }
        }
        if let Some(peer) = &self.peer {
            if !peer.starts_with("http://") && !peer.starts_with("https://") {
                return Err(ConfigError::Invalid(format!(
                    "peer must be an http(s) URI, got {:?}",
                    peer
                )));
            }
        }
        Ok(())
    }

    pub fn log_file(&self) -> PathBuf {
        self.data_dir.join("log").join("log.jsonl")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.data_dir.join("daemon.pid")
    }

    pub fn object_root(&self) -> PathBuf {
        self.object_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("objects"))
    }

    pub fn peer_client(&self) -> ClientConfig {
        ClientConfig {
            connect_timeout: self.peer_connect_timeout,
            timeout: self.peer_timeout,
        }
    }

    pub fn replication(&self) -> ReplicationConfig {
        ReplicationConfig {
            peer_retries: self.peer_retries,
            repair_interval: self.repair_interval,
        }
    }

    pub fn overlay(&self) -> OverlayConfig {
        OverlayConfig::default()
    }
}

/// Command-line arguments for `pairlogd`
#[derive(Debug, Default, Parser)]
#[command(name = "pairlogd", version, about = "Replicated commit log daemon")]
pub struct Args {
    /// TOML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub listen: Option<SocketAddr>,

    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Base URI of the peer's log surface
    #[arg(long)]
    pub peer: Option<String>,

    #[arg(long, env = "PAIRLOG_TOKEN")]
    pub token: Option<String>,

    #[arg(long)]
    pub log_path: Option<PathBuf>,
}

impl Args {
    /// Load the config file (or defaults) and apply overrides
    pub fn into_config(self) -> Result<Config, ConfigError> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if let Some(listen) = self.listen {
            config.listen = listen;
        }
        if let Some(data_dir) = self.data_dir {
            config.data_dir = data_dir;
        }
        if self.peer.is_some() {
            config.peer = self.peer;
        }
        if self.token.is_some() {
            config.token = self.token;
        }
        if self.log_path.is_some() {
            config.log_path = self.log_path;
        }
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
