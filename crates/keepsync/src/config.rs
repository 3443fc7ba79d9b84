//! Keeper configuration.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use keepsync_core::DOWNLOAD_PIECE_SIZE;
use keepsync_sync::SyncConfig;
use keepsync_transfer::AssemblerConfig;

pub const ENV_UPLOAD_TTL_SECS: &str = "KEEPSYNC_UPLOAD_TTL_SECS";
pub const ENV_SWEEP_INTERVAL_SECS: &str = "KEEPSYNC_SWEEP_INTERVAL_SECS";
pub const ENV_MAX_UPLOAD_PIECES: &str = "KEEPSYNC_MAX_UPLOAD_PIECES";
pub const ENV_MAX_UPLOAD_SIZE: &str = "KEEPSYNC_MAX_UPLOAD_SIZE";

/// An environment override that could not be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid value {value:?} for {var}: {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

/// Configuration for the Keeper.
#[derive(Debug, Clone)]
pub struct KeeperConfig {
    /// Upload session configuration.
    pub assembler: AssemblerConfig,
    /// Sync configuration.
    pub sync: SyncConfig,
    /// Piece size for downloads.
    pub download_piece_size: usize,
}

impl Default for KeeperConfig {
    fn default() -> Self {
        Self {
            assembler: AssemblerConfig::default(),
            sync: SyncConfig::default(),
            download_piece_size: DOWNLOAD_PIECE_SIZE,
        }
    }
}

impl KeeperConfig {
    /// Defaults overlaid with `KEEPSYNC_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Defaults overlaid with whatever `lookup` returns for each variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(secs) = parse_var::<u64, _>(&lookup, ENV_UPLOAD_TTL_SECS)? {
            config.assembler.upload_ttl = positive_secs(ENV_UPLOAD_TTL_SECS, secs)?;
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, ENV_SWEEP_INTERVAL_SECS)? {
            config.assembler.sweep_interval = positive_secs(ENV_SWEEP_INTERVAL_SECS, secs)?;
        }
        if let Some(pieces) = parse_var::<usize, _>(&lookup, ENV_MAX_UPLOAD_PIECES)? {
            if pieces == 0 {
                return Err(ConfigError {
                    var: ENV_MAX_UPLOAD_PIECES,
                    value: pieces.to_string(),
                    reason: "must be at least 1".into(),
                });
            }
            config.assembler.max_pieces = pieces;
        }
        if let Some(size) = parse_var::<u64, _>(&lookup, ENV_MAX_UPLOAD_SIZE)? {
            config.assembler.max_total_size = size;
        }

        Ok(config)
    }
}

fn parse_var<T, F>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|e: T::Err| ConfigError {
            var,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

fn positive_secs(var: &'static str, secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError {
            var,
            value: secs.to_string(),
            reason: "must be at least 1 second".into(),
        });
    }
    Ok(Duration::from_secs(secs))
}
