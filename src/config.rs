use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{info, warn};

use crate::constants::DEFAULT_PATTERN;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid hex pattern: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("pattern is empty")]
    EmptyPattern,
    #[error("header size {header} exceeds pattern length {pattern}")]
    HeaderTooLong { header: usize, pattern: usize },
}

/// On-disk scan configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Hex bytes, optionally separated by whitespace (`"CA FE BA BE"`).
    /// Each token is decoded on its own, so `"A FE"` is two bytes.
    #[serde(default = "default_pattern_hex")]
    pub pattern: String,
    /// Length of the magic header; defaults to the whole pattern.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_size: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pattern: default_pattern_hex(),
            header_size: Some(DEFAULT_PATTERN.len()),
        }
    }
}

fn default_pattern_hex() -> String {
    DEFAULT_PATTERN
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

impl Config {
    /// Build the scan pattern, clamping an oversized header to the pattern.
    pub fn scan_pattern(&self) -> Result<ScanPattern, ConfigError> {
        let bytes = parse_hex_pattern(&self.pattern)?;
        let header = self.header_size.unwrap_or(bytes.len());
        let header = if header > bytes.len() {
            warn!(
                "header_size {header} exceeds pattern length {}; clamping",
                bytes.len()
            );
            bytes.len()
        } else {
            header
        };
        ScanPattern::new(bytes, header)
    }
}

/// Byte pattern searched for during a scan, plus how much of it is the
/// structure's magic header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPattern {
    bytes: Vec<u8>,
    header_len: usize,
}

impl ScanPattern {
    pub fn new(bytes: Vec<u8>, header_len: usize) -> Result<Self, ConfigError> {
        if bytes.is_empty() {
            return Err(ConfigError::EmptyPattern);
        }
        if header_len > bytes.len() {
            return Err(ConfigError::HeaderTooLong {
                header: header_len,
                pattern: bytes.len(),
            });
        }
        Ok(Self { bytes, header_len })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn header(&self) -> &[u8] {
        &self.bytes[..self.header_len]
    }

    pub fn header_len(&self) -> usize {
        self.header_len
    }
}

impl Default for ScanPattern {
    fn default() -> Self {
        Self {
            bytes: DEFAULT_PATTERN.to_vec(),
            header_len: DEFAULT_PATTERN.len(),
        }
    }
}

impl std::fmt::Display for ScanPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (header {})", hex::encode_upper(&self.bytes), self.header_len)
    }
}

/// Decode whitespace-separated hex tokens. Each token is decoded on its
/// own and an odd-length token gets a leading zero, so "A FE" is `0A FE`
/// while "CAFEBABE" is still four bytes.
pub fn parse_hex_pattern(text: &str) -> Result<Vec<u8>, ConfigError> {
    let mut bytes = Vec::new();
    for token in text.split_whitespace() {
        if token.len() % 2 == 1 {
            bytes.extend(hex::decode(format!("0{token}"))?);
        } else {
            bytes.extend(hex::decode(token)?);
        }
    }
    if bytes.is_empty() {
        return Err(ConfigError::EmptyPattern);
    }
    Ok(bytes)
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub pattern: ScanPattern,
    pub config_hash: String,
    /// True when the file did not exist and was written with defaults.
    pub created: bool,
}

impl LoadedConfig {
    fn defaults(created: bool) -> Self {
        let config = Config::default();
        let config_hash = serde_json::to_vec_pretty(&config)
            .map(|bytes| hash_bytes(&bytes))
            .unwrap_or_default();
        Self {
            config,
            pattern: ScanPattern::default(),
            config_hash,
            created,
        }
    }
}

/// Read the configuration at `path`, writing the defaults there first if the
/// file does not exist. Any failure falls back to the built-in defaults.
pub fn load_or_init(path: &Path) -> LoadedConfig {
    match load_config(path) {
        Ok(loaded) => loaded,
        Err(err) => {
            warn!("config {} unusable ({err}); using defaults", path.display());
            LoadedConfig::defaults(false)
        }
    }
}

pub fn load_config(path: &Path) -> Result<LoadedConfig, ConfigError> {
    if !path.exists() {
        write_default(path)?;
        info!("wrote default config to {}", path.display());
        return Ok(LoadedConfig::defaults(true));
    }

    let bytes = std::fs::read(path)?;
    let config: Config = serde_json::from_slice(&bytes)?;
    let pattern = config.scan_pattern()?;
    Ok(LoadedConfig {
        config,
        pattern,
        config_hash: hash_bytes(&bytes),
        created: false,
    })
}

fn write_default(path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let doc = serde_json::to_vec_pretty(&Config::default())?;
    std::fs::write(path, doc)?;
    Ok(())
}

fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    hex::encode(digest)
}
