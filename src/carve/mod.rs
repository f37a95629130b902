pub mod class;
pub mod cursor;

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::constants::CLASS_EXTENSION;

/// Why a candidate did not decode into a complete structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Reject {
    #[error("header does not match the scan pattern")]
    HeaderMismatch,
    #[error("structure runs past the available bytes")]
    Truncated,
    #[error("structure exceeds the maximum artifact size")]
    Oversized,
}

/// A validated class image found during a scan.
#[derive(Debug, Clone, Copy)]
pub struct Artifact<'a> {
    pub index: u64,
    pub address: u64,
    pub bytes: &'a [u8],
}

/// Destination for carved artifacts.
pub trait ArtifactSink: Send + Sync {
    /// Store `artifact`. Returns `false` if it was dropped.
    fn persist(&self, artifact: &Artifact<'_>) -> bool;
}

/// Writes each artifact verbatim to `<dir>/<index>.class`.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn write(&self, artifact: &Artifact<'_>) -> std::io::Result<PathBuf> {
        let path = output_path(&self.dir, artifact.index)?;
        let mut file = File::create(&path)?;
        file.write_all(artifact.bytes)?;
        file.flush()?;
        Ok(path)
    }
}

impl ArtifactSink for ArtifactWriter {
    fn persist(&self, artifact: &Artifact<'_>) -> bool {
        debug_assert!(!artifact.bytes.is_empty());
        match self.write(artifact) {
            Ok(path) => {
                info!(
                    "carved class #{} at {:#x} ({} bytes) -> {}",
                    artifact.index,
                    artifact.address,
                    artifact.bytes.len(),
                    path.display()
                );
                debug!("class #{} sha256={}", artifact.index, sha256_hex(artifact.bytes));
                true
            }
            Err(err) => {
                warn!("failed to write class #{}: {err}", artifact.index);
                false
            }
        }
    }
}

/// Path for artifact `index` under `dir`, creating `dir` when missing.
pub fn output_path(dir: &Path, index: u64) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    Ok(dir.join(format!("{index}.{CLASS_EXTENSION}")))
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
