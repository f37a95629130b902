//! Attaching the scanner to the hosting process.
//!
//! `attach` is what a loader calls once the library is inside the target
//! process: it brings up logging, reads the config and starts one scan of
//! the process's own memory in the background.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::carve::ArtifactWriter;
use crate::config;
use crate::logging;
use crate::memory::{self, AddressSpace};
use crate::paths::AppPaths;
use crate::pipeline::ScanStats;
use crate::pipeline::controller::ScanController;

pub fn attach(paths: &AppPaths) -> Result<ScanController> {
    let log_dir = paths.log_dir();
    logging::init_logging(Some(log_dir.as_path()));

    let loaded = config::load_or_init(&paths.config_path());
    info!(
        "attached: base={} pattern={} config_sha256={}",
        paths.base().display(),
        loaded.pattern,
        loaded.config_hash
    );

    let space: Arc<dyn AddressSpace> = Arc::from(
        memory::open_self().context("failed to open own address space")?,
    );
    let writer = ArtifactWriter::new(paths.dump_dir());
    let controller = ScanController::new(Arc::new(writer));
    if !controller.start(space, loaded.pattern) {
        anyhow::bail!("scan could not be started");
    }
    Ok(controller)
}

/// Stop the scan started by [`attach`] and wait for its thread.
pub fn detach(controller: ScanController) -> Option<ScanStats> {
    let stats = controller.shutdown()?;
    info!(
        "detached: carved={} cancelled={}",
        stats.artifacts_written, stats.cancelled
    );
    Some(stats)
}
