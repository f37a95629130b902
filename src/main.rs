use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use classcarve::{
    carve::ArtifactWriter,
    cli,
    config,
    logging,
    memory::{self, AddressSpace, image::ImageFile},
    paths::AppPaths,
    pipeline::{ScanLimits, controller::ScanController},
};

fn main() -> Result<()> {
    let cli_opts = cli::parse();
    let paths = match cli_opts.base_dir.as_ref() {
        Some(base) => AppPaths::with_base(base),
        None => AppPaths::resolve(),
    };
    logging::init_logging(Some(paths.log_dir().as_path()));

    let config_path = cli_opts
        .config_path
        .clone()
        .unwrap_or_else(|| paths.config_path());
    let loaded = config::load_or_init(&config_path);
    let dump_dir = cli_opts.output.clone().unwrap_or_else(|| paths.dump_dir());

    let space: Arc<dyn AddressSpace> = match cli_opts.input.as_ref() {
        Some(image) => {
            let file = ImageFile::open(image)
                .with_context(|| format!("failed to open image {}", image.display()))?;
            info!("scanning image {} ({} bytes)", image.display(), file.len());
            Arc::new(file)
        }
        None => {
            info!("scanning own address space (pid {})", std::process::id());
            Arc::from(memory::open_self().context("failed to open own address space")?)
        }
    };

    let mut limits = ScanLimits::default();
    if let Some(kib) = cli_opts.chunk_size_kib {
        limits.chunk_size = kib.saturating_mul(1024);
    }

    info!(
        "starting: config={} config_sha256={} output={}",
        config_path.display(),
        loaded.config_hash,
        dump_dir.display()
    );

    let controller = ScanController::with_limits(Arc::new(ArtifactWriter::new(&dump_dir)), limits);
    let stop_flag = controller.stop_flag();
    if let Err(err) = ctrlc::set_handler(move || {
        stop_flag.store(true, std::sync::atomic::Ordering::SeqCst);
    }) {
        warn!("failed to install Ctrl+C handler: {err}");
    }

    if !controller.start(space, loaded.pattern) {
        anyhow::bail!("scan could not be started");
    }
    let stats = controller.wait().context("scan thread panicked")?;
    info!(
        "classcarve run {}: {} classes written to {}",
        if stats.cancelled { "cancelled" } else { "finished" },
        stats.artifacts_written,
        dump_dir.display()
    );
    Ok(())
}
