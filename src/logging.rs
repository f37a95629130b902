use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_FILE_NAME: &str = "log.txt";

/// Install the global subscriber: `RUST_LOG` filtering (default `info`),
/// stderr output and, when `log_dir` is given, an appended `log.txt`.
///
/// Safe to call more than once; later calls leave the first subscriber in
/// place.
pub fn init_logging(log_dir: Option<&Path>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = log_dir.and_then(open_log_file).map(|file| {
        fmt::layer()
            .with_ansi(false)
            .with_thread_names(true)
            .with_writer(Mutex::new(file))
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init();
}

fn open_log_file(dir: &Path) -> Option<File> {
    if let Err(err) = std::fs::create_dir_all(dir) {
        eprintln!("cannot create log directory {}: {err}", dir.display());
        return None;
    }
    let path = dir.join(LOG_FILE_NAME);
    match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => Some(file),
        Err(err) => {
            eprintln!("cannot open log file {}: {err}", path.display());
            None
        }
    }
}
