//! Single-flight scan control.
//!
//! At most one scan runs at a time. `start` claims the running flag with a
//! compare-and-set, so concurrent callers race safely and the losers get
//! `false` back without touching the running scan.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use crate::carve::ArtifactSink;
use crate::config::ScanPattern;
use crate::memory::AddressSpace;

use super::{ScanLimits, ScanStats, run_scan};

const SCAN_THREAD_NAME: &str = "classcarve-scan";

pub struct ScanController {
    running: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
    sink: Arc<dyn ArtifactSink>,
    limits: ScanLimits,
    handle: Mutex<Option<JoinHandle<ScanStats>>>,
}

/// Ends a scan's claim on the controller when its thread exits, including
/// by panic. The stop request is consumed before the running flag is
/// released, so a stop raised while idle still applies to the next scan.
struct RunningGuard {
    running: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.stop.store(false, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
    }
}

impl ScanController {
    pub fn new(sink: Arc<dyn ArtifactSink>) -> Self {
        Self::with_limits(sink, ScanLimits::default())
    }

    pub fn with_limits(sink: Arc<dyn ArtifactSink>, limits: ScanLimits) -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            stop: Arc::new(AtomicBool::new(false)),
            sink,
            limits,
            handle: Mutex::new(None),
        }
    }

    /// Launch a background scan of `space`. Returns `false` if a scan is
    /// already running or the thread could not be spawned.
    pub fn start(&self, space: Arc<dyn AddressSpace>, pattern: ScanPattern) -> bool {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("scan already running; start ignored");
            return false;
        }

        let mut slot = match self.handle.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(Err(_)) = slot.take().map(JoinHandle::join) {
            warn!("previous scan thread panicked");
        }

        let guard = RunningGuard {
            running: Arc::clone(&self.running),
            stop: Arc::clone(&self.stop),
        };
        let stop = Arc::clone(&self.stop);
        let sink = Arc::clone(&self.sink);
        let limits = self.limits;
        let spawned = thread::Builder::new()
            .name(SCAN_THREAD_NAME.to_string())
            .spawn(move || {
                let _guard = guard;
                run_scan(space.as_ref(), &pattern, sink.as_ref(), limits, &stop)
            });

        match spawned {
            Ok(handle) => {
                *slot = Some(handle);
                info!("scan thread launched");
                true
            }
            Err(err) => {
                // The failed spawn dropped the closure and its guard, which
                // already released the running flag.
                warn!("failed to spawn scan thread: {err}");
                self.running.store(false, Ordering::SeqCst);
                false
            }
        }
    }

    /// Ask the running scan to stop at its next checkpoint. With no scan
    /// running, the request cancels the next one.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Block until the current scan finishes and return its counters.
    /// `None` when no scan was started or the scan thread panicked.
    pub fn wait(&self) -> Option<ScanStats> {
        let handle = match self.handle.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }?;
        match handle.join() {
            Ok(stats) => Some(stats),
            Err(_) => {
                warn!("scan thread panicked");
                None
            }
        }
    }

    /// Stop any running scan and wait for it to exit.
    pub fn shutdown(&self) -> Option<ScanStats> {
        self.stop();
        self.wait()
    }

    /// Handle for wiring external signals (for example Ctrl+C) to `stop`.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }
}

impl Drop for ScanController {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

impl std::fmt::Debug for ScanController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanController")
            .field("running", &self.is_running())
            .field("stop", &self.stop.load(Ordering::Relaxed))
            .field("limits", &self.limits)
            .finish()
    }
}
