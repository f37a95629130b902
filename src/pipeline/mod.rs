//! # Pipeline Module
//!
//! Walks an address space region by region, feeds chunks through the
//! [`Extractor`](extract::Extractor) and reports what was carved. The
//! [`ScanController`](controller::ScanController) runs this on a background
//! thread.

pub mod controller;
pub mod extract;

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Instant;

use tracing::{debug, info};

use crate::carve::ArtifactSink;
use crate::chunk::{ChunkReader, ChunkSpan, region_chunks};
use crate::config::ScanPattern;
use crate::constants::{MAX_ARTIFACT_SIZE, YIELD_STRIDE};
use crate::memory::{AddressSpace, Regions};
use crate::scanner::build_signature_scanner;

use extract::{Extractor, Flow};

/// Size limits for one scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanLimits {
    /// Largest structure carved; also the cap on carried bytes.
    pub max_artifact_size: usize,
    pub chunk_size: usize,
    /// Positions scanned between stop checks.
    pub yield_stride: usize,
}

impl Default for ScanLimits {
    fn default() -> Self {
        Self {
            max_artifact_size: MAX_ARTIFACT_SIZE,
            chunk_size: MAX_ARTIFACT_SIZE,
            yield_stride: YIELD_STRIDE,
        }
    }
}

impl ScanLimits {
    /// Zero sizes become 1; the chunk never exceeds the artifact cap.
    pub fn normalized(self) -> Self {
        let max_artifact_size = self.max_artifact_size.max(1);
        Self {
            max_artifact_size,
            chunk_size: self.chunk_size.clamp(1, max_artifact_size),
            yield_stride: self.yield_stride.max(1),
        }
    }
}

/// Counters collected during a scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub regions_scanned: u64,
    pub bytes_read: u64,
    pub chunks_skipped: u64,
    /// Matches that were either carved or rejected. A match carried into
    /// the next chunk is counted once, when it is resolved.
    pub candidates: u64,
    pub rejected: u64,
    pub artifacts_written: u64,
    pub write_failures: u64,
    pub cancelled: bool,
}

/// Scan every readable region of `space` for `pattern`, handing each
/// complete structure to `sink`. Returns early, with `cancelled` set, once
/// `stop` is raised.
pub fn run_scan(
    space: &dyn AddressSpace,
    pattern: &ScanPattern,
    sink: &dyn ArtifactSink,
    limits: ScanLimits,
    stop: &AtomicBool,
) -> ScanStats {
    let limits = limits.normalized();
    let scanner = build_signature_scanner(pattern);
    let mut extractor = Extractor::new(pattern, scanner.as_ref(), limits);
    let mut reader = ChunkReader::new(limits.chunk_size);
    let started = Instant::now();
    let live = space.is_live();

    info!(
        "scan started: pattern={} chunk_size={} max_artifact_size={}",
        pattern, limits.chunk_size, limits.max_artifact_size
    );

    let mut cancelled = false;
    'regions: for region in Regions::new(space) {
        if stop.load(Ordering::Relaxed) {
            cancelled = true;
            break;
        }
        debug!("region {:#x}..{:#x}", region.base, region.end());
        extractor.stats_mut().regions_scanned += 1;

        for span in region_chunks(region, limits.chunk_size) {
            if stop.load(Ordering::Relaxed) {
                cancelled = true;
                break 'regions;
            }
            if live && overlaps_own_buffers(span, &reader, &extractor) {
                debug!("skipping scanner-owned chunk at {:#x}", span.address);
                extractor.stats_mut().chunks_skipped += 1;
                continue;
            }
            let Some(chunk) = reader.read(space, span) else {
                extractor.stats_mut().chunks_skipped += 1;
                continue;
            };
            extractor.stats_mut().bytes_read += chunk.len() as u64;
            if extractor.push_chunk(span.address, chunk, sink, stop) == Flow::Stopped {
                cancelled = true;
                break 'regions;
            }
        }
        thread::yield_now();
    }

    if !cancelled && extractor.finish(sink, stop) == Flow::Stopped {
        cancelled = true;
    }

    let mut stats = extractor.into_stats();
    stats.cancelled = cancelled;
    info!(
        "scan {}: regions={} bytes={} candidates={} carved={} rejected={} failed_writes={} elapsed={:.2?}",
        if cancelled { "cancelled" } else { "finished" },
        stats.regions_scanned,
        stats.bytes_read,
        stats.candidates,
        stats.artifacts_written,
        stats.rejected,
        stats.write_failures,
        started.elapsed()
    );
    stats
}

fn overlaps_own_buffers(span: ChunkSpan, reader: &ChunkReader, extractor: &Extractor<'_>) -> bool {
    let [working, carry] = extractor.owned_ranges();
    [reader.owned_range(), working, carry]
        .into_iter()
        .any(|(start, end)| start < end && span.address < end && start < span.end())
}
