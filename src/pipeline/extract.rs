//! # Extractor
//!
//! Stateful per-buffer scan: joins each chunk onto the carry, finds pattern
//! occurrences, measures them and hands complete images to the sink.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use tracing::trace;

use crate::carry::CarryBuffer;
use crate::carve::class;
use crate::carve::{Artifact, ArtifactSink, Reject};
use crate::config::ScanPattern;
use crate::scanner::SignatureScanner;

use super::{ScanLimits, ScanStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stopped,
}

pub struct Extractor<'a> {
    pattern: &'a ScanPattern,
    scanner: &'a dyn SignatureScanner,
    limits: ScanLimits,
    carry: CarryBuffer,
    next_index: u64,
    stats: ScanStats,
}

impl<'a> Extractor<'a> {
    pub fn new(
        pattern: &'a ScanPattern,
        scanner: &'a dyn SignatureScanner,
        limits: ScanLimits,
    ) -> Self {
        let limits = limits.normalized();
        Self {
            pattern,
            scanner,
            limits,
            carry: CarryBuffer::new(limits.chunk_size, limits.max_artifact_size),
            next_index: 0,
            stats: ScanStats::default(),
        }
    }

    /// Scan `chunk`, which starts at `address`, together with any carried
    /// bytes. Carried bytes that do not end exactly at `address` are flushed
    /// on their own first.
    pub fn push_chunk(
        &mut self,
        address: u64,
        chunk: &[u8],
        sink: &dyn ArtifactSink,
        stop: &AtomicBool,
    ) -> Flow {
        if !self.carry.continues_at(address) && self.finish(sink, stop) == Flow::Stopped {
            return Flow::Stopped;
        }
        self.carry.assemble(address, chunk);
        self.drain(sink, stop, false)
    }

    /// Scan whatever is still carried, treating it as the end of the data.
    pub fn finish(&mut self, sink: &dyn ArtifactSink, stop: &AtomicBool) -> Flow {
        if !self.carry.has_carry() {
            return Flow::Continue;
        }
        self.carry.assemble_final();
        self.drain(sink, stop, true)
    }

    fn drain(&mut self, sink: &dyn ArtifactSink, stop: &AtomicBool, last: bool) -> Flow {
        let buf = self.carry.working();
        let origin = self.carry.working_origin();
        let pattern_len = self.scanner.pattern_len();
        let stride = self.limits.yield_stride;

        let mut pos = 0usize;
        let mut checkpoint = stride;
        let mut retain_from = None;

        while pattern_len > 0 && pos + pattern_len <= buf.len() {
            if pos >= checkpoint {
                if stop.load(Ordering::Relaxed) {
                    self.carry.clear();
                    return Flow::Stopped;
                }
                thread::yield_now();
                checkpoint = pos.saturating_add(stride);
            }

            let last_start = buf.len() - pattern_len;
            let window_end = checkpoint.min(last_start + 1);
            let haystack = &buf[..window_end + pattern_len - 1];
            let Some(offset) = self.scanner.find(haystack, pos) else {
                pos = window_end;
                continue;
            };

            match class::measure(
                buf,
                offset,
                self.pattern.header(),
                self.limits.max_artifact_size,
            ) {
                Ok(len) => {
                    self.stats.candidates += 1;
                    let artifact = Artifact {
                        index: self.next_index,
                        address: origin.saturating_add(offset as u64),
                        bytes: &buf[offset..offset + len],
                    };
                    self.next_index += 1;
                    if sink.persist(&artifact) {
                        self.stats.artifacts_written += 1;
                    } else {
                        self.stats.write_failures += 1;
                    }
                    pos = offset + len;
                }
                Err(Reject::Truncated) if !last => {
                    retain_from = Some(offset);
                    break;
                }
                Err(reject) => {
                    trace!("candidate at {:#x} rejected: {reject}", origin + offset as u64);
                    self.stats.candidates += 1;
                    self.stats.rejected += 1;
                    pos = offset + 1;
                }
            }
        }

        if last {
            self.carry.clear();
        } else {
            self.carry.retain(retain_from.unwrap_or(pos));
        }
        Flow::Continue
    }

    /// Address ranges of the buffers this extractor owns.
    pub fn owned_ranges(&self) -> [(u64, u64); 2] {
        self.carry.owned_ranges()
    }

    pub fn stats(&self) -> &ScanStats {
        &self.stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut ScanStats {
        &mut self.stats
    }

    pub fn into_stats(self) -> ScanStats {
        self.stats
    }
}

impl std::fmt::Debug for Extractor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extractor")
            .field("pattern", &self.pattern)
            .field("limits", &self.limits)
            .field("carry", &self.carry)
            .field("next_index", &self.next_index)
            .finish()
    }
}
