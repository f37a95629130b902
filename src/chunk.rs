use tracing::trace;

use crate::constants::MIN_READ_BYTES;
use crate::memory::{AddressSpace, Region};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSpan {
    pub address: u64,
    pub length: usize,
}

impl ChunkSpan {
    pub fn end(&self) -> u64 {
        self.address.saturating_add(self.length as u64)
    }
}

/// Split a region into consecutive spans of at most `chunk_size` bytes.
pub fn region_chunks(region: Region, chunk_size: usize) -> impl Iterator<Item = ChunkSpan> {
    let end = region.end();
    let mut cursor = region.base;
    std::iter::from_fn(move || {
        if chunk_size == 0 || cursor >= end {
            return None;
        }
        let length = (end - cursor).min(chunk_size as u64) as usize;
        let span = ChunkSpan {
            address: cursor,
            length,
        };
        cursor = cursor.saturating_add(length as u64);
        Some(span)
    })
}

/// Reads chunk spans into a single buffer allocated once, so its address
/// stays fixed for the lifetime of the reader.
pub struct ChunkReader {
    buf: Vec<u8>,
}

impl ChunkReader {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            buf: vec![0u8; chunk_size],
        }
    }

    /// Read `span`, returning the bytes actually read. Failed or short reads
    /// yield `None` and the chunk is skipped.
    pub fn read<'a>(&'a mut self, space: &dyn AddressSpace, span: ChunkSpan) -> Option<&'a [u8]> {
        let length = span.length.min(self.buf.len());
        let dest = &mut self.buf[..length];
        match space.read_at(span.address, dest) {
            Ok(n) if n >= MIN_READ_BYTES => Some(&self.buf[..n]),
            Ok(n) => {
                trace!("short read of {n} bytes at {:#x}", span.address);
                None
            }
            Err(err) => {
                trace!("unreadable chunk at {:#x}: {err}", span.address);
                None
            }
        }
    }

    /// Address range of the reader's own buffer.
    pub fn owned_range(&self) -> (u64, u64) {
        let start = self.buf.as_ptr() as u64;
        (start, start.saturating_add(self.buf.capacity() as u64))
    }
}

impl std::fmt::Debug for ChunkReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkReader")
            .field("capacity", &self.buf.len())
            .finish()
    }
}
