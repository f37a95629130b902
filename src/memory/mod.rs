//! # Memory Module
//!
//! Address-space abstraction the scanner walks: region queries, bounded
//! reads, and the forward-only region enumerator.

pub mod image;
#[cfg(target_os = "linux")]
pub mod linux;
pub mod slice;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no region at address {0:#x}")]
    NoRegion(u64),
    #[error("malformed memory map line: {0}")]
    MapsFormat(String),
    #[error("unsupported platform: {0}")]
    Unsupported(String),
}

/// A contiguous range of address space with uniform protection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub base: u64,
    pub size: u64,
    pub readable: bool,
}

impl Region {
    pub fn end(&self) -> u64 {
        self.base.saturating_add(self.size)
    }
}

/// Lowest and highest address a walk may visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressBounds {
    pub min: u64,
    pub max: u64,
}

pub trait AddressSpace: Send + Sync {
    fn bounds(&self) -> AddressBounds;

    /// Describe the region containing `address`. Addresses that fall into
    /// unmapped space are reported as an unreadable region up to the next
    /// mapping.
    fn query(&self, address: u64) -> Result<Region, MemoryError>;

    fn read_at(&self, address: u64, buf: &mut [u8]) -> Result<usize, MemoryError>;

    /// True when the space is the scanner's own live process, whose buffers
    /// must not be scanned.
    fn is_live(&self) -> bool {
        false
    }
}

/// Lazily walks an [`AddressSpace`] from its lower to its upper bound and
/// yields the readable regions.
pub struct Regions<'a> {
    space: &'a dyn AddressSpace,
    next: Option<u64>,
    max: u64,
}

impl<'a> Regions<'a> {
    pub fn new(space: &'a dyn AddressSpace) -> Self {
        let bounds = space.bounds();
        let next = (bounds.min < bounds.max).then_some(bounds.min);
        Self {
            space,
            next,
            max: bounds.max,
        }
    }
}

impl std::fmt::Debug for Regions<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Regions")
            .field("next", &self.next)
            .field("max", &self.max)
            .finish()
    }
}

impl Iterator for Regions<'_> {
    type Item = Region;

    fn next(&mut self) -> Option<Region> {
        loop {
            let address = self.next.take()?;
            let region = match self.space.query(address) {
                Ok(region) => region,
                Err(err) => {
                    tracing::debug!("region walk ended at {address:#x}: {err}");
                    return None;
                }
            };

            let end = region.end();
            if end > address && end < self.max {
                self.next = Some(end);
            }

            if region.readable && region.size > 0 {
                return Some(region);
            }
        }
    }
}

/// Open the address space of the current process.
pub fn open_self() -> Result<Box<dyn AddressSpace>, MemoryError> {
    #[cfg(target_os = "linux")]
    {
        Ok(Box::new(linux::SelfProcess::open()?))
    }
    #[cfg(not(target_os = "linux"))]
    {
        Err(MemoryError::Unsupported(std::env::consts::OS.to_string()))
    }
}
