//! In-memory address space assembled from byte vectors placed at chosen
//! addresses. Used for tests and benchmarks.

use std::collections::BTreeMap;

use crate::memory::{AddressBounds, AddressSpace, MemoryError, Region};

#[derive(Debug, Clone)]
enum Backing {
    Bytes(Vec<u8>),
    Unreadable(u64),
    Faulty(u64),
}

impl Backing {
    fn len(&self) -> u64 {
        match self {
            Backing::Bytes(data) => data.len() as u64,
            Backing::Unreadable(size) | Backing::Faulty(size) => *size,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SliceSpace {
    regions: BTreeMap<u64, Backing>,
}

impl SliceSpace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Readable region holding `data` at `base`.
    pub fn with_region(mut self, base: u64, data: Vec<u8>) -> Self {
        self.regions.insert(base, Backing::Bytes(data));
        self
    }

    /// Mapped region without read permission.
    pub fn with_unreadable(mut self, base: u64, size: u64) -> Self {
        self.regions.insert(base, Backing::Unreadable(size));
        self
    }

    /// Region reported as readable whose reads always fail.
    pub fn with_faulty(mut self, base: u64, size: u64) -> Self {
        self.regions.insert(base, Backing::Faulty(size));
        self
    }

    fn containing(&self, address: u64) -> Option<(u64, &Backing)> {
        let (base, backing) = self.regions.range(..=address).next_back()?;
        (address < base.saturating_add(backing.len())).then_some((*base, backing))
    }
}

impl AddressSpace for SliceSpace {
    fn bounds(&self) -> AddressBounds {
        let max = self
            .regions
            .iter()
            .next_back()
            .map(|(base, backing)| base.saturating_add(backing.len()))
            .unwrap_or(0);
        AddressBounds { min: 0, max }
    }

    fn query(&self, address: u64) -> Result<Region, MemoryError> {
        if let Some((base, backing)) = self.containing(address) {
            return Ok(Region {
                base,
                size: backing.len(),
                readable: !matches!(backing, Backing::Unreadable(_)),
            });
        }

        let next = self
            .regions
            .range(address..)
            .next()
            .map(|(base, _)| *base)
            .ok_or(MemoryError::NoRegion(address))?;
        Ok(Region {
            base: address,
            size: next - address,
            readable: false,
        })
    }

    fn read_at(&self, address: u64, buf: &mut [u8]) -> Result<usize, MemoryError> {
        let (base, backing) = self
            .containing(address)
            .ok_or(MemoryError::NoRegion(address))?;
        match backing {
            Backing::Bytes(data) => {
                let start = (address - base) as usize;
                let n = buf.len().min(data.len() - start);
                buf[..n].copy_from_slice(&data[start..start + n]);
                Ok(n)
            }
            Backing::Unreadable(_) | Backing::Faulty(_) => Err(MemoryError::Io(
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "page not readable"),
            )),
        }
    }
}
