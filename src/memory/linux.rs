//! Live address space of the current process on Linux.
//!
//! Regions come from a snapshot of `/proc/self/maps`. Reads go through
//! `/proc/self/mem`, so a page that vanished or cannot be read produces an
//! I/O error rather than a fault.

use std::fs::File;
use std::os::unix::fs::FileExt;

use tracing::debug;

use crate::memory::{AddressBounds, AddressSpace, MemoryError, Region};

const MAPS_PATH: &str = "/proc/self/maps";
const MEM_PATH: &str = "/proc/self/mem";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Mapping {
    start: u64,
    end: u64,
    readable: bool,
}

pub struct SelfProcess {
    mem: File,
    maps: Vec<Mapping>,
}

impl SelfProcess {
    pub fn open() -> Result<Self, MemoryError> {
        let mem = File::open(MEM_PATH)?;
        let text = std::fs::read_to_string(MAPS_PATH)?;
        let maps = parse_maps(&text)?;
        debug!("snapshot of {} mappings from {MAPS_PATH}", maps.len());
        Ok(Self { mem, maps })
    }

    pub fn mapping_count(&self) -> usize {
        self.maps.len()
    }
}

impl std::fmt::Debug for SelfProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelfProcess")
            .field("mappings", &self.maps.len())
            .finish()
    }
}

impl AddressSpace for SelfProcess {
    fn bounds(&self) -> AddressBounds {
        match (self.maps.first(), self.maps.last()) {
            (Some(first), Some(last)) => AddressBounds {
                min: first.start,
                max: last.end,
            },
            _ => AddressBounds { min: 0, max: 0 },
        }
    }

    fn query(&self, address: u64) -> Result<Region, MemoryError> {
        let idx = self.maps.partition_point(|m| m.end <= address);
        let mapping = self
            .maps
            .get(idx)
            .ok_or(MemoryError::NoRegion(address))?;
        if mapping.start <= address {
            Ok(Region {
                base: mapping.start,
                size: mapping.end - mapping.start,
                readable: mapping.readable,
            })
        } else {
            Ok(Region {
                base: address,
                size: mapping.start - address,
                readable: false,
            })
        }
    }

    fn read_at(&self, address: u64, buf: &mut [u8]) -> Result<usize, MemoryError> {
        Ok(self.mem.read_at(buf, address)?)
    }

    fn is_live(&self) -> bool {
        true
    }
}

fn parse_maps(text: &str) -> Result<Vec<Mapping>, MemoryError> {
    let mut maps = Vec::new();
    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        maps.push(parse_line(line)?);
    }
    maps.sort_by_key(|m| m.start);
    Ok(maps)
}

fn parse_line(line: &str) -> Result<Mapping, MemoryError> {
    let malformed = || MemoryError::MapsFormat(line.to_string());
    let mut fields = line.split_whitespace();
    let range = fields.next().ok_or_else(malformed)?;
    let perms = fields.next().ok_or_else(malformed)?;
    let (start, end) = range.split_once('-').ok_or_else(malformed)?;
    let start = u64::from_str_radix(start, 16).map_err(|_| malformed())?;
    let end = u64::from_str_radix(end, 16).map_err(|_| malformed())?;
    if end < start {
        return Err(malformed());
    }
    Ok(Mapping {
        start,
        end,
        readable: perms.starts_with('r'),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Regions;

    const SAMPLE: &str = "\
5581b000-5581c000 r--p 00000000 08:01 1234 /usr/bin/host
5581c000-5581e000 r-xp 00001000 08:01 1234 /usr/bin/host
5581e000-5581f000 ---p 00000000 00:00 0
7ffd1000-7ffd3000 rw-p 00000000 00:00 0 [stack]
";

    #[test]
    fn parses_maps_lines() {
        let maps = parse_maps(SAMPLE).expect("parse");
        assert_eq!(maps.len(), 4);
        assert_eq!(maps[0].start, 0x5581b000);
        assert_eq!(maps[0].end, 0x5581c000);
        assert!(maps[1].readable);
        assert!(!maps[2].readable);
    }

    #[test]
    fn rejects_garbage_line() {
        assert!(parse_line("not a mapping").is_err());
        assert!(parse_line("2000-1000 r--p").is_err());
    }

    #[test]
    fn live_snapshot_reads_own_static() {
        static MARKER: [u8; 16] = *b"classcarve-mark!";

        let space = SelfProcess::open().expect("open self");
        assert!(space.mapping_count() > 0);

        let address = MARKER.as_ptr() as u64;
        let region = space.query(address).expect("query");
        assert!(region.readable);
        assert!(region.base <= address && address < region.end());

        let mut buf = [0u8; 16];
        let n = space.read_at(address, &mut buf).expect("read");
        assert_eq!(n, 16);
        assert_eq!(buf, MARKER);

        assert!(Regions::new(&space).any(|r| r.base == region.base));
    }
}
