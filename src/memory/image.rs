//! Raw memory image on disk, exposed as a single readable region starting
//! at address zero.

use std::fs::File;
use std::path::Path;

use crate::memory::{AddressBounds, AddressSpace, MemoryError, Region};

pub struct ImageFile {
    file: File,
    len: u64,
    #[cfg(not(unix))]
    lock: std::sync::Mutex<()>,
}

impl ImageFile {
    pub fn open(path: &Path) -> Result<Self, MemoryError> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(Self {
            file,
            len,
            #[cfg(not(unix))]
            lock: std::sync::Mutex::new(()),
        })
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl std::fmt::Debug for ImageFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageFile").field("len", &self.len).finish()
    }
}

impl AddressSpace for ImageFile {
    fn bounds(&self) -> AddressBounds {
        AddressBounds {
            min: 0,
            max: self.len,
        }
    }

    fn query(&self, address: u64) -> Result<Region, MemoryError> {
        if address >= self.len {
            return Err(MemoryError::NoRegion(address));
        }
        Ok(Region {
            base: 0,
            size: self.len,
            readable: true,
        })
    }

    fn read_at(&self, address: u64, buf: &mut [u8]) -> Result<usize, MemoryError> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::FileExt;
            Ok(self.file.read_at(buf, address)?)
        }
        #[cfg(not(unix))]
        {
            use std::io::{Read, Seek, SeekFrom};
            let _guard = self
                .lock
                .lock()
                .map_err(|_| MemoryError::Io(std::io::Error::other("image lock poisoned")))?;
            let mut f = &self.file;
            f.seek(SeekFrom::Start(address))?;
            Ok(f.read(buf)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ImageFile;
    use crate::memory::{AddressSpace, Regions};

    #[test]
    fn image_is_one_readable_region() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("image.bin");
        std::fs::write(&path, vec![7u8; 300]).expect("write");

        let image = ImageFile::open(&path).expect("open");
        let regions: Vec<_> = Regions::new(&image).collect();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].size, 300);

        let mut buf = [0u8; 16];
        let n = image.read_at(290, &mut buf).expect("read");
        assert_eq!(n, 10);
    }
}
