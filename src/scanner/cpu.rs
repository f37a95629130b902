use memchr::memchr;

use crate::scanner::SignatureScanner;

#[derive(Debug, Clone)]
pub struct CpuScanner {
    pattern: Vec<u8>,
}

impl CpuScanner {
    pub fn new(pattern: &[u8]) -> Self {
        Self {
            pattern: pattern.to_vec(),
        }
    }
}

impl SignatureScanner for CpuScanner {
    fn find(&self, haystack: &[u8], from: usize) -> Option<usize> {
        let first = *self.pattern.first()?;
        let last_start = haystack.len().checked_sub(self.pattern.len())?;
        let mut pos = from;
        while pos <= last_start {
            let idx = pos + memchr(first, &haystack[pos..=last_start])?;
            if haystack[idx..idx + self.pattern.len()] == self.pattern[..] {
                return Some(idx);
            }
            pos = idx + 1;
        }
        None
    }

    fn pattern_len(&self) -> usize {
        self.pattern.len()
    }
}
