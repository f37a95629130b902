pub mod cpu;

use crate::config::ScanPattern;

/// Exact byte-pattern search over an in-memory buffer.
pub trait SignatureScanner: Send + Sync {
    /// Offset of the first full match starting at or after `from`.
    fn find(&self, haystack: &[u8], from: usize) -> Option<usize>;

    fn pattern_len(&self) -> usize;
}

pub fn build_signature_scanner(pattern: &ScanPattern) -> Box<dyn SignatureScanner> {
    Box::new(cpu::CpuScanner::new(pattern.bytes()))
}
