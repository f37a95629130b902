//! Shared limits for the scan pipeline.

/// Largest class image that is ever carved, and the size of one read chunk.
pub const MAX_ARTIFACT_SIZE: usize = 8 * 1024 * 1024;

/// Reads that return fewer bytes than this are treated as unreadable.
pub const MIN_READ_BYTES: usize = 4;

/// Byte positions scanned between cooperative yields and stop checks.
pub const YIELD_STRIDE: usize = 0x1000;

/// File extension of carved artifacts.
pub const CLASS_EXTENSION: &str = "class";

/// Canonical class-file magic, used when no configuration exists.
pub const DEFAULT_PATTERN: [u8; 4] = [0xCA, 0xFE, 0xBA, 0xBE];
