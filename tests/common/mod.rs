//! Shared test infrastructure: class-file builders and an in-memory sink.

#![allow(dead_code)]

use std::sync::Mutex;

use classcarve::carve::{Artifact, ArtifactSink};
use classcarve::pipeline::ScanLimits;

pub const MAGIC: [u8; 4] = [0xCA, 0xFE, 0xBA, 0xBE];

/// Smallest class used in the scenarios: a ten-entry pool count with one
/// class reference, an empty UTF-8 name and seven unrecognised tags, then
/// empty interface, field, method and attribute tables. 37 bytes in total.
pub fn minimal_class() -> Vec<u8> {
    let mut out = MAGIC.to_vec();
    out.extend_from_slice(&[0x00, 0x00, 0x00, 0x34]);
    out.extend_from_slice(&[0x00, 0x0A]);
    out.extend_from_slice(&[0x07, 0x00, 0x02]);
    out.extend_from_slice(&[0x01, 0x00, 0x00]);
    out.extend_from_slice(&[0x00; 7]);
    out.extend_from_slice(&[0x00; 14]);
    assert_eq!(out.len(), 37);
    out
}

/// Minimal-class prefix cut off inside its constant pool.
pub fn truncated_class() -> Vec<u8> {
    vec![0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x00, 0x00, 0x34, 0x00, 0x0A, 0x01, 0xFF, 0xFF]
}

/// Builder for realistic class images.
#[derive(Debug, Default)]
pub struct ClassBuilder {
    minor: u16,
    major: u16,
    pool: Vec<u8>,
    pool_count: u16,
    methods: Vec<(u16, u16, Vec<u8>)>,
}

impl ClassBuilder {
    pub fn new() -> Self {
        Self {
            major: 52,
            pool_count: 1,
            ..Self::default()
        }
    }

    pub fn version(mut self, minor: u16, major: u16) -> Self {
        self.minor = minor;
        self.major = major;
        self
    }

    /// Append a UTF-8 constant and return its pool index.
    pub fn utf8(&mut self, text: &str) -> u16 {
        self.pool.push(1);
        self.pool.extend_from_slice(&(text.len() as u16).to_be_bytes());
        self.pool.extend_from_slice(text.as_bytes());
        self.next_index(1)
    }

    pub fn class_ref(&mut self, name: u16) -> u16 {
        self.pool.push(7);
        self.pool.extend_from_slice(&name.to_be_bytes());
        self.next_index(1)
    }

    /// Long constants take two pool indices.
    pub fn long(&mut self, value: u64) -> u16 {
        self.pool.push(5);
        self.pool.extend_from_slice(&value.to_be_bytes());
        self.next_index(2)
    }

    /// Method with a single attribute whose body is `code`.
    pub fn method(&mut self, name: u16, descriptor: u16, code: Vec<u8>) {
        self.methods.push((name, descriptor, code));
    }

    fn next_index(&mut self, width: u16) -> u16 {
        let index = self.pool_count;
        self.pool_count += width;
        index
    }

    pub fn build(mut self) -> Vec<u8> {
        let name = self.utf8("Sample");
        let this_class = self.class_ref(name);
        let code_name = if self.methods.is_empty() {
            0
        } else {
            self.utf8("Code")
        };

        let mut out = MAGIC.to_vec();
        out.extend_from_slice(&self.minor.to_be_bytes());
        out.extend_from_slice(&self.major.to_be_bytes());
        out.extend_from_slice(&self.pool_count.to_be_bytes());
        out.extend_from_slice(&self.pool);
        out.extend_from_slice(&0x0021u16.to_be_bytes());
        out.extend_from_slice(&this_class.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes()); // interfaces
        out.extend_from_slice(&0u16.to_be_bytes()); // fields
        out.extend_from_slice(&(self.methods.len() as u16).to_be_bytes());
        for (name, descriptor, code) in &self.methods {
            out.extend_from_slice(&0x0001u16.to_be_bytes());
            out.extend_from_slice(&name.to_be_bytes());
            out.extend_from_slice(&descriptor.to_be_bytes());
            out.extend_from_slice(&1u16.to_be_bytes());
            out.extend_from_slice(&code_name.to_be_bytes());
            out.extend_from_slice(&(code.len() as u32).to_be_bytes());
            out.extend_from_slice(code);
        }
        out.extend_from_slice(&0u16.to_be_bytes()); // class attributes
        out
    }
}

/// A class with a wide constant and one method, a few dozen bytes long.
pub fn sample_class() -> Vec<u8> {
    let mut builder = ClassBuilder::new();
    builder.long(0x0011_2233_4455_6677);
    let name = builder.utf8("run");
    let descriptor = builder.utf8("()V");
    builder.method(name, descriptor, vec![0x00, 0x01, 0x00, 0x01, 0xB1]);
    builder.build()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Carved {
    pub index: u64,
    pub address: u64,
    pub bytes: Vec<u8>,
}

/// Sink that keeps every artifact in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    carved: Mutex<Vec<Carved>>,
}

impl CollectingSink {
    pub fn carved(&self) -> Vec<Carved> {
        self.carved.lock().expect("sink lock").clone()
    }
}

impl ArtifactSink for CollectingSink {
    fn persist(&self, artifact: &Artifact<'_>) -> bool {
        self.carved.lock().expect("sink lock").push(Carved {
            index: artifact.index,
            address: artifact.address,
            bytes: artifact.bytes.to_vec(),
        });
        true
    }
}

pub fn small_limits(chunk_size: usize) -> ScanLimits {
    ScanLimits {
        max_artifact_size: 4096,
        chunk_size,
        yield_stride: 64,
    }
}
