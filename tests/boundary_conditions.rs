mod common;

use std::sync::atomic::AtomicBool;

use classcarve::config::ScanPattern;
use classcarve::memory::slice::SliceSpace;
use classcarve::pipeline::extract::Extractor;
use classcarve::pipeline::run_scan;
use classcarve::scanner::build_signature_scanner;

use common::{CollectingSink, minimal_class, sample_class, small_limits};

const BASE: u64 = 0x4000;
const LEAD: usize = 5;

fn padded(class: &[u8]) -> Vec<u8> {
    let mut data = vec![0u8; LEAD];
    data.extend_from_slice(class);
    data.extend_from_slice(&[0u8; 8]);
    data
}

#[test]
fn two_chunk_split_at_every_offset_finds_class_once() {
    let class = sample_class();
    let data = padded(&class);
    let pattern = ScanPattern::default();
    let scanner = build_signature_scanner(&pattern);
    let stop = AtomicBool::new(false);

    for split in 0..=data.len() {
        let sink = CollectingSink::default();
        let mut extractor =
            Extractor::new(&pattern, scanner.as_ref(), small_limits(data.len()));
        extractor.push_chunk(BASE, &data[..split], &sink, &stop);
        extractor.push_chunk(BASE + split as u64, &data[split..], &sink, &stop);
        extractor.finish(&sink, &stop);

        let carved = sink.carved();
        assert_eq!(carved.len(), 1, "split at {split}");
        assert_eq!(carved[0].index, 0);
        assert_eq!(carved[0].address, BASE + LEAD as u64, "split at {split}");
        assert_eq!(carved[0].bytes, class, "split at {split}");
    }
}

#[test]
fn every_chunk_size_finds_same_class() {
    let class = minimal_class();
    let data = padded(&class);
    let space = SliceSpace::new().with_region(BASE, data.clone());
    let stop = AtomicBool::new(false);

    for chunk_size in 4..=data.len() {
        let sink = CollectingSink::default();
        let stats = run_scan(
            &space,
            &ScanPattern::default(),
            &sink,
            small_limits(chunk_size),
            &stop,
        );
        let carved = sink.carved();
        assert_eq!(carved.len(), 1, "chunk size {chunk_size}");
        assert_eq!(carved[0].address, BASE + LEAD as u64);
        assert_eq!(carved[0].bytes, class);
        assert_eq!(stats.rejected, 0, "chunk size {chunk_size}");
    }
}

#[test]
fn class_spanning_adjacent_regions_is_joined() {
    let class = sample_class();
    let cut = 11;
    let space = SliceSpace::new()
        .with_region(BASE, class[..cut].to_vec())
        .with_region(BASE + cut as u64, class[cut..].to_vec());
    let sink = CollectingSink::default();

    let stats = run_scan(
        &space,
        &ScanPattern::default(),
        &sink,
        small_limits(1024),
        &AtomicBool::new(false),
    );

    assert_eq!(stats.regions_scanned, 2);
    let carved = sink.carved();
    assert_eq!(carved.len(), 1);
    assert_eq!(carved[0].address, BASE);
    assert_eq!(carved[0].bytes, class);
}

#[test]
fn class_split_by_gap_is_not_stitched() {
    let class = sample_class();
    let cut = 11;
    let space = SliceSpace::new()
        .with_region(BASE, class[..cut].to_vec())
        .with_region(BASE + 0x1000, class[cut..].to_vec());
    let sink = CollectingSink::default();

    let stats = run_scan(
        &space,
        &ScanPattern::default(),
        &sink,
        small_limits(1024),
        &AtomicBool::new(false),
    );

    assert!(sink.carved().is_empty());
    assert_eq!(stats.rejected, 1);
}

#[test]
fn pattern_split_across_chunks_is_found() {
    let class = minimal_class();
    let pattern = ScanPattern::default();
    let scanner = build_signature_scanner(&pattern);
    let stop = AtomicBool::new(false);

    for cut in 1..4 {
        let sink = CollectingSink::default();
        let mut extractor = Extractor::new(&pattern, scanner.as_ref(), small_limits(64));
        let mut first = vec![0x11u8; 20];
        first.extend_from_slice(&class[..cut]);
        extractor.push_chunk(BASE, &first, &sink, &stop);
        extractor.push_chunk(BASE + first.len() as u64, &class[cut..], &sink, &stop);
        extractor.finish(&sink, &stop);

        let carved = sink.carved();
        assert_eq!(carved.len(), 1, "cut {cut}");
        assert_eq!(carved[0].address, BASE + 20);
    }
}
