// Integration tests for the chunking API
// Tests cover: push/finish semantics, reader iteration, determinism, locality,
// size bounds, hashing, edge cases

use std::collections::HashSet;
use std::io::Cursor;

use bytes::Bytes;
use chunkar::{
    Chunk, ChunkConfig, Chunker, Digest, HashConfig, RollingHasher, StreamChunker,
};
use proptest::prelude::*;

/// Deterministic pseudo-random bytes (xorshift32).
fn noise(len: usize, seed: u32) -> Vec<u8> {
    let mut state = seed.max(1);
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 24) as u8
        })
        .collect()
}

fn chunk_all(config: ChunkConfig, data: &[u8]) -> Vec<Chunk> {
    Chunker::new(config).chunk_bytes(Bytes::copy_from_slice(data))
}

fn boundaries(chunks: &[Chunk]) -> Vec<u64> {
    chunks.iter().map(Chunk::end).collect()
}

// ============================================================================
// Basic Functionality Tests
// ============================================================================

#[test]
fn test_empty_input() {
    let mut chunker = StreamChunker::default();
    let chunks = chunker.push(Bytes::new());

    assert!(chunks.is_empty(), "Empty input should produce no chunks");
    assert_eq!(chunker.pending_len(), 0);
    assert!(
        chunker.finish().is_none(),
        "finish() on empty state should return None"
    );

    let iter_chunks: Vec<_> = Chunker::default().chunk(Cursor::new(Vec::new())).collect();
    assert!(iter_chunks.is_empty());
}

#[test]
fn test_input_shorter_than_window_is_one_chunk() {
    let config = ChunkConfig::new(48, 1).unwrap();
    for len in 1..48 {
        let data = noise(len, len as u32);
        let chunks = chunk_all(config, &data);
        assert_eq!(chunks.len(), 1, "{len}-byte input should be one chunk");
        assert_eq!(&chunks[0].data[..], &data[..]);
        assert_eq!(chunks[0].offset, Some(0));
    }
}

#[test]
fn test_hello_scenario() {
    let config = ChunkConfig::new(4, 4).unwrap();
    let chunks = chunk_all(config, b"HELLOHELLOHELLO");
    let parts: Vec<&[u8]> = chunks.iter().map(|c| &c.data[..]).collect();
    assert_eq!(
        parts,
        vec![&b"HELLO"[..], b"HE", b"L", b"LO", b"HE", b"L", b"LO"]
    );
}

#[test]
fn test_wide_mask_single_chunk() {
    // No 4-byte window of "HELLO..." has its low 8 fingerprint bits clear.
    let config = ChunkConfig::new(4, 8).unwrap();
    let chunks = chunk_all(config, b"HELLOHELLOHELLO");
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].len(), 15);
}

#[test]
fn test_chunks_tile_input() {
    let data = noise(100_000, 7);
    let chunks = chunk_all(ChunkConfig::new(16, 7).unwrap(), &data);

    assert!(chunks.len() > 100);
    let mut expected = 0u64;
    let mut joined = Vec::with_capacity(data.len());
    for chunk in &chunks {
        assert_eq!(chunk.offset, Some(expected));
        assert!(!chunk.is_empty());
        expected += chunk.len() as u64;
        joined.extend_from_slice(&chunk.data);
    }
    assert_eq!(joined, data);
}

// ============================================================================
// Streaming and Push/Finish Semantics
// ============================================================================

#[test]
fn test_streaming_data_in_batches() {
    let config = ChunkConfig::new(16, 6).unwrap().with_min_size(24);
    let data = noise(20_000, 3);
    let expected = chunk_all(config, &data);

    let mut chunker = StreamChunker::new(config);
    let mut chunks = Vec::new();
    for batch in data.chunks(1000) {
        chunks.extend(chunker.push(Bytes::copy_from_slice(batch)));
    }
    chunks.extend(chunker.finish());

    assert_eq!(boundaries(&chunks), boundaries(&expected));
}

#[test]
fn test_multiple_finish_calls() {
    let mut chunker = StreamChunker::new(ChunkConfig::new(48, 16).unwrap());
    chunker.push(Bytes::from_static(b"tail"));

    assert_eq!(chunker.finish().map(|c| c.len()), Some(4));
    assert!(chunker.finish().is_none());
}

#[test]
fn test_offset_resets_after_reset() {
    let config = ChunkConfig::new(4, 4).unwrap();
    let mut chunker = StreamChunker::new(config);
    chunker.push(Bytes::from_static(b"HELLOHELLO"));
    assert!(chunker.offset() > 0);

    chunker.reset();
    assert_eq!(chunker.offset(), 0);

    let chunks = chunker.push(Bytes::from_static(b"HELLO"));
    assert_eq!(chunks[0].offset, Some(0));
}

#[test]
fn test_iterator_tracks_bytes_read() {
    let data = noise(5000, 11);
    let mut iter = Chunker::new(ChunkConfig::new(16, 6).unwrap()).chunk(Cursor::new(&data));
    while let Some(chunk) = iter.next() {
        let chunk = chunk.unwrap();
        assert!(iter.bytes_read() >= chunk.end());
    }
    assert_eq!(iter.bytes_read(), data.len() as u64);
}

// ============================================================================
// Size Constraints
// ============================================================================

#[test]
fn test_max_size_enforces_boundary() {
    let config = ChunkConfig::new(4, 32).unwrap().with_max_size(Some(64));
    let data = noise(1000, 5);
    let chunks = chunk_all(config, &data);

    for chunk in &chunks[..chunks.len() - 1] {
        assert!(chunk.len() <= 64);
    }
    assert_eq!(chunks.iter().map(Chunk::len).sum::<usize>(), 1000);
}

#[test]
fn test_min_size_holds_back_boundaries() {
    let config = ChunkConfig::new(8, 2).unwrap().with_min_size(100);
    let data = noise(10_000, 9);
    let chunks = chunk_all(config, &data);

    assert!(chunks.len() > 10);
    for chunk in &chunks[..chunks.len() - 1] {
        assert!(chunk.len() >= 100, "chunk of {} bytes", chunk.len());
    }
}

#[test]
fn test_default_bounds() {
    let data = noise(2 * 1024 * 1024, 13);
    let chunks = chunk_all(ChunkConfig::default(), &data);

    for chunk in &chunks[..chunks.len() - 1] {
        assert!(chunk.len() >= 16 * 1024);
        assert!(chunk.len() <= 256 * 1024);
    }
}

// ============================================================================
// Determinism and Locality
// ============================================================================

#[test]
fn test_same_stream_same_chunks_same_hashes() {
    let config = ChunkConfig::new(32, 8).unwrap();
    let data = noise(50_000, 17);

    let first = chunk_all(config, &data);
    let second: Vec<_> = Chunker::new(config)
        .chunk(Cursor::new(&data))
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.range(), b.range());
        assert_eq!(a.hash, b.hash);
    }
}

#[test]
fn test_insertion_only_disturbs_nearby_chunks() {
    let window = 16;
    let config = ChunkConfig::new(window, 6).unwrap();
    let original = noise(40_000, 21);
    let edit = 20_000;

    let mut edited = original.clone();
    edited.insert(edit, 0x5a);

    let before = chunk_all(config, &original);
    let after = chunk_all(config, &edited);
    let after_digests: HashSet<Digest> = after.iter().map(Chunk::digest).collect();

    for chunk in &before {
        let untouched = chunk.end() <= edit as u64 || chunk.start() >= (edit + window) as u64;
        if untouched {
            assert!(
                after_digests.contains(&chunk.digest()),
                "chunk {chunk} should survive the edit"
            );
        }
    }
}

proptest! {
    #[test]
    fn split_points_do_not_matter(
        data in proptest::collection::vec(any::<u8>(), 0..4096),
        cuts in proptest::collection::vec(any::<prop::sample::Index>(), 0..8),
    ) {
        let config = ChunkConfig::new(8, 3).unwrap().with_min_size(4).with_max_size(Some(256));
        let expected = chunk_all(config, &data);

        let mut points: Vec<usize> = cuts.iter().map(|i| i.index(data.len() + 1)).collect();
        points.push(0);
        points.push(data.len());
        points.sort_unstable();

        let mut chunker = StreamChunker::new(config);
        let mut actual = Vec::new();
        for pair in points.windows(2) {
            actual.extend(chunker.push(Bytes::copy_from_slice(&data[pair[0]..pair[1]])));
        }
        actual.extend(chunker.finish());

        prop_assert_eq!(boundaries(&actual), boundaries(&expected));
    }

    #[test]
    fn boundaries_match_rolling_hash(data in proptest::collection::vec(any::<u8>(), 0..2048)) {
        let window = 6;
        let config = ChunkConfig::new(window, 3).unwrap();
        let hasher = RollingHasher::new(window, config.multiplier()).unwrap();

        let mut expected = Vec::new();
        for end in window..=data.len() {
            if hasher.hash(&data[end - window..end]).unwrap() & config.mask() == 0 {
                expected.push(end as u64);
            }
        }
        if data.last().is_some() && expected.last() != Some(&(data.len() as u64)) {
            expected.push(data.len() as u64);
        }

        prop_assert_eq!(boundaries(&chunk_all(config, &data)), expected);
    }
}

// ============================================================================
// Zero-Copy Verification
// ============================================================================

#[test]
fn test_zero_copy_semantics() {
    let data = Bytes::from(noise(10_000, 23));
    let range = data.as_ptr_range();

    let chunks = Chunker::new(ChunkConfig::new(16, 6).unwrap()).chunk_bytes(data.clone());
    assert!(chunks.len() > 1);
    for chunk in &chunks {
        assert!(
            range.contains(&chunk.data.as_ptr()),
            "chunk should borrow input"
        );
    }
}

// ============================================================================
// Hashing Tests
// ============================================================================

#[test]
fn test_hashes_present_by_default() {
    let data = noise(10_000, 29);
    for chunk in chunk_all(ChunkConfig::new(16, 6).unwrap(), &data) {
        assert_eq!(chunk.hash, Some(Digest::of(&chunk.data)));
    }
}

#[test]
fn test_hashing_disabled() {
    let config = ChunkConfig::new(16, 6)
        .unwrap()
        .with_hash_config(HashConfig::disabled());
    for chunk in chunk_all(config, &noise(5000, 31)) {
        assert!(chunk.hash.is_none());
        // digest() still works on demand.
        assert_eq!(chunk.digest(), Digest::of(&chunk.data));
    }
}

// ============================================================================
// Edge Cases and Error Conditions
// ============================================================================

#[test]
fn test_config_validation() {
    assert!(ChunkConfig::new(0, 16).is_err());
    assert!(ChunkConfig::new(48, 0).is_err());
    assert!(ChunkConfig::new(48, 33).is_err());
    assert!(ChunkConfig::new(1, 32).is_ok());
    assert!(
        ChunkConfig::default()
            .with_min_size(10)
            .with_max_size(Some(5))
            .validate()
            .is_err()
    );
}

#[test]
fn test_all_zero_input_with_bounds() {
    // Every window of zeros fingerprints to zero, so min_size alone spaces
    // the boundaries.
    let config = ChunkConfig::new(8, 4).unwrap().with_min_size(64);
    let chunks = chunk_all(config, &[0u8; 1000]);
    let lengths: Vec<usize> = chunks.iter().map(Chunk::len).collect();

    assert_eq!(lengths[..15], [64; 15]);
    assert_eq!(lengths[15], 1000 - 15 * 64);
}
