#![no_main]

use chunkar::{ChunkConfig, Chunker, Digest};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: Vec<u8>| {
    let configs = [
        // Tiny window, frequent boundaries
        ChunkConfig::new(4, 3).unwrap(),
        // Bounded both ways
        ChunkConfig::new(16, 6)
            .unwrap()
            .with_min_size(32)
            .with_max_size(Some(512)),
        // Boundaries only from max_size
        ChunkConfig::new(8, 32).unwrap().with_max_size(Some(100)),
        ChunkConfig::default(),
    ];

    for config in configs {
        let chunks = Chunker::new(config).chunk_bytes(data.clone());

        if data.is_empty() {
            assert!(chunks.is_empty());
            continue;
        }

        // Size bounds hold for every chunk but the last
        for (i, chunk) in chunks.iter().enumerate() {
            assert!(!chunk.is_empty());
            if let Some(max) = config.max_size() {
                assert!(chunk.len() <= max);
            }
            if i < chunks.len() - 1 {
                assert!(chunk.len() >= config.min_size());
            }
        }

        // Chunks tile the input
        let mut expected_offset = 0u64;
        let mut joined = Vec::with_capacity(data.len());
        for chunk in &chunks {
            assert_eq!(chunk.offset, Some(expected_offset));
            assert_eq!(chunk.hash, Some(Digest::of(&chunk.data)));
            expected_offset += chunk.len() as u64;
            joined.extend_from_slice(&chunk.data);
        }
        assert_eq!(joined, data);

        // Same input, same chunks
        let again = Chunker::new(config).chunk_bytes(data.clone());
        assert_eq!(chunks.len(), again.len());
        for (a, b) in chunks.iter().zip(&again) {
            assert_eq!(a.range(), b.range());
            assert_eq!(a.hash, b.hash);
        }
    }
});
