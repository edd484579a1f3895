#![no_main]

use std::io::Cursor;

use bytes::Bytes;
use chunkar::{ChunkConfig, Chunker, StreamChunker};
use libfuzzer_sys::fuzz_target;

// The first byte picks the push size; boundaries must not depend on it.
fuzz_target!(|input: Vec<u8>| {
    let Some((&step, data)) = input.split_first() else {
        return;
    };
    let step = usize::from(step).max(1);
    let config = ChunkConfig::new(8, 4)
        .unwrap()
        .with_min_size(16)
        .with_max_size(Some(256));

    let expected: Vec<_> = Chunker::new(config)
        .chunk_bytes(Bytes::copy_from_slice(data))
        .iter()
        .map(|c| c.range())
        .collect();

    let mut engine = StreamChunker::new(config);
    let mut pushed = Vec::new();
    for piece in data.chunks(step) {
        pushed.extend(engine.push(Bytes::copy_from_slice(piece)));
    }
    pushed.extend(engine.finish());
    let pushed: Vec<_> = pushed.iter().map(|c| c.range()).collect();
    assert_eq!(pushed, expected);

    let read: Vec<_> = Chunker::new(config)
        .chunk(Cursor::new(data))
        .map(|c| c.unwrap().range())
        .collect();
    assert_eq!(read, expected);
});
