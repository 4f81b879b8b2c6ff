//! Property tests for fixed-size chunking.

use ground_rag::chunking::{Chunker, FixedSizeChunker};
use ground_rag::document::Document;
use proptest::prelude::*;

/// Chunk size and an overlap strictly below it.
fn arb_sizes() -> impl Strategy<Value = (usize, usize)> {
    (1usize..64).prop_flat_map(|size| (Just(size), 0..size))
}

/// Non-empty text mixing ASCII and multi-byte characters.
fn arb_text() -> impl Strategy<Value = String> {
    "[a-zé漢 .\n]{1,400}"
}

/// **Property 1: Chunks cover the document with exact overlap**
/// *For any* document of length L and sizes c > o, the chunks start at 0, the
/// last one ends at L, consecutive chunks share exactly o characters, every
/// chunk but the last is exactly c characters and the last is at most c.
mod prop_chunk_coverage {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn chunks_cover_text_with_exact_overlap(
            text in arb_text(),
            (size, overlap) in arb_sizes(),
        ) {
            let chunker = FixedSizeChunker::new(size, overlap).unwrap();
            let doc = Document::new("doc.txt", text.clone());
            let chunks = chunker.chunk(&doc);
            let chars: Vec<char> = text.chars().collect();

            prop_assert!(!chunks.is_empty());
            prop_assert_eq!(chunks[0].offset, 0);
            let last = chunks.last().unwrap();
            prop_assert_eq!(last.offset + last.length, chars.len());
            prop_assert!(last.length <= size);

            for (i, chunk) in chunks.iter().enumerate() {
                prop_assert_eq!(chunk.source.as_str(), "doc.txt");
                let expected: String = chars[chunk.offset..chunk.offset + chunk.length].iter().collect();
                prop_assert_eq!(&chunk.text, &expected);
                if i + 1 < chunks.len() {
                    prop_assert_eq!(chunk.length, size);
                }
            }

            for pair in chunks.windows(2) {
                let shared = pair[0].offset + pair[0].length - pair[1].offset;
                prop_assert_eq!(shared, overlap);
            }
        }

        #[test]
        fn short_text_is_a_single_chunk(
            (size, overlap) in arb_sizes(),
            text in "[a-z]{1,10}",
        ) {
            prop_assume!(text.chars().count() <= size);
            let chunker = FixedSizeChunker::new(size, overlap).unwrap();
            let chunks = chunker.chunk(&Document::new("a.txt", text.clone()));
            prop_assert_eq!(chunks.len(), 1);
            prop_assert_eq!(&chunks[0].text, &text);
        }
    }
}

/// **Property 2: Chunking is deterministic**
/// *For any* document and configuration, chunking twice yields identical chunks.
mod prop_chunk_determinism {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn rechunking_is_identical(text in arb_text(), (size, overlap) in arb_sizes()) {
            let chunker = FixedSizeChunker::new(size, overlap).unwrap();
            let doc = Document::new("doc.txt", text);
            prop_assert_eq!(chunker.chunk(&doc), chunker.chunk(&doc));
        }
    }
}
