//! Overlapping word-window chunking of document text.

use crate::error::ConfigError;
use crate::models::{Chunk, RetrievalConfig, TextSpan};
use crate::utils::text::{page_at, page_breaks, word_spans};

/// Splits document text into overlapping windows of whitespace-delimited words.
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Window size in words
    chunk_size: usize,
    /// Words repeated at the start of the next window
    overlap: usize,
}

impl TextChunker {
    /// Create a chunker; `overlap` must be strictly less than `chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, ConfigError> {
        if chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "chunk_size must be at least 1".to_string(),
            ));
        }
        if overlap >= chunk_size {
            return Err(ConfigError::ValidationError(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn from_config(config: &RetrievalConfig) -> Result<Self, ConfigError> {
        Self::new(config.chunk_size as usize, config.chunk_overlap as usize)
    }

    /// Chunk `text` into windows tagged with contiguous document ordinals.
    ///
    /// Each chunk is the exact source slice from its first word to its last,
    /// so inner whitespace and page breaks survive.
    pub fn chunk(&self, text: &str) -> Vec<Chunk> {
        let words = word_spans(text);
        if words.is_empty() {
            return Vec::new();
        }

        let breaks = page_breaks(text);
        let paged = !breaks.is_empty();
        let step = self.chunk_size - self.overlap;

        let mut chunks = Vec::new();
        let mut start = 0;

        loop {
            let end = (start + self.chunk_size).min(words.len());
            let byte_start = words[start].0;
            let byte_end = words[end - 1].1;

            let page = paged.then(|| page_at(&breaks, byte_start));
            chunks.push(Chunk::document(
                text[byte_start..byte_end].to_string(),
                chunks.len() as u32,
                TextSpan {
                    start: byte_start,
                    end: byte_end,
                },
                page,
            ));

            if end == words.len() {
                break;
            }
            start += step;
        }

        chunks
    }
}

/// Count the words a chunker would see in `text`.
pub fn count_words(text: &str) -> usize {
    word_spans(text).len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChunkOrigin;

    fn chunker(size: usize, overlap: usize) -> TextChunker {
        TextChunker::new(size, overlap).unwrap()
    }

    fn words(n: usize) -> String {
        (0..n)
            .map(|i| format!("w{}", i))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_empty_text() {
        assert!(chunker(5, 1).chunk("").is_empty());
        assert!(chunker(5, 1).chunk("  \n\t ").is_empty());
    }

    #[test]
    fn test_small_text_single_chunk() {
        let chunks = chunker(10, 2).chunk("  Hello, world!  ");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Hello, world!");
        assert_eq!(chunks[0].source_ordinal(), 0);
        assert_eq!(chunks[0].origin(), ChunkOrigin::Document);
        assert_eq!(chunks[0].span, Some(TextSpan { start: 2, end: 15 }));
        assert_eq!(chunks[0].page, None);
    }

    #[test]
    fn test_invalid_overlap_rejected() {
        assert!(matches!(
            TextChunker::new(5, 5),
            Err(ConfigError::ValidationError(_))
        ));
        assert!(TextChunker::new(5, 9).is_err());
        assert!(TextChunker::new(0, 0).is_err());
        assert!(TextChunker::new(5, 4).is_ok());
    }

    #[test]
    fn test_windows_and_overlap() {
        // 10 words, window 4, step 3: [0..4) [3..7) [6..10)
        let text = words(10);
        let chunks = chunker(4, 1).chunk(&text);

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["w0 w1 w2 w3", "w3 w4 w5 w6", "w6 w7 w8 w9"]);
    }

    #[test]
    fn test_short_remainder_becomes_last_chunk() {
        let chunks = chunker(4, 0).chunk(&words(9));
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["w0 w1 w2 w3", "w4 w5 w6 w7", "w8"]);
    }

    #[test]
    fn test_ordinals_are_contiguous() {
        for (size, overlap) in [(1, 0), (3, 1), (7, 6), (50, 10)] {
            let chunks = chunker(size, overlap).chunk(&words(123));
            for (i, chunk) in chunks.iter().enumerate() {
                assert_eq!(chunk.source_ordinal(), i as u32, "size={size} overlap={overlap}");
            }
        }
    }

    #[test]
    fn test_spans_cover_source_without_gaps() {
        let text = "The quick  brown fox\njumps over\n\nthe lazy dog. It was  not amused at all.";
        for (size, overlap) in [(1, 0), (2, 0), (3, 1), (4, 3), (100, 0)] {
            let chunks = chunker(size, overlap).chunk(text);
            let first = chunks.first().and_then(|c| c.span).unwrap();
            let last = chunks.last().and_then(|c| c.span).unwrap();
            assert_eq!(first.start, 0);
            assert_eq!(last.end, text.len());

            for pair in chunks.windows(2) {
                let prev = pair[0].span.unwrap();
                let next = pair[1].span.unwrap();
                assert!(next.start > prev.start);
                if next.start > prev.end {
                    // Only whitespace may lie between non-overlapping chunks.
                    assert!(text[prev.end..next.start].trim().is_empty());
                }
                assert_eq!(&text[prev.start..prev.end], pair[0].text.as_str());
            }
        }
    }

    #[test]
    fn test_overlap_repeats_exactly_overlap_words() {
        let chunks = chunker(5, 2).chunk(&words(20));
        for pair in chunks.windows(2) {
            let prev: Vec<&str> = pair[0].text.split_whitespace().collect();
            let next: Vec<&str> = pair[1].text.split_whitespace().collect();
            assert_eq!(prev[prev.len() - 2..], next[..2]);
        }
    }

    #[test]
    fn test_page_numbers_from_form_feeds() {
        let text = "alpha beta\x0cgamma delta\x0cepsilon";
        let chunks = chunker(2, 0).chunk(text);
        let pages: Vec<Option<u32>> = chunks.iter().map(|c| c.page).collect();
        assert_eq!(pages, vec![Some(1), Some(2), Some(3)]);
        assert_eq!(chunks[1].text, "gamma delta");
    }

    #[test]
    fn test_count_words() {
        assert_eq!(count_words("one two  three\nfour"), 4);
        assert_eq!(count_words(""), 0);
    }
}
