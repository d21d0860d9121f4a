use serde::{Deserialize, Serialize};

use crate::chunk::Chunk;

/// Window sizes are counted in characters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 50_000,
            overlap: 4_000,
        }
    }
}

/// Splits a document into overlapping fixed-size windows so every chunk
/// fits the extraction model's context.
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    pub fn chunk_text(&self, doc_id: &str, text: &str, source: &str) -> Vec<Chunk> {
        let size = self.config.chunk_size.max(1);
        let step = size.saturating_sub(self.config.overlap).max(1);

        // Byte offset of every char boundary, plus the end of the text.
        let boundaries: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let char_count = boundaries.len() - 1;

        let mut chunks = Vec::new();
        let mut start = 0;

        while start < char_count {
            let end = (start + size).min(char_count);
            let window = &text[boundaries[start]..boundaries[end]];

            chunks.push(Chunk::new(
                doc_id.to_string(),
                chunks.len(),
                window.to_string(),
                source.to_string(),
                (start, end),
            ));

            if end == char_count {
                break;
            }
            start += step;
        }

        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(chunk_size: usize, overlap: usize) -> Chunker {
        Chunker::new(ChunkerConfig { chunk_size, overlap })
    }

    #[test]
    fn test_basic_chunking() {
        let chunker = Chunker::new(ChunkerConfig::default());
        let text = "This is a test paragraph.\n\nThis is another paragraph.";
        let chunks = chunker.chunk_text("test-doc", text, "test.txt");

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].doc_id, "test-doc");
        assert_eq!(chunks[0].text, text);
    }

    #[test]
    fn test_windows_overlap() {
        let chunks = chunker(4, 1).chunk_text("d", "abcdefghij", "s");

        let texts: Vec<_> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["abcd", "defg", "ghij"]);
        let indices: Vec<_> = chunks.iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(chunks[1].offset, (3, 7));
    }

    #[test]
    fn test_empty_text_has_no_chunks() {
        assert!(chunker(10, 2).chunk_text("d", "", "s").is_empty());
    }

    #[test]
    fn test_multibyte_boundaries() {
        let chunks = chunker(3, 0).chunk_text("d", "héllo wörld", "s");

        let joined: String = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(joined, "héllo wörld");
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 3));
    }

    #[test]
    fn test_overlap_not_smaller_than_size_still_advances() {
        let chunks = chunker(3, 5).chunk_text("d", "abcdef", "s");

        assert_eq!(chunks.first().unwrap().text, "abc");
        assert_eq!(chunks.last().unwrap().offset.1, 6);
    }
}
