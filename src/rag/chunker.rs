use crate::types::{AppError, Document, MetadataValue, Result};
use text_splitter::{ChunkConfig, MarkdownSplitter, TextSplitter};

/// Character-based recursive splitter.
///
/// Chunks are at most `chunk_size` characters and consecutive chunks share up
/// to `chunk_overlap` characters. Splitting prefers the largest semantic unit
/// that fits (paragraphs, then lines, sentences, words).
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(AppError::InvalidInput(
                "chunk_size must be greater than 0".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(AppError::InvalidInput(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk(&self, text: &str) -> Result<Vec<String>> {
        let config = ChunkConfig::new(self.chunk_size)
            .with_overlap(self.chunk_overlap)
            .map_err(|e| AppError::InvalidInput(e.to_string()))?;
        let splitter = TextSplitter::new(config);
        Ok(splitter.chunks(text).map(str::to_string).collect())
    }

    /// Markdown-aware splitting: headings and block boundaries are preferred
    /// split points.
    pub fn chunk_markdown(&self, text: &str) -> Result<Vec<String>> {
        let config = ChunkConfig::new(self.chunk_size)
            .with_overlap(self.chunk_overlap)
            .map_err(|e| AppError::InvalidInput(e.to_string()))?;
        let splitter = MarkdownSplitter::new(config);
        Ok(splitter.chunks(text).map(str::to_string).collect())
    }

    /// Split every document, copying its metadata onto each chunk and adding
    /// a `chunk_index`.
    pub fn split_documents(&self, documents: &[Document], markdown: bool) -> Result<Vec<Document>> {
        let mut out = Vec::new();
        for doc in documents {
            let chunks = if markdown {
                self.chunk_markdown(&doc.content)?
            } else {
                self.chunk(&doc.content)?
            };
            for (i, chunk) in chunks.into_iter().enumerate() {
                let mut metadata = doc.metadata.clone();
                metadata.insert("chunk_index".to_string(), MetadataValue::Integer(i as i64));
                out.push(Document {
                    content: chunk,
                    metadata,
                });
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_overlap_not_smaller_than_size() {
        assert!(TextChunker::new(100, 100).is_err());
        assert!(TextChunker::new(0, 0).is_err());
        assert!(TextChunker::new(1000, 200).is_ok());
    }

    #[test]
    fn test_chunks_respect_size() {
        let text = "Reinforcement learning studies agents. ".repeat(60);
        let chunker = TextChunker::new(200, 40).unwrap();

        let chunks = chunker.chunk(&text).unwrap();
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 200));
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        let chunker = TextChunker::new(1000, 200).unwrap();
        let chunks = chunker.chunk("A short paragraph.").unwrap();
        assert_eq!(chunks, vec!["A short paragraph.".to_string()]);
    }

    #[test]
    fn test_split_documents_copies_metadata() {
        let chunker = TextChunker::new(50, 10).unwrap();
        let doc = Document::new("# Title\n\nFirst paragraph of text here.\n\nSecond paragraph of text here.")
            .with_metadata("source", "chapter1.md");

        let chunks = chunker.split_documents(&[doc], true).unwrap();
        assert!(chunks.len() >= 2);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.get("source"), Some(&MetadataValue::from("chapter1.md")));
            assert_eq!(chunk.get("chunk_index"), Some(&MetadataValue::Integer(i as i64)));
        }
    }
}
