use crate::error::IngestError;
use crate::models::{Chunk, PipelineOptions};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub max_chars: usize,
    pub overlap_chars: usize,
}

impl From<&PipelineOptions> for ChunkingConfig {
    fn from(value: &PipelineOptions) -> Self {
        Self {
            max_chars: value.chunk_size,
            overlap_chars: value.chunk_overlap,
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.max_chars == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        if self.overlap_chars >= self.max_chars {
            return Err(IngestError::InvalidChunkConfig(format!(
                "overlap {} must be smaller than chunk size {}",
                self.overlap_chars, self.max_chars
            )));
        }
        Ok(())
    }

    fn step(&self) -> usize {
        self.max_chars - self.overlap_chars
    }
}

/// Fixed character window. Consecutive pieces share exactly `overlap_chars`
/// characters; the final piece ends at the end of the text and may be shorter.
pub fn split_text(text: &str, config: ChunkingConfig) -> Result<Vec<String>, IngestError> {
    config.validate()?;

    let chars: Vec<char> = text.trim().chars().collect();
    let mut pieces = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + config.max_chars).min(chars.len());
        pieces.push(chars[start..end].iter().collect::<String>());
        if end == chars.len() {
            break;
        }
        start += config.step();
    }

    Ok(pieces)
}

pub fn build_chunks(
    document_id: &str,
    source_path: &str,
    block: u32,
    block_text: &str,
    config: ChunkingConfig,
    global_index: u64,
) -> Result<(Vec<Chunk>, u64), IngestError> {
    let mut chunks = Vec::new();
    let mut cursor = global_index;

    for piece in split_text(block_text, config)? {
        if piece.trim().is_empty() {
            continue;
        }

        chunks.push(Chunk {
            chunk_id: make_chunk_id(document_id, block, cursor, &piece),
            document_id: document_id.to_string(),
            source_path: source_path.to_string(),
            block,
            chunk_index: cursor,
            text: piece,
        });

        cursor = cursor.saturating_add(1);
    }

    Ok((chunks, cursor))
}

fn make_chunk_id(document_id: &str, block: u32, index: u64, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(document_id.as_bytes());
    hasher.update(block.to_le_bytes());
    hasher.update(index.to_le_bytes());
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ChunkingConfig {
        ChunkingConfig::from(&PipelineOptions::default())
    }

    fn three_page_text() -> String {
        let paragraph = |seed: &str| {
            let mut text = String::new();
            while text.chars().count() < 498 {
                text.push_str(seed);
                text.push(' ');
            }
            text.chars().take(498).collect::<String>()
        };
        format!(
            "{}\n\n{}\n\n{}",
            paragraph("alpha"),
            paragraph("bravo"),
            paragraph("charlie")
        )
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let pieces = split_text("One short sentence.", config()).unwrap();
        assert_eq!(pieces, vec!["One short sentence.".to_string()]);
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(split_text("   \n\n ", config()).unwrap().is_empty());
    }

    #[test]
    fn fifteen_hundred_chars_over_three_paragraphs() {
        let text = three_page_text();
        assert_eq!(text.chars().count(), 1_498);

        let pieces = split_text(&text, config()).unwrap();
        assert!(pieces.len() >= 3);

        for piece in &pieces {
            assert!(piece.chars().count() <= 500);
        }

        for pair in pieces.windows(2) {
            let previous: Vec<char> = pair[0].chars().collect();
            let next: Vec<char> = pair[1].chars().collect();
            let tail: String = previous[previous.len() - 50..].iter().collect();
            let head: String = next[..50].iter().collect();
            assert_eq!(tail, head);
        }
    }

    #[test]
    fn splitting_is_deterministic() {
        let text = three_page_text();
        assert_eq!(
            split_text(&text, config()).unwrap(),
            split_text(&text, config()).unwrap()
        );
    }

    #[test]
    fn multibyte_text_is_split_on_char_boundaries() {
        let text = "é".repeat(1_000);
        let pieces = split_text(&text, config()).unwrap();
        assert_eq!(pieces.len(), 3);
        assert_eq!(pieces[2].chars().count(), 100);
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk_size() {
        let bad = ChunkingConfig {
            max_chars: 50,
            overlap_chars: 50,
        };
        assert!(matches!(
            split_text("anything", bad),
            Err(IngestError::InvalidChunkConfig(_))
        ));
    }

    #[test]
    fn build_chunks_assigns_sequential_indices_and_provenance() {
        let text = "x".repeat(1_200);
        let (chunks, next) = build_chunks("doc-1", "/tmp/a.txt", 1, &text, config(), 7).unwrap();

        assert_eq!(chunks.len(), 3);
        assert_eq!(next, 10);
        assert_eq!(chunks[0].chunk_index, 7);
        assert_eq!(chunks[2].chunk_index, 9);
        assert!(chunks.iter().all(|chunk| chunk.source_path == "/tmp/a.txt"));
        assert_ne!(chunks[0].chunk_id, chunks[1].chunk_id);
    }
}
