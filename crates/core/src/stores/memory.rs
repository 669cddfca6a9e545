use crate::traits::{check_embedding_count, VectorIndex};
use crate::{Chunk, ScoredChunk, ServiceError};
use async_trait::async_trait;

/// Flat cosine-similarity index held in memory for the life of the process.
#[derive(Debug, Clone)]
pub struct InMemoryIndex {
    dimensions: usize,
    entries: Vec<(Chunk, Vec<f32>)>,
}

impl InMemoryIndex {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            entries: Vec::new(),
        }
    }

    fn check_dimensions(&self, vector: &[f32]) -> Result<(), ServiceError> {
        if vector.len() != self.dimensions {
            return Err(ServiceError::Request(format!(
                "embedding dimension {} != {}",
                vector.len(),
                self.dimensions
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    fn backend(&self) -> &str {
        "memory"
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    async fn insert(
        &mut self,
        chunks: &[Chunk],
        embeddings: &[Vec<f32>],
    ) -> Result<(), ServiceError> {
        check_embedding_count(chunks, embeddings)?;
        for embedding in embeddings {
            self.check_dimensions(embedding)?;
        }

        self.entries.extend(
            chunks
                .iter()
                .cloned()
                .zip(embeddings.iter().cloned()),
        );
        Ok(())
    }

    async fn query(
        &self,
        query_vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, ServiceError> {
        self.check_dimensions(query_vector)?;

        let mut scored = self
            .entries
            .iter()
            .map(|(chunk, embedding)| ScoredChunk {
                chunk: chunk.clone(),
                score: cosine_similarity(query_vector, embedding),
            })
            .collect::<Vec<_>>();

        scored.sort_by(|left, right| right.score.total_cmp(&left.score));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn sample(&self, k: usize) -> Result<Vec<Chunk>, ServiceError> {
        Ok(self
            .entries
            .iter()
            .take(k)
            .map(|(chunk, _)| chunk.clone())
            .collect())
    }
}

pub fn cosine_similarity(left: &[f32], right: &[f32]) -> f64 {
    let mut dot = 0f64;
    let mut left_norm = 0f64;
    let mut right_norm = 0f64;

    for (a, b) in left.iter().zip(right.iter()) {
        let (a, b) = (*a as f64, *b as f64);
        dot += a * b;
        left_norm += a * a;
        right_norm += b * b;
    }

    if left_norm == 0.0 || right_norm == 0.0 {
        return 0.0;
    }

    dot / (left_norm.sqrt() * right_norm.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(index: u64, text: &str) -> Chunk {
        Chunk {
            chunk_id: format!("chunk-{index}"),
            document_id: "doc-1".to_string(),
            source_path: "/tmp/doc.txt".to_string(),
            block: 1,
            chunk_index: index,
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn query_returns_nearest_first() {
        let mut index = InMemoryIndex::new(2);
        index
            .insert(
                &[chunk(0, "east"), chunk(1, "north"), chunk(2, "north-east")],
                &[vec![1.0, 0.0], vec![0.0, 1.0], vec![0.7, 0.7]],
            )
            .await
            .unwrap();

        let hits = index.query(&[0.0, 2.0], 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.text, "north");
        assert_eq!(hits[1].chunk.text, "north-east");
    }

    #[tokio::test]
    async fn inserts_accumulate_and_sample_keeps_insertion_order() {
        let mut index = InMemoryIndex::new(2);
        index.insert(&[chunk(0, "a")], &[vec![1.0, 0.0]]).await.unwrap();
        index
            .insert(&[chunk(1, "b"), chunk(2, "c")], &[vec![0.0, 1.0], vec![1.0, 1.0]])
            .await
            .unwrap();

        assert_eq!(index.len(), 3);
        let sample = index.sample(2).await.unwrap();
        assert_eq!(
            sample.iter().map(|chunk| chunk.text.as_str()).collect::<Vec<_>>(),
            vec!["a", "b"]
        );
        assert_eq!(index.sample(10).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn mismatched_dimensions_are_rejected_without_partial_insert() {
        let mut index = InMemoryIndex::new(2);
        let result = index
            .insert(&[chunk(0, "a"), chunk(1, "b")], &[vec![1.0, 0.0], vec![1.0]])
            .await;

        assert!(matches!(result, Err(ServiceError::Request(_))));
        assert!(index.is_empty());
    }

    #[test]
    fn zero_vectors_have_zero_similarity() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[2.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-9);
    }
}
