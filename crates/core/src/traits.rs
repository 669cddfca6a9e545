use crate::{Chunk, ScoredChunk, ServiceError};
use async_trait::async_trait;

/// Nearest-neighbour store over embedded chunks. Append-only.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    fn backend(&self) -> &str;

    /// Number of chunks inserted so far.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn insert(&mut self, chunks: &[Chunk], embeddings: &[Vec<f32>])
        -> Result<(), ServiceError>;

    /// Up to `top_k` chunks, nearest first.
    async fn query(
        &self,
        query_vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, ServiceError>;

    /// The first `k` chunks in insertion order.
    async fn sample(&self, k: usize) -> Result<Vec<Chunk>, ServiceError>;

    /// Removes anything the index keeps outside this process. Indexes that
    /// live only in memory have nothing to release.
    async fn destroy(&mut self) -> Result<(), ServiceError> {
        Ok(())
    }
}

pub(crate) fn check_embedding_count(
    chunks: &[Chunk],
    embeddings: &[Vec<f32>],
) -> Result<(), ServiceError> {
    if chunks.len() != embeddings.len() {
        return Err(ServiceError::Request(format!(
            "embedding count {} doesn't match chunk count {}",
            embeddings.len(),
            chunks.len()
        )));
    }
    Ok(())
}
