pub mod memory;
pub mod qdrant;

pub use memory::InMemoryIndex;
pub use qdrant::QdrantIndex;

use crate::traits::VectorIndex;
use crate::{ServiceError, SessionId};
use std::time::Duration;

/// Which index service a pipeline opens on its first ingest.
#[derive(Debug, Clone, Default)]
pub enum IndexBackend {
    #[default]
    InMemory,
    Qdrant {
        endpoint: String,
        collection_prefix: String,
        timeout: Duration,
    },
}

impl IndexBackend {
    pub fn open(
        &self,
        session: &SessionId,
        dimensions: usize,
    ) -> Result<Box<dyn VectorIndex>, ServiceError> {
        match self {
            IndexBackend::InMemory => Ok(Box::new(InMemoryIndex::new(dimensions))),
            IndexBackend::Qdrant {
                endpoint,
                collection_prefix,
                timeout,
            } => Ok(Box::new(QdrantIndex::new(
                endpoint.clone(),
                format!("{collection_prefix}_{}", session.simple()),
                dimensions,
                *timeout,
            )?)),
        }
    }
}
