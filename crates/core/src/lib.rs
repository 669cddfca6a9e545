pub mod chunking;
pub mod embeddings;
pub mod error;
pub mod generation;
pub mod ingest;
pub mod loaders;
pub mod models;
pub mod ollama;
pub mod pipeline;
pub mod prompts;
pub mod session;
pub mod stores;
pub mod traits;

pub use chunking::{build_chunks, split_text, ChunkingConfig};
pub use embeddings::{CharacterNgramEmbedder, Embedder, DEFAULT_EMBEDDING_DIMENSIONS};
pub use error::{IngestError, PipelineError, Result, ServiceError};
pub use generation::Generator;
pub use ingest::{
    digest_file, discover_supported_files, prepare_document, FolderReport, PreparedDocument,
    SkippedFile,
};
pub use loaders::{load_blocks, DocumentLoader};
pub use models::{
    Chunk, DocumentFormat, DocumentRecord, IngestSummary, PipelineOptions, ScoredChunk,
    SessionId, TextBlock,
};
pub use ollama::{
    OllamaClient, OllamaConfig, OllamaEmbedder, OllamaGenerator, DEFAULT_EMBED_MODEL,
    DEFAULT_GENERATE_MODEL, DEFAULT_OLLAMA_URL,
};
pub use pipeline::{Pipeline, Services};
pub use session::{IsolatedComparison, Workspace};
pub use stores::{InMemoryIndex, IndexBackend, QdrantIndex};
pub use traits::VectorIndex;
