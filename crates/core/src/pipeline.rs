use crate::chunking::ChunkingConfig;
use crate::embeddings::Embedder;
use crate::generation::Generator;
use crate::ingest::{discover_supported_files, prepare_document, FolderReport, SkippedFile};
use crate::prompts;
use crate::stores::IndexBackend;
use crate::traits::VectorIndex;
use crate::{
    Chunk, DocumentFormat, DocumentRecord, IngestError, IngestSummary, PipelineError,
    PipelineOptions, Result, SessionId,
};
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The external services a pipeline talks to. Cheap to clone; sessions share
/// the embedder and generator but each opens its own index.
#[derive(Clone)]
pub struct Services {
    pub embedder: Arc<dyn Embedder>,
    pub generator: Arc<dyn Generator>,
    pub backend: IndexBackend,
}

/// One session: an index that appears on first ingest and only grows, plus the
/// document tasks that read from it.
pub struct Pipeline {
    session: SessionId,
    services: Services,
    options: PipelineOptions,
    chunking: ChunkingConfig,
    index: Option<Box<dyn VectorIndex>>,
    documents: Vec<DocumentRecord>,
}

impl Pipeline {
    pub fn new(services: Services, options: PipelineOptions) -> Result<Self> {
        Self::with_session(SessionId::new(), services, options)
    }

    pub fn with_session(
        session: SessionId,
        services: Services,
        options: PipelineOptions,
    ) -> Result<Self> {
        let chunking = ChunkingConfig::from(&options);
        chunking.validate()?;
        if options.top_k == 0 || options.sample_k == 0 {
            return Err(IngestError::InvalidArgument(
                "top_k and sample_k must be at least 1".to_string(),
            )
            .into());
        }

        Ok(Self {
            session,
            services,
            options,
            chunking,
            index: None,
            documents: Vec::new(),
        })
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn is_ready(&self) -> bool {
        self.index.as_ref().is_some_and(|index| !index.is_empty())
    }

    pub fn chunk_count(&self) -> usize {
        self.index.as_ref().map_or(0, |index| index.len())
    }

    pub fn documents(&self) -> &[DocumentRecord] {
        &self.documents
    }

    fn ready_index(&self) -> Result<&dyn VectorIndex> {
        match &self.index {
            Some(index) if !index.is_empty() => Ok(&**index),
            _ => Err(PipelineError::NotReady),
        }
    }

    /// Loads, splits, embeds and indexes one file. Loading the same path twice
    /// indexes its chunks twice.
    pub async fn ingest(&mut self, path: impl AsRef<Path>) -> Result<IngestSummary> {
        let path = path.as_ref();
        let display = path.to_string_lossy().to_string();
        let format = DocumentFormat::from_path_str(&display)
            .ok_or_else(|| PipelineError::UnsupportedFormat(display.clone()))?;

        let first_index = self.chunk_count();
        let prepared = prepare_document(path, format, self.chunking, first_index as u64)?;
        let texts = prepared
            .chunks
            .iter()
            .map(|chunk| chunk.text.clone())
            .collect::<Vec<_>>();
        let embeddings = self.services.embedder.embed_batch(&texts).await?;

        // The opened index stays even when the first insert fails; an empty
        // index still reads as not ready.
        if self.index.is_none() {
            let dimensions = embeddings.first().map_or(0, Vec::len);
            let index = self.services.backend.open(&self.session, dimensions)?;
            info!(
                session = %self.session,
                backend = index.backend(),
                dimensions,
                "index created"
            );
            self.index = Some(index);
        }
        let index = self.index.as_mut().ok_or(PipelineError::NotReady)?;
        index.insert(&prepared.chunks, &embeddings).await?;

        let chunk_count = prepared.chunks.len();
        let total_chunks = self.chunk_count();
        self.documents.push(DocumentRecord {
            document_id: prepared.document_id,
            source_path: prepared.source_path.clone(),
            format,
            checksum: prepared.checksum,
            block_count: prepared.block_count,
            chunk_range: first_index..first_index + chunk_count,
            ingested_at: Utc::now(),
        });

        info!(
            session = %self.session,
            path = %prepared.source_path,
            format = format.label(),
            blocks = prepared.block_count,
            chunks = chunk_count,
            total_chunks,
            "document ingested"
        );

        Ok(IngestSummary {
            source_path: prepared.source_path,
            format,
            chunk_count,
            total_chunks,
        })
    }

    /// Ingests every supported file under `folder`. Files that fail are
    /// reported, not fatal.
    pub async fn ingest_folder(&mut self, folder: impl AsRef<Path>) -> Result<FolderReport> {
        let folder = folder.as_ref();
        let files = discover_supported_files(folder);
        if files.is_empty() {
            return Err(IngestError::InvalidArgument(format!(
                "no supported documents found in {}",
                folder.display()
            ))
            .into());
        }

        let mut report = FolderReport::default();
        for path in files {
            match self.ingest(&path).await {
                Ok(summary) => report.loaded.push(summary),
                Err(PipelineError::ExternalService(error)) => {
                    return Err(PipelineError::ExternalService(error))
                }
                Err(error) => {
                    warn!(path = %path.display(), %error, "skipped document");
                    report.skipped_files.push(SkippedFile {
                        path,
                        reason: error.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }

    /// Ends the session and releases its index, including any collection held
    /// by an external index service.
    pub async fn close(self) -> Result<()> {
        if let Some(mut index) = self.index {
            index.destroy().await?;
            info!(session = %self.session, backend = index.backend(), "index destroyed");
        }
        Ok(())
    }

    async fn retrieve(&self, question: &str) -> Result<Vec<Chunk>> {
        let index = self.ready_index()?;
        let query_vector = self.services.embedder.embed(question).await?;
        let hits = index.query(&query_vector, self.options.top_k).await?;
        debug!(session = %self.session, hits = hits.len(), "retrieved context");
        Ok(hits.into_iter().map(|hit| hit.chunk).collect())
    }

    /// Retrieval-augmented answer; the generator's output is returned as is.
    pub async fn ask(&self, question: &str) -> Result<String> {
        let context = prompts::join_context(&self.retrieve(question).await?);
        let prompt = prompts::retrieval_prompt(question, &context);
        Ok(self.services.generator.generate(&prompt).await?)
    }

    pub async fn summarize(&mut self, path: impl AsRef<Path>) -> Result<String> {
        self.ingest(path).await?;
        self.ask(prompts::SUMMARY_QUESTION).await
    }

    /// Summary of whatever is already indexed, without loading anything.
    pub async fn summarize_loaded(&self) -> Result<String> {
        self.ask(prompts::DETAILED_SUMMARY_QUESTION).await
    }

    /// Summarizes both files into this session's index, then compares the two
    /// summaries. Retrieval for the second summary can see the first
    /// document's chunks.
    pub async fn compare(
        &mut self,
        first: impl AsRef<Path>,
        second: impl AsRef<Path>,
    ) -> Result<String> {
        let first_summary = self.summarize(first).await?;
        let second_summary = self.summarize(second).await?;
        self.ask(&prompts::comparison_question(&first_summary, &second_summary))
            .await
    }

    async fn sampled_text(&self) -> Result<String> {
        let index = self.ready_index()?;
        let sample = index.sample(self.options.sample_k).await?;
        Ok(prompts::join_sample(&sample))
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        Ok(self.services.generator.generate(prompt).await?)
    }

    pub async fn extract_keywords(&self) -> Result<String> {
        let text = self.sampled_text().await?;
        self.generate(&prompts::keywords_prompt(&text)).await
    }

    pub async fn sentiment(&self) -> Result<String> {
        let text = self.sampled_text().await?;
        self.generate(&prompts::sentiment_prompt(&text)).await
    }

    pub async fn translate(&self, target_language: &str) -> Result<String> {
        let text = self.sampled_text().await?;
        self.generate(&prompts::translation_prompt(target_language, &text))
            .await
    }
}
