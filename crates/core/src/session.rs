use crate::pipeline::{Pipeline, Services};
use crate::prompts;
use crate::{PipelineError, PipelineOptions, Result, SessionId};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

/// Independent pipelines keyed by session id. Nothing is shared between
/// sessions except the embedding and generation services.
pub struct Workspace {
    services: Services,
    options: PipelineOptions,
    sessions: BTreeMap<SessionId, Pipeline>,
}

#[derive(Debug, Clone)]
pub struct IsolatedComparison {
    pub first_session: SessionId,
    pub second_session: SessionId,
    pub first_summary: String,
    pub second_summary: String,
    pub comparison: String,
}

impl Workspace {
    pub fn new(services: Services, options: PipelineOptions) -> Self {
        Self {
            services,
            options,
            sessions: BTreeMap::new(),
        }
    }

    pub fn open_session(&mut self) -> Result<SessionId> {
        let session = SessionId::new();
        let pipeline = Pipeline::with_session(session, self.services.clone(), self.options.clone())?;
        self.sessions.insert(session, pipeline);
        info!(%session, "session opened");
        Ok(session)
    }

    pub fn session(&self, session: &SessionId) -> Result<&Pipeline> {
        self.sessions
            .get(session)
            .ok_or_else(|| PipelineError::UnknownSession(session.to_string()))
    }

    pub fn session_mut(&mut self, session: &SessionId) -> Result<&mut Pipeline> {
        self.sessions
            .get_mut(session)
            .ok_or_else(|| PipelineError::UnknownSession(session.to_string()))
    }

    /// Removes the session and destroys its index.
    pub async fn close_session(&mut self, session: &SessionId) -> Result<()> {
        let pipeline = self
            .sessions
            .remove(session)
            .ok_or_else(|| PipelineError::UnknownSession(session.to_string()))?;
        let chunks = pipeline.chunk_count();
        pipeline.close().await?;
        info!(%session, chunks, "session closed");
        Ok(())
    }

    /// Closes every session. Each one is attempted; the first failure is
    /// returned after the rest have been closed.
    pub async fn close_all(&mut self) -> Result<()> {
        let mut first_error = None;
        for (session, pipeline) in std::mem::take(&mut self.sessions) {
            if let Err(error) = pipeline.close().await {
                warn!(%session, %error, "failed to release session index");
                first_error.get_or_insert(error);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    pub fn sessions(&self) -> impl Iterator<Item = &SessionId> {
        self.sessions.keys()
    }

    /// Loads each document into a fresh session of its own, summarizes each
    /// from its own index, then asks the generator to compare the summaries.
    /// Both sessions stay open for follow-up questions.
    pub async fn compare_isolated(
        &mut self,
        first: impl AsRef<Path>,
        second: impl AsRef<Path>,
    ) -> Result<IsolatedComparison> {
        let first_session = self.open_session()?;
        let first_summary = {
            let pipeline = self.session_mut(&first_session)?;
            pipeline.ingest(first).await?;
            pipeline.summarize_loaded().await?
        };

        let second_session = self.open_session()?;
        let second_summary = {
            let pipeline = self.session_mut(&second_session)?;
            pipeline.ingest(second).await?;
            pipeline.summarize_loaded().await?
        };

        let comparison = self
            .services
            .generator
            .generate(&prompts::comparison_question(&first_summary, &second_summary))
            .await?;

        Ok(IsolatedComparison {
            first_session,
            second_session,
            first_summary,
            second_summary,
            comparison,
        })
    }
}
