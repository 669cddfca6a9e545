use crate::error::ServiceError;
use async_trait::async_trait;

/// Prompt in, text out. Non-streaming.
#[async_trait]
pub trait Generator: Send + Sync {
    fn name(&self) -> &str;

    fn model(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String, ServiceError>;

    async fn health_check(&self) -> Result<(), ServiceError> {
        Ok(())
    }
}
