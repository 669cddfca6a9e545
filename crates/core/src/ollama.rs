//! HTTP client for a local Ollama server, plus the [`Embedder`] and
//! [`Generator`] adapters built on it.

use crate::embeddings::Embedder;
use crate::error::ServiceError;
use crate::generation::Generator;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_GENERATE_MODEL: &str = "mistral:7b";
pub const DEFAULT_EMBED_MODEL: &str = "all-minilm";

#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub base_url: Url,
    pub generate_model: String,
    pub embed_model: String,
    pub temperature: f32,
    /// Applied to every request, generation included.
    pub timeout: Duration,
}

impl OllamaConfig {
    /// The base URL always ends in `/`, so a path prefix such as
    /// `http://proxy/ollama` survives joining the API routes onto it.
    pub fn new(base_url: &str) -> Result<Self, ServiceError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            base_url,
            generate_model: DEFAULT_GENERATE_MODEL.to_string(),
            embed_model: DEFAULT_EMBED_MODEL.to_string(),
            temperature: 0.7,
            timeout: Duration::from_secs(120),
        })
    }
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

pub struct OllamaClient {
    config: OllamaConfig,
    client: Client,
}

impl OllamaClient {
    pub fn new(config: OllamaConfig) -> Result<Self, ServiceError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> Result<Url, ServiceError> {
        Ok(self.config.base_url.join(path)?)
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        let response = self
            .client
            .post(self.endpoint("api/embeddings")?)
            .json(&EmbedRequest {
                model: &self.config.embed_model,
                prompt: text,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(backend_error(response).await);
        }

        let payload: EmbedResponse = response.json().await?;
        if payload.embedding.is_empty() {
            return Err(ServiceError::BackendResponse {
                backend: "ollama".to_string(),
                details: format!("model {} returned an empty embedding", self.config.embed_model),
            });
        }

        Ok(payload.embedding)
    }

    pub async fn generate(&self, prompt: &str) -> Result<String, ServiceError> {
        debug!(model = %self.config.generate_model, prompt_chars = prompt.len(), "ollama generate");

        let response = self
            .client
            .post(self.endpoint("api/generate")?)
            .json(&GenerateRequest {
                model: &self.config.generate_model,
                prompt,
                stream: false,
                options: GenerateOptions {
                    temperature: self.config.temperature,
                },
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(backend_error(response).await);
        }

        let payload: GenerateResponse = response.json().await?;
        Ok(payload.response)
    }

    pub async fn list_models(&self) -> Result<Vec<String>, ServiceError> {
        let endpoint = self.endpoint("api/tags")?;
        let response = self
            .client
            .get(endpoint.clone())
            .send()
            .await
            .map_err(|error| ServiceError::Unavailable {
                service: "ollama".to_string(),
                endpoint: endpoint.to_string(),
                details: error.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(ServiceError::Unavailable {
                service: "ollama".to_string(),
                endpoint: endpoint.to_string(),
                details: response.status().to_string(),
            });
        }

        let tags: TagsResponse = response.json().await?;
        Ok(tags.models.into_iter().map(|model| model.name).collect())
    }

    /// Fails when the server is unreachable. A missing model is only logged.
    pub async fn health_check(&self, model: &str) -> Result<(), ServiceError> {
        let models = self.list_models().await?;
        if !model_is_pulled(&models, model) {
            warn!(model, available = ?models, "model is not pulled on the ollama server");
        }
        Ok(())
    }
}

fn model_is_pulled(available: &[String], model: &str) -> bool {
    let tagged = format!("{model}:latest");
    available
        .iter()
        .any(|name| name == model || *name == tagged)
}

async fn backend_error(response: reqwest::Response) -> ServiceError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    ServiceError::BackendResponse {
        backend: "ollama".to_string(),
        details: format!("{status}: {}", body.trim()),
    }
}

pub struct OllamaEmbedder {
    client: Arc<OllamaClient>,
}

impl OllamaEmbedder {
    pub fn new(client: Arc<OllamaClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        self.client.embed(text).await
    }

    async fn health_check(&self) -> Result<(), ServiceError> {
        self.client
            .health_check(&self.client.config().embed_model)
            .await
    }
}

pub struct OllamaGenerator {
    client: Arc<OllamaClient>,
}

impl OllamaGenerator {
    pub fn new(client: Arc<OllamaClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.client.config().generate_model
    }

    async fn generate(&self, prompt: &str) -> Result<String, ServiceError> {
        self.client.generate(prompt).await
    }

    async fn health_check(&self) -> Result<(), ServiceError> {
        self.client
            .health_check(&self.client.config().generate_model)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_local_server() {
        let config = OllamaConfig::new(DEFAULT_OLLAMA_URL).unwrap();
        assert_eq!(config.generate_model, "mistral:7b");
        assert_eq!(config.embed_model, "all-minilm");
        assert_eq!(config.base_url.port(), Some(11434));
    }

    #[test]
    fn malformed_base_url_is_rejected() {
        assert!(matches!(
            OllamaConfig::new("not a url"),
            Err(ServiceError::Url(_))
        ));
    }

    #[test]
    fn endpoints_join_onto_base_url() {
        let client = OllamaClient::new(OllamaConfig::new("http://models.local:11434/").unwrap())
            .unwrap();
        assert_eq!(
            client.endpoint("api/generate").unwrap().as_str(),
            "http://models.local:11434/api/generate"
        );
    }

    #[test]
    fn proxied_base_path_is_kept() {
        for base in ["http://gateway.local/ollama", "http://gateway.local/ollama/"] {
            let client = OllamaClient::new(OllamaConfig::new(base).unwrap()).unwrap();
            assert_eq!(
                client.endpoint("api/embeddings").unwrap().as_str(),
                "http://gateway.local/ollama/api/embeddings"
            );
        }
    }

    #[test]
    fn latest_tag_counts_as_pulled() {
        let available = vec!["mistral:7b".to_string(), "all-minilm:latest".to_string()];
        assert!(model_is_pulled(&available, "mistral:7b"));
        assert!(model_is_pulled(&available, "all-minilm"));
        assert!(!model_is_pulled(&available, "llama3"));
    }

    #[test]
    fn generate_response_ignores_extra_fields() {
        let payload: GenerateResponse = serde_json::from_str(
            r#"{"model":"mistral:7b","response":"Paris.","done":true,"total_duration":12}"#,
        )
        .unwrap();
        assert_eq!(payload.response, "Paris.");
    }

    #[tokio::test]
    async fn unreachable_server_fails_health_check() {
        let mut config = OllamaConfig::new("http://127.0.0.1:9").unwrap();
        config.timeout = Duration::from_secs(2);
        let client = OllamaClient::new(config).unwrap();

        let result = client.health_check("mistral:7b").await;
        assert!(matches!(result, Err(ServiceError::Unavailable { .. })));
    }
}
