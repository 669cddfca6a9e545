use crate::traits::{check_embedding_count, VectorIndex};
use crate::{Chunk, ScoredChunk, ServiceError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{info, warn};

/// One Qdrant collection per session. The collection is created on the first
/// insert, sized to the first embedding.
pub struct QdrantIndex {
    endpoint: String,
    collection: String,
    client: Client,
    vector_size: usize,
    next_id: u64,
    created: bool,
}

impl QdrantIndex {
    pub fn new(
        endpoint: impl Into<String>,
        collection: impl Into<String>,
        vector_size: usize,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            collection: collection.into(),
            client: Client::builder().timeout(timeout).build()?,
            vector_size,
            next_id: 0,
            created: false,
        })
    }

    async fn ensure_collection(&mut self) -> Result<(), ServiceError> {
        if self.created {
            return Ok(());
        }

        let response = self
            .client
            .put(format!("{}/collections/{}", self.endpoint, self.collection))
            .json(&json!({
                "vectors": {
                    "size": self.vector_size,
                    "distance": "Cosine",
                }
            }))
            .send()
            .await?;

        // 409 means an earlier attempt in this session already created it.
        if response.status() == StatusCode::CONFLICT {
            warn!(collection = %self.collection, "qdrant collection already exists");
        } else if !response.status().is_success() {
            return Err(backend_error(response.status()));
        } else {
            info!(collection = %self.collection, vector_size = self.vector_size, "created qdrant collection");
        }
        self.created = true;
        Ok(())
    }

    fn check_dimensions(&self, vector: &[f32]) -> Result<(), ServiceError> {
        if vector.len() != self.vector_size {
            return Err(ServiceError::Request(format!(
                "embedding dimension {} != {}",
                vector.len(),
                self.vector_size
            )));
        }
        Ok(())
    }
}

fn backend_error(status: StatusCode) -> ServiceError {
    ServiceError::BackendResponse {
        backend: "qdrant".to_string(),
        details: status.to_string(),
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    fn backend(&self) -> &str {
        "qdrant"
    }

    fn len(&self) -> usize {
        self.next_id as usize
    }

    async fn insert(
        &mut self,
        chunks: &[Chunk],
        embeddings: &[Vec<f32>],
    ) -> Result<(), ServiceError> {
        check_embedding_count(chunks, embeddings)?;

        let points = chunks
            .iter()
            .zip(embeddings.iter())
            .enumerate()
            .map(|(offset, (chunk, embedding))| {
                self.check_dimensions(embedding)?;
                Ok(json!({
                    "id": self.next_id + offset as u64,
                    "vector": embedding,
                    "payload": serde_json::to_value(chunk)?,
                }))
            })
            .collect::<Result<Vec<_>, ServiceError>>()?;

        if points.is_empty() {
            return Ok(());
        }

        self.ensure_collection().await?;

        let response = self
            .client
            .put(format!(
                "{}/collections/{}/points?wait=true",
                self.endpoint, self.collection
            ))
            .json(&json!({ "points": points }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(backend_error(response.status()));
        }

        self.next_id += points.len() as u64;
        Ok(())
    }

    async fn query(
        &self,
        query_vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, ServiceError> {
        self.check_dimensions(query_vector)?;
        if !self.created {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(format!(
                "{}/collections/{}/points/search",
                self.endpoint, self.collection
            ))
            .json(&json!({
                "vector": query_vector,
                "limit": top_k,
                "with_payload": true,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(backend_error(response.status()));
        }

        let parsed: Value = response.json().await?;
        parse_points(parsed.pointer("/result"))
    }

    async fn sample(&self, k: usize) -> Result<Vec<Chunk>, ServiceError> {
        if !self.created || k == 0 {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(format!(
                "{}/collections/{}/points/scroll",
                self.endpoint, self.collection
            ))
            .json(&json!({
                "limit": k,
                "with_payload": true,
                "with_vector": false,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(backend_error(response.status()));
        }

        let parsed: Value = response.json().await?;
        Ok(parse_points(parsed.pointer("/result/points"))?
            .into_iter()
            .map(|hit| hit.chunk)
            .collect())
    }

    async fn destroy(&mut self) -> Result<(), ServiceError> {
        if !self.created {
            return Ok(());
        }

        let response = self
            .client
            .delete(format!("{}/collections/{}", self.endpoint, self.collection))
            .send()
            .await?;

        if !response.status().is_success() && response.status() != StatusCode::NOT_FOUND {
            return Err(backend_error(response.status()));
        }

        info!(collection = %self.collection, points = self.next_id, "dropped qdrant collection");
        self.created = false;
        self.next_id = 0;
        Ok(())
    }
}

fn parse_points(points: Option<&Value>) -> Result<Vec<ScoredChunk>, ServiceError> {
    let points = points.and_then(Value::as_array).ok_or_else(|| {
        ServiceError::BackendResponse {
            backend: "qdrant".to_string(),
            details: "response has no point list".to_string(),
        }
    })?;

    points
        .iter()
        .map(|point| {
            let payload = point.get("payload").cloned().unwrap_or(Value::Null);
            Ok(ScoredChunk {
                chunk: serde_json::from_value(payload)?,
                score: point.pointer("/score").and_then(Value::as_f64).unwrap_or(0.0),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn chunk() -> Chunk {
        Chunk {
            chunk_id: "abc".to_string(),
            document_id: "doc-1".to_string(),
            source_path: "/tmp/a.pdf".to_string(),
            block: 2,
            chunk_index: 5,
            text: "valve torque values".to_string(),
        }
    }

    fn index() -> QdrantIndex {
        QdrantIndex::new("http://localhost:6333/", "docqa_test", 3, Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn search_result_payloads_become_chunks() {
        let body = json!({
            "result": [
                { "id": 5, "score": 0.91, "payload": serde_json::to_value(chunk()).unwrap() }
            ],
            "status": "ok"
        });

        let hits = parse_points(body.pointer("/result")).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk, chunk());
        assert!((hits[0].score - 0.91).abs() < 1e-9);
    }

    #[test]
    fn missing_point_list_is_a_backend_error() {
        let body = json!({ "status": "ok" });
        assert!(matches!(
            parse_points(body.pointer("/result/points")),
            Err(ServiceError::BackendResponse { .. })
        ));
    }

    #[tokio::test]
    async fn count_mismatch_fails_before_any_request() {
        let mut index = index();
        let result = index.insert(&[chunk()], &[]).await;
        assert!(matches!(result, Err(ServiceError::Request(_))));
        assert_eq!(index.len(), 0);
    }

    #[tokio::test]
    async fn wrong_dimension_fails_before_any_request() {
        let mut index = index();
        let result = index.insert(&[chunk()], &[vec![1.0, 0.0]]).await;
        assert!(matches!(result, Err(ServiceError::Request(_))));
    }

    #[tokio::test]
    async fn query_before_first_insert_is_empty() {
        let index = index();
        assert!(index.query(&[1.0, 0.0, 0.0], 4).await.unwrap().is_empty());
        assert!(index.sample(2).await.unwrap().is_empty());
    }

    fn index_at(server: &MockServer) -> QdrantIndex {
        QdrantIndex::new(server.uri(), "docqa_test", 3, Duration::from_secs(5)).unwrap()
    }

    async fn mount(server: &MockServer, verb: &str, route: &str, status: u16, times: u64) {
        Mock::given(method(verb))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({ "status": "ok" })))
            .expect(times)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn existing_collection_is_reused() {
        let server = MockServer::start().await;
        mount(&server, "PUT", "/collections/docqa_test", 409, 1).await;
        mount(&server, "PUT", "/collections/docqa_test/points", 200, 1).await;

        let mut index = index_at(&server);
        index.insert(&[chunk()], &[vec![1.0, 0.0, 0.0]]).await.unwrap();
        assert_eq!(index.len(), 1);
    }

    #[tokio::test]
    async fn failed_upsert_does_not_recreate_the_collection() {
        let server = MockServer::start().await;
        mount(&server, "PUT", "/collections/docqa_test", 200, 1).await;
        Mock::given(method("PUT"))
            .and(path("/collections/docqa_test/points"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        mount(&server, "PUT", "/collections/docqa_test/points", 200, 1).await;

        let mut index = index_at(&server);
        let first = index.insert(&[chunk()], &[vec![1.0, 0.0, 0.0]]).await;
        assert!(matches!(first, Err(ServiceError::BackendResponse { .. })));
        assert_eq!(index.len(), 0);

        index.insert(&[chunk()], &[vec![1.0, 0.0, 0.0]]).await.unwrap();
        assert_eq!(index.len(), 1);
    }

    #[tokio::test]
    async fn destroy_drops_the_collection_once() {
        let server = MockServer::start().await;
        mount(&server, "PUT", "/collections/docqa_test", 200, 1).await;
        mount(&server, "PUT", "/collections/docqa_test/points", 200, 1).await;
        mount(&server, "DELETE", "/collections/docqa_test", 200, 1).await;

        let mut index = index_at(&server);
        index.insert(&[chunk()], &[vec![1.0, 0.0, 0.0]]).await.unwrap();
        index.destroy().await.unwrap();
        index.destroy().await.unwrap();
        assert!(index.is_empty());
    }

    #[tokio::test]
    async fn destroy_before_any_insert_sends_nothing() {
        let server = MockServer::start().await;
        let mut index = index_at(&server);
        index.destroy().await.unwrap();

        let requests = server.received_requests().await.unwrap_or_default();
        assert!(requests.is_empty());
    }
}
