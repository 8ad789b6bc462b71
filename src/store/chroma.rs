//! Chroma vector store client (REST API v1).
//!
//! Embeddings are computed client-side with the collection's embedding
//! function and sent alongside documents and query requests.

use super::{
    Collection, Distance, GetResult, Include, Metadata, QueryResult, Record, StoreResult,
    VectorStore,
};
use crate::embedding::EmbeddingFunction;
use crate::error::StoreError;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Chroma server client.
#[derive(Debug, Clone)]
pub struct ChromaStore {
    base_url: String,
    http: reqwest::Client,
}

// -- Request / response types -----------------------------------------------

#[derive(Debug, Serialize)]
struct CreateCollectionRequest<'a> {
    name: &'a str,
    metadata: serde_json::Value,
    get_or_create: bool,
}

#[derive(Debug, Deserialize)]
struct CollectionResponse {
    id: String,
    name: String,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    ids: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    embeddings: Option<Vec<Vec<f32>>>,
    metadatas: Vec<&'a Metadata>,
    documents: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
struct GetRequest<'a> {
    ids: &'a [String],
    include: Vec<&'static str>,
}

#[derive(Debug, Deserialize)]
struct GetResponse {
    ids: Vec<String>,
    #[serde(default)]
    metadatas: Option<Vec<Option<Metadata>>>,
}

#[derive(Debug, Serialize)]
struct QueryRequest {
    query_embeddings: Vec<Vec<f32>>,
    n_results: usize,
    include: Vec<&'static str>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    ids: Vec<Vec<String>>,
    #[serde(default)]
    metadatas: Option<Vec<Vec<Option<Metadata>>>>,
    #[serde(default)]
    documents: Option<Vec<Vec<Option<String>>>>,
    #[serde(default)]
    distances: Option<Vec<Vec<f32>>>,
}

/// Map a failed HTTP response onto a typed store error.
///
/// Chroma reports missing collections with a 404 on newer servers and with a
/// 500 whose body says the collection "does not exist" on older ones.
fn classify_failure(status: StatusCode, body: &str) -> StoreError {
    let lower = body.to_lowercase();
    if status == StatusCode::NOT_FOUND
        || lower.contains("does not exist")
        || lower.contains("not found")
    {
        StoreError::NotFound(body.to_string())
    } else {
        StoreError::Backend(format!("({}) {}", status, body))
    }
}

fn send_error(err: reqwest::Error) -> StoreError {
    if err.is_connect() || err.is_timeout() {
        StoreError::Connection(err.to_string())
    } else {
        StoreError::Backend(err.to_string())
    }
}

/// Any non-2xx heartbeat means the server at this URL is not a usable Chroma v1 API.
fn heartbeat_failure(status: StatusCode, body: &str) -> StoreError {
    StoreError::Connection(format!("heartbeat returned {}: {}", status, body))
}

fn check_vector_count(expected: usize, got: usize) -> StoreResult<()> {
    if expected != got {
        return Err(StoreError::Embedding(format!(
            "expected {} vectors, got {}",
            expected, got
        )));
    }
    Ok(())
}

async fn read_json<R: DeserializeOwned>(resp: reqwest::Response) -> StoreResult<R> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(classify_failure(status, &body));
    }
    resp.json()
        .await
        .map_err(|e| StoreError::Backend(format!("failed to decode response: {}", e)))
}

impl ChromaStore {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Check that the server answers.
    pub async fn heartbeat(&self) -> StoreResult<()> {
        let resp = self
            .http
            .get(format!("{}/api/v1/heartbeat", self.base_url))
            .send()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(heartbeat_failure(status, &body));
        }
        Ok(())
    }
}

#[async_trait]
impl VectorStore for ChromaStore {
    async fn get_or_create_collection(
        &self,
        name: &str,
        embedder: Option<Arc<dyn EmbeddingFunction>>,
        distance: Distance,
    ) -> StoreResult<Arc<dyn Collection>> {
        self.heartbeat().await?;

        let resp = self
            .http
            .post(format!("{}/api/v1/collections", self.base_url))
            .json(&CreateCollectionRequest {
                name,
                metadata: serde_json::json!({ "hnsw:space": distance.as_str() }),
                get_or_create: true,
            })
            .send()
            .await
            .map_err(send_error)?;

        let body: CollectionResponse = read_json(resp).await?;
        info!("Connected to Chroma collection '{}' ({})", body.name, body.id);

        Ok(Arc::new(ChromaCollection {
            base_url: self.base_url.clone(),
            id: body.id,
            name: body.name,
            embedder,
            http: self.http.clone(),
        }))
    }
}

/// A collection on a Chroma server.
pub struct ChromaCollection {
    base_url: String,
    id: String,
    name: String,
    embedder: Option<Arc<dyn EmbeddingFunction>>,
    http: reqwest::Client,
}

impl ChromaCollection {
    fn url(&self, op: &str) -> String {
        format!("{}/api/v1/collections/{}/{}", self.base_url, self.id, op)
    }

    async fn embed(&self, texts: &[String]) -> StoreResult<Option<Vec<Vec<f32>>>> {
        let Some(embedder) = &self.embedder else {
            return Ok(None);
        };
        let vectors = embedder
            .embed(texts)
            .await
            .map_err(|e| StoreError::Embedding(e.to_string()))?;
        check_vector_count(texts.len(), vectors.len())?;
        Ok(Some(vectors))
    }
}

#[async_trait]
impl Collection for ChromaCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn upsert(&self, records: &[Record]) -> StoreResult<()> {
        let documents: Vec<String> = records.iter().map(|r| r.document.clone()).collect();
        let embeddings = self.embed(&documents).await?;

        debug!("Chroma upsert: {} records into '{}'", records.len(), self.name);

        let resp = self
            .http
            .post(self.url("upsert"))
            .json(&UpsertRequest {
                ids: records.iter().map(|r| r.id.as_str()).collect(),
                embeddings,
                metadatas: records.iter().map(|r| &r.metadata).collect(),
                documents: records.iter().map(|r| r.document.as_str()).collect(),
            })
            .send()
            .await
            .map_err(send_error)?;

        let _: serde_json::Value = read_json(resp).await?;
        Ok(())
    }

    async fn get(&self, ids: &[String]) -> StoreResult<GetResult> {
        let resp = self
            .http
            .post(self.url("get"))
            .json(&GetRequest {
                ids,
                include: vec![Include::Metadatas.as_str()],
            })
            .send()
            .await
            .map_err(send_error)?;

        let body: GetResponse = read_json(resp).await?;
        Ok(into_get_result(body))
    }

    async fn query(
        &self,
        query_texts: &[String],
        n_results: usize,
        include: &[Include],
    ) -> StoreResult<QueryResult> {
        let Some(query_embeddings) = self.embed(query_texts).await? else {
            return Err(StoreError::Embedding(format!(
                "collection '{}' has no embedding function",
                self.name
            )));
        };

        debug!("Chroma query: {} texts, n_results={}", query_texts.len(), n_results);

        let resp = self
            .http
            .post(self.url("query"))
            .json(&QueryRequest {
                query_embeddings,
                n_results,
                include: include.iter().map(|i| i.as_str()).collect(),
            })
            .send()
            .await
            .map_err(send_error)?;

        let body: QueryResponse = read_json(resp).await?;
        Ok(into_query_result(body))
    }

    async fn count(&self) -> StoreResult<usize> {
        let resp = self
            .http
            .get(self.url("count"))
            .send()
            .await
            .map_err(send_error)?;
        read_json(resp).await
    }
}

fn into_get_result(body: GetResponse) -> GetResult {
    let metadatas = body
        .metadatas
        .unwrap_or_default()
        .into_iter()
        .map(Option::unwrap_or_default)
        .collect();
    GetResult {
        ids: body.ids,
        metadatas,
    }
}

fn into_query_result(body: QueryResponse) -> QueryResult {
    QueryResult {
        ids: body.ids,
        metadatas: body
            .metadatas
            .unwrap_or_default()
            .into_iter()
            .map(|row| row.into_iter().map(Option::unwrap_or_default).collect())
            .collect(),
        documents: body
            .documents
            .unwrap_or_default()
            .into_iter()
            .map(|row| row.into_iter().map(Option::unwrap_or_default).collect())
            .collect(),
        distances: body.distances.unwrap_or_default(),
    }
}
