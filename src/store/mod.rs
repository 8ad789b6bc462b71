//! Vector store abstraction: collections of documents with metadata,
//! queried by nearest-neighbour similarity over text.

pub mod chroma;
pub mod memory;

pub use chroma::ChromaStore;
pub use memory::MemoryStore;

use crate::embedding::EmbeddingFunction;
use crate::error::StoreError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Flat metadata stored next to each document.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Distance metric used by a collection's index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Distance {
    #[serde(rename = "cosine")]
    Cosine,
    #[serde(rename = "l2")]
    L2,
    #[serde(rename = "ip")]
    InnerProduct,
}

impl Distance {
    /// Name understood by Chroma's `hnsw:space` setting.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::L2 => "l2",
            Self::InnerProduct => "ip",
        }
    }

    /// Distance between two vectors; smaller is closer.
    pub fn between(&self, a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        match self {
            Self::Cosine => {
                let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
                let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
                if na == 0.0 || nb == 0.0 {
                    1.0
                } else {
                    1.0 - dot / (na * nb)
                }
            }
            Self::L2 => a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum(),
            Self::InnerProduct => 1.0 - dot,
        }
    }
}

/// Fields a query may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Include {
    Metadatas,
    Documents,
    Distances,
}

impl Include {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Metadatas => "metadatas",
            Self::Documents => "documents",
            Self::Distances => "distances",
        }
    }
}

/// One document to upsert.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: String,
    pub metadata: Metadata,
    pub document: String,
}

/// Result of a get-by-ids. Missing ids are simply absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetResult {
    pub ids: Vec<String>,
    pub metadatas: Vec<Metadata>,
}

/// Result of a similarity query. The outer vectors hold one entry per query text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub ids: Vec<Vec<String>>,
    pub metadatas: Vec<Vec<Metadata>>,
    pub documents: Vec<Vec<String>>,
    pub distances: Vec<Vec<f32>>,
}

/// A vector store holding named collections.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Open the named collection, creating it if needed.
    ///
    /// The embedding function, when present, is used by the collection to
    /// embed documents on upsert and texts on query.
    async fn get_or_create_collection(
        &self,
        name: &str,
        embedder: Option<Arc<dyn EmbeddingFunction>>,
        distance: Distance,
    ) -> StoreResult<Arc<dyn Collection>>;
}

/// A handle to one collection. Each operation is atomic at the backend.
#[async_trait]
pub trait Collection: Send + Sync {
    fn name(&self) -> &str;

    /// Insert or overwrite records by id.
    async fn upsert(&self, records: &[Record]) -> StoreResult<()>;

    async fn get(&self, ids: &[String]) -> StoreResult<GetResult>;

    /// Nearest neighbours of each query text, closest first.
    async fn query(
        &self,
        query_texts: &[String],
        n_results: usize,
        include: &[Include],
    ) -> StoreResult<QueryResult>;

    async fn count(&self) -> StoreResult<usize>;
}
