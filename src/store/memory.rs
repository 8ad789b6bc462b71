//! In-process vector store.
//!
//! Collections live in memory for the lifetime of the store. Each operation
//! takes the collection lock once, so upserts, gets and queries are atomic
//! with respect to each other.

use super::{
    Collection, Distance, GetResult, Include, Metadata, QueryResult, Record, StoreResult,
    VectorStore,
};
use crate::embedding::EmbeddingFunction;
use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Vector store keeping every collection in process memory.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Arc<MemoryCollection>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn get_or_create_collection(
        &self,
        name: &str,
        embedder: Option<Arc<dyn EmbeddingFunction>>,
        distance: Distance,
    ) -> StoreResult<Arc<dyn Collection>> {
        let mut collections = self.collections.write().await;
        let collection: Arc<dyn Collection> = collections
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!("Creating in-memory collection '{}'", name);
                Arc::new(MemoryCollection {
                    name: name.to_string(),
                    distance,
                    embedder: embedder.clone(),
                    records: RwLock::new(HashMap::new()),
                })
            })
            .clone();
        Ok(collection)
    }
}

struct StoredRecord {
    metadata: Metadata,
    document: String,
    embedding: Option<Vec<f32>>,
}

/// A collection inside a [`MemoryStore`].
pub struct MemoryCollection {
    name: String,
    distance: Distance,
    embedder: Option<Arc<dyn EmbeddingFunction>>,
    records: RwLock<HashMap<String, StoredRecord>>,
}

impl MemoryCollection {
    async fn embed(&self, texts: &[String]) -> StoreResult<Option<Vec<Vec<f32>>>> {
        let Some(embedder) = &self.embedder else {
            return Ok(None);
        };
        let vectors = embedder
            .embed(texts)
            .await
            .map_err(|e| StoreError::Embedding(e.to_string()))?;
        if vectors.len() != texts.len() {
            return Err(StoreError::Embedding(format!(
                "expected {} vectors, got {}",
                texts.len(),
                vectors.len()
            )));
        }
        Ok(Some(vectors))
    }
}

#[async_trait]
impl Collection for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn upsert(&self, records: &[Record]) -> StoreResult<()> {
        let documents: Vec<String> = records.iter().map(|r| r.document.clone()).collect();
        let embeddings = self.embed(&documents).await?;

        let mut stored = self.records.write().await;
        for (i, record) in records.iter().enumerate() {
            stored.insert(
                record.id.clone(),
                StoredRecord {
                    metadata: record.metadata.clone(),
                    document: record.document.clone(),
                    embedding: embeddings.as_ref().map(|e| e[i].clone()),
                },
            );
        }
        Ok(())
    }

    async fn get(&self, ids: &[String]) -> StoreResult<GetResult> {
        let stored = self.records.read().await;
        let mut result = GetResult::default();
        for id in ids {
            if let Some(record) = stored.get(id) {
                result.ids.push(id.clone());
                result.metadatas.push(record.metadata.clone());
            }
        }
        Ok(result)
    }

    async fn query(
        &self,
        query_texts: &[String],
        n_results: usize,
        include: &[Include],
    ) -> StoreResult<QueryResult> {
        let Some(query_vectors) = self.embed(query_texts).await? else {
            return Err(StoreError::Embedding(format!(
                "collection '{}' has no embedding function",
                self.name
            )));
        };

        let stored = self.records.read().await;
        let mut result = QueryResult::default();

        for query in &query_vectors {
            let mut scored: Vec<(f32, &String, &StoredRecord)> = stored
                .iter()
                .filter_map(|(id, rec)| {
                    rec.embedding
                        .as_ref()
                        .map(|e| (self.distance.between(query, e), id, rec))
                })
                .collect();
            scored.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(b.1)));
            scored.truncate(n_results);

            result.ids.push(scored.iter().map(|(_, id, _)| (*id).clone()).collect());
            if include.contains(&Include::Metadatas) {
                result
                    .metadatas
                    .push(scored.iter().map(|(_, _, r)| r.metadata.clone()).collect());
            }
            if include.contains(&Include::Documents) {
                result
                    .documents
                    .push(scored.iter().map(|(_, _, r)| r.document.clone()).collect());
            }
            if include.contains(&Include::Distances) {
                result.distances.push(scored.iter().map(|(d, _, _)| *d).collect());
            }
        }

        Ok(result)
    }

    async fn count(&self) -> StoreResult<usize> {
        Ok(self.records.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::testing::BagOfWords;
    use serde_json::json;

    fn record(id: &str, doc: &str) -> Record {
        let mut metadata = Metadata::new();
        metadata.insert("id".into(), json!(id));
        Record {
            id: id.into(),
            metadata,
            document: doc.into(),
        }
    }

    async fn collection_with_embedder() -> Arc<dyn Collection> {
        MemoryStore::new()
            .get_or_create_collection("tools", Some(Arc::new(BagOfWords)), Distance::Cosine)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_get_or_create_reuses_collection() {
        let store = MemoryStore::new();
        let a = store
            .get_or_create_collection("tools", None, Distance::Cosine)
            .await
            .unwrap();
        a.upsert(&[record("x", "doc")]).await.unwrap();

        let b = store
            .get_or_create_collection("tools", None, Distance::Cosine)
            .await
            .unwrap();
        assert_eq!(b.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_upsert_overwrites_by_id() {
        let col = collection_with_embedder().await;
        col.upsert(&[record("a", "first")]).await.unwrap();
        let mut second = record("a", "second");
        second.metadata.insert("v".into(), json!(2));
        col.upsert(&[second]).await.unwrap();

        assert_eq!(col.count().await.unwrap(), 1);
        let got = col.get(&["a".to_string()]).await.unwrap();
        assert_eq!(got.metadatas[0]["v"], json!(2));
    }

    #[tokio::test]
    async fn test_get_skips_missing_ids() {
        let col = collection_with_embedder().await;
        col.upsert(&[record("a", "alpha")]).await.unwrap();
        let got = col
            .get(&["a".to_string(), "missing".to_string()])
            .await
            .unwrap();
        assert_eq!(got.ids, vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn test_query_orders_by_similarity() {
        let col = collection_with_embedder().await;
        col.upsert(&[
            record("weather", "get_weather: current weather for a city"),
            record("email", "send_email: send an email message"),
            record("stocks", "get_stock_price: latest stock quote"),
        ])
        .await
        .unwrap();

        let result = col
            .query(
                &["what is the weather in a city".to_string()],
                2,
                &[Include::Metadatas, Include::Distances],
            )
            .await
            .unwrap();

        assert_eq!(result.ids.len(), 1);
        assert_eq!(result.ids[0].len(), 2);
        assert_eq!(result.ids[0][0], "weather");
        assert_eq!(result.metadatas[0].len(), 2);
        assert!(result.distances[0][0] <= result.distances[0][1]);
        assert!(result.documents.is_empty());
    }

    #[tokio::test]
    async fn test_query_without_embedder_fails() {
        let col = MemoryStore::new()
            .get_or_create_collection("tools", None, Distance::Cosine)
            .await
            .unwrap();
        col.upsert(&[record("a", "alpha")]).await.unwrap();

        let err = col
            .query(&["alpha".to_string()], 1, &[Include::Metadatas])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Embedding(_)));
    }

    #[tokio::test]
    async fn test_query_caps_at_collection_size() {
        let col = collection_with_embedder().await;
        col.upsert(&[record("a", "alpha")]).await.unwrap();
        let result = col
            .query(&["alpha".to_string()], 10, &[Include::Metadatas])
            .await
            .unwrap();
        assert_eq!(result.ids[0].len(), 1);
    }
}
