//! Embedding functions used to index and query tool definitions.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Turns texts into vectors. One output vector per input text, same order.
#[async_trait]
pub trait EmbeddingFunction: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Embeddings via an OpenAI-compatible `/v1/embeddings` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiEmbeddings {
    base_url: String,
    api_key: String,
    model: String,
    http: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiEmbeddings {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl EmbeddingFunction for OpenAiEmbeddings {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/v1/embeddings", self.base_url);
        debug!("Embedding {} texts with {}", texts.len(), self.model);

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .context("Embedding request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("Embedding failed ({}): {}", status, body);
        }

        let body: EmbeddingResponse =
            resp.json().await.context("Failed to parse embedding response")?;
        into_vectors(body, texts.len())
    }
}

/// Order vectors by their `index` and check there is one per input text.
fn into_vectors(mut body: EmbeddingResponse, expected: usize) -> Result<Vec<Vec<f32>>> {
    if body.data.len() != expected {
        bail!(
            "Embedding count mismatch: sent {}, got {}",
            expected,
            body.data.len()
        );
    }

    body.data.sort_by_key(|d| d.index);
    Ok(body.data.into_iter().map(|d| d.embedding).collect())
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    const DIMS: usize = 64;

    /// Deterministic bag-of-words embedder: each lowercase word is hashed into
    /// one of 64 buckets and the result is L2-normalised.
    pub struct BagOfWords;

    pub fn embed_text(text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; DIMS];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let word = word.to_lowercase();
            let bucket = word
                .bytes()
                .fold(5381u64, |h, b| h.wrapping_mul(33) ^ b as u64)
                % DIMS as u64;
            v[bucket as usize] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        }
        v
    }

    #[async_trait]
    impl EmbeddingFunction for BagOfWords {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| embed_text(t)).collect())
        }
    }

    #[test]
    fn test_bag_of_words_is_normalised() {
        let v = embed_text("get weather for a city");
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        assert!(embed_text("").iter().all(|x| *x == 0.0));
    }
}
