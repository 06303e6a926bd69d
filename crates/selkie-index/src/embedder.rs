//! Embedding generation for semantic search
//!
//! Trait-based embedder seam: the substrate treats text-to-vector as a
//! black box. The default [`HashEmbedder`] is deterministic and local, so
//! the system works (and tests run) without any model download; a real
//! ONNX-backed embedder is available behind the `local-embeddings` feature.

use async_trait::async_trait;
#[cfg(feature = "local-embeddings")]
use selkie_core::Error;
use selkie_core::Result;

/// Common embedding dimensions for popular models
pub const EMBEDDING_DIM_256: usize = 256;
pub const EMBEDDING_DIM_384: usize = 384; // all-MiniLM-L6-v2
pub const EMBEDDING_DIM_768: usize = 768; // all-mpnet-base-v2

/// Trait for generating text embeddings
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Dimension of embeddings produced by this embedder
    fn dimension(&self) -> usize;

    /// Model name/identifier
    fn model_name(&self) -> &str;

    /// Embed a single text string into a unit-normalized vector
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed multiple texts in a batch
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }
}

/// Scale a vector to unit length in place
pub fn normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

/// Deterministic local embedder
///
/// Maps text to a stable pseudo-random unit vector seeded by a rolling
/// byte hash. Tokens the text shares push vectors together weakly, which
/// is enough for exercising the index machinery; it is not a semantic
/// model. Identical text always embeds identically, across processes,
/// which is what lets a persisted snapshot be reused after restart.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    /// Create a hash embedder with the given dimension
    pub fn new(dimension: usize) -> Self {
        assert!(dimension > 0, "embedding dimension must be positive");
        Self { dimension }
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(EMBEDDING_DIM_256)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "hash-embedder"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut embedding = vec![0.0f32; self.dimension];

        // Accumulate one seed per whitespace token so shared tokens move
        // vectors in shared directions.
        for token in text.split_whitespace() {
            let mut seed: u64 = 0xcbf2_9ce4_8422_2325;
            for &byte in token.as_bytes() {
                seed ^= byte as u64;
                seed = seed.wrapping_mul(0x0100_0000_01b3);
            }
            for (i, value) in embedding.iter_mut().enumerate() {
                let mixed = seed
                    .wrapping_add(i as u64)
                    .wrapping_mul(0x9e37_79b9_7f4a_7c15);
                let mixed = mixed ^ (mixed >> 31);
                *value += ((mixed as i64) as f32) / (i64::MAX as f32);
            }
        }

        normalize(&mut embedding);
        Ok(embedding)
    }
}

/// Configuration for the feature-gated local model embedder
#[derive(Debug, Clone)]
pub struct EmbedderConfig {
    /// Model name
    pub model: String,
    /// Maximum text length in bytes (longer input is truncated)
    pub text_length_bytes_max: usize,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            model: "all-MiniLM-L6-v2".to_string(),
            text_length_bytes_max: 512,
        }
    }
}

/// Local embedding using fastembed ONNX models
///
/// Requires the `local-embeddings` feature.
#[cfg(feature = "local-embeddings")]
pub struct LocalEmbedder {
    model: std::sync::Mutex<fastembed::TextEmbedding>,
    model_name: String,
    dimension: usize,
    config: EmbedderConfig,
}

#[cfg(feature = "local-embeddings")]
impl std::fmt::Debug for LocalEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalEmbedder")
            .field("model_name", &self.model_name)
            .field("dimension", &self.dimension)
            .finish()
    }
}

#[cfg(feature = "local-embeddings")]
impl LocalEmbedder {
    /// Create a new local embedder, downloading the model on first use
    pub fn new(config: EmbedderConfig) -> Result<Self> {
        use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

        let (model_enum, dimension) = match config.model.as_str() {
            "all-MiniLM-L6-v2" | "BAAI/bge-small-en-v1.5" => {
                (EmbeddingModel::BGESmallENV15, EMBEDDING_DIM_384)
            }
            "all-mpnet-base-v2" | "BAAI/bge-base-en-v1.5" => {
                (EmbeddingModel::BGEBaseENV15, EMBEDDING_DIM_768)
            }
            other => {
                return Err(Error::upstream(format!(
                    "unsupported embedding model: {other}"
                )));
            }
        };

        let model = TextEmbedding::try_new(InitOptions::new(model_enum))
            .map_err(|e| Error::upstream(format!("failed to initialize embedding model: {e}")))?;

        tracing::info!(model = %config.model, dimension, "initialized local embedder");

        Ok(Self {
            model: std::sync::Mutex::new(model),
            model_name: config.model.clone(),
            dimension,
            config,
        })
    }
}

#[cfg(feature = "local-embeddings")]
#[async_trait]
impl Embedder for LocalEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let text = if text.len() > self.config.text_length_bytes_max {
            &text[..self.config.text_length_bytes_max]
        } else {
            text
        };

        let mut model = self
            .model
            .lock()
            .map_err(|e| Error::upstream(format!("embedding model lock poisoned: {e}")))?;

        let mut embeddings = model
            .embed(vec![text], None)
            .map_err(|e| Error::upstream(format!("embedding failed: {e}")))?;

        let mut embedding = embeddings
            .pop()
            .ok_or_else(|| Error::upstream("no embedding returned"))?;
        normalize(&mut embedding);
        Ok(embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_embedder_dimension_and_name() {
        let embedder = HashEmbedder::new(64);
        assert_eq!(embedder.dimension(), 64);
        assert_eq!(embedder.model_name(), "hash-embedder");
    }

    #[tokio::test]
    async fn test_hash_embedder_deterministic() {
        let embedder = HashEmbedder::default();
        let a = embedder.embed("the same text").await.unwrap();
        let b = embedder.embed("the same text").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_hash_embedder_distinguishes_texts() {
        let embedder = HashEmbedder::default();
        let a = embedder.embed("alpha").await.unwrap();
        let b = embedder.embed("omega").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_hash_embedder_unit_norm() {
        let embedder = HashEmbedder::default();
        let embedding = embedder.embed("normalize me").await.unwrap();
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5, "norm = {norm}");
    }

    #[tokio::test]
    async fn test_shared_tokens_raise_similarity() {
        let embedder = HashEmbedder::default();
        let base = embedder.embed("deploy the staging cluster").await.unwrap();
        let near = embedder.embed("deploy the prod cluster").await.unwrap();
        let far = embedder.embed("unrelated words entirely here").await.unwrap();

        let dot = |a: &[f32], b: &[f32]| -> f32 { a.iter().zip(b).map(|(x, y)| x * y).sum() };
        assert!(dot(&base, &near) > dot(&base, &far));
    }

    #[tokio::test]
    async fn test_embed_batch_matches_individual() {
        let embedder = HashEmbedder::default();
        let texts = ["one", "two", "three"];
        let batch = embedder.embed_batch(&texts).await.unwrap();
        assert_eq!(batch.len(), 3);
        for (i, text) in texts.iter().enumerate() {
            assert_eq!(batch[i], embedder.embed(text).await.unwrap());
        }
    }

    #[test]
    fn test_normalize_zero_vector_is_noop() {
        let mut v = vec![0.0f32; 8];
        normalize(&mut v);
        assert!(v.iter().all(|x| *x == 0.0));
    }
}
