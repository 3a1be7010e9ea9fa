//! Embedding provider trait for generating vector embeddings from text.

use async_trait::async_trait;

use crate::error::Result;

/// A provider that generates vector embeddings from text input.
///
/// Implementations wrap either a remote embedding service
/// ([`HfEmbeddingProvider`](crate::huggingface::HfEmbeddingProvider)) or
/// the deterministic local fallback
/// ([`LocalEmbeddingProvider`](crate::local::LocalEmbeddingProvider))
/// behind a unified async interface. The default
/// [`embed_batch`](EmbeddingProvider::embed_batch) implementation calls
/// [`embed`](EmbeddingProvider::embed) sequentially; backends that support
/// native batching should override it.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embedding vectors for a batch of text inputs.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Return the dimensionality of embeddings produced by this provider.
    ///
    /// Uniform within one provider; the pipeline never mixes vectors from
    /// providers with different dimensionality.
    fn dimensions(&self) -> usize;
}
