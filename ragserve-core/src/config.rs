//! Configuration for the RAG pipeline.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};
use crate::generation::GenerationOptions;

/// Configuration parameters for the RAG pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    /// Chunk window width in characters.
    pub chunk_size: usize,
    /// Characters shared by consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of top-scoring chunks retrieved per query.
    pub top_k: usize,
    /// Sampling parameters forwarded to the generator.
    pub generation: GenerationOptions,
    /// Maximum simultaneous in-flight chunk embedding calls.
    pub embed_concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: 400,
            chunk_overlap: 80,
            top_k: 3,
            generation: GenerationOptions::default(),
            embed_concurrency: 5,
        }
    }
}

impl PipelineConfig {
    /// Create a new builder for constructing a [`PipelineConfig`].
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`PipelineConfig`].
#[derive(Debug, Clone, Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// Set the chunk window width in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the number of top results retrieved per query.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the generation sampling parameters.
    pub fn generation(mut self, options: GenerationOptions) -> Self {
        self.config.generation = options;
        self
    }

    /// Set the chunk-embedding fan-out width.
    pub fn embed_concurrency(mut self, concurrency: usize) -> Self {
        self.config.embed_concurrency = concurrency;
        self
    }

    /// Build the [`PipelineConfig`], validating that parameters are
    /// consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `chunk_size == 0`
    /// - `chunk_overlap >= chunk_size`
    /// - `top_k == 0`
    /// - `embed_concurrency == 0`
    pub fn build(self) -> Result<PipelineConfig> {
        if self.config.chunk_size == 0 {
            return Err(RagError::ConfigError("chunk_size must be greater than zero".to_string()));
        }
        if self.config.chunk_overlap >= self.config.chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.config.chunk_overlap, self.config.chunk_size
            )));
        }
        if self.config.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if self.config.embed_concurrency == 0 {
            return Err(RagError::ConfigError(
                "embed_concurrency must be greater than zero".to_string(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = PipelineConfig::builder().build().unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn rejects_overlap_not_less_than_size() {
        let result = PipelineConfig::builder().chunk_size(100).chunk_overlap(100).build();
        assert!(matches!(result, Err(RagError::ConfigError(_))));
    }

    #[test]
    fn rejects_zero_top_k() {
        let result = PipelineConfig::builder().top_k(0).build();
        assert!(matches!(result, Err(RagError::ConfigError(_))));
    }

    #[test]
    fn rejects_zero_concurrency() {
        let result = PipelineConfig::builder().embed_concurrency(0).build();
        assert!(matches!(result, Err(RagError::ConfigError(_))));
    }
}
