//! Generation provider trait for producing grounded answer text.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Sampling parameters passed to a [`GenerationProvider`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationOptions {
    /// Maximum number of tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self { max_tokens: 256, temperature: 0.3 }
    }
}

/// A provider that turns an assembled prompt into answer text.
///
/// Implementations wrap either a hosted text-generation model
/// ([`HfGenerationProvider`](crate::huggingface::HfGenerationProvider)) or
/// the extractive local fallback
/// ([`LocalGenerationProvider`](crate::local::LocalGenerationProvider)).
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Generate a completion for the given prompt.
    ///
    /// # Errors
    ///
    /// Remote implementations return
    /// [`RagError::GenerationUnavailable`](crate::error::RagError::GenerationUnavailable)
    /// when the service stays unreachable after the bounded retry or the
    /// completion is empty. The local fallback never fails.
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String>;
}
