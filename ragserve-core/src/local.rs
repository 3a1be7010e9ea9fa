//! Deterministic local fallback providers.
//!
//! These variants run with no network access and never fail. They exist
//! so the pipeline can degrade gracefully when no remote credential is
//! configured or the remote service stays unreachable; answers produced
//! this way are marked `mode: "local"` so callers can judge their
//! quality.

use async_trait::async_trait;

use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::generation::{GenerationOptions, GenerationProvider};
use crate::prompt::{PASSAGES_HEADER, QUESTION_PREFIX};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// FNV-1a hash, used to bucket tokens into a fixed dimensionality.
fn fnv1a(token: &str) -> u64 {
    token.bytes().fold(FNV_OFFSET, |hash, byte| (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME))
}

/// A deterministic bag-of-words embedding provider.
///
/// Lowercases the input, splits on non-alphanumeric characters, buckets
/// each token into a fixed-dimension vector by FNV-1a hash, and
/// L2-normalizes the result. Empty or token-free input yields the zero
/// vector. No external dependency; always succeeds.
#[derive(Debug, Clone)]
pub struct LocalEmbeddingProvider {
    dimensions: usize,
}

impl LocalEmbeddingProvider {
    /// Default vector dimensionality for the local embedding space.
    pub const DEFAULT_DIMENSIONS: usize = 256;

    /// Create a provider with the default dimensionality.
    pub fn new() -> Self {
        Self { dimensions: Self::DEFAULT_DIMENSIONS }
    }

    /// Create a provider with a custom dimensionality. Clamped to at
    /// least one.
    pub fn with_dimensions(dimensions: usize) -> Self {
        Self { dimensions: dimensions.max(1) }
    }

    fn term_frequency_vector(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        let lowered = text.to_lowercase();
        for token in lowered.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            let bucket = (fnv1a(token) % self.dimensions as u64) as usize;
            vector[bucket] += 1.0;
        }
        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

impl Default for LocalEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for LocalEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.term_frequency_vector(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// An extractive fallback generator.
///
/// Synthesizes an answer by quoting the retrieved passages verbatim under
/// a generic preamble and closing with a references footer. It recovers
/// the passages by parsing the prompt's bracketed passage tags, which the
/// prompt builder emits in a stable machine-parseable format. Never
/// fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalGenerationProvider;

impl LocalGenerationProvider {
    /// Create a new local generator.
    pub fn new() -> Self {
        Self
    }
}

/// A passage recovered from the prompt's tagged passage block.
struct ParsedPassage {
    chunk_id: String,
    text: String,
}

/// Parse the `[chunk_id @ offset]` tagged passages out of a prompt.
fn parse_passages(prompt: &str) -> Vec<ParsedPassage> {
    let mut passages = Vec::new();
    let mut in_block = false;
    let mut current: Option<ParsedPassage> = None;

    for line in prompt.lines() {
        if line == PASSAGES_HEADER {
            in_block = true;
            continue;
        }
        if !in_block {
            continue;
        }
        if line.starts_with(QUESTION_PREFIX) {
            break;
        }

        let trimmed = line.trim();
        let is_tag = trimmed.starts_with('[') && trimmed.ends_with(']') && trimmed.contains(" @ ");
        if is_tag {
            if let Some(passage) = current.take() {
                passages.push(passage);
            }
            let inner = &trimmed[1..trimmed.len() - 1];
            let chunk_id = inner.split(" @ ").next().unwrap_or(inner).to_string();
            current = Some(ParsedPassage { chunk_id, text: String::new() });
        } else if let Some(passage) = current.as_mut() {
            if !trimmed.is_empty() {
                if !passage.text.is_empty() {
                    passage.text.push(' ');
                }
                passage.text.push_str(trimmed);
            }
        }
    }
    if let Some(passage) = current.take() {
        passages.push(passage);
    }
    passages
}

#[async_trait]
impl GenerationProvider for LocalGenerationProvider {
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String> {
        let passages = parse_passages(prompt);

        let mut answer = String::from(
            "No remote language model was available, so the most relevant passages \
             are quoted directly:",
        );

        // Rough character budget derived from the token limit; passages
        // past the budget are omitted rather than cut mid-sentence.
        let budget = (options.max_tokens as usize).saturating_mul(4).max(200);
        let mut used: Vec<&str> = Vec::new();
        for passage in &passages {
            if !used.is_empty() && answer.len() + passage.text.len() > budget {
                break;
            }
            answer.push_str(&format!("\n\n[{}] {}", passage.chunk_id, passage.text));
            used.push(&passage.chunk_id);
        }

        if used.is_empty() {
            answer = "The supplied passages do not contain information relevant to the question."
                .to_string();
        } else {
            answer.push_str("\n\nReferences: ");
            answer.push_str(&used.join(", "));
        }

        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Chunk, RetrievedChunk};
    use crate::prompt::build_prompt;
    use crate::ranker::cosine_similarity;

    #[tokio::test]
    async fn local_embeddings_are_deterministic_and_unit_length() {
        let provider = LocalEmbeddingProvider::new();
        let a = provider.embed("The dog ran in the park").await.unwrap();
        let b = provider.embed("The dog ran in the park").await.unwrap();
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn empty_input_embeds_to_zero_vector() {
        let provider = LocalEmbeddingProvider::new();
        let v = provider.embed("").await.unwrap();
        assert_eq!(v.len(), LocalEmbeddingProvider::DEFAULT_DIMENSIONS);
        assert!(v.iter().all(|&x| x == 0.0));
    }

    #[tokio::test]
    async fn shared_vocabulary_scores_higher_than_disjoint() {
        let provider = LocalEmbeddingProvider::new();
        let query = provider.embed("where did the dog go").await.unwrap();
        let on_topic = provider.embed("the dog ran in the park").await.unwrap();
        let off_topic = provider.embed("quarterly revenue increased sharply").await.unwrap();
        assert!(
            cosine_similarity(&query, &on_topic) > cosine_similarity(&query, &off_topic),
            "token overlap should dominate"
        );
    }

    #[tokio::test]
    async fn extractive_answer_quotes_passages_and_cites_them() {
        let retrieved = vec![RetrievedChunk {
            chunk: Chunk {
                id: "doc_1".to_string(),
                document_id: "doc".to_string(),
                text: "The dog ran in the park.".to_string(),
                start_offset: 25,
                end_offset: 49,
            },
            score: 0.7,
        }];
        let prompt = build_prompt("Where did the dog go?", &retrieved);
        let answer = LocalGenerationProvider::new()
            .generate(&prompt, &GenerationOptions::default())
            .await
            .unwrap();
        assert!(answer.contains("The dog ran in the park."));
        assert!(answer.contains("[doc_1]"));
        assert!(answer.contains("References: doc_1"));
    }

    #[tokio::test]
    async fn prompt_without_passages_yields_absence_statement() {
        let prompt = build_prompt("anything", &[]);
        let answer = LocalGenerationProvider::new()
            .generate(&prompt, &GenerationOptions::default())
            .await
            .unwrap();
        assert!(answer.contains("do not contain"));
    }
}
