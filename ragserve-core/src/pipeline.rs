//! RAG pipeline orchestrator.
//!
//! [`RagPipeline`] wires the chunker, embedding providers, similarity
//! ranker, prompt builder, and generation providers into a single
//! [`answer`](RagPipeline::answer) call. It is the only layer allowed to
//! substitute the local fallback for a failing remote provider, and it
//! always reports which mode actually produced the answer.

use std::sync::Arc;

use futures::StreamExt;
use tracing::{debug, error, info, warn};

use crate::chunking::{Chunker, FixedSizeChunker};
use crate::config::PipelineConfig;
use crate::corpus::{CorpusStore, EmbeddedChunk};
use crate::document::{Answer, AnswerMode, Chunk, Document, Reference, RetrievedChunk};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::GenerationProvider;
use crate::local::{LocalEmbeddingProvider, LocalGenerationProvider};
use crate::prompt::build_prompt;
use crate::ranker::rank;

/// The RAG pipeline orchestrator.
///
/// A query runs corpus → chunk → embed (cached, bounded fan-out) → rank
/// → prompt → generate. Remote failures at the embedding or generation
/// stage degrade to the local fallback when one is configured, and the
/// resulting [`Answer`] is marked `mode: "local"`; `mode: "remote"`
/// means both stages used the remote service.
///
/// Construct one via [`RagPipeline::builder()`].
pub struct RagPipeline {
    config: PipelineConfig,
    corpus: Arc<CorpusStore>,
    chunker: Arc<dyn Chunker>,
    remote_embedder: Option<Arc<dyn EmbeddingProvider>>,
    remote_generator: Option<Arc<dyn GenerationProvider>>,
    local_embedder: Option<Arc<dyn EmbeddingProvider>>,
    local_generator: Option<Arc<dyn GenerationProvider>>,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Return a reference to the corpus store.
    pub fn corpus(&self) -> &Arc<CorpusStore> {
        &self.corpus
    }

    /// Ingest a document: chunk it for validation and add it to the
    /// corpus. Returns the number of chunks the document produced.
    ///
    /// Embeddings are computed lazily on the first query and cached, so
    /// ingestion never touches the network.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidParameter`] if the document text is
    /// empty or whitespace-only.
    pub async fn ingest(&self, document: Document) -> Result<usize> {
        let chunks = self.chunker.chunk(&document);
        if chunks.is_empty() {
            return Err(RagError::InvalidParameter(format!(
                "document '{}' has no chunkable text",
                document.id
            )));
        }
        let chunk_count = chunks.len();
        info!(document.id = %document.id, chunk_count, "ingested document");
        self.corpus.add_document(document).await;
        Ok(chunk_count)
    }

    /// Answer a query against the corpus.
    ///
    /// `top_k` overrides the configured retrieval width when set.
    ///
    /// # Errors
    ///
    /// - [`RagError::InvalidParameter`] for a blank query or zero `top_k`
    /// - [`RagError::EmptyCorpus`] when no documents are ingested
    /// - [`RagError::NoRelevantContent`] when no document yields a chunk
    /// - [`RagError::EmbeddingUnavailable`] /
    ///   [`RagError::GenerationUnavailable`] when the remote service
    ///   stays unreachable and no local fallback is configured
    pub async fn answer(&self, query: &str, top_k: Option<usize>) -> Result<Answer> {
        let query = query.trim();
        if query.is_empty() {
            return Err(RagError::InvalidParameter("query must not be empty".to_string()));
        }
        let top_k = match top_k {
            Some(0) => {
                return Err(RagError::InvalidParameter("topK must be greater than zero".to_string()));
            }
            Some(k) => k,
            None => self.config.top_k,
        };

        if self.corpus.is_empty().await {
            return Err(RagError::EmptyCorpus);
        }

        // Retrieval: remote embedding space first when configured, the
        // local space on fallback.
        let (mut mode, retrieved) = match &self.remote_embedder {
            Some(remote) => {
                match self.retrieve(query, top_k, remote, AnswerMode::Remote).await {
                    Ok(retrieved) => (AnswerMode::Remote, retrieved),
                    Err(e @ RagError::EmbeddingUnavailable { .. }) => {
                        let Some(local) = &self.local_embedder else {
                            return Err(e);
                        };
                        warn!(error = %e, "remote embedding failed, degrading to local fallback");
                        (AnswerMode::Local, self.retrieve(query, top_k, local, AnswerMode::Local).await?)
                    }
                    Err(e) => return Err(e),
                }
            }
            None => {
                let local = self.local_embedder.as_ref().ok_or_else(|| {
                    RagError::ConfigError("no embedding provider configured".to_string())
                })?;
                (AnswerMode::Local, self.retrieve(query, top_k, local, AnswerMode::Local).await?)
            }
        };

        debug!(
            retrieved = retrieved.len(),
            top_score = retrieved.first().map(|r| r.score),
            "retrieval complete"
        );

        let prompt = build_prompt(query, &retrieved);

        // Generation: the remote model only counts as remote mode when
        // retrieval also ran in the remote space.
        let text = match (&self.remote_generator, mode) {
            (Some(remote), AnswerMode::Remote) => {
                match remote.generate(&prompt, &self.config.generation).await {
                    Ok(text) => text,
                    Err(e @ RagError::GenerationUnavailable { .. }) => {
                        let Some(local) = &self.local_generator else {
                            return Err(e);
                        };
                        warn!(error = %e, "remote generation failed, degrading to local fallback");
                        mode = AnswerMode::Local;
                        local.generate(&prompt, &self.config.generation).await?
                    }
                    Err(e) => return Err(e),
                }
            }
            _ => {
                mode = AnswerMode::Local;
                let local = self.local_generator.as_ref().ok_or_else(|| {
                    RagError::ConfigError("no generation provider configured".to_string())
                })?;
                local.generate(&prompt, &self.config.generation).await?
            }
        };

        let references: Vec<Reference> = retrieved
            .iter()
            .map(|r| Reference { chunk_id: r.chunk.id.clone(), score: r.score })
            .collect();

        info!(mode = ?mode, references = references.len(), "query answered");

        Ok(Answer { text, references, mode })
    }

    /// Embed the query and the corpus in the given space, then rank.
    async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        embedder: &Arc<dyn EmbeddingProvider>,
        space: AnswerMode,
    ) -> Result<Vec<RetrievedChunk>> {
        let documents = self.corpus.list_documents().await;

        let mut candidates: Vec<(Chunk, Vec<f32>)> = Vec::new();
        for document in &documents {
            let entries = match self.corpus.cached(&document.id, space).await {
                Some(entries) => entries,
                None => {
                    let embedded = self.embed_document(document, embedder).await?;
                    self.corpus.store_cached(&document.id, space, embedded).await
                }
            };
            candidates
                .extend(entries.iter().map(|e| (e.chunk.clone(), e.embedding.clone())));
        }

        if candidates.is_empty() {
            return Err(RagError::NoRelevantContent);
        }

        let query_vector = embedder.embed(query).await.map_err(|e| {
            error!(error = %e, "query embedding failed");
            e
        })?;

        Ok(rank(&query_vector, &candidates, top_k))
    }

    /// Chunk one document and embed its chunks with bounded fan-out.
    ///
    /// Embedding calls for independent chunks are issued concurrently up
    /// to `embed_concurrency` in flight; results are re-keyed by chunk
    /// index, so completion order does not matter.
    async fn embed_document(
        &self,
        document: &Document,
        embedder: &Arc<dyn EmbeddingProvider>,
    ) -> Result<Vec<EmbeddedChunk>> {
        let chunks = self.chunker.chunk(document);
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        debug!(document.id = %document.id, chunk_count = chunks.len(), "embedding document chunks");

        let embed_futures: Vec<_> = chunks
            .iter()
            .enumerate()
            .map(|(index, chunk)| {
                let embedder = Arc::clone(embedder);
                let text = chunk.text.clone();
                async move { Ok::<_, RagError>((index, embedder.embed(&text).await?)) }
            })
            .collect();
        let mut results: Vec<(usize, Vec<f32>)> = futures::stream::iter(embed_futures)
        .buffer_unordered(self.config.embed_concurrency)
        .collect::<Vec<Result<(usize, Vec<f32>)>>>()
        .await
        .into_iter()
        .collect::<Result<Vec<_>>>()?;

        results.sort_by_key(|(index, _)| *index);

        Ok(chunks
            .into_iter()
            .zip(results)
            .map(|(chunk, (_, embedding))| EmbeddedChunk { chunk, embedding })
            .collect())
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// The corpus store is required. Remote providers are optional; when a
/// remote embedder is absent, or a remote call keeps failing, the local
/// fallback (enabled by default) produces the answer instead.
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = RagPipeline::builder()
///     .config(PipelineConfig::default())
///     .corpus(Arc::new(CorpusStore::new()))
///     .remote_embedder(Arc::new(HfEmbeddingProvider::from_env()?))
///     .remote_generator(Arc::new(HfGenerationProvider::from_env()?))
///     .build()?;
/// ```
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<PipelineConfig>,
    corpus: Option<Arc<CorpusStore>>,
    chunker: Option<Arc<dyn Chunker>>,
    remote_embedder: Option<Arc<dyn EmbeddingProvider>>,
    remote_generator: Option<Arc<dyn GenerationProvider>>,
    local_fallback: Option<bool>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration. Defaults to
    /// [`PipelineConfig::default()`].
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the corpus store (required).
    pub fn corpus(mut self, corpus: Arc<CorpusStore>) -> Self {
        self.corpus = Some(corpus);
        self
    }

    /// Override the chunker. Defaults to a [`FixedSizeChunker`] built
    /// from the configuration.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Set the remote embedding provider.
    pub fn remote_embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.remote_embedder = Some(embedder);
        self
    }

    /// Set the remote generation provider.
    pub fn remote_generator(mut self, generator: Arc<dyn GenerationProvider>) -> Self {
        self.remote_generator = Some(generator);
        self
    }

    /// Enable or disable the local fallback variants (enabled by
    /// default). Disabling them makes remote failures fatal.
    pub fn local_fallback(mut self, enabled: bool) -> Self {
        self.local_fallback = Some(enabled);
        self
    }

    /// Build the [`RagPipeline`], validating the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the corpus is missing, the
    /// configuration fails validation, or neither a remote provider nor
    /// the local fallback is available for a stage.
    pub fn build(self) -> Result<RagPipeline> {
        let config = self.config.unwrap_or_default();
        // Re-validate: the config may have been deserialized rather than
        // built through the checked builder.
        let config = PipelineConfig::builder()
            .chunk_size(config.chunk_size)
            .chunk_overlap(config.chunk_overlap)
            .top_k(config.top_k)
            .generation(config.generation.clone())
            .embed_concurrency(config.embed_concurrency)
            .build()?;

        let corpus = self
            .corpus
            .ok_or_else(|| RagError::ConfigError("corpus is required".to_string()))?;

        let chunker: Arc<dyn Chunker> = match self.chunker {
            Some(chunker) => chunker,
            None => Arc::new(
                FixedSizeChunker::new(config.chunk_size, config.chunk_overlap)
                    .map_err(|e| RagError::ConfigError(e.to_string()))?,
            ),
        };

        let fallback = self.local_fallback.unwrap_or(true);
        let local_embedder: Option<Arc<dyn EmbeddingProvider>> =
            if fallback { Some(Arc::new(LocalEmbeddingProvider::new())) } else { None };
        let local_generator: Option<Arc<dyn GenerationProvider>> =
            if fallback { Some(Arc::new(LocalGenerationProvider::new())) } else { None };

        if self.remote_embedder.is_none() && local_embedder.is_none() {
            return Err(RagError::ConfigError(
                "no embedding provider: configure a remote embedder or enable the local fallback"
                    .to_string(),
            ));
        }
        if self.remote_generator.is_none() && local_generator.is_none() {
            return Err(RagError::ConfigError(
                "no generation provider: configure a remote generator or enable the local fallback"
                    .to_string(),
            ));
        }

        Ok(RagPipeline {
            config,
            corpus,
            chunker,
            remote_embedder: self.remote_embedder,
            remote_generator: self.remote_generator,
            local_embedder,
            local_generator,
        })
    }
}
