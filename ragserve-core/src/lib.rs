//! # ragserve-core
//!
//! A retrieval-augmented generation (RAG) pipeline: documents are split
//! into overlapping chunks, embedded into a vector space, ranked by
//! cosine similarity against the query, assembled into a
//! retrieval-grounded prompt, and answered by a text-generation model.
//!
//! Embedding and generation are polymorphic over two variants each: a
//! remote provider backed by the Hugging Face Inference API, and a
//! deterministic local fallback that needs no network and never fails.
//! The [`RagPipeline`] orchestrator selects the remote variant when one
//! is configured, degrades to the local variant on persistent remote
//! failure, and reports the mode that actually produced the answer.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ragserve_core::{CorpusStore, Document, PipelineConfig, RagPipeline};
//!
//! let corpus = Arc::new(CorpusStore::new());
//! let pipeline = RagPipeline::builder()
//!     .config(PipelineConfig::default())
//!     .corpus(Arc::clone(&corpus))
//!     .build()?;
//!
//! pipeline.ingest(Document {
//!     id: "pets".into(),
//!     title: "Pets".into(),
//!     text: "The cat sat on the mat. The dog ran in the park.".into(),
//! }).await?;
//!
//! let answer = pipeline.answer("Where did the dog go?", Some(1)).await?;
//! println!("{} ({:?})", answer.text, answer.mode);
//! ```

pub mod chunking;
pub mod config;
pub mod corpus;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod huggingface;
pub mod local;
pub mod pipeline;
pub mod prompt;
pub mod ranker;
pub mod retry;

pub use chunking::{Chunker, FixedSizeChunker};
pub use config::{PipelineConfig, PipelineConfigBuilder};
pub use corpus::{CorpusStore, EmbeddedChunk};
pub use document::{Answer, AnswerMode, Chunk, Document, Reference, RetrievedChunk};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use generation::{GenerationOptions, GenerationProvider};
pub use huggingface::{HfEmbeddingProvider, HfGenerationProvider};
pub use local::{LocalEmbeddingProvider, LocalGenerationProvider};
pub use pipeline::{RagPipeline, RagPipelineBuilder};
pub use prompt::build_prompt;
pub use ranker::{cosine_similarity, rank};
pub use retry::RetryPolicy;
