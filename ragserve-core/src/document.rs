//! Data types for documents, chunks, and answers.

use serde::{Deserialize, Serialize};

/// A source document containing raw text.
///
/// Documents are immutable after ingestion and owned by the
/// [`CorpusStore`](crate::corpus::CorpusStore) for their lifetime.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the document.
    pub id: String,
    /// Human-readable title.
    pub title: String,
    /// The raw text content of the document.
    pub text: String,
}

/// A contiguous window of a [`Document`]'s text.
///
/// Offsets are byte offsets into the parent document's text, with
/// `start_offset < end_offset`. Chunks for one document are ordered by
/// ascending offset, and consecutive chunks overlap by the chunker's
/// configured overlap width (the final chunk may be shorter).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique identifier, generated as `{document_id}_{chunk_index}`.
    pub id: String,
    /// The ID of the parent [`Document`].
    pub document_id: String,
    /// The text content of the chunk.
    pub text: String,
    /// Byte offset of the chunk's first character in the document text.
    pub start_offset: usize,
    /// Byte offset one past the chunk's last character.
    pub end_offset: usize,
}

/// A retrieved [`Chunk`] paired with its cosine similarity score.
///
/// Scores lie in `[-1, 1]`. Low or zero scores signal low confidence but
/// are still returned; callers decide whether to warn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// The similarity score (higher is more relevant).
    pub score: f32,
}

/// A citation entry in an [`Answer`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reference {
    /// The ID of the cited chunk.
    pub chunk_id: String,
    /// The similarity score the chunk was retrieved with.
    pub score: f32,
}

/// Which variant produced an answer.
///
/// Surfaced to callers so they can judge the quality of the result:
/// `Local` means the deterministic fallback ran instead of the remote
/// model, at either the embedding or the generation stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerMode {
    /// Both embedding and generation used the remote service.
    Remote,
    /// The local fallback was used for at least one stage.
    Local,
}

/// The final product of a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    /// The generated answer text.
    pub text: String,
    /// The chunks the answer is grounded in, with their scores.
    pub references: Vec<Reference>,
    /// Which variant produced the answer.
    pub mode: AnswerMode,
}
