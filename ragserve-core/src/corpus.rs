//! In-memory corpus repository.
//!
//! [`CorpusStore`] owns the documents and their cached chunk embeddings
//! for the lifetime of the process. The pipeline borrows documents
//! read-only during a query and never mutates stored entities. The
//! embedding cache is keyed per document *and* per embedding space
//! (remote vs local) so a fallback run never reuses vectors of the wrong
//! dimensionality; cache writes are idempotent, so concurrent queries can
//! at worst duplicate work, never corrupt state.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::document::{AnswerMode, Chunk, Document};

/// A chunk paired with its embedding, as stored in the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedChunk {
    /// The chunk.
    pub chunk: Chunk,
    /// The chunk's embedding vector in the cache entry's space.
    pub embedding: Vec<f32>,
}

/// An in-memory store of documents and their cached chunk embeddings.
///
/// Documents keep their insertion order, which downstream ranking uses
/// as the tie-break order. All operations are async-safe via
/// `tokio::sync::RwLock`.
#[derive(Debug, Default)]
pub struct CorpusStore {
    documents: RwLock<Vec<Document>>,
    cache: RwLock<HashMap<(String, AnswerMode), Arc<Vec<EmbeddedChunk>>>>,
}

impl CorpusStore {
    /// Create a new empty corpus store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a document.
    ///
    /// Replacing keeps the document's original position in the corpus
    /// order and invalidates its cached embeddings.
    pub async fn add_document(&self, document: Document) {
        let mut documents = self.documents.write().await;
        let id = document.id.clone();
        match documents.iter_mut().find(|d| d.id == document.id) {
            Some(existing) => *existing = document,
            None => documents.push(document),
        }
        drop(documents);
        self.invalidate(&id).await;
    }

    /// Return all documents in insertion order.
    pub async fn list_documents(&self) -> Vec<Document> {
        self.documents.read().await.clone()
    }

    /// Look up a document by ID.
    pub async fn get_document(&self, id: &str) -> Option<Document> {
        self.documents.read().await.iter().find(|d| d.id == id).cloned()
    }

    /// Remove a document and its cached embeddings. Returns whether a
    /// document with that ID existed.
    pub async fn remove_document(&self, id: &str) -> bool {
        let mut documents = self.documents.write().await;
        let before = documents.len();
        documents.retain(|d| d.id != id);
        let removed = documents.len() < before;
        drop(documents);
        if removed {
            self.invalidate(id).await;
        }
        removed
    }

    /// Remove all documents and cached embeddings.
    pub async fn clear(&self) {
        self.documents.write().await.clear();
        self.cache.write().await.clear();
    }

    /// Number of documents in the corpus.
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    /// Whether the corpus holds no documents.
    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    /// Fetch a document's cached chunk embeddings in the given space.
    pub async fn cached(&self, document_id: &str, space: AnswerMode) -> Option<Arc<Vec<EmbeddedChunk>>> {
        self.cache.read().await.get(&(document_id.to_string(), space)).cloned()
    }

    /// Store a document's chunk embeddings in the given space.
    ///
    /// Overwriting an existing entry with an identical value is safe;
    /// embeddings are deterministic per space, so two racing queries
    /// write the same data.
    pub async fn store_cached(
        &self,
        document_id: &str,
        space: AnswerMode,
        entries: Vec<EmbeddedChunk>,
    ) -> Arc<Vec<EmbeddedChunk>> {
        let entries = Arc::new(entries);
        self.cache
            .write()
            .await
            .insert((document_id.to_string(), space), Arc::clone(&entries));
        entries
    }

    async fn invalidate(&self, document_id: &str) {
        self.cache.write().await.retain(|(id, _), _| id != document_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, text: &str) -> Document {
        Document { id: id.to_string(), title: id.to_string(), text: text.to_string() }
    }

    fn entry(chunk_id: &str, embedding: Vec<f32>) -> EmbeddedChunk {
        EmbeddedChunk {
            chunk: Chunk {
                id: chunk_id.to_string(),
                document_id: "a".to_string(),
                text: "text".to_string(),
                start_offset: 0,
                end_offset: 4,
            },
            embedding,
        }
    }

    #[tokio::test]
    async fn documents_keep_insertion_order() {
        let store = CorpusStore::new();
        store.add_document(doc("b", "two")).await;
        store.add_document(doc("a", "one")).await;
        store.add_document(doc("c", "three")).await;
        let ids: Vec<String> =
            store.list_documents().await.into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[tokio::test]
    async fn upsert_replaces_in_place_and_invalidates_cache() {
        let store = CorpusStore::new();
        store.add_document(doc("a", "one")).await;
        store.add_document(doc("b", "two")).await;
        store
            .store_cached("a", AnswerMode::Local, vec![entry("a_0", vec![1.0])])
            .await;

        store.add_document(doc("a", "replaced")).await;
        let ids: Vec<String> =
            store.list_documents().await.into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(store.get_document("a").await.unwrap().text, "replaced");
        assert!(store.cached("a", AnswerMode::Local).await.is_none());
    }

    #[tokio::test]
    async fn cache_is_keyed_by_embedding_space() {
        let store = CorpusStore::new();
        store.add_document(doc("a", "one")).await;
        store
            .store_cached("a", AnswerMode::Local, vec![entry("a_0", vec![1.0, 0.0])])
            .await;
        assert!(store.cached("a", AnswerMode::Local).await.is_some());
        assert!(store.cached("a", AnswerMode::Remote).await.is_none());
    }

    #[tokio::test]
    async fn idempotent_cache_overwrite() {
        let store = CorpusStore::new();
        let entries = vec![entry("a_0", vec![0.5, 0.5])];
        store.store_cached("a", AnswerMode::Remote, entries.clone()).await;
        store.store_cached("a", AnswerMode::Remote, entries.clone()).await;
        let cached = store.cached("a", AnswerMode::Remote).await.unwrap();
        assert_eq!(*cached, entries);
    }

    #[tokio::test]
    async fn clear_resets_everything() {
        let store = CorpusStore::new();
        store.add_document(doc("a", "one")).await;
        store.store_cached("a", AnswerMode::Local, vec![entry("a_0", vec![1.0])]).await;
        store.clear().await;
        assert!(store.is_empty().await);
        assert!(store.cached("a", AnswerMode::Local).await.is_none());
    }

    #[tokio::test]
    async fn remove_document_reports_existence() {
        let store = CorpusStore::new();
        store.add_document(doc("a", "one")).await;
        assert!(store.remove_document("a").await);
        assert!(!store.remove_document("a").await);
    }
}
