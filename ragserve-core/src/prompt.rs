//! Retrieval-grounded prompt assembly.
//!
//! The prompt embeds every retrieved passage under a machine-parseable
//! header tag (`[chunk_id @ start_offset]`) and instructs the generator
//! to answer only from the passages, to state when information is absent,
//! and to close with a references section naming the tags it used. The
//! same tag format is what the local extractive generator parses when the
//! remote model is unavailable.

use crate::document::RetrievedChunk;

/// Marker line that introduces the passage block.
pub(crate) const PASSAGES_HEADER: &str = "Passages:";

/// Marker prefix for the final question line.
pub(crate) const QUESTION_PREFIX: &str = "Question: ";

/// Assemble the generation prompt from the query and the retrieved
/// passages.
///
/// Pure function of its inputs: identical inputs always produce an
/// identical prompt.
pub fn build_prompt(query: &str, retrieved: &[RetrievedChunk]) -> String {
    let mut prompt = String::new();
    prompt.push_str(
        "You are a research assistant. Answer the question using ONLY the passages below.\n\
         If the passages do not contain the information needed to answer, say so explicitly.\n\
         Cite every claim with the bracketed tag of the passage it came from, e.g. [doc_2].\n\
         Close your answer with a line starting with \"References:\" that lists the tags of \
         the passages you actually used.\n\n",
    );

    prompt.push_str(PASSAGES_HEADER);
    prompt.push('\n');
    for item in retrieved {
        prompt.push_str(&format!("[{} @ {}]\n", item.chunk.id, item.chunk.start_offset));
        prompt.push_str(item.chunk.text.trim());
        prompt.push_str("\n\n");
    }

    prompt.push_str(QUESTION_PREFIX);
    prompt.push_str(query.trim());
    prompt.push_str("\nAnswer:");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Chunk;

    fn retrieved(id: &str, offset: usize, text: &str, score: f32) -> RetrievedChunk {
        RetrievedChunk {
            chunk: Chunk {
                id: id.to_string(),
                document_id: "doc".to_string(),
                text: text.to_string(),
                start_offset: offset,
                end_offset: offset + text.len(),
            },
            score,
        }
    }

    #[test]
    fn embeds_chunk_tags_and_question() {
        let items = vec![
            retrieved("doc_0", 0, "The cat sat on the mat.", 0.9),
            retrieved("doc_1", 20, "The dog ran in the park.", 0.8),
        ];
        let prompt = build_prompt("Where did the dog go?", &items);
        assert!(prompt.contains("[doc_0 @ 0]"));
        assert!(prompt.contains("[doc_1 @ 20]"));
        assert!(prompt.contains("The dog ran in the park."));
        assert!(prompt.contains("Question: Where did the dog go?"));
        assert!(prompt.ends_with("Answer:"));
    }

    #[test]
    fn instructs_grounded_answering_and_references() {
        let prompt = build_prompt("q", &[retrieved("doc_0", 0, "text", 0.5)]);
        assert!(prompt.contains("ONLY the passages"));
        assert!(prompt.contains("say so explicitly"));
        assert!(prompt.contains("References:"));
    }

    #[test]
    fn is_pure_and_idempotent() {
        let items = vec![retrieved("doc_0", 0, "alpha", 0.1), retrieved("doc_1", 5, "beta", 0.2)];
        assert_eq!(build_prompt("query", &items), build_prompt("query", &items));
    }
}
