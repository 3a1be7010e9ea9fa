use std::path::Path;
use std::sync::Arc;

use ragserve_server::{AppState, ServerConfig, run_server};
use tracing::{info, warn};

use ragserve_core::{
    CorpusStore, Document, HfEmbeddingProvider, HfGenerationProvider, PipelineConfig, RagPipeline,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let host = std::env::var("RAGSERVE_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = std::env::var("RAGSERVE_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let corpus = Arc::new(CorpusStore::new());
    let mut builder = RagPipeline::builder()
        .config(PipelineConfig::default())
        .corpus(Arc::clone(&corpus));

    // Remote providers only when a credential is configured; otherwise
    // the pipeline runs on the local fallback and answers are marked
    // mode: "local".
    match std::env::var("HF_API_TOKEN") {
        Ok(token) if !token.is_empty() => {
            builder = builder
                .remote_embedder(Arc::new(HfEmbeddingProvider::new(token.clone())?))
                .remote_generator(Arc::new(HfGenerationProvider::new(token)?));
            info!("remote embedding and generation enabled");
        }
        _ => warn!("HF_API_TOKEN not set; running with the local fallback only"),
    }

    let pipeline = Arc::new(builder.build()?);

    if let Ok(dir) = std::env::var("RAGSERVE_CORPUS_DIR") {
        load_corpus_dir(&pipeline, Path::new(&dir)).await?;
    }

    run_server(AppState { pipeline }, ServerConfig { host, port }).await
}

/// Ingest every `.txt` and `.md` file in `dir` as a document, using the
/// file stem as both ID and title.
async fn load_corpus_dir(pipeline: &RagPipeline, dir: &Path) -> anyhow::Result<()> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut loaded = 0usize;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_text = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("txt") | Some("md")
        );
        if !is_text {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let text = tokio::fs::read_to_string(&path).await?;
        let document =
            Document { id: stem.to_string(), title: stem.to_string(), text };
        match pipeline.ingest(document).await {
            Ok(chunk_count) => {
                info!(document.id = stem, chunk_count, "loaded corpus file");
                loaded += 1;
            }
            Err(e) => warn!(path = %path.display(), error = %e, "skipping corpus file"),
        }
    }
    info!(loaded, "corpus directory loaded");
    Ok(())
}
