//! Router-level tests for the JSON API and its error mapping.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use ragserve_core::{CorpusStore, PipelineConfig, RagPipeline};
use ragserve_server::{AppState, app_router};

/// A local-only app with an empty corpus.
fn test_app() -> Router {
    let config = PipelineConfig::builder().chunk_size(25).chunk_overlap(0).top_k(3).build().unwrap();
    let pipeline = RagPipeline::builder()
        .config(config)
        .corpus(Arc::new(CorpusStore::new()))
        .build()
        .unwrap();
    app_router(AppState { pipeline: Arc::new(pipeline) })
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn response_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let response = test_app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn query_against_empty_corpus_is_a_client_error() {
    let response = test_app()
        .oneshot(json_request("POST", "/api/query", json!({"query": "anything"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("empty"));
}

#[tokio::test]
async fn blank_query_is_rejected() {
    let app = test_app();
    let ingest = json_request(
        "POST",
        "/api/documents",
        json!({"id": "pets", "title": "Pets", "text": "The cat sat on the mat."}),
    );
    app.clone().oneshot(ingest).await.unwrap();

    let response =
        app.oneshot(json_request("POST", "/api/query", json!({"query": "   "}))).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn ingest_then_query_returns_answer_references_and_mode() {
    let app = test_app();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/documents",
            json!({
                "id": "pets",
                "title": "Pets",
                "text": "The cat sat on the mat. The dog ran in the park."
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    assert_eq!(body["id"], "pets");
    assert!(body["chunkCount"].as_u64().unwrap() >= 2);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/query",
            json!({"query": "Where did the dog go?", "topK": 1}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["mode"], "local");
    assert!(!body["answer"].as_str().unwrap().is_empty());
    let references = body["references"].as_array().unwrap();
    assert_eq!(references.len(), 1);
    assert!(references[0]["chunkId"].as_str().unwrap().starts_with("pets_"));
    assert!(references[0]["score"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn ingest_without_id_generates_one() {
    let response = test_app()
        .oneshot(json_request(
            "POST",
            "/api/documents",
            json!({"title": "Note", "text": "Some note text worth keeping."}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    assert!(!body["id"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn blank_document_text_is_rejected() {
    let response = test_app()
        .oneshot(json_request(
            "POST",
            "/api/documents",
            json!({"id": "blank", "title": "Blank", "text": "   "}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_document_is_not_found() {
    let response = test_app()
        .oneshot(Request::builder().uri("/api/documents/missing").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = response_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("missing"));
}

#[tokio::test]
async fn list_and_clear_documents() {
    let app = test_app();
    app.clone()
        .oneshot(json_request(
            "POST",
            "/api/documents",
            json!({"id": "a", "title": "A", "text": "alpha document text"}),
        ))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/api/documents").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["documents"].as_array().unwrap().len(), 1);
    assert_eq!(body["documents"][0]["id"], "a");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/documents")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(Request::builder().uri("/api/documents").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = response_json(response).await;
    assert!(body["documents"].as_array().unwrap().is_empty());
}
