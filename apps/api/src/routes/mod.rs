pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::analysis::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/analyze", post(handlers::handle_analyze))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::service::{AnalysisService, PromptDefaults};
    use crate::llm_client::tests::{backend_config, spawn_backend, unreachable_backend};
    use crate::llm_client::{Generator, OllamaClient};
    use crate::prompt_store::PromptStore;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        Json,
    };
    use serde_json::{json, Value};
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const DEFAULT_PROMPT: &str = "knowledge_graph_prompt.txt";
    const SYSTEM_PROMPT: &str = "system_prompt.txt";

    fn prompt_dir(default_prompt: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        let prompts = dir.path().join("prompt");
        fs::create_dir(&prompts).unwrap();
        fs::write(prompts.join(DEFAULT_PROMPT), default_prompt).unwrap();
        fs::write(prompts.join(SYSTEM_PROMPT), "You emit RDF/Turtle.").unwrap();
        fs::write(prompts.join("test_prompt.txt"), "Prompt content\n").unwrap();
        dir
    }

    fn app(dir: &Path, generator: Option<Arc<dyn Generator>>) -> Router {
        let service = AnalysisService::new(
            PromptStore::new(dir.join("prompt")),
            PromptDefaults {
                prompt_name: DEFAULT_PROMPT.to_string(),
                system_prompt_name: SYSTEM_PROMPT.to_string(),
            },
            generator,
        );
        build_router(AppState {
            analysis: Arc::new(service),
        })
    }

    fn app_with_backend(dir: &Path, url: &str) -> Router {
        let client = OllamaClient::new(&backend_config(url, &dir.join("logs/generations.csv")))
            .unwrap();
        app(dir, Some(Arc::new(client) as Arc<dyn Generator>))
    }

    async fn post_analyze(app: Router, body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/analyze")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn turtle_backend() -> Router {
        Router::new().route(
            "/api/generate",
            post(|| async {
                Json(json!({
                    "model": "llama3:8b",
                    "created_at": "2024-01-01T00:00:00Z",
                    "response": "@prefix ex: <http://example.org/> .\nex:a ex:knows ex:b .",
                    "done": true,
                    "done_reason": "stop",
                    "eval_count": 13
                }))
            }),
        )
    }

    #[tokio::test]
    async fn test_health_ok() {
        let dir = prompt_dir("unused");
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = app(dir.path(), None).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_default_prompt_placeholder_is_replaced() {
        let dir = prompt_dir("Hi ${USER_TEXT}");
        let (status, body) = post_analyze(app(dir.path(), None), r#"{"text":"hello"}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message_for_model"], "Hi hello");
        assert_eq!(body["prompt_name"], DEFAULT_PROMPT);
        assert_eq!(body["system_prompt_name"], SYSTEM_PROMPT);
        assert!(body.get("generation").is_none());
    }

    #[tokio::test]
    async fn test_named_prompt_gets_chat_turn() {
        let dir = prompt_dir("unused");
        let (status, body) = post_analyze(
            app(dir.path(), None),
            r#"{"text":"Some text","prompt_name":"test_prompt.txt"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["prompt_name"], "test_prompt.txt");
        assert_eq!(body["prompt"], "Prompt content");
        assert_eq!(body["input_text"], "Some text");
        assert_eq!(
            body["message_for_model"],
            "Prompt content\n\nUser: Some text\nAssistant:"
        );
    }

    #[tokio::test]
    async fn test_missing_prompt_returns_404() {
        let dir = prompt_dir("unused");
        let (status, body) = post_analyze(
            app(dir.path(), None),
            r#"{"text":"hi","prompt_name":"missing.txt"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        let error = body["error"].as_str().unwrap();
        assert!(error.contains("missing.txt") && error.contains("not found"), "{error}");
    }

    #[tokio::test]
    async fn test_missing_text_returns_400() {
        let dir = prompt_dir("unused");
        for raw in ["{}", "", "not json", r#"{"text":""}"#] {
            let (status, body) = post_analyze(app(dir.path(), None), raw).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body {raw:?}");
            assert!(body["error"].as_str().unwrap().contains("text"));
        }
    }

    #[tokio::test]
    async fn test_path_traversal_returns_400() {
        let dir = prompt_dir("unused");
        let (status, body) = post_analyze(
            app(dir.path(), None),
            r#"{"text":"hi","prompt_name":"../../etc/passwd"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]
            .as_str()
            .unwrap()
            .contains("outside the prompt directory"));
    }

    #[tokio::test]
    async fn test_backend_network_failure_returns_502_with_details() {
        let dir = prompt_dir("Hi ${USER_TEXT}");
        let url = unreachable_backend().await;

        let (status, body) =
            post_analyze(app_with_backend(dir.path(), &url), r#"{"text":"hello"}"#).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].is_string());
        assert!(body["details"].is_string());
        assert!(!dir.path().join("logs/generations.csv").exists());
    }

    #[tokio::test]
    async fn test_malformed_backend_reply_returns_502() {
        let dir = prompt_dir("Hi ${USER_TEXT}");
        let url = spawn_backend(Router::new().route("/api/generate", post(|| async { "<html>" })))
            .await;

        let (status, body) =
            post_analyze(app_with_backend(dir.path(), &url), r#"{"text":"hello"}"#).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].as_str().unwrap().contains("Invalid JSON"));
    }

    #[tokio::test]
    async fn test_generation_is_returned_and_logged_once_per_call() {
        let dir = prompt_dir("Hi ${USER_TEXT}");
        let url = spawn_backend(turtle_backend()).await;
        let router = app_with_backend(dir.path(), &url);

        for text in ["alice knows bob", "bob knows carol"] {
            let payload = json!({ "text": text }).to_string();
            let (status, body) = post_analyze(router.clone(), &payload).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["generation"]["model"], "llama3:8b");
            assert!(body["generation"]["response"]
                .as_str()
                .unwrap()
                .starts_with("@prefix"));
        }

        let log_path = dir.path().join("logs/generations.csv");
        let raw = fs::read_to_string(&log_path).unwrap();
        assert_eq!(raw.matches("prompt_name,input_text,model").count(), 1);

        let mut reader = csv::Reader::from_path(&log_path).unwrap();
        let rows: Vec<_> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][0], DEFAULT_PROMPT);
        assert_eq!(&rows[1][1], "bob knows carol");
        assert!(rows.iter().all(|r| &r[15] == "true" && r[16].is_empty()));
    }
}
