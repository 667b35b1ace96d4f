//! Integration tests for `LlmClient` and `Clarifier` using wiremock HTTP mocks.

use std::sync::Arc;

use genie_core::{ClarifiedGoal, GoalFilters, OpportunityDigest, OpportunityType};
use genie_llm::{Clarifier, Embedder, GoalClarifier, LlmClient, LlmConfig, LlmError, QaPair};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn test_config(base_url: &str) -> LlmConfig {
    LlmConfig {
        api_key: "test-key".to_string(),
        base_url: format!("{base_url}/v1"),
        embedding_model: "text-embedding-3-small".to_string(),
        embedding_dim: 3,
        chat_model: "gpt-4".to_string(),
        summary_model: "gpt-4o-mini".to_string(),
        timeout_secs: 5,
        max_retries: 2,
        backoff_base_ms: 1,
    }
}

fn test_client(base_url: &str) -> LlmClient {
    LlmClient::new(test_config(base_url)).expect("client construction should not fail")
}

fn chat_body(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [
            { "index": 0, "message": { "role": "assistant", "content": content }, "finish_reason": "stop" }
        ]
    })
}

/// Answers an embeddings request with one vector per input, `[i, 0, 0]`.
fn echo_embeddings(request: &Request) -> ResponseTemplate {
    let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
    let count = body["input"].as_array().map_or(0, Vec::len);
    let data: Vec<_> = (0..count)
        .map(|i| json!({ "object": "embedding", "index": i, "embedding": [i, 0.0, 0.0] }))
        .collect();
    ResponseTemplate::new(200).set_body_json(json!({ "object": "list", "data": data }))
}

// ---------------------------------------------------------------------------
// Embeddings
// ---------------------------------------------------------------------------

#[tokio::test]
async fn embed_sends_model_and_bearer_auth() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "text-embedding-3-small",
            "input": ["hello world"]
        })))
        .respond_with(echo_embeddings)
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let vector = client.embed("hello world").await.expect("should embed");
    assert_eq!(vector, vec![0.0, 0.0, 0.0]);
}

#[tokio::test]
async fn embed_batch_restores_input_order() {
    let server = MockServer::start().await;

    let body = json!({
        "data": [
            { "index": 1, "embedding": [0.0, 1.0, 0.0] },
            { "index": 0, "embedding": [1.0, 0.0, 0.0] }
        ]
    });
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let vectors = client
        .embed_batch(&["first".to_string(), "second".to_string()])
        .await
        .unwrap();
    assert_eq!(vectors[0], vec![1.0, 0.0, 0.0]);
    assert_eq!(vectors[1], vec![0.0, 1.0, 0.0]);
}

#[tokio::test]
async fn embed_batch_chunks_large_inputs() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(echo_embeddings)
        .expect(2)
        .mount(&server)
        .await;

    let texts: Vec<String> = (0..65).map(|i| format!("text {i}")).collect();
    let client = test_client(&server.uri());
    let vectors = client.embed_batch(&texts).await.unwrap();

    assert_eq!(vectors.len(), 65);
    // Second chunk starts its indices from zero again.
    assert!((vectors[63][0] - 63.0).abs() < f32::EPSILON);
    assert!(vectors[64][0].abs() < f32::EPSILON);
}

#[tokio::test]
async fn embed_batch_rejects_count_mismatch() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "data": [{ "index": 0, "embedding": [1.0] }] })),
        )
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let result = client
        .embed_batch(&["a".to_string(), "b".to_string()])
        .await;
    assert!(matches!(
        result,
        Err(LlmError::EmbeddingCount {
            expected: 2,
            actual: 1
        })
    ));
}

#[tokio::test]
async fn transient_server_error_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(echo_embeddings)
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let vector = client.embed("retry me").await.expect("second attempt succeeds");
    assert_eq!(vector.len(), 3);
}

#[tokio::test]
async fn auth_error_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "message": "Incorrect API key provided", "type": "invalid_request_error" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.embed("nope").await.unwrap_err();
    match err {
        LlmError::Api { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "Incorrect API key provided");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

#[tokio::test]
async fn summarize_uses_summary_model_and_token_cap() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({ "model": "gpt-4o-mini", "max_tokens": 300 })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(chat_body("Two great Rust talks in Berlin.")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let items = vec![OpportunityDigest {
        title: "RustConf CFP".to_string(),
        source: "papercall".to_string(),
        opportunity_type: OpportunityType::Speaking,
        location: Some("Berlin".to_string()),
        relevance: 0.91,
    }];

    let client = test_client(&server.uri());
    let summary = client.summarize_opportunities(&items).await.unwrap();
    assert_eq!(summary, "Two great Rust talks in Berlin.");
}

#[tokio::test]
async fn chat_without_choices_is_invalid_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let result = client.summarize_opportunities(&[]).await;
    assert!(matches!(result, Err(LlmError::InvalidResponse(_))));
}

// ---------------------------------------------------------------------------
// Clarifier
// ---------------------------------------------------------------------------

#[tokio::test]
async fn clarify_goal_requests_json_mode_and_validates_reply() {
    let server = MockServer::start().await;

    let reply = "```json\n{\"goal_type\": \"speaking\", \"keywords\": [\"rust\", \"wasm\"], \
                 \"location\": \"Europe\", \"remote\": false, \
                 \"additional_filters\": {\"travel_covered\": true}}\n```";
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({
            "model": "gpt-4",
            "response_format": { "type": "json_object" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(reply)))
        .expect(1)
        .mount(&server)
        .await;

    let clarifier = Clarifier::new(Arc::new(test_client(&server.uri())));
    let goal = clarifier
        .clarify_goal("I want to speak at Rust conferences in Europe")
        .await
        .expect("should clarify");

    assert_eq!(goal.goal_type, OpportunityType::Speaking);
    assert_eq!(goal.filters.keywords, vec!["rust", "wasm"]);
    assert_eq!(goal.filters.location.as_deref(), Some("Europe"));
    assert_eq!(goal.filters.remote, Some(false));
    assert_eq!(goal.filters.extra["travel_covered"], json!(true));
    assert_eq!(
        goal.original_description,
        "I want to speak at Rust conferences in Europe"
    );
}

#[tokio::test]
async fn clarify_goal_rejects_unknown_goal_type() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(chat_body(r#"{"goal_type": "internship"}"#)),
        )
        .mount(&server)
        .await;

    let clarifier = Clarifier::new(Arc::new(test_client(&server.uri())));
    let result = clarifier.clarify_goal("An internship").await;
    assert!(matches!(result, Err(LlmError::Core(_))));
}

#[tokio::test]
async fn clarifying_questions_degrade_to_empty_on_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;

    let clarifier = Clarifier::new(Arc::new(test_client(&server.uri())));
    let preliminary = ClarifiedGoal {
        original_description: "A job".to_string(),
        goal_type: OpportunityType::Job,
        filters: GoalFilters::default(),
    };
    let questions = clarifier.clarifying_questions("A job", &preliminary).await;
    assert!(questions.is_empty());
}

#[tokio::test]
async fn clarifying_questions_parses_list() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(
            r#"{"questions": ["Which stack?", "Remote only?"]}"#,
        )))
        .mount(&server)
        .await;

    let clarifier = Clarifier::new(Arc::new(test_client(&server.uri())));
    let preliminary = ClarifiedGoal {
        original_description: "A job".to_string(),
        goal_type: OpportunityType::Job,
        filters: GoalFilters::default(),
    };
    let questions = clarifier.clarifying_questions("A job", &preliminary).await;
    assert_eq!(questions, vec!["Which stack?", "Remote only?"]);
}

#[tokio::test]
async fn refine_goal_keeps_initial_on_failure_and_applies_answers_on_success() {
    let initial = ClarifiedGoal {
        original_description: "Find a job".to_string(),
        goal_type: OpportunityType::Job,
        filters: GoalFilters::default(),
    };
    let answers = vec![QaPair {
        question: "Remote?".to_string(),
        answer: "Yes, fully remote".to_string(),
    }];

    let failing = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("not json")))
        .mount(&failing)
        .await;
    let clarifier = Clarifier::new(Arc::new(test_client(&failing.uri())));
    assert_eq!(clarifier.refine_goal(&initial, &answers).await, initial);

    let working = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(
            r#"{"goal_type": "job", "keywords": ["rust"], "remote": true}"#,
        )))
        .mount(&working)
        .await;
    let clarifier = Clarifier::new(Arc::new(test_client(&working.uri())));
    let refined = clarifier.refine_goal(&initial, &answers).await;
    assert_eq!(refined.filters.remote, Some(true));
    assert_eq!(refined.filters.keywords, vec!["rust"]);
    assert_eq!(refined.original_description, "Find a job");
}
