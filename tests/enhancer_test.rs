//! Tests for the enhancement orchestrator
//! Uses wiremock to mock the chat-completion API

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use promptglow::config::Config;
use promptglow::enhancer::{
    ConnectionState, ConnectionTracker, DomainContext, EnhancementClient, EnhancementLevel,
    EnhancementRequest, EnhancerOptions,
};
use promptglow::error::EnhanceError;

const CHAT_PATH: &str = "/v1/chat/completions";

fn fast_options() -> EnhancerOptions {
    EnhancerOptions {
        max_attempts_per_model: 2,
        base_timeout: Duration::from_millis(500),
        timeout_step: Duration::from_millis(50),
        max_timeout: Duration::from_secs(1),
        backoff_step: Duration::from_millis(10),
        max_backoff: Duration::from_millis(30),
        rate_limit_fallback: Duration::from_millis(150),
    }
}

fn test_config(uri: &str, models: &[&str]) -> Arc<Config> {
    Config::new(
        uri.to_string(),
        "test-key".to_string(),
        models.iter().map(|m| m.to_string()).collect(),
    )
    .unwrap()
}

fn test_client(uri: &str, models: &[&str], options: EnhancerOptions) -> EnhancementClient {
    EnhancementClient::with_options(
        test_config(uri, models),
        Arc::new(ConnectionTracker::new()),
        options,
    )
    .unwrap()
}

fn test_request() -> EnhancementRequest {
    EnhancementRequest::new(
        "Write release notes",
        EnhancementLevel::Glow,
        DomainContext::Technical,
    )
}

/// Chat envelope whose message content is a well-formed enhancement payload
fn success_envelope(content: &str) -> serde_json::Value {
    let payload = serde_json::json!({
        "enhancedContent": content,
        "improvementsSummary": ["clarified intent"],
        "confidence": 0.9
    })
    .to_string();

    serde_json::json!({
        "choices": [{ "message": { "role": "assistant", "content": payload } }]
    })
}

// ========================================================================
// Success paths
// ========================================================================

#[tokio::test]
async fn test_enhance_success_on_primary_candidate() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_envelope("Better prompt")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server.uri(), &["model-a"], fast_options());
    let result = client
        .enhance(&test_request(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.enhanced_content, "Better prompt");
    assert_eq!(result.improvements_summary, vec!["clarified intent"]);
    assert_eq!(result.confidence, 0.9);

    assert_eq!(client.tracker().state(), ConnectionState::Connected);
    assert_eq!(client.tracker().consecutive_failures(), 0);
    assert!(client.tracker().last_success().is_some());
}

#[tokio::test]
async fn test_fallback_reaches_third_candidate_second_attempt() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .and(body_partial_json(serde_json::json!({"model": "model-a"})))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .and(body_partial_json(serde_json::json!({"model": "model-b"})))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&mock_server)
        .await;

    // First call to model-c fails, the second succeeds
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .and(body_partial_json(serde_json::json!({"model": "model-c"})))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .and(body_partial_json(serde_json::json!({"model": "model-c"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_envelope("From model C")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(
        &mock_server.uri(),
        &["model-a", "model-b", "model-c"],
        fast_options(),
    );
    let result = client
        .enhance(&test_request(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.enhanced_content, "From model C");
    assert_eq!(client.tracker().state(), ConnectionState::Connected);
    assert_eq!(client.tracker().consecutive_failures(), 0);
}

// ========================================================================
// Cancellation
// ========================================================================

#[tokio::test]
async fn test_cancelled_before_start_makes_no_network_calls() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_envelope("unused")))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server.uri(), &["model-a"], fast_options());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = client.enhance(&test_request(), &cancel).await;
    assert!(matches!(result, Err(EnhanceError::Cancelled)));
}

#[tokio::test]
async fn test_cancellation_aborts_in_flight_attempt() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(success_envelope("slow"))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&mock_server)
        .await;

    let options = EnhancerOptions {
        base_timeout: Duration::from_secs(30),
        max_timeout: Duration::from_secs(30),
        ..fast_options()
    };
    let client = test_client(&mock_server.uri(), &["model-a"], options);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let result = client.enhance(&test_request(), &cancel).await;

    assert!(matches!(result, Err(EnhanceError::Cancelled)));
    assert!(
        started.elapsed() < Duration::from_secs(5),
        "cancellation must tear down the in-flight call promptly"
    );
}

// ========================================================================
// Timeout and exhaustion
// ========================================================================

#[tokio::test]
async fn test_timeout_exhaustion_attempts_every_candidate() {
    let mock_server = MockServer::start().await;

    // Every attempt exceeds the deadline
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(success_envelope("too late"))
                .set_delay(Duration::from_millis(400)),
        )
        .expect(4)
        .mount(&mock_server)
        .await;

    let options = EnhancerOptions {
        max_attempts_per_model: 2,
        base_timeout: Duration::from_millis(100),
        timeout_step: Duration::ZERO,
        max_timeout: Duration::from_millis(100),
        backoff_step: Duration::from_millis(10),
        max_backoff: Duration::from_millis(10),
        rate_limit_fallback: Duration::from_millis(10),
    };
    let client = test_client(&mock_server.uri(), &["model-a", "model-b"], options);

    let result = client.enhance(&test_request(), &CancellationToken::new()).await;

    match result {
        Err(EnhanceError::Exhausted { attempts, source }) => {
            assert_eq!(attempts, 4, "candidates x retries-per-candidate");
            assert!(matches!(*source, EnhanceError::Timeout(_)));
        }
        other => panic!("expected Exhausted, got {:?}", other.map(|r| r.enhanced_content)),
    }

    assert_eq!(client.tracker().state(), ConnectionState::Disconnected);
    assert_eq!(client.tracker().consecutive_failures(), 4);
}

#[tokio::test]
async fn test_network_exhaustion_wraps_last_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server.uri(), &["model-a"], fast_options());
    let result = client.enhance(&test_request(), &CancellationToken::new()).await;

    match result {
        Err(EnhanceError::Exhausted { attempts, source }) => {
            assert_eq!(attempts, 2);
            assert!(matches!(*source, EnhanceError::Network(_)));
        }
        other => panic!("expected Exhausted, got {:?}", other.map(|r| r.enhanced_content)),
    }
}

// ========================================================================
// Rate limiting
// ========================================================================

#[tokio::test]
async fn test_rate_limit_waits_before_retrying() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_envelope("after 429")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server.uri(), &["model-a"], fast_options());

    let started = Instant::now();
    let result = client
        .enhance(&test_request(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.enhanced_content, "after 429");
    assert!(
        started.elapsed() >= Duration::from_millis(150),
        "the rate-limit delay must be honored before retrying"
    );
}

#[tokio::test]
async fn test_rate_limit_honors_server_retry_after_header() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "1"))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_envelope("patient")))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server.uri(), &["model-a"], fast_options());

    let started = Instant::now();
    let result = client
        .enhance(&test_request(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.enhanced_content, "patient");
    assert!(started.elapsed() >= Duration::from_secs(1));
}

// ========================================================================
// Terminal errors
// ========================================================================

#[tokio::test]
async fn test_empty_content_rejects_without_network_calls() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_envelope("unused")))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server.uri(), &["model-a"], fast_options());
    let request = EnhancementRequest::new(
        "   \n\t  ",
        EnhancementLevel::Spark,
        DomainContext::General,
    );

    let result = client.enhance(&request, &CancellationToken::new()).await;
    assert!(matches!(result, Err(EnhanceError::Configuration(_))));
}

#[tokio::test]
async fn test_auth_failure_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(
        &mock_server.uri(),
        &["model-a", "model-b"],
        fast_options(),
    );
    let result = client.enhance(&test_request(), &CancellationToken::new()).await;

    match result {
        Err(EnhanceError::Configuration(msg)) => assert!(msg.contains("API key")),
        other => panic!(
            "expected Configuration, got {:?}",
            other.map(|r| r.enhanced_content)
        ),
    }
}

// ========================================================================
// Parser integration
// ========================================================================

#[tokio::test]
async fn test_malformed_payload_degrades_instead_of_failing() {
    let mock_server = MockServer::start().await;

    let envelope = serde_json::json!({
        "choices": [{ "message": { "role": "assistant", "content": "Here you go: a better prompt" } }]
    });

    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server.uri(), &["model-a"], fast_options());
    let result = client
        .enhance(&test_request(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.enhanced_content, "Here you go: a better prompt");
    assert!(result.confidence < 0.8);
    assert_eq!(client.tracker().state(), ConnectionState::Connected);
}
