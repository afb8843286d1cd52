//! Chat-completion API service
//!
//! One function per network attempt; retry, fallback, and deadline policy
//! live in the orchestrator.

use std::time::{Duration, Instant};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::config::Config;
use crate::error::EnhanceError;

/// User-Agent header value
const USER_AGENT: &str = concat!("promptglow/", env!("CARGO_PKG_VERSION"));

/// Fixed sampling parameters, held constant across attempts
const TEMPERATURE: f64 = 0.7;
const MAX_TOKENS: u32 = 2048;
const TOP_P: f64 = 1.0;
const FREQUENCY_PENALTY: f64 = 0.0;
const PRESENCE_PENALTY: f64 = 0.0;

/// Default wait when a 429 response carries no Retry-After header
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(5);

/// Generate a unique request ID
fn generate_request_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generate a session ID (persistent for the lifetime of the process)
fn get_session_id() -> &'static str {
    use std::sync::OnceLock;
    static SESSION_ID: OnceLock<String> = OnceLock::new();
    SESSION_ID.get_or_init(|| Uuid::new_v4().to_string())
}

/// Chat-completion request structure
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: u32,
    top_p: f64,
    frequency_penalty: f64,
    presence_penalty: f64,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Chat-completion response envelope
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

fn build_chat_url(base_url: &str) -> String {
    let base_url = base_url.trim_end_matches('/');
    let base_url = base_url.strip_suffix("/v1").unwrap_or(base_url);
    format!("{}/v1/chat/completions", base_url)
}

/// Submit one chat-completion attempt and return the raw message text.
///
/// The returned text is the untrusted payload handed to the response parser;
/// this function only unwraps the HTTP envelope.
pub async fn complete_chat(
    client: &Client,
    config: &Config,
    model: &str,
    instruction: &str,
) -> Result<String, EnhanceError> {
    let payload = ChatCompletionRequest {
        model: model.to_string(),
        messages: vec![ChatMessage {
            role: "user".to_string(),
            content: instruction.to_string(),
        }],
        temperature: TEMPERATURE,
        max_tokens: MAX_TOKENS,
        top_p: TOP_P,
        frequency_penalty: FREQUENCY_PENALTY,
        presence_penalty: PRESENCE_PENALTY,
    };

    let url = build_chat_url(&config.base_url);
    let request_id = generate_request_id();
    let start_time = Instant::now();

    info!("Calling chat-completion API: {} model={}", url, model);

    let response = client
        .post(&url)
        .header("Content-Type", "application/json")
        .header("User-Agent", USER_AGENT)
        .header("x-request-id", &request_id)
        .header("x-request-session-id", get_session_id())
        .header("Authorization", format!("Bearer {}", config.api_key))
        .json(&payload)
        .send()
        .await;

    let duration_ms = start_time.elapsed().as_millis() as u64;
    info!("Chat-completion call completed in {}ms", duration_ms);

    let resp = response.map_err(|e| EnhanceError::Network(format!("request failed: {}", e)))?;
    let status = resp.status();

    if status.as_u16() == 429 {
        let retry_after = resp
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs);
        return Err(EnhanceError::RateLimited { retry_after });
    }

    if status.as_u16() == 401 {
        return Err(EnhanceError::Configuration(
            "API key invalid or expired".to_string(),
        ));
    }
    if status.as_u16() == 403 {
        return Err(EnhanceError::Configuration(
            "access denied, API key may be disabled".to_string(),
        ));
    }

    let body_text = resp.text().await.unwrap_or_default();

    if !status.is_success() {
        return Err(EnhanceError::Network(format!(
            "chat-completion API failed: {} - {}",
            status, body_text
        )));
    }

    let api_response: ChatCompletionResponse = serde_json::from_str(&body_text).map_err(|e| {
        EnhanceError::Network(format!("malformed response envelope: {} - {}", e, body_text))
    })?;

    let text = api_response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(EnhanceError::Network(
            "chat-completion API returned empty response".to_string(),
        ));
    }

    Ok(text)
}
