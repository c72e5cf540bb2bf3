//! HTTP client for the chat relay.
//!
//! The relay accepts `POST {text, sessionId, data?, fitResult?}` and answers
//! `{text}` on success or `{error}` with a non-2xx status. A health endpoint
//! returns `{status, model}`.

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::chat::context::ChatRequest;
use crate::error::PipelineError;

pub const DEFAULT_CHAT_URL: &str = "http://localhost:3001/api/chat";
pub const DEFAULT_SAMPLE_ROWS: usize = 50;

/// Relay endpoints and request shaping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    pub chat_url: String,
    pub health_url: String,
    /// Rows sent as dataset context with each question.
    pub sample_rows: usize,
}

impl ChatConfig {
    pub fn new(chat_url: impl Into<String>) -> Self {
        let chat_url = chat_url.into();
        Self {
            health_url: derive_health_url(&chat_url),
            chat_url,
            sample_rows: DEFAULT_SAMPLE_ROWS,
        }
    }

    /// Read `MICROFIT_CHAT_URL`, `MICROFIT_HEALTH_URL` and
    /// `MICROFIT_CHAT_SAMPLE_ROWS` (a `.env` file is honored).
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let chat_url = std::env::var("MICROFIT_CHAT_URL").unwrap_or_else(|_| DEFAULT_CHAT_URL.to_string());
        let mut config = ChatConfig::new(chat_url);

        if let Ok(url) = std::env::var("MICROFIT_HEALTH_URL") {
            config.health_url = url;
        }
        if let Ok(raw) = std::env::var("MICROFIT_CHAT_SAMPLE_ROWS") {
            match raw.trim().parse::<usize>() {
                Ok(n) => config.sample_rows = n,
                Err(_) => warn!(value = %raw, "ignoring invalid MICROFIT_CHAT_SAMPLE_ROWS"),
            }
        }
        config
    }
}

/// Relay health report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    pub model: String,
}

#[derive(Debug, Deserialize)]
struct ReplyBody {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

pub struct ChatClient {
    client: Client,
    config: ChatConfig,
}

impl ChatClient {
    pub fn new(config: ChatConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn from_env() -> Self {
        Self::new(ChatConfig::from_env())
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Send one question and return the relay's reply text.
    pub fn send(&self, request: &ChatRequest) -> Result<String, PipelineError> {
        debug!(
            url = %self.config.chat_url,
            session = %request.session_id,
            rows = request.data.as_ref().map_or(0, Vec::len),
            "sending chat request"
        );

        let resp = self
            .client
            .post(&self.config.chat_url)
            .json(request)
            .send()
            .map_err(|e| PipelineError::Network(format!("chat request failed: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .map_err(|e| PipelineError::Network(format!("failed to read chat response: {e}")))?;

        if !status.is_success() {
            return Err(PipelineError::Network(error_message(status.as_u16(), &body)));
        }
        parse_reply(&body)
    }

    /// Query the relay's health endpoint.
    pub fn health(&self) -> Result<Health, PipelineError> {
        let resp = self
            .client
            .get(&self.config.health_url)
            .send()
            .map_err(|e| PipelineError::Network(format!("health request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(PipelineError::Network(format!(
                "health request failed with status {}.",
                resp.status()
            )));
        }

        resp.json()
            .map_err(|e| PipelineError::Network(format!("failed to parse health response: {e}")))
    }
}

fn derive_health_url(chat_url: &str) -> String {
    let trimmed = chat_url.trim_end_matches('/');
    match trimmed.strip_suffix("/chat") {
        Some(base) => format!("{base}/health"),
        None => format!("{trimmed}/health"),
    }
}

fn parse_reply(body: &str) -> Result<String, PipelineError> {
    let reply: ReplyBody = serde_json::from_str(body)
        .map_err(|e| PipelineError::Network(format!("failed to parse chat response: {e}")))?;
    Ok(reply.text)
}

fn error_message(status: u16, body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(err) => format!("relay returned status {status}: {}", err.error),
        Err(_) => format!("relay returned status {status}."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_url_is_derived_from_chat_url() {
        assert_eq!(derive_health_url("http://localhost:3001/api/chat"), "http://localhost:3001/api/health");
        assert_eq!(derive_health_url("http://relay.local/chat/"), "http://relay.local/health");
        assert_eq!(derive_health_url("http://relay.local/ask"), "http://relay.local/ask/health");
    }

    #[test]
    fn reply_and_error_bodies() {
        assert_eq!(parse_reply(r#"{"text":"hello"}"#).unwrap(), "hello");
        assert!(matches!(parse_reply("<html>"), Err(PipelineError::Network(_))));

        assert_eq!(
            error_message(502, r#"{"error":"upstream timeout"}"#),
            "relay returned status 502: upstream timeout"
        );
        assert_eq!(error_message(500, "oops"), "relay returned status 500.");
    }

    #[test]
    fn unreachable_relay_is_a_network_error() {
        let client = ChatClient::new(ChatConfig::new("http://127.0.0.1:9/api/chat"));
        let request = ChatRequest::question("hi", "s1");
        assert!(matches!(client.send(&request), Err(PipelineError::Network(_))));
        assert!(matches!(client.health(), Err(PipelineError::Network(_))));
    }
}
