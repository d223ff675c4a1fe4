//! Minimal Google Gemini API client.
//!
//! This crate provides a focused client for the `generateContent` endpoint:
//! - Single-turn text generation with a per-request timeout
//! - Typed request and response envelopes
//! - Extraction of the first candidate's text payload

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Errors that can occur when using the Gemini client.
#[derive(Debug, Error)]
pub enum Error {
    #[error("API key not configured")]
    NoApiKey,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Response contained no candidate text")]
    EmptyResponse,

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// HTTP status code for API errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Gemini API client.
///
/// The client holds no credential: the key is passed per call so one client
/// can serve a whole pool of keys.
#[derive(Clone)]
pub struct Gemini {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl Gemini {
    /// Create a new client against the public endpoint.
    pub fn new() -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: API_BASE.to_string(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Point the client at a different API root (proxies, local stubs).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the default timeout applied to requests without their own.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a `generateContent` request and return the decoded envelope.
    pub async fn generate(&self, api_key: &str, request: &Request) -> Result<Response, Error> {
        let headers = build_headers(api_key)?;
        let model = request.model.as_deref().unwrap_or(DEFAULT_MODEL);
        let timeout = request.timeout.unwrap_or(self.timeout);
        let url = format!("{}/models/{model}:generateContent", self.base_url);

        let response = self
            .client
            .post(url)
            .headers(headers)
            .timeout(timeout)
            .json(&ApiRequest::from(request))
            .send()
            .await
            .map_err(|e| transport_error(e, timeout))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status,
                message: body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| transport_error(e, timeout))?;

        let api_response: ApiResponse =
            serde_json::from_str(&body).map_err(|e| Error::Parse(e.to_string()))?;

        Ok(api_response.into())
    }

    /// Send a request and return only the first candidate's text.
    pub async fn generate_text(&self, api_key: &str, request: &Request) -> Result<String, Error> {
        let response = self.generate(api_key, request).await?;
        response
            .text()
            .map(str::to_string)
            .ok_or(Error::EmptyResponse)
    }
}

fn build_headers(api_key: &str) -> Result<HeaderMap, Error> {
    if api_key.trim().is_empty() {
        return Err(Error::NoApiKey);
    }

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(
        API_KEY_HEADER,
        HeaderValue::from_str(api_key)
            .map_err(|e| Error::Config(format!("Invalid API key: {e}")))?,
    );
    Ok(headers)
}

fn transport_error(error: reqwest::Error, timeout: Duration) -> Error {
    if error.is_timeout() {
        Error::Timeout(timeout)
    } else {
        Error::Network(error.to_string())
    }
}

// ============================================================================
// Public types
// ============================================================================

/// A `generateContent` request.
#[derive(Debug, Clone)]
pub struct Request {
    pub model: Option<String>,
    pub contents: Vec<Content>,
    pub temperature: Option<f32>,
    pub timeout: Option<Duration>,
}

impl Request {
    /// Create a request carrying a single text prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            model: None,
            contents: vec![Content::text(prompt)],
            temperature: None,
            timeout: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// A content turn: an optional role and its parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    /// Content with one text part and no role.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            role: None,
            parts: vec![Part {
                text: Some(text.into()),
            }],
        }
    }
}

/// One part of a content turn. Non-text parts decode with `text: None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// A decoded `generateContent` response.
#[derive(Debug, Clone)]
pub struct Response {
    pub candidates: Vec<Candidate>,
    pub model_version: Option<String>,
    pub usage: Option<Usage>,
}

impl Response {
    /// Text of the first part of the first candidate, if any.
    pub fn text(&self) -> Option<&str> {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .and_then(|c| c.parts.first())
            .and_then(|p| p.text.as_deref())
    }
}

/// One generated candidate.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub content: Option<Content>,
    pub finish_reason: Option<String>,
}

/// Token usage information.
#[derive(Debug, Clone, Copy)]
pub struct Usage {
    pub prompt_tokens: usize,
    pub candidate_tokens: usize,
}

// ============================================================================
// Internal API types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<ApiGenerationConfig>,
}

impl From<&Request> for ApiRequest {
    fn from(request: &Request) -> Self {
        Self {
            contents: request.contents.clone(),
            generation_config: request
                .temperature
                .map(|temperature| ApiGenerationConfig { temperature }),
        }
    }
}

#[derive(Debug, Serialize)]
struct ApiGenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    #[serde(default)]
    candidates: Vec<ApiCandidate>,
    #[serde(default)]
    model_version: Option<String>,
    #[serde(default)]
    usage_metadata: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiCandidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiUsage {
    #[serde(default)]
    prompt_token_count: usize,
    #[serde(default)]
    candidates_token_count: usize,
}

impl From<ApiResponse> for Response {
    fn from(api: ApiResponse) -> Self {
        Self {
            candidates: api
                .candidates
                .into_iter()
                .map(|c| Candidate {
                    content: c.content,
                    finish_reason: c.finish_reason,
                })
                .collect(),
            model_version: api.model_version,
            usage: api.usage_metadata.map(|u| Usage {
                prompt_tokens: u.prompt_token_count,
                candidate_tokens: u.candidates_token_count,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve exactly one canned HTTP response and hand back the raw request.
    async fn stub_server(status: u16, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let reply = format!(
                "HTTP/1.1 {status} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(reply.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            request
        });

        (format!("http://{addr}"), handle)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut data = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            data.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&data);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if data.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&data).to_string()
    }

    #[test]
    fn test_request_builder() {
        let request = Request::new("Hello")
            .with_model("gemini-2.5-pro")
            .with_temperature(0.9)
            .with_timeout(Duration::from_secs(5));

        assert_eq!(request.model.as_deref(), Some("gemini-2.5-pro"));
        assert_eq!(request.temperature, Some(0.9));
        assert_eq!(request.timeout, Some(Duration::from_secs(5)));
        assert_eq!(request.contents.len(), 1);
    }

    #[test]
    fn test_request_wire_shape() {
        let request = Request::new("Describe the room");
        let json = serde_json::to_value(ApiRequest::from(&request)).unwrap();

        assert_eq!(
            json,
            serde_json::json!({"contents": [{"parts": [{"text": "Describe the room"}]}]})
        );
    }

    #[test]
    fn test_response_text_extraction() {
        let api: ApiResponse = serde_json::from_str(
            r#"{
                "candidates": [
                    {"content": {"role": "model", "parts": [{"text": "first"}, {"text": "second"}]},
                     "finishReason": "STOP"},
                    {"content": {"parts": [{"text": "other candidate"}]}}
                ],
                "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 30}
            }"#,
        )
        .unwrap();

        let response: Response = api.into();
        assert_eq!(response.text(), Some("first"));
        assert_eq!(response.candidates[0].finish_reason.as_deref(), Some("STOP"));
        assert_eq!(response.usage.map(|u| u.candidate_tokens), Some(30));
    }

    #[test]
    fn test_response_without_candidates() {
        let api: ApiResponse =
            serde_json::from_str(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#).unwrap();
        let response: Response = api.into();
        assert!(response.text().is_none());
    }

    #[test]
    fn test_empty_api_key_rejected() {
        assert!(matches!(build_headers("  "), Err(Error::NoApiKey)));
        assert!(matches!(build_headers("bad\nkey"), Err(Error::Config(_))));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = Gemini::new().unwrap().with_base_url("http://localhost:9/v1beta/");
        assert_eq!(client.base_url(), "http://localhost:9/v1beta");
    }

    #[tokio::test]
    async fn test_generate_text_success() {
        let (base, server) = stub_server(
            200,
            r#"{"candidates":[{"content":{"parts":[{"text":"{\"narrative\":\"ok\"}"}]}}]}"#,
        )
        .await;

        let client = Gemini::new().unwrap().with_base_url(base);
        let text = client
            .generate_text("key-1", &Request::new("prompt").with_model("gemini-test"))
            .await
            .unwrap();
        assert_eq!(text, r#"{"narrative":"ok"}"#);

        let raw_request = server.await.unwrap();
        assert!(raw_request.starts_with("POST /models/gemini-test:generateContent"));
        assert!(raw_request.contains("x-goog-api-key: key-1"));
        assert!(raw_request.contains(r#""text":"prompt""#));
    }

    #[tokio::test]
    async fn test_generate_non_success_status() {
        let (base, _server) = stub_server(429, r#"{"error":"quota"}"#).await;

        let client = Gemini::new().unwrap().with_base_url(base);
        let err = client
            .generate_text("key", &Request::new("prompt"))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(429));
        assert!(err.to_string().contains("quota"));
    }

    #[tokio::test]
    async fn test_generate_empty_candidates() {
        let (base, _server) = stub_server(200, r#"{"candidates":[]}"#).await;

        let client = Gemini::new().unwrap().with_base_url(base);
        let err = client
            .generate_text("key", &Request::new("prompt"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EmptyResponse));
    }

    #[tokio::test]
    async fn test_generate_invalid_envelope() {
        let (base, _server) = stub_server(200, "not json at all").await;

        let client = Gemini::new().unwrap().with_base_url(base);
        let err = client
            .generate("key", &Request::new("prompt"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[tokio::test]
    async fn test_generate_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _silent = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(socket);
        });

        let client = Gemini::new()
            .unwrap()
            .with_base_url(format!("http://{addr}"))
            .with_timeout(Duration::from_millis(200));
        let err = client
            .generate("key", &Request::new("prompt"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
    }
}
