use std::time::Duration;
use log::{debug, error};
use serde_json::Value;
use thiserror::Error;

/// Error types that can occur when interacting with HTTP clients
#[derive(Debug, Error)]
pub enum HttpClientError {
    #[error("HTTP request error: {0}")]
    RequestError(String),

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("HTTP {0} error: {1}")]
    ServerError(u16, String),

    #[error("Empty response from server")]
    EmptyResponse,
}

/// A trait for HTTP client implementations
/// This version avoids generic methods to enable dynamic dispatch
pub trait HttpClient: Send + Sync + std::fmt::Debug {
    /// Send a GET request with query parameters and return the JSON body
    fn get_json_with_query(
        &self,
        url: &str,
        query: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<Value, HttpClientError>;

    /// Clone the client as a boxed trait object
    fn clone_box(&self) -> Box<dyn HttpClient>;
}

impl Clone for Box<dyn HttpClient> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Query parameters that must never show up in logs
const HIDDEN_PARAMETERS: &[&str] = &["api_key", "access_key", "signature"];

/// An HTTP client implementation using ureq
#[derive(Clone, Debug)]
pub struct UreqHttpClient {
    agent: ureq::Agent,
}

impl Default for UreqHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl UreqHttpClient {
    pub fn new() -> Self {
        Self {
            agent: ureq::AgentBuilder::new().build(),
        }
    }
}

impl HttpClient for UreqHttpClient {
    fn get_json_with_query(
        &self,
        url: &str,
        query: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<Value, HttpClientError> {
        debug!("GET {} with {:?}", url, loggable_query(query));

        let mut request = self.agent.get(url).timeout(timeout);
        for &(name, value) in query {
            request = request.query(name, value);
        }

        let response = match request.call() {
            Ok(resp) => resp,
            Err(ureq::Error::Status(code, response)) => {
                let error_body = response
                    .into_string()
                    .unwrap_or_else(|_| "<failed to read response body>".to_string());
                error!("HTTP error {} from {}: {}", code, url, truncate(&error_body));
                return Err(HttpClientError::ServerError(code, error_body));
            }
            Err(e) => {
                debug!("GET request failed: {}", e);
                return Err(HttpClientError::RequestError(e.to_string()));
            }
        };

        let response_text = match response.into_string() {
            Ok(text) => text,
            Err(e) => {
                debug!("Failed to read response body: {}", e);
                return Err(HttpClientError::ParseError(format!("Failed to read response body: {}", e)));
            }
        };

        parse_json_body(&response_text)
    }

    fn clone_box(&self) -> Box<dyn HttpClient> {
        Box::new(self.clone())
    }
}

/// Parse a response body as JSON, distinguishing empty bodies and HTML error pages
pub fn parse_json_body(response_text: &str) -> Result<Value, HttpClientError> {
    if response_text.trim().is_empty() {
        return Err(HttpClientError::EmptyResponse);
    }

    match serde_json::from_str::<Value>(response_text) {
        Ok(json_value) => Ok(json_value),
        Err(e) => {
            error!("Failed to parse JSON response: {}", e);
            error!("Response content: {}", truncate(response_text));
            if response_text.contains("<html") || response_text.contains("<!DOCTYPE") {
                return Err(HttpClientError::ParseError(
                    "Response is HTML instead of expected JSON".to_string(),
                ));
            }
            Err(HttpClientError::ParseError(e.to_string()))
        }
    }
}

/// Query parameters with credentials masked
fn loggable_query<'a>(query: &[(&'a str, &'a str)]) -> Vec<(&'a str, &'a str)> {
    query
        .iter()
        .map(|&(name, value)| {
            if HIDDEN_PARAMETERS.contains(&name) {
                (name, "[hidden]")
            } else {
                (name, value)
            }
        })
        .collect()
}

fn truncate(text: &str) -> String {
    if text.len() > 500 {
        let mut end = 500;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, total length: {} bytes)", &text[..end], text.len())
    } else {
        text.to_string()
    }
}

/// Create a new HTTP client using the default implementation
pub fn new_http_client() -> Box<dyn HttpClient> {
    Box::new(UreqHttpClient::new())
}
