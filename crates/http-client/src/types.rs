//! Request and response values for the HTTP control path.
//!
//! Plain data with owned fields: requests are built once per call and
//! never retained.

use std::time::Duration;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl From<HttpMethod> for reqwest::Method {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        }
    }
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone)]
pub struct ActionRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    /// Overrides the client's default timeout when set.
    pub timeout: Option<Duration>,
}

impl ActionRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    /// Returns the value of the first header named `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status and body of a device response, passed through verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResult {
    pub status: u16,
    pub body: String,
}

impl ActionResult {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Body of a `/run` call.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Sent as-is.
    Text(String),
    /// Serialized to JSON; `null` is sent as `{}`.
    Json(serde_json::Value),
}

impl Payload {
    pub fn to_body(&self) -> Result<String, serde_json::Error> {
        match self {
            Payload::Text(s) => Ok(s.clone()),
            Payload::Json(serde_json::Value::Null) => Ok("{}".to_string()),
            Payload::Json(v) => serde_json::to_string(v),
        }
    }
}

impl From<serde_json::Value> for Payload {
    fn from(v: serde_json::Value) -> Self {
        Payload::Json(v)
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Payload::Text(s)
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Payload::Text(s.to_string())
    }
}
