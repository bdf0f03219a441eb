//! Named device actions: `GET /health` and `POST /run`.

use std::time::Duration;

use esplink_protocol::ResolvedAddress;
use tracing::debug;

use crate::client::HttpClient;
use crate::error::HttpError;
use crate::types::{ActionRequest, ActionResult, HttpMethod, Payload};

/// Builds the base URL for a device address.
///
/// Addresses that already carry `http://` or `https://` are used verbatim;
/// anything else gets `http://` prepended.
pub fn base_url(address: &str) -> String {
    let base = if address.starts_with("http://") || address.starts_with("https://") {
        address.to_string()
    } else {
        format!("http://{address}")
    };
    base.trim_end_matches('/').to_string()
}

/// Performs device actions over a shared [`HttpClient`].
///
/// Timeouts and cancellation are entirely the client's job; nothing here
/// retries.
#[derive(Clone)]
pub struct ActionDispatcher {
    client: HttpClient,
    include_token_query: bool,
    timeout: Option<Duration>,
}

impl ActionDispatcher {
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            include_token_query: false,
            timeout: None,
        }
    }

    /// Also send the token as `?token=` for firmware that cannot read
    /// custom headers.
    pub fn with_token_query(mut self, enabled: bool) -> Self {
        self.include_token_query = enabled;
        self
    }

    /// Per-action timeout, overriding the client's default.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn client(&self) -> &HttpClient {
        &self.client
    }

    pub fn build_health(&self, target: &ResolvedAddress) -> ActionRequest {
        ActionRequest {
            method: HttpMethod::Get,
            url: format!("{}/health", base_url(&target.address)),
            headers: host_header(target).into_iter().collect(),
            body: None,
            timeout: self.timeout,
        }
    }

    pub fn build_run(
        &self,
        target: &ResolvedAddress,
        token: &str,
        payload: &Payload,
    ) -> Result<ActionRequest, HttpError> {
        let raw = format!("{}/run", base_url(&target.address));
        let url = if self.include_token_query && !token.is_empty() {
            let mut url = reqwest::Url::parse(&raw)
                .map_err(|e| HttpError::InvalidRequest(format!("{raw}: {e}")))?;
            url.query_pairs_mut().append_pair("token", token);
            url.to_string()
        } else {
            raw
        };

        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        if !token.is_empty() {
            headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        }
        headers.extend(host_header(target));

        Ok(ActionRequest {
            method: HttpMethod::Post,
            url,
            headers,
            body: Some(payload.to_body()?),
            timeout: self.timeout,
        })
    }

    /// Queries the device's health endpoint.
    pub async fn health(&self, target: &ResolvedAddress) -> Result<ActionResult, HttpError> {
        let req = self.build_health(target);
        debug!(url = %req.url, "health check");
        self.client.request(&req).await
    }

    /// Asks the device to run a job described by `payload`.
    pub async fn run_action(
        &self,
        target: &ResolvedAddress,
        token: &str,
        payload: &Payload,
    ) -> Result<ActionResult, HttpError> {
        let req = self.build_run(target, token, payload)?;
        debug!(url = %req.url, authenticated = !token.is_empty(), "run action");
        self.client.request(&req).await
    }
}

/// `Host` header carrying the link-local name when the URL uses its IP.
fn host_header(target: &ResolvedAddress) -> Option<(String, String)> {
    target.source_header_required.then(|| {
        (
            "Host".to_string(),
            target.hostname.trim_end_matches('.').to_string(),
        )
    })
}
