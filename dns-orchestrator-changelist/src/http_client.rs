//! reqwest-backed [`Transport`]
//!
//! Sends requests, logs them, reads the body and extracts the `retry-after`
//! header. Status codes are returned as-is: turning them into protocol
//! errors is the job of [`ApiClient`](crate::api::ApiClient). Request
//! signing is not done here; callers that need per-request signatures wrap
//! or replace this transport.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::TransportError;
use crate::transport::{ApiRequest, ApiResponse, HttpMethod, Transport};
use crate::utils::body_preview::preview;

/// Default connection timeout
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
/// Default request timeout
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpTransportConfig {
    /// Scheme and host, e.g. `https://akab-xxxx.luna.akamaiapis.net`.
    pub base_url: String,
    #[serde(
        rename = "connectTimeoutMs",
        with = "crate::utils::duration_ms",
        default = "default_connect_timeout"
    )]
    pub connect_timeout: Duration,
    #[serde(
        rename = "requestTimeoutMs",
        with = "crate::utils::duration_ms",
        default = "default_request_timeout"
    )]
    pub request_timeout: Duration,
    /// Headers sent with every request (static auth tokens, account switch keys).
    #[serde(default)]
    pub default_headers: Vec<(String, String)>,
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)
}

impl HttpTransportConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            connect_timeout: default_connect_timeout(),
            request_timeout: default_request_timeout(),
            default_headers: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }
}

pub struct HttpTransport {
    client: Client,
    base_url: String,
    default_headers: Vec<(String, String)>,
}

impl HttpTransport {
    pub fn new(config: HttpTransportConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| TransportError::Network(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self::with_client(client, config))
    }

    /// Use a preconfigured client (proxies, custom TLS roots...).
    pub fn with_client(client: Client, config: HttpTransportConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            default_headers: config.default_headers,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

fn map_send_error(e: &reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout(e.to_string())
    } else {
        TransportError::Network(e.to_string())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = self.url(&request.path);
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };
        log::debug!("{} {url}", request.method);

        let mut builder = self.client.request(method, &url);
        for (name, value) in self.default_headers.iter().chain(request.headers.iter()) {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            log::debug!("Request Body: {}", preview(&body.to_string()));
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| map_send_error(&e))?;

        let status = response.status().as_u16();
        log::debug!("Response Status: {status}");

        // Read before the body consumes the response
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(format!("Failed to read response body: {e}"))
            } else {
                TransportError::Network(format!("Failed to read response body: {e}"))
            }
        })?;

        log::debug!("Response Body: {}", preview(&body));

        Ok(ApiResponse {
            status,
            retry_after,
            body,
        })
    }
}
