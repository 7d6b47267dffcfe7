use anyhow::Context;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::config::Config;
use crate::error::{classify, AuthError, Result};

/// Fully-read HTTP response handed to callers and event listeners
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as text (lossy for non-UTF-8 bodies)
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Deserialize the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| AuthError::Decode(format!("{} from {}: {}", self.status, self.url, e)))
    }

    /// First header value with the given name (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// HTTP client that keeps session cookies between requests
///
/// Every request carries the cookies set by earlier responses, so a session
/// established by the token endpoint is sent along to the current-user and
/// logout endpoints.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .user_agent(config.user_agent.clone())
            .connect_timeout(Duration::from_secs(config.http_connect_timeout))
            .timeout(Duration::from_secs(config.http_request_timeout))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    pub fn get(&self, url: Url) -> RequestBuilder {
        self.client.get(url)
    }

    pub fn post(&self, url: Url) -> RequestBuilder {
        self.client.post(url)
    }

    /// Send a request once and read the whole response
    ///
    /// Non-2xx answers come back as `AuthError::Status` carrying the response.
    pub async fn execute(&self, request: RequestBuilder) -> Result<HttpResponse> {
        let request = request.build()?;
        let method = request.method().clone();
        let url = request.url().clone();

        // Query strings are not logged: they may carry grant parameters
        tracing::debug!(method = %method, path = url.path(), "Sending HTTP request");

        let response = match self.client.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                let error_kind = classify(&e);
                tracing::warn!(
                    error_kind = error_kind,
                    error = %e,
                    path = url.path(),
                    "HTTP request error"
                );
                return Err(AuthError::Transport {
                    kind: error_kind,
                    message: e.to_string(),
                });
            }
        };

        let status = response.status();
        let headers = collect_headers(response.headers());
        let final_url = response.url().to_string();
        let body = response.bytes().await?;

        let response = HttpResponse {
            status: status.as_u16(),
            url: final_url,
            headers,
            body,
        };

        if status.is_success() {
            tracing::debug!(status = %status, path = url.path(), "Request successful");
            return Ok(response);
        }

        tracing::warn!(
            status = status.as_u16(),
            method = %method,
            path = url.path(),
            "HTTP request failed with error response"
        );
        Err(AuthError::Status(response))
    }
}

/// Copy every header; values that are not UTF-8 are decoded lossily
fn collect_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(k, v)| {
            (
                k.as_str().to_string(),
                String::from_utf8_lossy(v.as_bytes()).into_owned(),
            )
        })
        .collect()
}
