//! # HTTP Retrieval Utilities
//!
//! This module provides a robust, asynchronous API client wrapper around `reqwest`.
//! It includes middleware support for exponential backoff retries, bounded
//! request timeouts, and standardized JSON response handling.

use std::time::Duration;

use reqwest::{header::HeaderMap, Method, Url};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::{de::DeserializeOwned, Serialize};

/// A standardized container for API responses.
///
/// This struct wraps the deserialized data along with metadata about the
/// HTTP transaction, such as status codes and headers.
#[derive(Debug)]
pub struct ApiResponse<T> {
    /// The successfully deserialized response body, if any.
    pub data: Option<T>,
    /// The raw error body returned by the server if the request failed.
    pub error_body: Option<String>,
    /// The numeric HTTP status code.
    pub status: u16,
    /// Indicates if the status code was in the 2xx range.
    pub success: bool,
    /// The headers returned by the server.
    pub headers: HeaderMap,
}

/// A flexible asynchronous HTTP client.
///
/// Built on top of `reqwest_middleware`, it handles base URLs, default
/// headers (API keys), bounded timeouts, and automatic retries.
pub struct ApiClient {
    /// The underlying middleware-enabled client.
    inner: ClientWithMiddleware,
    /// The base URL to which all relative paths are joined.
    base_url: Url,
    /// Headers attached to every outgoing request (auth keys and the like).
    default_headers: HeaderMap,
}

impl ApiClient {
    /// Creates a new `ApiClient` instance with a retry policy.
    ///
    /// # Arguments
    /// * `base_url` - The absolute base URL for the API (e.g., "https://api.example.com/v1/").
    /// * `default_headers` - Headers injected into every request.
    /// * `timeout` - Per-request timeout enforced by the underlying client.
    /// * `max_retries` - Number of transient-failure retries performed by the middleware.
    ///
    /// # Errors
    /// Returns an `anyhow::Error` if the base URL is not a valid absolute URL
    /// or the underlying client cannot be constructed.
    pub fn new(
        base_url: &str,
        default_headers: HeaderMap,
        timeout: Duration,
        max_retries: u32,
    ) -> anyhow::Result<Self> {
        let url = Url::parse(base_url)?;

        // Configure an exponential backoff policy for transient failures
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(max_retries);

        // Construct the client with a bounded timeout and the retry middleware
        let client = ClientBuilder::new(reqwest::Client::builder().timeout(timeout).build()?)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            inner: client,
            base_url: url,
            default_headers,
        })
    }

    /// Performs a GET request with query parameters and decodes the JSON body.
    pub async fn get_json<T>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> anyhow::Result<ApiResponse<T>>
    where
        T: DeserializeOwned,
    {
        self.request::<T, ()>(Method::GET, path, query, None).await
    }

    /// Performs a POST request with a JSON body and decodes the JSON response.
    pub async fn post_json<T, B>(&self, path: &str, body: &B) -> anyhow::Result<ApiResponse<T>>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        self.request(Method::POST, path, &[], Some(body)).await
    }

    /// Performs a generic HTTP request and handles the response.
    ///
    /// This method manages URL joining, header injection, and JSON
    /// serialization/deserialization.
    ///
    /// # Errors
    /// Returns an `anyhow::Error` if URL joining, network execution, or
    /// decoding of a successful body fails.
    pub async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> anyhow::Result<ApiResponse<T>>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        // 1. Construct the full absolute URL
        let full_url = self.base_url.join(path)?;
        let mut req = self.inner.request(method, full_url);

        // 2. Attach the default headers (API keys etc.)
        req = req.headers(self.default_headers.clone());

        // 3. Attach query parameters, if any
        if !query.is_empty() {
            req = req.query(query);
        }

        // 4. Serialize and attach the JSON body if present
        if let Some(b) = body {
            req = req.json(b);
        }

        // 5. Execute the request and capture response metadata
        let response: reqwest::Response = req.send().await?;
        let status = response.status();
        let resp_headers = response.headers().clone();
        let success = status.is_success();

        // 6. Handle the result based on success status
        if success {
            // Attempt to deserialize the body into the target type T
            let data = response.json::<T>().await?;
            Ok(ApiResponse {
                data: Some(data),
                error_body: None,
                status: status.as_u16(),
                success: true,
                headers: resp_headers,
            })
        } else {
            // Capture the error body as a string for debugging
            let error_text = response.text().await.ok();
            Ok(ApiResponse {
                data: None,
                error_body: error_text,
                status: status.as_u16(),
                success: false,
                headers: resp_headers,
            })
        }
    }
}
