//! Shopify Admin REST API caller.
//!
//! The lookup component depends on the [`ShopifyAdminCaller`] trait rather
//! than a concrete client, so tests can drive it with a stub.
//! [`AdminRestClient`] is the production implementation.
//!
//! # API Reference
//!
//! - Base URL: `https://{store}/admin/api/{version}`
//! - Authentication: access token via `X-Shopify-Access-Token` header
//! - Paths are resource-relative (e.g., `/orders/123.json`)

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::ShopifyAdminConfig;

/// Errors that can occur when calling the Shopify Admin API.
#[derive(Debug, Error)]
pub enum AdminCallError {
    /// HTTP request failed (connection, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned a non-success HTTP status.
    #[error("Shopify Admin API error ({status}): {message}")]
    Api {
        /// HTTP status code from the response.
        status: u16,
        /// Response body text.
        message: String,
    },

    /// Failed to parse a response or build the request.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl AdminCallError {
    /// The HTTP status code associated with this error, where one exists.
    #[must_use]
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(err) => err.status().map(|s| s.as_u16()),
            Self::Parse(_) => None,
        }
    }
}

/// Read access to the Shopify Admin REST API.
#[async_trait]
pub trait ShopifyAdminCaller: Send + Sync {
    /// Execute a GET request against a resource-relative path
    /// (e.g., `/orders/123.json`) and return the parsed JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the API responds with a
    /// non-success status, or the body is not valid JSON.
    async fn call(&self, path: &str) -> Result<serde_json::Value, AdminCallError>;
}

/// Shopify Admin REST API client.
///
/// Cheap to clone; all state lives behind an `Arc`.
#[derive(Clone)]
pub struct AdminRestClient {
    inner: Arc<AdminRestClientInner>,
}

struct AdminRestClientInner {
    client: reqwest::Client,
    store: String,
    api_version: String,
}

impl AdminRestClient {
    /// Create a new Admin REST API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the access token is not a valid header value or
    /// the HTTP client fails to build.
    pub fn new(config: &ShopifyAdminConfig) -> Result<Self, AdminCallError> {
        let mut headers = HeaderMap::new();

        let mut token = HeaderValue::from_str(config.admin_token.expose_secret())
            .map_err(|e| AdminCallError::Parse(format!("Invalid admin token format: {e}")))?;
        token.set_sensitive(true);
        headers.insert("X-Shopify-Access-Token", token);

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            inner: Arc::new(AdminRestClientInner {
                client,
                store: config.store.clone(),
                api_version: config.api_version.clone(),
            }),
        })
    }

    /// Get the store domain.
    #[must_use]
    pub fn store(&self) -> &str {
        &self.inner.store
    }

    /// Get the configured API version.
    #[must_use]
    pub fn api_version(&self) -> &str {
        &self.inner.api_version
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "https://{}/admin/api/{}{}",
            self.inner.store, self.inner.api_version, path
        )
    }
}

#[async_trait]
impl ShopifyAdminCaller for AdminRestClient {
    async fn call(&self, path: &str) -> Result<serde_json::Value, AdminCallError> {
        let response = self.inner.client.get(self.endpoint(path)).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AdminCallError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| AdminCallError::Parse(format!("Failed to parse response: {e}")))
    }
}

impl std::fmt::Debug for AdminRestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminRestClient")
            .field("store", &self.inner.store)
            .field("api_version", &self.inner.api_version)
            .finish_non_exhaustive()
    }
}
