//! Hosted backend client.
//!
//! The backend exposes two HTTP surfaces under one base URL:
//!
//! - `/auth/v1/*` - password-grant authentication (see [`auth`])
//! - `/rest/v1/{table}` - a REST data store addressed per table with
//!   query-string filters (see [`query`])
//!
//! Every request carries the publishable `apikey` header; authenticated
//! requests additionally carry a bearer token read from the [`TokenStore`]
//! at call time, so all components always use the latest session.

pub mod auth;
pub mod query;
pub mod token_store;

pub use query::TableQuery;
pub use token_store::TokenStore;

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

use crate::config::BackendConfig;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Status {
        /// Numeric HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// A 2xx response carried a domain error in its `error` field.
    #[error("Backend error: {0}")]
    Api(String),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// An insert or update with `return=representation` came back empty.
    #[error("expected a returned row, got an empty response")]
    NoReturnedRows,
}

/// Client for the hosted backend.
///
/// Cheaply cloneable; all clones share one HTTP connection pool and one
/// token store.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    http: reqwest::Client,
    base_url: Url,
    api_key: SecretString,
    tokens: TokenStore,
}

impl BackendClient {
    /// Create a new backend client sharing the given token store.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created. This should never happen
    /// under normal circumstances as we use standard TLS configuration.
    #[must_use]
    pub fn new(config: &BackendConfig, tokens: TokenStore) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            inner: Arc::new(BackendClientInner {
                http,
                base_url: config.base_url.clone(),
                api_key: config.api_key.clone(),
                tokens,
            }),
        }
    }

    /// Start a query against the named table.
    #[must_use]
    pub fn table(&self, name: &str) -> TableQuery {
        TableQuery::new(self.clone(), name)
    }

    /// The shared token store.
    #[must_use]
    pub fn tokens(&self) -> &TokenStore {
        &self.inner.tokens
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.inner.http
    }

    pub(crate) fn api_key(&self) -> &str {
        self.inner.api_key.expose_secret()
    }

    /// `{base}/rest/v1/{table}` with an optional query string.
    pub(crate) fn rest_endpoint(&self, table: &str, query_string: &str) -> String {
        let base = self.inner.base_url.as_str().trim_end_matches('/');
        if query_string.is_empty() {
            format!("{base}/rest/v1/{table}")
        } else {
            format!("{base}/rest/v1/{table}?{query_string}")
        }
    }

    /// `{base}/auth/v1/{path}`.
    pub(crate) fn auth_endpoint(&self, path: &str) -> String {
        let base = self.inner.base_url.as_str().trim_end_matches('/');
        format!("{base}/auth/v1/{path}")
    }

    /// Bearer token for the current session, if one is stored.
    pub(crate) fn bearer_token(&self) -> Option<String> {
        self.inner.tokens.access_token()
    }
}

/// Map a non-2xx response to [`BackendError::Status`], passing 2xx through.
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(BackendError::Status {
        status: status.as_u16(),
        body,
    })
}
