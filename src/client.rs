//! Top-level client: configuration, the table entry point, and RPC.

use std::sync::Arc;

use reqwest::Method;
use serde_json::{json, Value};
use tracing::warn;

use crate::auth::AuthClient;
use crate::error::{ApiError, ApiResponse};
use crate::query::Table;
use crate::rest::RestClient;
use crate::storage::StorageClient;
use crate::token::TokenStore;
use crate::transport::{Body, Transport};

/// Environment variable holding the backend base URL.
pub const BASE_URL_ENV: &str = "RESTDB_URL";

/// Fallback base URL for local development.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub base_url: String,
}

impl ClientOptions {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url }
    }

    /// Read the base URL from `RESTDB_URL`, falling back to the local
    /// development default.
    pub fn from_env() -> Self {
        let url = std::env::var(BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(url)
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

/// Client for a RestDB-style backend.
///
/// Cheap to clone; all clones share one HTTP connection pool and one token
/// store.
#[derive(Clone)]
pub struct RestDb {
    transport: Arc<Transport>,
    tokens: Arc<TokenStore>,
}

impl RestDb {
    pub fn new(options: ClientOptions) -> Self {
        let tokens = Arc::new(TokenStore::new());
        let transport = Arc::new(Transport::new(
            reqwest::Client::new(),
            options.base_url,
            Arc::clone(&tokens),
        ));
        Self { transport, tokens }
    }

    /// Construct from `RESTDB_URL` (default `http://localhost:3000`).
    pub fn from_env() -> Self {
        Self::new(ClientOptions::from_env())
    }

    /// Entry point for table operations.
    pub fn from(&self, table: &str) -> Table {
        Table::new(Arc::clone(&self.transport), table)
    }

    /// Invoke a named server procedure, bypassing the filter grammar.
    /// Envelope convention; a 204 resolves to an empty envelope.
    pub async fn rpc(&self, function: &str, params: Option<Value>) -> ApiResponse {
        let path = format!("/rest/v1/rpc/{}", function);
        let body = params.unwrap_or_else(|| json!({}));
        match self
            .transport
            .send(Method::POST, &path, Some(Body::Json(body)), &[])
            .await
        {
            Ok(Some(payload)) => ApiResponse::success(payload),
            Ok(None) => ApiResponse::empty(),
            Err(e) => {
                warn!(function = %function, op = "rpc", error = %e, "rpc call failed");
                ApiResponse::failure(ApiError::from(e))
            }
        }
    }

    pub fn storage(&self) -> StorageClient {
        StorageClient::new(Arc::clone(&self.transport))
    }

    pub fn rest(&self) -> RestClient {
        RestClient::new(Arc::clone(&self.transport))
    }

    pub fn auth(&self) -> AuthClient {
        AuthClient::new(Arc::clone(&self.transport), Arc::clone(&self.tokens))
    }

    /// Credential storage consumed by the transport. The application owns
    /// what goes in and when it is cleared.
    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn base_url(&self) -> &str {
        self.transport.base_url()
    }
}
