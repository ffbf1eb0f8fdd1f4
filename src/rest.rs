//! Convenience verb client.
//!
//! For callers that do not need the filter grammar. Unlike the builder
//! families this client errors on non-2xx instead of resolving to an
//! envelope; `get` treats a 404 as an empty list and `delete` tolerates an
//! empty response body.

use std::sync::Arc;

use reqwest::Method;
use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::transport::{Body, Transport};

pub struct RestClient {
    transport: Arc<Transport>,
}

impl RestClient {
    pub(crate) fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }

    fn path(path: &str) -> String {
        format!("/rest/v1{}", path)
    }

    /// GET a resource. A 404 resolves to an empty array: list endpoints
    /// report a missing collection that way and callers read it as "no
    /// rows", not as a failure.
    pub async fn get(&self, path: &str) -> Result<Value> {
        match self
            .transport
            .send(Method::GET, &Self::path(path), None, &[])
            .await
        {
            Ok(payload) => Ok(payload.unwrap_or(Value::Null)),
            Err(Error::Http { status: 404, .. }) => Ok(json!([])),
            Err(e) => Err(e),
        }
    }

    pub async fn post(&self, path: &str, body: Value) -> Result<Value> {
        let payload = self
            .transport
            .send(Method::POST, &Self::path(path), Some(Body::Json(body)), &[])
            .await?;
        Ok(payload.unwrap_or(Value::Null))
    }

    pub async fn put(&self, path: &str, body: Value) -> Result<Value> {
        let payload = self
            .transport
            .send(Method::PUT, &Self::path(path), Some(Body::Json(body)), &[])
            .await?;
        Ok(payload.unwrap_or(Value::Null))
    }

    pub async fn patch(&self, path: &str, body: Value) -> Result<Value> {
        let payload = self
            .transport
            .send(Method::PATCH, &Self::path(path), Some(Body::Json(body)), &[])
            .await?;
        Ok(payload.unwrap_or(Value::Null))
    }

    /// DELETE a resource. An empty response body reports zero deletions
    /// rather than a parse failure.
    pub async fn delete(&self, path: &str) -> Result<Value> {
        let payload = self
            .transport
            .send(Method::DELETE, &Self::path(path), None, &[])
            .await?;
        Ok(payload.unwrap_or_else(|| json!({ "deleted": 0 })))
    }
}
