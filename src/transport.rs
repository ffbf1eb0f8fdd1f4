//! HTTP transport shared by every operation in the SDK.
//!
//! One choke point builds the request (content type, bearer auth), sends
//! it, and classifies the response. Callers differ only in what they do
//! with the classified result: the builder families fold errors into
//! envelopes, the verb client and auth propagate them.

use std::sync::Arc;

use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::Form;
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::token::TokenStore;

/// Request body variants. Multipart bodies must not carry an explicit
/// content type: the HTTP stack sets `multipart/form-data` together with
/// the boundary itself.
pub(crate) enum Body {
    Json(Value),
    Multipart(Form),
}

pub(crate) struct Transport {
    http: Client,
    base_url: String,
    tokens: Arc<TokenStore>,
}

impl Transport {
    pub(crate) fn new(http: Client, base_url: String, tokens: Arc<TokenStore>) -> Self {
        Self {
            http,
            base_url,
            tokens,
        }
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Body>,
        headers: &[(&str, String)],
    ) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.http.request(method, &url);

        // The token is read here, not at chain construction, so a
        // credential swapped in mid-chain is honored.
        if let Some(token) = self.tokens.access_token() {
            req = req.bearer_auth(token);
        }

        req = match body {
            Some(Body::Json(value)) => req.json(&value),
            Some(Body::Multipart(form)) => req.multipart(form),
            None => req.header(CONTENT_TYPE, "application/json"),
        };

        for (name, value) in headers {
            req = req.header(*name, value.as_str());
        }

        req
    }

    /// Send a request and classify the response into a parsed JSON payload
    /// (`None` for an empty body) or an error.
    pub(crate) async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Body>,
        headers: &[(&str, String)],
    ) -> Result<Option<Value>> {
        let response = self.request(method, path, body, headers).send().await?;
        classify_json(response).await
    }

    /// Send a request and return the raw response bytes. Non-2xx responses
    /// classify exactly as in [`Transport::send`].
    pub(crate) async fn send_bytes(&self, method: Method, path: &str) -> Result<Vec<u8>> {
        let response = self.request(method, path, None, &[]).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(response.bytes().await?.to_vec())
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(status_error(status, &text))
        }
    }
}

async fn classify_json(response: reqwest::Response) -> Result<Option<Value>> {
    let status = response.status();
    if status.is_success() {
        let text = response.text().await?;
        // 204s and other empty bodies resolve to no payload instead of a
        // JSON parse error.
        if text.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&text)?))
    } else {
        let text = response.text().await.unwrap_or_default();
        Err(status_error(status, &text))
    }
}

/// Build the error for a non-2xx response: the backend's `message` when the
/// body parses as JSON, a generic `HTTP <status>` otherwise.
fn status_error(status: StatusCode, body: &str) -> Error {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|v| v.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

    Error::Http {
        status: status.as_u16(),
        message,
        body: parsed,
    }
}
