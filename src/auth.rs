//! Auth endpoints.
//!
//! Thin wrappers over the transport using the throwing convention. Session
//! tokens are written into the client's token store on sign-in and cleared
//! on sign-out; retry and forced-logout policy stay with the caller.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::token::TokenStore;
use crate::transport::{Body, Transport};

/// Authenticated user record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user_metadata: Option<Value>,
}

/// Session returned by sign-in and sign-up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub user: Option<User>,
}

pub struct AuthClient {
    transport: Arc<Transport>,
    tokens: Arc<TokenStore>,
}

impl AuthClient {
    pub(crate) fn new(transport: Arc<Transport>, tokens: Arc<TokenStore>) -> Self {
        Self { transport, tokens }
    }

    /// Password sign-in. Stores the returned tokens for subsequent
    /// requests.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let body = json!({ "email": email, "password": password });
        let payload = self
            .transport
            .send(
                Method::POST,
                "/auth/v1/token?grant_type=password",
                Some(Body::Json(body)),
                &[],
            )
            .await?;
        let session: Session = parse_payload(payload)?;
        self.tokens
            .set_session(&session.access_token, session.refresh_token.as_deref());
        Ok(session)
    }

    /// Register a new account. Stores tokens when the response carries a
    /// session.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Session> {
        let body = json!({ "email": email, "password": password });
        let payload = self
            .transport
            .send(Method::POST, "/auth/v1/signup", Some(Body::Json(body)), &[])
            .await?;
        let session: Session = parse_payload(payload)?;
        self.tokens
            .set_session(&session.access_token, session.refresh_token.as_deref());
        Ok(session)
    }

    /// Sign out on the backend and clear local credentials. Local state is
    /// cleared even when the backend call fails: a rejected token must not
    /// keep the session alive on this side.
    pub async fn sign_out(&self) -> Result<()> {
        let result = self
            .transport
            .send(Method::POST, "/auth/v1/logout", None, &[])
            .await;
        self.tokens.clear();
        result.map(|_| ())
    }

    /// Fetch the user behind the stored token.
    pub async fn user(&self) -> Result<User> {
        let payload = self
            .transport
            .send(Method::GET, "/auth/v1/user", None, &[])
            .await?;
        parse_payload(payload)
    }

    /// Update profile fields of the signed-in user.
    pub async fn update_user(&self, patch: Value) -> Result<User> {
        let payload = self
            .transport
            .send(Method::PUT, "/auth/v1/user", Some(Body::Json(patch)), &[])
            .await?;
        parse_payload(payload)
    }

    pub async fn change_password(&self, new_password: &str) -> Result<()> {
        let body = json!({ "password": new_password });
        self.transport
            .send(
                Method::POST,
                "/auth/v1/user/password",
                Some(Body::Json(body)),
                &[],
            )
            .await?;
        Ok(())
    }
}

fn parse_payload<T: DeserializeOwned>(payload: Option<Value>) -> Result<T> {
    let value =
        payload.ok_or_else(|| Error::Serialization("empty auth response".to_string()))?;
    Ok(serde_json::from_value(value)?)
}
