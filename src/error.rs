//! Error types and the result envelope for the restdb client SDK.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
  #[error("HTTP {status}: {message}")]
  Http {
    status: u16,
    message: String,
    body: Option<serde_json::Value>,
  },

  #[error("Network error: {0}")]
  Network(String),

  #[error("Serialization error: {0}")]
  Serialization(String),
}

impl From<reqwest::Error> for Error {
  fn from(e: reqwest::Error) -> Self {
    Self::Network(e.to_string())
  }
}

impl From<serde_json::Error> for Error {
  fn from(e: serde_json::Error) -> Self {
    Self::Serialization(e.to_string())
  }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Error half of the result envelope.
///
/// Carries the backend's parsed error body when one was returned, otherwise
/// a synthesized message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
  pub message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<u16>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub details: Option<serde_json::Value>,
}

impl ApiError {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
      status: None,
      details: None,
    }
  }
}

impl std::fmt::Display for ApiError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.message)
  }
}

impl From<Error> for ApiError {
  fn from(e: Error) -> Self {
    match e {
      Error::Http {
        status,
        message,
        body,
      } => Self {
        message,
        status: Some(status),
        details: body,
      },
      other => Self::new(other.to_string()),
    }
  }
}

/// Result envelope resolved by every table builder, RPC and storage call.
///
/// Exactly one of `data` and `error` is populated when an operation
/// resolves. The convenience REST client and the auth endpoints do not use
/// this envelope; they return `Result` and error instead.
#[derive(Debug, Clone)]
pub struct ApiResponse<T = serde_json::Value> {
  pub data: Option<T>,
  pub error: Option<ApiError>,
}

impl<T> ApiResponse<T> {
  pub fn success(data: T) -> Self {
    Self {
      data: Some(data),
      error: None,
    }
  }

  /// Empty success, e.g. a 204 from an RPC call.
  pub fn empty() -> Self {
    Self {
      data: None,
      error: None,
    }
  }

  pub fn failure(error: ApiError) -> Self {
    Self {
      data: None,
      error: Some(error),
    }
  }

  pub fn is_ok(&self) -> bool {
    self.error.is_none()
  }

  /// Collapse the envelope into a plain `Result` over the error half.
  pub fn into_result(self) -> std::result::Result<Option<T>, ApiError> {
    match self.error {
      Some(error) => Err(error),
      None => Ok(self.data),
    }
  }
}
