//! Client-side credential storage.
//!
//! The Rust analogue of the host application's local key/value storage: the
//! application writes tokens in at sign-in, the transport reads them out
//! immediately before each request. Reads are lazy, so a token swapped in
//! between building a query chain and awaiting it is honored.

use std::collections::HashMap;
use std::sync::RwLock;

/// Storage key for the bearer access token.
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// Storage key for the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

#[derive(Debug, Default)]
pub struct TokenStore {
  values: RwLock<HashMap<String, String>>,
}

impl TokenStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, key: &str) -> Option<String> {
    self.values.read().ok()?.get(key).cloned()
  }

  pub fn set(&self, key: &str, value: &str) {
    if let Ok(mut values) = self.values.write() {
      values.insert(key.to_string(), value.to_string());
    }
  }

  pub fn remove(&self, key: &str) {
    if let Ok(mut values) = self.values.write() {
      values.remove(key);
    }
  }

  /// Bearer credential for the next request, if one is stored.
  pub fn access_token(&self) -> Option<String> {
    self.get(ACCESS_TOKEN_KEY)
  }

  pub fn refresh_token(&self) -> Option<String> {
    self.get(REFRESH_TOKEN_KEY)
  }

  /// Store both halves of a session. A missing refresh half removes any
  /// previously stored one.
  pub fn set_session(&self, access: &str, refresh: Option<&str>) {
    self.set(ACCESS_TOKEN_KEY, access);
    match refresh {
      Some(token) => self.set(REFRESH_TOKEN_KEY, token),
      None => self.remove(REFRESH_TOKEN_KEY),
    }
  }

  /// Drop all stored credentials, e.g. on sign-out.
  pub fn clear(&self) {
    if let Ok(mut values) = self.values.write() {
      values.clear();
    }
  }
}
