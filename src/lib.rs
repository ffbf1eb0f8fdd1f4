//! RestDB Rust Client SDK
//!
//! An HTTP client for RestDB-style JSON backends: generic table endpoints
//! with a PostgREST-style filter grammar, named server procedures, object
//! storage, and bearer-token auth.
//!
//! Table operations build up query state across chained calls and fire a
//! single request when awaited; they resolve to a `{data, error}` envelope
//! and never error out of the future. The convenience verb client and the
//! auth endpoints use plain `Result`s instead. Both conventions are part of
//! the API surface.
//!
//! # Example
//!
//! ```no_run
//! use restdb::{Filterable, RestDb, SortDir};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() {
//!   let db = RestDb::from_env();
//!
//!   // Insert a row
//!   let created = db
//!     .from("tasks")
//!     .insert(json!({ "title": "Write the report", "status": "open" }))
//!     .await;
//!   println!("created: {:?}", created.data);
//!
//!   // Filters accumulate across calls; nothing fires until the await
//!   let done = db
//!     .from("tasks")
//!     .select("*")
//!     .eq("status", "done")
//!     .order("due_date", SortDir::Asc)
//!     .limit(5)
//!     .await;
//!   println!("done: {:?}", done.data);
//!
//!   // Scope an update with the same filter grammar
//!   let archived = db
//!     .from("tasks")
//!     .update(json!({ "status": "archived" }))
//!     .eq("status", "done")
//!     .await;
//!   println!("archived: {:?}", archived.data);
//! }
//! ```

mod auth;
mod client;
mod error;
mod filter;
mod query;
mod rest;
mod storage;
mod token;
mod transport;

pub use auth::{AuthClient, Session, User};
pub use client::{ClientOptions, RestDb, BASE_URL_ENV, DEFAULT_BASE_URL};
pub use error::{ApiError, ApiResponse, Error, Result};
pub use filter::{encode, encode_not, FilterSet, Filterable, Op};
pub use query::{
  DeleteBuilder, InsertBuilder, OrderedSelectBuilder, SelectBuilder, SortDir, Table,
  UpdateBuilder,
};
pub use rest::RestClient;
pub use storage::{Bucket, StorageClient, StorageObject};
pub use token::{TokenStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
