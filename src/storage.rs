//! Object storage operations.
//!
//! Independent HTTP calls with no chaining state; every operation resolves
//! to the result envelope. Public URLs are constructed client-side without
//! a round trip.

use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::error::{ApiError, ApiResponse};
use crate::transport::{Body, Transport};

/// Storage bucket metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bucket {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub public: bool,
}

/// Reference to an uploaded object, consumed by download, URL and delete
/// operations keyed on `path`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageObject {
    pub path: String,
    pub url: String,
    pub size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

pub struct StorageClient {
    transport: Arc<Transport>,
}

impl StorageClient {
    pub(crate) fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }

    /// List all storage buckets.
    pub async fn list_buckets(&self) -> ApiResponse<Vec<Bucket>> {
        match self
            .transport
            .send(Method::GET, "/storage/v1/bucket", None, &[])
            .await
        {
            Ok(Some(payload)) => match serde_json::from_value(payload) {
                Ok(buckets) => ApiResponse::success(buckets),
                Err(e) => ApiResponse::failure(ApiError::new(e.to_string())),
            },
            Ok(None) => ApiResponse::success(Vec::new()),
            Err(e) => {
                warn!(op = "list_buckets", error = %e, "storage call failed");
                ApiResponse::failure(ApiError::from(e))
            }
        }
    }

    /// Upload a file as multipart form data. Resolves to the object
    /// reference, with a SHA-256 checksum computed client-side.
    pub async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> ApiResponse<StorageObject> {
        let size = bytes.len();
        let checksum = hex::encode(Sha256::digest(&bytes));
        let file_name = path.rsplit('/').next().unwrap_or(path).to_string();

        let part = match Part::bytes(bytes).file_name(file_name).mime_str(content_type) {
            Ok(part) => part,
            Err(e) => return ApiResponse::failure(ApiError::new(e.to_string())),
        };
        let form = Form::new().part("file", part);
        let endpoint = format!("/storage/v1/object/{}/{}", bucket, encode_path(path));

        match self
            .transport
            .send(Method::POST, &endpoint, Some(Body::Multipart(form)), &[])
            .await
        {
            Ok(_) => ApiResponse::success(StorageObject {
                path: format!("{}/{}", bucket, path),
                url: self.get_public_url(bucket, path),
                size,
                checksum: Some(checksum),
            }),
            Err(e) => {
                warn!(bucket = %bucket, op = "upload", error = %e, "storage call failed");
                ApiResponse::failure(ApiError::from(e))
            }
        }
    }

    /// Download an object's raw bytes.
    pub async fn download(&self, bucket: &str, path: &str) -> ApiResponse<Vec<u8>> {
        let endpoint = format!("/storage/v1/object/{}/{}", bucket, encode_path(path));
        match self.transport.send_bytes(Method::GET, &endpoint).await {
            Ok(bytes) => ApiResponse::success(bytes),
            Err(e) => {
                warn!(bucket = %bucket, op = "download", error = %e, "storage call failed");
                ApiResponse::failure(ApiError::from(e))
            }
        }
    }

    /// Public URL for an object. Pure string construction, no network call.
    pub fn get_public_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.transport.base_url(),
            bucket,
            encode_path(path)
        )
    }

    /// Remove a batch of objects from a bucket.
    pub async fn remove(&self, bucket: &str, paths: &[&str]) -> ApiResponse<Value> {
        let endpoint = format!("/storage/v1/object/delete/{}", bucket);
        let body = json!({ "paths": paths });
        match self
            .transport
            .send(Method::POST, &endpoint, Some(Body::Json(body)), &[])
            .await
        {
            Ok(payload) => ApiResponse::success(payload.unwrap_or_else(|| json!({}))),
            Err(e) => {
                warn!(bucket = %bucket, op = "remove", error = %e, "storage call failed");
                ApiResponse::failure(ApiError::from(e))
            }
        }
    }
}

/// Encode each path segment, keeping the separators.
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
