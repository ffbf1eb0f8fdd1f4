//! End-to-end request/response tests against a canned HTTP stub.
//!
//! Each test serves exactly one prepared response on a fresh local port and
//! captures the raw request, so both sides of the wire contract are
//! checked: what goes out (path, query string, headers, body) and how the
//! response classifies (envelope vs. thrown error).

use restdb::{ClientOptions, Error, Filterable, RestDb};
use serde_json::json;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Serve one canned HTTP response, capturing the raw request. Returns the
/// base URL and a handle resolving to the captured request text.
async fn stub(
    status_line: &str,
    content_type: &str,
    body: &str,
) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_line,
        content_type,
        body.len(),
        body
    );

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            buf.extend_from_slice(&chunk[..n]);
            if n == 0 || request_complete(&buf) {
                break;
            }
        }
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        String::from_utf8_lossy(&buf).into_owned()
    });

    (format!("http://{}", addr), handle)
}

/// A request is complete once the header block has arrived and the body
/// matches its declared content length.
fn request_complete(buf: &[u8]) -> bool {
    let Some(header_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
        return false;
    };
    let headers = String::from_utf8_lossy(&buf[..header_end]);
    let content_length = headers
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if name.eq_ignore_ascii_case("content-length") {
                value.trim().parse::<usize>().ok()
            } else {
                None
            }
        })
        .unwrap_or(0);
    buf.len() >= header_end + 4 + content_length
}

fn request_line(request: &str) -> &str {
    request.lines().next().unwrap_or("")
}

#[tokio::test]
async fn test_select_resolves_envelope_and_compiles_query() {
    let (url, handle) = stub("200 OK", "application/json", r#"[{"id":"1","status":"done"}]"#).await;
    let db = RestDb::new(ClientOptions::new(url));

    let resolved = db.from("tasks").select("*").eq("status", "done").await;

    assert!(resolved.error.is_none());
    assert_eq!(resolved.data, Some(json!([{"id": "1", "status": "done"}])));

    let request = handle.await.unwrap();
    assert_eq!(
        request_line(&request),
        "GET /rest/v1/tasks?select=*&eq.status=done HTTP/1.1"
    );
    assert!(request.contains("content-type: application/json"));
}

#[tokio::test]
async fn test_execute_and_direct_await_send_identical_requests() {
    let (url_a, handle_a) = stub("200 OK", "application/json", "[]").await;
    let db_a = RestDb::new(ClientOptions::new(url_a));
    db_a.from("tasks")
        .select("*")
        .eq("status", "done")
        .execute()
        .await;

    let (url_b, handle_b) = stub("200 OK", "application/json", "[]").await;
    let db_b = RestDb::new(ClientOptions::new(url_b));
    let _ = db_b.from("tasks").select("*").eq("status", "done").await;

    let line_a = handle_a.await.unwrap();
    let line_b = handle_b.await.unwrap();
    assert_eq!(request_line(&line_a), request_line(&line_b));
}

#[tokio::test]
async fn test_range_travels_as_headers_not_parameters() {
    let (url, handle) = stub("200 OK", "application/json", "[]").await;
    let db = RestDb::new(ClientOptions::new(url));

    let resolved = db.from("tasks").select("*").range(0, 9).await;
    assert!(resolved.error.is_none());

    let request = handle.await.unwrap();
    assert!(request.contains("range: 0-9"));
    assert!(request.contains("prefer: count=exact"));
    assert!(!request_line(&request).contains("limit="));
    assert!(!request_line(&request).contains("range"));
}

#[tokio::test]
async fn test_error_body_message_surfaces_in_envelope() {
    let (url, _handle) = stub(
        "500 Internal Server Error",
        "application/json",
        r#"{"message":"boom"}"#,
    )
    .await;
    let db = RestDb::new(ClientOptions::new(url));

    let resolved = db.from("tasks").select("*").await;

    assert!(resolved.data.is_none());
    let error = resolved.error.unwrap();
    assert_eq!(error.message, "boom");
    assert_eq!(error.status, Some(500));
}

#[tokio::test]
async fn test_unparsable_error_body_synthesizes_message() {
    let (url, _handle) = stub("502 Bad Gateway", "text/html", "<html>bad</html>").await;
    let db = RestDb::new(ClientOptions::new(url));

    let resolved = db.from("tasks").select("*").await;

    let error = resolved.error.unwrap();
    assert_eq!(error.message, "HTTP 502");
}

#[tokio::test]
async fn test_single_takes_first_row() {
    let (url, _handle) = stub(
        "200 OK",
        "application/json",
        r#"[{"id":"1"},{"id":"2"}]"#,
    )
    .await;
    let db = RestDb::new(ClientOptions::new(url));

    let resolved = db.from("tasks").select("*").eq("id", "1").single().await;

    assert!(resolved.error.is_none());
    assert_eq!(resolved.data, Some(json!({"id": "1"})));
}

#[tokio::test]
async fn test_single_on_empty_array_resolves_null() {
    let (url, _handle) = stub("200 OK", "application/json", "[]").await;
    let db = RestDb::new(ClientOptions::new(url));

    let resolved = db.from("tasks").select("*").single().await;

    assert!(resolved.data.is_none());
    assert!(resolved.error.is_none());
}

#[tokio::test]
async fn test_single_issues_unlimited_query() {
    let (url, handle) = stub("200 OK", "application/json", "[]").await;
    let db = RestDb::new(ClientOptions::new(url));

    let _ = db.from("tasks").select("*").limit(5).single().await;

    let request = handle.await.unwrap();
    assert_eq!(request_line(&request), "GET /rest/v1/tasks?select=* HTTP/1.1");
}

#[tokio::test]
async fn test_insert_posts_rows() {
    let (url, handle) = stub("201 Created", "application/json", r#"[{"id":"1"}]"#).await;
    let db = RestDb::new(ClientOptions::new(url));

    let resolved = db.from("tasks").insert(json!({ "title": "x" })).await;
    assert!(resolved.error.is_none());

    let request = handle.await.unwrap();
    assert_eq!(request_line(&request), "POST /rest/v1/tasks HTTP/1.1");
    assert!(request.contains("content-type: application/json"));
    assert!(request.contains(r#""title":"x""#));
}

#[tokio::test]
async fn test_insert_select_adds_parameter() {
    let (url, handle) = stub("201 Created", "application/json", r#"[{"id":"1"}]"#).await;
    let db = RestDb::new(ClientOptions::new(url));

    let _ = db.from("tasks").insert(json!({ "title": "x" })).select("id").await;

    let request = handle.await.unwrap();
    assert_eq!(
        request_line(&request),
        "POST /rest/v1/tasks?select=id HTTP/1.1"
    );
}

#[tokio::test]
async fn test_update_204_resolves_empty_array() {
    let (url, handle) = stub("204 No Content", "application/json", "").await;
    let db = RestDb::new(ClientOptions::new(url));

    let resolved = db
        .from("clients")
        .update(json!({ "status": "inactive" }))
        .eq("id", "abc")
        .await;

    assert!(resolved.error.is_none());
    assert_eq!(resolved.data, Some(json!([])));

    let request = handle.await.unwrap();
    assert_eq!(
        request_line(&request),
        "PATCH /rest/v1/clients?eq.id=abc HTTP/1.1"
    );
    assert!(request.contains(r#""status":"inactive""#));
}

#[tokio::test]
async fn test_builder_delete_404_resolves_envelope() {
    let (url, handle) = stub("404 Not Found", "application/json", r#"{"message":"missing"}"#).await;
    let db = RestDb::new(ClientOptions::new(url));

    let resolved = db.from("x").delete().eq("id", "missing").await;

    assert!(resolved.data.is_none());
    let error = resolved.error.unwrap();
    assert_eq!(error.message, "missing");
    assert_eq!(error.status, Some(404));

    let request = handle.await.unwrap();
    assert_eq!(
        request_line(&request),
        "DELETE /rest/v1/x?eq.id=missing HTTP/1.1"
    );
}

#[tokio::test]
async fn test_rest_delete_404_errors() {
    let (url, _handle) = stub("404 Not Found", "application/json", r#"{"message":"missing"}"#).await;
    let db = RestDb::new(ClientOptions::new(url));

    let result = db.rest().delete("/x/missing").await;

    match result {
        Err(Error::Http { status: 404, message, .. }) => assert_eq!(message, "missing"),
        other => panic!("Expected Http 404 error, got: {:?}", other),
    }
}

#[tokio::test]
async fn test_rest_get_soft_404_returns_empty_array() {
    let (url, _handle) = stub(
        "404 Not Found",
        "application/json",
        r#"{"message":"no such table"}"#,
    )
    .await;
    let db = RestDb::new(ClientOptions::new(url));

    let value = db.rest().get("/tasks").await.unwrap();
    assert_eq!(value, json!([]));
}

#[tokio::test]
async fn test_rest_get_error_message_on_500() {
    let (url, _handle) = stub(
        "500 Internal Server Error",
        "application/json",
        r#"{"message":"X"}"#,
    )
    .await;
    let db = RestDb::new(ClientOptions::new(url));

    let err = db.rest().get("/tasks").await.unwrap_err();
    match err {
        Error::Http { message, .. } => assert_eq!(message, "X"),
        other => panic!("Expected Http error, got: {:?}", other),
    }
}

#[tokio::test]
async fn test_rest_delete_empty_body_synthesizes_count() {
    let (url, _handle) = stub("200 OK", "application/json", "").await;
    let db = RestDb::new(ClientOptions::new(url));

    let value = db.rest().delete("/tasks/1").await.unwrap();
    assert_eq!(value, json!({ "deleted": 0 }));
}

#[tokio::test]
async fn test_rpc_posts_params_and_unwraps_204() {
    let (url, handle) = stub("204 No Content", "application/json", "").await;
    let db = RestDb::new(ClientOptions::new(url));

    let resolved = db.rpc("refresh_stats", Some(json!({ "days": 7 }))).await;

    assert!(resolved.data.is_none());
    assert!(resolved.error.is_none());

    let request = handle.await.unwrap();
    assert_eq!(
        request_line(&request),
        "POST /rest/v1/rpc/refresh_stats HTTP/1.1"
    );
    assert!(request.contains(r#""days":7"#));
}

#[tokio::test]
async fn test_rpc_error_resolves_envelope() {
    let (url, _handle) = stub(
        "400 Bad Request",
        "application/json",
        r#"{"message":"unknown function"}"#,
    )
    .await;
    let db = RestDb::new(ClientOptions::new(url));

    let resolved = db.rpc("nope", None).await;
    assert_eq!(resolved.error.unwrap().message, "unknown function");
}

#[tokio::test]
async fn test_no_token_means_no_authorization_header() {
    let (url, handle) = stub("200 OK", "application/json", "[]").await;
    let db = RestDb::new(ClientOptions::new(url));

    let _ = db.from("tasks").select("*").await;

    let request = handle.await.unwrap();
    assert!(!request.to_lowercase().contains("authorization"));
}

#[tokio::test]
async fn test_token_is_read_at_execution_time() {
    let (url, handle) = stub("200 OK", "application/json", "[]").await;
    let db = RestDb::new(ClientOptions::new(url));

    // Build the chain first, store the token afterwards: the transport
    // must pick it up anyway.
    let chain = db.from("tasks").select("*");
    db.tokens().set_session("late-token", None);
    let _ = chain.await;

    let request = handle.await.unwrap();
    assert!(request.contains("authorization: Bearer late-token"));
}

#[tokio::test]
async fn test_upload_sends_multipart_without_json_content_type() {
    let (url, handle) = stub("200 OK", "application/json", r#"{"Key":"avatars/a.png"}"#).await;
    let db = RestDb::new(ClientOptions::new(url));

    let resolved = db
        .storage()
        .upload("avatars", "a.png", b"pixels".to_vec(), "image/png")
        .await;

    assert!(resolved.error.is_none());
    let object = resolved.data.unwrap();
    assert_eq!(object.path, "avatars/a.png");
    assert_eq!(object.size, 6);
    assert_eq!(
        object.checksum.as_deref(),
        Some(hex::encode(Sha256::digest(b"pixels")).as_str())
    );

    let request = handle.await.unwrap();
    assert_eq!(
        request_line(&request),
        "POST /storage/v1/object/avatars/a.png HTTP/1.1"
    );
    assert!(request.contains("multipart/form-data; boundary="));
    assert!(!request.contains("content-type: application/json"));
    assert!(request.contains("name=\"file\""));
    assert!(request.contains("filename=\"a.png\""));
}

#[tokio::test]
async fn test_download_returns_raw_bytes() {
    let (url, _handle) = stub("200 OK", "application/octet-stream", "binarydata").await;
    let db = RestDb::new(ClientOptions::new(url));

    let resolved = db.storage().download("avatars", "a.png").await;
    assert_eq!(resolved.data, Some(b"binarydata".to_vec()));
}

#[tokio::test]
async fn test_download_404_resolves_envelope() {
    let (url, _handle) = stub("404 Not Found", "application/json", r#"{"message":"gone"}"#).await;
    let db = RestDb::new(ClientOptions::new(url));

    let resolved = db.storage().download("avatars", "a.png").await;
    assert_eq!(resolved.error.unwrap().message, "gone");
}

#[tokio::test]
async fn test_remove_posts_path_batch() {
    let (url, handle) = stub("200 OK", "application/json", "[]").await;
    let db = RestDb::new(ClientOptions::new(url));

    let resolved = db.storage().remove("avatars", &["a.png", "b.png"]).await;
    assert!(resolved.error.is_none());

    let request = handle.await.unwrap();
    assert_eq!(
        request_line(&request),
        "POST /storage/v1/object/delete/avatars HTTP/1.1"
    );
    assert!(request.contains(r#""paths":["a.png","b.png"]"#));
}

#[tokio::test]
async fn test_list_buckets_deserializes() {
    let (url, handle) = stub(
        "200 OK",
        "application/json",
        r#"[{"id":"b1","name":"avatars","public":true}]"#,
    )
    .await;
    let db = RestDb::new(ClientOptions::new(url));

    let resolved = db.storage().list_buckets().await;
    let buckets = resolved.data.unwrap();
    assert_eq!(buckets.len(), 1);
    assert_eq!(buckets[0].name, "avatars");
    assert!(buckets[0].public);

    let request = handle.await.unwrap();
    assert_eq!(request_line(&request), "GET /storage/v1/bucket HTTP/1.1");
}

#[tokio::test]
async fn test_sign_in_stores_tokens() {
    let (url, handle) = stub(
        "200 OK",
        "application/json",
        r#"{"access_token":"at","refresh_token":"rt","expires_in":3600,"user":{"id":"u1","email":"a@b.c"}}"#,
    )
    .await;
    let db = RestDb::new(ClientOptions::new(url));

    let session = db.auth().sign_in("a@b.c", "pw").await.unwrap();

    assert_eq!(session.access_token, "at");
    assert_eq!(session.user.unwrap().id, "u1");
    assert_eq!(db.tokens().access_token(), Some("at".to_string()));
    assert_eq!(db.tokens().refresh_token(), Some("rt".to_string()));

    let request = handle.await.unwrap();
    assert_eq!(
        request_line(&request),
        "POST /auth/v1/token?grant_type=password HTTP/1.1"
    );
    assert!(request.contains(r#""email":"a@b.c""#));
}

#[tokio::test]
async fn test_sign_in_failure_throws_with_backend_message() {
    let (url, _handle) = stub(
        "401 Unauthorized",
        "application/json",
        r#"{"message":"Invalid login credentials"}"#,
    )
    .await;
    let db = RestDb::new(ClientOptions::new(url));

    let err = db.auth().sign_in("a@b.c", "bad").await.unwrap_err();
    assert!(err.to_string().contains("Invalid login credentials"));
    assert!(db.tokens().access_token().is_none());
}

#[tokio::test]
async fn test_sign_out_clears_tokens_even_on_error() {
    let (url, _handle) = stub("401 Unauthorized", "application/json", r#"{"message":"expired"}"#).await;
    let db = RestDb::new(ClientOptions::new(url));
    db.tokens().set_session("tok", Some("r"));

    let result = db.auth().sign_out().await;

    assert!(result.is_err());
    assert!(db.tokens().access_token().is_none());
    assert!(db.tokens().refresh_token().is_none());
}
