//! Basic example demonstrating the restdb client SDK.

use restdb::{Filterable, RestDb, SortDir};
use serde_json::json;

#[tokio::main]
async fn main() {
    // Reads RESTDB_URL, defaults to http://localhost:3000
    let db = RestDb::from_env();
    println!("Talking to {}", db.base_url());

    // Sign in; the transport picks the stored token up on later calls
    match db.auth().sign_in("alice@example.com", "password").await {
        Ok(session) => println!("Signed in as {:?}", session.user.and_then(|u| u.email)),
        Err(e) => println!("Sign-in skipped: {}", e),
    }

    // Insert a row
    let created = db
        .from("projects")
        .insert(json!({ "name": "Atlas", "status": "active" }))
        .await;
    println!("created: {:?}", created.data);

    // Chained filters, ordered, capped; nothing fires until the await
    let tasks = db
        .from("tasks")
        .select("*")
        .eq("status", "done")
        .order("due_date", SortDir::Asc)
        .limit(5)
        .await;
    match (tasks.data, tasks.error) {
        (Some(rows), _) => println!("done tasks: {}", rows),
        (_, Some(err)) => println!("query failed: {}", err),
        _ => {}
    }

    // Pagination via the Range header
    let page = db.from("tasks").select("*").range(0, 9).await;
    println!("first page: {:?}", page.data);

    // Scope an update with the same filter grammar
    let archived = db
        .from("tasks")
        .update(json!({ "status": "archived" }))
        .eq("status", "done")
        .await;
    println!("archived: {:?}", archived.data);

    // Named server procedure
    let stats = db.rpc("project_stats", Some(json!({ "days": 30 }))).await;
    println!("stats: {:?}", stats.data);

    // Storage: public URLs are built client-side
    let storage = db.storage();
    println!("logo url: {}", storage.get_public_url("assets", "logo.png"));
}
