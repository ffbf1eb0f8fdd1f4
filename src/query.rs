//! Table query builders.
//!
//! A builder accumulates filter, order and range state across chained calls
//! and fires a single HTTP request when awaited (or when `execute` is
//! called explicitly; awaiting simply calls it). Builders move `self` on
//! every call, so each chain is single-use and never aliased.
//!
//! All four families resolve to the [`ApiResponse`] envelope and never
//! error out of the future: transport and HTTP failures are caught at the
//! terminal boundary and folded into the envelope.

use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::Arc;

use reqwest::Method;
use serde_json::Value;
use tracing::warn;

use crate::error::{ApiError, ApiResponse};
use crate::filter::{FilterSet, Filterable};
use crate::transport::{Body, Transport};

/// Sort direction for `order`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

impl SortDir {
    fn as_str(self) -> &'static str {
        match self {
            SortDir::Asc => "asc",
            SortDir::Desc => "desc",
        }
    }
}

/// Handle for one table, as returned by [`crate::RestDb::from`].
pub struct Table {
    transport: Arc<Transport>,
    name: String,
}

impl Table {
    pub(crate) fn new(transport: Arc<Transport>, name: &str) -> Self {
        Self {
            transport,
            name: name.to_string(),
        }
    }

    /// Start a read query over the given columns (`"*"` for all).
    pub fn select(self, columns: &str) -> SelectBuilder {
        SelectBuilder {
            transport: self.transport,
            state: QueryState::new(self.name, columns),
        }
    }

    /// Insert a row object or an array of row objects.
    pub fn insert(self, rows: Value) -> InsertBuilder {
        InsertBuilder {
            transport: self.transport,
            table: self.name,
            rows,
            columns: None,
        }
    }

    /// Update rows matching the filters chained onto the returned builder.
    pub fn update(self, patch: Value) -> UpdateBuilder {
        UpdateBuilder {
            transport: self.transport,
            table: self.name,
            patch,
            filters: FilterSet::new(),
        }
    }

    /// Delete rows matching the filters chained onto the returned builder.
    pub fn delete(self) -> DeleteBuilder {
        DeleteBuilder {
            transport: self.transport,
            table: self.name,
            filters: FilterSet::new(),
        }
    }
}

/// Accumulated state of one read query, consumed exactly once on execution.
#[derive(Debug, Clone)]
struct QueryState {
    table: String,
    columns: String,
    filters: FilterSet,
    order: Option<(String, SortDir)>,
    limit: Option<usize>,
    range: Option<(usize, usize)>,
}

impl QueryState {
    fn new(table: String, columns: &str) -> Self {
        Self {
            table,
            columns: columns.to_string(),
            filters: FilterSet::new(),
            order: None,
            limit: None,
            range: None,
        }
    }

    /// Compile the read-path query string: `select`, the filters in
    /// application order, then the optional order and limit. Ranges travel
    /// as headers, never as query parameters.
    fn query_string(&self) -> String {
        let mut parts = vec![format!("select={}", self.columns)];
        for (key, value) in self.filters.iter() {
            parts.push(format!("{}={}", key, urlencoding::encode(value)));
        }
        if let Some((column, dir)) = &self.order {
            parts.push(format!("order={}.{}", column, dir.as_str()));
        }
        if let Some(limit) = self.limit {
            parts.push(format!("limit={}", limit));
        }
        parts.join("&")
    }

    fn path(&self) -> String {
        format!("/rest/v1/{}?{}", self.table, self.query_string())
    }
}

/// Write-path endpoint: the bare filter set appended to the table path, no
/// `select` parameter.
fn write_path(table: &str, filters: &FilterSet) -> String {
    if filters.is_empty() {
        format!("/rest/v1/{}", table)
    } else {
        format!("/rest/v1/{}?{}", table, filters.to_query())
    }
}

fn rows_or_empty(payload: Option<Value>) -> Value {
    payload.unwrap_or_else(|| Value::Array(Vec::new()))
}

async fn run_read(transport: Arc<Transport>, state: QueryState) -> ApiResponse {
    let mut headers = Vec::new();
    if let Some((from, to)) = state.range {
        headers.push(("Range", format!("{}-{}", from, to)));
        headers.push(("Prefer", "count=exact".to_string()));
    }

    match transport
        .send(Method::GET, &state.path(), None, &headers)
        .await
    {
        Ok(payload) => ApiResponse::success(rows_or_empty(payload)),
        Err(e) => {
            warn!(table = %state.table, op = "select", error = %e, "table query failed");
            ApiResponse::failure(ApiError::from(e))
        }
    }
}

async fn run_single(transport: Arc<Transport>, mut state: QueryState) -> ApiResponse {
    // The query goes out unranged and unlimited; the row is taken
    // client-side.
    state.limit = None;
    state.range = None;

    match run_read(transport, state).await {
        ApiResponse {
            data: Some(Value::Array(mut rows)),
            error: None,
        } => {
            if rows.is_empty() {
                ApiResponse::empty()
            } else {
                ApiResponse::success(rows.remove(0))
            }
        }
        other => other,
    }
}

type EnvelopeFuture = Pin<Box<dyn Future<Output = ApiResponse> + Send>>;

/// Read builder in its filtering stage.
pub struct SelectBuilder {
    transport: Arc<Transport>,
    state: QueryState,
}

impl Filterable for SelectBuilder {
    fn filters_mut(&mut self) -> &mut FilterSet {
        &mut self.state.filters
    }
}

impl SelectBuilder {
    /// Order the result set. Returns the post-order builder; ordering can
    /// only be applied once per chain.
    pub fn order(mut self, column: &str, dir: SortDir) -> OrderedSelectBuilder {
        self.state.order = Some((column.to_string(), dir));
        OrderedSelectBuilder {
            transport: self.transport,
            state: self.state,
        }
    }

    /// Cap the number of returned rows. Clears any range: `limit` and
    /// `range` are mutually exclusive and the last call wins.
    pub fn limit(mut self, n: usize) -> Self {
        self.state.limit = Some(n);
        self.state.range = None;
        self
    }

    /// Request rows `from..=to` via the `Range` header together with
    /// `Prefer: count=exact`. Clears any limit (last call wins).
    pub fn range(mut self, from: usize, to: usize) -> Self {
        self.state.range = Some((from, to));
        self.state.limit = None;
        self
    }

    /// Fetch the first matching row, or resolve `data` to null when nothing
    /// matches. The backend is never asked to cap to one row.
    pub async fn single(self) -> ApiResponse {
        run_single(self.transport, self.state).await
    }

    /// Compiled query string, exposed for inspection.
    pub fn query_string(&self) -> String {
        self.state.query_string()
    }

    /// Execute the accumulated query. Awaiting the builder directly is
    /// equivalent.
    pub async fn execute(self) -> ApiResponse {
        run_read(self.transport, self.state).await
    }
}

impl IntoFuture for SelectBuilder {
    type Output = ApiResponse;
    type IntoFuture = EnvelopeFuture;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.execute())
    }
}

/// Read builder after `order` has been applied: the same filter methods and
/// terminals, but no second `order`.
pub struct OrderedSelectBuilder {
    transport: Arc<Transport>,
    state: QueryState,
}

impl Filterable for OrderedSelectBuilder {
    fn filters_mut(&mut self) -> &mut FilterSet {
        &mut self.state.filters
    }
}

impl OrderedSelectBuilder {
    /// Cap the number of returned rows. Clears any range (last call wins).
    pub fn limit(mut self, n: usize) -> Self {
        self.state.limit = Some(n);
        self.state.range = None;
        self
    }

    /// Request rows `from..=to` via the `Range` header together with
    /// `Prefer: count=exact`. Clears any limit (last call wins).
    pub fn range(mut self, from: usize, to: usize) -> Self {
        self.state.range = Some((from, to));
        self.state.limit = None;
        self
    }

    /// Fetch the first matching row, or resolve `data` to null when nothing
    /// matches.
    pub async fn single(self) -> ApiResponse {
        run_single(self.transport, self.state).await
    }

    /// Compiled query string, exposed for inspection.
    pub fn query_string(&self) -> String {
        self.state.query_string()
    }

    /// Execute the accumulated query. Awaiting the builder directly is
    /// equivalent.
    pub async fn execute(self) -> ApiResponse {
        run_read(self.transport, self.state).await
    }
}

impl IntoFuture for OrderedSelectBuilder {
    type Output = ApiResponse;
    type IntoFuture = EnvelopeFuture;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.execute())
    }
}

/// Insert builder. There is no filter stage: rows are captured up front and
/// the request fires on `select` or on await.
pub struct InsertBuilder {
    transport: Arc<Transport>,
    table: String,
    rows: Value,
    columns: Option<String>,
}

impl InsertBuilder {
    /// Fire the insert and ask the backend to return the given columns of
    /// the created rows.
    pub async fn select(mut self, columns: &str) -> ApiResponse {
        self.columns = Some(columns.to_string());
        self.execute().await
    }

    /// Fire the insert. Awaiting the builder directly is equivalent.
    pub async fn execute(self) -> ApiResponse {
        let InsertBuilder {
            transport,
            table,
            rows,
            columns,
        } = self;

        let path = match columns {
            Some(columns) => format!("/rest/v1/{}?select={}", table, columns),
            None => format!("/rest/v1/{}", table),
        };

        match transport
            .send(Method::POST, &path, Some(Body::Json(rows)), &[])
            .await
        {
            Ok(payload) => ApiResponse::success(rows_or_empty(payload)),
            Err(e) => {
                warn!(table = %table, op = "insert", error = %e, "insert failed");
                ApiResponse::failure(ApiError::from(e))
            }
        }
    }
}

impl IntoFuture for InsertBuilder {
    type Output = ApiResponse;
    type IntoFuture = EnvelopeFuture;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.execute())
    }
}

/// Update builder: the patch payload is captured up front, the filter
/// grammar scopes which rows are affected.
pub struct UpdateBuilder {
    transport: Arc<Transport>,
    table: String,
    patch: Value,
    filters: FilterSet,
}

impl Filterable for UpdateBuilder {
    fn filters_mut(&mut self) -> &mut FilterSet {
        &mut self.filters
    }
}

impl UpdateBuilder {
    /// Compiled write-path query string, exposed for inspection.
    pub fn query_string(&self) -> String {
        self.filters.to_query()
    }

    /// Fire the update. Awaiting the builder directly is equivalent.
    pub async fn execute(self) -> ApiResponse {
        let UpdateBuilder {
            transport,
            table,
            patch,
            filters,
        } = self;

        let path = write_path(&table, &filters);
        match transport
            .send(Method::PATCH, &path, Some(Body::Json(patch)), &[])
            .await
        {
            Ok(payload) => ApiResponse::success(rows_or_empty(payload)),
            Err(e) => {
                warn!(table = %table, op = "update", error = %e, "update failed");
                ApiResponse::failure(ApiError::from(e))
            }
        }
    }
}

impl IntoFuture for UpdateBuilder {
    type Output = ApiResponse;
    type IntoFuture = EnvelopeFuture;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.execute())
    }
}

/// Delete builder: the filter grammar scopes which rows are removed.
pub struct DeleteBuilder {
    transport: Arc<Transport>,
    table: String,
    filters: FilterSet,
}

impl Filterable for DeleteBuilder {
    fn filters_mut(&mut self) -> &mut FilterSet {
        &mut self.filters
    }
}

impl DeleteBuilder {
    /// Compiled write-path query string, exposed for inspection.
    pub fn query_string(&self) -> String {
        self.filters.to_query()
    }

    /// Fire the delete. Awaiting the builder directly is equivalent.
    pub async fn execute(self) -> ApiResponse {
        let DeleteBuilder {
            transport,
            table,
            filters,
        } = self;

        let path = write_path(&table, &filters);
        match transport.send(Method::DELETE, &path, None, &[]).await {
            Ok(payload) => ApiResponse::success(rows_or_empty(payload)),
            Err(e) => {
                warn!(table = %table, op = "delete", error = %e, "delete failed");
                ApiResponse::failure(ApiError::from(e))
            }
        }
    }
}

impl IntoFuture for DeleteBuilder {
    type Output = ApiResponse;
    type IntoFuture = EnvelopeFuture;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.execute())
    }
}
