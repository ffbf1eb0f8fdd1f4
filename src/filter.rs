//! Query-string filter grammar shared by every table operation.
//!
//! Each filter compiles to a `(key, value)` pair where the key is
//! `<operator>.<column>` (`not.<operator>.<column>` when negated). The same
//! grammar backs the read, update and delete builders through
//! [`Filterable`]; it is implemented once, here.

use std::fmt;

use serde_json::Value;

/// Filter operators understood by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    Ilike,
    In,
    Is,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Op::Eq => "eq",
            Op::Neq => "neq",
            Op::Gt => "gt",
            Op::Gte => "gte",
            Op::Lt => "lt",
            Op::Lte => "lte",
            Op::Like => "like",
            Op::Ilike => "ilike",
            Op::In => "in",
            Op::Is => "is",
        };
        write!(f, "{}", name)
    }
}

/// Render a filter value the way the query string expects it: strings bare
/// (no JSON quotes), arrays as comma-joined member literals, everything
/// else as its JSON text.
fn literal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(literal).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}

/// Encode one filter as its query-string pair.
pub fn encode(op: Op, column: &str, value: &Value) -> (String, String) {
    (format!("{}.{}", op, column), literal(value))
}

/// Encode a negated filter (`not.<op>.<column>`).
pub fn encode_not(op: Op, column: &str, value: &Value) -> (String, String) {
    (format!("not.{}.{}", op, column), literal(value))
}

/// Accumulated filters of one builder, insertion-ordered.
///
/// The backend expects each key to be unique, so re-applying the same
/// operator and column replaces the prior value in place: the last write
/// wins.
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    entries: Vec<(String, String)>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, key: String, value: String) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, String)> {
        self.entries.iter()
    }

    /// Serialize as `key=<urlencoded value>` pairs joined with `&`.
    pub fn to_query(&self) -> String {
        self.entries
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Filter methods shared by the select, update and delete builders.
///
/// Every method moves the builder, applies one encoded filter to its
/// [`FilterSet`] and hands the builder back, so filters chain in any order.
pub trait Filterable: Sized {
    fn filters_mut(&mut self) -> &mut FilterSet;

    /// Apply an arbitrary operator. The named methods below cover the
    /// grammar; they all funnel through here.
    fn filter(mut self, op: Op, column: &str, value: impl Into<Value>) -> Self {
        let (key, encoded) = encode(op, column, &value.into());
        self.filters_mut().apply(key, encoded);
        self
    }

    fn eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(Op::Eq, column, value)
    }

    fn neq(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(Op::Neq, column, value)
    }

    fn gt(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(Op::Gt, column, value)
    }

    fn gte(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(Op::Gte, column, value)
    }

    fn lt(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(Op::Lt, column, value)
    }

    fn lte(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(Op::Lte, column, value)
    }

    /// Case-sensitive pattern match.
    fn like(self, column: &str, pattern: &str) -> Self {
        self.filter(Op::Like, column, pattern)
    }

    /// Case-insensitive pattern match.
    fn ilike(self, column: &str, pattern: &str) -> Self {
        self.filter(Op::Ilike, column, pattern)
    }

    /// Set membership; members are serialized as a comma-joined list.
    fn is_in(self, column: &str, values: Vec<Value>) -> Self {
        self.filter(Op::In, column, Value::Array(values))
    }

    /// Null test (`is.<column>=null`).
    fn is_null(self, column: &str) -> Self {
        self.filter(Op::Is, column, Value::Null)
    }

    /// Negate any operator (`not.<op>.<column>`).
    fn not(mut self, op: Op, column: &str, value: impl Into<Value>) -> Self {
        let (key, encoded) = encode_not(op, column, &value.into());
        self.filters_mut().apply(key, encoded);
        self
    }
}
