use serde_json::Value;

/// Comparison operators a request may express. Anything else is equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
}

impl CompareOp {
    /// Map a recognized suffix token (`?published_date[gte]=...`) to its operator.
    pub fn from_token(token: &str) -> Option<CompareOp> {
        match token {
            "gt" => Some(CompareOp::Gt),
            "gte" => Some(CompareOp::Gte),
            "lt" => Some(CompareOp::Lt),
            "lte" => Some(CompareOp::Lte),
            "in" => Some(CompareOp::In),
            _ => None,
        }
    }
}

/// One predicate against a document field. Conditions are combined with AND.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub op: CompareOp,
    pub value: Value,
}

impl Condition {
    pub fn eq(field: impl Into<String>, value: Value) -> Self {
        Self { field: field.into(), op: CompareOp::Eq, value }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self { field: field.into(), descending: false }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self { field: field.into(), descending: true }
    }
}

/// A fully-built store query: filter conditions, projection, ordering and
/// pagination window. Built by `params::parse`, executed by a `Collection`.
#[derive(Debug, Clone, Default)]
pub struct DocQuery {
    pub conditions: Vec<Condition>,
    /// Restrict returned fields; id is always included.
    pub projection: Option<Vec<String>>,
    pub sort: Vec<SortKey>,
    pub skip: u64,
    pub limit: Option<u64>,
}

/// Default listing order: pinned articles float to the top, then newest first.
pub fn default_sort() -> Vec<SortKey> {
    vec![SortKey::desc("pinned"), SortKey::desc("published_date")]
}

/// Field names are interpolated into store queries, so keep them strict.
pub fn is_valid_field(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    name.chars().all(|c| c.is_alphanumeric() || c == '_')
}
