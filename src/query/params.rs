use serde::Serialize;
use serde_json::{json, Value};

use super::ast::{self, CompareOp, Condition, DocQuery, SortKey};
use super::QueryError;
use crate::config;

/// Keys that steer projection/ordering/paging instead of filtering.
const RESERVED_KEYS: &[&str] = &["select", "sort", "page", "limit"];

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct PageRef {
    pub page: u64,
    pub limit: u64,
}

/// Pagination descriptor returned alongside listing results.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<PageRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: u64,
    pub limit: u64,
}

impl PageWindow {
    pub fn skip(&self) -> u64 {
        (self.page - 1) * self.limit
    }

    /// Compute the pagination descriptor once the total matching count is known:
    /// a next page exists iff `page * limit < total`, a previous iff `page > 1`.
    pub fn describe(&self, total: u64) -> Pagination {
        let mut pagination = Pagination::default();
        if self.page * self.limit < total {
            pagination.next = Some(PageRef { page: self.page + 1, limit: self.limit });
        }
        if self.page > 1 {
            pagination.prev = Some(PageRef { page: self.page - 1, limit: self.limit });
        }
        pagination
    }
}

/// Parsed listing request: store query plus pagination window.
#[derive(Debug, Clone)]
pub struct ListParams {
    pub query: DocQuery,
    pub page: PageWindow,
}

/// Build a validated store query from an untrusted request query string.
///
/// Every non-reserved key becomes a typed condition; `field[token]` keys with a
/// recognized token (`gt`, `gte`, `lt`, `lte`, `in`) become comparisons and any
/// other token stays an equality on the base field. This is purely structural
/// rewriting over the parameter map - user input is never evaluated.
pub fn parse(raw_query: &str) -> Result<ListParams, QueryError> {
    let mut conditions: Vec<Condition> = Vec::new();
    let mut select: Option<String> = None;
    let mut sort: Option<String> = None;
    let mut page_raw: Option<String> = None;
    let mut limit_raw: Option<String> = None;

    for (key, value) in url::form_urlencoded::parse(raw_query.as_bytes()) {
        let key = key.into_owned();
        let value = value.into_owned();
        match key.as_str() {
            "select" => select = Some(value),
            "sort" => sort = Some(value),
            "page" => page_raw = Some(value),
            "limit" => limit_raw = Some(value),
            _ => push_condition(&mut conditions, &key, value)?,
        }
    }

    let projection = match select {
        Some(fields) => Some(parse_select(&fields)?),
        None => None,
    };

    let sort = match sort {
        Some(spec) => parse_sort(&spec)?,
        None => ast::default_sort(),
    };

    let cfg = &config::config().query;
    let page = coerce_positive(page_raw.as_deref()).unwrap_or(1);
    let mut limit = coerce_positive(limit_raw.as_deref()).unwrap_or(cfg.default_limit);
    if limit > cfg.max_limit {
        tracing::warn!("limit {} exceeds max {}, capping to max", limit, cfg.max_limit);
        limit = cfg.max_limit;
    }
    let window = PageWindow { page, limit };

    Ok(ListParams {
        query: DocQuery {
            conditions,
            projection,
            sort,
            skip: window.skip(),
            limit: Some(window.limit),
        },
        page: window,
    })
}

fn push_condition(
    conditions: &mut Vec<Condition>,
    key: &str,
    value: String,
) -> Result<(), QueryError> {
    let (field, op) = split_operator(key);
    if RESERVED_KEYS.contains(&field) {
        // e.g. select[gt]=x is nonsense; refuse rather than filter on a reserved name
        return Err(QueryError::InvalidField(key.to_string()));
    }
    if !ast::is_valid_field(field) {
        return Err(QueryError::InvalidField(key.to_string()));
    }

    let value = match op {
        CompareOp::In => Value::Array(value.split(',').map(coerce_scalar).collect()),
        _ => coerce_scalar(&value),
    };

    // A repeated plain key (?tags=a&tags=b) collapses into membership.
    if op == CompareOp::Eq {
        if let Some(existing) = conditions
            .iter_mut()
            .find(|c| c.field == field && matches!(c.op, CompareOp::Eq | CompareOp::In))
        {
            let mut values = match existing.value.take() {
                Value::Array(vs) => vs,
                single => vec![single],
            };
            values.push(value);
            existing.op = CompareOp::In;
            existing.value = Value::Array(values);
            return Ok(());
        }
    }

    conditions.push(Condition { field: field.to_string(), op, value });
    Ok(())
}

/// Split `field[token]` into the base field and its operator. Unrecognized
/// tokens fall back to equality on the base field.
fn split_operator(key: &str) -> (&str, CompareOp) {
    if let Some(open) = key.find('[') {
        if let Some(stripped) = key[open + 1..].strip_suffix(']') {
            let field = &key[..open];
            let op = CompareOp::from_token(stripped).unwrap_or(CompareOp::Eq);
            return (field, op);
        }
    }
    (key, CompareOp::Eq)
}

fn parse_select(fields: &str) -> Result<Vec<String>, QueryError> {
    let mut out = Vec::new();
    for field in fields.split(',') {
        let field = field.trim();
        if field.is_empty() {
            continue;
        }
        if !ast::is_valid_field(field) {
            return Err(QueryError::InvalidField(field.to_string()));
        }
        out.push(field.to_string());
    }
    Ok(out)
}

fn parse_sort(spec: &str) -> Result<Vec<SortKey>, QueryError> {
    let mut out = Vec::new();
    for part in spec.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (field, descending) = match part.strip_prefix('-') {
            Some(rest) => (rest, true),
            None => (part, false),
        };
        if !ast::is_valid_field(field) {
            return Err(QueryError::InvalidSort(part.to_string()));
        }
        out.push(SortKey { field: field.to_string(), descending });
    }
    Ok(out)
}

/// Coerce page/limit strings: non-numeric or zero falls back to the default.
fn coerce_positive(raw: Option<&str>) -> Option<u64> {
    raw.and_then(|s| s.trim().parse::<u64>().ok()).filter(|n| *n >= 1)
}

/// Best-effort scalar typing so comparisons line up with stored values.
fn coerce_scalar(raw: &str) -> Value {
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => {
            if let Ok(n) = raw.parse::<i64>() {
                json!(n)
            } else if let Ok(f) = raw.parse::<f64>() {
                json!(f)
            } else {
                Value::String(raw.to_string())
            }
        }
    }
}
