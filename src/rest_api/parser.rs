//! # Query Parameter Parser
//!
//! Parses list query strings into a predicate plus ordering and paging.
//!
//! ```text
//! GET /users?age=gt.18&status=in.(active,pending)&order=name.asc&limit=20
//! ```

use serde_json::Value;

use crate::store::{Condition, Operator, Predicate};

use super::errors::{RestError, RestResult};

/// Maximum number of records that can be returned
pub const MAX_LIMIT: usize = 1000;

/// Default limit if not specified
pub const DEFAULT_LIMIT: usize = 100;

/// Parsed query parameters
#[derive(Debug, Clone)]
pub struct QueryParams {
    /// Conditions on record fields
    pub predicate: Predicate,

    /// Order by clauses
    pub order: Vec<OrderBy>,

    /// Number of records to return
    pub limit: usize,

    /// Number of records to skip
    pub offset: usize,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            predicate: Predicate::all(),
            order: Vec::new(),
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

/// Order by clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub ascending: bool,
}

impl QueryParams {
    /// Parse query parameters in the order they appeared in the query
    /// string. A key may repeat: `age=gt.18&age=lt.30` yields two conditions.
    pub fn parse(params: &[(String, String)]) -> RestResult<Self> {
        let mut result = QueryParams::default();

        // Stable sort by key, so repeated keys keep their relative order
        let mut pairs: Vec<&(String, String)> = params.iter().collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));

        for (key, value) in pairs {
            match key.as_str() {
                "order" => {
                    result.order = parse_order(value)?;
                }
                "limit" => {
                    result.limit = parse_count("limit", value)?;
                }
                "offset" => {
                    result.offset = parse_count("offset", value)?;
                }
                field => {
                    result.predicate = result.predicate.and(parse_filter(field, value)?);
                }
            }
        }

        if result.limit > MAX_LIMIT {
            return Err(RestError::LimitExceeded(result.limit, MAX_LIMIT));
        }

        Ok(result)
    }
}

/// Parse order parameter (comma-separated field.direction)
fn parse_order(value: &str) -> RestResult<Vec<OrderBy>> {
    let mut orders = Vec::new();

    for part in value.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        let (field, ascending) = match part.rsplit_once('.') {
            Some((field, direction)) => {
                let ascending = match direction.to_lowercase().as_str() {
                    "asc" => true,
                    "desc" => false,
                    _ => {
                        return Err(RestError::InvalidQueryParam(format!(
                            "Invalid order direction: {}",
                            direction
                        )))
                    }
                };
                (field.to_string(), ascending)
            }
            None => (part.to_string(), true),
        };

        orders.push(OrderBy { field, ascending });
    }

    Ok(orders)
}

/// Parse limit / offset
fn parse_count(name: &str, value: &str) -> RestResult<usize> {
    value
        .parse()
        .map_err(|_| RestError::InvalidQueryParam(format!("Invalid {}: {}", name, value)))
}

/// Parse a filter expression from key=value, where value is `op.operand`
/// or a bare operand meaning equality.
fn parse_filter(field: &str, value: &str) -> RestResult<Condition> {
    if field.is_empty() {
        return Err(RestError::InvalidQueryParam("empty field name".to_string()));
    }

    let (operator, operand) = match value.split_once('.') {
        Some((op, rest)) => match Operator::parse(op) {
            Some(op) => (op, rest),
            None => (Operator::Eq, value),
        },
        None => (Operator::Eq, value),
    };

    let operand = parse_filter_value(operand);
    if operator == Operator::In && !operand.is_array() {
        return Err(RestError::InvalidQueryParam(format!(
            "'in' expects a list like (a,b) for '{}'",
            field
        )));
    }

    Ok(Condition::new(field, operator, operand))
}

/// Parse a filter value (handles lists for 'in' operator)
fn parse_filter_value(value: &str) -> Value {
    // List syntax: (a,b,c)
    if let Some(inner) = value.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        let items = inner
            .split(',')
            .map(|s| Value::String(s.trim().to_string()))
            .collect();
        return Value::Array(items);
    }

    match value {
        "null" => return Value::Null,
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }

    if let Ok(n) = value.parse::<i64>() {
        return Value::from(n);
    }
    if let Some(n) = value.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
        return Value::Number(n);
    }

    Value::String(value.to_string())
}
