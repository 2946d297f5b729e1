//! Record predicates
//!
//! A predicate is a list of field conditions combined with AND. An empty
//! predicate matches every record.

use std::cmp::Ordering;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::record::Record;
use crate::schema::{CollectionSchema, FieldType};

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    /// Equals
    Eq,
    /// Not equals
    Neq,
    /// Greater than
    Gt,
    /// Greater than or equal
    Gte,
    /// Less than
    Lt,
    /// Less than or equal
    Lte,
    /// Pattern match (`%` any sequence, `_` one character)
    Like,
    /// Value in list
    In,
    /// Is null / is not null
    Is,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Neq => "neq",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::Like => "like",
            Operator::In => "in",
            Operator::Is => "is",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let op = match s {
            "eq" => Operator::Eq,
            "neq" => Operator::Neq,
            "gt" => Operator::Gt,
            "gte" => Operator::Gte,
            "lt" => Operator::Lt,
            "lte" => Operator::Lte,
            "like" => Operator::Like,
            "in" => Operator::In,
            "is" => Operator::Is,
            _ => return None,
        };
        Some(op)
    }
}

/// A single field condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    pub value: Value,
    /// Declared type of the field, known once conformed to a schema
    #[serde(skip)]
    field_type: Option<FieldType>,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: Operator, value: Value) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
            field_type: None,
        }
    }

    /// Checks one record against this condition.
    pub fn matches(&self, record: &Record) -> bool {
        let field_value = match record.get(&self.field) {
            Some(v) => v,
            None => Value::Null,
        };

        let ordering = |other: &Value| match self.field_type {
            Some(field_type) => compare_typed(field_type, &field_value, other),
            None => compare(&field_value, other),
        };
        let equal = |other: &Value| match self.field_type {
            Some(FieldType::Date) if !field_value.is_null() && !other.is_null() => {
                ordering(other) == Some(Ordering::Equal)
            }
            _ => values_equal(&field_value, other),
        };

        match self.operator {
            Operator::Eq => equal(&self.value),
            Operator::Neq => !equal(&self.value),
            Operator::Gt => ordering(&self.value) == Some(Ordering::Greater),
            Operator::Gte => matches!(
                ordering(&self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Operator::Lt => ordering(&self.value) == Some(Ordering::Less),
            Operator::Lte => matches!(
                ordering(&self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Operator::Like => match (field_value.as_str(), self.value.as_str()) {
                (Some(s), Some(pattern)) => like(s, pattern),
                _ => false,
            },
            Operator::In => match self.value.as_array() {
                Some(items) => items.iter().any(equal),
                None => false,
            },
            Operator::Is => {
                if self.value.is_null() {
                    field_value.is_null()
                } else {
                    !field_value.is_null()
                }
            }
        }
    }

    /// Rewrites the comparison value so it has the JSON type the field stores.
    ///
    /// Query strings carry no type information: `"42"` arrives as a number
    /// and `(1,2)` as a list of strings. Timestamps are parsed and rewritten
    /// in canonical UTC form.
    fn conform(&mut self, field_type: FieldType) -> Result<(), String> {
        let field = &self.field;
        let convert = |v: &Value| {
            conform_value(v, field_type).ok_or_else(|| {
                format!(
                    "'{}' expects {} values, got {}",
                    field,
                    field_type.type_name(),
                    v
                )
            })
        };
        let value = match &self.value {
            Value::Array(items) => {
                Value::Array(items.iter().map(convert).collect::<Result<Vec<_>, _>>()?)
            }
            other => convert(other)?,
        };
        self.value = value;
        self.field_type = Some(field_type);
        Ok(())
    }
}

/// Converts a query value to the field's JSON type. `None` when a timestamp
/// does not parse.
fn conform_value(value: &Value, field_type: FieldType) -> Option<Value> {
    let converted = match (field_type, value) {
        (_, Value::Null) => Value::Null,
        (FieldType::Date, other) => Value::String(canonical_timestamp(&parse_instant(other)?)),
        (FieldType::String | FieldType::Text, Value::Number(n)) => Value::String(n.to_string()),
        (FieldType::String | FieldType::Text, Value::Bool(b)) => Value::String(b.to_string()),
        (FieldType::Integer | FieldType::Float, Value::String(s)) => {
            if let Ok(n) = s.parse::<i64>() {
                Value::from(n)
            } else if let Some(n) = s.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
                Value::Number(n)
            } else {
                value.clone()
            }
        }
        (FieldType::Boolean, Value::String(s)) => match s.as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => value.clone(),
        },
        _ => value.clone(),
    };
    Some(converted)
}

/// Timestamp text as records serialize it: RFC 3339 in UTC with a `Z` suffix.
pub fn canonical_timestamp(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_instant(value: &Value) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.as_str()?)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Type of a field as seen by predicates and ordering, system fields included.
pub fn field_type_of(schema: &CollectionSchema, field: &str) -> Option<FieldType> {
    match field {
        "id" => Some(FieldType::Integer),
        "createdAt" | "updatedAt" => Some(FieldType::Date),
        name => schema.field(name).map(|def| def.field_type),
    }
}

/// Conditions combined with AND
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub conditions: Vec<Condition>,
}

impl Predicate {
    /// Matches every record
    pub fn all() -> Self {
        Self::default()
    }

    /// Matches the record with the given id
    pub fn by_id(id: u64) -> Self {
        Self::eq("id", Value::from(id))
    }

    /// Single equality condition
    pub fn eq(field: impl Into<String>, value: Value) -> Self {
        Self::all().and(Condition::new(field, Operator::Eq, value))
    }

    /// Adds a condition
    pub fn and(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Adds a condition built from its parts
    pub fn and_where(self, field: impl Into<String>, operator: Operator, value: Value) -> Self {
        self.and(Condition::new(field, operator, value))
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Checks a record against every condition
    pub fn matches(&self, record: &Record) -> bool {
        self.conditions.iter().all(|c| c.matches(record))
    }

    /// When the predicate pins an exact id, returns it.
    pub fn pinned_id(&self) -> Option<u64> {
        self.conditions
            .iter()
            .find(|c| c.field == "id" && c.operator == Operator::Eq)
            .and_then(|c| c.value.as_u64())
    }

    /// Checks every condition names a known field and aligns value types with
    /// the schema. Returns the reason for the first rejected condition.
    pub fn conform(&mut self, schema: &CollectionSchema) -> Result<(), String> {
        for condition in &mut self.conditions {
            let field_type = field_type_of(schema, &condition.field)
                .ok_or_else(|| format!("unknown field '{}'", condition.field))?;
            condition.conform(field_type)?;
        }
        Ok(())
    }
}

/// Equality that treats `1` and `1.0` as the same number.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => x.as_f64() == y.as_f64(),
        },
        _ => a == b,
    }
}

/// Orders two values of a declared field. Timestamps compare as instants.
pub fn compare_typed(field_type: FieldType, a: &Value, b: &Value) -> Option<Ordering> {
    match field_type {
        FieldType::Date => Some(parse_instant(a)?.cmp(&parse_instant(b)?)),
        _ => compare(a, b),
    }
}

/// Orders two scalars of the same kind. Mixed kinds are incomparable.
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => x.as_f64()?.partial_cmp(&y.as_f64()?),
        },
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// SQL LIKE matching over characters.
///
/// Only the most recent `%` is kept as a backtrack point, so the work is
/// bounded by `value.len() * pattern.len()`.
fn like(value: &str, pattern: &str) -> bool {
    let value: Vec<char> = value.chars().collect();
    let mut pattern_chars: Vec<char> = Vec::with_capacity(pattern.len());
    for c in pattern.chars() {
        if c == '%' && pattern_chars.last() == Some(&'%') {
            continue;
        }
        pattern_chars.push(c);
    }
    let pattern = pattern_chars;

    let (mut v, mut p) = (0, 0);
    // (pattern index just after the last `%`, value index it currently absorbs up to)
    let mut backtrack: Option<(usize, usize)> = None;

    while v < value.len() {
        match pattern.get(p) {
            Some('%') => {
                p += 1;
                backtrack = Some((p, v));
            }
            Some('_') => {
                p += 1;
                v += 1;
            }
            Some(c) if *c == value[v] => {
                p += 1;
                v += 1;
            }
            _ => match backtrack {
                Some((resume, absorbed)) => {
                    p = resume;
                    v = absorbed + 1;
                    backtrack = Some((resume, absorbed + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|c| *c == '%')
}
