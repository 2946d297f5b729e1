//! Payload validation against a collection schema
//!
//! Validation semantics:
//! - Payload must be a JSON object
//! - No undeclared fields
//! - No system-managed fields (`id`, `createdAt`, `updatedAt`)
//! - Field types exactly match schema types (integers are accepted as floats)
//! - Required fields are present and non-null on insert
//! - Required fields cannot be set to null on update
//!
//! The validator never mutates the payload.

use chrono::DateTime;
use serde_json::{Map, Value};

use super::errors::{SchemaError, SchemaResult, ValidationDetails};
use super::types::{CollectionSchema, FieldType, RESERVED_FIELDS};

/// Which kind of write is being validated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Full record: every required field must be present
    Insert,
    /// Partial record: only supplied fields are checked
    Update,
}

/// Schema validator bound to one collection.
pub struct SchemaValidator<'a> {
    schema: &'a CollectionSchema,
}

impl<'a> SchemaValidator<'a> {
    pub fn new(schema: &'a CollectionSchema) -> Self {
        Self { schema }
    }

    /// Validates an insert payload, returning its field map.
    pub fn validate_insert<'v>(&self, payload: &'v Value) -> SchemaResult<&'v Map<String, Value>> {
        self.validate(payload, WriteMode::Insert)
    }

    /// Validates an update payload, returning its field map.
    pub fn validate_update<'v>(&self, payload: &'v Value) -> SchemaResult<&'v Map<String, Value>> {
        self.validate(payload, WriteMode::Update)
    }

    /// Validates a payload for the given write mode.
    pub fn validate<'v>(
        &self,
        payload: &'v Value,
        mode: WriteMode,
    ) -> SchemaResult<&'v Map<String, Value>> {
        let obj = payload.as_object().ok_or_else(|| SchemaError::NotAnObject {
            collection: self.schema.name.clone(),
            actual: json_type_name(payload).to_string(),
        })?;

        for key in obj.keys() {
            if RESERVED_FIELDS.contains(&key.as_str()) {
                return Err(self.fail(ValidationDetails::reserved_field(key)));
            }
            if !self.schema.fields.contains_key(key) {
                return Err(self.fail(ValidationDetails::extra_field(key)));
            }
        }

        for (name, def) in &self.schema.fields {
            match obj.get(name) {
                Some(Value::Null) => {
                    if def.required {
                        return Err(self.fail(ValidationDetails::null_value(name)));
                    }
                }
                Some(value) => self.validate_value(name, value, def.field_type)?,
                None => {
                    if def.required && mode == WriteMode::Insert {
                        return Err(self.fail(ValidationDetails::missing_field(name)));
                    }
                }
            }
        }

        Ok(obj)
    }

    /// Validates a non-null value against a field type.
    fn validate_value(&self, field: &str, value: &Value, expected: FieldType) -> SchemaResult<()> {
        let ok = match expected {
            FieldType::String | FieldType::Text => value.is_string(),
            FieldType::Integer => value.is_i64(),
            FieldType::Float => value.is_number(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Date => match value.as_str() {
                Some(s) => DateTime::parse_from_rfc3339(s).is_ok(),
                None => false,
            },
        };

        if ok {
            Ok(())
        } else {
            let actual = match (expected, value) {
                (FieldType::Date, Value::String(_)) => "non-RFC 3339 string",
                _ => json_type_name(value),
            };
            Err(self.fail(ValidationDetails::type_mismatch(
                field,
                expected.type_name(),
                actual,
            )))
        }
    }

    fn fail(&self, details: ValidationDetails) -> SchemaError {
        SchemaError::validation_failed(self.schema.name.clone(), details)
    }
}

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) => {
            if n.is_i64() {
                "integer"
            } else if n.is_u64() {
                "out-of-range integer"
            } else {
                "float"
            }
        }
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
