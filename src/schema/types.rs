//! Schema type definitions
//!
//! Supported field types:
//! - string: short UTF-8 string
//! - text: long UTF-8 string
//! - integer: 64-bit signed integer
//! - float: 64-bit floating point
//! - boolean: Boolean
//! - date: RFC 3339 timestamp string

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Field names managed by the store and never accepted from callers.
pub const RESERVED_FIELDS: [&str; 3] = ["id", "createdAt", "updatedAt"];

/// Supported field types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldType {
    /// Short UTF-8 string
    String,
    /// Long UTF-8 string
    Text,
    /// 64-bit signed integer
    Integer,
    /// 64-bit floating point
    Float,
    /// Boolean
    Boolean,
    /// RFC 3339 timestamp
    Date,
}

impl FieldType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Text => "text",
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
        }
    }
}

/// Field definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field data type
    #[serde(flatten)]
    pub field_type: FieldType,
    /// Whether field must be present and non-null
    #[serde(default)]
    pub required: bool,
}

impl FieldDef {
    pub fn new(field_type: FieldType, required: bool) -> Self {
        Self {
            field_type,
            required,
        }
    }

    /// Create a required string field
    pub fn required_string() -> Self {
        Self::new(FieldType::String, true)
    }

    /// Create an optional string field
    pub fn optional_string() -> Self {
        Self::new(FieldType::String, false)
    }

    /// Create a required text field
    pub fn required_text() -> Self {
        Self::new(FieldType::Text, true)
    }

    /// Create a required integer field
    pub fn required_integer() -> Self {
        Self::new(FieldType::Integer, true)
    }

    /// Create an optional integer field
    pub fn optional_integer() -> Self {
        Self::new(FieldType::Integer, false)
    }

    /// Create an optional float field
    pub fn optional_float() -> Self {
        Self::new(FieldType::Float, false)
    }

    /// Create an optional boolean field
    pub fn optional_boolean() -> Self {
        Self::new(FieldType::Boolean, false)
    }

    /// Create an optional date field
    pub fn optional_date() -> Self {
        Self::new(FieldType::Date, false)
    }
}

/// Schema of one collection (a model definition)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSchema {
    /// Collection name, also used as the route prefix
    pub name: String,
    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Field definitions
    pub fields: HashMap<String, FieldDef>,
}

impl CollectionSchema {
    /// Create a new collection schema
    pub fn new(name: impl Into<String>, fields: HashMap<String, FieldDef>) -> Self {
        Self {
            name: name.into(),
            description: None,
            fields,
        }
    }

    /// Builder-style field addition
    pub fn with_field(mut self, name: impl Into<String>, def: FieldDef) -> Self {
        self.fields.insert(name.into(), def);
        self
    }

    /// Look up a field definition
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.get(name)
    }

    /// Validates the schema structure itself (not a record)
    pub fn validate_structure(&self) -> Result<(), String> {
        if !is_valid_collection_name(&self.name) {
            return Err(format!("invalid collection name '{}'", self.name));
        }

        for reserved in RESERVED_FIELDS {
            if self.fields.contains_key(reserved) {
                return Err(format!("field '{}' is managed by the store", reserved));
            }
        }

        if let Some(bad) = self.fields.keys().find(|k| k.is_empty()) {
            return Err(format!("empty field name '{}'", bad));
        }

        Ok(())
    }
}

/// A one-to-many association (parent `hasMany` child, child `belongsTo` parent)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssociationDef {
    /// Parent collection name
    pub parent: String,
    /// Child collection name
    pub child: String,
    /// Integer field on the child holding the parent id
    pub foreign_key: String,
    /// Route segment used for traversal, defaults to the child name
    #[serde(default, rename = "as", skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl AssociationDef {
    pub fn new(
        parent: impl Into<String>,
        child: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self {
            parent: parent.into(),
            child: child.into(),
            foreign_key: foreign_key.into(),
            alias: None,
        }
    }

    /// Name under which the children are reachable from a parent
    pub fn name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.child)
    }
}

/// Collection names are non-empty ASCII alphanumerics and underscores.
pub fn is_valid_collection_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
