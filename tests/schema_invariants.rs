//! Schema Invariant Tests
//!
//! Validation rules for record payloads:
//! - Validation is deterministic
//! - Required fields must be present on insert and never null
//! - No undeclared or store-managed fields
//! - Type matching is exact (integers are accepted as floats)

use std::collections::HashMap;

use relstore::schema::{
    AssociationDef, CollectionSchema, FieldDef, SchemaError, SchemaRegistry, SchemaValidator,
};
use serde_json::json;

// =============================================================================
// Helper Functions
// =============================================================================

fn users_schema() -> CollectionSchema {
    CollectionSchema::new("users", HashMap::new())
        .with_field("name", FieldDef::required_string())
        .with_field("age", FieldDef::optional_integer())
        .with_field("score", FieldDef::optional_float())
        .with_field("active", FieldDef::optional_boolean())
        .with_field("born", FieldDef::optional_date())
}

fn assert_fails_on<T: std::fmt::Debug>(result: Result<T, SchemaError>, field: &str) {
    let err = result.expect_err("payload should be rejected");
    let details = err.details().expect("validation details");
    assert_eq!(details.field, field);
}

// =============================================================================
// Validation Determinism Tests
// =============================================================================

/// Same payload validates the same way every time.
#[test]
fn test_validation_is_deterministic() {
    let schema = users_schema();
    let validator = SchemaValidator::new(&schema);

    let good = json!({"name": "Alice", "age": 30});
    let bad = json!({"age": 30});

    for _ in 0..100 {
        assert!(validator.validate_insert(&good).is_ok());
        assert!(validator.validate_insert(&bad).is_err());
    }
}

// =============================================================================
// Required Field Tests
// =============================================================================

#[test]
fn test_missing_required_field_on_insert() {
    let schema = users_schema();
    let validator = SchemaValidator::new(&schema);
    assert_fails_on(validator.validate_insert(&json!({"age": 1})), "name");
}

#[test]
fn test_partial_update_skips_required_check() {
    let schema = users_schema();
    let validator = SchemaValidator::new(&schema);
    assert!(validator.validate_update(&json!({"age": 2})).is_ok());
}

#[test]
fn test_required_field_cannot_be_nulled() {
    let schema = users_schema();
    let validator = SchemaValidator::new(&schema);
    assert_fails_on(validator.validate_update(&json!({"name": null})), "name");
}

#[test]
fn test_optional_field_accepts_null() {
    let schema = users_schema();
    let validator = SchemaValidator::new(&schema);
    assert!(validator
        .validate_insert(&json!({"name": "A", "age": null}))
        .is_ok());
}

// =============================================================================
// Field Set Tests
// =============================================================================

#[test]
fn test_undeclared_field_rejected() {
    let schema = users_schema();
    let validator = SchemaValidator::new(&schema);
    assert_fails_on(
        validator.validate_insert(&json!({"name": "A", "nickname": "a"})),
        "nickname",
    );
}

#[test]
fn test_store_managed_fields_rejected() {
    let schema = users_schema();
    let validator = SchemaValidator::new(&schema);
    for field in ["id", "createdAt", "updatedAt"] {
        let mut payload = json!({"name": "A"});
        payload[field] = json!(1);
        assert_fails_on(validator.validate_insert(&payload), field);
    }
}

#[test]
fn test_non_object_payload() {
    let schema = users_schema();
    let validator = SchemaValidator::new(&schema);
    let err = validator.validate_insert(&json!(["A"])).unwrap_err();
    assert!(matches!(err, SchemaError::NotAnObject { .. }));
}

// =============================================================================
// Type Matching Tests
// =============================================================================

#[test]
fn test_type_mismatches() {
    let schema = users_schema();
    let validator = SchemaValidator::new(&schema);

    assert_fails_on(validator.validate_insert(&json!({"name": 5})), "name");
    assert_fails_on(
        validator.validate_insert(&json!({"name": "A", "age": 1.5})),
        "age",
    );
    assert_fails_on(
        validator.validate_insert(&json!({"name": "A", "age": "1"})),
        "age",
    );
    assert_fails_on(
        validator.validate_insert(&json!({"name": "A", "active": "yes"})),
        "active",
    );
    assert_fails_on(
        validator.validate_insert(&json!({"name": "A", "born": "yesterday"})),
        "born",
    );
}

#[test]
fn test_integer_accepted_as_float() {
    let schema = users_schema();
    let validator = SchemaValidator::new(&schema);
    assert!(validator
        .validate_insert(&json!({"name": "A", "score": 3}))
        .is_ok());
}

#[test]
fn test_rfc3339_date_accepted() {
    let schema = users_schema();
    let validator = SchemaValidator::new(&schema);
    assert!(validator
        .validate_insert(&json!({"name": "A", "born": "1990-04-01T00:00:00Z"}))
        .is_ok());
}

// =============================================================================
// Registry Tests
// =============================================================================

#[test]
fn test_association_requires_integer_foreign_key() {
    let posts = CollectionSchema::new("posts", HashMap::new())
        .with_field("userId", FieldDef::optional_string());

    let result = SchemaRegistry::build(
        vec![users_schema(), posts],
        vec![AssociationDef::new("users", "posts", "userId")],
    );
    assert!(matches!(
        result,
        Err(SchemaError::InvalidAssociation { .. })
    ));
}

#[test]
fn test_duplicate_collection_rejected() {
    let result = SchemaRegistry::build(vec![users_schema(), users_schema()], vec![]);
    assert!(matches!(result, Err(SchemaError::DuplicateCollection(name)) if name == "users"));
}

#[test]
fn test_schema_from_json_declaration() {
    let schema: CollectionSchema = serde_json::from_value(json!({
        "name": "posts",
        "fields": {
            "title": {"type": "string", "required": true},
            "body": {"type": "text"},
            "userId": {"type": "integer"}
        }
    }))
    .unwrap();

    assert!(schema.field("title").unwrap().required);
    assert!(!schema.field("body").unwrap().required);
}
