//! Schema registry
//!
//! Holds every collection schema and the associations between them.
//! Structural checks run once when the registry is built; the store relies
//! on them afterwards.

use std::collections::HashMap;

use super::errors::{SchemaError, SchemaResult};
use super::types::{AssociationDef, CollectionSchema, FieldType};

/// Registry of collection schemas and associations
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    collections: HashMap<String, CollectionSchema>,
    /// Declaration order is preserved for listing and index rebuilds
    order: Vec<String>,
    associations: Vec<AssociationDef>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from declarations, checking every structural rule.
    pub fn build(
        collections: Vec<CollectionSchema>,
        associations: Vec<AssociationDef>,
    ) -> SchemaResult<Self> {
        let mut registry = Self::new();
        for schema in collections {
            registry.define(schema)?;
        }
        for assoc in associations {
            registry.associate(assoc)?;
        }
        Ok(registry)
    }

    /// Registers a collection schema.
    pub fn define(&mut self, schema: CollectionSchema) -> SchemaResult<()> {
        schema
            .validate_structure()
            .map_err(|reason| SchemaError::InvalidCollection {
                collection: schema.name.clone(),
                reason,
            })?;

        if self.collections.contains_key(&schema.name) {
            return Err(SchemaError::DuplicateCollection(schema.name));
        }

        self.order.push(schema.name.clone());
        self.collections.insert(schema.name.clone(), schema);
        Ok(())
    }

    /// Registers a one-to-many association.
    pub fn associate(&mut self, assoc: AssociationDef) -> SchemaResult<()> {
        let invalid = |reason: String| SchemaError::InvalidAssociation {
            parent: assoc.parent.clone(),
            child: assoc.child.clone(),
            reason,
        };

        if !self.collections.contains_key(&assoc.parent) {
            return Err(invalid(format!("unknown parent collection '{}'", assoc.parent)));
        }
        let child = self
            .collections
            .get(&assoc.child)
            .ok_or_else(|| invalid(format!("unknown child collection '{}'", assoc.child)))?;

        match child.field(&assoc.foreign_key) {
            Some(def) if def.field_type == FieldType::Integer => {}
            Some(def) => {
                return Err(invalid(format!(
                    "foreign key '{}' must be an integer field, found {}",
                    assoc.foreign_key,
                    def.field_type.type_name()
                )))
            }
            None => {
                return Err(invalid(format!(
                    "foreign key '{}' is not declared on '{}'",
                    assoc.foreign_key, assoc.child
                )))
            }
        }

        if self
            .associations
            .iter()
            .any(|a| a.parent == assoc.parent && a.name() == assoc.name())
        {
            return Err(invalid(format!(
                "'{}' already has an association named '{}'",
                assoc.parent,
                assoc.name()
            )));
        }

        self.associations.push(assoc);
        Ok(())
    }

    /// Returns a collection schema.
    pub fn get(&self, collection: &str) -> SchemaResult<&CollectionSchema> {
        self.collections
            .get(collection)
            .ok_or_else(|| SchemaError::UnknownCollection(collection.to_string()))
    }

    /// Returns whether a collection is declared.
    pub fn contains(&self, collection: &str) -> bool {
        self.collections.contains_key(collection)
    }

    /// Collections in declaration order.
    pub fn collections(&self) -> impl Iterator<Item = &CollectionSchema> {
        self.order.iter().filter_map(|name| self.collections.get(name))
    }

    /// All declared associations.
    pub fn associations(&self) -> &[AssociationDef] {
        &self.associations
    }

    /// Associations in which `child` holds the foreign key.
    pub fn parents_of<'a>(&'a self, child: &'a str) -> impl Iterator<Item = &'a AssociationDef> {
        self.associations.iter().filter(move |a| a.child == child)
    }

    /// Association reachable from `parent` under `name`.
    pub fn association(&self, parent: &str, name: &str) -> Option<&AssociationDef> {
        self.associations
            .iter()
            .find(|a| a.parent == parent && a.name() == name)
    }

    /// First association linking `parent` to `child`.
    pub fn association_between(&self, parent: &str, child: &str) -> Option<&AssociationDef> {
        self.associations
            .iter()
            .find(|a| a.parent == parent && a.child == child)
    }
}
