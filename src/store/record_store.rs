//! Record store
//!
//! Owns every collection and the association index behind one lock, so each
//! operation sees and changes a consistent state. A fetch followed by a
//! separate mutation is not atomic; use the predicate-scoped `update` and
//! `destroy` for compare-and-change.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::schema::{AssociationDef, CollectionSchema, SchemaRegistry, SchemaValidator};

use super::association::AssociationIndex;
use super::errors::{StoreError, StoreResult};
use super::predicate::Predicate;
use super::record::Record;
use super::snapshot::{CollectionData, SnapshotData, SnapshotFile};

/// Records of one collection, ordered by id (which is insertion order)
#[derive(Debug, Clone)]
struct Collection {
    records: BTreeMap<u64, Record>,
    next_id: u64,
}

impl Collection {
    fn new() -> Self {
        Self {
            records: BTreeMap::new(),
            next_id: 1,
        }
    }

    fn matching<'a>(&'a self, predicate: &'a Predicate) -> impl Iterator<Item = &'a Record> {
        let pinned = predicate.pinned_id();
        self.records
            .values()
            .filter(move |r| pinned.map_or(true, |id| r.id == id))
            .filter(move |r| predicate.matches(r))
    }

    fn matching_ids(&self, predicate: &Predicate) -> Vec<u64> {
        self.matching(predicate).map(|r| r.id).collect()
    }
}

#[derive(Debug)]
struct StoreState {
    registry: SchemaRegistry,
    collections: HashMap<String, Collection>,
    index: AssociationIndex,
}

impl StoreState {
    fn collection(&self, name: &str) -> StoreResult<&Collection> {
        self.collections
            .get(name)
            .ok_or_else(|| StoreError::CollectionNotFound(name.to_string()))
    }

    /// Validates the predicate against the collection schema and returns a
    /// copy with values coerced to field types.
    fn conform(&self, collection: &str, predicate: Option<&Predicate>) -> StoreResult<Predicate> {
        let schema = self.registry.get(collection)?;
        let mut predicate = predicate.cloned().unwrap_or_default();
        predicate
            .conform(schema)
            .map_err(|reason| StoreError::InvalidPredicate {
                collection: collection.to_string(),
                reason,
            })?;
        Ok(predicate)
    }

    /// Every non-null foreign key in `fields` must point at an existing parent.
    fn check_references(&self, child: &str, fields: &Map<String, Value>) -> StoreResult<()> {
        for assoc in self.registry.parents_of(child) {
            let value = match fields.get(&assoc.foreign_key) {
                None | Some(Value::Null) => continue,
                Some(v) => v,
            };
            let exists = value
                .as_u64()
                .and_then(|id| self.collections.get(&assoc.parent)?.records.get(&id))
                .is_some();
            if !exists {
                return Err(StoreError::Constraint {
                    parent: assoc.parent.clone(),
                    child: child.to_string(),
                    foreign_key: assoc.foreign_key.clone(),
                    parent_id: value.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Positions of the associations in which `child` holds the foreign key.
    fn child_associations(&self, child: &str) -> Vec<(usize, String)> {
        self.registry
            .associations()
            .iter()
            .enumerate()
            .filter(|(_, a)| a.child == child)
            .map(|(i, a)| (i, a.foreign_key.clone()))
            .collect()
    }

    fn to_snapshot(&self) -> SnapshotData {
        let collections = self
            .registry
            .collections()
            .filter_map(|schema| {
                let collection = self.collections.get(&schema.name)?;
                Some(CollectionData {
                    name: schema.name.clone(),
                    schema: Some(schema.clone()),
                    next_id: collection.next_id,
                    records: collection.records.values().cloned().collect(),
                })
            })
            .collect();
        SnapshotData::new(collections, self.registry.associations().to_vec())
    }

    fn rebuild_index(&mut self) {
        let mut index = AssociationIndex::new();
        for (position, def) in self.registry.associations().iter().enumerate() {
            index.register();
            if let Some(child) = self.collections.get(&def.child) {
                index.rebuild(position, def, child.records.values());
            }
        }
        self.index = index;
    }
}

/// Typed record store with one-to-many association bookkeeping
#[derive(Debug)]
pub struct RecordStore {
    state: RwLock<StoreState>,
    snapshot: Option<SnapshotFile>,
}

impl RecordStore {
    /// Creates an in-memory store with one empty collection per schema.
    pub fn new(registry: SchemaRegistry) -> Self {
        let collections = registry
            .collections()
            .map(|s| (s.name.clone(), Collection::new()))
            .collect();

        let mut state = StoreState {
            registry,
            collections,
            index: AssociationIndex::new(),
        };
        state.rebuild_index();

        Self {
            state: RwLock::new(state),
            snapshot: None,
        }
    }

    /// Creates a store persisted to `path`, loading the snapshot if one exists.
    ///
    /// Schemas in `registry` take precedence. Collections and associations
    /// the snapshot declares but the registry lacks are registered from the
    /// snapshot; a collection stored without a schema is skipped.
    pub fn open(registry: SchemaRegistry, path: impl AsRef<Path>) -> StoreResult<Self> {
        let file = SnapshotFile::new(path.as_ref());
        let mut store = Self::new(registry);

        if let Some(data) = file.load()? {
            let state = store.state.get_mut().map_err(|_| StoreError::lock_poisoned())?;
            let mut loaded = 0usize;
            for collection in data.collections {
                if !state.registry.contains(&collection.name) {
                    let Some(schema) = collection.schema else {
                        warn!(collection = %collection.name, "snapshot collection has no schema, skipping");
                        continue;
                    };
                    state.registry.define(schema)?;
                    state
                        .collections
                        .insert(collection.name.clone(), Collection::new());
                    info!(collection = %collection.name, "collection restored from snapshot");
                }
                let Some(target) = state.collections.get_mut(&collection.name) else {
                    continue;
                };
                let max_id = collection.records.iter().map(|r| r.id).max().unwrap_or(0);
                target.next_id = collection.next_id.max(max_id + 1);
                loaded += collection.records.len();
                target.records = collection
                    .records
                    .into_iter()
                    .map(|r| (r.id, r))
                    .collect();
            }
            for assoc in data.associations {
                if state.registry.association(&assoc.parent, assoc.name()).is_some() {
                    continue;
                }
                let (parent, child) = (assoc.parent.clone(), assoc.child.clone());
                if let Err(e) = state.registry.associate(assoc) {
                    warn!(%parent, %child, error = %e, "snapshot association rejected, skipping");
                }
            }
            state.rebuild_index();
            info!(path = %file.path().display(), records = loaded, "snapshot loaded");
        }

        store.snapshot = Some(file);
        Ok(store)
    }

    /// Path of the snapshot file, if persistence is enabled.
    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot.as_ref().map(SnapshotFile::path)
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, StoreState>> {
        self.state.read().map_err(|_| StoreError::lock_poisoned())
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, StoreState>> {
        self.state.write().map_err(|_| StoreError::lock_poisoned())
    }

    /// Persists the state after a mutation. Called with the write lock held so
    /// snapshots are written in mutation order.
    fn persist(&self, state: &StoreState) -> StoreResult<()> {
        match &self.snapshot {
            Some(file) => file.save(&state.to_snapshot()),
            None => Ok(()),
        }
    }

    /// Writes a snapshot now. No-op for in-memory stores.
    pub fn save(&self) -> StoreResult<()> {
        let state = self.read()?;
        self.persist(&state)
    }

    // ==================
    // Schema
    // ==================

    /// Registers a new collection.
    pub fn define(&self, schema: CollectionSchema) -> StoreResult<()> {
        let mut state = self.write()?;
        let name = schema.name.clone();
        state.registry.define(schema)?;
        state.collections.insert(name.clone(), Collection::new());
        info!(collection = %name, "collection defined");
        self.persist(&state)
    }

    /// Registers a new association and indexes existing children.
    pub fn associate(&self, def: AssociationDef) -> StoreResult<()> {
        let mut state = self.write()?;
        state.registry.associate(def.clone())?;
        state.rebuild_index();
        info!(parent = %def.parent, child = %def.child, foreign_key = %def.foreign_key, "association declared");
        self.persist(&state)
    }

    /// Returns a copy of a collection schema.
    pub fn schema(&self, collection: &str) -> StoreResult<CollectionSchema> {
        Ok(self.read()?.registry.get(collection)?.clone())
    }

    /// Returns a copy of the association reachable from `parent` under `name`.
    pub fn association(&self, parent: &str, name: &str) -> StoreResult<AssociationDef> {
        let state = self.read()?;
        state.registry.get(parent)?;
        state
            .registry
            .association(parent, name)
            .cloned()
            .ok_or_else(|| StoreError::AssociationNotFound {
                parent: parent.to_string(),
                name: name.to_string(),
            })
    }

    /// Names of all collections in declaration order.
    pub fn collection_names(&self) -> StoreResult<Vec<String>> {
        Ok(self
            .read()?
            .registry
            .collections()
            .map(|c| c.name.clone())
            .collect())
    }

    // ==================
    // CRUD
    // ==================

    /// Inserts a record, assigning its id and timestamps.
    pub fn insert(&self, collection: &str, fields: &Value) -> StoreResult<Record> {
        let mut guard = self.write()?;
        let state = &mut *guard;

        let schema = state.registry.get(collection)?;
        let fields = SchemaValidator::new(schema).validate_insert(fields)?.clone();
        state.check_references(collection, &fields)?;
        let links = state.child_associations(collection);

        let target = state
            .collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))?;
        let id = target.next_id;
        target.next_id += 1;

        let record = Record::new(id, fields, Utc::now());
        target.records.insert(id, record.clone());

        for (position, foreign_key) in links {
            if let Some(parent_id) = record.reference(&foreign_key) {
                state.index.add(position, parent_id, id);
            }
        }

        debug!(collection, id, "record inserted");
        self.persist(state)?;
        Ok(record)
    }

    /// Returns every record matching the predicate, in insertion order.
    pub fn find_all(&self, collection: &str, predicate: Option<&Predicate>) -> StoreResult<Vec<Record>> {
        let state = self.read()?;
        let predicate = state.conform(collection, predicate)?;
        let records = state
            .collection(collection)?
            .matching(&predicate)
            .cloned()
            .collect();
        Ok(records)
    }

    /// Returns the first matching record, or `None`.
    pub fn find_one(&self, collection: &str, predicate: &Predicate) -> StoreResult<Option<Record>> {
        let state = self.read()?;
        let predicate = state.conform(collection, Some(predicate))?;
        let record = state
            .collection(collection)?
            .matching(&predicate)
            .next()
            .cloned();
        Ok(record)
    }

    /// Point lookup by id.
    pub fn find_by_id(&self, collection: &str, id: u64) -> StoreResult<Option<Record>> {
        let state = self.read()?;
        state.registry.get(collection)?;
        Ok(state.collection(collection)?.records.get(&id).cloned())
    }

    /// Counts matching records.
    pub fn count(&self, collection: &str, predicate: Option<&Predicate>) -> StoreResult<usize> {
        let state = self.read()?;
        let predicate = state.conform(collection, predicate)?;
        Ok(state.collection(collection)?.matching(&predicate).count())
    }

    /// Applies `fields` to every matching record. Returns the number updated.
    pub fn update(&self, collection: &str, fields: &Value, predicate: &Predicate) -> StoreResult<usize> {
        let mut guard = self.write()?;
        let state = &mut *guard;

        let predicate = state.conform(collection, Some(predicate))?;
        let schema = state.registry.get(collection)?;
        let changes = SchemaValidator::new(schema).validate_update(fields)?.clone();
        state.check_references(collection, &changes)?;
        let links = state.child_associations(collection);

        let target = state
            .collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))?;
        let ids = target.matching_ids(&predicate);
        let now = Utc::now();

        for id in &ids {
            let Some(record) = target.records.get_mut(id) else {
                continue;
            };
            let before: Vec<Option<u64>> = links.iter().map(|(_, fk)| record.reference(fk)).collect();
            record.apply(&changes, now);
            for ((position, foreign_key), old) in links.iter().zip(before) {
                state.index.relink(*position, old, record.reference(foreign_key), *id);
            }
        }

        debug!(collection, count = ids.len(), "records updated");
        if !ids.is_empty() {
            self.persist(state)?;
        }
        Ok(ids.len())
    }

    /// Removes every matching record. Returns the number removed.
    ///
    /// Children of a removed parent are left in place.
    pub fn destroy(&self, collection: &str, predicate: &Predicate) -> StoreResult<usize> {
        let mut guard = self.write()?;
        let state = &mut *guard;

        let predicate = state.conform(collection, Some(predicate))?;
        let links = state.child_associations(collection);

        let target = state
            .collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))?;
        let ids = target.matching_ids(&predicate);

        for id in &ids {
            if let Some(record) = target.records.remove(id) {
                for (position, foreign_key) in &links {
                    if let Some(parent_id) = record.reference(foreign_key) {
                        state.index.remove(*position, parent_id, *id);
                    }
                }
            }
        }

        debug!(collection, count = ids.len(), "records destroyed");
        if !ids.is_empty() {
            self.persist(state)?;
        }
        Ok(ids.len())
    }

    // ==================
    // Associations
    // ==================

    /// Points the child record at `parent_id` through the association between
    /// the two collections. Fails if the parent does not exist.
    pub fn link(
        &self,
        parent: &str,
        parent_id: u64,
        child: &str,
        child_id: u64,
    ) -> StoreResult<Record> {
        let mut guard = self.write()?;
        let state = &mut *guard;

        state.registry.get(parent)?;
        state.registry.get(child)?;
        let (position, foreign_key) = state
            .registry
            .associations()
            .iter()
            .enumerate()
            .find(|(_, a)| a.parent == parent && a.child == child)
            .map(|(i, a)| (i, a.foreign_key.clone()))
            .ok_or_else(|| StoreError::AssociationNotFound {
                parent: parent.to_string(),
                name: child.to_string(),
            })?;

        if !state.collection(parent)?.records.contains_key(&parent_id) {
            return Err(StoreError::Constraint {
                parent: parent.to_string(),
                child: child.to_string(),
                foreign_key,
                parent_id: parent_id.to_string(),
            });
        }

        let record = state
            .collections
            .get_mut(child)
            .and_then(|c| c.records.get_mut(&child_id))
            .ok_or_else(|| StoreError::RecordNotFound {
                collection: child.to_string(),
                id: child_id,
            })?;

        let old = record.reference(&foreign_key);
        let mut change = Map::new();
        change.insert(foreign_key, Value::from(parent_id));
        record.apply(&change, Utc::now());
        let linked = record.clone();

        state.index.relink(position, old, Some(parent_id), child_id);

        debug!(parent, parent_id, child, child_id, "record linked");
        self.persist(state)?;
        Ok(linked)
    }

    /// Child records whose foreign key equals `parent_id`, in insertion order.
    pub fn children_of(&self, parent: &str, parent_id: u64, child: &str) -> StoreResult<Vec<Record>> {
        let state = self.read()?;
        state.registry.get(parent)?;
        state.registry.get(child)?;
        let position = state
            .registry
            .associations()
            .iter()
            .position(|a| a.parent == parent && a.child == child)
            .ok_or_else(|| StoreError::AssociationNotFound {
                parent: parent.to_string(),
                name: child.to_string(),
            })?;

        Self::collect_children(&state, position, parent_id, child)
    }

    /// Like `children_of`, addressed by association name (alias or child name).
    pub fn children_by_name(&self, parent: &str, parent_id: u64, name: &str) -> StoreResult<Vec<Record>> {
        let state = self.read()?;
        state.registry.get(parent)?;
        let (position, def) = state
            .registry
            .associations()
            .iter()
            .enumerate()
            .find(|(_, a)| a.parent == parent && a.name() == name)
            .ok_or_else(|| StoreError::AssociationNotFound {
                parent: parent.to_string(),
                name: name.to_string(),
            })?;

        Self::collect_children(&state, position, parent_id, &def.child)
    }

    fn collect_children(
        state: &StoreState,
        position: usize,
        parent_id: u64,
        child: &str,
    ) -> StoreResult<Vec<Record>> {
        let records = &state.collection(child)?.records;
        Ok(state
            .index
            .children(position, parent_id)
            .into_iter()
            .filter_map(|id| records.get(&id).cloned())
            .collect())
    }

    /// The parent record a child points to, if the foreign key is set and the
    /// parent still exists.
    pub fn parent_of(&self, child: &str, record: &Record, parent: &str) -> StoreResult<Option<Record>> {
        let state = self.read()?;
        state.registry.get(child)?;
        let def = state
            .registry
            .association_between(parent, child)
            .ok_or_else(|| StoreError::AssociationNotFound {
                parent: parent.to_string(),
                name: child.to_string(),
            })?;

        Ok(record
            .reference(&def.foreign_key)
            .and_then(|id| state.collections.get(parent)?.records.get(&id).cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldDef;
    use crate::store::{ErrorKind, Operator};
    use serde_json::json;
    use tempfile::TempDir;

    fn registry() -> SchemaRegistry {
        let users = CollectionSchema::new("users", HashMap::new())
            .with_field("name", FieldDef::required_string())
            .with_field("age", FieldDef::optional_integer());
        let posts = CollectionSchema::new("posts", HashMap::new())
            .with_field("title", FieldDef::required_string())
            .with_field("userId", FieldDef::optional_integer());
        SchemaRegistry::build(
            vec![users, posts],
            vec![AssociationDef::new("users", "posts", "userId")],
        )
        .unwrap()
    }

    fn store() -> RecordStore {
        RecordStore::new(registry())
    }

    #[test]
    fn test_insert_assigns_sequential_ids() {
        let store = store();
        let a = store.insert("users", &json!({"name": "John"})).unwrap();
        let b = store.insert("users", &json!({"name": "Jane"})).unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(a.created_at, a.updated_at);
    }

    #[test]
    fn test_insert_validation_error() {
        let store = store();
        let err = store.insert("users", &json!({"age": 3})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = store.insert("users", &json!({"name": 7})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_unknown_collection() {
        let store = store();
        let err = store.insert("ghosts", &json!({})).unwrap_err();
        assert!(matches!(err, StoreError::CollectionNotFound(_)));
        assert_eq!(store.find_all("ghosts", None).unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_find_one_and_find_all() {
        let store = store();
        store.insert("users", &json!({"name": "John", "age": 30})).unwrap();
        store.insert("users", &json!({"name": "Jane", "age": 25})).unwrap();
        store.insert("users", &json!({"name": "Jim", "age": 40})).unwrap();

        let found = store
            .find_one("users", &Predicate::eq("name", json!("Jane")))
            .unwrap()
            .unwrap();
        assert_eq!(found.id, 2);

        let older = Predicate::all().and_where("age", Operator::Gte, json!(30));
        let names: Vec<_> = store
            .find_all("users", Some(&older))
            .unwrap()
            .into_iter()
            .map(|r| r.fields["name"].clone())
            .collect();
        assert_eq!(names, vec![json!("John"), json!("Jim")]);

        assert!(store
            .find_one("users", &Predicate::eq("name", json!("Nobody")))
            .unwrap()
            .is_none());
        assert_eq!(store.count("users", None).unwrap(), 3);
    }

    #[test]
    fn test_predicate_on_unknown_field_rejected() {
        let store = store();
        let err = store
            .find_all("users", Some(&Predicate::eq("nickname", json!("J"))))
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidPredicate { .. }));
    }

    #[test]
    fn test_update_changes_fields_and_timestamp() {
        let store = store();
        let created = store.insert("users", &json!({"name": "John"})).unwrap();

        let count = store
            .update("users", &json!({"name": "Johnny", "age": 31}), &Predicate::by_id(created.id))
            .unwrap();
        assert_eq!(count, 1);

        let updated = store.find_by_id("users", created.id).unwrap().unwrap();
        assert_eq!(updated.fields["name"], json!("Johnny"));
        assert_eq!(updated.fields["age"], json!(31));
        assert!(updated.updated_at > created.updated_at);
        assert_eq!(updated.created_at, created.created_at);
    }

    #[test]
    fn test_update_without_match_returns_zero() {
        let store = store();
        let count = store
            .update("users", &json!({"name": "X"}), &Predicate::by_id(42))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_destroy() {
        let store = store();
        let john = store.insert("users", &json!({"name": "John"})).unwrap();
        store.insert("users", &json!({"name": "Jane"})).unwrap();

        assert_eq!(store.destroy("users", &Predicate::by_id(john.id)).unwrap(), 1);
        assert!(store.find_one("users", &Predicate::by_id(john.id)).unwrap().is_none());
        assert_eq!(store.destroy("users", &Predicate::by_id(john.id)).unwrap(), 0);
        assert_eq!(store.count("users", None).unwrap(), 1);
    }

    #[test]
    fn test_ids_not_reused_after_destroy() {
        let store = store();
        store.insert("users", &json!({"name": "John"})).unwrap();
        store.destroy("users", &Predicate::all()).unwrap();
        let next = store.insert("users", &json!({"name": "Jane"})).unwrap();
        assert_eq!(next.id, 2);
    }

    #[test]
    fn test_insert_with_missing_parent_violates_constraint() {
        let store = store();
        let err = store
            .insert("posts", &json!({"title": "Hi", "userId": 9}))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Constraint);
    }

    #[test]
    fn test_children_follow_foreign_key_changes() {
        let store = store();
        let john = store.insert("users", &json!({"name": "John"})).unwrap();
        let jane = store.insert("users", &json!({"name": "Jane"})).unwrap();
        let post = store
            .insert("posts", &json!({"title": "Hi", "userId": john.id}))
            .unwrap();

        store
            .update("posts", &json!({"userId": jane.id}), &Predicate::by_id(post.id))
            .unwrap();

        assert!(store.children_of("users", john.id, "posts").unwrap().is_empty());
        assert_eq!(store.children_of("users", jane.id, "posts").unwrap().len(), 1);

        store.destroy("posts", &Predicate::by_id(post.id)).unwrap();
        assert!(store.children_of("users", jane.id, "posts").unwrap().is_empty());
    }

    #[test]
    fn test_link() {
        let store = store();
        let john = store.insert("users", &json!({"name": "John"})).unwrap();
        let post = store.insert("posts", &json!({"title": "Hi"})).unwrap();

        let linked = store.link("users", john.id, "posts", post.id).unwrap();
        assert_eq!(linked.fields["userId"], json!(john.id));
        assert!(linked.updated_at > post.updated_at);

        let children = store.children_of("users", john.id, "posts").unwrap();
        assert_eq!(children, vec![linked.clone()]);

        let parent = store.parent_of("posts", &linked, "users").unwrap();
        assert_eq!(parent.map(|p| p.id), Some(john.id));

        let err = store.link("users", 99, "posts", post.id).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Constraint);
    }

    #[test]
    fn test_parent_destroy_leaves_children() {
        let store = store();
        let john = store.insert("users", &json!({"name": "John"})).unwrap();
        let post = store
            .insert("posts", &json!({"title": "Hi", "userId": john.id}))
            .unwrap();

        store.destroy("users", &Predicate::by_id(john.id)).unwrap();

        let orphan = store.find_by_id("posts", post.id).unwrap().unwrap();
        assert_eq!(orphan.fields["userId"], json!(john.id));
        assert!(store.parent_of("posts", &orphan, "users").unwrap().is_none());
        assert_eq!(store.children_of("users", john.id, "posts").unwrap().len(), 1);
    }

    #[test]
    fn test_define_at_runtime() {
        let store = store();
        let tags = CollectionSchema::new("tags", HashMap::new())
            .with_field("label", FieldDef::required_string());
        store.define(tags.clone()).unwrap();
        store.insert("tags", &json!({"label": "rust"})).unwrap();

        let err = store.define(tags).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(
            store.collection_names().unwrap(),
            vec!["users", "posts", "tags"]
        );
    }

    #[test]
    fn test_associate_at_runtime_indexes_existing_children() {
        let store = store();
        let notes = CollectionSchema::new("notes", HashMap::new())
            .with_field("text", FieldDef::required_string())
            .with_field("ownerId", FieldDef::optional_integer());
        store.define(notes).unwrap();

        let john = store.insert("users", &json!({"name": "John"})).unwrap();
        store
            .insert("notes", &json!({"text": "a", "ownerId": john.id}))
            .unwrap();

        let mut def = AssociationDef::new("users", "notes", "ownerId");
        def.alias = Some("memos".to_string());
        store.associate(def).unwrap();

        let memos = store.children_by_name("users", john.id, "memos").unwrap();
        assert_eq!(memos.len(), 1);
        assert_eq!(store.association("users", "memos").unwrap().child, "notes");
    }

    #[test]
    fn test_snapshot_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("relstore.snapshot");

        {
            let store = RecordStore::open(registry(), &path).unwrap();
            let john = store.insert("users", &json!({"name": "John"})).unwrap();
            store
                .insert("posts", &json!({"title": "Hi", "userId": john.id}))
                .unwrap();
            store.insert("users", &json!({"name": "Temp"})).unwrap();
            store.destroy("users", &Predicate::eq("name", json!("Temp"))).unwrap();
        }

        let reopened = RecordStore::open(registry(), &path).unwrap();
        assert_eq!(reopened.snapshot_path(), Some(path.as_path()));
        assert_eq!(reopened.count("users", None).unwrap(), 1);
        assert_eq!(reopened.children_of("users", 1, "posts").unwrap().len(), 1);

        let next = reopened.insert("users", &json!({"name": "Jane"})).unwrap();
        assert_eq!(next.id, 3);
    }

    #[test]
    fn test_runtime_schema_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("relstore.snapshot");

        {
            let store = RecordStore::open(registry(), &path).unwrap();
            let tags = CollectionSchema::new("tags", HashMap::new())
                .with_field("label", FieldDef::required_string())
                .with_field("userId", FieldDef::optional_integer());
            store.define(tags).unwrap();
            store.associate(AssociationDef::new("users", "tags", "userId")).unwrap();

            let john = store.insert("users", &json!({"name": "John"})).unwrap();
            store
                .insert("tags", &json!({"label": "rust", "userId": john.id}))
                .unwrap();
        }

        let reopened = RecordStore::open(registry(), &path).unwrap();
        assert_eq!(reopened.count("tags", None).unwrap(), 1);
        assert_eq!(reopened.children_of("users", 1, "tags").unwrap().len(), 1);
        assert_eq!(
            reopened.collection_names().unwrap(),
            vec!["users", "posts", "tags"]
        );
    }
}
