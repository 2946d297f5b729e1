//! Association index
//!
//! For every declared association, maps a parent id to the ids of the child
//! records whose foreign key holds it. Child ids are kept sorted, which is
//! also insertion order because ids are never reused.

use std::collections::{BTreeSet, HashMap};

use crate::schema::AssociationDef;

use super::record::Record;

/// Parent id -> child ids, for one association
type Links = HashMap<u64, BTreeSet<u64>>;

/// Index over every declared association, addressed by declaration position
#[derive(Debug, Default, Clone)]
pub struct AssociationIndex {
    links: Vec<Links>,
}

impl AssociationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes room for a newly declared association.
    pub fn register(&mut self) -> usize {
        self.links.push(Links::new());
        self.links.len() - 1
    }

    /// Records that `child_id` points at `parent_id`.
    pub fn add(&mut self, assoc: usize, parent_id: u64, child_id: u64) {
        if let Some(links) = self.links.get_mut(assoc) {
            links.entry(parent_id).or_default().insert(child_id);
        }
    }

    /// Forgets that `child_id` points at `parent_id`.
    pub fn remove(&mut self, assoc: usize, parent_id: u64, child_id: u64) {
        if let Some(links) = self.links.get_mut(assoc) {
            if let Some(children) = links.get_mut(&parent_id) {
                children.remove(&child_id);
                if children.is_empty() {
                    links.remove(&parent_id);
                }
            }
        }
    }

    /// Moves a child between parents after its foreign key changed.
    pub fn relink(&mut self, assoc: usize, old: Option<u64>, new: Option<u64>, child_id: u64) {
        if old == new {
            return;
        }
        if let Some(parent_id) = old {
            self.remove(assoc, parent_id, child_id);
        }
        if let Some(parent_id) = new {
            self.add(assoc, parent_id, child_id);
        }
    }

    /// Child ids linked to `parent_id`, in insertion order.
    pub fn children(&self, assoc: usize, parent_id: u64) -> Vec<u64> {
        self.links
            .get(assoc)
            .and_then(|links| links.get(&parent_id))
            .map(|children| children.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Rebuilds one association from the child collection's records.
    pub fn rebuild<'a>(
        &mut self,
        assoc: usize,
        def: &AssociationDef,
        records: impl Iterator<Item = &'a Record>,
    ) {
        let mut links = Links::new();
        for record in records {
            if let Some(parent_id) = record.reference(&def.foreign_key) {
                links.entry(parent_id).or_default().insert(record.id);
            }
        }
        if let Some(slot) = self.links.get_mut(assoc) {
            *slot = links;
        }
    }
}
