use crate::error::Error;
use graph_catalog::TypeCatalog;
use graph_property::{PropertyCatalog, PropertyKind, TypedValue};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
struct RelRecord {
    start: u64,
    end: u64,
}

/// A relationship as handed back across the store's API surface.
#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    pub id: u64,
    pub type_id: u16,
    pub start: u64,
    pub end: u64,
    pub properties: HashMap<String, TypedValue>,
}

/// The single-shard CRUD surface over relationships. A relationship is
/// always homed on the shard that owns its `start` node; `end` may live
/// on a different shard entirely, which `graph-shard` resolves when it
/// wires adjacency on both sides.
pub struct RelationshipStore {
    shard: u16,
    catalog: TypeCatalog<RelRecord>,
    properties: PropertyCatalog,
}

impl RelationshipStore {
    pub fn new(shard: u16) -> Self {
        Self {
            shard,
            catalog: TypeCatalog::new(),
            properties: PropertyCatalog::new(),
        }
    }

    pub fn shard(&self) -> u16 {
        self.shard
    }

    // -- type catalog -----------------------------------------------------

    pub fn type_insert(&mut self, name: &str) -> Result<u16, Error> {
        Ok(self.catalog.get_or_assign(name)?)
    }

    pub fn type_assert(&mut self, name: &str, id: u16) -> Result<bool, Error> {
        Ok(self.catalog.assert(name, id)?)
    }

    pub fn type_lookup_id(&self, name: &str) -> Option<u16> {
        self.catalog.lookup_id(name)
    }

    pub fn type_lookup_name(&self, id: u16) -> Option<&str> {
        self.catalog.lookup_name(id)
    }

    pub fn type_list_names(&self) -> impl Iterator<Item = &str> {
        self.catalog.list_names()
    }

    pub fn type_count(&self, type_id: u16) -> u64 {
        self.catalog.count(type_id)
    }

    // -- property schema --------------------------------------------------

    pub fn schema_add(
        &mut self,
        type_id: u16,
        name: &str,
        kind: PropertyKind,
    ) -> Result<bool, Error> {
        let len = self.catalog.table(type_id).map_or(0, |t| t.len());
        Ok(self.properties.schema_add(type_id, name, kind, len)?)
    }

    pub fn schema(&self, type_id: u16) -> Vec<(&str, PropertyKind)> {
        self.properties.schema(type_id)
    }

    // -- CRUD --------------------------------------------------------------

    /// `start` must belong to this shard; `end` may belong to any shard.
    /// Does not touch either endpoint's adjacency lists — that is
    /// `graph-shard`'s job, since `end` may live elsewhere.
    pub fn add(&mut self, type_id: u16, start: u64, end: u64) -> Result<u64, Error> {
        if !self.catalog.is_registered(type_id) {
            return Ok(0);
        }
        let owner = graph_id::shard_of(start);
        if owner != self.shard {
            return Err(Error::WrongShard { id: start, owner });
        }
        let table = self.catalog.table_mut(type_id).expect("just checked registered");
        let slot = table.allocate();
        table.set(slot, RelRecord { start, end });
        self.properties.ensure_len(type_id, table.len());

        Ok(graph_id::pack(type_id as u32, slot, self.shard)?)
    }

    pub fn add_with_json(
        &mut self,
        type_id: u16,
        start: u64,
        end: u64,
        properties_json: &str,
    ) -> Result<u64, Error> {
        let id = self.add(type_id, start, end)?;
        if id == 0 {
            return Ok(0);
        }
        let slot = graph_id::slot_of(id);
        if let Ok(serde_json::Value::Object(fields)) = serde_json::from_str(properties_json) {
            for (name, value) in fields.iter() {
                if let Ok(text) = serde_json::to_string(value) {
                    self.properties.set_from_json(type_id, slot, name, &text);
                }
            }
        }
        Ok(id)
    }

    pub fn contains(&self, id: u64) -> bool {
        let type_id = graph_id::type_of(id) as u16;
        let slot = graph_id::slot_of(id);
        self.catalog.table(type_id).map_or(false, |t| t.is_live(slot))
    }

    pub fn get(&self, id: u64) -> Option<Relationship> {
        let type_id = graph_id::type_of(id) as u16;
        let slot = graph_id::slot_of(id);
        let record = self.catalog.table(type_id)?.get(slot)?;
        Some(Relationship {
            id,
            type_id,
            start: record.start,
            end: record.end,
            properties: self.properties.get_all(type_id, slot),
        })
    }

    /// Idempotent: removing an id that isn't live returns `Ok(None)`.
    /// Returns the (start, end) pair so the caller can drop the matching
    /// adjacency entries on both endpoints.
    pub fn remove(&mut self, id: u64) -> Result<Option<(u64, u64)>, Error> {
        let owner = graph_id::shard_of(id);
        if owner != self.shard {
            return Err(Error::WrongShard { id, owner });
        }
        let type_id = graph_id::type_of(id) as u16;
        let slot = graph_id::slot_of(id);

        let Some(table) = self.catalog.table_mut(type_id) else {
            return Ok(None);
        };
        let Some(record) = table.tombstone(slot) else {
            return Ok(None);
        };
        self.properties.delete_all(type_id, slot);
        Ok(Some((record.start, record.end)))
    }

    pub fn get_property(&self, id: u64, name: &str) -> Option<TypedValue> {
        if !self.contains(id) {
            return None;
        }
        let type_id = graph_id::type_of(id) as u16;
        self.properties.get(type_id, graph_id::slot_of(id), name)
    }

    pub fn set_property_from_json(&mut self, id: u64, name: &str, json_text: &str) -> bool {
        if !self.contains(id) {
            return false;
        }
        let type_id = graph_id::type_of(id) as u16;
        self.properties
            .set_from_json(type_id, graph_id::slot_of(id), name, json_text)
    }

    pub fn delete_property(&mut self, id: u64, name: &str) -> bool {
        if !self.contains(id) {
            return false;
        }
        let type_id = graph_id::type_of(id) as u16;
        self.properties.delete(type_id, graph_id::slot_of(id), name)
    }

    pub fn delete_all_properties(&mut self, id: u64) -> bool {
        if !self.contains(id) {
            return false;
        }
        let type_id = graph_id::type_of(id) as u16;
        self.properties.delete_all(type_id, graph_id::slot_of(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn store_with_rel_type(shard: u16) -> (RelationshipStore, u16) {
        let mut store = RelationshipStore::new(shard);
        let type_id = store.type_insert("KNOWS").unwrap();
        (store, type_id)
    }

    #[test]
    fn add_on_unknown_type_returns_zero() {
        let mut store = RelationshipStore::new(0);
        assert_eq!(store.add(99, 1024, 2048).unwrap(), 0);
    }

    #[test]
    fn add_rejects_start_on_wrong_shard() {
        let (mut store, type_id) = store_with_rel_type(0);
        let start = graph_id::pack(1, 0, 1).unwrap();
        assert_eq!(
            store.add(type_id, start, 0),
            Err(Error::WrongShard { id: start, owner: 1 })
        );
    }

    #[test]
    fn add_remove_round_trip() {
        let (mut store, type_id) = store_with_rel_type(0);
        let start = graph_id::pack(1, 0, 0).unwrap();
        let end = graph_id::pack(1, 1, 3).unwrap();
        let id = store.add(type_id, start, end).unwrap();

        let rel = store.get(id).unwrap();
        assert_eq!(rel.start, start);
        assert_eq!(rel.end, end);

        let (removed_start, removed_end) = store.remove(id).unwrap().unwrap();
        assert_eq!((removed_start, removed_end), (start, end));
        assert!(!store.contains(id));
        assert_eq!(store.remove(id).unwrap(), None);
    }

    #[test]
    fn add_with_json_applies_known_properties() {
        let (mut store, type_id) = store_with_rel_type(0);
        store.schema_add(type_id, "since", PropertyKind::I64).unwrap();
        let start = graph_id::pack(1, 0, 0).unwrap();

        let id = store
            .add_with_json(type_id, start, 0, r#"{"since": 2020, "ignored": true}"#)
            .unwrap();
        assert_eq!(store.get_property(id, "since"), Some(TypedValue::I64(2020)));
    }
}
