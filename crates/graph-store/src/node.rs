use crate::error::Error;
use crate::key_index::KeyIndex;
use graph_catalog::TypeCatalog;
use graph_property::{PropertyCatalog, PropertyKind, TypedValue};
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct NodeRecord {
    key: String,
    outgoing: Vec<u64>,
    incoming: Vec<u64>,
}

/// A node as handed back across the store's API surface: its id, the
/// business key that addressed it, and its current property snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: u64,
    pub type_id: u16,
    pub key: String,
    pub properties: HashMap<String, TypedValue>,
}

/// What a successful [`NodeStore::remove`] hands back so the caller
/// (normally the owning `ShardService`) can cascade the deletion to the
/// relationships that referenced this node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedNode {
    pub key: String,
    pub outgoing: Vec<u64>,
    pub incoming: Vec<u64>,
}

/// The single-shard CRUD surface over nodes: their type catalog, key
/// index, and properties. Every method here assumes the caller has
/// already routed to the right shard; see `graph-shard` for routing.
pub struct NodeStore {
    shard: u16,
    catalog: TypeCatalog<NodeRecord>,
    keys: KeyIndex,
    properties: PropertyCatalog,
}

impl NodeStore {
    pub fn new(shard: u16) -> Self {
        Self {
            shard,
            catalog: TypeCatalog::new(),
            keys: KeyIndex::new(),
            properties: PropertyCatalog::new(),
        }
    }

    pub fn shard(&self) -> u16 {
        self.shard
    }

    // -- type catalog -----------------------------------------------------

    /// Only legal on the shard holding the catalog write lock; see
    /// `graph-shard::PeeredRouter`.
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

    /// Returns the invalid id `0` (never an error) if `type_id` isn't
    /// registered. Fails with [`Error::Duplicate`] if `key` is already
    /// taken within the type.
    pub fn add_empty(&mut self, type_id: u16, key: &str) -> Result<u64, Error> {
        if !self.catalog.is_registered(type_id) {
            return Ok(0);
        }
        if self.keys.contains(type_id, key) {
            return Err(Error::Duplicate {
                type_id,
                key: key.to_string(),
            });
        }
        let table = self.catalog.table_mut(type_id).expect("just checked registered");
        let slot = table.allocate();
        table.set(
            slot,
            NodeRecord {
                key: key.to_string(),
                outgoing: Vec::new(),
                incoming: Vec::new(),
            },
        );
        self.properties.ensure_len(type_id, table.len());

        let id = graph_id::pack(type_id as u32, slot, self.shard)?;
        self.keys.insert(type_id, key, id);
        Ok(id)
    }

    /// As [`NodeStore::add_empty`], then applies every field of the
    /// JSON object `properties_json` that names an already-registered
    /// property with a coercible value. Unrecognized fields are
    /// silently skipped, matching the rule that property coercion
    /// failures never fail the surrounding call.
    pub fn add(&mut self, type_id: u16, key: &str, properties_json: &str) -> Result<u64, Error> {
        let id = self.add_empty(type_id, key)?;
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

    pub fn get_id(&self, type_id: u16, key: &str) -> Option<u64> {
        self.keys.get(type_id, key)
    }

    pub fn contains(&self, id: u64) -> bool {
        let type_id = graph_id::type_of(id) as u16;
        let slot = graph_id::slot_of(id);
        self.catalog.table(type_id).map_or(false, |t| t.is_live(slot))
    }

    pub fn get(&self, id: u64) -> Option<Node> {
        let type_id = graph_id::type_of(id) as u16;
        let slot = graph_id::slot_of(id);
        let record = self.catalog.table(type_id)?.get(slot)?;
        Some(Node {
            id,
            type_id,
            key: record.key.clone(),
            properties: self.properties.get_all(type_id, slot),
        })
    }

    /// Idempotent: removing an id that isn't live returns `Ok(None)`
    /// rather than an error.
    pub fn remove(&mut self, id: u64) -> Result<Option<RemovedNode>, Error> {
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
        self.keys.remove(type_id, &record.key);
        self.properties.delete_all(type_id, slot);

        Ok(Some(RemovedNode {
            key: record.key,
            outgoing: record.outgoing,
            incoming: record.incoming,
        }))
    }

    // -- adjacency, maintained on behalf of RelationshipStore --------------

    pub fn outgoing(&self, id: u64) -> Vec<u64> {
        self.record(id).map_or(Vec::new(), |r| r.outgoing.clone())
    }

    pub fn incoming(&self, id: u64) -> Vec<u64> {
        self.record(id).map_or(Vec::new(), |r| r.incoming.clone())
    }

    /// Every outgoing relationship id adjacent to `id` whose own type is
    /// `rel_type`. A relationship's type is encoded in its own id, so
    /// this needs no extra bookkeeping beyond the unfiltered list.
    pub fn outgoing_by_type(&self, id: u64, rel_type: u16) -> Vec<u64> {
        self.outgoing(id)
            .into_iter()
            .filter(|&rel_id| graph_id::type_of(rel_id) as u16 == rel_type)
            .collect()
    }

    pub fn incoming_by_type(&self, id: u64, rel_type: u16) -> Vec<u64> {
        self.incoming(id)
            .into_iter()
            .filter(|&rel_id| graph_id::type_of(rel_id) as u16 == rel_type)
            .collect()
    }

    pub fn add_outgoing(&mut self, id: u64, relationship_id: u64) -> bool {
        self.record_mut(id).map_or(false, |r| {
            r.outgoing.push(relationship_id);
            true
        })
    }

    pub fn add_incoming(&mut self, id: u64, relationship_id: u64) -> bool {
        self.record_mut(id).map_or(false, |r| {
            r.incoming.push(relationship_id);
            true
        })
    }

    pub fn remove_outgoing(&mut self, id: u64, relationship_id: u64) -> bool {
        self.record_mut(id).map_or(false, |r| {
            let before = r.outgoing.len();
            r.outgoing.retain(|&rid| rid != relationship_id);
            r.outgoing.len() != before
        })
    }

    pub fn remove_incoming(&mut self, id: u64, relationship_id: u64) -> bool {
        self.record_mut(id).map_or(false, |r| {
            let before = r.incoming.len();
            r.incoming.retain(|&rid| rid != relationship_id);
            r.incoming.len() != before
        })
    }

    fn record(&self, id: u64) -> Option<&NodeRecord> {
        let type_id = graph_id::type_of(id) as u16;
        let slot = graph_id::slot_of(id);
        self.catalog.table(type_id)?.get(slot)
    }

    fn record_mut(&mut self, id: u64) -> Option<&mut NodeRecord> {
        let type_id = graph_id::type_of(id) as u16;
        let slot = graph_id::slot_of(id);
        self.catalog.table_mut(type_id)?.get_mut(slot)
    }

    // -- properties by id ----------------------------------------------------

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

    fn store_with_node_type(shard: u16) -> (NodeStore, u16) {
        let mut store = NodeStore::new(shard);
        let type_id = store.type_insert("Node").unwrap();
        (store, type_id)
    }

    #[test]
    fn add_empty_on_unknown_type_returns_zero() {
        let mut store = NodeStore::new(0);
        assert_eq!(store.add_empty(99, "x").unwrap(), 0);
    }

    #[test]
    fn add_empty_rejects_duplicate_keys() {
        let (mut store, type_id) = store_with_node_type(0);
        store.add_empty(type_id, "one").unwrap();
        assert_eq!(
            store.add_empty(type_id, "one"),
            Err(Error::Duplicate {
                type_id,
                key: "one".to_string()
            })
        );
    }

    #[test]
    fn add_empty_allocates_slot_zero_first() {
        let (mut store, type_id) = store_with_node_type(0);
        let id = store.add_empty(type_id, "one").unwrap();
        assert_eq!(graph_id::slot_of(id), 0);
        assert_eq!(graph_id::type_of(id), type_id as u32);
        assert_eq!(graph_id::shard_of(id), 0);
    }

    #[test]
    fn remove_then_add_recycles_slot() {
        let (mut store, type_id) = store_with_node_type(0);
        let a = store.add_empty(type_id, "a").unwrap();
        let _b = store.add_empty(type_id, "b").unwrap();

        let removed = store.remove(a).unwrap().unwrap();
        assert_eq!(removed.key, "a");
        assert!(!store.contains(a));
        assert_eq!(store.get_id(type_id, "a"), None);

        let c = store.add_empty(type_id, "c").unwrap();
        assert_eq!(graph_id::slot_of(c), graph_id::slot_of(a));
    }

    #[test]
    fn remove_is_idempotent() {
        let (mut store, type_id) = store_with_node_type(0);
        let a = store.add_empty(type_id, "a").unwrap();
        assert!(store.remove(a).unwrap().is_some());
        assert_eq!(store.remove(a).unwrap(), None);
    }

    #[test]
    fn remove_rejects_wrong_shard() {
        let (mut store, type_id) = store_with_node_type(0);
        let id = store.add_empty(type_id, "a").unwrap();
        let foreign_id = graph_id::pack(graph_id::type_of(id), graph_id::slot_of(id), 1).unwrap();
        assert_eq!(
            store.remove(foreign_id),
            Err(Error::WrongShard { id: foreign_id, owner: 1 })
        );
    }

    #[test]
    fn add_with_json_properties_applies_known_fields() {
        let (mut store, type_id) = store_with_node_type(0);
        store.schema_add(type_id, "age", PropertyKind::I64).unwrap();

        let id = store
            .add(type_id, "existing", r#"{"age": 99, "unknown": "ignored"}"#)
            .unwrap();
        assert_eq!(
            store.get_property(id, "age"),
            Some(TypedValue::I64(99))
        );
    }

    #[test]
    fn adjacency_round_trips() {
        let (mut store, type_id) = store_with_node_type(0);
        let a = store.add_empty(type_id, "a").unwrap();
        assert!(store.add_outgoing(a, 42));
        assert_eq!(store.outgoing(a), vec![42]);
        assert!(store.remove_outgoing(a, 42));
        assert_eq!(store.outgoing(a), Vec::<u64>::new());

        let missing = graph_id::pack(type_id as u32, 999, 0).unwrap();
        assert_eq!(store.outgoing(missing), Vec::<u64>::new());
    }

    #[test]
    fn outgoing_by_type_filters_to_the_requested_relationship_type() {
        let (mut store, type_id) = store_with_node_type(0);
        let a = store.add_empty(type_id, "a").unwrap();
        let knows = graph_id::pack(1, 0, 0).unwrap();
        let likes = graph_id::pack(2, 0, 0).unwrap();
        store.add_outgoing(a, knows);
        store.add_outgoing(a, likes);

        assert_eq!(store.outgoing_by_type(a, 1), vec![knows]);
        assert_eq!(store.outgoing_by_type(a, 2), vec![likes]);
        assert_eq!(store.outgoing_by_type(a, 3), Vec::<u64>::new());
    }
}
