//! The per-shard type registry and the recyclable per-type slot tables
//! built on top of it.
//!
//! A [`TypeCatalog`] owns one namespace of type names (either node types
//! or relationship types — a shard keeps two separate catalogs, one of
//! each) and, per assigned type id, a dense [`SlotTable`] of entities of
//! that type. Id 0 is permanently reserved for the empty-string sentinel
//! type and is never returned by [`TypeRegistry::get_or_assign`].

use bitvec::vec::BitVec;
use fxhash::FxHashMap as HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("type {name:?} is already registered to id {existing}, cannot assert id {attempted}")]
    NameConflict {
        name: String,
        existing: u16,
        attempted: u16,
    },
    #[error("type id {id} is already bound to {existing:?}, cannot assert name {name:?}")]
    IdConflict {
        id: u16,
        existing: String,
        name: String,
    },
    #[error("type ids are exhausted (more than 65535 types registered)")]
    IdSpaceExhausted,
}

/// The name <-> id registry for one namespace of types. Id 0 is the
/// permanent empty-string sentinel; real types start at 1.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    name_to_id: HashMap<String, u16>,
    id_to_name: Vec<String>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self {
            name_to_id: HashMap::default(),
            id_to_name: vec![String::new()],
        }
    }

    /// Returns `name`'s id, assigning the next free id if this is the
    /// first observation. Only legal to call on the shard that owns the
    /// catalog write lock (shard 0); see `graph-shard`'s peered router.
    pub fn get_or_assign(&mut self, name: &str) -> Result<u16, Error> {
        if let Some(&id) = self.name_to_id.get(name) {
            return Ok(id);
        }
        let id = self.id_to_name.len();
        if id > u16::MAX as usize {
            return Err(Error::IdSpaceExhausted);
        }
        let id = id as u16;
        self.id_to_name.push(name.to_string());
        self.name_to_id.insert(name.to_string(), id);
        Ok(id)
    }

    /// Installs a replicated `(name, id)` mapping. Returns `Ok(true)` if
    /// this is a new mapping, `Ok(false)` if it exactly matches an
    /// existing one (idempotent replay), and `Err` on conflict.
    ///
    /// The source this catalog is modeled on returns `false` from both
    /// the "already present" and "newly inserted" branches of the
    /// equivalent call, which loses the caller's ability to distinguish
    /// a conflict from a fresh assertion; we do not repeat that.
    pub fn assert(&mut self, name: &str, id: u16) -> Result<bool, Error> {
        if let Some(&existing) = self.name_to_id.get(name) {
            return if existing == id {
                Ok(false)
            } else {
                Err(Error::NameConflict {
                    name: name.to_string(),
                    existing,
                    attempted: id,
                })
            };
        }
        if (id as usize) < self.id_to_name.len() {
            let existing = &self.id_to_name[id as usize];
            return Err(Error::IdConflict {
                id,
                existing: existing.clone(),
                name: name.to_string(),
            });
        }
        while self.id_to_name.len() < id as usize {
            // A gap can only appear if assertions are replayed out of
            // order; fill it with sentinels so later lookups by id stay
            // in bounds rather than panicking.
            self.id_to_name.push(String::new());
        }
        self.id_to_name.push(name.to_string());
        self.name_to_id.insert(name.to_string(), id);
        Ok(true)
    }

    pub fn lookup_id(&self, name: &str) -> Option<u16> {
        self.name_to_id.get(name).copied()
    }

    pub fn lookup_name(&self, id: u16) -> Option<&str> {
        self.id_to_name
            .get(id as usize)
            .filter(|n| !n.is_empty())
            .map(String::as_str)
    }

    pub fn list_names(&self) -> impl Iterator<Item = &str> {
        self.id_to_name.iter().skip(1).map(String::as_str)
    }

    pub fn list_ids(&self) -> impl Iterator<Item = u16> + '_ {
        1..self.id_to_name.len() as u16
    }

    pub fn max_id(&self) -> u16 {
        self.id_to_name.len().saturating_sub(1) as u16
    }
}

/// A dense, per-slot array of entities of one type, with recyclable
/// slots tracked by a pair of compact bitsets.
#[derive(Debug)]
pub struct SlotTable<T> {
    entries: Vec<Option<T>>,
    live: BitVec,
    free: BitVec,
}

impl<T> Default for SlotTable<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            live: BitVec::new(),
            free: BitVec::new(),
        }
    }
}

impl<T> SlotTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves a slot: the minimum free slot if one exists, else a new
    /// slot appended to the array. The caller must follow with [`set`]
    /// to install the value.
    pub fn allocate(&mut self) -> u64 {
        if let Some(slot) = self.free.first_one() {
            self.free.set(slot, false);
            self.live.set(slot, true);
            slot as u64
        } else {
            let slot = self.entries.len();
            self.entries.push(None);
            self.live.push(true);
            self.free.push(false);
            slot as u64
        }
    }

    pub fn set(&mut self, slot: u64, value: T) {
        self.entries[slot as usize] = Some(value);
    }

    pub fn is_live(&self, slot: u64) -> bool {
        self.live.get(slot as usize).map(|b| *b).unwrap_or(false)
    }

    pub fn get(&self, slot: u64) -> Option<&T> {
        if !self.is_live(slot) {
            return None;
        }
        self.entries.get(slot as usize).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, slot: u64) -> Option<&mut T> {
        if !self.is_live(slot) {
            return None;
        }
        self.entries.get_mut(slot as usize).and_then(Option::as_mut)
    }

    /// Tombstones `slot`, returning the removed value if it was live.
    pub fn tombstone(&mut self, slot: u64) -> Option<T> {
        if !self.is_live(slot) {
            return None;
        }
        self.live.set(slot as usize, false);
        self.free.set(slot as usize, true);
        self.entries[slot as usize].take()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn live_count(&self) -> u64 {
        self.live.count_ones() as u64
    }

    pub fn free_count(&self) -> u64 {
        self.free.count_ones() as u64
    }
}

/// A name registry paired with one [`SlotTable`] per assigned type id.
#[derive(Debug)]
pub struct TypeCatalog<T> {
    registry: TypeRegistry,
    tables: Vec<SlotTable<T>>,
}

impl<T> Default for TypeCatalog<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TypeCatalog<T> {
    pub fn new() -> Self {
        Self {
            registry: TypeRegistry::new(),
            tables: vec![SlotTable::default()],
        }
    }

    fn grow_tables_to(&mut self, id: u16) {
        while self.tables.len() <= id as usize {
            self.tables.push(SlotTable::default());
        }
    }

    pub fn get_or_assign(&mut self, name: &str) -> Result<u16, Error> {
        let id = self.registry.get_or_assign(name)?;
        self.grow_tables_to(id);
        Ok(id)
    }

    pub fn assert(&mut self, name: &str, id: u16) -> Result<bool, Error> {
        let inserted = self.registry.assert(name, id)?;
        self.grow_tables_to(id);
        Ok(inserted)
    }

    pub fn lookup_id(&self, name: &str) -> Option<u16> {
        self.registry.lookup_id(name)
    }

    pub fn lookup_name(&self, id: u16) -> Option<&str> {
        self.registry.lookup_name(id)
    }

    pub fn list_names(&self) -> impl Iterator<Item = &str> {
        self.registry.list_names()
    }

    pub fn list_ids(&self) -> impl Iterator<Item = u16> + '_ {
        self.registry.list_ids()
    }

    pub fn count(&self, type_id: u16) -> u64 {
        self.table(type_id).map(SlotTable::live_count).unwrap_or(0)
    }

    pub fn table(&self, type_id: u16) -> Option<&SlotTable<T>> {
        self.tables.get(type_id as usize)
    }

    pub fn table_mut(&mut self, type_id: u16) -> Option<&mut SlotTable<T>> {
        self.tables.get_mut(type_id as usize)
    }

    pub fn is_registered(&self, type_id: u16) -> bool {
        type_id != 0 && (type_id as usize) < self.tables.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn first_type_gets_id_one() {
        let mut reg = TypeRegistry::new();
        assert_eq!(reg.get_or_assign("Person").unwrap(), 1);
        assert_eq!(reg.get_or_assign("Person").unwrap(), 1);
        assert_eq!(reg.get_or_assign("Company").unwrap(), 2);
        assert_eq!(reg.lookup_name(1), Some("Person"));
        assert_eq!(reg.lookup_name(2), Some("Company"));
        assert_eq!(reg.lookup_name(0), None);
    }

    #[test]
    fn assert_is_idempotent_on_exact_match() {
        let mut reg = TypeRegistry::new();
        assert_eq!(reg.assert("Person", 1), Ok(true));
        assert_eq!(reg.assert("Person", 1), Ok(false));
    }

    #[test]
    fn assert_rejects_conflicting_name() {
        let mut reg = TypeRegistry::new();
        reg.assert("Person", 1).unwrap();
        assert_eq!(
            reg.assert("Person", 2),
            Err(Error::NameConflict {
                name: "Person".to_string(),
                existing: 1,
                attempted: 2,
            })
        );
    }

    #[test]
    fn assert_rejects_conflicting_id() {
        let mut reg = TypeRegistry::new();
        reg.assert("Person", 1).unwrap();
        assert_eq!(
            reg.assert("Company", 1),
            Err(Error::IdConflict {
                id: 1,
                existing: "Person".to_string(),
                name: "Company".to_string(),
            })
        );
    }

    #[test]
    fn slot_table_recycles_minimum_free_slot() {
        let mut table: SlotTable<&'static str> = SlotTable::new();
        let a = table.allocate();
        table.set(a, "a");
        let b = table.allocate();
        table.set(b, "b");
        let c = table.allocate();
        table.set(c, "c");
        assert_eq!((a, b, c), (0, 1, 2));

        assert_eq!(table.tombstone(b), Some("b"));
        assert!(!table.is_live(b));
        assert_eq!(table.live_count(), 2);
        assert_eq!(table.free_count(), 1);

        let d = table.allocate();
        assert_eq!(d, b, "the freed slot must be recycled before appending");
        table.set(d, "d");
        assert_eq!(table.get(d), Some(&"d"));
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn slot_conservation_holds_across_churn() {
        let mut table: SlotTable<u32> = SlotTable::new();
        let mut slots = Vec::new();
        for i in 0..10 {
            let slot = table.allocate();
            table.set(slot, i);
            slots.push(slot);
        }
        for &slot in slots.iter().step_by(2) {
            table.tombstone(slot);
        }
        assert_eq!(table.live_count() + table.free_count(), table.len() as u64);

        for i in 0..5 {
            let slot = table.allocate();
            table.set(slot, 100 + i);
        }
        assert_eq!(table.live_count() + table.free_count(), table.len() as u64);
        assert_eq!(table.free_count(), 0);
    }

    #[test]
    fn type_catalog_grows_tables_with_registry() {
        let mut cat: TypeCatalog<u32> = TypeCatalog::new();
        let id = cat.get_or_assign("Node").unwrap();
        assert!(cat.table(id).is_some());
        assert_eq!(cat.count(id), 0);

        let slot = cat.table_mut(id).unwrap().allocate();
        cat.table_mut(id).unwrap().set(slot, 7);
        assert_eq!(cat.count(id), 1);
    }
}
