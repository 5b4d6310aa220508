//! The per-type property schema and its columnar storage.
//!
//! Each type (node type or relationship type) has its own schema
//! mapping `property name -> (property id, kind)` and, per property id,
//! a [`Column`] of that kind indexed by the same slot the owning
//! entity's type table uses. A property's kind is fixed the first time
//! it's registered and never changes afterward.

mod column;
pub mod json;
mod value;

pub use column::Column;
pub use value::{PropertyKind, TypedValue};

use fxhash::FxHashMap;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("property {name:?} is already registered as {existing}, cannot redeclare as {attempted}")]
    KindMismatch {
        name: String,
        existing: PropertyKind,
        attempted: PropertyKind,
    },
}

#[derive(Debug, Default)]
struct TypeSchema {
    by_name: FxHashMap<String, (u16, PropertyKind)>,
    columns: Vec<Column>,
}

/// Schema-on-write columnar property storage, one instance per entity
/// namespace (nodes or relationships — callers typically keep two).
#[derive(Debug, Default)]
pub struct PropertyCatalog {
    types: Vec<TypeSchema>,
}

impl PropertyCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_type(&mut self, type_id: u16) -> &mut TypeSchema {
        while self.types.len() <= type_id as usize {
            self.types.push(TypeSchema::default());
        }
        &mut self.types[type_id as usize]
    }

    /// Registers `name` as a property of `type_id` with the given kind.
    /// `current_len` is the owning type's entity-array length at the
    /// moment of registration: every already-allocated slot gets a
    /// tombstone in the new column so indexing stays in bounds for
    /// every live and freed slot alike.
    ///
    /// Returns `Ok(true)` if newly registered, `Ok(false)` if it exactly
    /// matches an already-registered property (idempotent), and `Err`
    /// if the name is taken with a different kind.
    pub fn schema_add(
        &mut self,
        type_id: u16,
        name: &str,
        kind: PropertyKind,
        current_len: usize,
    ) -> Result<bool, Error> {
        let schema = self.ensure_type(type_id);
        if let Some(&(_, existing)) = schema.by_name.get(name) {
            return if existing == kind {
                Ok(false)
            } else {
                Err(Error::KindMismatch {
                    name: name.to_string(),
                    existing,
                    attempted: kind,
                })
            };
        }
        let property_id = schema.columns.len() as u16;
        let mut column = Column::new(kind);
        column.resize_to(current_len);
        schema.columns.push(column);
        schema.by_name.insert(name.to_string(), (property_id, kind));
        Ok(true)
    }

    /// Grows every column of `type_id` to `len`, backfilling with each
    /// column's tombstone. Call this whenever the owning type's entity
    /// array grows past a slot that predates some of its properties.
    pub fn ensure_len(&mut self, type_id: u16, len: usize) {
        let schema = self.ensure_type(type_id);
        for column in schema.columns.iter_mut() {
            column.resize_to(len);
        }
    }

    pub fn schema(&self, type_id: u16) -> Vec<(&str, PropertyKind)> {
        self.types
            .get(type_id as usize)
            .map(|schema| {
                schema
                    .by_name
                    .iter()
                    .map(|(name, &(_, kind))| (name.as_str(), kind))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn get(&self, type_id: u16, slot: u64, name: &str) -> Option<TypedValue> {
        let schema = self.types.get(type_id as usize)?;
        let &(property_id, _) = schema.by_name.get(name)?;
        schema.columns[property_id as usize].get(slot as usize)
    }

    pub fn get_all(&self, type_id: u16, slot: u64) -> HashMap<String, TypedValue> {
        let mut out = HashMap::new();
        if let Some(schema) = self.types.get(type_id as usize) {
            for (name, &(property_id, _)) in schema.by_name.iter() {
                if let Some(value) = schema.columns[property_id as usize].get(slot as usize) {
                    out.insert(name.clone(), value);
                }
            }
        }
        out
    }

    /// Coerces `json_text` to the property's schema kind and writes it.
    /// Returns `false` (never an error) if the type or property is
    /// unknown, or the JSON value's kind can't coerce to the schema.
    pub fn set_from_json(&mut self, type_id: u16, slot: u64, name: &str, json_text: &str) -> bool {
        let Some(schema) = self.types.get(type_id as usize) else {
            return false;
        };
        let Some(&(property_id, kind)) = schema.by_name.get(name) else {
            return false;
        };
        let Some(value) = json::parse_and_coerce(json_text, kind) else {
            return false;
        };
        self.types.get_mut(type_id as usize).unwrap().columns[property_id as usize]
            .set(slot as usize, value)
    }

    pub fn set(&mut self, type_id: u16, slot: u64, name: &str, value: TypedValue) -> bool {
        let Some(schema) = self.types.get(type_id as usize) else {
            return false;
        };
        let Some(&(property_id, kind)) = schema.by_name.get(name) else {
            return false;
        };
        if value.kind() != kind {
            return false;
        }
        self.types.get_mut(type_id as usize).unwrap().columns[property_id as usize]
            .set(slot as usize, value)
    }

    /// Writes `name`'s tombstone at `slot`. Returns `true` iff the type
    /// and property were both known and `slot` was in bounds.
    pub fn delete(&mut self, type_id: u16, slot: u64, name: &str) -> bool {
        let Some(schema) = self.types.get(type_id as usize) else {
            return false;
        };
        let Some(&(property_id, _)) = schema.by_name.get(name) else {
            return false;
        };
        self.types.get_mut(type_id as usize).unwrap().columns[property_id as usize]
            .delete(slot as usize)
    }

    /// Tombstones every registered property of `type_id` at `slot`.
    pub fn delete_all(&mut self, type_id: u16, slot: u64) -> bool {
        let Some(schema) = self.types.get_mut(type_id as usize) else {
            return false;
        };
        for column in schema.columns.iter_mut() {
            column.delete(slot as usize);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn schema_add_is_idempotent_and_rejects_kind_change() {
        let mut cat = PropertyCatalog::new();
        assert_eq!(cat.schema_add(1, "age", PropertyKind::I64, 0), Ok(true));
        assert_eq!(cat.schema_add(1, "age", PropertyKind::I64, 0), Ok(false));
        assert_eq!(
            cat.schema_add(1, "age", PropertyKind::F64, 0),
            Err(Error::KindMismatch {
                name: "age".to_string(),
                existing: PropertyKind::I64,
                attempted: PropertyKind::F64,
            })
        );
    }

    #[test]
    fn schema_add_backfills_existing_slots() {
        let mut cat = PropertyCatalog::new();
        cat.schema_add(1, "age", PropertyKind::I64, 3).unwrap();
        assert_eq!(cat.get(1, 0, "age"), Some(TypedValue::I64(i64::MIN)));
        assert_eq!(cat.get(1, 2, "age"), Some(TypedValue::I64(i64::MIN)));
        assert_eq!(cat.get(1, 3, "age"), None);
    }

    #[test]
    fn get_set_delete_round_trip() {
        let mut cat = PropertyCatalog::new();
        cat.schema_add(1, "age", PropertyKind::I64, 0).unwrap();
        cat.ensure_len(1, 1);

        assert!(cat.set_from_json(1, 0, "age", "99"));
        assert_eq!(cat.get(1, 0, "age"), Some(TypedValue::I64(99)));

        assert!(cat.set_from_json(1, 0, "age", "55"));
        assert_eq!(cat.get(1, 0, "age"), Some(TypedValue::I64(55)));

        assert!(cat.delete(1, 0, "age"));
        assert_eq!(cat.get(1, 0, "age"), Some(TypedValue::I64(i64::MIN)));

        assert!(!cat.delete(1, 0, "not_there"));
        assert_eq!(cat.get(1, 0, "not_there"), None);
    }

    #[test]
    fn unknown_type_or_property_fails_without_panicking() {
        let mut cat = PropertyCatalog::new();
        assert!(!cat.set_from_json(9, 0, "age", "1"));
        assert_eq!(cat.get(9, 0, "age"), None);
        assert!(!cat.delete(9, 0, "age"));
    }

    #[test]
    fn delete_all_tombstones_every_property() {
        let mut cat = PropertyCatalog::new();
        cat.schema_add(1, "age", PropertyKind::I64, 0).unwrap();
        cat.schema_add(1, "name", PropertyKind::Str, 0).unwrap();
        cat.ensure_len(1, 1);
        cat.set(1, 0, "age", TypedValue::I64(40));
        cat.set(1, 0, "name", TypedValue::Str("a".to_string()));

        assert!(cat.delete_all(1, 0));
        assert_eq!(cat.get(1, 0, "age"), Some(TypedValue::I64(i64::MIN)));
        assert_eq!(cat.get(1, 0, "name"), Some(TypedValue::Str(String::new())));
    }
}
