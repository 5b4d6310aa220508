use fxhash::FxHashMap as HashMap;

/// Per-type `key -> external id` lookup, used by [`crate::NodeStore`] to
/// enforce key uniqueness within a type and to resolve business keys to
/// ids without a linear scan.
#[derive(Debug, Default)]
pub struct KeyIndex {
    tables: Vec<HashMap<String, u64>>,
}

impl KeyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_type(&mut self, type_id: u16) -> &mut HashMap<String, u64> {
        while self.tables.len() <= type_id as usize {
            self.tables.push(HashMap::default());
        }
        &mut self.tables[type_id as usize]
    }

    pub fn get(&self, type_id: u16, key: &str) -> Option<u64> {
        self.tables.get(type_id as usize)?.get(key).copied()
    }

    pub fn contains(&self, type_id: u16, key: &str) -> bool {
        self.get(type_id, key).is_some()
    }

    pub fn insert(&mut self, type_id: u16, key: &str, id: u64) {
        self.ensure_type(type_id).insert(key.to_string(), id);
    }

    pub fn remove(&mut self, type_id: u16, key: &str) {
        if let Some(table) = self.tables.get_mut(type_id as usize) {
            table.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_get_remove() {
        let mut idx = KeyIndex::new();
        idx.insert(1, "alice", 1024);
        assert_eq!(idx.get(1, "alice"), Some(1024));
        assert!(idx.contains(1, "alice"));
        assert_eq!(idx.get(1, "bob"), None);
        assert_eq!(idx.get(2, "alice"), None);

        idx.remove(1, "alice");
        assert_eq!(idx.get(1, "alice"), None);
    }
}
