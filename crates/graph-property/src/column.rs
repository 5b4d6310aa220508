use crate::value::{PropertyKind, TypedValue};

/// A single property's dense, slot-indexed storage. Always holds exactly
/// one value per allocated slot of the owning type, so indexing by slot
/// never has to branch on presence.
#[derive(Debug, Clone)]
pub enum Column {
    Bool(Vec<bool>),
    I64(Vec<i64>),
    F64(Vec<f64>),
    Str(Vec<String>),
    BoolList(Vec<Vec<bool>>),
    I64List(Vec<Vec<i64>>),
    F64List(Vec<Vec<f64>>),
    StrList(Vec<Vec<String>>),
}

impl Column {
    pub fn new(kind: PropertyKind) -> Column {
        match kind {
            PropertyKind::Bool => Column::Bool(Vec::new()),
            PropertyKind::I64 => Column::I64(Vec::new()),
            PropertyKind::F64 => Column::F64(Vec::new()),
            PropertyKind::Str => Column::Str(Vec::new()),
            PropertyKind::BoolList => Column::BoolList(Vec::new()),
            PropertyKind::I64List => Column::I64List(Vec::new()),
            PropertyKind::F64List => Column::F64List(Vec::new()),
            PropertyKind::StrList => Column::StrList(Vec::new()),
        }
    }

    pub fn kind(&self) -> PropertyKind {
        match self {
            Column::Bool(_) => PropertyKind::Bool,
            Column::I64(_) => PropertyKind::I64,
            Column::F64(_) => PropertyKind::F64,
            Column::Str(_) => PropertyKind::Str,
            Column::BoolList(_) => PropertyKind::BoolList,
            Column::I64List(_) => PropertyKind::I64List,
            Column::F64List(_) => PropertyKind::F64List,
            Column::StrList(_) => PropertyKind::StrList,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Column::Bool(v) => v.len(),
            Column::I64(v) => v.len(),
            Column::F64(v) => v.len(),
            Column::Str(v) => v.len(),
            Column::BoolList(v) => v.len(),
            Column::I64List(v) => v.len(),
            Column::F64List(v) => v.len(),
            Column::StrList(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Grows the column up to `len`, filling new cells with this kind's
    /// tombstone. A no-op if the column is already at least `len` long.
    pub fn resize_to(&mut self, len: usize) {
        let kind = self.kind();
        macro_rules! grow {
            ($vec:expr, $fill:expr) => {
                while $vec.len() < len {
                    $vec.push($fill);
                }
            };
        }
        match self {
            Column::Bool(v) => grow!(v, false),
            Column::I64(v) => grow!(v, i64::MIN),
            Column::F64(v) => grow!(v, f64::MIN),
            Column::Str(v) => grow!(v, String::new()),
            Column::BoolList(v) => grow!(v, Vec::new()),
            Column::I64List(v) => grow!(v, Vec::new()),
            Column::F64List(v) => grow!(v, Vec::new()),
            Column::StrList(v) => grow!(v, Vec::new()),
        }
        debug_assert_eq!(self.kind(), kind);
    }

    pub fn get(&self, slot: usize) -> Option<TypedValue> {
        match self {
            Column::Bool(v) => v.get(slot).copied().map(TypedValue::Bool),
            Column::I64(v) => v.get(slot).copied().map(TypedValue::I64),
            Column::F64(v) => v.get(slot).copied().map(TypedValue::F64),
            Column::Str(v) => v.get(slot).cloned().map(TypedValue::Str),
            Column::BoolList(v) => v.get(slot).cloned().map(TypedValue::BoolList),
            Column::I64List(v) => v.get(slot).cloned().map(TypedValue::I64List),
            Column::F64List(v) => v.get(slot).cloned().map(TypedValue::F64List),
            Column::StrList(v) => v.get(slot).cloned().map(TypedValue::StrList),
        }
    }

    /// Writes `value` at `slot`. Returns `false` if `value`'s kind
    /// doesn't match the column's kind, or `slot` is out of bounds.
    pub fn set(&mut self, slot: usize, value: TypedValue) -> bool {
        match (self, value) {
            (Column::Bool(v), TypedValue::Bool(x)) => Self::write(v, slot, x),
            (Column::I64(v), TypedValue::I64(x)) => Self::write(v, slot, x),
            (Column::F64(v), TypedValue::F64(x)) => Self::write(v, slot, x),
            (Column::Str(v), TypedValue::Str(x)) => Self::write(v, slot, x),
            (Column::BoolList(v), TypedValue::BoolList(x)) => Self::write(v, slot, x),
            (Column::I64List(v), TypedValue::I64List(x)) => Self::write(v, slot, x),
            (Column::F64List(v), TypedValue::F64List(x)) => Self::write(v, slot, x),
            (Column::StrList(v), TypedValue::StrList(x)) => Self::write(v, slot, x),
            _ => false,
        }
    }

    fn write<T>(column: &mut [T], slot: usize, value: T) -> bool {
        match column.get_mut(slot) {
            Some(cell) => {
                *cell = value;
                true
            }
            None => false,
        }
    }

    /// Overwrites `slot` with this column's tombstone. Returns `false`
    /// if `slot` is out of bounds.
    pub fn delete(&mut self, slot: usize) -> bool {
        let tombstone = TypedValue::tombstone(self.kind());
        self.set(slot, tombstone)
    }
}
