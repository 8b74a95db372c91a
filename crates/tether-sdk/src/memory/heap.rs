//! Arena heap backing [`MemoryRealm`](super::MemoryRealm)
//!
//! Cells are never freed; they live as long as the realm.

use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::error::{BridgeError, BridgeResult};
use crate::realm::NativeCallback;
use crate::value::{ForeignType, ForeignValue, Handle};

/// Insertion-ordered property table.
#[derive(Default, Clone)]
pub(crate) struct Properties {
    entries: Vec<(String, ForeignValue)>,
    index: FxHashMap<String, usize>,
}

impl Properties {
    pub(crate) fn get(&self, key: &str) -> Option<ForeignValue> {
        self.index.get(key).map(|&i| self.entries[i].1)
    }

    pub(crate) fn set(&mut self, key: &str, value: ForeignValue) {
        match self.index.get(key) {
            Some(&i) => self.entries[i].1 = value,
            None => {
                self.index.insert(key.to_string(), self.entries.len());
                self.entries.push((key.to_string(), value));
            }
        }
    }

    pub(crate) fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|(k, _)| k.clone()).collect()
    }

    pub(crate) fn entries(&self) -> &[(String, ForeignValue)] {
        &self.entries
    }
}

/// A heap-allocated foreign value.
pub(crate) enum HeapCell {
    String(Rc<str>),
    Symbol(String),
    Array(Vec<ForeignValue>),
    Object(Properties),
    Function {
        name: String,
        callback: NativeCallback,
        properties: Properties,
    },
}

impl HeapCell {
    pub(crate) fn foreign_type(&self) -> ForeignType {
        match self {
            HeapCell::String(_) => ForeignType::String,
            HeapCell::Symbol(_) => ForeignType::Symbol,
            HeapCell::Array(_) | HeapCell::Object(_) => ForeignType::Object,
            HeapCell::Function { .. } => ForeignType::Function,
        }
    }
}

#[derive(Default)]
pub(crate) struct Heap {
    cells: Vec<HeapCell>,
}

impl Heap {
    pub(crate) fn alloc(&mut self, cell: HeapCell) -> ForeignValue {
        let index = self.cells.len() as u32;
        self.cells.push(cell);
        ForeignValue::Ref(Handle::from_index(index))
    }

    pub(crate) fn get(&self, handle: Handle) -> BridgeResult<&HeapCell> {
        self.cells
            .get(handle.index() as usize)
            .ok_or(BridgeError::InvalidHandle(handle.index()))
    }

    pub(crate) fn get_mut(&mut self, handle: Handle) -> BridgeResult<&mut HeapCell> {
        self.cells
            .get_mut(handle.index() as usize)
            .ok_or(BridgeError::InvalidHandle(handle.index()))
    }

    pub(crate) fn len(&self) -> usize {
        self.cells.len()
    }
}
