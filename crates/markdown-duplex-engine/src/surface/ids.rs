use std::collections::HashMap;

use uuid::Uuid;

/// Side table of stable block identifiers.
///
/// Identifiers live outside the tree nodes so the tree's shape stays owned by
/// the surface. Positions follow the tree's top-level order; the id → index
/// map is rebuilt after every mutation.
#[derive(Debug, Clone, Default)]
pub struct BlockIds {
    ids: Vec<Uuid>,
    index: HashMap<Uuid, usize>,
}

impl BlockIds {
    /// Fresh identifiers for `count` blocks.
    pub fn fresh(count: usize) -> Self {
        let mut table = Self {
            ids: (0..count).map(|_| Uuid::new_v4()).collect(),
            index: HashMap::new(),
        };
        table.rebuild();
        table
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn id_at(&self, index: usize) -> Option<Uuid> {
        self.ids.get(index).copied()
    }

    pub fn index_of(&self, id: Uuid) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// Allocate an identifier for a block inserted at `index`.
    pub fn insert(&mut self, index: usize) -> Uuid {
        let id = Uuid::new_v4();
        self.ids.insert(index.min(self.ids.len()), id);
        self.rebuild();
        id
    }

    pub fn remove(&mut self, index: usize) -> Option<Uuid> {
        if index >= self.ids.len() {
            return None;
        }
        let id = self.ids.remove(index);
        self.rebuild();
        Some(id)
    }

    fn rebuild(&mut self) {
        self.index = self
            .ids
            .iter()
            .enumerate()
            .map(|(i, id)| (*id, i))
            .collect();
    }
}
