use std::collections::HashMap;

use crate::catalog::ObjectId;

/// Tracks catalog objects held by running statements. Dropping a held
/// object fails.
#[derive(Debug, Default)]
pub struct DdlLockManager {
    in_use: HashMap<ObjectId, usize>,
}

impl DdlLockManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&mut self, id: ObjectId) {
        *self.in_use.entry(id).or_insert(0) += 1;
    }

    pub fn release(&mut self, id: ObjectId) {
        if let Some(count) = self.in_use.get_mut(&id) {
            *count -= 1;
            if *count == 0 {
                self.in_use.remove(&id);
            }
        }
    }

    pub fn is_object_in_use(&self, id: ObjectId) -> bool {
        self.in_use.contains_key(&id)
    }
}
