use std::collections::HashMap;

use crate::foundation::error::{NebulaError, NebulaResult};

/// Holds out-of-order results until the next expected index arrives.
#[derive(Debug)]
pub(crate) struct ReorderBuffer<T> {
    next: u64,
    pending: HashMap<u64, T>,
}

impl<T> ReorderBuffer<T> {
    pub(crate) fn new(start: u64) -> Self {
        Self {
            next: start,
            pending: HashMap::new(),
        }
    }

    /// Index the buffer is waiting for.
    pub(crate) fn next(&self) -> u64 {
        self.next
    }

    pub(crate) fn insert(&mut self, idx: u64, item: T) -> NebulaResult<()> {
        if idx < self.next || self.pending.contains_key(&idx) {
            return Err(NebulaError::encoder_write(format!(
                "frame {idx} delivered twice to the reorder buffer"
            )));
        }
        self.pending.insert(idx, item);
        Ok(())
    }

    /// Take the item at the expected index, if it has arrived, and advance.
    pub(crate) fn pop_ready(&mut self) -> Option<T> {
        let item = self.pending.remove(&self.next)?;
        self.next += 1;
        Some(item)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/reorder.rs"]
mod tests;
