//! Row storage pool.

use crate::protocol::types::Storage;

/// Allocation counters of a [`RowPool`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Row storages created because the pool was empty.
    pub allocated: usize,
    /// Rents served from a returned storage.
    pub reused: usize,
    /// Storages currently idle in the pool.
    pub idle: usize,
}

/// Free list of row storages.
///
/// Rows fetched ahead of the consumer are kept as `Vec<Storage>`; once a row
/// has been handed out its vector comes back here, so a statement allocates
/// at most as many storages as rows it ever had queued at once.
#[derive(Debug, Default)]
pub(crate) struct RowPool {
    free: Vec<Vec<Storage>>,
    allocated: usize,
    reused: usize,
}

impl RowPool {
    /// Take a cleared storage with room for `width` values.
    pub fn rent(&mut self, width: usize) -> Vec<Storage> {
        match self.free.pop() {
            Some(mut row) => {
                self.reused += 1;
                row.clear();
                row.reserve(width);
                row
            }
            None => {
                self.allocated += 1;
                Vec::with_capacity(width)
            }
        }
    }

    /// Return a storage; its values are dropped.
    pub fn give_back(&mut self, mut row: Vec<Storage>) {
        row.clear();
        self.free.push(row);
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            allocated: self.allocated,
            reused: self.reused,
            idle: self.free.len(),
        }
    }
}
