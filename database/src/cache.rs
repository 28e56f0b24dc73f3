use parking_lot::RwLock;
use std::collections::HashMap;

use consensus_core::Hash;

use crate::model::BlockId;

/// Layout data of a stored block, enough to answer existence, id and
/// height lookups without touching SQLite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedBlock {
    pub id: BlockId,
    pub height: u64,
    pub height_group_index: u64,
}

/// Bounded hash -> block lookup cache.
///
/// Entries are only ever added for rows that exist in the database. The cache
/// must be cleared whenever a transaction that populated it is rolled back.
pub struct BlockCache {
    capacity: usize,
    entries: RwLock<HashMap<Hash, CachedBlock>>,
}

impl BlockCache {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, entries: RwLock::new(HashMap::new()) }
    }

    pub fn get(&self, hash: &Hash) -> Option<CachedBlock> {
        self.entries.read().get(hash).copied()
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.entries.read().contains_key(hash)
    }

    pub fn insert(&self, hash: Hash, block: CachedBlock) {
        if self.capacity == 0 {
            return;
        }
        let mut entries = self.entries.write();
        if entries.len() >= self.capacity && !entries.contains_key(&hash) {
            // simple eviction: remove an arbitrary key, misses fall through to the database
            if let Some(evicted) = entries.keys().next().copied() {
                entries.remove(&evicted);
            }
        }
        entries.insert(hash, block);
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
