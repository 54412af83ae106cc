//! The capacity-bounded orphan pool: blocks whose
//! parent hasn't arrived (or landed in the main chain) yet, indexed by
//! parent hash so a newly connected block can cheaply find its waiting
//! children.
//!
//! Grounded on the `queued_by_prev_hash: HashMap<block::Hash,
//! QueuedBlock>` plus drain-loop shape a checkpoint-syncing finalized
//! state uses -- generalized from a single pending slot per parent hash
//! (a checkpoint-sync use case never has two blocks racing for the same
//! parent) to a capacity-bounded pool that can hold a handful of
//! competing chains at once, since this organizer also has to handle
//! reorgs rather than just catch-up
//! sync.

use std::collections::HashMap;
use std::sync::Arc;

use mvs_chain::block::{self, Block};

/// Blocks that arrived before their parent did (or before their parent
/// reached the main chain), indexed by parent hash.
///
/// Capacity-bounded: once `capacity` orphans are held, the oldest (by
/// insertion order) is evicted to make room for a new one. This bounds
/// memory against a peer flooding us with disconnected blocks.
pub struct OrphanPool {
    capacity: usize,
    by_hash: HashMap<block::Hash, Arc<Block>>,
    by_parent: HashMap<block::Hash, Vec<block::Hash>>,
    insertion_order: std::collections::VecDeque<block::Hash>,
}

impl OrphanPool {
    pub fn new(capacity: usize) -> Self {
        OrphanPool {
            capacity,
            by_hash: HashMap::new(),
            by_parent: HashMap::new(),
            insertion_order: std::collections::VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }

    pub fn contains(&self, hash: &block::Hash) -> bool {
        self.by_hash.contains_key(hash)
    }

    /// Inserts `block` into the pool, evicting the oldest orphan first if
    /// `capacity` is already full.
    pub fn insert(&mut self, block: Arc<Block>) {
        let hash = block.hash();
        if self.by_hash.contains_key(&hash) {
            return;
        }
        if self.insertion_order.len() >= self.capacity {
            if let Some(evicted) = self.insertion_order.pop_front() {
                self.remove(&evicted);
            }
        }

        let parent = block.header.previous_block_hash;
        self.by_parent.entry(parent).or_default().push(hash);
        self.insertion_order.push_back(hash);
        self.by_hash.insert(hash, block);
    }

    /// Removes and returns every orphan directly parented on `parent`,
    /// draining them from both indexes.
    pub fn take_children(&mut self, parent: &block::Hash) -> Vec<Arc<Block>> {
        let hashes = match self.by_parent.remove(parent) {
            Some(hashes) => hashes,
            None => return Vec::new(),
        };
        hashes
            .into_iter()
            .filter_map(|hash| {
                self.insertion_order
                    .iter()
                    .position(|h| *h == hash)
                    .map(|index| {
                        self.insertion_order.remove(index);
                    });
                self.by_hash.remove(&hash)
            })
            .collect()
    }

    fn remove(&mut self, hash: &block::Hash) {
        if let Some(block) = self.by_hash.remove(hash) {
            if let Some(siblings) = self.by_parent.get_mut(&block.header.previous_block_hash) {
                siblings.retain(|h| h != hash);
                if siblings.is_empty() {
                    self.by_parent.remove(&block.header.previous_block_hash);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mvs_chain::parameters::{genesis_block, Network};

    fn sample_block(previous_block_hash: block::Hash, number: u32) -> Arc<Block> {
        let mut block = genesis_block(Network::Mainnet);
        block.header.previous_block_hash = previous_block_hash;
        block.header.number = number;
        Arc::new(block)
    }

    #[test]
    fn take_children_returns_only_direct_children() {
        let mut pool = OrphanPool::new(8);
        let parent = block::Hash([1u8; 32]);
        let child = sample_block(parent, 5);
        let child_hash = child.hash();
        pool.insert(child);

        let unrelated = sample_block(block::Hash([9u8; 32]), 6);
        pool.insert(unrelated);

        assert_eq!(pool.len(), 2);
        let children = pool.take_children(&parent);
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].hash(), child_hash);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn capacity_evicts_oldest_orphan() {
        let mut pool = OrphanPool::new(1);
        let first = sample_block(block::Hash([1u8; 32]), 1);
        let first_hash = first.hash();
        pool.insert(first);

        let second = sample_block(block::Hash([2u8; 32]), 2);
        pool.insert(second);

        assert_eq!(pool.len(), 1);
        assert!(!pool.contains(&first_hash));
    }
}
