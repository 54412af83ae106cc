//! The transaction pool actor
//! ("Mempool is maintained by a separate transaction-pool actor; on
//! block-connect it evicts confirmed txs and re-validates the remainder
//! (conflicts are dropped)").
//!
//! Grounded on the same shape `mvs_state::Store` and
//! `mvs_consensus::transaction::check` already establish: a plain
//! synchronous struct over a `HashMap`, validated via
//! the same `check_stateless`/`check_stateful` calls the block validator
//! uses, just against the current tip instead of a candidate block.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use mvs_chain::{parameters::Network, transaction::Transaction};
use mvs_chain::{parameters::ChainParams, transparent};
use mvs_consensus::transaction::check;
use mvs_state::Store;

/// Held transactions not yet included in a block, keyed by hash.
#[derive(Default)]
pub struct Mempool {
    transactions: HashMap<mvs_chain::transaction::Hash, Arc<Transaction>>,
}

impl Mempool {
    pub fn new() -> Self {
        Mempool::default()
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn contains(&self, hash: &mvs_chain::transaction::Hash) -> bool {
        self.transactions.contains_key(hash)
    }

    pub fn get(&self, hash: &mvs_chain::transaction::Hash) -> Option<Arc<Transaction>> {
        self.transactions.get(hash).cloned()
    }

    /// Every transaction currently held, in no particular order.
    pub fn transactions(&self) -> impl Iterator<Item = &Arc<Transaction>> {
        self.transactions.values()
    }

    /// Validates `tx` against `store`'s current tip and, if it passes,
    /// adds it to the pool. Returns the validation error otherwise,
    /// without inserting.
    pub fn insert(
        &mut self,
        tx: Arc<Transaction>,
        store: &Store,
        network: Network,
        params: ChainParams,
    ) -> Result<(), mvs_consensus::TransactionError> {
        check::check_stateless(&tx, &params, false)?;

        let height = store
            .tip()
            .ok()
            .flatten()
            .map(|(height, _)| height)
            .and_then(|height| height.next())
            .unwrap_or(mvs_chain::block::Height(0));

        let ctx = check::Context {
            store,
            network,
            params,
            height,
            median_time_past: Utc::now(),
        };
        check::check_stateful(&tx, &ctx)?;

        self.transactions.insert(tx.hash(), tx);
        Ok(())
    }

    /// Removes every transaction `block` confirmed, then drops whichever
    /// of the remainder now conflict with the confirmed set (spend an
    /// output the confirmed transactions already consumed) -- the
    /// "evicts confirmed txs and re-validates the remainder (conflicts
    /// are dropped)" rule.
    pub fn evict_confirmed(&mut self, block: &mvs_chain::block::Block) {
        let mut spent = std::collections::HashSet::new();
        for tx in &block.transactions {
            self.transactions.remove(&tx.hash());
            for input in &tx.inputs {
                if let transparent::Input::PrevOut { outpoint, .. } = input {
                    spent.insert(*outpoint);
                }
            }
        }

        self.transactions.retain(|_, tx| {
            !tx.inputs.iter().any(|input| match input {
                transparent::Input::PrevOut { outpoint, .. } => spent.contains(outpoint),
                transparent::Input::Coinbase { .. } => false,
            })
        });
    }

    /// Returns every held transaction freed by popping a block off the
    /// main chain (excluding its coinbase/coinstake, which can't be
    /// resubmitted), for the caller to try re-inserting.
    pub fn reinstate_candidates(block: &mvs_chain::block::Block) -> Vec<Arc<Transaction>> {
        block
            .transactions
            .iter()
            .skip(if block.has_coinstake() { 2 } else { 1 })
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reinstate_candidates_skips_coinbase() {
        mvs_test::init();
        let block = mvs_chain::parameters::genesis_block(Network::Mainnet);
        let candidates = Mempool::reinstate_candidates(&block);
        assert!(candidates.is_empty());
    }
}
