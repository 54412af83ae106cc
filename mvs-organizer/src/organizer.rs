//! The organizer: receives candidate blocks, validates
//! them context-free, connects them to the main chain when their parent
//! is the current tip, queues them in the [`OrphanPool`] otherwise, and
//! reorganizes the main chain when a queued chain accumulates more work.
//!
//! Grounded on a checkpoint-syncing finalized-state's queue-and-drain
//! shape for the orphan side, and on
//! `mvs_consensus::block::check`/`transaction::check` for every
//! validation call; the reorg and mempool-eviction paths have no close
//! counterpart to build from (checkpoint-sync alone never reorgs) and are
//! built fresh as a five-step receive algorithm.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use primitive_types::U256;

use mvs_chain::{
    block::{self, Block, Header, Height},
    parameters::{ChainParams, Network},
    transaction::Transaction,
    transparent::{self, Output},
};
use mvs_consensus::block::check;
use mvs_state::{HashOrHeight, Store};

use crate::error::OrganizerError;
use crate::mempool::Mempool;
use crate::notify::Broadcast;
use crate::orphan::OrphanPool;

/// The side information the organizer can't derive from [`Store`] alone,
/// supplied by the caller driving block ingestion (typically the network
/// sync task) for each consensus mode.
///
/// See `DESIGN.md` for why each of these is a caller input rather than
/// something this crate computes: none of the underlying enumeration
/// indexes (an address's controlled outputs, the recent stake-reuse
/// window, the current epoch's witness candidates) exist in `mvs-state`
/// yet.
pub enum ConsensusContext {
    ProofOfWork,
    ProofOfStake {
        stake_output_height: Height,
        controlled_outputs: Vec<Output>,
        recently_used_stakes: HashSet<transparent::OutPoint>,
    },
    DelegatedProofOfStake {
        epoch_start: DateTime<Utc>,
        candidates: Vec<check::WitnessCandidate>,
    },
}

/// What happened to a submitted block.
#[derive(Debug)]
pub enum SubmitOutcome {
    /// Connected directly to the tip (and possibly drained some orphans).
    Connected { height: Height, drained_orphans: usize },
    /// Parent not the current tip; held for later.
    Queued,
    /// Connected after reorganizing away from the previous tip.
    Reorganized(ReorgEvent),
}

/// What changed during a reorg, delivered to `subscribe_reorganize`
/// handlers.
#[derive(Debug, Clone)]
pub struct ReorgEvent {
    pub added: Vec<Arc<Block>>,
    pub removed: Vec<Arc<Block>>,
    pub fork_height: Height,
}

pub struct Organizer {
    store: Store,
    network: Network,
    params: ChainParams,
    orphans: OrphanPool,
    mempool: Mempool,
    reorg_subscribers: Broadcast<ReorgEvent>,
}

impl Organizer {
    pub fn new(store: Store, network: Network) -> Self {
        Organizer {
            store,
            params: ChainParams::for_network(network),
            network,
            orphans: OrphanPool::new(256),
            mempool: Mempool::new(),
            reorg_subscribers: Broadcast::new(32),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn mempool(&self) -> &Mempool {
        &self.mempool
    }

    pub fn mempool_mut(&mut self) -> &mut Mempool {
        &mut self.mempool
    }

    /// Validates and inserts a candidate transaction into the mempool,
    /// against the current tip.
    pub fn submit_transaction(
        &mut self,
        tx: Arc<Transaction>,
    ) -> Result<(), mvs_consensus::TransactionError> {
        self.mempool
            .insert(tx, &self.store, self.network, self.params.clone())
    }

    pub fn subscribe_reorganize(&self) -> tokio::sync::broadcast::Receiver<ReorgEvent> {
        self.reorg_subscribers.subscribe()
    }

    /// Validates, connects, or queues a candidate block.
    pub fn submit_block(
        &mut self,
        block: Arc<Block>,
        ctx: ConsensusContext,
    ) -> Result<SubmitOutcome, OrganizerError> {
        self.validate_context_free(&block)?;

        let tip_hash = self.store.tip_hash()?;
        if block.header.previous_block_hash == tip_hash {
            let height = self.connect_block(&block, &ctx)?;
            let drained = self.drain_orphans(block.hash())?;
            return Ok(SubmitOutcome::Connected {
                height,
                drained_orphans: drained,
            });
        }

        // Queue every disconnected block regardless of whether its parent
        // is already known: an orphan with no currently-known root might
        // gain one once its own parent arrives later.
        self.orphans.insert(block.clone());
        if let Some(reorg) = self.try_reorg_from(block.header.previous_block_hash)? {
            return Ok(SubmitOutcome::Reorganized(reorg));
        }
        Ok(SubmitOutcome::Queued)
    }

    /// Header-shape and body-shape checks that don't need chain context,
    /// plus the consensus-mode-specific checks this organizer can run
    /// without caller-supplied context (proof-of-work only; see
    /// [`ConsensusContext`]).
    fn validate_context_free(&self, block: &Block) -> Result<(), OrganizerError> {
        check::coinbase_is_first(block)?;

        let tx_hashes: Vec<_> = block.transactions.iter().map(|tx| tx.hash()).collect();
        check::merkle_root_validity(block, &tx_hashes)?;

        let height = block.coinbase_height().unwrap_or(Height(0));
        let hash = block.hash();
        check::time_is_valid_at(&block.header, Utc::now(), &height, &hash)
            .map_err(mvs_consensus::BlockError::from)?;

        if let Some(median) = self.median_time_past(height) {
            check::time_is_after_median(&block.header, median)?;
        }

        if let Some(recent) = self.recent_versions(height, self.params.max_consecutive_version_blocks) {
            check::successive_version_is_within_cap(
                &recent,
                block.header.version,
                self.params.max_consecutive_version_blocks,
            )?;
        }

        Ok(())
    }

    /// Runs the transaction validator over every non-coinbase transaction
    /// in `block` against the view at the current tip, checks the
    /// consensus-mode-specific block rules, checks the subsidy, and (on
    /// success) commits the block and evicts its transactions from the
    /// mempool.
    fn connect_block(
        &mut self,
        block: &Arc<Block>,
        ctx: &ConsensusContext,
    ) -> Result<Height, OrganizerError> {
        let height = block.coinbase_height().unwrap_or(Height(0));
        let hash = block.hash();

        match block.header.consensus_version() {
            Some(block::Version::ProofOfWork) => {
                check::difficulty_is_valid(&block.header, self.network, &height, &hash)?;
            }
            Some(block::Version::ProofOfStake) => {
                self.check_proof_of_stake(block, &height, ctx)?;
            }
            Some(block::Version::DelegatedProofOfStake) => {
                self.check_delegated_proof_of_stake(block, ctx)?;
            }
            None => return Err(OrganizerError::UnknownVersion(block.header.version)),
        }

        let median_time_past = self.median_time_past(height).unwrap_or(block.header.time);
        let mut fees = mvs_chain::amount::Amount::<mvs_chain::amount::NonNegative>::zero();
        let skip_first = if block.has_coinstake() { 2 } else { 1 };
        for tx in block.transactions.iter().skip(skip_first) {
            mvs_consensus::transaction::check::check_stateless(tx, &self.params, true)?;
            let tx_ctx = mvs_consensus::transaction::check::Context {
                store: &self.store,
                network: self.network,
                params: self.params,
                height,
                median_time_past,
            };
            let verified = mvs_consensus::transaction::check::check_stateful(tx, &tx_ctx)?;
            fees = fees
                .checked_add(verified.fee)
                .ok_or(mvs_consensus::TransactionError::OutputValueOverflow)?;
        }

        check::subsidy_is_valid(block, fees)?;

        self.store.push_block(block.clone())?;
        self.mempool.evict_confirmed(block);

        Ok(height)
    }

    fn check_proof_of_stake(
        &self,
        block: &Block,
        height: &Height,
        ctx: &ConsensusContext,
    ) -> Result<(), OrganizerError> {
        let (stake_output_height, controlled_outputs, recently_used) = match ctx {
            ConsensusContext::ProofOfStake {
                stake_output_height,
                controlled_outputs,
                recently_used_stakes,
            } => (*stake_output_height, controlled_outputs, recently_used_stakes),
            _ => return Err(OrganizerError::MissingStakeContext),
        };

        let coinstake = block
            .transactions
            .get(1)
            .filter(|tx| tx.is_coinstake())
            .ok_or(mvs_consensus::BlockError::BadProofOfStake {
                reason: "second transaction is not a valid coinstake",
            })?;

        let stake_input = coinstake
            .inputs
            .get(0)
            .ok_or(mvs_consensus::BlockError::BadProofOfStake {
                reason: "coinstake has no input",
            })?;
        let stake_outpoint = match stake_input {
            transparent::Input::PrevOut { outpoint, .. } => outpoint,
            transparent::Input::Coinbase { .. } => {
                return Err(mvs_consensus::BlockError::BadProofOfStake {
                    reason: "coinstake input is a coinbase input",
                }
                .into())
            }
        };

        let stake_output = self
            .store
            .utxo(stake_outpoint)
            .map_err(OrganizerError::Store)?
            .or_else(|| {
                // The stake output may already have been spent by this
                // very coinstake's chain position; fall back to the
                // transaction record so maturity/value can still be
                // checked even though `Store::utxo` only reports unspent
                // outputs.
                self.store
                    .transaction(stake_outpoint.hash)
                    .ok()
                    .flatten()
                    .and_then(|tx| tx.outputs.get(stake_outpoint.index as usize).cloned())
            })
            .ok_or(mvs_consensus::BlockError::BadProofOfStake {
                reason: "stake output not found",
            })?;

        check::check_pos_utxo_capability(
            block.header.bits,
            *height,
            stake_outpoint,
            &stake_output,
            stake_output_height,
            block.header.time,
            self.params.coinbase_maturity,
        )?;
        check::check_stake_not_reused(stake_outpoint, recently_used)?;
        check::check_pos_capability(controlled_outputs)?;

        Ok(())
    }

    fn check_delegated_proof_of_stake(
        &self,
        block: &Block,
        ctx: &ConsensusContext,
    ) -> Result<(), OrganizerError> {
        let (epoch_start, candidates) = match ctx {
            ConsensusContext::DelegatedProofOfStake {
                epoch_start,
                candidates,
            } => (*epoch_start, candidates),
            _ => return Err(OrganizerError::MissingWitnessContext),
        };

        let parent = self
            .store
            .block(HashOrHeight::Hash(block.header.previous_block_hash))
            .map_err(OrganizerError::Store)?
            .ok_or(mvs_consensus::BlockError::BadProofOfStake {
                reason: "delegated proof-of-stake block's parent is unknown",
            })?;

        check::difficulty_unchanged(&block.header, &parent.header)?;
        check::witness_slot_is_valid(&block.header, epoch_start, self.params.fts_witness_count)?;

        let drawn = check::draw_witness_set(candidates, &parent.hash(), self.params.fts_witness_count);
        let signer = self.coinstake_signer_hash160(block)?;
        if !drawn.iter().any(|hash160| *hash160 == signer) {
            return Err(mvs_consensus::BlockError::NotAWitness.into());
        }

        Ok(())
    }

    fn coinstake_signer_hash160(&self, block: &Block) -> Result<[u8; 20], OrganizerError> {
        let coinstake = block
            .transactions
            .get(1)
            .ok_or(mvs_consensus::BlockError::BadProofOfStake {
                reason: "delegated proof-of-stake block has no coinstake",
            })?;
        let outpoint = match coinstake.inputs.get(0) {
            Some(transparent::Input::PrevOut { outpoint, .. }) => outpoint,
            _ => {
                return Err(mvs_consensus::BlockError::BadProofOfStake {
                    reason: "coinstake has no spendable input",
                }
                .into())
            }
        };
        let output = self
            .store
            .utxo(outpoint)
            .map_err(OrganizerError::Store)?
            .ok_or(mvs_consensus::BlockError::BadProofOfStake {
                reason: "coinstake input not found",
            })?;

        use mvs_script::templates::ScriptPattern;
        match ScriptPattern::recognize(&output.lock_script) {
            ScriptPattern::Pkh { hash160 }
            | ScriptPattern::PkhWithLockHeight { hash160, .. }
            | ScriptPattern::PkhWithSequenceLock { hash160, .. }
            | ScriptPattern::PkhWithAttenuation { hash160, .. } => Ok(hash160),
            ScriptPattern::Sh { .. } | ScriptPattern::Other => {
                Err(mvs_consensus::BlockError::BadProofOfStake {
                    reason: "coinstake output is not a recognized pay-to-hash script",
                }
                .into())
            }
        }
    }

    /// Drains and connects every orphan chain rooted at `new_tip`,
    /// recursively. Only proof-of-work orphans can be auto-drained, since
    /// draining a proof-of-stake or delegated-proof-of-stake orphan needs
    /// [`ConsensusContext`] this function has no way to reconstruct; such
    /// orphans stay queued until the caller resubmits them directly.
    fn drain_orphans(&mut self, new_tip: block::Hash) -> Result<usize, OrganizerError> {
        let mut drained = 0;
        let mut frontier = VecDeque::from(vec![new_tip]);

        while let Some(parent) = frontier.pop_front() {
            for child in self.orphans.take_children(&parent) {
                if child.header.consensus_version() != Some(block::Version::ProofOfWork) {
                    self.orphans.insert(child);
                    continue;
                }
                if self.connect_block(&child, &ConsensusContext::ProofOfWork).is_ok() {
                    drained += 1;
                    frontier.push_back(child.hash());
                } else {
                    self.orphans.insert(child);
                }
            }
        }

        Ok(drained)
    }

    /// If the orphan chain rooted (transitively) on `parent` now has more
    /// cumulative work than the main chain from their common ancestor,
    /// pops the main chain down to that ancestor and connects the
    /// challenger chain block-by-block, reverting on any failure (spec
    /// section 4.6, steps 3-4).
    fn try_reorg_from(&mut self, parent: block::Hash) -> Result<Option<ReorgEvent>, OrganizerError> {
        let fork_height = match self
            .store
            .block(HashOrHeight::Hash(parent))
            .map_err(OrganizerError::Store)?
        {
            Some(block) => block.coinbase_height().unwrap_or(Height(0)),
            None => return Ok(None),
        };

        let challenger = self.collect_orphan_chain(parent);
        if challenger.is_empty() {
            return Ok(None);
        }

        let (_, tip_hash) = match self.store.tip()? {
            Some(tip) => tip,
            None => return Ok(None),
        };
        let current_tip_height = self.store.coinbase_height_of(tip_hash)?;
        if current_tip_height <= fork_height {
            return Ok(None);
        }

        let main_chain_work = self.chain_work(fork_height, current_tip_height)?;
        let challenger_work: U256 = challenger.iter().map(|b| block_work(&b.header)).fold(U256::zero(), |a, b| a + b);

        if challenger_work <= main_chain_work {
            return Ok(None);
        }

        let mut removed = Vec::new();
        while self.store.tip()?.map(|(h, _)| h) != Some(fork_height) {
            removed.push(self.store.pop_block().map_err(OrganizerError::Store)?);
        }
        for tx in removed.iter().flat_map(|b| Mempool::reinstate_candidates(b)) {
            let _ = self
                .mempool
                .insert(tx, &self.store, self.network, self.params);
        }

        let mut added = Vec::new();
        for (index, block) in challenger.iter().enumerate() {
            match self.connect_block(block, &ConsensusContext::ProofOfWork) {
                Ok(_) => added.push(block.clone()),
                Err(_) => {
                    // Revert: pop whatever of the challenger chain we did
                    // connect, then restore the original tip.
                    for _ in &added {
                        let _ = self.store.pop_block();
                    }
                    for block in removed.into_iter().rev() {
                        self.store.push_block(block).map_err(OrganizerError::Store)?;
                    }
                    return Err(OrganizerError::ReorgFailed(index));
                }
            }
        }

        let event = ReorgEvent {
            added,
            removed,
            fork_height,
        };
        self.reorg_subscribers.send(event.clone());
        Ok(Some(event))
    }

    /// Walks the orphan pool forward from `root`, following whichever
    /// single child is queued at each step (the simple case; competing
    /// siblings at the same height are resolved by whichever is tried
    /// first, since total work alone doesn't specify tie-breaking between
    /// them).
    fn collect_orphan_chain(&mut self, root: block::Hash) -> Vec<Arc<Block>> {
        let mut chain = Vec::new();
        let mut cursor = root;
        loop {
            let children = self.orphans.take_children(&cursor);
            match children.into_iter().next() {
                Some(block) => {
                    cursor = block.hash();
                    chain.push(block);
                }
                None => break,
            }
        }
        chain
    }

    fn chain_work(&self, from: Height, to: Height) -> Result<U256, OrganizerError> {
        let mut total = U256::zero();
        let mut height = from;
        while height < to {
            let next = height.next().expect("height below `to` has a successor");
            if let Some(block) = self.store.block(HashOrHeight::Height(next)).map_err(OrganizerError::Store)? {
                total = total + block_work(&block.header);
            }
            height = next;
        }
        Ok(total)
    }

    fn median_time_past(&self, height: Height) -> Option<DateTime<Utc>> {
        let times = self.recent_times(height, 11);
        check::median_time_past(&times)
    }

    fn recent_times(&self, height: Height, count: u32) -> Vec<DateTime<Utc>> {
        self.recent_headers(height, count)
            .into_iter()
            .map(|header| header.time)
            .collect()
    }

    fn recent_versions(&self, height: Height, count: u32) -> Option<Vec<u32>> {
        let headers = self.recent_headers(height, count);
        if headers.is_empty() {
            None
        } else {
            Some(headers.into_iter().map(|header| header.version).collect())
        }
    }

    fn recent_headers(&self, height: Height, count: u32) -> Vec<Header> {
        let mut headers = Vec::new();
        let mut cursor = height;
        for _ in 0..count {
            cursor = match cursor.previous() {
                Some(previous) => previous,
                None => break,
            };
            match self.store.block(HashOrHeight::Height(cursor)) {
                Ok(Some(block)) => headers.push(block.header),
                _ => break,
            }
        }
        headers
    }
}

/// A block's contribution to cumulative chain work: the inverse of its
/// difficulty target, the standard Bitcoin-style accumulation. Neither
/// no source this crate is grounded on carries an explicit chain-work
/// formula, so this is the well-known construction rather than a ported
/// one.
fn block_work(header: &Header) -> U256 {
    let target = header.bits.0.max(U256::one());
    U256::max_value() / target
}

trait CoinbaseHeightOf {
    fn coinbase_height_of(&self, hash: block::Hash) -> Result<Height, OrganizerError>;
}

impl CoinbaseHeightOf for Store {
    fn coinbase_height_of(&self, hash: block::Hash) -> Result<Height, OrganizerError> {
        self.block(HashOrHeight::Hash(hash))
            .map_err(OrganizerError::Store)?
            .and_then(|block| block.coinbase_height())
            .ok_or(OrganizerError::Disconnected)
    }
}
