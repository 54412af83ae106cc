//! Proof-of-stake and delegated proof-of-stake tuning constants.
//!
//! Only the call sites for `check_pos_capability`/`check_pos_utxo_capability`
//! and the witness-profile bookkeeping (`block_chain_impl.hpp`'s
//! `calc_and_store_witness_profile`) were available to ground this crate on;
//! the bodies that define these thresholds weren't. The values below are
//! this crate's own, chosen to satisfy what the call sites require (a
//! minimum locked value, a maturity window, a fixed witness-set size and
//! epoch cadence) without claiming to reproduce exact upstream numbers.

/// Minimum value (in satoshi-equivalent units) a stake output must carry to
/// be eligible as a coinstake input.
pub const MINIMUM_STAKE_VALUE: u64 = 1_000 * super::subsidy::COIN;

/// Number of blocks a delegated proof-of-stake epoch spans before the
/// follow-the-satoshi witness set is redrawn.
pub const DPOS_EPOCH_BLOCKS: u32 = 2_000;

/// Target spacing, in seconds, between delegated proof-of-stake blocks;
/// used to derive a witness slot index from a header's timestamp.
pub const DPOS_SLOT_SECONDS: i64 = 10;
