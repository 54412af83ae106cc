//! Coinbase and lock-reward constants.
//!
//! Unlike Bitcoin's halving schedule, this reward is computed by
//! `consensus::miner::calculate_lockblock_reward` upstream, whose body
//! wasn't available to ground this crate on -- only its call site, in
//! `validate_block_impl.cpp`'s coinage-reward check. The schedule below
//! is this crate's own, built to satisfy the
//! properties the call site implies: a reward proportional to both the
//! value locked and how long it was locked, capped so short locks earn
//! nothing and the longest locks approach (but never exceed) doubling the
//! principal.

/// Satoshi-equivalent units per ETP, matching the genesis reward's literal
/// `100_000_000` scale factor.
pub const COIN: u64 = 100_000_000;

/// The fixed per-block ETP reward paid to a proof-of-work or proof-of-stake
/// coinbase, matching the genesis reward
/// (`mvs_chain::parameters::genesis::GENESIS_REWARD`). There is no
/// halving schedule, so the reward is a constant rather than
/// Bitcoin-style halving.
pub const BLOCK_REWARD: u64 = 50 * COIN;

/// Below this many locked blocks, a coinage-reward output earns nothing.
pub const MIN_REWARD_LOCK_HEIGHT: u32 = 25_200;

/// At and above this many locked blocks, the coinage-reward rate is capped.
pub const MAX_REWARD_LOCK_HEIGHT: u32 = 1_051_200;

/// The reward rate, in ten-thousandths of the locked value, at
/// `MAX_REWARD_LOCK_HEIGHT` and beyond.
pub const MAX_REWARD_RATE_BASIS_POINTS: u64 = 5_000;
