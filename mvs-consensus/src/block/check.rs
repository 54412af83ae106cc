//! Block checks: context-free header checks first, then consensus-mode
//! dispatch.
//!
//! Each function is a pure predicate over already-parsed types, one
//! function per rule: the organizer decides what
//! order to call these in and how to fetch the previous-block context each
//! one needs.

use std::collections::HashSet;
use std::io::Write;

use chrono::{DateTime, Utc};
use primitive_types::U256;

use mvs_chain::{
    amount::{Amount, NonNegative},
    block::{self, Block, Hash, Header, Height},
    parameters::Network,
    transaction,
    transparent::{self, Output, Script},
    work::difficulty::Difficulty,
};
use mvs_script::templates::ScriptPattern;

use crate::error::*;
use crate::parameters::pos;

use super::subsidy::general as subsidy;

/// Returns `Ok(())` if there is exactly one coinbase transaction in `Block`,
/// and that coinbase transaction is the first transaction in the block.
pub fn coinbase_is_first(block: &Block) -> Result<(), BlockError> {
    let first = block.transactions.get(0).ok_or(BlockError::NoTransactions)?;
    let mut rest = block.transactions.iter().skip(1);
    if !first.is_coinbase() {
        return Err(TransactionError::CoinbasePosition)?;
    }
    if rest.any(|tx| tx.contains_coinbase_input()) {
        return Err(TransactionError::CoinbaseInputFound)?;
    }
    Ok(())
}

/// Reads `header`'s hash as a big-endian 256-bit integer for comparison
/// against a [`Difficulty`] target. `Hash` stores its bytes in the same
/// order `sha256d` produces them (little-endian, like Bitcoin's own hash
/// integers), so the conversion is `from_little_endian`, not a byte copy.
fn hash_to_u256(hash: &Hash) -> U256 {
    U256::from_little_endian(&hash.0)
}

/// Returns `Ok(())` if `hash` satisfies the target difficulty limit for
/// `network` and `header.bits` itself.
///
/// This only checks that the candidate header's own declared target is
/// within the network's limit and that its hash satisfies that target; it
/// does not recompute what `bits` *should* be from a retarget window. No
/// difficulty-adjustment algorithm was available to ground this crate on
/// (only the call site for `MinerAux::verify_work`, never its body), so
/// reconstructing the "actual-time-span window across
/// the last N same-version blocks" is left to
/// the organizer once it threads in the header history this function
/// deliberately doesn't take.
pub fn difficulty_is_valid(
    header: &Header,
    network: Network,
    height: &Height,
    hash: &Hash,
) -> Result<(), BlockError> {
    if header.bits.0 > Difficulty::target_difficulty_limit(network).0 {
        return Err(BlockError::TargetDifficultyLimit(header.bits, network));
    }

    if !header.bits.is_satisfied_by(hash_to_u256(hash)) {
        return Err(BlockError::BadProofOfWork);
    }

    let _ = height;
    Ok(())
}

/// Returns `Ok(())` if `header.time` is within 2 hours of `now`.
pub fn time_is_valid_at(
    header: &Header,
    now: DateTime<Utc>,
    height: &Height,
    hash: &Hash,
) -> Result<(), block::BlockTimeError> {
    header.time_is_valid_at(now, height, hash)
}

/// Returns `Ok(())` if `header.time` is after the median time of the last
/// 11 blocks, alongside the future-time bound
/// `time_is_valid_at` checks.
pub fn time_is_after_median(
    header: &Header,
    median_time_past: DateTime<Utc>,
) -> Result<(), BlockError> {
    if header.time <= median_time_past {
        return Err(BlockError::TimeTooOld);
    }
    Ok(())
}

/// The median of up to the last 11 block timestamps, most recent first,
/// used for [`time_is_after_median`]. `recent_times` need not be sorted.
pub fn median_time_past(recent_times: &[DateTime<Utc>]) -> Option<DateTime<Utc>> {
    if recent_times.is_empty() {
        return None;
    }
    let mut sorted: Vec<DateTime<Utc>> = recent_times.to_vec();
    sorted.sort();
    Some(sorted[sorted.len() / 2])
}

/// Check Merkle root validity.
pub fn merkle_root_validity(
    block: &Block,
    transaction_hashes: &[transaction::Hash],
) -> Result<(), BlockError> {
    let merkle_root = transaction_hashes.iter().cloned().collect();

    if block.header.merkle_root != merkle_root {
        return Err(BlockError::BadMerkleRoot {
            actual: merkle_root,
            expected: block.header.merkle_root,
        });
    }

    if transaction_hashes.len() != transaction_hashes.iter().collect::<HashSet<_>>().len() {
        return Err(BlockError::DuplicateTransaction);
    }

    Ok(())
}

/// Returns `Ok(())` if the coinbase output total in `block` doesn't exceed
/// the block subsidy plus the miner fees its other transactions paid.
///
/// `fees` is the sum of [`crate::transaction::check::Verified::fee`] across
/// every non-coinbase transaction in the block; the caller accumulates it
/// while running the transaction validator so this function stays a pure
/// arithmetic check.
pub fn subsidy_is_valid(
    block: &Block,
    fees: Amount<NonNegative>,
) -> Result<(), BlockError> {
    let height = block.coinbase_height().ok_or(SubsidyError::NoCoinbase)?;
    let coinbase = block.transactions.get(0).ok_or(SubsidyError::NoCoinbase)?;

    let coinbase_total = coinbase
        .outputs
        .iter()
        .try_fold(Amount::<NonNegative>::zero(), |acc, output| {
            acc.checked_add(output.value)
        })
        .ok_or(TransactionError::OutputValueOverflow)?;

    let allowed = subsidy::block_subsidy(height)
        .ok()
        .and_then(|subsidy| subsidy.checked_add(fees))
        .ok_or(TransactionError::OutputValueOverflow)?;

    if coinbase_total.value() > allowed.value() {
        return Err(SubsidyError::ExceedsAllowed {
            actual: coinbase_total.value(),
            allowed: allowed.value(),
        })?;
    }

    Ok(())
}

/// The address a script pays to, if it's a recognized pay-to-hash template.
fn script_hash160(script: &Script) -> Option<[u8; 20]> {
    match ScriptPattern::recognize(script) {
        ScriptPattern::Pkh { hash160 }
        | ScriptPattern::Sh { hash160 }
        | ScriptPattern::PkhWithLockHeight { hash160, .. }
        | ScriptPattern::PkhWithSequenceLock { hash160, .. }
        | ScriptPattern::PkhWithAttenuation { hash160, .. } => Some(hash160),
        ScriptPattern::Other => None,
    }
}

/// Returns `Ok(())` if the output a coinstake spends is mature, carries at
/// least [`pos::MINIMUM_STAKE_VALUE`], and its kernel hash satisfies `bits`
/// at `coinstake_time`.
///
/// Grounded on `validate_block_impl.cpp`'s `verify_stake`, which calls the
/// equivalent check before handing the output to `MinerAux::verify_stake`
/// for the kernel-hash test; neither `check_pos_utxo_capability`'s nor
/// `MinerAux::verify_stake`'s own formula wasn't available to ground this
/// on, so the maturity and value thresholds are this crate's own
/// (documented in [`pos`]), and the kernel hash is approximated here as
/// `sha256d(stake_outpoint || coinstake_time)` -- a placeholder in the same spirit as
/// [`difficulty_is_valid`]'s proof-of-work hash, not a claim of bit-exact
/// compatibility.
pub fn check_pos_utxo_capability(
    bits: Difficulty,
    height: Height,
    stake_outpoint: &transparent::OutPoint,
    stake_output: &Output,
    stake_output_height: Height,
    coinstake_time: DateTime<Utc>,
    coinbase_maturity: u32,
) -> Result<(), BlockError> {
    let confirmations = height.0.saturating_sub(stake_output_height.0);
    if confirmations < coinbase_maturity {
        return Err(BlockError::BadProofOfStake {
            reason: "stake output has not reached coinbase maturity",
        });
    }

    if stake_output.value.value() < pos::MINIMUM_STAKE_VALUE {
        return Err(BlockError::BadProofOfStake {
            reason: "stake output is below the minimum stake value",
        });
    }

    let kernel_hash = kernel_hash(stake_outpoint, coinstake_time);
    if !bits.is_satisfied_by(hash_to_u256(&kernel_hash)) {
        return Err(BlockError::BadProofOfStake {
            reason: "kernel hash does not satisfy the block's difficulty target",
        });
    }

    Ok(())
}

/// Re-hashes `seed` with `index` mixed in, used to derive a deterministic
/// stream of pseudo-random draws from a single epoch seed.
fn rehash(seed: &Hash, index: u32) -> Hash {
    use mvs_chain::serialization::{sha256d, BitcoinSerialize};
    let mut writer = sha256d::Writer::default();
    writer
        .write_all(&seed.0)
        .expect("writing to a Sha256dWriter is infallible");
    index
        .bitcoin_serialize(&mut writer)
        .expect("writing to a Sha256dWriter is infallible");
    Hash(writer.finish())
}

fn kernel_hash(stake_outpoint: &transparent::OutPoint, coinstake_time: DateTime<Utc>) -> Hash {
    use mvs_chain::serialization::{sha256d, BitcoinSerialize};
    let mut writer = sha256d::Writer::default();
    stake_outpoint
        .bitcoin_serialize(&mut writer)
        .expect("writing to a Sha256dWriter is infallible");
    (coinstake_time.timestamp() as u64)
        .bitcoin_serialize(&mut writer)
        .expect("writing to a Sha256dWriter is infallible");
    Hash(writer.finish())
}

/// Returns `Ok(())` if `stake_address`'s recent stake-output usage doesn't
/// re-use a coinstake that already produced a block within
/// `coinbase_maturity` blocks. The caller supplies the set of stake
/// outpoints already spent by coinstakes in that window (the organizer
/// derives it from the main chain's recent coinstake transactions); this
/// function only holds the membership rule, since no additional on-chain
/// state needs to exist beyond what the UTXO set and recent-block history
/// already provide.
pub fn check_stake_not_reused(
    stake_outpoint: &transparent::OutPoint,
    recently_used: &HashSet<transparent::OutPoint>,
) -> Result<(), BlockError> {
    if recently_used.contains(stake_outpoint) {
        return Err(BlockError::StakeOutputReused);
    }
    Ok(())
}

/// Returns `Ok(())` if `stake_address` controls at least
/// [`pos::MINIMUM_STAKE_VALUE`] of locked balance, summed over
/// `controlled_outputs` (every unspent output the organizer found paying
/// that address).
///
/// Grounded on `verify_stake`'s call to `check_pos_capability` ahead of the
/// per-utxo check; upstream takes only `(height, pay_address)` and
/// presumably consults an address-balance index this crate's store doesn't
/// maintain, so the caller is asked to supply the relevant outputs instead.
pub fn check_pos_capability(controlled_outputs: &[Output]) -> Result<(), BlockError> {
    let total = controlled_outputs
        .iter()
        .try_fold(Amount::<NonNegative>::zero(), |acc, output| {
            acc.checked_add(output.value)
        })
        .unwrap_or_else(Amount::zero);

    if total.value() < pos::MINIMUM_STAKE_VALUE {
        return Err(BlockError::BadProofOfStake {
            reason: "stake address does not control enough locked balance",
        });
    }
    Ok(())
}

/// Returns `Ok(())` if a delegated proof-of-stake `header`'s `bits` equals
/// its parent's.
pub fn difficulty_unchanged(header: &Header, parent: &Header) -> Result<(), BlockError> {
    if header.bits != parent.bits {
        return Err(BlockError::DifficultyMismatch);
    }
    Ok(())
}

/// The witness slot index a delegated proof-of-stake block's timestamp
/// selects, given the epoch's start time.
pub fn witness_slot_for_timestamp(
    time: DateTime<Utc>,
    epoch_start: DateTime<Utc>,
    witness_count: u32,
) -> u32 {
    let elapsed = (time - epoch_start).num_seconds().max(0);
    let slot = (elapsed / pos::DPOS_SLOT_SECONDS) as u32;
    slot % witness_count.max(1)
}

/// Returns `Ok(())` if `header.nonce` (which carries the witness slot index
/// for delegated proof-of-stake headers) equals the slot its timestamp
/// selects.
pub fn witness_slot_is_valid(
    header: &Header,
    epoch_start: DateTime<Utc>,
    witness_count: u32,
) -> Result<(), BlockError> {
    let expected = witness_slot_for_timestamp(header.time, epoch_start, witness_count);
    if header.nonce as u32 != expected {
        return Err(BlockError::BadWitnessSlot(expected));
    }
    Ok(())
}

/// One candidate in a follow-the-satoshi witness drawing: an address
/// hash160, its locked stake weight, and whether it holds an active
/// witness certificate (the draw is weighted by "locked stake + active
/// witness-certs").
#[derive(Clone, Debug)]
pub struct WitnessCandidate {
    pub address_hash160: [u8; 20],
    pub locked_stake: Amount<NonNegative>,
    pub has_witness_cert: bool,
}

/// Draws `count` witnesses from `candidates`, weighted by locked stake
/// (certificate holders get a flat weight bonus), deterministically seeded
/// by `epoch_seed` -- the previous epoch's last block hash, so every node
/// computing this draw for the same epoch agrees.
///
/// Grounded on `block_chain_impl.hpp`'s `get_witnesses_mars`/
/// `fts_stake_holder` declarations; `consensus::fts_stake_holder`'s actual
/// drawing algorithm wasn't available to ground this on, so this is a
/// standard weighted-without-replacement draw over a hash-derived random
/// stream rather than a ported sampler.
pub fn draw_witness_set(
    candidates: &[WitnessCandidate],
    epoch_seed: &Hash,
    count: u32,
) -> Vec<[u8; 20]> {
    const CERT_WEIGHT_BONUS: u64 = pos::MINIMUM_STAKE_VALUE;

    let mut weighted: Vec<(u64, [u8; 20])> = candidates
        .iter()
        .map(|c| {
            let bonus = if c.has_witness_cert {
                CERT_WEIGHT_BONUS
            } else {
                0
            };
            (c.locked_stake.value().saturating_add(bonus), c.address_hash160)
        })
        .filter(|(weight, _)| *weight > 0)
        .collect();

    let mut drawn = Vec::with_capacity(count as usize);
    let mut seed = *epoch_seed;
    while !weighted.is_empty() && drawn.len() < count as usize {
        let total: u64 = weighted.iter().map(|(w, _)| *w).sum();
        if total == 0 {
            break;
        }
        seed = rehash(&seed, drawn.len() as u32);
        let pick = (hash_to_u256(&seed) % U256::from(total)).as_u64();

        let mut running = 0u64;
        let index = weighted
            .iter()
            .position(|(weight, _)| {
                running += weight;
                pick < running
            })
            .unwrap_or(0);

        drawn.push(weighted.remove(index).1);
    }

    drawn
}

/// Returns `Ok(())` if `version` has not been the header version of more
/// than `cap` consecutive blocks ending at this one (the successive-height
/// cap, `K_v`).
pub fn successive_version_is_within_cap(
    recent_versions: &[u32],
    version: u32,
    cap: u32,
) -> Result<(), BlockError> {
    let run = recent_versions
        .iter()
        .rev()
        .take_while(|&&v| v == version)
        .count() as u32
        + 1;
    if run > cap {
        return Err(BlockError::SuccessiveVersionCapExceeded {
            version,
            count: run,
            cap,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_time_past_picks_the_middle_value() {
        let base = Utc::now();
        let times = vec![
            base,
            base + chrono::Duration::seconds(10),
            base + chrono::Duration::seconds(20),
        ];
        assert_eq!(median_time_past(&times), Some(times[1]));
    }

    #[test]
    fn median_time_past_of_empty_slice_is_none() {
        assert_eq!(median_time_past(&[]), None);
    }

    #[test]
    fn successive_version_cap_rejects_one_too_many() {
        let recent = vec![1, 1, 1];
        assert!(successive_version_is_within_cap(&recent, 1, 3).is_err());
        assert!(successive_version_is_within_cap(&recent, 1, 4).is_ok());
        assert!(successive_version_is_within_cap(&recent, 2, 3).is_ok());
    }

    #[test]
    fn stake_reuse_detects_membership() {
        let outpoint = transparent::OutPoint {
            hash: transaction::Hash([7u8; 32]),
            index: 0,
        };
        let mut used = HashSet::new();
        used.insert(outpoint);
        assert!(check_stake_not_reused(&outpoint, &used).is_err());

        let other = transparent::OutPoint {
            hash: transaction::Hash([9u8; 32]),
            index: 0,
        };
        assert!(check_stake_not_reused(&other, &used).is_ok());
    }

    #[test]
    fn witness_slot_wraps_to_witness_count() {
        let epoch_start = Utc.timestamp(0, 0);
        let time = epoch_start + chrono::Duration::seconds(105);
        // 105s / 10s-per-slot = slot 10, wrapped by a 7-witness set.
        assert_eq!(witness_slot_for_timestamp(time, epoch_start, 7), 10 % 7);
    }

    #[test]
    fn draw_witness_set_only_returns_positive_weight_candidates() {
        let seed = Hash([1u8; 32]);
        let candidates = vec![
            WitnessCandidate {
                address_hash160: [1u8; 20],
                locked_stake: Amount::zero(),
                has_witness_cert: false,
            },
            WitnessCandidate {
                address_hash160: [2u8; 20],
                locked_stake: Amount::try_new(pos::MINIMUM_STAKE_VALUE).unwrap(),
                has_witness_cert: false,
            },
        ];
        let drawn = draw_witness_set(&candidates, &seed, 5);
        assert_eq!(drawn, vec![[2u8; 20]]);
    }
}
