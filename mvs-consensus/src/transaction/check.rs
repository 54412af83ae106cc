//! Transaction checks.
//!
//! Stateless checks only look at the transaction itself. Stateful checks
//! consult a [`mvs_state::Store`] view of the chain up to (but not
//! including) the block being validated; the organizer is responsible for
//! calling these in an order where every referenced previous output has
//! already landed in the store (for inputs spending an earlier output of
//! the same block, that means validating transactions within a block in
//! their listed order and committing as it goes, or otherwise overlaying
//! in-block outputs -- this crate validates one transaction at a time and
//! leaves that sequencing to the caller).

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use mvs_chain::{
    amount::{Amount, NonNegative},
    attachment::{asset, cert, did, mit, Body},
    block,
    parameters::{ChainParams, Network},
    transaction::{LockTime, Transaction},
    transparent::{self, Address, Script},
};
use mvs_script::{templates::ScriptPattern, ExecutionContext, VerifyFlags};

use crate::error::TransactionError;

/// `[A-Z.][A-Z0-9.]{0,62}`.
static SYMBOL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z.][A-Z0-9.]{0,62}$").expect("valid regex"));

/// Checks that don't need a view of the chain: shape and size only.
pub fn check_stateless(
    tx: &Transaction,
    params: &ChainParams,
    in_block: bool,
) -> Result<(), TransactionError> {
    has_inputs_and_outputs(tx)?;
    has_no_duplicate_inputs(tx)?;
    output_value_in_range(tx)?;
    size_is_within_limits(tx, params, in_block)?;
    Ok(())
}

fn has_inputs_and_outputs(tx: &Transaction) -> Result<(), TransactionError> {
    if tx.inputs.is_empty() {
        return Err(TransactionError::NoInputs);
    }
    if tx.outputs.is_empty() {
        return Err(TransactionError::NoOutputs);
    }
    Ok(())
}

fn has_no_duplicate_inputs(tx: &Transaction) -> Result<(), TransactionError> {
    let mut seen = std::collections::HashSet::new();
    for input in &tx.inputs {
        if let transparent::Input::PrevOut { outpoint, .. } = input {
            if !seen.insert(*outpoint) {
                return Err(TransactionError::DoubleSpend(*outpoint));
            }
        }
    }
    Ok(())
}

fn output_value_in_range(tx: &Transaction) -> Result<(), TransactionError> {
    let mut total = Amount::<NonNegative>::zero();
    for output in &tx.outputs {
        total = total
            .checked_add(output.value)
            .ok_or(TransactionError::OutputValueOverflow)?;
    }
    Ok(())
}

fn size_is_within_limits(
    tx: &Transaction,
    params: &ChainParams,
    in_block: bool,
) -> Result<(), TransactionError> {
    let limit = if in_block {
        params.max_block_tx_bytes
    } else {
        params.max_standalone_tx_bytes
    };
    if tx.len() as u64 > limit {
        return Err(TransactionError::SizeExceeded);
    }
    Ok(())
}

/// Everything [`check_stateful`] learned about a transaction that the
/// block validator needs to aggregate across the whole block: the fee it
/// pays and the signature operations it spent from the per-block budget.
pub struct Verified {
    pub fee: Amount<NonNegative>,
    pub sigops: usize,
}

/// The view and network context stateful checks are evaluated against.
pub struct Context<'a> {
    pub store: &'a mvs_state::Store,
    pub network: Network,
    pub params: ChainParams,
    /// The height the transaction is being considered for inclusion at.
    pub height: block::Height,
    pub median_time_past: DateTime<Utc>,
}

/// Stateful checks against `ctx`'s view.
/// Attachment-specific rules (4-7) are checked by [`check_attachment`].
pub fn check_stateful(tx: &Transaction, ctx: &Context) -> Result<Verified, TransactionError> {
    if tx.contains_coinbase_input() {
        return Err(TransactionError::CoinbaseInputFound);
    }

    let mut input_total = Amount::<NonNegative>::zero();
    let mut sigops = 0usize;
    let mut spent_outputs = Vec::with_capacity(tx.inputs.len());

    for (index, input) in tx.inputs.iter().enumerate() {
        let (outpoint, unlock_script) = match input {
            transparent::Input::PrevOut {
                outpoint,
                unlock_script,
                ..
            } => (outpoint, unlock_script),
            transparent::Input::Coinbase { .. } => unreachable!("checked above"),
        };

        let prev_output = ctx
            .store
            .utxo(outpoint)
            .map_err(|_| TransactionError::DoubleSpend(*outpoint))?
            .ok_or(TransactionError::DoubleSpend(*outpoint))?;

        let flags = script_flags(ctx.network, ctx.height);
        let exec_context = ExecutionContext {
            transaction: tx,
            input_index: index,
        };
        mvs_script::execute(unlock_script, &prev_output.lock_script, Some(&exec_context), flags)
            .map_err(|source| TransactionError::InvalidScript { index, source })?;

        sigops += mvs_script::count_sigops(unlock_script);
        sigops += mvs_script::count_sigops(&prev_output.lock_script);

        input_total = input_total
            .checked_add(prev_output.value)
            .ok_or(TransactionError::OutputValueOverflow)?;

        spent_outputs.push(prev_output);
    }

    let output_total = tx
        .outputs
        .iter()
        .try_fold(Amount::<NonNegative>::zero(), |acc, output| {
            acc.checked_add(output.value)
        })
        .ok_or(TransactionError::OutputValueOverflow)?;

    let fee = input_total
        .checked_sub(output_total)
        .ok_or(TransactionError::ValueUnbalanced)?;

    let issues_asset = tx
        .outputs
        .iter()
        .any(|o| matches!(o.attachment.body, Body::AssetDetail(_)));
    let minimum_fee = if issues_asset {
        ctx.params.min_fee_to_issue_asset.max(ctx.params.min_fee)
    } else {
        ctx.params.min_fee
    };
    if fee.value() < minimum_fee {
        return Err(TransactionError::InsufficientFee {
            paid: fee.value(),
            minimum: minimum_fee,
        });
    }

    if !locktime_is_satisfied(&tx.locktime, ctx.height, ctx.median_time_past) {
        return Err(TransactionError::LockTimeNotSatisfied);
    }

    check_attachment(tx, &spent_outputs, ctx)?;

    Ok(Verified { fee, sigops })
}

fn script_flags(network: Network, height: block::Height) -> VerifyFlags {
    let mut flags = VerifyFlags::CHECK_LOCKTIME | VerifyFlags::CHECK_SEQUENCE;
    if mvs_chain::parameters::activation::is_active(
        network,
        mvs_chain::parameters::activation::Rule::AttenuationModel,
        height,
    ) {
        flags |= VerifyFlags::CLEAN_STACK;
    }
    flags
}

fn locktime_is_satisfied(
    locktime: &LockTime,
    height: block::Height,
    median_time_past: DateTime<Utc>,
) -> bool {
    match locktime {
        LockTime::Height(lock_height) => lock_height.0 == 0 || height >= *lock_height,
        LockTime::Time(lock_time) => median_time_past >= lock_time.0,
    }
}

/// The address a script pays to, if it's a recognized pay-to-hash template.
fn script_hash160(script: &Script) -> Option<[u8; 20]> {
    match ScriptPattern::recognize(script) {
        ScriptPattern::Pkh { hash160 }
        | ScriptPattern::PkhWithLockHeight { hash160, .. }
        | ScriptPattern::PkhWithSequenceLock { hash160, .. }
        | ScriptPattern::PkhWithAttenuation { hash160, .. }
        | ScriptPattern::Sh { hash160 } => Some(hash160),
        ScriptPattern::Other => None,
    }
}

/// The hash160 a `FixedString<64>` address field encodes, if it parses.
fn fixed_address_hash160(address: &str) -> Option<[u8; 20]> {
    match address.parse::<Address>().ok()? {
        Address::PayToPublicKeyHash { pub_key_hash, .. } => Some(pub_key_hash),
        Address::PayToScriptHash { script_hash, .. } => Some(script_hash),
    }
}

/// Asset, cert, DID, and MIT attachment rules.
fn check_attachment(
    tx: &Transaction,
    spent_outputs: &[transparent::Output],
    ctx: &Context,
) -> Result<(), TransactionError> {
    for output in &tx.outputs {
        match &output.attachment.body {
            Body::AssetDetail(detail) => check_asset_issuance(detail, spent_outputs, ctx)?,
            Body::AssetCert(cert) => check_cert(cert, spent_outputs)?,
            Body::Did(did) => check_did(did, output, spent_outputs, ctx)?,
            Body::AssetMit(mit) => check_mit(mit, output, spent_outputs, ctx)?,
            Body::Etp | Body::EtpAward | Body::Message(_) | Body::AssetTransfer(_) => {}
        }
    }
    check_asset_transfer_balance(tx, spent_outputs)?;
    Ok(())
}

/// Per symbol, the quantity sent by this transaction's `AssetTransfer`
/// outputs must not exceed what its inputs carry: the quantity on any
/// `AssetTransfer` input of that symbol, plus the newly minted supply on
/// any `AssetDetail` (secondary-issue) input of that symbol.
fn check_asset_transfer_balance(
    tx: &Transaction,
    spent_outputs: &[transparent::Output],
) -> Result<(), TransactionError> {
    let mut sent_by_symbol: std::collections::HashMap<String, u64> = std::collections::HashMap::new();
    for output in &tx.outputs {
        if let Body::AssetTransfer(transfer) = &output.attachment.body {
            *sent_by_symbol.entry(transfer.symbol.0.clone()).or_insert(0) += transfer.quantity;
        }
    }

    for (symbol, sent) in sent_by_symbol {
        let available: u64 = spent_outputs
            .iter()
            .filter_map(|spent| match &spent.attachment.body {
                Body::AssetTransfer(t) if t.symbol.0 == symbol => Some(t.quantity),
                Body::AssetDetail(d) if d.symbol.0 == symbol => Some(d.maximum_supply),
                _ => None,
            })
            .sum();
        if sent > available {
            return Err(TransactionError::AssetTransferExceedsAvailable {
                symbol,
                sent,
                available,
            });
        }
    }
    Ok(())
}

fn check_asset_issuance(
    detail: &asset::AssetDetail,
    spent_outputs: &[transparent::Output],
    ctx: &Context,
) -> Result<(), TransactionError> {
    let symbol = detail.symbol.0.as_str();
    if !SYMBOL_PATTERN.is_match(symbol) {
        return Err(TransactionError::InvalidAssetSymbol(symbol.to_string()));
    }

    match ctx.store.asset(symbol).ok().flatten() {
        None => {
            // Fresh issuance. If the symbol has a domain root (the part
            // before the first '.'), that domain's cert must either not
            // exist yet (auto-issued alongside this asset) or be owned by
            // one of this transaction's spent outputs.
            if let Some(root) = symbol.split('.').next().filter(|r| *r != symbol) {
                if let Some(domain_cert) = ctx.store.cert(root, cert::CertType::Domain).ok().flatten() {
                    let owns_domain = spent_outputs.iter().any(|spent| {
                        matches!(&spent.attachment.body, Body::AssetCert(c)
                            if c.symbol.0 == domain_cert.symbol.0
                                && c.cert_type as u8 == cert::CertType::Domain as u8)
                    });
                    if !owns_domain {
                        return Err(TransactionError::CertNotOwned {
                            symbol: root.to_string(),
                        });
                    }
                }
            }
            Ok(())
        }
        Some(existing) => {
            if existing.is_secondaryissue_forbidden() {
                return Err(TransactionError::SecondaryIssueForbidden(symbol.to_string()));
            }
            let owned_supply: u64 = spent_outputs
                .iter()
                .filter_map(|spent| match &spent.attachment.body {
                    Body::AssetDetail(d) if d.symbol.0 == symbol => Some(d.maximum_supply),
                    Body::AssetTransfer(t) if t.symbol.0 == symbol => Some(t.quantity),
                    _ => None,
                })
                .sum();
            if !existing.secondaryissue_owns_enough(owned_supply, existing.maximum_supply) {
                return Err(TransactionError::SecondaryIssueThresholdNotMet(
                    symbol.to_string(),
                ));
            }
            Ok(())
        }
    }
}

fn check_cert(cert: &cert::AssetCert, spent_outputs: &[transparent::Output]) -> Result<(), TransactionError> {
    if cert.status as u8 == cert::CertStatus::Issue as u8 {
        return Ok(());
    }
    let owns_prior = spent_outputs.iter().any(|spent| {
        matches!(&spent.attachment.body, Body::AssetCert(c)
            if c.symbol.0 == cert.symbol.0 && c.cert_type as u8 == cert.cert_type as u8)
    });
    if !owns_prior {
        return Err(TransactionError::CertNotOwned {
            symbol: cert.symbol.0.clone(),
        });
    }
    Ok(())
}

fn check_did(
    did: &did::Did,
    output: &transparent::Output,
    spent_outputs: &[transparent::Output],
    ctx: &Context,
) -> Result<(), TransactionError> {
    let output_address = script_hash160(&output.lock_script);
    let claimed_address = fixed_address_hash160(&did.address.0);
    if output_address.is_none() || output_address != claimed_address {
        return Err(TransactionError::AddressMismatch);
    }

    match did.status {
        did::DidStatus::Issue => {
            if ctx.store.did(&did.symbol.0).ok().flatten().is_some() {
                return Err(TransactionError::DuplicateDid(did.symbol.0.clone()));
            }
            Ok(())
        }
        did::DidStatus::Transfer => {
            let chained = spent_outputs.iter().any(|spent| {
                matches!(&spent.attachment.body, Body::Did(prior) if prior.symbol.0 == did.symbol.0)
            });
            if !chained {
                return Err(TransactionError::DidChainBroken(did.symbol.0.clone()));
            }
            Ok(())
        }
    }
}

fn check_mit(
    mit: &mit::AssetMit,
    output: &transparent::Output,
    spent_outputs: &[transparent::Output],
    ctx: &Context,
) -> Result<(), TransactionError> {
    let output_address = script_hash160(&output.lock_script);
    let claimed_address = fixed_address_hash160(&mit.address.0);
    if output_address.is_none() || output_address != claimed_address {
        return Err(TransactionError::AddressMismatch);
    }

    match mit.status {
        mit::MitStatus::Issue => {
            if ctx.store.mit(&mit.symbol.0).ok().flatten().is_some() {
                return Err(TransactionError::DuplicateMit(mit.symbol.0.clone()));
            }
            Ok(())
        }
        mit::MitStatus::Transfer => {
            if !mit.content.is_empty() {
                return Err(TransactionError::MitContentOnTransfer(mit.symbol.0.clone()));
            }
            let chained = spent_outputs.iter().any(|spent| {
                matches!(&spent.attachment.body, Body::AssetMit(prior) if prior.symbol.0 == mit.symbol.0)
            });
            if !chained {
                return Err(TransactionError::MitChainBroken(mit.symbol.0.clone()));
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mvs_chain::{attachment::Attachment, transparent::Script};

    #[test]
    fn empty_inputs_are_rejected() {
        mvs_test::init();
        let tx = Transaction::new(1, vec![], vec![], LockTime::zero());
        assert_eq!(has_inputs_and_outputs(&tx), Err(TransactionError::NoInputs));
    }

    #[test]
    fn duplicate_inputs_are_rejected() {
        mvs_test::init();
        let outpoint = transparent::OutPoint {
            hash: mvs_chain::transaction::Hash::from_bytes_exact([1u8; 32]),
            index: 0,
        };
        let input = transparent::Input::PrevOut {
            outpoint,
            unlock_script: Script(Vec::new()),
            sequence: 0,
        };
        let tx = Transaction::new(
            1,
            vec![input.clone(), input],
            vec![transparent::Output {
                value: Amount::try_new(1).unwrap(),
                lock_script: Script(Vec::new()),
                attachment: Attachment::etp(),
            }],
            LockTime::zero(),
        );
        assert_eq!(
            has_no_duplicate_inputs(&tx),
            Err(TransactionError::DoubleSpend(outpoint))
        );
    }

    #[test]
    fn asset_symbol_pattern_matches_spec_grammar() {
        assert!(SYMBOL_PATTERN.is_match("MVS"));
        assert!(SYMBOL_PATTERN.is_match("MVS.FOO"));
        assert!(!SYMBOL_PATTERN.is_match("mvs"));
        assert!(!SYMBOL_PATTERN.is_match("1MVS"));
    }

    #[test]
    fn locktime_zero_is_always_satisfied() {
        assert!(locktime_is_satisfied(
            &LockTime::zero(),
            block::Height(0),
            Utc::now()
        ));
    }

    #[test]
    fn output_value_overflow_is_rejected() {
        mvs_test::init();
        let max = Amount::<NonNegative>::try_new(mvs_chain::amount::MAX_MONEY).unwrap();
        let tx = Transaction::new(
            1,
            vec![transparent::Input::PrevOut {
                outpoint: transparent::OutPoint {
                    hash: mvs_chain::transaction::Hash::from_bytes_exact([0u8; 32]),
                    index: 0,
                },
                unlock_script: Script(Vec::new()),
                sequence: 0,
            }],
            vec![
                transparent::Output {
                    value: max,
                    lock_script: Script(Vec::new()),
                    attachment: Attachment::etp(),
                },
                transparent::Output {
                    value: Amount::try_new(1).unwrap(),
                    lock_script: Script(Vec::new()),
                    attachment: Attachment::etp(),
                },
            ],
            LockTime::zero(),
        );
        assert_eq!(
            output_value_in_range(&tx),
            Err(TransactionError::OutputValueOverflow)
        );
    }
}
