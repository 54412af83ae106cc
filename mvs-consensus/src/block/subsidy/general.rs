//! Coinbase subsidy and coinage (lock-height) reward calculation.

use mvs_chain::{
    amount::{Amount, AmountError, NonNegative},
    block::Height,
    transaction::Transaction,
    transparent,
};

use crate::parameters::subsidy::*;

/// The fixed coinbase reward at `height`. This chain has no halving
/// schedule, unlike Bitcoin, so `height` is taken only for API symmetry
/// with a halving-aware subsidy signature.
pub fn block_subsidy(_height: Height) -> Result<Amount<NonNegative>, AmountError> {
    Amount::try_new(BLOCK_REWARD)
}

/// The coinage reward for locking `locked_value` for `locked_blocks`
/// blocks: zero below `MIN_REWARD_LOCK_HEIGHT`, linearly interpolated up to
/// `MAX_REWARD_RATE_BASIS_POINTS` (in ten-thousandths of `locked_value`) at
/// `MAX_REWARD_LOCK_HEIGHT` and beyond.
pub fn lockblock_reward(
    locked_value: Amount<NonNegative>,
    locked_blocks: u32,
) -> Result<Amount<NonNegative>, AmountError> {
    if locked_blocks < MIN_REWARD_LOCK_HEIGHT {
        return Amount::try_new(0);
    }
    let capped_blocks = locked_blocks.min(MAX_REWARD_LOCK_HEIGHT) as u64;
    let span = (MAX_REWARD_LOCK_HEIGHT - MIN_REWARD_LOCK_HEIGHT) as u64;
    let progress = capped_blocks - MIN_REWARD_LOCK_HEIGHT as u64;
    let rate_basis_points = (MAX_REWARD_RATE_BASIS_POINTS * progress) / span;

    let reward = locked_value
        .value()
        .saturating_mul(rate_basis_points)
        / 10_000;
    Amount::try_new(reward)
}

/// Every output in `transaction` whose value equals `amount`.
pub fn find_output_with_amount(
    transaction: &Transaction,
    amount: Amount<NonNegative>,
) -> Vec<transparent::Output> {
    transaction
        .outputs
        .iter()
        .filter(|output| output.value == amount)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_subsidy_is_the_genesis_reward() {
        mvs_test::init();
        assert_eq!(
            block_subsidy(Height(0)).unwrap().value(),
            50 * COIN
        );
        assert_eq!(
            block_subsidy(Height(1_000_000)).unwrap().value(),
            50 * COIN
        );
    }

    #[test]
    fn lockblock_reward_is_zero_below_minimum() {
        let locked = Amount::try_new(COIN).unwrap();
        assert_eq!(lockblock_reward(locked, MIN_REWARD_LOCK_HEIGHT - 1).unwrap().value(), 0);
    }

    #[test]
    fn lockblock_reward_is_capped_at_maximum() {
        let locked = Amount::try_new(COIN).unwrap();
        let at_cap = lockblock_reward(locked, MAX_REWARD_LOCK_HEIGHT).unwrap();
        let past_cap = lockblock_reward(locked, MAX_REWARD_LOCK_HEIGHT * 2).unwrap();
        assert_eq!(at_cap, past_cap);
        assert_eq!(at_cap.value(), COIN / 2);
    }

    #[test]
    fn find_output_with_amount_filters_by_value() {
        use mvs_chain::{attachment::Attachment, transaction::LockTime, transparent::Script};

        let matching = Amount::try_new(1_000).unwrap();
        let other = Amount::try_new(2_000).unwrap();
        let tx = Transaction::new(
            1,
            vec![],
            vec![
                transparent::Output {
                    value: matching,
                    lock_script: Script(Vec::new()),
                    attachment: Attachment::etp(),
                },
                transparent::Output {
                    value: other,
                    lock_script: Script(Vec::new()),
                    attachment: Attachment::etp(),
                },
            ],
            LockTime::zero(),
        );

        assert_eq!(find_output_with_amount(&tx, matching).len(), 1);
        assert_eq!(find_output_with_amount(&tx, Amount::try_new(3_000).unwrap()).len(), 0);
    }
}
