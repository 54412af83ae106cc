use std::sync::Arc;

use crate::work::difficulty::Difficulty;

use super::*;

use crate::LedgerState;
use chrono::{TimeZone, Utc};
use primitive_types::U256;
use proptest::{
    arbitrary::{any, Arbitrary},
    prelude::*,
};

impl Arbitrary for Block {
    type Parameters = LedgerState;

    fn arbitrary_with(ledger_state: Self::Parameters) -> Self::Strategy {
        let transactions_strategy = Transaction::vec_strategy(ledger_state, 2);

        (any::<Header>(), transactions_strategy)
            .prop_map(|(header, transactions)| Self {
                header,
                transactions,
            })
            .boxed()
    }

    type Strategy = BoxedStrategy<Self>;
}

impl Block {
    /// Returns a strategy for creating Vecs of blocks with increasing height of
    /// the given length.
    pub fn partial_chain_strategy(
        init: LedgerState,
        count: usize,
    ) -> BoxedStrategy<Vec<Arc<Self>>> {
        let mut current = init;
        let mut vec = Vec::with_capacity(count);
        for _ in 0..count {
            vec.push(Block::arbitrary_with(current).prop_map(Arc::new));
            current.tip_height = current
                .tip_height
                .next()
                .expect("tip height does not overflow in tests");
        }

        vec.boxed()
    }
}

impl Arbitrary for Header {
    type Parameters = ();

    fn arbitrary_with(_args: ()) -> Self::Strategy {
        (
            1u32..=3u32,
            any::<Hash>(),
            any::<merkle::Root>(),
            (0i64..(u32::MAX as i64)),
            any::<u64>(),
            any::<u32>(),
            0u32..(u32::MAX),
        )
            .prop_map(
                |(version, previous_block_hash, merkle_root, timestamp, nonce, mixhash_low, number)| {
                    Header::new(
                        version,
                        previous_block_hash,
                        merkle_root,
                        Utc.timestamp(timestamp, 0),
                        Difficulty(U256::max_value() >> 32),
                        nonce,
                        U256::from(mixhash_low),
                        number,
                    )
                },
            )
            .boxed()
    }

    type Strategy = BoxedStrategy<Self>;
}
