use proptest::{arbitrary::any, collection::vec, prelude::*};

use crate::{block::Height, cached::Cached, LedgerState};

use super::{CoinbaseData, Input};

impl Arbitrary for CoinbaseData {
    type Parameters = ();

    fn arbitrary_with(_args: ()) -> Self::Strategy {
        // Real coinbase data is capped well under 100 bytes; see the
        // field's doc comment on why we don't generate right up to that
        // limit.
        vec(any::<u8>(), 0..95).prop_map(CoinbaseData).boxed()
    }

    type Strategy = BoxedStrategy<Self>;
}

impl Input {
    /// A coinbase input claiming the block reward at `tip_height + 1`.
    pub fn coinbase_strategy(tip_height: Height) -> BoxedStrategy<Self> {
        (any::<CoinbaseData>(), any::<u32>())
            .prop_map(move |(data, sequence)| Input::Coinbase {
                height: Some(Cached::from(Height(tip_height.0 + 1))),
                data,
                sequence,
            })
            .boxed()
    }

    /// A non-coinbase input spending some arbitrary previous output.
    pub fn prevout_strategy() -> BoxedStrategy<Self> {
        (any::<super::OutPoint>(), any::<super::Script>(), any::<u32>())
            .prop_map(|(outpoint, unlock_script, sequence)| Input::PrevOut {
                outpoint,
                unlock_script,
                sequence,
            })
            .boxed()
    }

    /// A vector of inputs suitable for one transaction: a single coinbase
    /// input when `ledger_state.is_coinbase`, otherwise `1..=max_inputs`
    /// ordinary inputs.
    pub fn vec_strategy(ledger_state: LedgerState, max_inputs: usize) -> BoxedStrategy<Vec<Self>> {
        if ledger_state.is_coinbase {
            Self::coinbase_strategy(ledger_state.tip_height)
                .prop_map(|input| vec![input])
                .boxed()
        } else {
            vec(Self::prevout_strategy(), 1..=max_inputs).boxed()
        }
    }
}

impl Arbitrary for Input {
    type Parameters = LedgerState;

    fn arbitrary_with(ledger_state: Self::Parameters) -> Self::Strategy {
        if ledger_state.is_coinbase {
            Self::coinbase_strategy(ledger_state.tip_height)
        } else {
            Self::prevout_strategy()
        }
    }

    type Strategy = BoxedStrategy<Self>;
}
