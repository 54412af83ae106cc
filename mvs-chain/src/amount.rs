//! A value type for amounts of ETP (and, generically, any other quantity
//! bounded the same way: asset quantities, asset max supplies).
//!
//! Referenced but never shipped by the upstream crate this module is
//! descended from (`transparent::Output::value` names `Amount<NonNegative>`
//! without a definition); the bound itself is `2^63 - 1`, the same limit
//! Bitcoin uses for satoshi amounts.

use std::{
    convert::TryFrom,
    fmt,
    marker::PhantomData,
    ops::{Add, Sub},
};

use crate::serialization::{BitcoinDeserialize, BitcoinSerialize, SerializationError};

/// The maximum value any single `Amount` may hold.
pub const MAX_MONEY: u64 = (1u64 << 63) - 1;

/// Marker for amounts that must never be negative (inputs, outputs, UTXO
/// values, asset quantities and supplies).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct NonNegative;

/// Marker for amounts that may be used as an intermediate signed delta
/// (e.g. `sum(outputs) - sum(inputs)` while computing a fee) before the
/// final non-negative balance check.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Any;

/// An amount of ETP, bounded to `[0, MAX_MONEY]` for the `NonNegative`
/// constraint.
#[derive(Copy, Clone, Eq, PartialEq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Amount<C>(u64, PhantomData<C>);

#[derive(Debug, thiserror::Error)]
pub enum AmountError {
    #[error("amount {0} exceeds the maximum allowed value {MAX_MONEY}")]
    Overflow(u64),
}

impl<C> Amount<C> {
    pub const fn zero() -> Amount<C> {
        Amount(0, PhantomData)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl Amount<NonNegative> {
    pub fn try_new(value: u64) -> Result<Self, AmountError> {
        if value > MAX_MONEY {
            Err(AmountError::Overflow(value))
        } else {
            Ok(Amount(value, PhantomData))
        }
    }

    pub fn checked_add(&self, other: Amount<NonNegative>) -> Option<Amount<NonNegative>> {
        self.0
            .checked_add(other.0)
            .filter(|v| *v <= MAX_MONEY)
            .map(|v| Amount(v, PhantomData))
    }

    pub fn checked_sub(&self, other: Amount<NonNegative>) -> Option<Amount<NonNegative>> {
        self.0.checked_sub(other.0).map(|v| Amount(v, PhantomData))
    }
}

impl<C> fmt::Debug for Amount<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Amount").field(&self.0).finish()
    }
}

impl<C> fmt::Display for Amount<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u64> for Amount<NonNegative> {
    type Error = AmountError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Amount::try_new(value)
    }
}

impl Add for Amount<NonNegative> {
    type Output = Amount<NonNegative>;

    fn add(self, rhs: Self) -> Self::Output {
        self.checked_add(rhs)
            .expect("overflowing ETP addition is a consensus bug, caught earlier by checked_add")
    }
}

impl Sub for Amount<NonNegative> {
    type Output = Amount<NonNegative>;

    fn sub(self, rhs: Self) -> Self::Output {
        self.checked_sub(rhs)
            .expect("underflowing ETP subtraction is a consensus bug, caught earlier by checked_sub")
    }
}

impl<C> BitcoinSerialize for Amount<C> {
    fn bitcoin_serialize<W: std::io::Write>(&self, target: W) -> Result<(), std::io::Error> {
        self.0.bitcoin_serialize(target)
    }
}

impl BitcoinDeserialize for Amount<NonNegative> {
    fn bitcoin_deserialize<R: std::io::Read>(reader: R) -> Result<Self, SerializationError> {
        let raw = u64::bitcoin_deserialize(reader)?;
        Amount::try_new(raw).map_err(|_| SerializationError::Parse("amount exceeds MAX_MONEY"))
    }
}

#[cfg(any(test, feature = "proptest-impl"))]
impl proptest::prelude::Arbitrary for Amount<NonNegative> {
    type Parameters = ();
    type Strategy = proptest::strategy::BoxedStrategy<Self>;

    fn arbitrary_with(_args: ()) -> Self::Strategy {
        use proptest::prelude::*;
        (0..=MAX_MONEY)
            .prop_map(|v| Amount::try_new(v).expect("within MAX_MONEY by construction"))
            .boxed()
    }
}
