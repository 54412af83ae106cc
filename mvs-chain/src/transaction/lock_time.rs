use std::{convert::TryFrom, io};

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    block,
    serialization::{BitcoinDeserialize, BitcoinSerialize, SerializationError, SmallUnixTime},
};

/// A transaction's lock time: a single `u32` wire field that is interpreted
/// either as a block height or as a Unix timestamp, depending on which side
/// of `LockTime::MIN_TIMESTAMP` its raw value falls.
///
/// A transaction with this field set to a non-zero value cannot be mined
/// until the referenced height has been reached, or the referenced time has
/// passed.
///
/// `Arbitrary` is implemented by hand in `arbitrary.rs` so the two variants
/// can be generated with different, non-overlapping ranges.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum LockTime {
    /// Lock until a block height has been reached.
    Height(block::Height),
    /// Lock until a timestamp has passed.
    Time(SmallUnixTime),
}

impl LockTime {
    /// The smallest raw value interpreted as a timestamp rather than a
    /// height. Values below this are block heights.
    pub const MIN_TIMESTAMP: u32 = 500_000_000;
    /// The largest value a lock-time timestamp can hold.
    pub const MAX_TIMESTAMP: u32 = u32::MAX;

    /// A lock time that is always satisfied: height zero.
    pub fn zero() -> LockTime {
        LockTime::Height(block::Height(0))
    }

    fn raw_value(&self) -> u32 {
        match self {
            LockTime::Height(height) => height.0,
            LockTime::Time(time) => u32::try_from(time.0.timestamp()).unwrap_or(Self::MAX_TIMESTAMP),
        }
    }
}

impl BitcoinSerialize for LockTime {
    fn bitcoin_serialize<W: io::Write>(&self, target: W) -> Result<(), io::Error> {
        self.raw_value().bitcoin_serialize(target)
    }
}

impl BitcoinDeserialize for LockTime {
    fn bitcoin_deserialize<R: io::Read>(reader: R) -> Result<Self, SerializationError> {
        let raw = u32::bitcoin_deserialize(reader)?;
        Ok(if raw < Self::MIN_TIMESTAMP {
            LockTime::Height(block::Height(raw))
        } else {
            LockTime::Time(SmallUnixTime(Utc.timestamp(raw as i64, 0)))
        })
    }
}
