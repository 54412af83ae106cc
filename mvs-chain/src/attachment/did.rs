//! Decentralized identifiers (DIDs): a symbol bound to an address, unique
//! chain-wide, transferable by chaining through the prior DID output of
//! the same symbol.
//!
//! Grounded on `src/lib/bitcoin/chain/attachment/account/account.cpp`'s DID
//! record shape (symbol plus the address it resolves to).

use std::io;

use crate::serialization::{BitcoinDeserialize, BitcoinSerialize, SerializationError};

use super::FixedString;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[cfg_attr(any(test, feature = "proptest-impl"), derive(proptest_derive::Arbitrary))]
#[repr(u8)]
pub enum DidStatus {
    Issue = 0,
    Transfer = 1,
}

impl DidStatus {
    fn from_u8(value: u8) -> Option<DidStatus> {
        Some(match value {
            0 => DidStatus::Issue,
            1 => DidStatus::Transfer,
            _ => return None,
        })
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[cfg_attr(any(test, feature = "proptest-impl"), derive(proptest_derive::Arbitrary))]
pub struct Did {
    pub symbol: FixedString<64>,
    pub address: FixedString<64>,
    pub status: DidStatus,
}

impl BitcoinSerialize for Did {
    fn bitcoin_serialize<W: io::Write>(&self, mut target: W) -> Result<(), io::Error> {
        self.symbol.bitcoin_serialize(&mut target)?;
        self.address.bitcoin_serialize(&mut target)?;
        (self.status as u8).bitcoin_serialize(&mut target)
    }
}

impl BitcoinDeserialize for Did {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        Ok(Did {
            symbol: FixedString::bitcoin_deserialize(&mut reader)?,
            address: FixedString::bitcoin_deserialize(&mut reader)?,
            status: DidStatus::from_u8(u8::bitcoin_deserialize(&mut reader)?)
                .ok_or(SerializationError::Parse("unrecognized DID status"))?,
        })
    }
}
