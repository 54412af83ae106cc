//! Multi-signature identifiable tokens (MIT): a non-fungible, symbol-keyed
//! token carrying arbitrary content, transferable by chaining through its
//! prior output.
//!
//! Grounded on `src/lib/bitcoin/chain/attachment/asset/asset_mit.cpp`'s
//! shape: a fixed symbol/address pair plus a variable-length content blob
//! (`to_short_address`/content fields upstream), rather than another
//! 64-byte fixed string -- MIT content is explicitly meant to carry
//! arbitrary metadata, unlike an asset's fixed descriptive fields.

use std::io;

use crate::serialization::{BitcoinDeserialize, BitcoinSerialize, SerializationError};

use super::FixedString;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[cfg_attr(any(test, feature = "proptest-impl"), derive(proptest_derive::Arbitrary))]
#[repr(u8)]
pub enum MitStatus {
    Issue = 0,
    Transfer = 1,
}

impl MitStatus {
    fn from_u8(value: u8) -> Option<MitStatus> {
        Some(match value {
            0 => MitStatus::Issue,
            1 => MitStatus::Transfer,
            _ => return None,
        })
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[cfg_attr(any(test, feature = "proptest-impl"), derive(proptest_derive::Arbitrary))]
pub struct AssetMit {
    pub symbol: FixedString<64>,
    pub address: FixedString<64>,
    pub status: MitStatus,
    pub content: Vec<u8>,
}

impl BitcoinSerialize for AssetMit {
    fn bitcoin_serialize<W: io::Write>(&self, mut target: W) -> Result<(), io::Error> {
        self.symbol.bitcoin_serialize(&mut target)?;
        self.address.bitcoin_serialize(&mut target)?;
        (self.status as u8).bitcoin_serialize(&mut target)?;
        self.content.bitcoin_serialize(&mut target)
    }
}

impl BitcoinDeserialize for AssetMit {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        let symbol = FixedString::bitcoin_deserialize(&mut reader)?;
        let address = FixedString::bitcoin_deserialize(&mut reader)?;
        let status = MitStatus::from_u8(u8::bitcoin_deserialize(&mut reader)?)
            .ok_or(SerializationError::Parse("unrecognized MIT status"))?;
        let content = Vec::<u8>::bitcoin_deserialize(&mut reader)?;

        Ok(AssetMit {
            symbol,
            address,
            status,
            content,
        })
    }
}
