//! Asset issuance and transfer payloads.
//!
//! Grounded on `include/metaverse/bitcoin/chain/attachment/asset/
//! asset_detail.hpp`: the field order and the fixed 64-byte width of the
//! symbol/issuer/address/description strings come directly from that
//! header's `ASSET_DETAIL_*_FIX_SIZE` constants. The distilled spec's
//! secondary-issue threshold encoding (0..127 normal, 255 = forbidden) is
//! followed as written rather than the literal upstream
//! `forbidden_secondaryissue_threshold = 0` / `freely_secondaryissue_threshold
//! = 127`.

use std::io;

use crate::serialization::{BitcoinDeserialize, BitcoinSerialize, SerializationError};

use super::FixedString;

/// Secondary-issue threshold sentinel meaning "no one may secondary-issue".
pub const SECONDARY_ISSUE_FORBIDDEN: u8 = 255;

/// A newly issued (or re-issued) asset, carried by the output that
/// creates or extends its supply.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[cfg_attr(any(test, feature = "proptest-impl"), derive(proptest_derive::Arbitrary))]
pub struct AssetDetail {
    pub symbol: FixedString<64>,
    pub maximum_supply: u64,
    pub decimal_number: u8,
    /// Share, out of 127, of `maximum_supply` an asset holder must own to
    /// be allowed to secondary-issue more of this asset; `255` forbids
    /// secondary issuance entirely.
    pub secondaryissue_threshold: u8,
    pub issuer: FixedString<64>,
    pub address: FixedString<64>,
    pub description: FixedString<64>,
}

impl AssetDetail {
    pub fn is_secondaryissue_forbidden(&self) -> bool {
        self.secondaryissue_threshold == SECONDARY_ISSUE_FORBIDDEN
    }

    /// Does `owned_supply` out of `total_supply` meet this asset's
    /// secondary-issue threshold?
    pub fn secondaryissue_owns_enough(&self, owned_supply: u64, total_supply: u64) -> bool {
        if self.is_secondaryissue_forbidden() {
            return false;
        }
        if total_supply == 0 {
            return false;
        }
        // owned / total >= threshold / 127, without floating point.
        (owned_supply as u128) * 127 >= (total_supply as u128) * self.secondaryissue_threshold as u128
    }
}

impl BitcoinSerialize for AssetDetail {
    fn bitcoin_serialize<W: io::Write>(&self, mut target: W) -> Result<(), io::Error> {
        self.symbol.bitcoin_serialize(&mut target)?;
        self.maximum_supply.bitcoin_serialize(&mut target)?;
        self.decimal_number.bitcoin_serialize(&mut target)?;
        self.secondaryissue_threshold.bitcoin_serialize(&mut target)?;
        // two reserved bytes, zeroed, matching the upstream layout's
        // `unused2`/`unused3` padding the asset_type word out to 4 bytes.
        target.write_all(&[0u8, 0u8])?;
        self.issuer.bitcoin_serialize(&mut target)?;
        self.address.bitcoin_serialize(&mut target)?;
        self.description.bitcoin_serialize(&mut target)
    }
}

impl BitcoinDeserialize for AssetDetail {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        let symbol = FixedString::bitcoin_deserialize(&mut reader)?;
        let maximum_supply = u64::bitcoin_deserialize(&mut reader)?;
        let decimal_number = u8::bitcoin_deserialize(&mut reader)?;
        let secondaryissue_threshold = u8::bitcoin_deserialize(&mut reader)?;
        let mut reserved = [0u8; 2];
        io::Read::read_exact(&mut reader, &mut reserved)?;
        let issuer = FixedString::bitcoin_deserialize(&mut reader)?;
        let address = FixedString::bitcoin_deserialize(&mut reader)?;
        let description = FixedString::bitcoin_deserialize(&mut reader)?;

        Ok(AssetDetail {
            symbol,
            maximum_supply,
            decimal_number,
            secondaryissue_threshold,
            issuer,
            address,
            description,
        })
    }
}

/// Moving a quantity of an already-issued asset between addresses.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[cfg_attr(any(test, feature = "proptest-impl"), derive(proptest_derive::Arbitrary))]
pub struct AssetTransfer {
    pub symbol: FixedString<64>,
    pub quantity: u64,
}

impl BitcoinSerialize for AssetTransfer {
    fn bitcoin_serialize<W: io::Write>(&self, mut target: W) -> Result<(), io::Error> {
        self.symbol.bitcoin_serialize(&mut target)?;
        self.quantity.bitcoin_serialize(&mut target)
    }
}

impl BitcoinDeserialize for AssetTransfer {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        Ok(AssetTransfer {
            symbol: FixedString::bitcoin_deserialize(&mut reader)?,
            quantity: u64::bitcoin_deserialize(&mut reader)?,
        })
    }
}
