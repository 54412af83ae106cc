//! Asset certificates: a (symbol, cert type) pair bound to an owning
//! address, issued once and then transferable as a unit.
//!
//! Field widths follow `asset.rs`'s grounding in `asset_detail.hpp`'s fixed
//! 64-byte string convention; `asset_cert.hpp` itself wasn't available to
//! ground this on, so the cert-type/status encoding here is this crate's
//! own, built so that a symbol+type pair exists at most once on chain:
//! issue, then transfer, chain.

use std::io;

use crate::serialization::{BitcoinDeserialize, BitcoinSerialize, SerializationError};

use super::FixedString;

/// What privilege a certificate grants over its asset.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[cfg_attr(any(test, feature = "proptest-impl"), derive(proptest_derive::Arbitrary))]
#[repr(u8)]
pub enum CertType {
    Issue = 1,
    Domain = 2,
    Naming = 3,
    Witness = 4,
}

impl CertType {
    fn from_u8(value: u8) -> Option<CertType> {
        Some(match value {
            1 => CertType::Issue,
            2 => CertType::Domain,
            3 => CertType::Naming,
            4 => CertType::Witness,
            _ => return None,
        })
    }
}

/// Whether this output issues a new certificate or transfers an existing
/// one, chaining from a prior `AssetCert` output of the same symbol/type.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[cfg_attr(any(test, feature = "proptest-impl"), derive(proptest_derive::Arbitrary))]
#[repr(u8)]
pub enum CertStatus {
    Issue = 0,
    Transfer = 1,
}

impl CertStatus {
    fn from_u8(value: u8) -> Option<CertStatus> {
        Some(match value {
            0 => CertStatus::Issue,
            1 => CertStatus::Transfer,
            _ => return None,
        })
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[cfg_attr(any(test, feature = "proptest-impl"), derive(proptest_derive::Arbitrary))]
pub struct AssetCert {
    pub symbol: FixedString<64>,
    pub owner: FixedString<64>,
    pub cert_type: CertType,
    pub status: CertStatus,
}

impl BitcoinSerialize for AssetCert {
    fn bitcoin_serialize<W: io::Write>(&self, mut target: W) -> Result<(), io::Error> {
        self.symbol.bitcoin_serialize(&mut target)?;
        self.owner.bitcoin_serialize(&mut target)?;
        (self.cert_type as u8).bitcoin_serialize(&mut target)?;
        (self.status as u8).bitcoin_serialize(&mut target)
    }
}

impl BitcoinDeserialize for AssetCert {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        let symbol = FixedString::bitcoin_deserialize(&mut reader)?;
        let owner = FixedString::bitcoin_deserialize(&mut reader)?;
        let cert_type = CertType::from_u8(u8::bitcoin_deserialize(&mut reader)?)
            .ok_or(SerializationError::Parse("unrecognized asset cert type"))?;
        let status = CertStatus::from_u8(u8::bitcoin_deserialize(&mut reader)?)
            .ok_or(SerializationError::Parse("unrecognized asset cert status"))?;

        Ok(AssetCert {
            symbol,
            owner,
            cert_type,
            status,
        })
    }
}
