//! Difficulty targets.
//!
//! Unlike Bitcoin's 4-byte "nBits" encoding, a Metaverse header's `bits`
//! field carries the full 256-bit target directly (`include/metaverse/
//! bitcoin/chain/header.hpp` declares it as `u256 bits`, not a packed
//! exponent/mantissa word) -- there is no compact form to expand. We wrap it
//! in `Difficulty` so callers can't confuse a target with an arbitrary
//! `U256`, and serialize it as 32 bytes, big-endian, the same byte order
//! `consensus/libdevcore`'s `FixedHash` types use for `mixhash` and the
//! Ethash mix digest it is compared against.

use std::io;

use primitive_types::U256;

use crate::parameters::Network;
use crate::serialization::{BitcoinDeserialize, BitcoinSerialize, SerializationError};

/// A 256-bit difficulty target, as carried verbatim in a header's `bits`
/// field.
///
/// Smaller values represent more work: a valid proof-of-work hash, treated
/// as a 256-bit big-endian integer, must be less than or equal to this
/// target. Proof-of-stake headers reuse the same type for their
/// kernel-hash target; delegated proof-of-stake headers carry it forward
/// unchanged from the parent (`mvs-consensus` enforces that equality, this
/// type just carries the value).
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Difficulty(pub U256);

impl Difficulty {
    /// The loosest difficulty target permitted for `network`'s
    /// proof-of-work (the easiest allowed target, analogous to Bitcoin's
    /// `PowLimit`).
    pub fn target_difficulty_limit(network: Network) -> Difficulty {
        match network {
            Network::Mainnet => Difficulty(U256::max_value() >> 32),
            Network::Testnet => Difficulty(U256::max_value() >> 8),
        }
    }

    /// Does `hash`, read as a big-endian 256-bit integer, satisfy this
    /// target?
    pub fn is_satisfied_by(self, hash: U256) -> bool {
        hash <= self.0
    }
}

impl BitcoinSerialize for Difficulty {
    fn bitcoin_serialize<W: io::Write>(&self, mut target: W) -> Result<(), io::Error> {
        let mut bytes = [0u8; 32];
        self.0.to_big_endian(&mut bytes);
        target.write_all(&bytes)
    }
}

impl BitcoinDeserialize for Difficulty {
    fn bitcoin_deserialize<R: io::Read>(reader: R) -> Result<Self, SerializationError> {
        let bytes = <[u8; 32]>::bitcoin_deserialize(reader)?;
        Ok(Difficulty(U256::from_big_endian(&bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn testnet_limit_is_looser_than_mainnet() {
        let main = Difficulty::target_difficulty_limit(Network::Mainnet);
        let test = Difficulty::target_difficulty_limit(Network::Testnet);
        assert!(test.0 > main.0);
    }

    #[test]
    fn satisfied_by_respects_ordering() {
        let target = Difficulty(U256::from(1000u64));
        assert!(target.is_satisfied_by(U256::from(999u64)));
        assert!(target.is_satisfied_by(U256::from(1000u64)));
        assert!(!target.is_satisfied_by(U256::from(1001u64)));
    }
}
