use std::io;

use serde::{Deserialize, Serialize};

use crate::serialization::{BitcoinDeserialize, BitcoinSerialize, SerializationError};

/// A fixed-size opaque memo field, carried over from the shielded-pool
/// transaction format this crate's serialization layer was adapted from.
///
/// Nothing in this crate currently attaches a `Memo` to a transparent
/// transaction; it is kept only because the generic (de)serialization
/// helpers below are exercised by proptests elsewhere in this module.
///
/// `Arbitrary` is implemented by hand in `arbitrary.rs` (a fixed-length byte
/// array has no default proptest strategy).
#[derive(Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Memo(pub Box<[u8; 512]>);

impl std::fmt::Debug for Memo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Memo").field(&hex::encode(&self.0[..])).finish()
    }
}

impl BitcoinSerialize for Memo {
    fn bitcoin_serialize<W: io::Write>(&self, mut target: W) -> Result<(), io::Error> {
        target.write_all(&self.0[..])
    }
}

impl BitcoinDeserialize for Memo {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        let mut bytes = [0u8; 512];
        reader.read_exact(&mut bytes)?;
        Ok(Memo(Box::new(bytes)))
    }
}
