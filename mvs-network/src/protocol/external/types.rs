//! Newtype wrappers for primitive wire-format fields.

use std::fmt;
use std::io;

use mvs_chain::parameters::Network;
use mvs_chain::{BitcoinDeserialize, BitcoinSerialize, SerializationError};

/// The magic value placed at the front of every message, identifying which
/// network (mainnet/testnet) the sender believes it's on.
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct Magic(pub [u8; 4]);

impl fmt::Debug for Magic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Magic").field(&hex::encode(&self.0)).finish()
    }
}

impl From<Network> for Magic {
    fn from(network: Network) -> Self {
        match network {
            Network::Mainnet => Magic([0x4d, 0x53, 0x56, 0x4d]),
            Network::Testnet => Magic([0x54, 0x53, 0x56, 0x4d]),
        }
    }
}

impl BitcoinSerialize for Magic {
    fn bitcoin_serialize<W: io::Write>(&self, mut target: W) -> Result<(), io::Error> {
        self.0.bitcoin_serialize(&mut target)
    }
}

impl BitcoinDeserialize for Magic {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        Ok(Magic(<[u8; 4]>::bitcoin_deserialize(&mut reader)?))
    }
}

/// A BIP37 bloom filter, as carried by `filterload`.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Filter(pub Vec<u8>);

/// The tweak value mixed into a `filterload` bloom filter's hash seed.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Tweak(pub u32);
