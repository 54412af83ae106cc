use mvs_chain::attachment::did::Did;
use mvs_chain::{BitcoinDeserialize, BitcoinSerialize, SerializationError};

/// Gossips a DID issuance or transfer ahead of block confirmation, so peers
/// can flag a conflicting mempool transaction before it reaches a block.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DidAnnounce {
    pub did: Did,
}

impl BitcoinSerialize for DidAnnounce {
    fn bitcoin_serialize<W: std::io::Write>(&self, mut target: W) -> Result<(), std::io::Error> {
        self.did.bitcoin_serialize(&mut target)
    }
}

impl BitcoinDeserialize for DidAnnounce {
    fn bitcoin_deserialize<R: std::io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        Ok(DidAnnounce {
            did: Did::bitcoin_deserialize(&mut reader)?,
        })
    }
}
