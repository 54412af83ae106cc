use mvs_chain::{BitcoinDeserialize, BitcoinSerialize, SerializationError};

/// Gossips a delegated proof-of-stake witness candidacy ahead of the next
/// epoch draw, so peers can build the same candidate set the draw will
/// pick from without waiting to observe it on-chain.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct WitnessAnnounce {
    pub address_hash160: [u8; 20],
    pub locked_stake: u64,
    pub has_witness_cert: bool,
}

impl BitcoinSerialize for WitnessAnnounce {
    fn bitcoin_serialize<W: std::io::Write>(&self, mut target: W) -> Result<(), std::io::Error> {
        self.address_hash160.bitcoin_serialize(&mut target)?;
        self.locked_stake.bitcoin_serialize(&mut target)?;
        self.has_witness_cert.bitcoin_serialize(&mut target)
    }
}

impl BitcoinDeserialize for WitnessAnnounce {
    fn bitcoin_deserialize<R: std::io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        Ok(WitnessAnnounce {
            address_hash160: <[u8; 20]>::bitcoin_deserialize(&mut reader)?,
            locked_stake: u64::bitcoin_deserialize(&mut reader)?,
            has_witness_cert: bool::bitcoin_deserialize(&mut reader)?,
        })
    }
}
