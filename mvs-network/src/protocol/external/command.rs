//! The 12-byte ASCII command string that names a message's payload type.

use std::io::{self, Read};

use mvs_chain::{BitcoinDeserialize, BitcoinSerialize, SerializationError};

/// A single message command, one per [`super::Message`] variant.
///
/// Serializes as a 12-byte, null-padded ASCII string, matching Bitcoin's
/// own wire convention.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Command {
    Block,
    Tx,
    Headers,
    GetHeaders,
    GetBlocks,
    GetData,
    Inv,
    NotFound,
    MemPool,
    Reject,
    FilterLoad,
    MerkleBlock,
    /// Gossips a delegated proof-of-stake witness candidacy ahead of the
    /// epoch draw.
    WitnessAnnounce,
    /// Gossips a DID issuance or transfer ahead of block confirmation.
    DidAnnounce,
}

impl Command {
    fn as_str(self) -> &'static str {
        match self {
            Command::Block => "block",
            Command::Tx => "tx",
            Command::Headers => "headers",
            Command::GetHeaders => "getheaders",
            Command::GetBlocks => "getblocks",
            Command::GetData => "getdata",
            Command::Inv => "inv",
            Command::NotFound => "notfound",
            Command::MemPool => "mempool",
            Command::Reject => "reject",
            Command::FilterLoad => "filterload",
            Command::MerkleBlock => "merkleblock",
            Command::WitnessAnnounce => "witnessann",
            Command::DidAnnounce => "didann",
        }
    }

    /// The 12-byte, null-padded wire encoding of this command.
    pub fn bytes(self) -> [u8; 12] {
        let mut out = [0u8; 12];
        let s = self.as_str().as_bytes();
        out[..s.len()].copy_from_slice(s);
        out
    }

    fn from_str(s: &str) -> Option<Command> {
        Some(match s {
            "block" => Command::Block,
            "tx" => Command::Tx,
            "headers" => Command::Headers,
            "getheaders" => Command::GetHeaders,
            "getblocks" => Command::GetBlocks,
            "getdata" => Command::GetData,
            "inv" => Command::Inv,
            "notfound" => Command::NotFound,
            "mempool" => Command::MemPool,
            "reject" => Command::Reject,
            "filterload" => Command::FilterLoad,
            "merkleblock" => Command::MerkleBlock,
            "witnessann" => Command::WitnessAnnounce,
            "didann" => Command::DidAnnounce,
            _ => return None,
        })
    }
}

impl BitcoinSerialize for Command {
    fn bitcoin_serialize<W: io::Write>(&self, mut target: W) -> Result<(), io::Error> {
        target.write_all(&self.bytes())
    }
}

impl BitcoinDeserialize for Command {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        let mut raw = [0u8; 12];
        reader.read_exact(&mut raw)?;
        let end = raw.iter().position(|&b| b == 0).unwrap_or(12);
        let s = std::str::from_utf8(&raw[..end])
            .map_err(|_| SerializationError::Parse("command string is not valid ASCII"))?;
        Command::from_str(s).ok_or(SerializationError::Parse("unrecognized command string"))
    }
}
