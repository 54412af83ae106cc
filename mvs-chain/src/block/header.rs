use std::io::Write;

use bytes::Buf;
use chrono::{DateTime, Duration, TimeZone, Utc};
use primitive_types::U256;
use thiserror::Error;

use crate::{serialization::sha256d, BitcoinDeserialize, BitcoinSerialize, SerializationError};
use mvs_serde_derive::{BtcDeserialize, BtcSerialize};

use crate::{cached::Cached, work::difficulty::Difficulty};

use super::{merkle, Hash, Height};

/// Which consensus mode a header's `version` selects.
///
/// Grounded on `include/metaverse/bitcoin/chain/header.hpp`'s
/// `block_version` enum; `Version::try_from` rejects anything outside
/// `block_version_min..block_version_max`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Version {
    ProofOfWork,
    ProofOfStake,
    DelegatedProofOfStake,
}

impl Version {
    pub fn from_header_version(version: u32) -> Option<Version> {
        match version {
            1 => Some(Version::ProofOfWork),
            2 => Some(Version::ProofOfStake),
            3 => Some(Version::DelegatedProofOfStake),
            _ => None,
        }
    }
}

/// A block header, containing metadata about a block.
///
/// Unlike Bitcoin, a header's `bits` field carries the full 256-bit
/// difficulty target rather than a compact nBits word, and it carries a
/// `mixhash` alongside `nonce` for Ethash-style proof-of-work verification.
/// A single field layout serves all three consensus modes; unused
/// fields in the proof-of-stake and
/// delegated-proof-of-stake cases are zeroed rather than omitted, so that
/// `Header::len` stays constant regardless of `version`.
#[derive(
    Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize, BtcSerialize, BtcDeserialize,
)]
pub struct Header {
    /// The block's version field: 1 selects proof-of-work, 2 proof-of-stake,
    /// 3 delegated proof-of-stake. Any other value is rejected by the
    /// block validator before a `Header` is ever constructed from untrusted
    /// bytes.
    pub version: u32,

    /// The hash of the previous block, used to create a chain of blocks back
    /// to the genesis block.
    pub previous_block_hash: Hash,

    /// The root of the transaction Merkle tree, binding the block header to
    /// the transactions in the block.
    pub merkle_root: merkle::Root,

    /// The block timestamp: a Unix epoch time (UTC) when the miner or
    /// witness produced the header.
    pub time: DateTime<Utc>,

    /// The difficulty target this block's proof (PoW mix+hash, or PoS
    /// kernel hash) must satisfy. For delegated proof-of-stake blocks this
    /// must equal the parent's `bits` unchanged.
    pub bits: Difficulty,

    /// For proof-of-work, the nonce a miner varies while searching for a
    /// hash satisfying `bits`. For delegated proof-of-stake, this instead
    /// encodes the witness slot index for the block.
    pub nonce: u64,

    /// The Ethash mix digest accompanying `nonce` for proof-of-work
    /// verification. Unused (zero) outside of proof-of-work headers.
    pub mixhash: U256,

    /// The block height, as reported by the header itself rather than
    /// derived from the coinbase input (a Metaverse header carries its own
    /// height field, unlike Bitcoin's BIP-34 coinbase-script convention).
    pub number: u32,

    /// For efficiency, we cache the hash of this block after computing it
    /// the first time. This field is not part of the consensus
    /// serialization.
    hash: Cached<Hash>,
}

#[derive(Error, Debug)]
pub enum BlockTimeError {
    #[error("invalid time {0:?} in block header {1:?} {2:?}: block time is more than 2 hours in the future ({3:?}). Hint: check your machine's date, time, and time zone.")]
    InvalidBlockTime(
        DateTime<Utc>,
        crate::block::Height,
        crate::block::Hash,
        DateTime<Utc>,
    ),
}

impl Header {
    /// Length of the fixed-size portion of a serialized header, in bytes:
    /// 4 (version) + 32 (previous_block_hash) + 32 (merkle_root) + 4 (time)
    /// + 32 (bits) + 8 (nonce) + 32 (mixhash) + 4 (number).
    pub const fn len() -> usize {
        4 + 32 + 32 + 4 + 32 + 8 + 32 + 4
    }

    #[allow(clippy::too_many_arguments)]
    pub fn new(
        version: u32,
        previous_block_hash: Hash,
        merkle_root: merkle::Root,
        time: DateTime<Utc>,
        bits: Difficulty,
        nonce: u64,
        mixhash: U256,
        number: u32,
    ) -> Header {
        Header {
            version,
            previous_block_hash,
            merkle_root,
            time,
            bits,
            nonce,
            mixhash,
            number,
            hash: Cached::new(),
        }
    }

    /// The consensus mode this header selects, or `None` if `version` is
    /// out of range.
    pub fn consensus_version(&self) -> Option<Version> {
        Version::from_header_version(self.version)
    }

    pub fn height(&self) -> Height {
        Height(self.number)
    }

    pub fn time_is_valid_at(
        &self,
        now: DateTime<Utc>,
        height: &Height,
        hash: &Hash,
    ) -> Result<(), BlockTimeError> {
        let two_hours_in_the_future = now
            .checked_add_signed(Duration::hours(2))
            .expect("calculating 2 hours in the future does not overflow");
        if self.time <= two_hours_in_the_future {
            Ok(())
        } else {
            Err(BlockTimeError::InvalidBlockTime(
                self.time,
                *height,
                *hash,
                two_hours_in_the_future,
            ))?
        }
    }

    pub fn bitcoin_serialize_to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Header::len());
        self.bitcoin_serialize(&mut out)
            .expect("serializing to a Vec is infallible");
        out
    }

    /// Deserializes a block header from a `Buf`, hashing the raw bytes once
    /// instead of reserializing them later to compute `hash()`.
    pub fn deserialize_from_buf<B: Buf>(mut src: B) -> Result<Self, SerializationError> {
        if src.remaining() < Header::len() {
            return Err(SerializationError::Parse(
                "not enough bytes in block header",
            ));
        }
        let src = src.copy_to_bytes(Header::len());
        let mut hash_writer = sha256d::Writer::default();
        hash_writer
            .write_all(&src[..])
            .expect("writing to a Writer is infallible");
        let own_hash = Hash(hash_writer.finish());

        let mut src = std::io::Cursor::new(src);
        let version = u32::bitcoin_deserialize(&mut src)?;
        let previous_block_hash = Hash::bitcoin_deserialize(&mut src)?;
        let merkle_root = merkle::Root::bitcoin_deserialize(&mut src)?;
        let time = Utc.timestamp(u32::bitcoin_deserialize(&mut src)? as i64, 0);
        let bits = Difficulty::bitcoin_deserialize(&mut src)?;
        let nonce = u64::bitcoin_deserialize(&mut src)?;
        let mixhash = U256::bitcoin_deserialize(&mut src)?;
        let number = u32::bitcoin_deserialize(&mut src)?;

        Ok(Header {
            version,
            previous_block_hash,
            merkle_root,
            time,
            bits,
            nonce,
            mixhash,
            number,
            hash: Cached::from(own_hash),
        })
    }
}

/// A header with a count of the number of transactions in its block.
///
/// This structure is used in the Metaverse network protocol to answer
/// `getheaders` without shipping full block bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountedHeader {
    pub header: Header,
    pub transaction_count: usize,
}

impl BitcoinSerialize for CountedHeader {
    fn bitcoin_serialize<W: Write>(&self, mut target: W) -> Result<(), std::io::Error> {
        self.header.bitcoin_serialize(&mut target)?;
        crate::CompactInt::from(self.transaction_count).bitcoin_serialize(&mut target)
    }
}

impl BitcoinDeserialize for CountedHeader {
    fn bitcoin_deserialize<R: std::io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        Ok(CountedHeader {
            header: Header::bitcoin_deserialize(&mut reader)?,
            transaction_count: crate::CompactInt::bitcoin_deserialize(&mut reader)?.value() as usize,
        })
    }
}
