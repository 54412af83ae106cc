//! Blocks and block-related structures (heights, headers, etc.)
#![allow(clippy::unit_arg)]

mod hash;
mod header;
mod height;
mod serialize;

pub mod merkle;

#[cfg(any(test, feature = "proptest-impl"))]
mod arbitrary;
#[cfg(test)]
mod tests;

use std::{convert::TryInto, fmt, io::Read, iter::FromIterator, sync::Arc};

use crate::compactint::CompactInt;
use crate::{BitcoinDeserialize, BitcoinSerialize, SerializationError};
use bytes::{Buf, BytesMut};
pub use hash::Hash;
pub use header::{BlockTimeError, Version};
pub use header::{CountedHeader, Header};
pub use height::Height;
use mvs_serde_derive::BtcSerialize;

use serde::{Deserialize, Serialize};

use crate::{fmt::DisplayToDebug, transaction::Transaction, transparent};

use self::serialize::MAX_BLOCK_BYTES;

/// A block, containing a header and the list of transactions it binds via
/// its Merkle root.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, BtcSerialize)]
pub struct Block {
    /// The block header, containing block metadata.
    pub header: Header,
    /// The block transactions.
    pub transactions: Vec<std::sync::Arc<Transaction>>,
}

/// Don't ever use this in production. Seriously.
///
/// Having this method makes testing easier. That's it.
impl BitcoinDeserialize for Block {
    fn bitcoin_deserialize<R: Read>(reader: R) -> Result<Self, SerializationError>
    where
        Self: Sized,
    {
        let mut src = reader.bytes().map(|result| match result {
            Err(e) => panic!("Error deserializing block! {}", e),
            Ok(byte) => byte,
        });
        let mut src = BytesMut::from_iter(&mut src);
        Block::deserialize_from_buf(&mut src)
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fmter = f.debug_struct("Block");
        fmter.field("height", &self.coinbase_height());
        fmter.field("version", &self.header.consensus_version());
        fmter.field("hash", &DisplayToDebug(self.hash())).finish()
    }
}

impl Block {
    /// The block height, as carried by the header.
    pub fn coinbase_height(&self) -> Option<Height> {
        Some(self.header.height())
    }

    /// Compute the hash of this block.
    pub fn hash(&self) -> Hash {
        Hash::from(self)
    }

    /// `true` if `transactions[1]` is shaped like a coinstake transaction:
    /// its first output carries no value (a marker output) and its sole
    /// input spends an output controlled by the same address that
    /// receives the second output -- the coinstake invariant
    /// proof-of-stake block bodies carry.
    pub fn has_coinstake(&self) -> bool {
        self.transactions
            .get(1)
            .map(|tx| tx.is_coinstake())
            .unwrap_or(false)
    }

    /// Deserializes a block from an already length-delimited buffer.
    ///
    /// Enforces that the block contains exactly one coinbase transaction in
    /// the first position, and that it fits within `MAX_BLOCK_BYTES`; full
    /// semantic validation (Merkle root, consensus-mode dispatch, and so on)
    /// belongs to the block validator, not the codec.
    pub fn deserialize_from_buf(src: &mut BytesMut) -> Result<Self, SerializationError> {
        let header = Header::deserialize_from_buf(src.split_to(Header::len()))?;

        let mut src = src.reader().take(MAX_BLOCK_BYTES - Header::len() as u64);
        let tx_count = {
            let tx_count = CompactInt::bitcoin_deserialize(&mut src)?;
            tx_count.value()
        };

        // Sanity check number of transactions to prevent DOS attacks: every
        // transaction needs at least one input, and an input needs at least
        // 36 bytes (outpoint) plus some minimal script/sequence overhead.
        if tx_count > MAX_BLOCK_BYTES / (36 * 4) {
            return Err(SerializationError::Parse(
                "block contained too many transactions for each to have at least one input",
            ));
        }
        let mut transactions = Vec::with_capacity(
            tx_count
                .try_into()
                .expect("usize::min must be greater than MAX_BLOCK_BYTES / (36 * 4)"),
        );

        for _ in 0..tx_count {
            transactions.push(<Arc<Transaction>>::bitcoin_deserialize(&mut src)?);
        }

        if transactions
            .get(0)
            .map(|tx| !tx.is_coinbase())
            .unwrap_or(true)
        {
            return Err(SerializationError::Parse(
                "block does not start with a coinbase transaction",
            ));
        }
        if transactions
            .iter()
            .skip(1)
            .any(|tx| tx.contains_coinbase_input())
        {
            return Err(SerializationError::Parse(
                "coinbase input outside the first transaction",
            ));
        }

        let actual_merkle_root =
            merkle::Root::from_iter(transactions.iter().map(|tx| tx.hash()));
        if actual_merkle_root != header.merkle_root {
            return Err(SerializationError::Parse("invalid Merkle root"));
        }

        Ok(Block {
            header,
            transactions,
        })
    }
}

impl<'a> From<&'a Block> for Hash {
    fn from(block: &'a Block) -> Hash {
        (&block.header).into()
    }
}
