//! Definitions of network messages.

use std::fmt;
use std::sync::Arc;

use mvs_chain::{
    block::{self, Block},
    transaction::Transaction,
};

use super::inv::InventoryHash;
use super::types::*;
use super::Command;

mod get_blocks;
pub use get_blocks::GetBlocks;

mod get_headers;
pub use get_headers::GetHeaders;

mod merkle_block;
pub use merkle_block::MerkleBlock;

mod witness_announce;
pub use witness_announce::WitnessAnnounce;

mod did_announce;
pub use did_announce::DidAnnounce;

/// A Metaverse network message.
///
/// The wire format is mostly inherited from Bitcoin, but this
/// enum stores an internal representation rather than the wire format: the
/// translation between the two happens only during serialization and
/// deserialization, in [`super::Codec`]. Bitcoin identifies messages by a
/// 12-byte ASCII command string; we use the enum discriminant instead and
/// treat the command string as a serialization detail.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum Message {
    /// A `getblocks` message.
    ///
    /// `block_header_hashes` is a series of known block hashes spaced out
    /// along the peer's best chain, used to locate the fork point. The
    /// peer responds with an `inv` of the hashes following the fork point.
    GetBlocks(GetBlocks),

    /// An `inv` message, advertising one or more objects the sender knows
    /// about. Sent unsolicited or in response to `getblocks`.
    Inv(Vec<InventoryHash>),

    /// A `getheaders` message, same semantics as `getblocks` but requesting
    /// a `headers` response instead of an `inv`.
    GetHeaders(GetHeaders),

    /// A `headers` message, returned in response to `getheaders`. Each
    /// header is paired with a transaction count, always zero since headers
    /// never carry a transaction body.
    Headers(Vec<block::CountedHeader>),

    /// A `getdata` message, requesting the content of specific objects
    /// previously advertised by `inv`.
    GetData(Vec<InventoryHash>),

    /// A `block` message carrying a full block.
    Block(Arc<Block>),

    /// A `tx` message carrying a single transaction.
    Tx(Arc<Transaction>),

    /// A `notfound` message, returned when some of the objects requested
    /// by `getdata` aren't available.
    NotFound(Vec<InventoryHash>),

    /// A `mempool` message, requesting a peer's full mempool contents as
    /// an `inv`.
    Mempool,

    /// A `reject` message, reporting why a previously received message
    /// or the object it carried was refused.
    Reject {
        /// The command of the rejected message.
        message: String,
        /// Machine-readable rejection reason.
        ccode: RejectReason,
        /// Human-readable rejection reason.
        reason: String,
        /// Extra data identifying the rejected object, usually its hash.
        data: Option<[u8; 32]>,
    },

    /// A `filterload` message (BIP37), installing a bloom filter that
    /// narrows which transactions a peer will receive.
    FilterLoad {
        filter: Filter,
        hash_functions_count: u32,
        tweak: Tweak,
        flags: u8,
    },

    /// A `merkleblock` message, a reply to `getdata` for a filtered block:
    /// a block header plus the Merkle branch proving which transactions
    /// matched the receiver's bloom filter.
    MerkleBlock(MerkleBlock),

    /// MVS extension: announces a delegated proof-of-stake witness
    /// candidacy ahead of the next epoch's draw.
    WitnessAnnounce(WitnessAnnounce),

    /// MVS extension: announces a DID issuance or transfer ahead of block
    /// confirmation.
    DidAnnounce(DidAnnounce),
}

/// Reject message CCodes.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum RejectReason {
    Malformed = 0x01,
    Invalid = 0x10,
    Obsolete = 0x11,
    Duplicate = 0x12,
    Nonstandard = 0x40,
    Dust = 0x41,
    InsufficientFee = 0x42,
    Checkpoint = 0x43,
    Other = 0x50,
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Message::GetBlocks { .. } => "getblocks",
            Message::Inv(_) => "inv",
            Message::GetHeaders { .. } => "getheaders",
            Message::Headers(_) => "headers",
            Message::GetData(_) => "getdata",
            Message::Block(_) => "block",
            Message::Tx(_) => "tx",
            Message::NotFound(_) => "notfound",
            Message::Mempool => "mempool",
            Message::Reject { .. } => "reject",
            Message::FilterLoad { .. } => "filterload",
            Message::MerkleBlock(_) => "merkleblock",
            Message::WitnessAnnounce(_) => "witnessann",
            Message::DidAnnounce(_) => "didann",
        })
    }
}

impl Message {
    pub fn command(&self) -> Command {
        match self {
            Message::Block { .. } => Command::Block,
            Message::Tx { .. } => Command::Tx,
            Message::Headers { .. } => Command::Headers,
            Message::GetHeaders { .. } => Command::GetHeaders,
            Message::GetBlocks { .. } => Command::GetBlocks,
            Message::GetData { .. } => Command::GetData,
            Message::Inv { .. } => Command::Inv,
            Message::NotFound { .. } => Command::NotFound,
            Message::Mempool {} => Command::MemPool,
            Message::Reject { .. } => Command::Reject,
            Message::FilterLoad { .. } => Command::FilterLoad,
            Message::MerkleBlock(_) => Command::MerkleBlock,
            Message::WitnessAnnounce(_) => Command::WitnessAnnounce,
            Message::DidAnnounce(_) => Command::DidAnnounce,
        }
    }
}
