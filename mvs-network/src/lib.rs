//! The Metaverse P2P wire format: the message frame, the message enum, and
//! a handful of payload types, plus the codec translating between the two.
//! This crate only knows how to encode and decode messages, not how to open
//! a connection, negotiate a version, or manage a peer set.

pub mod constants;
pub mod protocol;

pub use protocol::external::{
    Codec, Command, DidAnnounce, GetBlocks, GetHeaders, InventoryHash, MerkleBlock, Message,
    RejectReason, WitnessAnnounce,
};
