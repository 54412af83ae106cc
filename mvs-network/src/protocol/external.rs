/// A Tokio codec that transforms an `AsyncRead` into a `Stream` of `Message`s.
pub mod codec;
/// Inventory items.
mod inv;
/// An enum of all supported message types.
mod message;

/// A single command string identifying a message's payload type.
mod command;
/// Newtype wrappers for primitive wire-format fields.
pub mod types;

pub use codec::Codec;
pub use command::Command;
pub use inv::InventoryHash;
pub use message::{
    DidAnnounce, GetBlocks, GetHeaders, MerkleBlock, Message, RejectReason, WitnessAnnounce,
};
