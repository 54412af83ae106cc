//! The Metaverse (MVS) ledger data model and canonical codec.
//!
//! This crate has no knowledge of script execution, storage, or the
//! organizer: it only knows how to represent, hash, and (de)serialize the
//! entities that make up the chain. See `mvs-script`, `mvs-state`, and
//! `mvs-consensus` for the rest of the core.

#[macro_use]
extern crate serde;

pub mod amount;
pub mod attachment;
pub mod block;
mod cached;
mod compactint;
pub mod parameters;
pub mod serialization;
pub mod transaction;
pub mod transparent;
pub mod work;

pub(crate) mod fmt;

pub use compactint::CompactInt;
pub use serialization::{BitcoinDeserialize, BitcoinSerialize, SerializationError};

/// Parameters threaded through proptest `Arbitrary` strategies so generated
/// blocks and transactions respect the invariants a validator would check:
/// a coinbase only in the first transaction slot, at the height the caller
/// is building towards, on a specific network.
#[cfg(any(test, feature = "proptest-impl"))]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LedgerState {
    pub tip_height: block::Height,
    pub network: parameters::Network,
    pub is_coinbase: bool,
}

#[cfg(any(test, feature = "proptest-impl"))]
impl Default for LedgerState {
    fn default() -> Self {
        LedgerState {
            tip_height: block::Height::MIN,
            network: parameters::Network::Mainnet,
            is_coinbase: true,
        }
    }
}
