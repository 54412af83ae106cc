//! Explicit chain configuration.
//!
//! Global mutable genesis constants and script-context flags become this
//! explicit struct, threaded through the validator instead of read from
//! process-wide statics.

pub mod activation;
mod genesis;
mod params;

pub use genesis::{genesis_block, genesis_hash, GENESIS_PREVIOUS_BLOCK_HASH};
pub use params::ChainParams;

/// Which Metaverse network a node is following.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[cfg_attr(any(test, feature = "proptest-impl"), derive(proptest_derive::Arbitrary))]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    pub fn params(self) -> ChainParams {
        ChainParams::for_network(self)
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Network::Mainnet => "Mainnet",
            Network::Testnet => "Testnet",
        };
        f.write_str(s)
    }
}
