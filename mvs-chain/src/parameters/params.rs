//! Per-network consensus parameters.
//!
//! The successive-version caps `K_v` differ between mainnet and testnet
//! in the source and must come from settings rather than be assumed
//! equal; this struct is that settings
//! surface, populated once per `Network` rather than hard-coded at each
//! call site.

use crate::amount::{Amount, NonNegative};

use super::Network;

/// Consensus-relevant parameters for one network.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ChainParams {
    /// Maximum number of consecutive blocks of a single header version
    /// (PoW/PoS/DPoS) the organizer will accept before rejecting the next
    /// one outright (spec sec 4.5, "Successive-height cap").
    pub max_consecutive_version_blocks: u32,
    /// Minimum miner fee (in satoshi-equivalent units) accepted for an
    /// ordinary transaction.
    pub min_fee: u64,
    /// Minimum miner fee required to issue a new asset.
    pub min_fee_to_issue_asset: u64,
    /// Coinbase maturity, in blocks, before a coinbase output may be spent.
    pub coinbase_maturity: u32,
    /// Reward paid to the foundation address by the PoS genesis block.
    pub pos_genesis_reward: u64,
    /// Number of witness certificates auto-issued to the foundation
    /// address by the PoS genesis block.
    pub witness_cert_count: u32,
    /// Number of witnesses drawn by the follow-the-satoshi lottery each
    /// DPoS epoch.
    pub fts_witness_count: u32,
    /// Per-block cap on script signature operations.
    pub max_block_sigops: u32,
    /// Maximum serialized transaction size outside of a block context.
    pub max_standalone_tx_bytes: u64,
    /// Maximum serialized transaction size inside a block context.
    pub max_block_tx_bytes: u64,
}

impl ChainParams {
    pub fn for_network(network: Network) -> ChainParams {
        match network {
            Network::Mainnet => ChainParams {
                max_consecutive_version_blocks: 12,
                min_fee: 10_000,
                min_fee_to_issue_asset: 10 * 100_000_000,
                coinbase_maturity: 100,
                pos_genesis_reward: 2_100_000 * 100_000_000,
                witness_cert_count: 23,
                fts_witness_count: 23,
                max_block_sigops: 20_000,
                max_standalone_tx_bytes: 1024 * 1024,
                max_block_tx_bytes: 100 * 1024,
            },
            Network::Testnet => ChainParams {
                max_consecutive_version_blocks: 6,
                min_fee: 10_000,
                min_fee_to_issue_asset: 10 * 100_000_000,
                coinbase_maturity: 10,
                pos_genesis_reward: 2_100_000 * 100_000_000,
                witness_cert_count: 23,
                fts_witness_count: 23,
                max_block_sigops: 20_000,
                max_standalone_tx_bytes: 1024 * 1024,
                max_block_tx_bytes: 100 * 1024,
            },
        }
    }

    pub fn min_fee_amount(&self) -> Amount<NonNegative> {
        Amount::try_new(self.min_fee).expect("min_fee is within MAX_MONEY")
    }
}
