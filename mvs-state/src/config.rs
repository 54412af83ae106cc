//! On-disk layout and `sled::Config` construction.
//!
//! Not present in the file this crate is descended from (only referenced,
//! as `crate::Config`, from its `sled_state.rs`); authored from the usage
//! site plus this store's own schema-versioning and single-process-lock
//! requirements.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use mvs_chain::parameters::Network;

/// Where a `Store` keeps its files, and how `sled` should open them.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The root directory under which every network's state lives, one
    /// subdirectory per network.
    pub cache_dir: PathBuf,
    /// Cap on the in-memory page cache `sled` keeps, in bytes.
    pub memory_cache_bytes: u64,
    /// Whether to fsync on every flush. Slower, but survives a host crash
    /// without losing the tail of the write-ahead log.
    pub ephemeral: bool,
}

impl Default for Config {
    fn default() -> Self {
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mvs");

        Config {
            cache_dir,
            memory_cache_bytes: 512 * 1024 * 1024,
            ephemeral: false,
        }
    }
}

impl Config {
    /// The directory a given network's state lives in.
    pub fn network_dir(&self, network: Network) -> PathBuf {
        self.cache_dir.join(match network {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
        })
    }

    /// Builds the `sled::Config` this crate's `Store` opens its database
    /// with.
    pub fn sled_config(&self, network: Network) -> sled::Config {
        let config = sled::Config::default()
            .cache_capacity(self.memory_cache_bytes)
            .temporary(self.ephemeral);

        if self.ephemeral {
            config
        } else {
            config.path(self.network_dir(network))
        }
    }
}
