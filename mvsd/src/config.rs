//! On-disk node configuration: which network to follow, where `mvs-state`
//! keeps its files, and which address to listen for peers on.
//!
//! Follows the plain `serde` + `toml` pattern `mvs_state::Config` already
//! establishes, just one layer up: a single struct covering every crate
//! this binary wires together.

use std::net::SocketAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};

use mvs_chain::parameters::Network;

/// Root configuration loaded from a TOML file (or defaulted, if none is
/// given on the command line).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub network: Network,
    pub state: mvs_state::Config,
    pub listen_addr: SocketAddr,
    /// Peers to dial on startup, in addition to any inbound connections.
    pub initial_peers: Vec<SocketAddr>,
    /// `tracing_subscriber::EnvFilter` directive string, e.g. `mvs=info,warn`.
    pub log_filter: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        NodeConfig {
            network: Network::Mainnet,
            state: mvs_state::Config::default(),
            listen_addr: "0.0.0.0:5251".parse().expect("valid default listen address"),
            initial_peers: Vec::new(),
            log_filter: "mvs=info,warn".to_string(),
        }
    }
}

impl NodeConfig {
    /// Loads a config from a TOML file at `path`.
    pub fn load(path: &Path) -> color_eyre::Result<NodeConfig> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Writes this config out as TOML, for `mvsd generate-config`.
    pub fn to_toml(&self) -> color_eyre::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_round_trips_through_toml() {
        let config = NodeConfig::default();
        let serialized = config.to_toml().unwrap();
        let deserialized: NodeConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(deserialized.network, config.network);
        assert_eq!(deserialized.listen_addr, config.listen_addr);
    }
}
