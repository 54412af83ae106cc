//! Height-gated consensus rule activations.
//!
//! A sorted list of `(Height, Upgrade)` pairs consulted with an
//! upper-bound lookup, the same shape Bitcoin-derived codebases use for
//! BIP activation heights, applied here to rule families instead of BIP
//! numbers.

use crate::block::Height;

use super::Network;

/// A rule whose enforcement begins at a fixed height.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Rule {
    /// Attachments may carry `from_did`/`to_did` fields (the
    /// DID-verify attachment version).
    DidVerifyAttachment,
    /// Proof-of-stake block headers (version 2) are accepted.
    ProofOfStake,
    /// Delegated proof-of-stake block headers (version 3) are accepted.
    DelegatedProofOfStake,
    /// Pay-to-key-hash-with-attenuation-model output scripts are
    /// recognized and enforced.
    AttenuationModel,
}

const MAINNET_ACTIVATIONS: &[(Height, Rule)] = &[
    (Height(0), Rule::DidVerifyAttachment),
    (Height(0), Rule::ProofOfStake),
    (Height(1_270_000), Rule::DelegatedProofOfStake),
    (Height(1_270_000), Rule::AttenuationModel),
];

const TESTNET_ACTIVATIONS: &[(Height, Rule)] = &[
    (Height(0), Rule::DidVerifyAttachment),
    (Height(0), Rule::ProofOfStake),
    (Height(200_000), Rule::DelegatedProofOfStake),
    (Height(200_000), Rule::AttenuationModel),
];

/// Is `rule` active at `height` on `network`?
pub fn is_active(network: Network, rule: Rule, height: Height) -> bool {
    let table = match network {
        Network::Mainnet => MAINNET_ACTIVATIONS,
        Network::Testnet => TESTNET_ACTIVATIONS,
    };

    table
        .iter()
        .filter(|(_, r)| *r == rule)
        .any(|(activation_height, _)| *activation_height <= height)
}

/// Returns the height at which `rule` first activates, for callers that
/// want the cutoff itself rather than a plain boolean.
pub fn activation_height(network: Network, rule: Rule) -> Option<Height> {
    let table = match network {
        Network::Mainnet => MAINNET_ACTIVATIONS,
        Network::Testnet => TESTNET_ACTIVATIONS,
    };

    table
        .iter()
        .filter(|(_, r)| *r == rule)
        .map(|(h, _)| *h)
        .min()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dpos_inactive_before_activation_height() {
        assert!(!is_active(
            Network::Mainnet,
            Rule::DelegatedProofOfStake,
            Height(0)
        ));
        assert!(is_active(
            Network::Mainnet,
            Rule::DelegatedProofOfStake,
            Height(1_270_000)
        ));
    }

    #[test]
    fn activation_height_matches_table() {
        assert_eq!(
            activation_height(Network::Testnet, Rule::DelegatedProofOfStake),
            Some(Height(200_000))
        );
    }
}
