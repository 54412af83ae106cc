//! Consensus-facing re-export of `mvs_chain::parameters`: the tunable
//! per-network knobs (`ChainParams`) and height-gated rule activations this
//! crate's validators dispatch on.

pub mod pos;
pub mod subsidy;

pub use mvs_chain::parameters::{activation, ChainParams, Network};
