//! Organizer-level errors: consensus failures from `mvs-consensus` plus
//! the bookkeeping failures specific to queueing, connecting, and
//! reorganizing blocks.

#[derive(Debug, thiserror::Error)]
pub enum OrganizerError {
    #[error(transparent)]
    Block(#[from] mvs_consensus::BlockError),
    #[error(transparent)]
    Transaction(#[from] mvs_consensus::TransactionError),
    #[error("store operation failed: {0}")]
    Store(#[from] mvs_state::BoxError),
    #[error("block {0:?} has no recognized consensus version")]
    UnknownVersion(u32),
    #[error("block doesn't connect to the main chain, an orphan, or a known ancestor")]
    Disconnected,
    #[error("delegated proof-of-stake block requires witness candidates the caller didn't supply")]
    MissingWitnessContext,
    #[error("proof-of-stake block requires stake context the caller didn't supply")]
    MissingStakeContext,
    #[error("reorg candidate chain failed to connect at block {0}; reverted to the prior tip")]
    ReorgFailed(usize),
}
