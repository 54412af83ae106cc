//! Validator error types, realized as `thiserror` enums rather than bare
//! strings.

use mvs_chain::{block, parameters::Network, transparent, work::difficulty::Difficulty};

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum TransactionError {
    #[error("transaction has no inputs")]
    NoInputs,
    #[error("transaction has no outputs")]
    NoOutputs,
    #[error("transaction exceeds the maximum serialized size")]
    SizeExceeded,
    #[error("transaction output value sums to more than MAX_MONEY")]
    OutputValueOverflow,
    #[error("coinbase input is only allowed in the first transaction of a block")]
    CoinbaseInputFound,
    #[error("coinbase transaction must be in the first position")]
    CoinbasePosition,
    #[error("input {0:?} spends an output that doesn't exist or is already spent")]
    DoubleSpend(transparent::OutPoint),
    #[error("script evaluation failed for input {index}: {source}")]
    InvalidScript {
        index: usize,
        source: mvs_script::ScriptError,
    },
    #[error("sum of inputs is less than sum of outputs")]
    ValueUnbalanced,
    #[error("fee {paid} is below the protocol minimum of {minimum}")]
    InsufficientFee { paid: u64, minimum: u64 },
    #[error("asset symbol {0:?} does not match the required [A-Z.][A-Z0-9.]* pattern")]
    InvalidAssetSymbol(String),
    #[error("asset symbol {0:?} is already registered")]
    DuplicateAsset(String),
    #[error("secondary issuance of {0:?} does not meet the asset's ownership threshold")]
    SecondaryIssueThresholdNotMet(String),
    #[error("secondary issuance of {0:?} is forbidden")]
    SecondaryIssueForbidden(String),
    #[error("certificate {symbol:?} does not descend from a cert owned by an input")]
    CertNotOwned { symbol: String },
    #[error("DID symbol {0:?} is already registered")]
    DuplicateDid(String),
    #[error("DID transfer for {0:?} does not consume the prior DID output of that symbol")]
    DidChainBroken(String),
    #[error("MIT symbol {0:?} is already registered")]
    DuplicateMit(String),
    #[error("MIT transfer for {0:?} does not consume the prior MIT output of that symbol")]
    MitChainBroken(String),
    #[error("MIT content is only allowed on a registration, not a transfer, for {0:?}")]
    MitContentOnTransfer(String),
    #[error("asset transfer outputs for {symbol:?} send {sent} but inputs only carry {available}")]
    AssetTransferExceedsAvailable {
        symbol: String,
        sent: u64,
        available: u64,
    },
    #[error("output script address does not match its attachment's address")]
    AddressMismatch,
    #[error("attachment payload is invalid: {0}")]
    AttachmentInvalid(&'static str),
    #[error("transaction locktime is not yet satisfied")]
    LockTimeNotSatisfied,
    #[error("block's script sig-op count exceeds the cap")]
    TooManySigops,
}

#[derive(Debug, thiserror::Error)]
pub enum BlockError {
    #[error("block has no transactions")]
    NoTransactions,
    #[error(transparent)]
    Transaction(#[from] TransactionError),
    #[error(transparent)]
    Subsidy(#[from] SubsidyError),
    #[error("block's Merkle root doesn't match its header")]
    BadMerkleRoot {
        actual: block::merkle::Root,
        expected: block::merkle::Root,
    },
    #[error("block contains a duplicate transaction")]
    DuplicateTransaction,
    #[error("header declares an unrecognized consensus version {0}")]
    UnknownVersion(u32),
    #[error("difficulty {0:?} is looser than {1:?}'s target difficulty limit")]
    TargetDifficultyLimit(Difficulty, Network),
    #[error("block hash does not satisfy its proof-of-work difficulty target")]
    BadProofOfWork,
    #[error(transparent)]
    Time(#[from] block::BlockTimeError),
    #[error("block timestamp is not after the median time of the last 11 blocks")]
    TimeTooOld,
    #[error("coinstake input does not reference a mature, sufficiently valued, controlled output")]
    BadProofOfStake { reason: &'static str },
    #[error("stake output was already used to produce a block within the recent window")]
    StakeOutputReused,
    #[error("delegated proof-of-stake block's difficulty does not equal its parent's")]
    DifficultyMismatch,
    #[error("witness slot {0} does not match the slot drawn for this timestamp")]
    BadWitnessSlot(u32),
    #[error("signing witness is not a member of the current epoch's drawn witness set")]
    NotAWitness,
    #[error("block is missing the header signature its consensus version requires")]
    MissingSignature,
    #[error("{count} consecutive blocks of version {version} exceeds the cap of {cap}")]
    SuccessiveVersionCapExceeded { version: u32, count: u32, cap: u32 },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum SubsidyError {
    #[error("block has no coinbase transaction")]
    NoCoinbase,
    #[error("coinbase output total {actual} exceeds the allowed subsidy plus fees {allowed}")]
    ExceedsAllowed { actual: u64, allowed: u64 },
}
