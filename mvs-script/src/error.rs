//! Script execution and decoding errors.

use thiserror::Error;

/// Why a script failed to execute, or why a candidate script was rejected
/// before execution (oversized, malformed push, sig-op cap exceeded).
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ScriptError {
    #[error("script exceeds the maximum permitted size")]
    ScriptTooLarge,
    #[error("too many operations were executed ({0} > {})", crate::interpreter::MAX_OPS)]
    TooManyOperations(usize),
    #[error("stack holds more than the permitted {} elements", crate::interpreter::MAX_STACK_SIZE)]
    StackOverflow,
    #[error("tried to pop from an empty stack")]
    StackUnderflow,
    #[error("a push opcode's length prefix ran past the end of the script")]
    TruncatedPush,
    #[error("unbalanced OP_IF/OP_ELSE/OP_ENDIF")]
    UnbalancedConditional,
    #[error("OP_VERIFY (or an implicit verify) found a falsy top-of-stack")]
    VerifyFailed,
    #[error("OP_RETURN executed: output is provably unspendable")]
    ReturnEncountered,
    #[error("OP_CHECKSIG or OP_CHECKMULTISIG was given a key or signature it could not parse")]
    InvalidSignatureEncoding,
    #[error("signature did not verify against the given public key")]
    SignatureVerificationFailed,
    #[error("script references disabled opcode {0:#04x}")]
    DisabledOpcode(u8),
    #[error("the final stack is empty, or its top element is falsy")]
    ScriptFailed,
    #[error("the final stack has more than one element left")]
    CleanStackViolation,
    #[error("sig-op count for this evaluation exceeds the per-block cap")]
    TooManySigops,
    #[error("OP_CHECKLOCKTIMEVERIFY: input is not final, or the embedded lock type doesn't match the transaction's own locktime")]
    LockTimeNotSatisfied,
    #[error("OP_CHECKSEQUENCEVERIFY: input's relative lock has not matured")]
    SequenceLockNotSatisfied,
    #[error("attenuation-model blob is malformed: {0}")]
    InvalidAttenuationModel(&'static str),
    #[error("asset transfer does not preserve the attenuation model, or unlocks more than has vested")]
    AttenuationViolation,
}
