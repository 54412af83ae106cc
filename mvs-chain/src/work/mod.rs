//! Proof-of-work/proof-of-stake difficulty types.
//!
//! The actual hashing primitives (Ethash-style mix+hash for PoW, the
//! stake-kernel hash for PoS) are third-party cryptographic algorithms,
//! opaque but deterministic from this crate's point of view: this module
//! fixes the wire representation of the difficulty target and the
//! comparison rule, and leaves the mixing function itself behind a trait so
//! `mvs-consensus` can swap in a real implementation without touching the
//! codec.

pub mod difficulty;
