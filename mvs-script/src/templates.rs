//! Pattern recognizers for the script templates the transaction validator
//! cares about. None of these change opcode semantics; they classify a
//! `Script` by shape so the validator can apply the height/sequence/
//! attenuation rules this crate layers on top of plain execution.

use std::convert::TryInto;

use mvs_chain::transparent::Script;

use crate::attenuation::AttenuationModel;
use crate::opcode::Opcode;

/// The recognized shape of a lock script, used by the validator to decide
/// which extra consensus rule (if any) applies to spending this output.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ScriptPattern {
    /// `OP_DUP OP_HASH160 <20-byte hash> OP_EQUALVERIFY OP_CHECKSIG`
    Pkh { hash160: [u8; 20] },
    /// `OP_HASH160 <20-byte hash> OP_EQUAL`
    Sh { hash160: [u8; 20] },
    /// A P2PKH spendable only once `spending_tx.block_height >= height`.
    PkhWithLockHeight { hash160: [u8; 20], height: u32 },
    /// A P2PKH spendable only once the spending input's `sequence` encodes
    /// a relative lock at or past `encoded_sequence`.
    PkhWithSequenceLock {
        hash160: [u8; 20],
        encoded_sequence: u32,
    },
    /// A P2PKH whose asset quantity unlocks over time per `model`.
    PkhWithAttenuation {
        hash160: [u8; 20],
        model: AttenuationModel,
    },
    /// Doesn't match any recognized template; still executable as a raw
    /// script, just not eligible for the height/sequence/attenuation rules.
    Other,
}

fn hash160_from(bytes: &[u8]) -> Option<[u8; 20]> {
    if bytes.len() != 20 {
        return None;
    }
    let mut out = [0u8; 20];
    out.copy_from_slice(bytes);
    Some(out)
}

impl ScriptPattern {
    /// Recognize `script`'s template by its raw opcode shape.
    pub fn recognize(script: &Script) -> ScriptPattern {
        let bytes = &script.0;

        if let Some(pattern) = Self::recognize_pkh(bytes) {
            return pattern;
        }
        if let Some(pattern) = Self::recognize_sh(bytes) {
            return pattern;
        }
        if let Some(pattern) = Self::recognize_pkh_lock_height(bytes) {
            return pattern;
        }
        if let Some(pattern) = Self::recognize_pkh_sequence_lock(bytes) {
            return pattern;
        }
        if let Some(pattern) = Self::recognize_pkh_attenuation(bytes) {
            return pattern;
        }

        ScriptPattern::Other
    }

    fn recognize_pkh(bytes: &[u8]) -> Option<ScriptPattern> {
        // OP_DUP OP_HASH160 <20> OP_EQUALVERIFY OP_CHECKSIG
        if bytes.len() != 25 {
            return None;
        }
        if bytes[0] != 0x76 || bytes[1] != 0xa9 || bytes[2] != 0x14 {
            return None;
        }
        if bytes[23] != 0x88 || bytes[24] != 0xac {
            return None;
        }
        Some(ScriptPattern::Pkh {
            hash160: hash160_from(&bytes[3..23])?,
        })
    }

    fn recognize_sh(bytes: &[u8]) -> Option<ScriptPattern> {
        // OP_HASH160 <20> OP_EQUAL
        if bytes.len() != 23 {
            return None;
        }
        if bytes[0] != 0xa9 || bytes[1] != 0x14 || bytes[22] != 0x87 {
            return None;
        }
        Some(ScriptPattern::Sh {
            hash160: hash160_from(&bytes[2..22])?,
        })
    }

    /// `<height> OP_CHECKLOCKTIMEVERIFY OP_DROP` followed by a plain P2PKH body.
    fn recognize_pkh_lock_height(bytes: &[u8]) -> Option<ScriptPattern> {
        if bytes.len() < 4 || bytes[0] != 0x04 {
            return None;
        }
        let height = u32::from_le_bytes(bytes[1..5].try_into().ok()?);
        let rest = &bytes[5..];
        if rest.first() != Some(&0xb1) || rest.get(1) != Some(&0x75) {
            return None;
        }
        match Self::recognize_pkh(&rest[2..])? {
            ScriptPattern::Pkh { hash160 } => {
                Some(ScriptPattern::PkhWithLockHeight { hash160, height })
            }
            _ => None,
        }
    }

    /// `<sequence> OP_CHECKSEQUENCEVERIFY OP_DROP` followed by a plain P2PKH body.
    fn recognize_pkh_sequence_lock(bytes: &[u8]) -> Option<ScriptPattern> {
        if bytes.len() < 4 || bytes[0] != 0x04 {
            return None;
        }
        let encoded_sequence = u32::from_le_bytes(bytes[1..5].try_into().ok()?);
        let rest = &bytes[5..];
        if rest.first() != Some(&0xb2) || rest.get(1) != Some(&0x75) {
            return None;
        }
        match Self::recognize_pkh(&rest[2..])? {
            ScriptPattern::Pkh { hash160 } => Some(ScriptPattern::PkhWithSequenceLock {
                hash160,
                encoded_sequence,
            }),
            _ => None,
        }
    }

    /// `<model-blob> OP_DROP` followed by a plain P2PKH body. The model
    /// push's length is data-dependent, so this walks the opcode stream
    /// directly rather than reusing `recognize_pkh`'s fixed-length check.
    fn recognize_pkh_attenuation(bytes: &[u8]) -> Option<ScriptPattern> {
        let (first, rest) = bytes.split_first()?;
        let push_len = match Opcode::decode(*first) {
            Opcode::PushBytes(n) => n as usize,
            _ => return None,
        };
        if rest.len() < push_len + 1 || rest[push_len] != 0x75 {
            return None;
        }
        let model_bytes = &rest[..push_len];
        let tail = &rest[push_len + 1..];

        let model = AttenuationModel::parse(model_bytes).ok()?;
        match Self::recognize_pkh(tail)? {
            ScriptPattern::Pkh { hash160 } => {
                Some(ScriptPattern::PkhWithAttenuation { hash160, model })
            }
            _ => None,
        }
    }
}
