//! The script engine: a stack machine over byte-strings and small
//! integers, matching Bitcoin's pre-SegWit opcode set, plus the
//! MVS-specific templates (lock-height, sequence-lock, attenuation-model)
//! that higher layers pattern-match without changing opcode semantics.
//!
//! Built fresh for this crate: nothing in this codebase's ancestry
//! ships an interpreter, so this module is grounded in standard Bitcoin
//! pre-SegWit script semantics plus its own template descriptions.

pub mod attenuation;
pub mod error;
pub mod interpreter;
pub mod opcode;
pub mod templates;

pub use error::ScriptError;
pub use interpreter::{count_sigops, execute, ExecutionContext, VerifyFlags, MAX_BLOCK_SIGOPS};
pub use templates::ScriptPattern;

#[cfg(test)]
mod tests {
    use mvs_chain::transparent::Script;

    use super::*;

    fn push(bytes: &[u8]) -> Vec<u8> {
        let mut out = vec![bytes.len() as u8];
        out.extend_from_slice(bytes);
        out
    }

    #[test]
    fn simple_equal_script_validates() {
        mvs_test::init();

        let mut script = push(b"hello");
        script.extend(push(b"hello"));
        script.push(0x87); // OP_EQUAL

        let result = execute(
            &Script(Vec::new()),
            &Script(script),
            None,
            VerifyFlags::empty(),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn mismatched_equal_script_fails() {
        mvs_test::init();

        let mut script = push(b"hello");
        script.extend(push(b"world"));
        script.push(0x87); // OP_EQUAL

        let result = execute(
            &Script(Vec::new()),
            &Script(script),
            None,
            VerifyFlags::empty(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn p2pkh_pattern_is_recognized() {
        let mut script = vec![0x76, 0xa9, 0x14];
        script.extend_from_slice(&[0xab; 20]);
        script.push(0x88);
        script.push(0xac);

        match ScriptPattern::recognize(&Script(script)) {
            ScriptPattern::Pkh { hash160 } => assert_eq!(hash160, [0xab; 20]),
            other => panic!("expected Pkh, got {:?}", other),
        }
    }

    #[test]
    fn op_return_script_fails_immediately() {
        mvs_test::init();
        let result = execute(
            &Script(Vec::new()),
            &Script(vec![0x6a]),
            None,
            VerifyFlags::empty(),
        );
        assert_eq!(result, Err(ScriptError::ReturnEncountered));
    }
}
