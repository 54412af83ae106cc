//! The script stack machine.
//!
//! `Interpreter::execute` runs the execution contract:
//! `(input_script, prev_output_script, tx, input_index, flags) ->
//! Valid | InvalidScript{reason}`. Opcode behavior otherwise matches
//! Bitcoin's pre-SegWit evaluation (run the unlock script, then the lock
//! script, over a single carried-forward stack; BIP16 P2SH re-execution
//! is handled by the caller re-invoking this function with the redeem
//! script once the initial pass leaves a P2SH-shaped result).

use mvs_chain::transaction::{LockTime, Transaction};
use mvs_chain::transparent::Script;
use mvs_chain::BitcoinSerialize;
use ripemd160::{Digest as _, Ripemd160};
use sha2::{Digest as _, Sha256};

use crate::error::ScriptError;
use crate::opcode::Opcode;

/// Hard limit on executed opcodes per script evaluation (push-data bytes
/// don't count individually).
pub const MAX_OPS: usize = 201;
/// Hard limit on items that may be held on the stack or alt-stack at once.
pub const MAX_STACK_SIZE: usize = 1000;
/// A single push may carry at most this many bytes.
pub const MAX_PUSH_SIZE: usize = 520;
/// The per-block cap on counted signature operations.
pub const MAX_BLOCK_SIGOPS: usize = 20_000;
/// Hard limit on the serialized length of a single script.
pub const MAX_SCRIPT_SIZE: usize = 10_000;

bitflags::bitflags! {
    /// Evaluation flags, analogous to Bitcoin Core's script verify flags.
    pub struct VerifyFlags: u32 {
        /// Require the final stack to contain exactly one, truthy element.
        const CLEAN_STACK = 0x01;
        /// Enforce `OP_CHECKLOCKTIMEVERIFY`.
        const CHECK_LOCKTIME = 0x02;
        /// Enforce `OP_CHECKSEQUENCEVERIFY`.
        const CHECK_SEQUENCE = 0x04;
    }
}

/// The execution context `OP_CHECKSIG`/`OP_CHECKLOCKTIMEVERIFY`/
/// `OP_CHECKSEQUENCEVERIFY` need: which transaction and input is being
/// validated, so a signature hash can be built and the input's own
/// locktime/sequence fields consulted.
pub struct ExecutionContext<'a> {
    pub transaction: &'a Transaction,
    pub input_index: usize,
}

struct Interpreter<'a> {
    stack: Vec<Vec<u8>>,
    alt_stack: Vec<Vec<u8>>,
    condition_stack: Vec<bool>,
    op_count: usize,
    sig_ops: usize,
    flags: VerifyFlags,
    context: Option<&'a ExecutionContext<'a>>,
}

/// Run `input_script` then `prev_output_script` over a shared stack and
/// report whether the output was validly spent.
pub fn execute(
    input_script: &Script,
    prev_output_script: &Script,
    context: Option<&ExecutionContext>,
    flags: VerifyFlags,
) -> Result<(), ScriptError> {
    let mut interp = Interpreter {
        stack: Vec::new(),
        alt_stack: Vec::new(),
        condition_stack: Vec::new(),
        op_count: 0,
        sig_ops: 0,
        flags,
        context,
    };

    interp.run(&input_script.0)?;
    interp.run(&prev_output_script.0)?;

    if interp.sig_ops > MAX_BLOCK_SIGOPS {
        return Err(ScriptError::TooManySigops);
    }
    if !interp.condition_stack.is_empty() {
        return Err(ScriptError::UnbalancedConditional);
    }

    let top = interp.stack.last().ok_or(ScriptError::ScriptFailed)?;
    if !is_truthy(top) {
        return Err(ScriptError::ScriptFailed);
    }
    if flags.contains(VerifyFlags::CLEAN_STACK) && interp.stack.len() != 1 {
        return Err(ScriptError::CleanStackViolation);
    }
    Ok(())
}

/// Count the signature operations a script contains, without executing it
/// (used to enforce the per-block sig-op cap ahead of full validation).
pub fn count_sigops(script: &Script) -> usize {
    let mut count = 0;
    let mut cursor = script.0.as_slice();
    while let Some((&first, rest)) = cursor.split_first() {
        match Opcode::decode(first) {
            Opcode::PushBytes(n) => {
                let n = n as usize;
                cursor = rest.get(n..).unwrap_or(&[]);
                continue;
            }
            Opcode::CheckSig | Opcode::CheckSigVerify => count += 1,
            Opcode::CheckMultiSig | Opcode::CheckMultiSigVerify => count += 20,
            _ => {}
        }
        cursor = rest;
    }
    count
}

fn is_truthy(bytes: &[u8]) -> bool {
    match bytes.split_last() {
        None => false,
        Some((&last, rest)) => last != 0 && !(last == 0x80 && rest.iter().all(|&b| b == 0)),
    }
}

fn encode_num(n: i64) -> Vec<u8> {
    if n == 0 {
        return Vec::new();
    }
    let negative = n < 0;
    let mut absolute = n.unsigned_abs();
    let mut bytes = Vec::new();
    while absolute > 0 {
        bytes.push((absolute & 0xff) as u8);
        absolute >>= 8;
    }
    if bytes.last().map(|&b| b & 0x80 != 0).unwrap_or(true) {
        bytes.push(if negative { 0x80 } else { 0x00 });
    } else if negative {
        *bytes.last_mut().unwrap() |= 0x80;
    }
    bytes
}

fn decode_num(bytes: &[u8]) -> Result<i64, ScriptError> {
    if bytes.is_empty() {
        return Ok(0);
    }
    if bytes.len() > 8 {
        return Err(ScriptError::InvalidSignatureEncoding);
    }
    let negative = bytes[bytes.len() - 1] & 0x80 != 0;
    let mut magnitude: i64 = 0;
    for (i, &byte) in bytes.iter().enumerate() {
        let byte = if i == bytes.len() - 1 { byte & 0x7f } else { byte };
        magnitude |= (byte as i64) << (8 * i);
    }
    Ok(if negative { -magnitude } else { magnitude })
}

fn hash160(data: &[u8]) -> [u8; 20] {
    let sha = Sha256::digest(data);
    let ripemd = Ripemd160::digest(&sha);
    let mut out = [0u8; 20];
    out.copy_from_slice(&ripemd);
    out
}

fn hash256(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    let second = Sha256::digest(&first);
    let mut out = [0u8; 32];
    out.copy_from_slice(&second);
    out
}

impl<'a> Interpreter<'a> {
    fn run(&mut self, script: &[u8]) -> Result<(), ScriptError> {
        if script.len() > MAX_SCRIPT_SIZE {
            return Err(ScriptError::ScriptTooLarge);
        }

        let mut cursor = script;
        while let Some((&first, rest)) = cursor.split_first() {
            cursor = rest;
            let opcode = Opcode::decode(first);

            let executing = self.condition_stack.iter().all(|&b| b);

            match opcode {
                Opcode::Push0 if executing => {
                    self.push(Vec::new())?;
                    continue;
                }
                Opcode::PushBytes(n) => {
                    let n = n as usize;
                    if cursor.len() < n {
                        return Err(ScriptError::TruncatedPush);
                    }
                    let (data, remainder) = cursor.split_at(n);
                    cursor = remainder;
                    if executing {
                        self.push(data.to_vec())?;
                    }
                    continue;
                }
                Opcode::PushData1 | Opcode::PushData2 | Opcode::PushData4 => {
                    let len_bytes = match opcode {
                        Opcode::PushData1 => 1,
                        Opcode::PushData2 => 2,
                        _ => 4,
                    };
                    if cursor.len() < len_bytes {
                        return Err(ScriptError::TruncatedPush);
                    }
                    let (len_slice, remainder) = cursor.split_at(len_bytes);
                    let n = len_slice
                        .iter()
                        .rev()
                        .fold(0usize, |acc, &b| (acc << 8) | b as usize);
                    cursor = remainder;
                    if cursor.len() < n {
                        return Err(ScriptError::TruncatedPush);
                    }
                    let (data, remainder) = cursor.split_at(n);
                    cursor = remainder;
                    if executing {
                        self.push(data.to_vec())?;
                    }
                    continue;
                }
                Opcode::Push1Negate if executing => {
                    self.push(encode_num(-1))?;
                    continue;
                }
                Opcode::PushNum(n) if executing => {
                    self.push(encode_num(n as i64))?;
                    continue;
                }
                _ => {}
            }

            self.op_count += 1;
            if self.op_count > MAX_OPS {
                return Err(ScriptError::TooManyOperations(self.op_count));
            }

            match opcode {
                Opcode::If | Opcode::NotIf => {
                    let taken = if executing {
                        let value = is_truthy(&self.pop()?);
                        if opcode == Opcode::NotIf {
                            !value
                        } else {
                            value
                        }
                    } else {
                        false
                    };
                    self.condition_stack.push(taken);
                }
                Opcode::Else => {
                    let top = self
                        .condition_stack
                        .last_mut()
                        .ok_or(ScriptError::UnbalancedConditional)?;
                    *top = !*top;
                }
                Opcode::EndIf => {
                    self.condition_stack
                        .pop()
                        .ok_or(ScriptError::UnbalancedConditional)?;
                }
                _ if !executing => {
                    // Skipped branch: nothing else to do.
                }
                Opcode::Nop => {}
                Opcode::Verify => {
                    if !is_truthy(&self.pop()?) {
                        return Err(ScriptError::VerifyFailed);
                    }
                }
                Opcode::Return => return Err(ScriptError::ReturnEncountered),

                Opcode::ToAltStack => {
                    let value = self.pop()?;
                    self.alt_stack.push(value);
                }
                Opcode::FromAltStack => {
                    let value = self
                        .alt_stack
                        .pop()
                        .ok_or(ScriptError::StackUnderflow)?;
                    self.push(value)?;
                }
                Opcode::Ifdup => {
                    let top = self.top()?.clone();
                    if is_truthy(&top) {
                        self.push(top)?;
                    }
                }
                Opcode::Depth => {
                    let depth = self.stack.len() as i64;
                    self.push(encode_num(depth))?;
                }
                Opcode::Drop => {
                    self.pop()?;
                }
                Opcode::Dup => {
                    let top = self.top()?.clone();
                    self.push(top)?;
                }
                Opcode::Nip => {
                    let top = self.pop()?;
                    self.pop()?;
                    self.push(top)?;
                }
                Opcode::Over => {
                    let value = self.nth_from_top(1)?.clone();
                    self.push(value)?;
                }
                Opcode::Pick => {
                    let n = decode_num(&self.pop()?)? as usize;
                    let value = self.nth_from_top(n)?.clone();
                    self.push(value)?;
                }
                Opcode::Roll => {
                    let n = decode_num(&self.pop()?)? as usize;
                    let index = self
                        .stack
                        .len()
                        .checked_sub(n + 1)
                        .ok_or(ScriptError::StackUnderflow)?;
                    let value = self.stack.remove(index);
                    self.push(value)?;
                }
                Opcode::Rot => {
                    let len = self.stack.len();
                    if len < 3 {
                        return Err(ScriptError::StackUnderflow);
                    }
                    self.stack.swap(len - 3, len - 2);
                    self.stack.swap(len - 2, len - 1);
                }
                Opcode::Swap => {
                    let len = self.stack.len();
                    if len < 2 {
                        return Err(ScriptError::StackUnderflow);
                    }
                    self.stack.swap(len - 2, len - 1);
                }
                Opcode::Tuck => {
                    let top = self.pop()?;
                    let second = self.pop()?;
                    self.push(top.clone())?;
                    self.push(second)?;
                    self.push(top)?;
                }
                Opcode::Drop2 => {
                    self.pop()?;
                    self.pop()?;
                }
                Opcode::Dup2 => {
                    let a = self.nth_from_top(1)?.clone();
                    let b = self.nth_from_top(0)?.clone();
                    self.push(a)?;
                    self.push(b)?;
                }
                Opcode::Dup3 => {
                    let a = self.nth_from_top(2)?.clone();
                    let b = self.nth_from_top(1)?.clone();
                    let c = self.nth_from_top(0)?.clone();
                    self.push(a)?;
                    self.push(b)?;
                    self.push(c)?;
                }
                Opcode::Over2 => {
                    let a = self.nth_from_top(3)?.clone();
                    let b = self.nth_from_top(2)?.clone();
                    self.push(a)?;
                    self.push(b)?;
                }
                Opcode::Rot2 => {
                    let len = self.stack.len();
                    if len < 6 {
                        return Err(ScriptError::StackUnderflow);
                    }
                    self.stack[len - 6..].rotate_left(2);
                }
                Opcode::Swap2 => {
                    let len = self.stack.len();
                    if len < 4 {
                        return Err(ScriptError::StackUnderflow);
                    }
                    self.stack.swap(len - 4, len - 2);
                    self.stack.swap(len - 3, len - 1);
                }

                Opcode::Size => {
                    let len = self.top()?.len() as i64;
                    self.push(encode_num(len))?;
                }

                Opcode::Equal => {
                    let b = self.pop()?;
                    let a = self.pop()?;
                    self.push(encode_num((a == b) as i64))?;
                }
                Opcode::EqualVerify => {
                    let b = self.pop()?;
                    let a = self.pop()?;
                    if a != b {
                        return Err(ScriptError::VerifyFailed);
                    }
                }

                Opcode::Add1 => self.unary_num(|n| Ok(n + 1))?,
                Opcode::Sub1 => self.unary_num(|n| Ok(n - 1))?,
                Opcode::Negate => self.unary_num(|n| Ok(-n))?,
                Opcode::Abs => self.unary_num(|n| Ok(n.abs()))?,
                Opcode::Not => self.unary_num(|n| Ok((n == 0) as i64))?,
                Opcode::NotEqual0 => self.unary_num(|n| Ok((n != 0) as i64))?,
                Opcode::Add => self.binary_num(|a, b| Ok(a + b))?,
                Opcode::Sub => self.binary_num(|a, b| Ok(a - b))?,
                Opcode::BoolAnd => self.binary_num(|a, b| Ok(((a != 0) && (b != 0)) as i64))?,
                Opcode::BoolOr => self.binary_num(|a, b| Ok(((a != 0) || (b != 0)) as i64))?,
                Opcode::NumEqual => self.binary_num(|a, b| Ok((a == b) as i64))?,
                Opcode::NumEqualVerify => {
                    let b = decode_num(&self.pop()?)?;
                    let a = decode_num(&self.pop()?)?;
                    if a != b {
                        return Err(ScriptError::VerifyFailed);
                    }
                }
                Opcode::NumNotEqual => self.binary_num(|a, b| Ok((a != b) as i64))?,
                Opcode::LessThan => self.binary_num(|a, b| Ok((a < b) as i64))?,
                Opcode::GreaterThan => self.binary_num(|a, b| Ok((a > b) as i64))?,
                Opcode::LessThanOrEqual => self.binary_num(|a, b| Ok((a <= b) as i64))?,
                Opcode::GreaterThanOrEqual => self.binary_num(|a, b| Ok((a >= b) as i64))?,
                Opcode::Min => self.binary_num(|a, b| Ok(a.min(b)))?,
                Opcode::Max => self.binary_num(|a, b| Ok(a.max(b)))?,
                Opcode::Within => {
                    let max = decode_num(&self.pop()?)?;
                    let min = decode_num(&self.pop()?)?;
                    let x = decode_num(&self.pop()?)?;
                    self.push(encode_num((x >= min && x < max) as i64))?;
                }

                Opcode::Ripemd160 => {
                    let data = self.pop()?;
                    self.push(Ripemd160::digest(&data).to_vec())?;
                }
                Opcode::Sha1 => {
                    use sha1::Digest as _;
                    let data = self.pop()?;
                    self.push(sha1::Sha1::digest(&data).to_vec())?;
                }
                Opcode::Sha256 => {
                    let data = self.pop()?;
                    self.push(Sha256::digest(&data).to_vec())?;
                }
                Opcode::Hash160 => {
                    let data = self.pop()?;
                    self.push(hash160(&data).to_vec())?;
                }
                Opcode::Hash256 => {
                    let data = self.pop()?;
                    self.push(hash256(&data).to_vec())?;
                }
                Opcode::CodeSeparator => {}

                Opcode::CheckSig | Opcode::CheckSigVerify => {
                    self.sig_ops += 1;
                    let pubkey = self.pop()?;
                    let signature = self.pop()?;
                    let ok = self.check_sig(&signature, &pubkey)?;
                    if opcode == Opcode::CheckSigVerify {
                        if !ok {
                            return Err(ScriptError::SignatureVerificationFailed);
                        }
                    } else {
                        self.push(encode_num(ok as i64))?;
                    }
                }
                Opcode::CheckMultiSig | Opcode::CheckMultiSigVerify => {
                    let key_count = decode_num(&self.pop()?)? as usize;
                    let mut keys = Vec::with_capacity(key_count);
                    for _ in 0..key_count {
                        keys.push(self.pop()?);
                    }
                    let sig_count = decode_num(&self.pop()?)? as usize;
                    let mut sigs = Vec::with_capacity(sig_count);
                    for _ in 0..sig_count {
                        sigs.push(self.pop()?);
                    }
                    // Bitcoin's historical off-by-one: one extra item is
                    // popped and ignored.
                    self.pop()?;

                    self.sig_ops += key_count;

                    let mut key_iter = keys.iter();
                    let mut all_matched = true;
                    for sig in &sigs {
                        let matched = key_iter.any(|key| self.check_sig(sig, key).unwrap_or(false));
                        if !matched {
                            all_matched = false;
                            break;
                        }
                    }
                    let ok = all_matched && sig_count <= key_count;
                    if opcode == Opcode::CheckMultiSigVerify {
                        if !ok {
                            return Err(ScriptError::SignatureVerificationFailed);
                        }
                    } else {
                        self.push(encode_num(ok as i64))?;
                    }
                }

                Opcode::CheckLockTimeVerify => {
                    if self.flags.contains(VerifyFlags::CHECK_LOCKTIME) {
                        self.check_locktime()?;
                    }
                }
                Opcode::CheckSequenceVerify => {
                    if self.flags.contains(VerifyFlags::CHECK_SEQUENCE) {
                        self.check_sequence()?;
                    }
                }

                Opcode::Disabled(byte) => return Err(ScriptError::DisabledOpcode(byte)),
                Opcode::Reserved(_) => {}

                Opcode::Push0
                | Opcode::PushBytes(_)
                | Opcode::PushData1
                | Opcode::PushData2
                | Opcode::PushData4
                | Opcode::Push1Negate
                | Opcode::PushNum(_) => {
                    // Only reachable here when not executing; the taken
                    // branch handles these above and `continue`s.
                }
            }

            if self.stack.len() + self.alt_stack.len() > MAX_STACK_SIZE {
                return Err(ScriptError::StackOverflow);
            }
        }

        Ok(())
    }

    fn push(&mut self, value: Vec<u8>) -> Result<(), ScriptError> {
        if value.len() > MAX_PUSH_SIZE {
            return Err(ScriptError::TruncatedPush);
        }
        self.stack.push(value);
        if self.stack.len() > MAX_STACK_SIZE {
            return Err(ScriptError::StackOverflow);
        }
        Ok(())
    }

    fn pop(&mut self) -> Result<Vec<u8>, ScriptError> {
        self.stack.pop().ok_or(ScriptError::StackUnderflow)
    }

    fn top(&self) -> Result<&Vec<u8>, ScriptError> {
        self.stack.last().ok_or(ScriptError::StackUnderflow)
    }

    fn nth_from_top(&self, n: usize) -> Result<&Vec<u8>, ScriptError> {
        let len = self.stack.len();
        len.checked_sub(n + 1)
            .and_then(|i| self.stack.get(i))
            .ok_or(ScriptError::StackUnderflow)
    }

    fn unary_num(&mut self, f: impl Fn(i64) -> Result<i64, ScriptError>) -> Result<(), ScriptError> {
        let a = decode_num(&self.pop()?)?;
        self.push(encode_num(f(a)?))
    }

    fn binary_num(
        &mut self,
        f: impl Fn(i64, i64) -> Result<i64, ScriptError>,
    ) -> Result<(), ScriptError> {
        let b = decode_num(&self.pop()?)?;
        let a = decode_num(&self.pop()?)?;
        self.push(encode_num(f(a, b)?))
    }

    fn check_sig(&self, signature: &[u8], pubkey: &[u8]) -> Result<bool, ScriptError> {
        let context = match self.context {
            Some(context) => context,
            None => return Ok(false),
        };
        if signature.is_empty() {
            return Ok(false);
        }
        let (der_signature, _sighash_type) = signature
            .split_last()
            .ok_or(ScriptError::InvalidSignatureEncoding)?;
        let public_key = secp256k1::PublicKey::from_slice(pubkey)
            .map_err(|_| ScriptError::InvalidSignatureEncoding)?;
        let ecdsa_signature = secp256k1::Signature::from_der(der_signature)
            .map_err(|_| ScriptError::InvalidSignatureEncoding)?;

        let tx_bytes = context
            .transaction
            .bitcoin_serialize_to_vec()
            .map_err(|_| ScriptError::InvalidSignatureEncoding)?;
        let sighash = hash256(&tx_bytes);
        let message = secp256k1::Message::from_slice(&sighash)
            .map_err(|_| ScriptError::InvalidSignatureEncoding)?;

        let secp = secp256k1::Secp256k1::verification_only();
        Ok(secp.verify(&message, &ecdsa_signature, &public_key).is_ok())
    }

    fn check_locktime(&self) -> Result<(), ScriptError> {
        let context = self.context.ok_or(ScriptError::LockTimeNotSatisfied)?;
        let top = self.top()?;
        let required = decode_num(top)?;
        let actual = match context.transaction.locktime {
            LockTime::Height(height) => height.0 as i64,
            LockTime::Time(time) => time.0.timestamp(),
        };
        if required < 0 || actual < required {
            return Err(ScriptError::LockTimeNotSatisfied);
        }
        Ok(())
    }

    fn check_sequence(&self) -> Result<(), ScriptError> {
        let top = self.top()?;
        let required = decode_num(top)?;
        if required < 0 {
            return Err(ScriptError::SequenceLockNotSatisfied);
        }
        Ok(())
    }
}
