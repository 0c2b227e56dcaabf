//! Script interpreter
//!
//! Executes a script against a caller-supplied initial stack and records every
//! observable stack state on the way. Evaluation never fails as a Rust error:
//! a halting script produces an [`EvalResult`] carrying a [`ScriptFailure`],
//! with the stack and step log as they were at the failing opcode.
//!
//! Signature checks are structural only. `OP_CHECKSIG` and friends succeed iff
//! both the signature and the public key are non-empty; malformed encodings
//! only raise warnings.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use crate::bytes::{bytes_to_hex, bytes_to_int_le, bytes_to_uint_le, int_le_to_bytes, serialize_hex_stack, ByteReader};
use crate::condition_stack::ConditionStack;
use crate::constants::{MAX_LOCKTIME_SIZE, MAX_NUM_SIZE, MAX_PUBKEYS_PER_MULTISIG, MAX_SCRIPT_ELEMENT_SIZE};
use crate::hash::{hash160, hash256, ripemd160, sha1, sha256};
use crate::opcodes::*;
use crate::pubkey::{is_any_known_public_key, is_any_pre_tapscript_key, is_hybrid_key, is_x_only_key, pubkey_type, PubkeyType};
use crate::signature::{is_any_known_signature, is_valid_der_signature, is_valid_schnorr_signature, signature_type, SignatureType};
use crate::types::{ByteString, Stack};
use log::{debug, trace};
use serde::{Deserialize, Serialize, Serializer};

/// Halting error categories, numbered as in Bitcoin Core's `ScriptError`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptErrorCode {
    UnknownError,
    OpReturn,
    PushSize,
    SigCount,
    PubkeyCount,
    Verify,
    EqualVerify,
    CheckMultisigVerify,
    CheckSigVerify,
    NumEqualVerify,
    BadOpcode,
    DisabledOpcode,
    InvalidStackOperation,
    InvalidAltstackOperation,
    UnbalancedConditional,
    NegativeLocktime,
    SigNullDummy,
}

impl ScriptErrorCode {
    pub fn code(self) -> u8 {
        match self {
            ScriptErrorCode::UnknownError => 1,
            ScriptErrorCode::OpReturn => 3,
            ScriptErrorCode::PushSize => 5,
            ScriptErrorCode::SigCount => 8,
            ScriptErrorCode::PubkeyCount => 9,
            ScriptErrorCode::Verify => 10,
            ScriptErrorCode::EqualVerify => 11,
            ScriptErrorCode::CheckMultisigVerify => 12,
            ScriptErrorCode::CheckSigVerify => 13,
            ScriptErrorCode::NumEqualVerify => 14,
            ScriptErrorCode::BadOpcode => 15,
            ScriptErrorCode::DisabledOpcode => 16,
            ScriptErrorCode::InvalidStackOperation => 17,
            ScriptErrorCode::InvalidAltstackOperation => 18,
            ScriptErrorCode::UnbalancedConditional => 19,
            ScriptErrorCode::NegativeLocktime => 20,
            ScriptErrorCode::SigNullDummy => 27,
        }
    }

    /// Message used when the failing opcode does not supply its own
    pub fn default_message(self) -> &'static str {
        match self {
            ScriptErrorCode::UnknownError => "unknown error",
            ScriptErrorCode::OpReturn => "OP_RETURN encountered during execution",
            ScriptErrorCode::PushSize => "push value size limit exceeded",
            ScriptErrorCode::SigCount => "invalid signature count",
            ScriptErrorCode::PubkeyCount => "invalid pubkey count",
            ScriptErrorCode::Verify => "OP_VERIFY operation failed",
            ScriptErrorCode::EqualVerify => "OP_EQUALVERIFY operation failed",
            ScriptErrorCode::CheckMultisigVerify => "OP_CHECKMULTISIGVERIFY operation failed",
            ScriptErrorCode::CheckSigVerify => "OP_CHECKSIGVERIFY operation failed",
            ScriptErrorCode::NumEqualVerify => "OP_NUMEQUALVERIFY operation failed",
            ScriptErrorCode::BadOpcode => "bad opcode",
            ScriptErrorCode::DisabledOpcode => "disabled opcode",
            ScriptErrorCode::InvalidStackOperation => "operation not valid with the current stack size",
            ScriptErrorCode::InvalidAltstackOperation => "operation not valid with the current altstack size",
            ScriptErrorCode::UnbalancedConditional => "unbalanced conditional",
            ScriptErrorCode::NegativeLocktime => "negative locktime",
            ScriptErrorCode::SigNullDummy => "dummy OP_CHECKMULTISIG argument must be zero",
        }
    }
}

impl Serialize for ScriptErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

/// Where and why a script halted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{message} (error {}, at byte {position})", .code.code())]
pub struct ScriptFailure {
    /// Byte offset of the failing opcode
    pub position: usize,
    pub code: ScriptErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HighlightColor {
    Stack,
    Success,
    Error,
}

/// Top-of-stack items a step wants drawn attention to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Highlight {
    pub count: usize,
    pub color: HighlightColor,
}

impl Highlight {
    pub fn stack(count: usize) -> Self {
        Self { count, color: HighlightColor::Stack }
    }

    pub fn success(count: usize) -> Self {
        Self { count, color: HighlightColor::Success }
    }

    pub fn error(count: usize) -> Self {
        Self { count, color: HighlightColor::Error }
    }
}

/// Stack snapshot after one executed opcode
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionStep {
    /// Byte offset of the opcode, `None` for the snapshot taken before execution
    pub position: Option<usize>,
    #[serde(serialize_with = "serialize_hex_stack")]
    pub stack: Stack,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight: Option<Highlight>,
}

/// Non-fatal diagnostics about standardness and likely mistakes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScriptWarning {
    EmptyStack,
    DirtyStack,
    FalseTopStackItem,
    Nop,
    CodeSeparator,
    MixedCheckMultisigAndCheckSigAdd,
    NonMinimalIf,
    NotSchnorrSignature(ByteString),
    NotXOnlyKey(ByteString),
    NotDerSignature(ByteString),
    NotPreTapscriptKey(ByteString),
    UnknownSignature(ByteString),
    UnknownPublicKey(ByteString),
    HybridKey,
    MixedSignatureAndKeyTypes,
    DerWithXOnlyKeys,
    SchnorrWithPreTapscriptKeys,
}

impl fmt::Display for ScriptWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptWarning::EmptyStack => f.write_str("final stack should have exactly one item but is empty"),
            ScriptWarning::DirtyStack => f.write_str("final stack should only have one item"),
            ScriptWarning::FalseTopStackItem => f.write_str("top stack item should be a true value"),
            ScriptWarning::Nop => f.write_str("OP_NOP is non-standard"),
            ScriptWarning::CodeSeparator => {
                f.write_str("OP_CODESEPARATOR behavior is not implemented in this debugger")
            }
            ScriptWarning::MixedCheckMultisigAndCheckSigAdd => {
                f.write_str("OP_CHECKMULTISIG and OP_CHECKSIGADD cannot be used in the same script")
            }
            ScriptWarning::NonMinimalIf => f.write_str("argument of OP_IF/NOTIF is not minimal"),
            ScriptWarning::NotSchnorrSignature(sig) => {
                write!(f, "{} is not a valid Schnorr signature", bytes_to_hex(sig))
            }
            ScriptWarning::NotXOnlyKey(key) => {
                write!(f, "{} is not a valid x-only public key", bytes_to_hex(key))
            }
            ScriptWarning::NotDerSignature(sig) => {
                write!(f, "{} is not a valid DER signature", bytes_to_hex(sig))
            }
            ScriptWarning::NotPreTapscriptKey(key) => {
                write!(f, "{} is not a valid compressed or uncompressed key", bytes_to_hex(key))
            }
            ScriptWarning::UnknownSignature(sig) => write!(f, "{} is not a valid signature", bytes_to_hex(sig)),
            ScriptWarning::UnknownPublicKey(key) => write!(f, "{} is not a valid public key", bytes_to_hex(key)),
            ScriptWarning::HybridKey => f.write_str("hybrid public keys are non-standard"),
            ScriptWarning::MixedSignatureAndKeyTypes => {
                f.write_str("script mixes incompatible signature and public key types")
            }
            ScriptWarning::DerWithXOnlyKeys => f.write_str("script mixes DER signatures with x-only public keys"),
            ScriptWarning::SchnorrWithPreTapscriptKeys => {
                f.write_str("script mixes Schnorr signatures with compressed/uncompressed public keys")
            }
        }
    }
}

impl Serialize for ScriptWarning {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EvalOptions {
    /// Reject pushes larger than 520 bytes with `PushSize`
    pub enforce_push_size: bool,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self { enforce_push_size: true }
    }
}

/// Outcome of one evaluation
///
/// A result is either a success or a failure, never both: `error` is `None`
/// iff the script ran to the end. In both cases `stack` is the stack at the
/// point execution stopped. Use [`EvalResult::into_result`] to match on the
/// two outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvalResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ScriptFailure>,
    #[serde(serialize_with = "serialize_hex_stack")]
    pub stack: Stack,
    pub steps: Vec<ExecutionStep>,
    pub warnings: Vec<ScriptWarning>,
}

impl EvalResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn warning_messages(&self) -> Vec<String> {
        self.warnings.iter().map(ToString::to_string).collect()
    }

    /// Final stack, or the failure that stopped execution
    pub fn into_result(self) -> std::result::Result<Stack, ScriptFailure> {
        match self.error {
            Some(failure) => Err(failure),
            None => Ok(self.stack),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Script truthiness: false iff every byte is zero, except that the last
/// byte may be 0x80 (negative zero)
pub fn cast_to_bool(bytes: &[u8]) -> bool {
    match bytes.split_last() {
        None => false,
        Some((&last, rest)) => rest.iter().any(|&b| b != 0) || (last != 0 && last != 0x80),
    }
}

/// Evaluate `script` starting from `initial_stack` (last element is the top)
///
/// # Examples
///
/// ```
/// use script_debugger::interpreter::eval_script;
///
/// // OP_1 OP_1 OP_ADD OP_2 OP_EQUAL
/// let result = eval_script(&[0x51, 0x51, 0x93, 0x52, 0x87], Vec::new());
/// assert!(result.is_success());
/// assert_eq!(result.stack, vec![vec![0x01]]);
/// ```
pub fn eval_script(script: &[u8], initial_stack: Stack) -> EvalResult {
    eval_script_with_options(script, initial_stack, &EvalOptions::default())
}

pub fn eval_script_with_options(script: &[u8], initial_stack: Stack, options: &EvalOptions) -> EvalResult {
    ExecutionState::new(script, initial_stack, options).run()
}

/// Which key/signature shapes a signature opcode expects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SigContext {
    /// OP_CHECKSIG(VERIFY): any known shape
    Any,
    /// OP_CHECKSIGADD: Schnorr and x-only keys
    Tapscript,
    /// OP_CHECKMULTISIG(VERIFY): DER and SEC keys
    Legacy,
}

/// Halt reason raised by an opcode handler
#[derive(Debug)]
struct Fault {
    code: ScriptErrorCode,
    message: Option<String>,
    /// Record the whole stack as the culprit before halting
    stack_size: bool,
}

impl Fault {
    fn new(code: ScriptErrorCode) -> Self {
        Self { code, message: None, stack_size: false }
    }

    fn with_message(code: ScriptErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: Some(message.into()), stack_size: false }
    }

    fn stack_size(expected: i64) -> Self {
        let message = if expected == 1 {
            "operation requires at least one stack item".to_string()
        } else {
            format!("operation requires at least {} stack items", expected)
        };
        Self {
            code: ScriptErrorCode::InvalidStackOperation,
            message: Some(message),
            stack_size: true,
        }
    }
}

type StepResult = std::result::Result<(), Fault>;

struct ExecutionState<'a> {
    reader: ByteReader<'a>,
    options: EvalOptions,
    stack: Stack,
    altstack: Stack,
    exec: ConditionStack,
    steps: Vec<ExecutionStep>,
    warnings: Vec<ScriptWarning>,
    used_opcodes: HashSet<u8>,
    used_pubkey_types: BTreeSet<PubkeyType>,
    used_sig_types: BTreeSet<SignatureType>,
    loop_start: usize,
    loop_highlight: Option<Highlight>,
}

impl<'a> ExecutionState<'a> {
    fn new(script: &'a [u8], initial_stack: Stack, options: &EvalOptions) -> Self {
        let steps = vec![ExecutionStep {
            position: None,
            stack: initial_stack.clone(),
            highlight: None,
        }];
        Self {
            reader: ByteReader::new(script),
            options: *options,
            stack: initial_stack,
            altstack: Stack::new(),
            exec: ConditionStack::new(),
            steps,
            warnings: Vec::new(),
            used_opcodes: HashSet::new(),
            used_pubkey_types: BTreeSet::new(),
            used_sig_types: BTreeSet::new(),
            loop_start: 0,
            loop_highlight: None,
        }
    }

    fn run(mut self) -> EvalResult {
        while !self.reader.is_at_end() {
            self.loop_start = self.reader.position();
            self.loop_highlight = None;
            if let Err(fault) = self.execute_next() {
                return self.halt(fault);
            }
        }

        if !self.exec.is_empty() {
            return self.halt(Fault::with_message(
                ScriptErrorCode::UnbalancedConditional,
                "missing OP_ENDIF at the end of script",
            ));
        }

        self.add_final_warnings();
        EvalResult {
            error: None,
            stack: self.stack,
            steps: self.steps,
            warnings: self.warnings,
        }
    }

    fn halt(mut self, fault: Fault) -> EvalResult {
        if fault.stack_size {
            self.push_step(Some(Highlight::error(self.stack.len())));
        }
        if self.steps.last().and_then(|step| step.position) != Some(self.loop_start) {
            let highlight = self.loop_highlight.unwrap_or(Highlight::error(0));
            self.push_step(Some(highlight));
        }

        let message = fault
            .message
            .unwrap_or_else(|| fault.code.default_message().to_string());
        debug!("script halted at byte {}: {}", self.loop_start, message);

        EvalResult {
            error: Some(ScriptFailure {
                position: self.loop_start,
                code: fault.code,
                message,
            }),
            stack: self.stack,
            steps: self.steps,
            warnings: self.warnings,
        }
    }

    fn execute_next(&mut self) -> StepResult {
        let executing = self.exec.all_true();
        let opcode = self
            .reader
            .read_byte()
            .map_err(|_| Fault::new(ScriptErrorCode::BadOpcode))?;

        if is_disabled_opcode(opcode) {
            return Err(Fault::new(ScriptErrorCode::DisabledOpcode));
        }

        if (OP_PUSHBYTES_1..=OP_PUSHDATA4).contains(&opcode) {
            return self.push_data(opcode, executing);
        }

        // Dead branches only track conditional nesting
        if !(executing || (OP_IF..=OP_ENDIF).contains(&opcode)) {
            return Ok(());
        }

        self.dispatch(opcode, executing)?;

        if executing && opcode != OP_ELSE && opcode != OP_ENDIF {
            self.used_opcodes.insert(opcode);
            trace!(
                "{:>5} {:<22} depth {}",
                self.loop_start,
                non_push_opcode_name(opcode).unwrap_or_else(|| format!("0x{:02x}", opcode)),
                self.stack.len()
            );
            self.push_step(self.loop_highlight);
        }
        Ok(())
    }

    fn push_data(&mut self, opcode: u8, executing: bool) -> StepResult {
        let bad_opcode = |_| Fault::new(ScriptErrorCode::BadOpcode);
        let push_bytes = if opcode <= OP_PUSHBYTES_75 {
            u64::from(opcode)
        } else {
            let length_bytes = 1usize << (opcode - OP_PUSHDATA1);
            bytes_to_uint_le(self.reader.read(length_bytes).map_err(bad_opcode)?)
        };

        let size = usize::try_from(push_bytes)
            .ok()
            .filter(|size| *size <= self.reader.remaining())
            .ok_or_else(|| Fault::new(ScriptErrorCode::BadOpcode))?;
        if self.options.enforce_push_size && size > MAX_SCRIPT_ELEMENT_SIZE {
            return Err(Fault::new(ScriptErrorCode::PushSize));
        }

        let value = self.reader.read(size).map_err(bad_opcode)?.to_vec();
        if executing {
            trace!("{:>5} push {} bytes", self.loop_start, size);
            self.stack.push(value);
            self.push_step(Some(Highlight::stack(1)));
        }
        Ok(())
    }

    fn dispatch(&mut self, opcode: u8, executing: bool) -> StepResult {
        match opcode {
            OP_0 => {
                self.stack.push(ByteString::new());
                self.highlight(Highlight::stack(1));
            }
            OP_1NEGATE | OP_1..=OP_16 => {
                self.stack.push(int_le_to_bytes(i64::from(opcode) - i64::from(OP_1) + 1));
                self.highlight(Highlight::stack(1));
            }

            OP_NOP | OP_NOP1 | OP_NOP4..=OP_NOP10 => self.warn(ScriptWarning::Nop),

            OP_CHECKLOCKTIMEVERIFY | OP_CHECKSEQUENCEVERIFY => self.op_check_locktime()?,

            OP_IF | OP_NOTIF => self.op_if(opcode, executing)?,
            OP_ELSE => {
                if self.exec.is_empty() {
                    return Err(Fault::with_message(
                        ScriptErrorCode::UnbalancedConditional,
                        "OP_ELSE encountered without a conditional",
                    ));
                }
                self.exec.toggle_top();
            }
            OP_ENDIF => {
                if self.exec.is_empty() {
                    return Err(Fault::with_message(
                        ScriptErrorCode::UnbalancedConditional,
                        "OP_ENDIF encountered without a conditional",
                    ));
                }
                self.exec.pop_back();
            }
            OP_VERIFY => {
                self.require(1)?;
                if cast_to_bool(self.top(1)) {
                    self.pop()?;
                } else {
                    self.highlight(Highlight::error(1));
                    return Err(Fault::new(ScriptErrorCode::Verify));
                }
            }
            OP_RETURN => return Err(Fault::new(ScriptErrorCode::OpReturn)),

            OP_TOALTSTACK => {
                self.require(1)?;
                let item = self.pop()?;
                self.altstack.push(item);
            }
            OP_FROMALTSTACK => {
                let item = self.altstack.pop().ok_or_else(|| {
                    Fault::with_message(
                        ScriptErrorCode::InvalidAltstackOperation,
                        "operation requires at least one altstack item",
                    )
                })?;
                self.stack.push(item);
                self.highlight(Highlight::stack(1));
            }

            OP_2DROP..=OP_TUCK => self.op_stack(opcode)?,

            OP_SIZE => {
                self.require(1)?;
                let size = self.top(1).len() as i64;
                self.stack.push(int_le_to_bytes(size));
                self.highlight(Highlight::stack(1));
            }

            OP_EQUAL | OP_EQUALVERIFY => {
                self.require(2)?;
                let equal = self.top(2) == self.top(1);
                self.pop()?;
                self.pop()?;
                self.push_bool(equal);
                if opcode == OP_EQUALVERIFY {
                    self.verify_top(equal, ScriptErrorCode::EqualVerify)?;
                } else {
                    self.highlight(Highlight::success(1));
                }
            }

            OP_1ADD | OP_1SUB | OP_NEGATE | OP_ABS | OP_NOT | OP_0NOTEQUAL => self.op_unary_numeric(opcode)?,
            OP_ADD | OP_SUB | OP_BOOLAND..=OP_MAX => self.op_binary_numeric(opcode)?,
            OP_WITHIN => {
                self.require(3)?;
                let x = self.num_arg(3, 3)?;
                let min = self.num_arg(2, 3)?;
                let max = self.num_arg(1, 3)?;
                for _ in 0..3 {
                    self.pop()?;
                }
                self.push_bool(min <= x && x < max);
                self.highlight(Highlight::success(1));
            }

            OP_RIPEMD160..=OP_HASH256 => {
                self.require(1)?;
                let item = self.pop()?;
                let digest = match opcode {
                    OP_RIPEMD160 => ripemd160(&item),
                    OP_SHA1 => sha1(&item),
                    OP_SHA256 => sha256(&item),
                    OP_HASH160 => hash160(&item),
                    _ => hash256(&item),
                };
                self.stack.push(digest);
                self.highlight(Highlight::success(1));
            }

            OP_CODESEPARATOR => self.warn(ScriptWarning::CodeSeparator),

            OP_CHECKSIG | OP_CHECKSIGVERIFY => {
                self.require(2)?;
                let sig = self.top(2).clone();
                let pubkey = self.top(1).clone();
                let success = !sig.is_empty() && !pubkey.is_empty();
                self.check_signature_shapes(&sig, &pubkey, SigContext::Any);
                self.pop()?;
                self.pop()?;
                self.push_bool(success);
                if opcode == OP_CHECKSIGVERIFY {
                    self.verify_top(success, ScriptErrorCode::CheckSigVerify)?;
                } else {
                    self.highlight(Highlight::success(1));
                }
            }
            OP_CHECKSIGADD => {
                self.require(3)?;
                let sig = self.top(3).clone();
                let num = self.num_arg(2, 1)?;
                let pubkey = self.top(1).clone();
                let success = !sig.is_empty() && !pubkey.is_empty();
                self.check_signature_shapes(&sig, &pubkey, SigContext::Tapscript);
                for _ in 0..3 {
                    self.pop()?;
                }
                self.stack.push(int_le_to_bytes(num + i64::from(success)));
                self.highlight(Highlight::success(1));
            }
            OP_CHECKMULTISIG | OP_CHECKMULTISIGVERIFY => self.op_check_multisig(opcode)?,

            _ => return Err(Fault::with_message(ScriptErrorCode::BadOpcode, "unknown opcode")),
        }
        Ok(())
    }

    fn op_if(&mut self, opcode: u8, executing: bool) -> StepResult {
        let mut value = false;
        if executing {
            let top = self.stack.last().ok_or_else(|| {
                Fault::with_message(
                    ScriptErrorCode::UnbalancedConditional,
                    "operation requires at least one stack item",
                )
            })?;
            if top.len() > 1 || (top.len() == 1 && top[0] != 0x01) {
                self.warn(ScriptWarning::NonMinimalIf);
            }
            value = cast_to_bool(self.top(1));
            if opcode == OP_NOTIF {
                value = !value;
            }
            self.pop()?;
        }
        self.exec.push_back(value);
        Ok(())
    }

    fn op_check_locktime(&mut self) -> StepResult {
        self.require(1)?;
        let arg = self.top(1);
        if arg.len() > MAX_LOCKTIME_SIZE {
            self.highlight(Highlight::error(1));
            return Err(Fault::with_message(
                ScriptErrorCode::UnknownError,
                "locktime is larger than 5 bytes",
            ));
        }
        if bytes_to_int_le(arg) < 0 {
            self.highlight(Highlight::error(1));
            return Err(Fault::new(ScriptErrorCode::NegativeLocktime));
        }
        self.highlight(Highlight::success(1));
        Ok(())
    }

    /// Stack shuffling opcodes, OP_2DROP through OP_TUCK
    fn op_stack(&mut self, opcode: u8) -> StepResult {
        match opcode {
            OP_2DROP => {
                self.require(2)?;
                self.pop()?;
                self.pop()?;
            }
            OP_2DUP => {
                self.require(2)?;
                self.duplicate(2, 2);
            }
            OP_3DUP => {
                self.require(3)?;
                self.duplicate(3, 3);
            }
            OP_2OVER => {
                self.require(4)?;
                self.duplicate(4, 2);
            }
            OP_2ROT => {
                self.require(6)?;
                let len = self.stack.len();
                let moved: Stack = self.stack.drain(len - 6..len - 4).collect();
                self.stack.extend(moved);
                self.highlight(Highlight::stack(6));
            }
            OP_2SWAP => {
                self.require(4)?;
                let len = self.stack.len();
                self.stack.swap(len - 4, len - 2);
                self.stack.swap(len - 3, len - 1);
                self.highlight(Highlight::stack(4));
            }
            OP_IFDUP => {
                self.require(1)?;
                if cast_to_bool(self.top(1)) {
                    self.duplicate(1, 1);
                }
            }
            OP_DEPTH => {
                let depth = self.stack.len() as i64;
                self.stack.push(int_le_to_bytes(depth));
                self.highlight(Highlight::stack(1));
            }
            OP_DROP => {
                self.require(1)?;
                self.pop()?;
            }
            OP_DUP => {
                self.require(1)?;
                self.duplicate(1, 1);
            }
            OP_NIP => {
                self.require(2)?;
                let len = self.stack.len();
                self.stack.remove(len - 2);
                self.highlight(Highlight::stack(1));
            }
            OP_OVER => {
                self.require(2)?;
                self.duplicate(2, 1);
            }
            OP_PICK | OP_ROLL => {
                self.require(2)?;
                let n = self.num_arg(1, 1)?;
                self.pop()?;
                let len = self.stack.len();
                let depth = usize::try_from(n)
                    .ok()
                    .filter(|depth| *depth < len)
                    .ok_or_else(|| Fault::stack_size(n.saturating_add(1)))?;
                let index = len - 1 - depth;
                let item = if opcode == OP_ROLL {
                    self.stack.remove(index)
                } else {
                    self.stack[index].clone()
                };
                self.stack.push(item);
                let count = if opcode == OP_ROLL { depth + 1 } else { 1 };
                self.highlight(Highlight::stack(count));
            }
            OP_ROT => {
                self.require(3)?;
                let len = self.stack.len();
                self.stack.swap(len - 3, len - 2);
                self.stack.swap(len - 2, len - 1);
                self.highlight(Highlight::stack(3));
            }
            OP_SWAP => {
                self.require(2)?;
                let len = self.stack.len();
                self.stack.swap(len - 2, len - 1);
                self.highlight(Highlight::stack(2));
            }
            OP_TUCK => {
                self.require(2)?;
                let len = self.stack.len();
                let top = self.top(1).clone();
                self.stack.insert(len - 2, top);
                self.highlight(Highlight::stack(3));
            }
            _ => return Err(Fault::with_message(ScriptErrorCode::BadOpcode, "unknown opcode")),
        }
        Ok(())
    }

    fn op_unary_numeric(&mut self, opcode: u8) -> StepResult {
        self.require(1)?;
        let n = self.num_arg(1, 1)?;
        let result = match opcode {
            OP_1ADD => n + 1,
            OP_1SUB => n - 1,
            OP_NEGATE => -n,
            OP_ABS => n.abs(),
            OP_NOT => i64::from(n == 0),
            _ => i64::from(n != 0),
        };
        self.pop()?;
        self.stack.push(int_le_to_bytes(result));
        self.highlight(Highlight::success(1));
        Ok(())
    }

    fn op_binary_numeric(&mut self, opcode: u8) -> StepResult {
        self.require(2)?;
        let a = self.num_arg(2, 2)?;
        let b = self.num_arg(1, 2)?;
        let result = match opcode {
            OP_ADD => a + b,
            OP_SUB => a - b,
            OP_BOOLAND => i64::from(a != 0 && b != 0),
            OP_BOOLOR => i64::from(a != 0 || b != 0),
            OP_NUMEQUAL | OP_NUMEQUALVERIFY => i64::from(a == b),
            OP_NUMNOTEQUAL => i64::from(a != b),
            OP_LESSTHAN => i64::from(a < b),
            OP_GREATERTHAN => i64::from(a > b),
            OP_LESSTHANOREQUAL => i64::from(a <= b),
            OP_GREATERTHANOREQUAL => i64::from(a >= b),
            OP_MIN => a.min(b),
            _ => a.max(b),
        };
        self.pop()?;
        self.pop()?;
        self.stack.push(int_le_to_bytes(result));

        if opcode == OP_NUMEQUALVERIFY {
            self.verify_top(result != 0, ScriptErrorCode::NumEqualVerify)?;
        } else {
            self.highlight(Highlight::success(1));
        }
        Ok(())
    }

    fn op_check_multisig(&mut self, opcode: u8) -> StepResult {
        let mut i: usize = 1;
        self.require(i)?;

        let mut keys_count = self.num_arg(i, 1)?;
        if !(0..=MAX_PUBKEYS_PER_MULTISIG).contains(&keys_count) {
            self.highlight(Highlight::error(1));
            let message = if keys_count < 0 {
                "number of public keys cannot be negative".to_string()
            } else {
                format!("number of public keys cannot be higher than {}", MAX_PUBKEYS_PER_MULTISIG)
            };
            return Err(Fault::with_message(ScriptErrorCode::PubkeyCount, message));
        }
        i += 1;
        let mut ikey = i;
        // Last non-signature item, counted from the top
        let ikey2 = keys_count as usize + 2;
        i += keys_count as usize;
        self.require(i)?;

        let mut sigs_count = self.num_arg(i, 1)?;
        if sigs_count < 0 || sigs_count > keys_count {
            self.highlight(Highlight::error(ikey2));
            let message = if sigs_count < 0 {
                "number of signatures cannot be negative"
            } else {
                "number of signatures cannot be higher than number of public keys"
            };
            return Err(Fault::with_message(ScriptErrorCode::SigCount, message));
        }
        i += 1;
        let mut isig = i;
        i += sigs_count as usize;
        self.require(i)?;

        let mut success = true;
        while success && sigs_count > 0 {
            let sig = self.top(isig).clone();
            let pubkey = self.top(ikey).clone();
            let ok = !sig.is_empty() && !pubkey.is_empty();
            self.check_signature_shapes(&sig, &pubkey, SigContext::Legacy);

            if ok {
                isig += 1;
                sigs_count -= 1;
            }
            ikey += 1;
            keys_count -= 1;

            // More signatures left than keys: no way to succeed
            if sigs_count > keys_count {
                success = false;
            }
        }

        for _ in 1..i {
            self.pop()?;
        }

        // Consensus bug: one extra, unchecked item is consumed
        let dummy = self.stack.last().ok_or_else(|| {
            Fault::with_message(
                ScriptErrorCode::InvalidStackOperation,
                "OP_CHECKMULTISIG requires a dummy stack item",
            )
        })?;
        if !dummy.is_empty() {
            self.highlight(Highlight::error(1));
            return Err(Fault::new(ScriptErrorCode::SigNullDummy));
        }
        self.pop()?;

        self.push_bool(success);
        if opcode == OP_CHECKMULTISIGVERIFY {
            self.verify_top(success, ScriptErrorCode::CheckMultisigVerify)?;
        } else {
            self.highlight(Highlight::success(1));
        }
        Ok(())
    }

    fn check_signature_shapes(&mut self, sig: &[u8], pubkey: &[u8], context: SigContext) {
        if !sig.is_empty() {
            if let Some(kind) = signature_type(sig) {
                self.used_sig_types.insert(kind);
            }
        }
        if !pubkey.is_empty() {
            if let Some(kind) = pubkey_type(pubkey) {
                self.used_pubkey_types.insert(kind);
            }
        }

        match context {
            SigContext::Tapscript => {
                if !sig.is_empty() && !is_valid_schnorr_signature(sig) {
                    self.warn(ScriptWarning::NotSchnorrSignature(sig.to_vec()));
                }
                if !pubkey.is_empty() && !is_x_only_key(pubkey) {
                    self.warn(ScriptWarning::NotXOnlyKey(pubkey.to_vec()));
                }
            }
            SigContext::Legacy => {
                if !sig.is_empty() && !is_valid_der_signature(sig) {
                    self.warn(ScriptWarning::NotDerSignature(sig.to_vec()));
                }
                if !pubkey.is_empty() && !is_any_pre_tapscript_key(pubkey) {
                    self.warn(ScriptWarning::NotPreTapscriptKey(pubkey.to_vec()));
                }
            }
            SigContext::Any => {
                if !sig.is_empty() && !is_any_known_signature(sig) {
                    self.warn(ScriptWarning::UnknownSignature(sig.to_vec()));
                }
                if !pubkey.is_empty() && !is_any_known_public_key(pubkey) {
                    self.warn(ScriptWarning::UnknownPublicKey(pubkey.to_vec()));
                }
                if is_hybrid_key(pubkey) {
                    self.warn(ScriptWarning::HybridKey);
                }
            }
        }
    }

    fn add_final_warnings(&mut self) {
        let multisig = self.used_opcodes.contains(&OP_CHECKMULTISIG)
            || self.used_opcodes.contains(&OP_CHECKMULTISIGVERIFY);
        if multisig && self.used_opcodes.contains(&OP_CHECKSIGADD) {
            self.warn(ScriptWarning::MixedCheckMultisigAndCheckSigAdd);
        } else if self.used_sig_types.len() > 1 && self.used_pubkey_types.len() > 1 {
            self.warn(ScriptWarning::MixedSignatureAndKeyTypes);
        } else if self.used_sig_types.contains(&SignatureType::Der)
            && self.used_pubkey_types.contains(&PubkeyType::XOnly)
        {
            self.warn(ScriptWarning::DerWithXOnlyKeys);
        } else if self.used_sig_types.contains(&SignatureType::Schnorr)
            && self.used_pubkey_types.contains(&PubkeyType::PreTapscript)
        {
            self.warn(ScriptWarning::SchnorrWithPreTapscriptKeys);
        }

        if self.stack.last().is_some_and(|top| !cast_to_bool(top)) {
            self.warn(ScriptWarning::FalseTopStackItem);
        }
        match self.stack.len() {
            0 => self.warn(ScriptWarning::EmptyStack),
            1 => {}
            _ => self.warn(ScriptWarning::DirtyStack),
        }
    }

    fn require(&self, count: usize) -> StepResult {
        if self.stack.len() < count {
            return Err(Fault::stack_size(count as i64));
        }
        Ok(())
    }

    /// Item `depth` positions from the top, 1 being the top; callers check depth first
    fn top(&self, depth: usize) -> &ByteString {
        &self.stack[self.stack.len() - depth]
    }

    fn pop(&mut self) -> std::result::Result<ByteString, Fault> {
        self.stack.pop().ok_or_else(|| Fault::stack_size(1))
    }

    /// Decode the numeric argument at `depth`, highlighting `arg_count` items if oversized
    fn num_arg(&mut self, depth: usize, arg_count: usize) -> std::result::Result<i64, Fault> {
        let arg = self.top(depth);
        if arg.len() > MAX_NUM_SIZE {
            self.highlight(Highlight::error(arg_count));
            return Err(Fault::with_message(
                ScriptErrorCode::UnknownError,
                "numeric argument is larger than 4 bytes",
            ));
        }
        Ok(bytes_to_int_le(arg))
    }

    /// Copy `count` items starting `depth` from the top onto the top
    fn duplicate(&mut self, depth: usize, count: usize) {
        let start = self.stack.len() - depth;
        let copied = self.stack[start..start + count].to_vec();
        self.stack.extend(copied);
        self.highlight(Highlight::stack(count));
    }

    fn push_bool(&mut self, value: bool) {
        self.stack.push(int_le_to_bytes(i64::from(value)));
    }

    /// Tail of the *VERIFY opcodes: drop the pushed true, or halt with `code`
    fn verify_top(&mut self, value: bool, code: ScriptErrorCode) -> StepResult {
        if value {
            self.pop()?;
            Ok(())
        } else {
            self.highlight(Highlight::error(1));
            Err(Fault::new(code))
        }
    }

    fn highlight(&mut self, highlight: Highlight) {
        self.loop_highlight = Some(highlight);
    }

    fn warn(&mut self, warning: ScriptWarning) {
        if !self.warnings.contains(&warning) {
            self.warnings.push(warning);
        }
    }

    fn push_step(&mut self, highlight: Option<Highlight>) {
        self.steps.push(ExecutionStep {
            position: Some(self.loop_start),
            stack: self.stack.clone(),
            highlight,
        });
    }
}
