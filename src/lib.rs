//! # Script-Debugger
//!
//! Bitcoin Script toolkit for debuggers and editors: a disassembler, an
//! assembler, a strict DER signature decoder and a stepping interpreter that
//! records every intermediate stack.
//!
//! ## Architecture
//!
//! - Byte codecs (hex, script integers, bounded reader)
//! - Opcode tables and the disassembler/assembler built on them
//! - Signature and public key shape checks
//! - Interpreter (this crate never verifies signatures cryptographically)
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: every call is deterministic and keeps no state between calls
//! 2. **Errors as Values**: a failing script is a normal [`EvalResult`], not a Rust error
//! 3. **Consensus Semantics**: opcode behavior follows Bitcoin Core's legacy interpreter
//!
//! ## Usage
//!
//! ```rust
//! use script_debugger::ScriptDebugger;
//!
//! let debugger = ScriptDebugger::new();
//! let script = debugger.encode("OP_2 OP_3 OP_ADD OP_5 OP_EQUAL").unwrap();
//! let result = debugger.eval(&script, vec![]);
//! assert!(result.is_success());
//! assert_eq!(result.stack, vec![vec![0x01]]);
//! ```

pub mod types;
pub mod constants;
pub mod error;
pub mod bytes;
pub mod hash;
pub mod opcodes;
pub mod decode;
pub mod encode;
pub mod signature;
pub mod pubkey;
pub mod condition_stack;
pub mod interpreter;

// Re-export commonly used types
pub use types::*;
pub use constants::*;
pub use error::{CodecError, Result};
pub use decode::{DecodeOptions, PushNumFormat, ShowPushOps};
pub use interpreter::{
    EvalOptions, EvalResult, ExecutionStep, Highlight, HighlightColor, ScriptErrorCode, ScriptFailure,
    ScriptWarning,
};
pub use signature::DecodedSignature;

/// Front door bundling the disassembler, assembler and interpreter with
/// their options
///
/// # Examples
///
/// ```
/// use script_debugger::{DecodeOptions, ScriptDebugger, ShowPushOps};
///
/// let debugger = ScriptDebugger::new().with_decode_options(DecodeOptions {
///     show_push_ops: ShowPushOps::None,
///     ..Default::default()
/// });
///
/// let script = debugger.encode("OP_DUP OP_HASH160 00112233 OP_EQUALVERIFY").unwrap();
/// assert_eq!(debugger.decode(&script).unwrap(), "OP_DUP OP_HASH160 00112233 OP_EQUALVERIFY");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScriptDebugger {
    decode_options: DecodeOptions,
    eval_options: EvalOptions,
}

impl ScriptDebugger {
    /// Create a debugger with default options
    ///
    /// # Examples
    ///
    /// ```
    /// use script_debugger::ScriptDebugger;
    ///
    /// let debugger = ScriptDebugger::new();
    /// assert!(debugger.eval_options().enforce_push_size);
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_decode_options(mut self, options: DecodeOptions) -> Self {
        self.decode_options = options;
        self
    }

    pub fn with_eval_options(mut self, options: EvalOptions) -> Self {
        self.eval_options = options;
        self
    }

    pub fn decode_options(&self) -> &DecodeOptions {
        &self.decode_options
    }

    pub fn eval_options(&self) -> &EvalOptions {
        &self.eval_options
    }

    /// Disassemble script bytes into space-separated tokens
    ///
    /// # Examples
    ///
    /// ```
    /// use script_debugger::ScriptDebugger;
    ///
    /// let debugger = ScriptDebugger::new();
    /// let text = debugger.decode(&[0x00, 0x14, 0xab]).unwrap();
    /// assert_eq!(text, "OP_0 OP_PUSHBYTES_20 [error]");
    /// ```
    pub fn decode(&self, script: &[u8]) -> Result<String> {
        decode::decode_script(script, &self.decode_options)
    }

    /// Disassemble script bytes into a token list
    pub fn decode_tokens(&self, script: &[u8]) -> Result<Vec<String>> {
        decode::decode_script_tokens(script, &self.decode_options)
    }

    /// Assemble script text into bytes
    ///
    /// # Examples
    ///
    /// ```
    /// use script_debugger::{CodecError, ScriptDebugger};
    ///
    /// let debugger = ScriptDebugger::new();
    /// assert_eq!(debugger.encode("OP_1 OP_CHECKSIG").unwrap(), vec![0x51, 0xac]);
    /// assert_eq!(
    ///     debugger.encode("OP_FOO").unwrap_err(),
    ///     CodecError::InvalidOpcode("OP_FOO".to_string())
    /// );
    /// ```
    pub fn encode(&self, text: &str) -> Result<ByteString> {
        encode::encode_script(text)
    }

    /// Disassemble a hex-encoded script
    pub fn decode_hex(&self, hex: &str) -> Result<String> {
        self.decode(&bytes::hex_to_bytes(hex)?)
    }

    /// Run a script from an initial stack (last element on top)
    ///
    /// # Examples
    ///
    /// ```
    /// use script_debugger::{ScriptDebugger, ScriptErrorCode};
    ///
    /// let debugger = ScriptDebugger::new();
    /// let result = debugger.eval(&[0x75], vec![]);
    /// let failure = result.error.unwrap();
    /// assert_eq!(failure.code, ScriptErrorCode::InvalidStackOperation);
    /// assert_eq!(failure.position, 0);
    /// ```
    pub fn eval(&self, script: &[u8], initial_stack: Stack) -> EvalResult {
        interpreter::eval_script_with_options(script, initial_stack, &self.eval_options)
    }

    /// Run a script given as assembly text and a hex-encoded initial stack
    ///
    /// # Examples
    ///
    /// ```
    /// use script_debugger::ScriptDebugger;
    ///
    /// let debugger = ScriptDebugger::new();
    /// let result = debugger.eval_text("OP_SIZE OP_2 OP_EQUALVERIFY", &["abcd"]).unwrap();
    /// assert_eq!(result.stack, vec![vec![0xab, 0xcd]]);
    /// ```
    pub fn eval_text(&self, text: &str, initial_stack: &[&str]) -> Result<EvalResult> {
        let script = self.encode(text)?;
        let stack = initial_stack
            .iter()
            .map(|item| bytes::hex_to_bytes(item))
            .collect::<Result<Stack>>()?;
        Ok(self.eval(&script, stack))
    }

    /// Decode a DER signature, keeping every field parsed before the first error
    ///
    /// # Examples
    ///
    /// ```
    /// use script_debugger::ScriptDebugger;
    ///
    /// let debugger = ScriptDebugger::new();
    /// let decoded = debugger.decode_signature(&[0x30, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x01, 0x01]);
    /// assert!(decoded.is_complete());
    /// assert_eq!(decoded.sighash.unwrap().value, 0x01);
    /// ```
    pub fn decode_signature(&self, sig: &[u8]) -> DecodedSignature {
        signature::try_decode_der_signature(sig)
    }
}
