//! Script disassembler
//!
//! Turns raw script bytes into display tokens. Decoding walks the script once,
//! left to right, emitting one or more tokens per opcode until the buffer is
//! exhausted or a read runs past the end.

use crate::bytes::{bytes_to_hex, bytes_to_int_le, bytes_to_uint_le, ByteReader};
use crate::constants::is_op_success;
use crate::error::{CodecError, Result};
use crate::opcodes::*;
use log::debug;
use serde::{Deserialize, Serialize};

/// Token emitted in place of an incomplete trailing push
pub const ERROR_TOKEN: &str = "[error]";

/// How `OP_1`..`OP_16` are spelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PushNumFormat {
    /// `OP_5`
    #[default]
    Short,
    /// `OP_PUSHNUM_5`
    Long,
}

/// Which push opcodes are shown as separate tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShowPushOps {
    /// Numeric pushes plus `OP_PUSHBYTES_n`/`OP_PUSHDATAn` framing
    #[default]
    All,
    /// Numeric push mnemonics only; data pushes show just their payload
    Numeric,
    /// Numbers and payloads only
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DecodeOptions {
    pub push_num_format: PushNumFormat,
    pub show_push_ops: ShowPushOps,
    pub show_pushdata_size: bool,
    pub show_short_decimal: bool,
    pub is_tapscript: bool,
    pub throw_on_error: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            push_num_format: PushNumFormat::Short,
            show_push_ops: ShowPushOps::All,
            show_pushdata_size: true,
            show_short_decimal: false,
            is_tapscript: false,
            throw_on_error: false,
        }
    }
}

/// Disassemble a script into a space-separated string
///
/// # Examples
///
/// ```
/// use script_debugger::decode::{decode_script, DecodeOptions, ShowPushOps};
///
/// let options = DecodeOptions { show_push_ops: ShowPushOps::None, ..Default::default() };
/// let text = decode_script(&[0x76, 0xa9, 0x02, 0xab, 0xcd, 0x88, 0xac], &options).unwrap();
/// assert_eq!(text, "OP_DUP OP_HASH160 abcd OP_EQUALVERIFY OP_CHECKSIG");
/// ```
pub fn decode_script(script: &[u8], options: &DecodeOptions) -> Result<String> {
    Ok(decode_script_tokens(script, options)?.join(" "))
}

/// Disassemble a script into its display tokens
pub fn decode_script_tokens(script: &[u8], options: &DecodeOptions) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    decode_script_with(script, options, |token| tokens.push(token.to_string()))?;
    Ok(tokens)
}

/// Disassemble a script, handing each token to `emit` as soon as it is known
///
/// With `throw_on_error` unset, an out-of-range read emits [`ERROR_TOKEN`] and
/// stops; otherwise the [`CodecError::OutOfRange`] is returned. Tokens emitted
/// before the failure are kept in both cases.
pub fn decode_script_with<F>(script: &[u8], options: &DecodeOptions, mut emit: F) -> Result<()>
where
    F: FnMut(&str),
{
    let mut reader = ByteReader::new(script);
    match decode_tokens(&mut reader, options, &mut emit) {
        Err(err @ CodecError::OutOfRange { .. }) if !options.throw_on_error => {
            debug!("incomplete script at byte {}: {}", reader.position(), err);
            emit(ERROR_TOKEN);
            Ok(())
        }
        other => other,
    }
}

fn decode_tokens<F>(reader: &mut ByteReader<'_>, options: &DecodeOptions, emit: &mut F) -> Result<()>
where
    F: FnMut(&str),
{
    let show_all = options.show_push_ops == ShowPushOps::All;
    let show_none = options.show_push_ops == ShowPushOps::None;

    while !reader.is_at_end() {
        let byte = reader.read_byte()?;

        if options.is_tapscript && is_op_success(byte) {
            emit(&format!("OP_SUCCESS{}", byte));
            // The rest of the script is unconstrained
            let rest = reader.read_to_end();
            if !rest.is_empty() {
                emit(&bytes_to_hex(rest));
            }
            continue;
        }

        if let Some(name) = non_push_opcode_name(byte) {
            emit(&name);
            continue;
        }

        if byte == OP_0 || (OP_1..=OP_16).contains(&byte) {
            let number = if byte == OP_0 { 0 } else { byte - OP_1 + 1 };
            if !show_none {
                match (byte, options.push_num_format) {
                    (OP_0, _) => emit("OP_0"),
                    (_, PushNumFormat::Short) => emit(&format!("OP_{}", number)),
                    (_, PushNumFormat::Long) => emit(&format!("OP_PUSHNUM_{}", number)),
                }
            } else if options.show_short_decimal || byte == OP_0 {
                emit(&number.to_string());
            } else {
                emit(&format!("{:02x}", number));
            }
            continue;
        }

        if byte == OP_1NEGATE {
            if !show_none {
                emit("OP_1NEGATE");
            } else if options.show_short_decimal {
                emit("-1");
            } else {
                emit("81");
            }
            continue;
        }

        if (OP_PUSHBYTES_1..=OP_PUSHDATA4).contains(&byte) {
            let push_bytes = if byte <= OP_PUSHBYTES_75 {
                if show_all {
                    emit(&format!("OP_PUSHBYTES_{}", byte));
                }
                byte as u64
            } else {
                let length_bytes = 1usize << (byte - OP_PUSHDATA1);
                if show_all {
                    emit(&format!("OP_PUSHDATA{}", length_bytes));
                }
                let size_field = reader.read(length_bytes)?;
                let push_bytes = bytes_to_uint_le(size_field);
                if show_all && options.show_pushdata_size {
                    if options.show_short_decimal {
                        emit(&push_bytes.to_string());
                    } else {
                        emit(&bytes_to_hex(size_field));
                    }
                }
                push_bytes
            };

            let payload = reader.read(usize::try_from(push_bytes).unwrap_or(usize::MAX))?;
            if payload.is_empty() || (payload.len() <= 4 && options.show_short_decimal) {
                emit(&bytes_to_int_le(payload).to_string());
            } else {
                emit(&bytes_to_hex(payload));
            }
            continue;
        }

        emit("OP_UNKNOWN");
    }
    Ok(())
}
