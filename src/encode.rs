//! Script assembler
//!
//! Inverse of the disassembler for minimally encoded scripts: whitespace
//! separated `OP_*` mnemonics and hex byte literals, every literal re-encoded
//! with its minimal push.

use crate::bytes::{concat_bytes, hex_to_bytes, uint_le_to_bytes_fixed, BytesPart};
use crate::error::{CodecError, Result};
use crate::opcodes::{opcode_by_name, OP_0, OP_1, OP_1NEGATE, OP_PUSHBYTES_75, OP_PUSHDATA1, OP_PUSHDATA2, OP_PUSHDATA4};
use crate::types::ByteString;

/// Shortest push that places `bytes` on the stack
///
/// Single bytes 0x01-0x10 and 0x81 always use the numeric push opcodes.
pub fn minimal_push(bytes: &[u8]) -> ByteString {
    match bytes {
        [] => vec![OP_0],
        [n @ 1..=16] => vec![OP_1 + *n - 1],
        [0x81] => vec![OP_1NEGATE],
        _ => {
            let len = bytes.len();
            if len <= OP_PUSHBYTES_75 as usize {
                concat_bytes(&[BytesPart::Byte(len as u8), bytes.into()])
            } else if len <= 0xff {
                concat_bytes(&[OP_PUSHDATA1.into(), BytesPart::Byte(len as u8), bytes.into()])
            } else if len <= 0xffff {
                let size = uint_le_to_bytes_fixed(len as u64, 2);
                concat_bytes(&[OP_PUSHDATA2.into(), (&size).into(), bytes.into()])
            } else {
                let size = uint_le_to_bytes_fixed(len as u64, 4);
                concat_bytes(&[OP_PUSHDATA4.into(), (&size).into(), bytes.into()])
            }
        }
    }
}

/// Assemble script text into bytes
///
/// Mnemonics are matched case-insensitively. Anything that is not a mnemonic
/// and not `0` must be an even-length hex literal.
///
/// # Examples
///
/// ```
/// use script_debugger::encode::encode_script;
///
/// assert_eq!(encode_script("OP_DUP OP_HASH160 abcd").unwrap(), vec![0x76, 0xa9, 0x02, 0xab, 0xcd]);
/// assert!(encode_script("OP_PUSHDATA1").is_err());
/// ```
pub fn encode_script(input: &str) -> Result<ByteString> {
    let mut script = ByteString::new();
    for token in input.split_whitespace() {
        let token = token.to_ascii_uppercase();
        let chunk = script_chunk_from_token(&token).ok_or_else(|| {
            if token.starts_with("OP_") {
                CodecError::InvalidOpcode(token.clone())
            } else {
                CodecError::InvalidByteArray(token.clone())
            }
        })?;
        script.extend_from_slice(&chunk);
    }
    Ok(script)
}

/// Whether a single token would assemble
pub fn is_valid_script_token(token: &str) -> bool {
    script_chunk_from_token(&token.to_ascii_uppercase()).is_some()
}

fn script_chunk_from_token(token: &str) -> Option<ByteString> {
    if token.starts_with("OP_") {
        return opcode_by_name(token).map(|op| vec![op]);
    }
    if token == "0" {
        return Some(vec![OP_0]);
    }
    hex_to_bytes(token).ok().map(|bytes| minimal_push(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytes::bytes_to_hex;

    fn encode_hex(text: &str) -> String {
        bytes_to_hex(&encode_script(text).unwrap())
    }

    #[test]
    fn test_minimal_push_numbers() {
        assert_eq!(minimal_push(&[]), vec![0x00]);
        assert_eq!(minimal_push(&[0x01]), vec![0x51]);
        assert_eq!(minimal_push(&[0x10]), vec![0x60]);
        assert_eq!(minimal_push(&[0x81]), vec![0x4f]);
        assert_eq!(minimal_push(&[0x00]), vec![0x01, 0x00]);
        assert_eq!(minimal_push(&[0x11]), vec![0x01, 0x11]);
        assert_eq!(minimal_push(&[0x80]), vec![0x01, 0x80]);
    }

    #[test]
    fn test_minimal_push_thresholds() {
        assert_eq!(minimal_push(&[0xaa; 75])[0], 75);
        assert_eq!(&minimal_push(&[0xaa; 76])[..2], &[0x4c, 76]);
        assert_eq!(&minimal_push(&[0xaa; 255])[..2], &[0x4c, 0xff]);
        assert_eq!(&minimal_push(&[0xaa; 256])[..3], &[0x4d, 0x00, 0x01]);
        assert_eq!(&minimal_push(&vec![0xaa; 65535])[..3], &[0x4d, 0xff, 0xff]);
        let big = minimal_push(&vec![0xaa; 65536]);
        assert_eq!(&big[..5], &[0x4e, 0x00, 0x00, 0x01, 0x00]);
        assert_eq!(big.len(), 65536 + 5);
    }

    #[test]
    fn test_encode_aliases() {
        assert_eq!(encode_hex("OP_0 OP_FALSE"), "0000");
        assert_eq!(encode_hex("OP_1 OP_PUSHNUM_1 OP_TRUE"), "515151");
        assert_eq!(encode_hex("OP_CLTV OP_CSV"), "b1b2");
        assert_eq!(encode_hex("op_dup  op_drop\n0"), "767500");
    }

    #[test]
    fn test_encode_empty() {
        assert_eq!(encode_script("   ").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_encode_rejects_display_only_opcodes() {
        for text in ["OP_PUSHNUM_0", "OP_UNKNOWN", "OP_PUSHDATA3", "OP_PUSHDATA5", "OP_PUSHBYTES1", "OP_PUSHDATA1", "OP_PUSHDATA2", "OP_PUSHDATA4"] {
            let err = encode_script(text).unwrap_err();
            assert_eq!(err.to_string(), format!("{} is not a valid opcode", text));
        }
    }

    #[test]
    fn test_encode_rejects_bad_literals() {
        assert_eq!(
            encode_script("abc").unwrap_err(),
            CodecError::InvalidByteArray("ABC".to_string())
        );
        assert!(matches!(encode_script("xyz1"), Err(CodecError::InvalidByteArray(_))));
        assert!(is_valid_script_token("op_checksig"));
        assert!(!is_valid_script_token("0x01"));
    }
}
