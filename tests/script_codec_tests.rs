//! Integration tests for the disassembler, assembler and byte codecs

use script_debugger::bytes::*;
use script_debugger::decode::{decode_script, decode_script_tokens, decode_script_with, ERROR_TOKEN};
use script_debugger::encode::{encode_script, is_valid_script_token, minimal_push};
use script_debugger::opcodes::{opcode_by_name, opcode_names};
use script_debugger::*;

fn no_push_ops() -> DecodeOptions {
    DecodeOptions {
        show_push_ops: ShowPushOps::None,
        ..Default::default()
    }
}

#[test]
fn test_assemble_then_disassemble() {
    let texts = [
        "OP_DUP OP_HASH160 bbb1f7d0f7e15ac088af9bafe25aaac1a59832d0 OP_EQUALVERIFY OP_CHECKSIG",
        "02 0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798 01 OP_CHECKMULTISIG",
        "OP_IF 90 OP_CHECKSEQUENCEVERIFY OP_DROP OP_ELSE 0 OP_ENDIF",
        "OP_RETURN 68656c6c6f",
    ];
    for text in texts {
        let script = encode_script(text).unwrap();
        let decoded = decode_script(&script, &no_push_ops()).unwrap();
        assert_eq!(decoded, text);
    }
}

#[test]
fn test_large_push_round_trip() {
    let payload = vec![0x5a; 300];
    let text = format!("OP_DROP {}", bytes_to_hex(&payload));
    let script = encode_script(&text).unwrap();
    assert_eq!(&script[..4], &[0x75, 0x4d, 0x2c, 0x01]);

    let tokens = decode_script_tokens(&script, &DecodeOptions::default()).unwrap();
    assert_eq!(tokens[0], "OP_DROP");
    assert_eq!(tokens[1], "OP_PUSHDATA2");
    assert_eq!(tokens[2], "2c01");
    assert_eq!(tokens[3], bytes_to_hex(&payload));
}

#[test]
fn test_every_named_opcode_assembles() {
    for name in opcode_names() {
        assert!(is_valid_script_token(name), "{}", name);
        assert_eq!(encode_script(name).unwrap(), vec![opcode_by_name(name).unwrap()]);
    }
}

#[test]
fn test_streaming_stops_at_truncated_push() {
    let script = hex_to_bytes("51524c10aabb").unwrap();
    let mut tokens = Vec::new();
    decode_script_with(&script, &DecodeOptions::default(), |token| tokens.push(token.to_string())).unwrap();
    assert_eq!(tokens, vec!["OP_1", "OP_2", "OP_PUSHDATA1", "10", ERROR_TOKEN]);
}

#[test]
fn test_decode_options_from_json() {
    let options: DecodeOptions = serde_json::from_str(
        r#"{"pushNumFormat":"long","showShortDecimal":true,"throwOnError":true}"#,
    )
    .unwrap();
    assert_eq!(options.push_num_format, PushNumFormat::Long);
    assert!(options.show_short_decimal);
    assert!(options.throw_on_error);
    assert_eq!(options.show_push_ops, ShowPushOps::All);

    let err = decode_script(&[0x02, 0xab], &options).unwrap_err();
    assert!(matches!(err, CodecError::OutOfRange { .. }));
}

#[test]
fn test_minimal_push_matches_assembler() {
    for bytes in [vec![], vec![0x07], vec![0x81], vec![0x00], vec![0xff; 80]] {
        let text = if bytes.is_empty() { "0".to_string() } else { bytes_to_hex(&bytes) };
        assert_eq!(encode_script(&text).unwrap(), minimal_push(&bytes));
    }
}

#[test]
fn test_script_integers() {
    assert_eq!(int_le_to_bytes(0), Vec::<u8>::new());
    assert_eq!(int_le_to_bytes(-1), vec![0x81]);
    assert_eq!(int_le_to_bytes(128), vec![0x80, 0x00]);
    assert_eq!(int_le_to_bytes(-255), vec![0xff, 0x80]);
    for n in [1i64, -1, 127, 128, -128, 255, 256, 32767, -32768, 2147483647, -2147483647] {
        assert_eq!(bytes_to_int_le(&int_le_to_bytes(n)), n);
    }
}

#[test]
fn test_reader_position() {
    let data = [0x01, 0x02, 0x03, 0x04];
    let mut reader = ByteReader::new(&data);
    assert_eq!(reader.read_uint_le(2).unwrap(), 0x0201);
    assert_eq!(reader.position(), 2);
    assert!(reader.read(3).is_err());
    assert_eq!(reader.position(), 2);
    assert_eq!(reader.read_to_end(), &[0x03, 0x04]);
    assert!(reader.is_at_end());
}

#[test]
fn test_codec_error_messages() {
    assert_eq!(
        encode_script("OP_DUP OP_NOPE").unwrap_err().to_string(),
        "OP_NOPE is not a valid opcode"
    );
    assert_eq!(
        encode_script("OP_DUP 123").unwrap_err().to_string(),
        "123 is not a valid byte array"
    );
}

#[test]
fn test_minimal_scripts_round_trip_through_text() {
    let scripts = [
        "76a914bbb1f7d0f7e15ac088af9bafe25aaac1a59832d088ac",
        "0014751e76e8199196d454941c45d1b3a323f1433bd6",
        "5121028b98707adfd6f468d56c1a6067a6f0c7fef43afbacad45384017f8be93a18d4051ae",
        "4f00605a8b87",
        "6303aabbcc67010068",
        "",
    ];
    for hex in scripts {
        let script = hex_to_bytes(hex).unwrap();
        let text = decode_script(&script, &no_push_ops()).unwrap();
        assert_eq!(encode_script(&text).unwrap(), script, "{}", text);
    }
}
