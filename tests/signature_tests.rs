//! Integration tests for signature decoding and key classification

use anyhow::Result;
use script_debugger::bytes::hex_to_bytes;
use script_debugger::pubkey::*;
use script_debugger::signature::*;
use script_debugger::ScriptDebugger;

const P2PK_SIG: &str = "3044022004f027ae0b19bb7a7aa8fcdf135f1da769d087342020359ef4099a9f0f0ba4ec02206a83a9b78df3fed89a3b6052e69963e1fb08d8f6d17d945e43b51b5214aa41e601";

#[test]
fn test_decoded_signature_json() -> Result<()> {
    let decoded = ScriptDebugger::new().decode_signature(&hex_to_bytes(P2PK_SIG)?);
    let value = serde_json::to_value(&decoded)?;
    assert_eq!(value["error"], serde_json::Value::Null);
    assert_eq!(value["r"]["pos"], 4);
    assert_eq!(
        value["r"]["value"],
        "04f027ae0b19bb7a7aa8fcdf135f1da769d087342020359ef4099a9f0f0ba4ec"
    );
    assert_eq!(value["s"]["pos"], 38);
    assert_eq!(value["sighash"]["value"], 1);
    assert_eq!(value["sighash"]["pos"], 70);
    Ok(())
}

#[test]
fn test_error_json_carries_location() -> Result<()> {
    let decoded = try_decode_der_signature(&hex_to_bytes("300602010102010204")?);
    let value = serde_json::to_value(&decoded)?;
    assert_eq!(value["error"]["text"], "Invalid sighash flag");
    assert_eq!(value["error"]["location"], serde_json::json!([8, 9]));
    assert_eq!(value["sighash"]["value"], 4);
    Ok(())
}

#[test]
fn test_sighash_names() {
    for (byte, name) in [(0x01, "all"), (0x02, "none"), (0x03, "single"), (0x81, "all-acp"), (0x82, "none-acp"), (0x83, "single-acp")] {
        assert_eq!(sighash_flag_name(byte), Some(name));
        assert_eq!(sighash_flag_byte(name), Some(byte));
    }
    assert_eq!(sighash_flag_name(0x00), None);
    assert_eq!(sighash_flag_byte("default"), None);
}

#[test]
fn test_serialize_then_decode() {
    let r = hex_to_bytes("8a1b").unwrap();
    let s = hex_to_bytes("7f").unwrap();
    let sig = serialize_der_signature(&r, &s, 0x83);
    let decoded = try_decode_der_signature(&sig);
    assert!(decoded.is_complete());
    assert_eq!(decoded.r.unwrap().value, vec![0x00, 0x8a, 0x1b]);
    assert_eq!(decoded.s.unwrap().value, s);
    assert_eq!(sighash_flag_name(decoded.sighash.unwrap().value), Some("single-acp"));
}

#[test]
fn test_signature_classifiers() {
    let der = hex_to_bytes(P2PK_SIG).unwrap();
    assert!(is_valid_der_signature(&der));
    assert!(!is_valid_schnorr_signature(&der));
    assert_eq!(signature_type(&der), Some(SignatureType::Der));

    let mut schnorr = vec![0x11; 64];
    assert!(is_valid_schnorr_signature(&schnorr));
    schnorr.push(0x83);
    assert!(is_valid_schnorr_signature(&schnorr));
    schnorr[64] = 0x00;
    assert!(!is_any_known_signature(&schnorr));
}

#[test]
fn test_pubkey_classifiers() {
    let compressed = hex_to_bytes("028b98707adfd6f468d56c1a6067a6f0c7fef43afbacad45384017f8be93a18d40").unwrap();
    assert!(is_compressed_key(&compressed));
    assert_eq!(pubkey_type(&compressed), Some(PubkeyType::PreTapscript));
    assert_eq!(pubkey_type(&compressed[1..]), Some(PubkeyType::XOnly));

    let mut hybrid = vec![0x06];
    hybrid.extend([0x22; 64]);
    assert!(is_hybrid_key(&hybrid));
    assert!(is_any_pre_tapscript_key(&hybrid));
    assert!(!is_any_known_public_key(&hybrid[..40]));
}
