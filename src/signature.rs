//! DER signature codec (BIP 66) and signature shape classifiers
//!
//! Decoding never fails outright: it returns every field parsed before the
//! first violation together with an error pointing at the offending bytes.

use crate::bytes::serialize_hex;
use crate::constants::{MAX_DER_INTEGER_SIZE, SCHNORR_SIGNATURE_SIZE, SIGHASH_FLAGS};
use crate::types::{ByteRange, ByteString};
use serde::Serialize;

const DER_SEQUENCE: u8 = 0x30;
const DER_INTEGER: u8 = 0x02;

const TOTAL_LENGTH_POS: usize = 1;
const R_MARKER_POS: usize = 2;
const R_LENGTH_POS: usize = 3;
const R_POS: usize = 4;

/// An r or s integer and its offset within the signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignatureField {
    #[serde(serialize_with = "serialize_hex")]
    pub value: ByteString,
    pub pos: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SighashField {
    pub value: u8,
    pub pos: usize,
}

/// First violation found while decoding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DerError {
    pub text: String,
    /// Offending byte range, absent when the problem is a missing byte
    pub location: Option<ByteRange>,
}

/// Best-effort decode of a DER signature with trailing sighash byte
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DecodedSignature {
    pub error: Option<DerError>,
    pub r: Option<SignatureField>,
    pub s: Option<SignatureField>,
    pub sighash: Option<SighashField>,
}

impl DecodedSignature {
    fn fail(mut self, text: impl Into<String>, location: Option<ByteRange>) -> Self {
        self.error = Some(DerError {
            text: text.into(),
            location,
        });
        self
    }

    /// All three fields decoded and no rule was violated
    pub fn is_complete(&self) -> bool {
        self.error.is_none() && self.r.is_some() && self.s.is_some() && self.sighash.is_some()
    }
}

pub fn sighash_flag_name(byte: u8) -> Option<&'static str> {
    SIGHASH_FLAGS
        .iter()
        .find(|(flag, _)| *flag == byte)
        .map(|(_, name)| *name)
}

pub fn sighash_flag_byte(name: &str) -> Option<u8> {
    SIGHASH_FLAGS
        .iter()
        .find(|(_, flag_name)| *flag_name == name)
        .map(|(flag, _)| *flag)
}

/// Number of leading zero bytes that are not needed to clear the sign bit
fn excess_padding_bytes(value: &[u8]) -> usize {
    value
        .windows(2)
        .take_while(|pair| pair[0] == 0 && pair[1] < 0x80)
        .count()
}

/// Strict field-by-field BIP 66 decode
///
/// An empty input yields an empty result without an error.
///
/// # Examples
///
/// ```
/// use script_debugger::signature::{serialize_der_signature, try_decode_der_signature};
///
/// let sig = serialize_der_signature(&[0x01], &[0x02], 0x01);
/// let decoded = try_decode_der_signature(&sig);
/// assert!(decoded.error.is_none());
/// assert_eq!(decoded.r.unwrap().value, vec![0x01]);
/// ```
pub fn try_decode_der_signature(sig: &[u8]) -> DecodedSignature {
    let res = DecodedSignature::default();
    if sig.is_empty() {
        return res;
    }

    if sig[0] != DER_SEQUENCE {
        return res.fail("First byte must be 0x30", Some((0, 1)));
    }
    if sig.len() == TOTAL_LENGTH_POS {
        return res.fail("Missing total length byte", None);
    }
    let total_length = sig[TOTAL_LENGTH_POS] as usize;

    if sig.len() == R_MARKER_POS {
        return res.fail("Missing r-value marker byte", None);
    }
    if sig[R_MARKER_POS] != DER_INTEGER {
        return res.fail(
            "r-value marker byte must be 0x02",
            Some((R_MARKER_POS, R_MARKER_POS + 1)),
        );
    }
    if sig.len() == R_LENGTH_POS {
        return res.fail("Missing r-value length byte", None);
    }
    let r_length = sig[R_LENGTH_POS] as usize;
    if r_length == 0 {
        return res.fail(
            "r-value length cannot be 0",
            Some((R_LENGTH_POS, R_LENGTH_POS + 1)),
        );
    }
    if R_POS + r_length > sig.len() {
        return res.fail("Incomplete r-value", Some((R_POS, sig.len())));
    }

    let mut res = res;
    res.r = Some(SignatureField {
        value: sig[R_POS..R_POS + r_length].to_vec(),
        pos: R_POS,
    });
    let r_length_no_padding = r_length - usize::from(sig[R_POS] == 0);

    let s_marker_pos = R_POS + r_length;
    if sig.len() == s_marker_pos {
        return res.fail("Missing s-value marker byte", None);
    }
    if sig[s_marker_pos] != DER_INTEGER {
        return res.fail(
            "s-value marker byte must be 0x02",
            Some((s_marker_pos, s_marker_pos + 1)),
        );
    }
    let s_length_pos = s_marker_pos + 1;
    if sig.len() == s_length_pos {
        return res.fail("Missing s-value length byte", None);
    }
    let s_length = sig[s_length_pos] as usize;
    if s_length == 0 {
        return res.fail(
            "s-value length cannot be 0",
            Some((s_length_pos, s_length_pos + 1)),
        );
    }
    let s_pos = s_length_pos + 1;
    if s_pos + s_length > sig.len() {
        return res.fail("Incomplete s-value", Some((s_pos, sig.len())));
    }

    res.s = Some(SignatureField {
        value: sig[s_pos..s_pos + s_length].to_vec(),
        pos: s_pos,
    });
    let s_length_no_padding = s_length - usize::from(sig[s_pos] == 0);

    let sighash_pos = s_pos + s_length;
    if sig.len() == sighash_pos {
        return res.fail("Missing sighash byte", None);
    }
    res.sighash = Some(SighashField {
        value: sig[sighash_pos],
        pos: sighash_pos,
    });

    let end_pos = sighash_pos + 1;
    if sig.len() > end_pos {
        return res.fail(
            "Extra bytes at the end of signature",
            Some((end_pos, sig.len())),
        );
    }

    if total_length != sig.len() - 3 {
        return res.fail(
            format!("Incorrect length byte (should be {:x})", sig.len() - 3),
            Some((TOTAL_LENGTH_POS, TOTAL_LENGTH_POS + 1)),
        );
    }

    if sighash_flag_name(sig[sighash_pos]).is_none() {
        return res.fail("Invalid sighash flag", Some((sighash_pos, sighash_pos + 1)));
    }

    if r_length_no_padding > MAX_DER_INTEGER_SIZE {
        return res.fail("r-value too large", Some((R_POS, R_POS + r_length)));
    }
    if s_length_no_padding > MAX_DER_INTEGER_SIZE {
        return res.fail("s-value too large", Some((s_pos, s_pos + s_length)));
    }

    if sig[R_POS] >= 0x80 {
        return res.fail("Missing r-value zero padding byte", Some((R_POS, R_POS + 1)));
    }
    if sig[s_pos] >= 0x80 {
        return res.fail("Missing s-value zero padding byte", Some((s_pos, s_pos + 1)));
    }

    let excess_r = excess_padding_bytes(&sig[R_POS..R_POS + r_length]);
    if excess_r > 0 {
        return res.fail(
            "r-value has excessive zero padding",
            Some((R_POS, R_POS + excess_r)),
        );
    }
    let excess_s = excess_padding_bytes(&sig[s_pos..s_pos + s_length]);
    if excess_s > 0 {
        return res.fail(
            "s-value has excessive zero padding",
            Some((s_pos, s_pos + excess_s)),
        );
    }

    res
}

/// Serialize r, s and a sighash byte as a DER signature
///
/// A single zero byte is prepended to r or s when it is empty or has its high
/// bit set; no other padding is added or removed. Length fields are single
/// bytes, so r and s must together fit in 250 bytes.
pub fn serialize_der_signature(r: &[u8], s: &[u8], sighash: u8) -> ByteString {
    debug_assert!(r.len() + s.len() <= 250, "DER length fields overflow");
    fn integer(value: &[u8]) -> ByteString {
        let mut out = Vec::with_capacity(value.len() + 3);
        let pad = value.first().map_or(true, |b| b & 0x80 != 0);
        out.push(DER_INTEGER);
        out.push((value.len() + usize::from(pad)) as u8);
        if pad {
            out.push(0x00);
        }
        out.extend_from_slice(value);
        out
    }

    let r_part = integer(r);
    let s_part = integer(s);

    let mut sig = Vec::with_capacity(r_part.len() + s_part.len() + 3);
    sig.push(DER_SEQUENCE);
    sig.push((r_part.len() + s_part.len()) as u8);
    sig.extend_from_slice(&r_part);
    sig.extend_from_slice(&s_part);
    sig.push(sighash);
    sig
}

/// Structurally valid DER signature with a known sighash flag
pub fn is_valid_der_signature(sig: &[u8]) -> bool {
    try_decode_der_signature(sig).is_complete()
}

/// 64-byte BIP 340 signature, optionally followed by a known sighash flag
pub fn is_valid_schnorr_signature(sig: &[u8]) -> bool {
    match sig.len() {
        SCHNORR_SIGNATURE_SIZE => true,
        len if len == SCHNORR_SIGNATURE_SIZE + 1 => sighash_flag_name(sig[SCHNORR_SIGNATURE_SIZE]).is_some(),
        _ => false,
    }
}

pub fn is_any_known_signature(sig: &[u8]) -> bool {
    is_valid_der_signature(sig) || is_valid_schnorr_signature(sig)
}

/// Signature scheme inferred from the encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SignatureType {
    Der,
    Schnorr,
}

pub fn signature_type(sig: &[u8]) -> Option<SignatureType> {
    if is_valid_der_signature(sig) {
        Some(SignatureType::Der)
    } else if is_valid_schnorr_signature(sig) {
        Some(SignatureType::Schnorr)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytes::hex_to_bytes;

    const P2PKH_SIG: &str = "304302204dc2939be89ab6626457fff40aec2cc4e6213e64bcb4d2c43bf6b49358ff638c021f33d2f8fdf6d54a2c82bb7cddc62becc2cbbaca6fd7f3ec927ea975f29ad85102";

    fn error_of(hex: &str) -> DerError {
        try_decode_der_signature(&hex_to_bytes(hex).unwrap())
            .error
            .expect("expected an error")
    }

    #[test]
    fn test_decode_valid_signature() {
        let sig = hex_to_bytes(P2PKH_SIG).unwrap();
        let decoded = try_decode_der_signature(&sig);
        assert!(decoded.is_complete());
        assert_eq!(decoded.r.as_ref().unwrap().pos, 4);
        assert_eq!(decoded.r.as_ref().unwrap().value.len(), 32);
        assert_eq!(decoded.s.as_ref().unwrap().pos, 38);
        assert_eq!(decoded.s.as_ref().unwrap().value.len(), 31);
        assert_eq!(decoded.sighash, Some(SighashField { value: 0x02, pos: 69 }));
    }

    #[test]
    fn test_decode_empty() {
        assert_eq!(try_decode_der_signature(&[]), DecodedSignature::default());
    }

    #[test]
    fn test_decode_structural_errors() {
        let err = error_of("31");
        assert_eq!(err.text, "First byte must be 0x30");
        assert_eq!(err.location, Some((0, 1)));

        assert_eq!(error_of("30").text, "Missing total length byte");
        assert_eq!(error_of("3006").text, "Missing r-value marker byte");
        assert_eq!(error_of("300603").location, Some((2, 3)));
        assert_eq!(error_of("30060200").text, "r-value length cannot be 0");

        let err = error_of("3006020501");
        assert_eq!(err.text, "Incomplete r-value");
        assert_eq!(err.location, Some((4, 5)));
    }

    #[test]
    fn test_partial_fields_survive_errors() {
        let decoded = try_decode_der_signature(&hex_to_bytes("30060201010301").unwrap());
        assert_eq!(decoded.r.unwrap().value, vec![0x01]);
        assert!(decoded.s.is_none());
        assert_eq!(decoded.error.unwrap().text, "s-value marker byte must be 0x02");
    }

    #[test]
    fn test_decode_trailing_and_length_errors() {
        let err = error_of("30060201010201020100");
        assert_eq!(err.text, "Extra bytes at the end of signature");
        assert_eq!(err.location, Some((9, 10)));

        let err = error_of("300702010102010201");
        assert_eq!(err.text, "Incorrect length byte (should be 6)");
        assert_eq!(err.location, Some((1, 2)));
    }

    #[test]
    fn test_decode_invalid_sighash() {
        let err = error_of("300602010102010204");
        assert_eq!(err.text, "Invalid sighash flag");
        assert_eq!(err.location, Some((8, 9)));
    }

    #[test]
    fn test_decode_padding_errors() {
        let err = error_of("300602018102010201");
        assert_eq!(err.text, "Missing r-value zero padding byte");
        assert_eq!(err.location, Some((4, 5)));

        let err = error_of("300602010102018101");
        assert_eq!(err.text, "Missing s-value zero padding byte");

        // r = 00 00 7f: neither zero is needed
        let err = error_of("3008020300007f02010101");
        assert_eq!(err.text, "r-value has excessive zero padding");
        assert_eq!(err.location, Some((4, 6)));

        // s = 00 00 80: only the second zero is legitimate padding
        let err = error_of("3008020101020300008001");
        assert_eq!(err.text, "s-value has excessive zero padding");
        assert_eq!(err.location, Some((7, 8)));
    }

    #[test]
    fn test_decode_oversized_values() {
        let r = [0x11u8; 33];
        let sig = serialize_der_signature(&r, &[0x01], 0x01);
        assert_eq!(try_decode_der_signature(&sig).error.unwrap().text, "r-value too large");

        // A 33-byte s with one padding byte is fine
        let s = [0xffu8; 32];
        let sig = serialize_der_signature(&[0x01], &s, 0x81);
        assert!(try_decode_der_signature(&sig).is_complete());
    }

    #[test]
    fn test_serialize_padding() {
        assert_eq!(
            serialize_der_signature(&[0x80], &[0x7f], 0x01),
            vec![0x30, 0x07, 0x02, 0x02, 0x00, 0x80, 0x02, 0x01, 0x7f, 0x01]
        );
        assert_eq!(
            serialize_der_signature(&[], &[0x01], 0x03),
            vec![0x30, 0x06, 0x02, 0x01, 0x00, 0x02, 0x01, 0x01, 0x03]
        );
    }

    #[test]
    fn test_serialize_inverts_decode() {
        let sig = hex_to_bytes(P2PKH_SIG).unwrap();
        let decoded = try_decode_der_signature(&sig);
        let rebuilt = serialize_der_signature(
            &decoded.r.unwrap().value,
            &decoded.s.unwrap().value,
            decoded.sighash.unwrap().value,
        );
        assert_eq!(rebuilt, sig);
    }

    #[test]
    fn test_classifiers() {
        let der = hex_to_bytes(P2PKH_SIG).unwrap();
        assert!(is_valid_der_signature(&der));
        assert!(!is_valid_schnorr_signature(&der));
        assert!(is_valid_schnorr_signature(&[0xab; 64]));
        let mut with_flag = vec![0xab; 64];
        with_flag.push(0x83);
        assert!(is_valid_schnorr_signature(&with_flag));
        with_flag[64] = 0x00;
        assert!(!is_valid_schnorr_signature(&with_flag));
        assert!(!is_any_known_signature(&[0x01]));
        assert!(!is_valid_der_signature(&[]));
        assert_eq!(signature_type(&der), Some(SignatureType::Der));
        assert_eq!(signature_type(&[0x01; 64]), Some(SignatureType::Schnorr));
        assert_eq!(signature_type(&[0x01; 10]), None);
    }

    #[test]
    fn test_sighash_names() {
        assert_eq!(sighash_flag_name(0x81), Some("all-acp"));
        assert_eq!(sighash_flag_name(0x04), None);
        assert_eq!(sighash_flag_byte("single"), Some(0x03));
        assert_eq!(sighash_flag_byte("bogus"), None);
    }
}
