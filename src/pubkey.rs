//! Public key shape classifiers
//!
//! Purely structural: the leading byte and length are checked, the point is
//! never decoded.

/// Coarse key family used for mixing diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PubkeyType {
    /// Compressed, uncompressed or hybrid SEC encoding
    PreTapscript,
    /// 32-byte BIP 340 key
    XOnly,
}

pub fn is_compressed_key(pubkey: &[u8]) -> bool {
    pubkey.len() == 33 && (pubkey[0] == 0x02 || pubkey[0] == 0x03)
}

pub fn is_uncompressed_key(pubkey: &[u8]) -> bool {
    pubkey.len() == 65 && pubkey[0] == 0x04
}

pub fn is_hybrid_key(pubkey: &[u8]) -> bool {
    pubkey.len() == 65 && (pubkey[0] == 0x06 || pubkey[0] == 0x07)
}

pub fn is_x_only_key(pubkey: &[u8]) -> bool {
    pubkey.len() == 32
}

pub fn is_any_pre_tapscript_key(pubkey: &[u8]) -> bool {
    is_compressed_key(pubkey) || is_uncompressed_key(pubkey) || is_hybrid_key(pubkey)
}

pub fn is_any_known_public_key(pubkey: &[u8]) -> bool {
    is_any_pre_tapscript_key(pubkey) || is_x_only_key(pubkey)
}

pub fn pubkey_type(pubkey: &[u8]) -> Option<PubkeyType> {
    if is_any_pre_tapscript_key(pubkey) {
        Some(PubkeyType::PreTapscript)
    } else if is_x_only_key(pubkey) {
        Some(PubkeyType::XOnly)
    } else {
        None
    }
}
