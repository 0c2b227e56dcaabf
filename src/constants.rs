//! Script limits and fixed lookup sets

/// Maximum size of a single pushed stack element
pub const MAX_SCRIPT_ELEMENT_SIZE: usize = 520;

/// Maximum number of public keys per CHECKMULTISIG
pub const MAX_PUBKEYS_PER_MULTISIG: i64 = 20;

/// Maximum byte length of a numeric opcode argument
pub const MAX_NUM_SIZE: usize = 4;

/// Maximum byte length of a CHECKLOCKTIMEVERIFY/CHECKSEQUENCEVERIFY argument
pub const MAX_LOCKTIME_SIZE: usize = 5;

/// Length of a raw BIP340 Schnorr signature
pub const SCHNORR_SIGNATURE_SIZE: usize = 64;

/// Largest r or s value inside a DER signature, without padding
pub const MAX_DER_INTEGER_SIZE: usize = 32;

/// Sighash flags with their short names
pub const SIGHASH_FLAGS: [(u8, &str); 6] = [
    (0x01, "all"),
    (0x02, "none"),
    (0x03, "single"),
    (0x81, "all-acp"),
    (0x82, "none-acp"),
    (0x83, "single-acp"),
];

/// Opcodes that make a Tapscript unconditionally succeed (BIP 342)
///
/// 80, 98, 126-129, 131-134, 137-138, 141-142, 149-153, 187-254
pub fn is_op_success(opcode: u8) -> bool {
    matches!(
        opcode,
        80 | 98 | 126..=129 | 131..=134 | 137..=138 | 141..=142 | 149..=153 | 187..=254
    )
}
