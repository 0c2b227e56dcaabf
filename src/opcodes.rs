//! Bitcoin Script opcode constants and name tables
//!
//! Reference: Bitcoin Core `script/script.h`, BIP 65, BIP 112 and BIP 342.

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// PUSH VALUE
// ============================================================================

/// OP_0 / OP_FALSE - Push empty array
pub const OP_0: u8 = 0x00;
/// First direct push opcode: next byte is data
pub const OP_PUSHBYTES_1: u8 = 0x01;
/// Last direct push opcode: next 75 bytes are data
pub const OP_PUSHBYTES_75: u8 = 0x4b;
/// Next byte is data length
pub const OP_PUSHDATA1: u8 = 0x4c;
/// Next 2 bytes (little-endian) are data length
pub const OP_PUSHDATA2: u8 = 0x4d;
/// Next 4 bytes (little-endian) are data length
pub const OP_PUSHDATA4: u8 = 0x4e;
pub const OP_1NEGATE: u8 = 0x4f;
pub const OP_RESERVED: u8 = 0x50;
/// OP_1 / OP_TRUE
pub const OP_1: u8 = 0x51;
pub const OP_2: u8 = 0x52;
pub const OP_3: u8 = 0x53;
pub const OP_4: u8 = 0x54;
pub const OP_5: u8 = 0x55;
pub const OP_6: u8 = 0x56;
pub const OP_7: u8 = 0x57;
pub const OP_8: u8 = 0x58;
pub const OP_9: u8 = 0x59;
pub const OP_10: u8 = 0x5a;
pub const OP_11: u8 = 0x5b;
pub const OP_12: u8 = 0x5c;
pub const OP_13: u8 = 0x5d;
pub const OP_14: u8 = 0x5e;
pub const OP_15: u8 = 0x5f;
pub const OP_16: u8 = 0x60;

// ============================================================================
// CONTROL
// ============================================================================

pub const OP_NOP: u8 = 0x61;
pub const OP_VER: u8 = 0x62;
pub const OP_IF: u8 = 0x63;
pub const OP_NOTIF: u8 = 0x64;
pub const OP_VERIF: u8 = 0x65;
pub const OP_VERNOTIF: u8 = 0x66;
pub const OP_ELSE: u8 = 0x67;
pub const OP_ENDIF: u8 = 0x68;
pub const OP_VERIFY: u8 = 0x69;
pub const OP_RETURN: u8 = 0x6a;

// ============================================================================
// STACK
// ============================================================================

pub const OP_TOALTSTACK: u8 = 0x6b;
pub const OP_FROMALTSTACK: u8 = 0x6c;
pub const OP_2DROP: u8 = 0x6d;
pub const OP_2DUP: u8 = 0x6e;
pub const OP_3DUP: u8 = 0x6f;
pub const OP_2OVER: u8 = 0x70;
pub const OP_2ROT: u8 = 0x71;
pub const OP_2SWAP: u8 = 0x72;
pub const OP_IFDUP: u8 = 0x73;
pub const OP_DEPTH: u8 = 0x74;
pub const OP_DROP: u8 = 0x75;
pub const OP_DUP: u8 = 0x76;
pub const OP_NIP: u8 = 0x77;
pub const OP_OVER: u8 = 0x78;
pub const OP_PICK: u8 = 0x79;
pub const OP_ROLL: u8 = 0x7a;
pub const OP_ROT: u8 = 0x7b;
pub const OP_SWAP: u8 = 0x7c;
pub const OP_TUCK: u8 = 0x7d;

// ============================================================================
// SPLICE
// ============================================================================

pub const OP_CAT: u8 = 0x7e;
pub const OP_SUBSTR: u8 = 0x7f;
pub const OP_LEFT: u8 = 0x80;
pub const OP_RIGHT: u8 = 0x81;
pub const OP_SIZE: u8 = 0x82;

// ============================================================================
// BIT LOGIC
// ============================================================================

pub const OP_INVERT: u8 = 0x83;
pub const OP_AND: u8 = 0x84;
pub const OP_OR: u8 = 0x85;
pub const OP_XOR: u8 = 0x86;
pub const OP_EQUAL: u8 = 0x87;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_RESERVED1: u8 = 0x89;
pub const OP_RESERVED2: u8 = 0x8a;

// ============================================================================
// NUMERIC
// ============================================================================

pub const OP_1ADD: u8 = 0x8b;
pub const OP_1SUB: u8 = 0x8c;
pub const OP_2MUL: u8 = 0x8d;
pub const OP_2DIV: u8 = 0x8e;
pub const OP_NEGATE: u8 = 0x8f;
pub const OP_ABS: u8 = 0x90;
pub const OP_NOT: u8 = 0x91;
pub const OP_0NOTEQUAL: u8 = 0x92;
pub const OP_ADD: u8 = 0x93;
pub const OP_SUB: u8 = 0x94;
pub const OP_MUL: u8 = 0x95;
pub const OP_DIV: u8 = 0x96;
pub const OP_MOD: u8 = 0x97;
pub const OP_LSHIFT: u8 = 0x98;
pub const OP_RSHIFT: u8 = 0x99;
pub const OP_BOOLAND: u8 = 0x9a;
pub const OP_BOOLOR: u8 = 0x9b;
pub const OP_NUMEQUAL: u8 = 0x9c;
pub const OP_NUMEQUALVERIFY: u8 = 0x9d;
pub const OP_NUMNOTEQUAL: u8 = 0x9e;
pub const OP_LESSTHAN: u8 = 0x9f;
pub const OP_GREATERTHAN: u8 = 0xa0;
pub const OP_LESSTHANOREQUAL: u8 = 0xa1;
pub const OP_GREATERTHANOREQUAL: u8 = 0xa2;
pub const OP_MIN: u8 = 0xa3;
pub const OP_MAX: u8 = 0xa4;
pub const OP_WITHIN: u8 = 0xa5;

// ============================================================================
// CRYPTO
// ============================================================================

pub const OP_RIPEMD160: u8 = 0xa6;
pub const OP_SHA1: u8 = 0xa7;
pub const OP_SHA256: u8 = 0xa8;
pub const OP_HASH160: u8 = 0xa9;
pub const OP_HASH256: u8 = 0xaa;
pub const OP_CODESEPARATOR: u8 = 0xab;
pub const OP_CHECKSIG: u8 = 0xac;
pub const OP_CHECKSIGVERIFY: u8 = 0xad;
pub const OP_CHECKMULTISIG: u8 = 0xae;
pub const OP_CHECKMULTISIGVERIFY: u8 = 0xaf;

// ============================================================================
// EXPANSION
// ============================================================================

pub const OP_NOP1: u8 = 0xb0;
/// OP_CHECKLOCKTIMEVERIFY (BIP 65), formerly OP_NOP2
pub const OP_CHECKLOCKTIMEVERIFY: u8 = 0xb1;
/// OP_CHECKSEQUENCEVERIFY (BIP 112), formerly OP_NOP3
pub const OP_CHECKSEQUENCEVERIFY: u8 = 0xb2;
pub const OP_NOP4: u8 = 0xb3;
pub const OP_NOP5: u8 = 0xb4;
pub const OP_NOP6: u8 = 0xb5;
pub const OP_NOP7: u8 = 0xb6;
pub const OP_NOP8: u8 = 0xb7;
pub const OP_NOP9: u8 = 0xb8;
pub const OP_NOP10: u8 = 0xb9;

/// OP_CHECKSIGADD - Tapscript only (BIP 342)
pub const OP_CHECKSIGADD: u8 = 0xba;

pub const OP_INVALIDOPCODE: u8 = 0xff;

/// Named opcodes that are not pushes, without the `OP_` prefix
const NON_PUSH_OPCODES: &[(&str, u8)] = &[
    ("RESERVED", OP_RESERVED),
    ("NOP", OP_NOP),
    ("VER", OP_VER),
    ("IF", OP_IF),
    ("NOTIF", OP_NOTIF),
    ("VERIF", OP_VERIF),
    ("VERNOTIF", OP_VERNOTIF),
    ("ELSE", OP_ELSE),
    ("ENDIF", OP_ENDIF),
    ("VERIFY", OP_VERIFY),
    ("RETURN", OP_RETURN),
    ("TOALTSTACK", OP_TOALTSTACK),
    ("FROMALTSTACK", OP_FROMALTSTACK),
    ("2DROP", OP_2DROP),
    ("2DUP", OP_2DUP),
    ("3DUP", OP_3DUP),
    ("2OVER", OP_2OVER),
    ("2ROT", OP_2ROT),
    ("2SWAP", OP_2SWAP),
    ("IFDUP", OP_IFDUP),
    ("DEPTH", OP_DEPTH),
    ("DROP", OP_DROP),
    ("DUP", OP_DUP),
    ("NIP", OP_NIP),
    ("OVER", OP_OVER),
    ("PICK", OP_PICK),
    ("ROLL", OP_ROLL),
    ("ROT", OP_ROT),
    ("SWAP", OP_SWAP),
    ("TUCK", OP_TUCK),
    ("CAT", OP_CAT),
    ("SUBSTR", OP_SUBSTR),
    ("LEFT", OP_LEFT),
    ("RIGHT", OP_RIGHT),
    ("SIZE", OP_SIZE),
    ("INVERT", OP_INVERT),
    ("AND", OP_AND),
    ("OR", OP_OR),
    ("XOR", OP_XOR),
    ("EQUAL", OP_EQUAL),
    ("EQUALVERIFY", OP_EQUALVERIFY),
    ("RESERVED1", OP_RESERVED1),
    ("RESERVED2", OP_RESERVED2),
    ("1ADD", OP_1ADD),
    ("1SUB", OP_1SUB),
    ("2MUL", OP_2MUL),
    ("2DIV", OP_2DIV),
    ("NEGATE", OP_NEGATE),
    ("ABS", OP_ABS),
    ("NOT", OP_NOT),
    ("0NOTEQUAL", OP_0NOTEQUAL),
    ("ADD", OP_ADD),
    ("SUB", OP_SUB),
    ("MUL", OP_MUL),
    ("DIV", OP_DIV),
    ("MOD", OP_MOD),
    ("LSHIFT", OP_LSHIFT),
    ("RSHIFT", OP_RSHIFT),
    ("BOOLAND", OP_BOOLAND),
    ("BOOLOR", OP_BOOLOR),
    ("NUMEQUAL", OP_NUMEQUAL),
    ("NUMEQUALVERIFY", OP_NUMEQUALVERIFY),
    ("NUMNOTEQUAL", OP_NUMNOTEQUAL),
    ("LESSTHAN", OP_LESSTHAN),
    ("GREATERTHAN", OP_GREATERTHAN),
    ("LESSTHANOREQUAL", OP_LESSTHANOREQUAL),
    ("GREATERTHANOREQUAL", OP_GREATERTHANOREQUAL),
    ("MIN", OP_MIN),
    ("MAX", OP_MAX),
    ("WITHIN", OP_WITHIN),
    ("RIPEMD160", OP_RIPEMD160),
    ("SHA1", OP_SHA1),
    ("SHA256", OP_SHA256),
    ("HASH160", OP_HASH160),
    ("HASH256", OP_HASH256),
    ("CODESEPARATOR", OP_CODESEPARATOR),
    ("CHECKSIG", OP_CHECKSIG),
    ("CHECKSIGVERIFY", OP_CHECKSIGVERIFY),
    ("CHECKMULTISIG", OP_CHECKMULTISIG),
    ("CHECKMULTISIGVERIFY", OP_CHECKMULTISIGVERIFY),
    ("NOP1", OP_NOP1),
    ("CHECKLOCKTIMEVERIFY", OP_CHECKLOCKTIMEVERIFY),
    ("CHECKSEQUENCEVERIFY", OP_CHECKSEQUENCEVERIFY),
    ("NOP4", OP_NOP4),
    ("NOP5", OP_NOP5),
    ("NOP6", OP_NOP6),
    ("NOP7", OP_NOP7),
    ("NOP8", OP_NOP8),
    ("NOP9", OP_NOP9),
    ("NOP10", OP_NOP10),
    ("CHECKSIGADD", OP_CHECKSIGADD),
    ("INVALIDOPCODE", OP_INVALIDOPCODE),
];

/// Alternative names accepted when assembling
const ALIASES: &[(&str, u8)] = &[
    ("FALSE", OP_0),
    ("TRUE", OP_1),
    ("CLTV", OP_CHECKLOCKTIMEVERIFY),
    ("NOP2", OP_CHECKLOCKTIMEVERIFY),
    ("CSV", OP_CHECKSEQUENCEVERIFY),
    ("NOP3", OP_CHECKSEQUENCEVERIFY),
];

struct OpcodeTables {
    by_name: HashMap<String, u8>,
    names: Vec<String>,
    non_push_names: [Option<&'static str>; 256],
}

static TABLES: OnceLock<OpcodeTables> = OnceLock::new();

fn tables() -> &'static OpcodeTables {
    TABLES.get_or_init(|| {
        let mut entries: Vec<(String, u8)> = vec![
            ("OP_0".to_string(), OP_0),
            ("OP_1NEGATE".to_string(), OP_1NEGATE),
        ];
        for n in 1..=16u8 {
            entries.push((format!("OP_{}", n), OP_1 + n - 1));
        }
        for n in 1..=16u8 {
            entries.push((format!("OP_PUSHNUM_{}", n), OP_1 + n - 1));
        }
        entries.extend(
            NON_PUSH_OPCODES
                .iter()
                .chain(ALIASES)
                .map(|(name, byte)| (format!("OP_{}", name), *byte)),
        );

        let mut non_push_names = [None; 256];
        for (name, byte) in NON_PUSH_OPCODES {
            non_push_names[*byte as usize] = Some(*name);
        }

        OpcodeTables {
            names: entries.iter().map(|(name, _)| name.clone()).collect(),
            by_name: entries.into_iter().collect(),
            non_push_names,
        }
    })
}

/// Look up an opcode by its full mnemonic, e.g. `OP_CHECKSIG`
///
/// Lookup is exact; callers normalize case. Variable-length push mnemonics
/// (`OP_PUSHBYTES_n`, `OP_PUSHDATA1/2/4`) are display-only and not found.
pub fn opcode_by_name(name: &str) -> Option<u8> {
    tables().by_name.get(name).copied()
}

/// Mnemonic of a non-push opcode, without the `OP_` prefix
fn non_push_short_name(opcode: u8) -> Option<&'static str> {
    tables().non_push_names[opcode as usize]
}

/// Full mnemonic of a non-push opcode, e.g. `OP_DUP`
pub fn non_push_opcode_name(opcode: u8) -> Option<String> {
    non_push_short_name(opcode).map(|name| format!("OP_{}", name))
}

/// Every mnemonic accepted by the assembler
pub fn opcode_names() -> &'static [String] {
    &tables().names
}

/// OP_0, the length-prefixed pushes, OP_1NEGATE and OP_1..OP_16
pub fn is_push_opcode(opcode: u8) -> bool {
    opcode <= OP_1NEGATE || (OP_1..=OP_16).contains(&opcode)
}

/// Opcodes disabled after CVE-2010-5137
pub fn is_disabled_opcode(opcode: u8) -> bool {
    matches!(
        opcode,
        OP_CAT
            | OP_SUBSTR
            | OP_LEFT
            | OP_RIGHT
            | OP_INVERT
            | OP_AND
            | OP_OR
            | OP_XOR
            | OP_2MUL
            | OP_2DIV
            | OP_MUL
            | OP_DIV
            | OP_MOD
            | OP_LSHIFT
            | OP_RSHIFT
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_by_name() {
        assert_eq!(opcode_by_name("OP_0"), Some(OP_0));
        assert_eq!(opcode_by_name("OP_FALSE"), Some(OP_0));
        assert_eq!(opcode_by_name("OP_TRUE"), Some(OP_1));
        assert_eq!(opcode_by_name("OP_16"), Some(OP_16));
        assert_eq!(opcode_by_name("OP_PUSHNUM_16"), Some(OP_16));
        assert_eq!(opcode_by_name("OP_CLTV"), Some(OP_CHECKLOCKTIMEVERIFY));
        assert_eq!(opcode_by_name("OP_NOP3"), Some(OP_CHECKSEQUENCEVERIFY));
        assert_eq!(opcode_by_name("OP_CHECKSIGADD"), Some(OP_CHECKSIGADD));
    }

    #[test]
    fn test_display_only_names_are_rejected() {
        for name in ["OP_PUSHBYTES_1", "OP_PUSHDATA1", "OP_PUSHDATA2", "OP_PUSHDATA4", "OP_PUSHNUM_0", "OP_17", "OP_UNKNOWN"] {
            assert_eq!(opcode_by_name(name), None, "{}", name);
        }
    }

    #[test]
    fn test_non_push_names() {
        assert_eq!(non_push_opcode_name(OP_DUP).as_deref(), Some("OP_DUP"));
        assert_eq!(non_push_opcode_name(OP_RESERVED).as_deref(), Some("OP_RESERVED"));
        assert_eq!(
            non_push_opcode_name(OP_CHECKLOCKTIMEVERIFY).as_deref(),
            Some("OP_CHECKLOCKTIMEVERIFY")
        );
        assert_eq!(non_push_opcode_name(OP_1), None);
        assert_eq!(non_push_opcode_name(0x20), None);
        assert_eq!(non_push_opcode_name(0xbb), None);
    }

    #[test]
    fn test_push_and_disabled_sets() {
        assert!(is_push_opcode(OP_0));
        assert!(is_push_opcode(OP_PUSHDATA4));
        assert!(is_push_opcode(OP_1NEGATE));
        assert!(!is_push_opcode(OP_RESERVED));
        assert!(is_push_opcode(OP_16));
        assert!(!is_push_opcode(OP_NOP));
        assert_eq!((0..=255u8).filter(|op| is_disabled_opcode(*op)).count(), 15);
    }

    #[test]
    fn test_opcode_names_contains_aliases() {
        let names = opcode_names();
        assert!(names.iter().any(|n| n == "OP_CSV"));
        assert!(names.iter().any(|n| n == "OP_PUSHNUM_3"));
    }
}
