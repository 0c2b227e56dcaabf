//! Digest functions behind the script hashing opcodes

use crate::types::ByteString;
use bitcoin_hashes::{sha1, sha256d, Hash as BitcoinHash, HashEngine};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

pub fn sha256(data: &[u8]) -> ByteString {
    Sha256::digest(data).to_vec()
}

pub fn ripemd160(data: &[u8]) -> ByteString {
    Ripemd160::digest(data).to_vec()
}

pub fn sha1(data: &[u8]) -> ByteString {
    let mut hasher = sha1::Hash::engine();
    hasher.input(data);
    sha1::Hash::from_engine(hasher)[..].to_vec()
}

/// RIPEMD160(SHA256(x))
pub fn hash160(data: &[u8]) -> ByteString {
    Ripemd160::digest(Sha256::digest(data)).to_vec()
}

/// SHA256(SHA256(x))
pub fn hash256(data: &[u8]) -> ByteString {
    let mut hasher = sha256d::Hash::engine();
    hasher.input(data);
    sha256d::Hash::from_engine(hasher)[..].to_vec()
}
