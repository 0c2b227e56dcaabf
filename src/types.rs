//! Core types shared by the codecs and the interpreter

/// Byte string type
pub type ByteString = Vec<u8>;

/// Script execution stack, bottom first
pub type Stack = Vec<ByteString>;

/// Half-open byte range `[start, end)` used for highlighting
pub type ByteRange = (usize, usize);
