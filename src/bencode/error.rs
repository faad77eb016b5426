use thiserror::Error;

/// Errors produced while decoding bencode data.
#[derive(Debug, Error)]
pub enum BencodeError {
    /// Input ended before a complete value was parsed.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// Integer is empty, zero-padded, `-0`, or out of the i64 range.
    #[error("invalid integer: {0}")]
    InvalidInteger(String),

    /// Byte-string length prefix is not a decimal number.
    #[error("invalid string length prefix")]
    InvalidLength,

    /// A byte that cannot start a bencode value.
    #[error("unexpected byte: 0x{0:02x}")]
    UnexpectedByte(u8),

    /// Dictionary key is not a byte string.
    #[error("dictionary key must be a byte string, found 0x{0:02x}")]
    InvalidDictKey(u8),

    /// Extra bytes after the value.
    #[error("trailing data after value")]
    TrailingData,

    /// Recursion limit exceeded.
    #[error("nesting too deep")]
    NestingTooDeep,
}
