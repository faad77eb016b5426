use thiserror::Error;

use crate::bencode::BencodeError;

/// Errors from peer connections and piece downloads.
#[derive(Debug, Error)]
pub enum PeerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer's handshake is not 68 bytes of the expected shape.
    #[error("invalid handshake")]
    InvalidHandshake,

    /// The peer is serving a different torrent.
    #[error("info hash mismatch")]
    InfoHashMismatch,

    #[error("invalid message: {0}")]
    InvalidMessage(String),

    #[error("invalid message id: {0}")]
    InvalidMessageId(u8),

    #[error("connection closed")]
    ConnectionClosed,

    #[error("timeout")]
    Timeout,

    /// The peer violated the protocol sequence.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Extension protocol (BEP-10) or metadata exchange (BEP-9) error.
    #[error("extension error: {0}")]
    Extension(String),

    #[error("bencode error: {0}")]
    Bencode(#[from] BencodeError),

    /// A reassembled piece failed SHA-1 verification.
    #[error("piece {index} failed hash verification")]
    PieceHashMismatch { index: u32 },

    /// Received blocks do not tile the piece contiguously.
    #[error("piece {index} blocks not contiguous at offset {begin}")]
    BlockOutOfOrder { index: u32, begin: u32 },

    /// BEP-9 metadata does not hash to the magnet link's info hash.
    #[error("metadata hash mismatch")]
    MetadataHashMismatch,
}
