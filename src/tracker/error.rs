use thiserror::Error;

use crate::bencode::BencodeError;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("tracker returned status {0}")]
    Status(u16),

    #[error("tracker reported failure: {0}")]
    Failure(String),

    #[error("bencode error: {0}")]
    Bencode(#[from] BencodeError),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("tracker returned no peers")]
    NoPeers,

    #[error("invalid announce url: {0}")]
    InvalidUrl(String),
}
