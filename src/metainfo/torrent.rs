use std::path::Path;

use bytes::Bytes;

use super::error::MetainfoError;
use super::info_hash::InfoHash;
use crate::bencode::{decode, encode, Value};

/// A parsed single-file torrent.
///
/// # Examples
///
/// ```no_run
/// use btget::metainfo::Metainfo;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let metainfo = Metainfo::from_file("example.torrent")?;
/// println!("Tracker URL: {}", metainfo.announce);
/// println!("Info Hash: {}", metainfo.info_hash);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Metainfo {
    /// The info dictionary describing the file and its pieces.
    pub info: Info,
    /// SHA-1 of the canonical bencoding of the info dictionary.
    pub info_hash: InfoHash,
    /// The HTTP tracker announce URL.
    pub announce: String,
    raw_info: Bytes,
}

/// The typed view of a single-file `info` dictionary.
#[derive(Debug, Clone)]
pub struct Info {
    /// Suggested file name (unused by the download path).
    pub name: String,
    /// Total file length in bytes.
    pub length: u64,
    /// Standard piece size; the final piece may be shorter.
    pub piece_length: u64,
    /// SHA-1 digest of each piece.
    pub pieces: Vec<[u8; 20]>,
}

impl Metainfo {
    /// Parses a torrent file from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`MetainfoError`] when the data is not valid bencode, when
    /// `announce` or `info` is missing, or when the info dictionary fails
    /// the checks documented on [`Info`].
    pub fn from_bytes(data: &[u8]) -> Result<Self, MetainfoError> {
        let value = decode(data)?;
        let dict = value.as_dict().ok_or(MetainfoError::InvalidField("root"))?;

        let announce = dict
            .get(b"announce".as_slice())
            .ok_or(MetainfoError::MissingField("announce"))?
            .as_str()
            .ok_or(MetainfoError::InvalidField("announce"))?
            .to_string();

        let info_value = dict
            .get(b"info".as_slice())
            .ok_or(MetainfoError::MissingField("info"))?;

        // The re-encoding is canonical (keys sorted, bytes preserved), so
        // hashing it yields the info-hash the swarm agrees on.
        let raw_info = Bytes::from(encode(info_value));
        let info_hash = InfoHash::for_info(&raw_info);
        let info = Info::from_value(info_value)?;

        Ok(Self {
            info,
            info_hash,
            announce,
            raw_info,
        })
    }

    /// Reads and parses a torrent file from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, MetainfoError> {
        let data = std::fs::read(path)?;
        Self::from_bytes(&data)
    }

    /// The canonical bencoded info dictionary.
    pub fn raw_info(&self) -> &Bytes {
        &self.raw_info
    }
}

impl Info {
    /// Parses an info dictionary from a bencode value.
    pub fn from_value(value: &Value) -> Result<Self, MetainfoError> {
        let dict = value.as_dict().ok_or(MetainfoError::InvalidField("info"))?;

        let name = dict
            .get(b"name".as_slice())
            .and_then(Value::as_str)
            .ok_or(MetainfoError::MissingField("name"))?
            .to_string();

        let length = dict
            .get(b"length".as_slice())
            .and_then(Value::as_integer)
            .ok_or(MetainfoError::MissingField("length"))?;
        if length <= 0 {
            return Err(MetainfoError::InvalidField("length"));
        }

        let piece_length = dict
            .get(b"piece length".as_slice())
            .and_then(Value::as_integer)
            .ok_or(MetainfoError::MissingField("piece length"))?;
        if piece_length <= 0 {
            return Err(MetainfoError::InvalidField("piece length"));
        }

        let pieces_bytes = dict
            .get(b"pieces".as_slice())
            .and_then(Value::as_bytes)
            .ok_or(MetainfoError::MissingField("pieces"))?;
        if pieces_bytes.is_empty() || pieces_bytes.len() % 20 != 0 {
            return Err(MetainfoError::InvalidField("pieces"));
        }

        // One hash per piece; a mismatch would make the final-piece length
        // arithmetic meaningless.
        let expected_count = (length as u64).div_ceil(piece_length as u64);
        if (pieces_bytes.len() / 20) as u64 != expected_count {
            return Err(MetainfoError::InvalidField("pieces"));
        }

        let pieces = pieces_bytes
            .chunks_exact(20)
            .map(|chunk| {
                let mut hash = [0u8; 20];
                hash.copy_from_slice(chunk);
                hash
            })
            .collect();

        Ok(Self {
            name,
            length: length as u64,
            piece_length: piece_length as u64,
            pieces,
        })
    }

    /// Parses an info dictionary from a BEP-9 metadata blob.
    ///
    /// The blob is the canonical encoding of the info dictionary, so it
    /// goes through the same parse path as a torrent file's `info` value.
    pub fn from_metadata_bytes(data: &[u8]) -> Result<Self, MetainfoError> {
        let value = decode(data)?;
        Self::from_value(&value)
    }

    pub fn piece_count(&self) -> u32 {
        self.pieces.len() as u32
    }

    /// The expected SHA-1 digest of a piece.
    pub fn piece_hash(&self, index: u32) -> Option<&[u8; 20]> {
        self.pieces.get(index as usize)
    }

    /// The real byte length of a piece; the final piece covers whatever
    /// remains of the file.
    pub fn actual_piece_length(&self, index: u32) -> Option<u64> {
        let count = self.piece_count();
        if index >= count {
            return None;
        }
        if index == count - 1 {
            Some(self.length - u64::from(count - 1) * self.piece_length)
        } else {
            Some(self.piece_length)
        }
    }
}
