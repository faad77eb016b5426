//! Metadata exchange messages (ut_metadata, BEP-9).
//!
//! On the magnet path the info dictionary is fetched from a peer in
//! 16 KiB pieces. Each message is a bencoded dictionary; data messages
//! additionally carry the raw piece bytes immediately after it.

use std::collections::BTreeMap;

use bytes::Bytes;

use super::error::PeerError;
use crate::bencode::{decode_prefix, encode, Value};

/// The size of a metadata piece; only the final piece may be shorter.
pub const METADATA_PIECE_SIZE: usize = 16384;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataMessageType {
    Request = 0,
    Data = 1,
    Reject = 2,
}

impl MetadataMessageType {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(MetadataMessageType::Request),
            1 => Some(MetadataMessageType::Data),
            2 => Some(MetadataMessageType::Reject),
            _ => None,
        }
    }
}

/// One ut_metadata message.
#[derive(Debug, Clone)]
pub struct MetadataMessage {
    pub msg_type: MetadataMessageType,
    /// Which metadata piece this message refers to.
    pub piece: u32,
    /// Total metadata size; data messages only.
    pub total_size: Option<u64>,
    /// The raw metadata piece bytes; data messages only.
    pub data: Option<Bytes>,
}

impl MetadataMessage {
    pub fn request(piece: u32) -> Self {
        Self {
            msg_type: MetadataMessageType::Request,
            piece,
            total_size: None,
            data: None,
        }
    }

    /// Encodes the bencoded dictionary, with the raw piece bytes appended
    /// for data messages.
    pub fn encode(&self) -> Bytes {
        let mut dict = BTreeMap::new();
        dict.insert(
            Bytes::from_static(b"msg_type"),
            Value::Integer(self.msg_type as i64),
        );
        dict.insert(
            Bytes::from_static(b"piece"),
            Value::Integer(i64::from(self.piece)),
        );
        if let Some(total_size) = self.total_size {
            dict.insert(
                Bytes::from_static(b"total_size"),
                Value::Integer(total_size as i64),
            );
        }

        let mut encoded = encode(&Value::Dict(dict));
        if let Some(ref data) = self.data {
            encoded.extend_from_slice(data);
        }
        Bytes::from(encoded)
    }

    /// Decodes a ut_metadata payload (everything after the extension
    /// sub-id byte).
    ///
    /// The dictionary's extent is found by the bencode decoder itself;
    /// whatever follows it is the metadata piece for data messages.
    pub fn decode(payload: &[u8]) -> Result<Self, PeerError> {
        let (value, consumed) = decode_prefix(payload)?;
        let dict = value
            .as_dict()
            .ok_or_else(|| PeerError::Extension("metadata message is not a dictionary".into()))?;

        let msg_type = dict
            .get(b"msg_type".as_slice())
            .and_then(Value::as_integer)
            .and_then(|v| u8::try_from(v).ok())
            .and_then(MetadataMessageType::from_byte)
            .ok_or_else(|| PeerError::Extension("missing or invalid msg_type".into()))?;

        let piece = dict
            .get(b"piece".as_slice())
            .and_then(Value::as_integer)
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| PeerError::Extension("missing or invalid piece".into()))?;

        let total_size = dict
            .get(b"total_size".as_slice())
            .and_then(Value::as_integer)
            .and_then(|v| u64::try_from(v).ok());

        let data = if msg_type == MetadataMessageType::Data {
            Some(Bytes::copy_from_slice(&payload[consumed..]))
        } else {
            None
        };

        Ok(Self {
            msg_type,
            piece,
            total_size,
            data,
        })
    }
}

/// Number of 16 KiB pieces a metadata blob of `total_size` occupies.
pub fn metadata_piece_count(total_size: u64) -> u32 {
    total_size.div_ceil(METADATA_PIECE_SIZE as u64) as u32
}
