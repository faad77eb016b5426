use std::collections::BTreeMap;

use bytes::Bytes;

use super::error::PeerError;
use crate::bencode::{decode, encode, Value};

/// Sub-id 0 inside an `Extended` message marks the extension handshake.
pub const EXTENSION_HANDSHAKE_ID: u8 = 0;

/// The ut_metadata sub-id we advertise; peers address metadata data
/// messages to us with this id.
pub const LOCAL_UT_METADATA_ID: u8 = 1;

/// The BEP-10 extension handshake payload: a bencoded dictionary whose
/// `m` key maps extension names to the sender's chosen sub-ids.
#[derive(Debug, Clone, Default)]
pub struct ExtensionHandshake {
    pub extensions: BTreeMap<String, u8>,
    /// Size of the info dictionary, when the peer already knows it.
    pub metadata_size: Option<i64>,
}

impl ExtensionHandshake {
    /// The handshake we send: `{"m": {"ut_metadata": 1}}`.
    pub fn local() -> Self {
        let mut extensions = BTreeMap::new();
        extensions.insert("ut_metadata".to_string(), LOCAL_UT_METADATA_ID);
        Self {
            extensions,
            metadata_size: None,
        }
    }

    /// The peer's sub-id for ut_metadata requests, if it supports them.
    pub fn ut_metadata(&self) -> Option<u8> {
        self.extensions.get("ut_metadata").copied()
    }

    /// Encodes the bencoded dictionary (without the leading sub-id byte).
    pub fn encode(&self) -> Bytes {
        let mut m = BTreeMap::new();
        for (name, id) in &self.extensions {
            m.insert(
                Bytes::copy_from_slice(name.as_bytes()),
                Value::Integer(i64::from(*id)),
            );
        }

        let mut dict = BTreeMap::new();
        dict.insert(Bytes::from_static(b"m"), Value::Dict(m));
        if let Some(size) = self.metadata_size {
            dict.insert(Bytes::from_static(b"metadata_size"), Value::Integer(size));
        }

        Bytes::from(encode(&Value::Dict(dict)))
    }

    pub fn decode(payload: &[u8]) -> Result<Self, PeerError> {
        let value = decode(payload)?;
        let dict = value
            .as_dict()
            .ok_or_else(|| PeerError::Extension("handshake is not a dictionary".into()))?;

        let mut handshake = Self::default();

        if let Some(m) = dict.get(b"m".as_slice()).and_then(Value::as_dict) {
            for (name, id) in m {
                let (Ok(name), Some(id)) = (std::str::from_utf8(name), id.as_integer()) else {
                    continue;
                };
                // A sub-id of zero means the extension is disabled.
                if (1..=255).contains(&id) {
                    handshake.extensions.insert(name.to_string(), id as u8);
                }
            }
        }

        handshake.metadata_size = dict
            .get(b"metadata_size".as_slice())
            .and_then(Value::as_integer);

        Ok(handshake)
    }
}
