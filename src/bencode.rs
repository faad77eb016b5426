//! Bencode encoding and decoding (BEP-3).
//!
//! Bencode is the serialization format BitTorrent uses for torrent files,
//! tracker responses, and extension-protocol payloads. It has exactly four
//! types: integers, byte strings, lists, and dictionaries.

mod decode;
mod encode;
mod error;
mod value;

pub use decode::{decode, decode_prefix};
pub use encode::{encode, encode_into};
pub use error::BencodeError;
pub use value::Value;
