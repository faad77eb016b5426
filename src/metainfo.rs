//! Torrent metainfo handling (BEP-3, BEP-9).
//!
//! Parses `.torrent` files and magnet links into typed views, and computes
//! the info-hash from the canonical encoding of the `info` dictionary.

mod error;
mod info_hash;
mod magnet;
mod torrent;

pub use error::MetainfoError;
pub use info_hash::InfoHash;
pub use magnet::MagnetLink;
pub use torrent::{Info, Metainfo};
