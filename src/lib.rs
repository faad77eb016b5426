//! btget - a single-file BitTorrent downloader.
//!
//! Downloads a file described by a `.torrent` file or a magnet link:
//! metadata is parsed or fetched from peers (BEP-9/10), peers come from
//! an HTTP tracker, and pieces are downloaded concurrently with SHA-1
//! verification.
//!
//! # Modules
//!
//! - [`bencode`] - BEP-3 bencode decoding and canonical encoding
//! - [`metainfo`] - torrent files, info hashes, magnet links
//! - [`tracker`] - HTTP tracker announces with compact peer lists
//! - [`peer`] - peer wire protocol, extension protocol, piece sessions
//! - [`download`] - work queue, piece store, concurrent coordinator

pub mod bencode;
pub mod download;
pub mod metainfo;
pub mod peer;
pub mod tracker;

pub use bencode::{decode, encode, BencodeError, Value};
pub use download::{DownloadError, Downloader, PieceStore, WorkQueue};
pub use metainfo::{Info, InfoHash, MagnetLink, Metainfo, MetainfoError};
pub use peer::{Handshake, Message, PeerError, PeerId, PeerSession};
pub use tracker::{AnnounceResponse, HttpTracker, TrackerError};
