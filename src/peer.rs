//! Peer wire protocol (BEP-3, BEP-9, BEP-10).
//!
//! Covers the fixed 68-byte handshake, length-prefixed message framing,
//! the extension protocol used to fetch an info dictionary over a magnet
//! link, and the per-peer session driving a pipelined piece download.

mod error;
mod extension;
mod message;
mod metadata;
mod peer_id;
mod session;
mod transport;

pub use error::PeerError;
pub use extension::{ExtensionHandshake, EXTENSION_HANDSHAKE_ID, LOCAL_UT_METADATA_ID};
pub use message::{Handshake, Message, MessageId, HANDSHAKE_LEN, PROTOCOL};
pub use metadata::{
    metadata_piece_count, MetadataMessage, MetadataMessageType, METADATA_PIECE_SIZE,
};
pub use peer_id::PeerId;
pub use session::{PeerSession, BLOCK_SIZE, PIPELINE_DEPTH};
pub use transport::PeerTransport;

#[cfg(test)]
mod tests;
