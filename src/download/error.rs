use thiserror::Error;

use crate::metainfo::MetainfoError;
use crate::peer::PeerError;
use crate::tracker::TrackerError;

/// Errors that end a whole download, as opposed to per-session failures
/// the coordinator absorbs by moving on to another peer.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("metainfo error: {0}")]
    Metainfo(#[from] MetainfoError),

    #[error("tracker error: {0}")]
    Tracker(#[from] TrackerError),

    #[error("peer error: {0}")]
    Peer(#[from] PeerError),

    /// Every peer from the tracker failed connection or session setup.
    #[error("no usable peer in the swarm")]
    NoUsablePeer,

    #[error("piece index {0} out of range")]
    InvalidPieceIndex(u32),

    /// Sessions exited with pieces still unclaimed or failed past the
    /// retry cap.
    #[error("download incomplete, missing pieces {missing:?}")]
    Incomplete { missing: Vec<u32> },
}
