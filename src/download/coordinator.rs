use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use super::error::DownloadError;
use super::queue::WorkQueue;
use super::store::PieceStore;
use crate::metainfo::{Info, InfoHash, MagnetLink, Metainfo};
use crate::peer::{PeerError, PeerId, PeerSession};
use crate::tracker::HttpTracker;

/// The port we report to the tracker. Nothing listens on it; this client
/// only makes outbound connections.
pub const LISTEN_PORT: u16 = 6881;

/// Orchestrates a download: tracker announce, one session task per peer,
/// shared work queue and piece store, final reassembly.
///
/// The magnet flavor starts without an info dictionary and fills it in by
/// fetching metadata from the first peer that completes an extension
/// handshake.
pub struct Downloader {
    tracker: HttpTracker,
    info_hash: InfoHash,
    peer_id: PeerId,
    with_extensions: bool,
    info: Option<Arc<Info>>,
}

impl Downloader {
    /// A downloader for a parsed `.torrent` file.
    pub fn for_torrent(metainfo: &Metainfo) -> Result<Self, DownloadError> {
        Ok(Self {
            tracker: HttpTracker::new(&metainfo.announce)?,
            info_hash: metainfo.info_hash,
            peer_id: PeerId::generate(),
            with_extensions: false,
            info: Some(Arc::new(metainfo.info.clone())),
        })
    }

    /// A downloader for a magnet link; metadata is fetched lazily.
    pub fn for_magnet(magnet: &MagnetLink) -> Result<Self, DownloadError> {
        Ok(Self {
            tracker: HttpTracker::new(magnet.require_tracker()?)?,
            info_hash: magnet.info_hash,
            peer_id: PeerId::generate(),
            with_extensions: true,
            info: None,
        })
    }

    pub fn info_hash(&self) -> &InfoHash {
        &self.info_hash
    }

    /// The info dictionary, once known.
    pub fn info(&self) -> Option<&Info> {
        self.info.as_deref()
    }

    /// Announces to the tracker and returns the swarm's peer endpoints.
    ///
    /// Before metadata is known (magnet path) we report `left=1`; some
    /// trackers reject `left=0` from a non-seeder.
    pub async fn announce(&self) -> Result<Vec<SocketAddr>, DownloadError> {
        let left = self.info.as_ref().map_or(1, |info| info.length);
        let response = self
            .tracker
            .announce(
                self.info_hash.as_bytes(),
                self.peer_id.as_bytes(),
                LISTEN_PORT,
                0,
                0,
                left,
            )
            .await?;
        Ok(response.peers)
    }

    /// Connects to the first peer that completes session setup
    /// (handshake, bitfield, and the extension handshake on the magnet
    /// path).
    pub async fn connect_any_peer(&self) -> Result<PeerSession, DownloadError> {
        let peers = self.announce().await?;
        for addr in peers {
            match establish_session(
                addr,
                &self.info_hash,
                &self.peer_id,
                self.with_extensions,
            )
            .await
            {
                Ok(session) => return Ok(session),
                Err(err) => warn!(%addr, %err, "peer unusable, trying next"),
            }
        }
        Err(DownloadError::NoUsablePeer)
    }

    /// Fetches and verifies the info dictionary over ut_metadata,
    /// recording it for subsequent downloads. Returns the raw metadata
    /// bytes (the canonical info dictionary encoding).
    ///
    /// A [`PeerError::MetadataHashMismatch`] is fatal: it means the swarm
    /// is serving metadata that does not match the magnet link.
    pub async fn fetch_metadata(&mut self) -> Result<Bytes, DownloadError> {
        let mut session = self.connect_any_peer().await?;
        let blob = session.fetch_metadata(&self.info_hash).await?;
        self.info = Some(Arc::new(Info::from_metadata_bytes(&blob)?));
        Ok(blob)
    }

    /// Downloads a single piece from the first usable peer.
    pub async fn download_piece(&mut self, index: u32) -> Result<Bytes, DownloadError> {
        let info = self.ensure_info().await?;
        let length = info
            .actual_piece_length(index)
            .ok_or(DownloadError::InvalidPieceIndex(index))?;
        let hash = *info
            .piece_hash(index)
            .ok_or(DownloadError::InvalidPieceIndex(index))?;

        let mut session = self.connect_any_peer().await?;
        session.express_interest().await?;
        Ok(session.download_piece(index, length, &hash).await?)
    }

    /// Downloads the whole file concurrently and returns the assembled
    /// bytes.
    ///
    /// Each tracker peer gets its own session task; session failures are
    /// absorbed (the piece goes back on the queue, the task exits). The
    /// download fails with [`DownloadError::Incomplete`] when the tasks
    /// drain without covering every piece.
    pub async fn download(&mut self) -> Result<Bytes, DownloadError> {
        let info = self.ensure_info().await?;
        let peers = self.announce().await?;

        let queue = Arc::new(WorkQueue::new(info.piece_count()));
        let store = Arc::new(PieceStore::new(info.piece_count()));

        let mut tasks = JoinSet::new();
        for addr in peers {
            let worker = PeerWorker {
                addr,
                info_hash: self.info_hash,
                peer_id: self.peer_id,
                with_extensions: self.with_extensions,
                info: Arc::clone(&info),
                queue: Arc::clone(&queue),
                store: Arc::clone(&store),
            };
            tasks.spawn(worker.run());
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(err) = joined {
                warn!(%err, "session task panicked");
            }
        }

        let missing = store.missing();
        if !missing.is_empty() {
            return Err(DownloadError::Incomplete { missing });
        }

        let file = store.assemble();
        debug_assert_eq!(file.len() as u64, info.length);
        Ok(file)
    }

    async fn ensure_info(&mut self) -> Result<Arc<Info>, DownloadError> {
        if self.info.is_none() {
            self.fetch_metadata().await?;
        }
        match &self.info {
            Some(info) => Ok(Arc::clone(info)),
            // fetch_metadata either filled it or returned an error.
            None => Err(DownloadError::NoUsablePeer),
        }
    }
}

/// One peer's download loop, run as its own task.
struct PeerWorker {
    addr: SocketAddr,
    info_hash: InfoHash,
    peer_id: PeerId,
    with_extensions: bool,
    info: Arc<Info>,
    queue: Arc<WorkQueue>,
    store: Arc<PieceStore>,
}

impl PeerWorker {
    async fn run(self) {
        if let Err(err) = self.drive().await {
            warn!(addr = %self.addr, %err, "peer session ended");
        }
    }

    async fn drive(&self) -> Result<(), PeerError> {
        let mut session = establish_session(
            self.addr,
            &self.info_hash,
            &self.peer_id,
            self.with_extensions,
        )
        .await?;
        session.express_interest().await?;

        while let Some(index) = self.queue.claim() {
            // Another session may have finished this piece while it sat
            // in the queue after a retry.
            if self.store.contains(index) {
                continue;
            }
            let (Some(length), Some(hash)) = (
                self.info.actual_piece_length(index),
                self.info.piece_hash(index),
            ) else {
                continue;
            };

            match session.download_piece(index, length, hash).await {
                Ok(piece) => {
                    if !self.store.commit(index, piece) {
                        debug!(piece = index, "piece already committed");
                    }
                }
                Err(err) => {
                    // The connection is untrusted after any failure: give
                    // the piece back and stop using this peer.
                    if !self.queue.put_back(index) {
                        warn!(piece = index, "retry budget exhausted, dropping piece");
                    }
                    return Err(err);
                }
            }
        }

        Ok(())
    }
}

async fn establish_session(
    addr: SocketAddr,
    info_hash: &InfoHash,
    peer_id: &PeerId,
    with_extensions: bool,
) -> Result<PeerSession, PeerError> {
    let mut session = PeerSession::connect(addr, info_hash, peer_id, with_extensions).await?;
    session.await_bitfield().await?;
    if with_extensions && session.supports_extensions() {
        session.exchange_extension_handshake().await?;
    }
    Ok(session)
}
