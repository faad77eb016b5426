use std::net::SocketAddr;

use bytes::Bytes;
use sha1::{Digest, Sha1};
use tokio::net::TcpStream;
use tracing::debug;

use super::error::PeerError;
use super::extension::{ExtensionHandshake, EXTENSION_HANDSHAKE_ID, LOCAL_UT_METADATA_ID};
use super::message::{Handshake, Message};
use super::metadata::{metadata_piece_count, MetadataMessage, MetadataMessageType};
use super::peer_id::PeerId;
use super::transport::PeerTransport;
use crate::metainfo::InfoHash;

/// Standard block size for piece requests.
pub const BLOCK_SIZE: u32 = 16384;

/// Maximum number of in-flight block requests per session.
pub const PIPELINE_DEPTH: usize = 5;

/// One connection to one peer, driven through the protocol sequence:
/// handshake, bitfield, optional extension handshake, interested/unchoke,
/// then pipelined piece downloads.
///
/// A session owns its TCP stream; dropping the session closes it. Any
/// error leaves the session unusable, and the caller is expected to
/// abandon it and return in-progress work to the queue.
pub struct PeerSession {
    addr: SocketAddr,
    transport: PeerTransport,
    remote_peer_id: [u8; 20],
    supports_extensions: bool,
    peer_metadata_id: Option<u8>,
}

impl PeerSession {
    /// Connects and exchanges handshakes, verifying that the peer serves
    /// the expected torrent.
    ///
    /// `advertise_extensions` sets the BEP-10 reserved bit; the magnet
    /// path needs it to negotiate ut_metadata, the metainfo path does not.
    pub async fn connect(
        addr: SocketAddr,
        info_hash: &InfoHash,
        peer_id: &PeerId,
        advertise_extensions: bool,
    ) -> Result<Self, PeerError> {
        let stream = TcpStream::connect(addr).await?;
        let mut transport = PeerTransport::new(stream);

        let handshake = if advertise_extensions {
            Handshake::with_extensions(*info_hash.as_bytes(), *peer_id.as_bytes())
        } else {
            Handshake::new(*info_hash.as_bytes(), *peer_id.as_bytes())
        };
        transport.send_handshake(&handshake).await?;

        let theirs = transport.receive_handshake().await?;
        if theirs.info_hash != *info_hash.as_bytes() {
            return Err(PeerError::InfoHashMismatch);
        }

        debug!(%addr, extensions = theirs.supports_extension_protocol(), "peer handshake complete");

        Ok(Self {
            addr,
            transport,
            remote_peer_id: theirs.peer_id,
            supports_extensions: advertise_extensions && theirs.supports_extension_protocol(),
            peer_metadata_id: None,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The peer-id the remote sent in its handshake; recorded, never
    /// validated.
    pub fn remote_peer_id(&self) -> &[u8; 20] {
        &self.remote_peer_id
    }

    /// Whether both sides advertised the extension protocol.
    pub fn supports_extensions(&self) -> bool {
        self.supports_extensions
    }

    /// The peer's ut_metadata sub-id, known after the extension handshake.
    pub fn peer_metadata_id(&self) -> Option<u8> {
        self.peer_metadata_id
    }

    /// Reads until the peer's bitfield arrives. The payload is ignored:
    /// the tracker contract here is that every peer has every piece.
    pub async fn await_bitfield(&mut self) -> Result<(), PeerError> {
        loop {
            match self.next_message().await? {
                Message::Bitfield(_) => return Ok(()),
                other => debug!(addr = %self.addr, ?other, "skipping message while waiting for bitfield"),
            }
        }
    }

    /// Exchanges BEP-10 extension handshakes and records the peer's
    /// ut_metadata sub-id.
    pub async fn exchange_extension_handshake(
        &mut self,
    ) -> Result<ExtensionHandshake, PeerError> {
        let payload = ExtensionHandshake::local().encode();
        self.transport
            .send_message(&Message::Extended {
                id: EXTENSION_HANDSHAKE_ID,
                payload,
            })
            .await?;

        loop {
            match self.next_message().await? {
                Message::Extended { id, payload } => {
                    if id != EXTENSION_HANDSHAKE_ID {
                        return Err(PeerError::Extension(format!(
                            "expected handshake sub-id 0, got {id}"
                        )));
                    }
                    let handshake = ExtensionHandshake::decode(&payload)?;
                    self.peer_metadata_id = handshake.ut_metadata();
                    if self.peer_metadata_id.is_none() {
                        return Err(PeerError::Extension(
                            "peer does not support ut_metadata".into(),
                        ));
                    }
                    return Ok(handshake);
                }
                other => {
                    debug!(addr = %self.addr, ?other, "skipping message while waiting for extension handshake");
                }
            }
        }
    }

    /// Fetches the full info dictionary via ut_metadata and verifies its
    /// SHA-1 against `expected`.
    ///
    /// Metadata larger than one 16 KiB piece is fetched piece by piece and
    /// concatenated before the single hash check.
    pub async fn fetch_metadata(&mut self, expected: &InfoHash) -> Result<Bytes, PeerError> {
        let remote_id = self
            .peer_metadata_id
            .ok_or_else(|| PeerError::Extension("extension handshake not completed".into()))?;

        let mut blob = Vec::new();
        let mut total_size = None;
        let mut piece = 0u32;

        loop {
            self.transport
                .send_message(&Message::Extended {
                    id: remote_id,
                    payload: MetadataMessage::request(piece).encode(),
                })
                .await?;

            let message = self.next_metadata_message().await?;
            match message.msg_type {
                MetadataMessageType::Data => {}
                MetadataMessageType::Reject => {
                    return Err(PeerError::Extension(format!(
                        "peer rejected metadata piece {piece}"
                    )));
                }
                MetadataMessageType::Request => {
                    return Err(PeerError::Extension(
                        "peer sent a metadata request instead of data".into(),
                    ));
                }
            }

            if message.piece != piece {
                return Err(PeerError::Extension(format!(
                    "metadata piece {} received, expected {piece}",
                    message.piece
                )));
            }

            let size = message
                .total_size
                .ok_or_else(|| PeerError::Extension("data message without total_size".into()))?;
            match total_size {
                None => total_size = Some(size),
                Some(prev) if prev != size => {
                    return Err(PeerError::Extension("total_size changed mid-fetch".into()));
                }
                Some(_) => {}
            }

            let Some(data) = message.data else {
                return Err(PeerError::Extension("data message without payload".into()));
            };
            blob.extend_from_slice(&data);
            piece += 1;

            if blob.len() as u64 >= size {
                break;
            }
            if piece >= metadata_piece_count(size) {
                return Err(PeerError::Extension(
                    "metadata exhausted before reaching total_size".into(),
                ));
            }
        }

        let total_size = total_size.unwrap_or_default();
        if blob.len() as u64 != total_size {
            return Err(PeerError::Extension(format!(
                "metadata is {} bytes, peer announced {total_size}",
                blob.len()
            )));
        }

        let digest: [u8; 20] = Sha1::digest(&blob).into();
        if digest != *expected.as_bytes() {
            return Err(PeerError::MetadataHashMismatch);
        }

        debug!(addr = %self.addr, size = blob.len(), "metadata fetched and verified");
        Ok(Bytes::from(blob))
    }

    /// Sends `interested` and waits for `unchoke`.
    pub async fn express_interest(&mut self) -> Result<(), PeerError> {
        self.transport.send_message(&Message::Interested).await?;
        loop {
            match self.next_message().await? {
                Message::Unchoke => return Ok(()),
                other => debug!(addr = %self.addr, ?other, "skipping message while waiting for unchoke"),
            }
        }
    }

    /// Downloads and verifies one piece of `length` bytes.
    ///
    /// Keeps up to [`PIPELINE_DEPTH`] block requests in flight, sending
    /// the next request as each block arrives. Blocks may arrive in any
    /// order; reassembly sorts by offset and checks contiguity before the
    /// SHA-1 comparison.
    pub async fn download_piece(
        &mut self,
        index: u32,
        length: u64,
        expected_hash: &[u8; 20],
    ) -> Result<Bytes, PeerError> {
        let block_count = block_count(length);
        let mut blocks: Vec<(u32, Bytes)> = Vec::with_capacity(block_count as usize);
        let mut next_block = 0u32;
        let mut in_flight = 0usize;

        while in_flight < PIPELINE_DEPTH && next_block < block_count {
            self.request_block(index, next_block, length).await?;
            next_block += 1;
            in_flight += 1;
        }

        while (blocks.len() as u32) < block_count {
            match self.next_message().await? {
                Message::Piece {
                    index: got,
                    begin,
                    data,
                } => {
                    if got != index {
                        return Err(PeerError::Protocol(format!(
                            "received piece {got} while downloading {index}"
                        )));
                    }
                    blocks.push((begin, data));
                    in_flight -= 1;

                    if next_block < block_count {
                        self.request_block(index, next_block, length).await?;
                        next_block += 1;
                        in_flight += 1;
                    }
                }
                other => {
                    return Err(PeerError::Protocol(format!(
                        "unexpected message during piece download: {other:?}"
                    )));
                }
            }
        }

        let piece = assemble_blocks(index, blocks, length)?;
        verify_piece(index, &piece, expected_hash)?;
        Ok(piece)
    }

    async fn request_block(
        &mut self,
        index: u32,
        block: u32,
        piece_length: u64,
    ) -> Result<(), PeerError> {
        let begin = block * BLOCK_SIZE;
        let length = (piece_length - u64::from(begin)).min(u64::from(BLOCK_SIZE)) as u32;
        self.transport
            .send_message(&Message::Request {
                index,
                begin,
                length,
            })
            .await
    }

    /// Next non-keep-alive message.
    async fn next_message(&mut self) -> Result<Message, PeerError> {
        loop {
            match self.transport.receive_message().await? {
                Message::KeepAlive => continue,
                message => return Ok(message),
            }
        }
    }

    /// Next ut_metadata message addressed to our advertised sub-id.
    async fn next_metadata_message(&mut self) -> Result<MetadataMessage, PeerError> {
        loop {
            match self.next_message().await? {
                Message::Extended { id, payload } => {
                    if id == EXTENSION_HANDSHAKE_ID {
                        // A duplicate handshake; harmless.
                        continue;
                    }
                    if id != LOCAL_UT_METADATA_ID {
                        return Err(PeerError::Extension(format!(
                            "unexpected extension sub-id {id}"
                        )));
                    }
                    return MetadataMessage::decode(&payload);
                }
                other => {
                    debug!(addr = %self.addr, ?other, "skipping message while waiting for metadata");
                }
            }
        }
    }
}

pub(super) fn block_count(piece_length: u64) -> u32 {
    piece_length.div_ceil(u64::from(BLOCK_SIZE)) as u32
}

/// Orders received blocks by offset and concatenates them, requiring that
/// they tile the piece exactly.
pub(super) fn assemble_blocks(
    index: u32,
    mut blocks: Vec<(u32, Bytes)>,
    piece_length: u64,
) -> Result<Bytes, PeerError> {
    blocks.sort_by_key(|(begin, _)| *begin);

    let mut piece = Vec::with_capacity(piece_length as usize);
    for (begin, data) in &blocks {
        if u64::from(*begin) != piece.len() as u64 {
            return Err(PeerError::BlockOutOfOrder {
                index,
                begin: *begin,
            });
        }
        piece.extend_from_slice(data);
    }

    if piece.len() as u64 != piece_length {
        return Err(PeerError::Protocol(format!(
            "piece {index} reassembled to {} bytes, expected {piece_length}",
            piece.len()
        )));
    }

    Ok(Bytes::from(piece))
}

pub(super) fn verify_piece(
    index: u32,
    piece: &[u8],
    expected_hash: &[u8; 20],
) -> Result<(), PeerError> {
    let digest: [u8; 20] = Sha1::digest(piece).into();
    if digest != *expected_hash {
        return Err(PeerError::PieceHashMismatch { index });
    }
    Ok(())
}
