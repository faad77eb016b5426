use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use super::error::TrackerError;

/// A parsed tracker announce response.
///
/// Only the peer list drives the download; the swarm statistics are kept
/// for logging.
#[derive(Debug, Clone)]
pub struct AnnounceResponse {
    /// Seconds the tracker asks us to wait between announces.
    pub interval: Option<u32>,
    /// Number of seeders, when reported.
    pub complete: Option<u32>,
    /// Number of leechers, when reported.
    pub incomplete: Option<u32>,
    /// Peer endpoints from the compact `peers` string.
    pub peers: Vec<SocketAddr>,
}

/// Parses a compact peer list: 6 bytes per peer, 4-byte IPv4 address
/// followed by a big-endian port.
///
/// # Errors
///
/// Returns [`TrackerError::InvalidResponse`] when the length is not a
/// multiple of 6.
pub fn parse_compact_peers(data: &[u8]) -> Result<Vec<SocketAddr>, TrackerError> {
    if data.len() % 6 != 0 {
        return Err(TrackerError::InvalidResponse(format!(
            "compact peers length {} is not a multiple of 6",
            data.len()
        )));
    }

    Ok(data
        .chunks_exact(6)
        .map(|chunk| {
            let ip = Ipv4Addr::new(chunk[0], chunk[1], chunk[2], chunk[3]);
            let port = u16::from_be_bytes([chunk[4], chunk[5]]);
            SocketAddr::new(IpAddr::V4(ip), port)
        })
        .collect())
}
