use std::time::Duration;

use reqwest::Client;
use tracing::debug;

use super::error::TrackerError;
use super::response::{parse_compact_peers, AnnounceResponse};
use crate::bencode::{decode, Value};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// An HTTP tracker client.
///
/// # Examples
///
/// ```no_run
/// use btget::tracker::HttpTracker;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let tracker = HttpTracker::new("http://tracker.example.com/announce")?;
/// let response = tracker
///     .announce(&[0u8; 20], &[0u8; 20], 6881, 0, 0, 1000)
///     .await?;
/// println!("{} peers", response.peers.len());
/// # Ok(())
/// # }
/// ```
pub struct HttpTracker {
    client: Client,
    url: String,
}

impl HttpTracker {
    pub fn new(url: &str) -> Result<Self, TrackerError> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(TrackerError::InvalidUrl(url.to_string()));
        }

        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(TrackerError::Http)?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    /// Announces to the tracker and returns the peer list.
    ///
    /// The query string is assembled by hand so the 20 raw bytes of
    /// `info_hash` and `peer_id` survive percent-encoding exactly.
    ///
    /// # Errors
    ///
    /// - [`TrackerError::Status`] on a non-200 response
    /// - [`TrackerError::Failure`] when the tracker reports a
    ///   `failure reason`
    /// - [`TrackerError::NoPeers`] when the peer list is empty
    pub async fn announce(
        &self,
        info_hash: &[u8; 20],
        peer_id: &[u8; 20],
        port: u16,
        uploaded: u64,
        downloaded: u64,
        left: u64,
    ) -> Result<AnnounceResponse, TrackerError> {
        let url = format!(
            "{}?info_hash={}&peer_id={}&port={}&uploaded={}&downloaded={}&left={}&compact=1",
            self.url,
            percent_encode(info_hash),
            percent_encode(peer_id),
            port,
            uploaded,
            downloaded,
            left,
        );

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TrackerError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        let parsed = parse_announce_body(&body)?;

        debug!(
            peers = parsed.peers.len(),
            interval = ?parsed.interval,
            complete = ?parsed.complete,
            incomplete = ?parsed.incomplete,
            "tracker announce"
        );

        Ok(parsed)
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

pub(super) fn parse_announce_body(body: &[u8]) -> Result<AnnounceResponse, TrackerError> {
    let value = decode(body)?;
    let dict = value
        .as_dict()
        .ok_or_else(|| TrackerError::InvalidResponse("expected dictionary".into()))?;

    if let Some(reason) = dict
        .get(b"failure reason".as_slice())
        .and_then(Value::as_str)
    {
        return Err(TrackerError::Failure(reason.to_string()));
    }

    let interval = dict
        .get(b"interval".as_slice())
        .and_then(Value::as_integer)
        .map(|v| v as u32);
    let complete = dict
        .get(b"complete".as_slice())
        .and_then(Value::as_integer)
        .map(|v| v as u32);
    let incomplete = dict
        .get(b"incomplete".as_slice())
        .and_then(Value::as_integer)
        .map(|v| v as u32);

    let peers_bytes = dict
        .get(b"peers".as_slice())
        .and_then(Value::as_bytes)
        .ok_or_else(|| TrackerError::InvalidResponse("missing compact peers".into()))?;

    let peers = parse_compact_peers(peers_bytes)?;
    if peers.is_empty() {
        return Err(TrackerError::NoPeers);
    }

    Ok(AnnounceResponse {
        interval,
        complete,
        incomplete,
        peers,
    })
}

pub(super) fn percent_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;

    bytes.iter().fold(String::new(), |mut s, &b| {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~') {
            s.push(b as char);
        } else {
            let _ = write!(s, "%{:02X}", b);
        }
        s
    })
}
