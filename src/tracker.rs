//! HTTP tracker client (BEP-3, BEP-23).
//!
//! A tracker announce is a GET request whose query string carries the raw
//! info-hash and peer-id percent-encoded byte for byte; the response is a
//! bencoded dictionary with a compact peer list (6 bytes per peer).

mod error;
mod http;
mod response;

pub use error::TrackerError;
pub use http::HttpTracker;
pub use response::{parse_compact_peers, AnnounceResponse};

#[cfg(test)]
mod tests;
