//! Concurrent download engine.
//!
//! One session task per peer pulls piece indices from a shared
//! [`WorkQueue`], downloads and verifies them, and commits the bytes to a
//! shared [`PieceStore`]. The [`Downloader`] wires the tracker, the peer
//! sessions, and final reassembly together for both the `.torrent` and
//! magnet paths.

mod coordinator;
mod error;
mod queue;
mod store;

pub use coordinator::{Downloader, LISTEN_PORT};
pub use error::DownloadError;
pub use queue::WorkQueue;
pub use store::PieceStore;

#[cfg(test)]
mod tests;
