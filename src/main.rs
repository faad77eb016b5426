//! btget - command-line front end.
//!
//! Thin mapping from subcommands onto the library: every command calls a
//! single library operation and prints its result. Exit code is 0 on
//! success and 1 on any surfaced error.

use std::error::Error;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use btget::bencode::{self, Value};
use btget::download::Downloader;
use btget::metainfo::{Info, MagnetLink, Metainfo};
use btget::peer::{PeerId, PeerSession};

#[derive(Parser)]
#[command(name = "btget", version, about = "Single-file BitTorrent downloader")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode a bencoded value and print it as JSON.
    Decode { value: String },
    /// Print a torrent file's tracker, size, hashes, and piece geometry.
    Info { torrent: PathBuf },
    /// Announce to the tracker and print the swarm's peer endpoints.
    Peers { torrent: PathBuf },
    /// Handshake with one peer and print its peer id.
    Handshake { torrent: PathBuf, addr: String },
    /// Download a single verified piece.
    #[command(name = "download_piece")]
    DownloadPiece {
        #[arg(short)]
        output: PathBuf,
        torrent: PathBuf,
        index: u32,
    },
    /// Download the whole file.
    Download {
        #[arg(short)]
        output: PathBuf,
        torrent: PathBuf,
    },
    /// Parse a magnet link and print its tracker and info hash.
    #[command(name = "magnet_parse")]
    MagnetParse { uri: String },
    /// Handshake with a peer from a magnet link's tracker.
    #[command(name = "magnet_handshake")]
    MagnetHandshake { uri: String },
    /// Fetch metadata from the swarm and print the torrent summary.
    #[command(name = "magnet_info")]
    MagnetInfo { uri: String },
    /// Download a single verified piece via a magnet link.
    #[command(name = "magnet_download_piece")]
    MagnetDownloadPiece {
        #[arg(short)]
        output: PathBuf,
        uri: String,
        index: u32,
    },
    /// Download the whole file via a magnet link.
    #[command(name = "magnet_download")]
    MagnetDownload {
        #[arg(short)]
        output: PathBuf,
        uri: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli.command).await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

async fn run(command: Command) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Decode { value } => {
            let decoded = bencode::decode(value.as_bytes())?;
            println!("{}", serde_json::to_string(&to_json(&decoded))?);
        }
        Command::Info { torrent } => {
            let metainfo = Metainfo::from_file(torrent)?;
            print_summary(&metainfo.announce, &metainfo.info_hash.to_hex(), &metainfo.info);
        }
        Command::Peers { torrent } => {
            let metainfo = Metainfo::from_file(torrent)?;
            let downloader = Downloader::for_torrent(&metainfo)?;
            for peer in downloader.announce().await? {
                println!("{peer}");
            }
        }
        Command::Handshake { torrent, addr } => {
            let metainfo = Metainfo::from_file(torrent)?;
            let addr = resolve(&addr)?;
            let session =
                PeerSession::connect(addr, &metainfo.info_hash, &PeerId::generate(), false).await?;
            println!("Peer ID: {}", hex(session.remote_peer_id()));
        }
        Command::DownloadPiece {
            output,
            torrent,
            index,
        } => {
            let metainfo = Metainfo::from_file(&torrent)?;
            let mut downloader = Downloader::for_torrent(&metainfo)?;
            let piece = downloader.download_piece(index).await?;
            std::fs::write(&output, &piece)?;
            println!("Piece {index} downloaded to {}.", output.display());
        }
        Command::Download { output, torrent } => {
            let metainfo = Metainfo::from_file(&torrent)?;
            let mut downloader = Downloader::for_torrent(&metainfo)?;
            let file = downloader.download().await?;
            std::fs::write(&output, &file)?;
            println!(
                "Downloaded {} to {}.",
                torrent.display(),
                output.display()
            );
        }
        Command::MagnetParse { uri } => {
            let magnet = MagnetLink::parse(&uri)?;
            if let Some(tracker) = &magnet.tracker {
                println!("Tracker URL: {tracker}");
            }
            println!("Info Hash: {}", magnet.info_hash);
        }
        Command::MagnetHandshake { uri } => {
            let magnet = MagnetLink::parse(&uri)?;
            let downloader = Downloader::for_magnet(&magnet)?;
            let session = downloader.connect_any_peer().await?;
            println!("Peer ID: {}", hex(session.remote_peer_id()));
            // Zero when the peer never advertised ut_metadata.
            println!(
                "Peer Metadata Extension ID: {}",
                session.peer_metadata_id().unwrap_or(0)
            );
        }
        Command::MagnetInfo { uri } => {
            let magnet = MagnetLink::parse(&uri)?;
            let mut downloader = Downloader::for_magnet(&magnet)?;
            downloader.fetch_metadata().await?;
            let info = downloader.info().ok_or("metadata fetch returned no info")?;
            print_summary(magnet.require_tracker()?, &magnet.info_hash.to_hex(), info);
        }
        Command::MagnetDownloadPiece { output, uri, index } => {
            let magnet = MagnetLink::parse(&uri)?;
            let mut downloader = Downloader::for_magnet(&magnet)?;
            let piece = downloader.download_piece(index).await?;
            std::fs::write(&output, &piece)?;
            println!("Piece {index} downloaded to {}.", output.display());
        }
        Command::MagnetDownload { output, uri } => {
            let magnet = MagnetLink::parse(&uri)?;
            let mut downloader = Downloader::for_magnet(&magnet)?;
            let file = downloader.download().await?;
            std::fs::write(&output, &file)?;
            println!("Downloaded magnet link to {}.", output.display());
        }
    }
    Ok(())
}

fn print_summary(tracker_url: &str, info_hash_hex: &str, info: &Info) {
    println!("Tracker URL: {tracker_url}");
    println!("Length: {}", info.length);
    println!("Info Hash: {info_hash_hex}");
    println!("Piece Length: {}", info.piece_length);
    println!("Piece Hashes:");
    for hash in &info.pieces {
        println!("{}", hex(hash));
    }
}

fn resolve(addr: &str) -> Result<SocketAddr, Box<dyn Error>> {
    Ok(addr
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| format!("cannot resolve {addr}"))?)
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().fold(String::new(), |mut s, b| {
        use std::fmt::Write;
        let _ = write!(s, "{:02x}", b);
        s
    })
}

/// Renders a bencode value as JSON for the `decode` command. Byte strings
/// are printed lossily as UTF-8, matching the conventional output of this
/// command.
fn to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Integer(i) => serde_json::Value::from(*i),
        Value::Bytes(b) => serde_json::Value::String(String::from_utf8_lossy(b).into_owned()),
        Value::List(items) => serde_json::Value::Array(items.iter().map(to_json).collect()),
        Value::Dict(entries) => serde_json::Value::Object(
            entries
                .iter()
                .map(|(k, v)| (String::from_utf8_lossy(k).into_owned(), to_json(v)))
                .collect(),
        ),
    }
}
