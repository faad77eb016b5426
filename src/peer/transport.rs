use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use super::error::PeerError;
use super::message::{Handshake, Message, HANDSHAKE_LEN};

// A bitfield for a very large torrent is the biggest legitimate frame we
// can receive; anything past this cap is a misbehaving peer.
const MAX_MESSAGE_SIZE: usize = 4 * 1024 * 1024;

const READ_TIMEOUT: Duration = Duration::from_secs(60);
const WRITE_TIMEOUT: Duration = Duration::from_secs(30);

/// Framed message I/O over one peer's TCP stream.
///
/// Reads accumulate into a buffer until a complete handshake or
/// length-prefixed message is available. Timeouts map to
/// [`PeerError::Timeout`] and are treated like any other session failure.
pub struct PeerTransport {
    stream: TcpStream,
    read_buf: BytesMut,
}

impl PeerTransport {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            read_buf: BytesMut::with_capacity(32 * 1024),
        }
    }

    pub async fn send_handshake(&mut self, handshake: &Handshake) -> Result<(), PeerError> {
        self.write_all(&handshake.encode()).await
    }

    pub async fn receive_handshake(&mut self) -> Result<Handshake, PeerError> {
        self.fill_to(HANDSHAKE_LEN).await?;
        let data = self.read_buf.split_to(HANDSHAKE_LEN);
        Handshake::decode(&data)
    }

    pub async fn send_message(&mut self, message: &Message) -> Result<(), PeerError> {
        self.write_all(&message.encode()).await
    }

    /// Receives the next framed message, including keep-alives.
    pub async fn receive_message(&mut self) -> Result<Message, PeerError> {
        self.fill_to(4).await?;
        let length = u32::from_be_bytes([
            self.read_buf[0],
            self.read_buf[1],
            self.read_buf[2],
            self.read_buf[3],
        ]) as usize;

        if length > MAX_MESSAGE_SIZE {
            return Err(PeerError::InvalidMessage(format!(
                "message length {} exceeds cap",
                length
            )));
        }

        self.fill_to(4 + length).await?;
        let data = self.read_buf.split_to(4 + length);
        Message::decode(data.freeze())
    }

    async fn fill_to(&mut self, len: usize) -> Result<(), PeerError> {
        while self.read_buf.len() < len {
            let n = timeout(READ_TIMEOUT, self.stream.read_buf(&mut self.read_buf))
                .await
                .map_err(|_| PeerError::Timeout)??;
            if n == 0 {
                return Err(PeerError::ConnectionClosed);
            }
        }
        Ok(())
    }

    async fn write_all(&mut self, data: &[u8]) -> Result<(), PeerError> {
        timeout(WRITE_TIMEOUT, self.stream.write_all(data))
            .await
            .map_err(|_| PeerError::Timeout)??;
        Ok(())
    }
}
