use std::fmt;

use rand::Rng as _;

const PEER_ID_PREFIX: &[u8] = b"-BG0001-";

/// Our 20-byte peer identity: an Azureus-style client prefix followed by
/// random bytes from the thread-local CSPRNG.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerId(pub [u8; 20]);

impl PeerId {
    pub fn generate() -> Self {
        let mut id = [0u8; 20];
        id[..PEER_ID_PREFIX.len()].copy_from_slice(PEER_ID_PREFIX);
        rand::rng().fill(&mut id[PEER_ID_PREFIX.len()..]);
        Self(id)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerId({:02x?})", &self.0[..8])
    }
}
