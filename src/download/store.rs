use std::collections::HashMap;

use bytes::Bytes;
use parking_lot::Mutex;

/// The shared buffer of verified piece data.
///
/// Pieces are committed only after SHA-1 verification, and each index is
/// committed at most once: the first writer wins and later attempts are
/// rejected.
pub struct PieceStore {
    piece_count: u32,
    pieces: Mutex<HashMap<u32, Bytes>>,
}

impl PieceStore {
    pub fn new(piece_count: u32) -> Self {
        Self {
            piece_count,
            pieces: Mutex::new(HashMap::new()),
        }
    }

    /// Commits a verified piece. Returns `false` when the index was
    /// already present (the data is left untouched).
    pub fn commit(&self, index: u32, data: Bytes) -> bool {
        let mut pieces = self.pieces.lock();
        if pieces.contains_key(&index) {
            return false;
        }
        pieces.insert(index, data);
        true
    }

    pub fn contains(&self, index: u32) -> bool {
        self.pieces.lock().contains_key(&index)
    }

    pub fn len(&self) -> usize {
        self.pieces.lock().len()
    }

    pub fn is_complete(&self) -> bool {
        self.len() as u32 == self.piece_count
    }

    /// Piece indices not yet committed, in order.
    pub fn missing(&self) -> Vec<u32> {
        let pieces = self.pieces.lock();
        (0..self.piece_count)
            .filter(|index| !pieces.contains_key(index))
            .collect()
    }

    /// Concatenates all pieces in index order.
    ///
    /// Callers check [`missing`](PieceStore::missing) first; every stored
    /// piece has already been verified against its expected hash and
    /// length, so the result's size is an invariant, not a failure mode.
    pub fn assemble(&self) -> Bytes {
        let pieces = self.pieces.lock();
        let total: usize = pieces.values().map(Bytes::len).sum();
        let mut out = Vec::with_capacity(total);
        for index in 0..self.piece_count {
            if let Some(piece) = pieces.get(&index) {
                out.extend_from_slice(piece);
            }
        }
        Bytes::from(out)
    }
}
