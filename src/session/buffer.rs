use crate::media::EncodedChunk;

/// Ordered, append-only store of encoded chunks
///
/// Insertion order is arrival order. Zero-size chunks are never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkBuffer {
    chunks: Vec<EncodedChunk>,
    total_bytes: usize,
}

impl ChunkBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk; returns false if it was empty and dropped
    pub fn push(&mut self, chunk: EncodedChunk) -> bool {
        if chunk.is_empty() {
            return false;
        }

        self.total_bytes += chunk.len();
        self.chunks.push(chunk);
        true
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
        self.total_bytes = 0;
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Sum of all chunk sizes in bytes
    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    pub fn chunks(&self) -> &[EncodedChunk] {
        &self.chunks
    }

    /// All chunk bytes concatenated in order
    pub fn concat(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.total_bytes);
        for chunk in &self.chunks {
            out.extend_from_slice(&chunk.data);
        }
        out
    }
}
