//! Fixed-size chunk extraction from the capture callback's byte stream.
//!
//! The audio backend delivers blocks of whatever size it likes; the server
//! expects chunks of exactly `chunk_samples * 2` bytes. Incoming bytes are
//! appended to an accumulator and full chunks are drained from the front in
//! arrival order. Leftover bytes smaller than one chunk stay buffered for the
//! next callback. The accumulator is not bounded; if draining falls behind the
//! capture rate it grows without limit.

#[derive(Debug)]
pub struct ChunkBuffer {
    buf: Vec<u8>,
    chunk_bytes: usize,
}

impl ChunkBuffer {
    /// `chunk_bytes` must be positive; callers validate via `AppConfig`.
    pub fn new(chunk_bytes: usize) -> Self {
        Self {
            buf: Vec::with_capacity(chunk_bytes * 2),
            chunk_bytes,
        }
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Appends samples as little-endian bytes, matching the wire format.
    pub fn push_samples(&mut self, samples: &[i16]) {
        self.buf.reserve(samples.len() * 2);
        for sample in samples {
            self.buf.extend_from_slice(&sample.to_le_bytes());
        }
    }

    /// Removes and returns one full chunk from the front, or `None` if less
    /// than a chunk is buffered. Call in a loop to drain multiple chunks.
    pub fn pop_chunk(&mut self) -> Option<Vec<u8>> {
        if self.buf.len() < self.chunk_bytes {
            return None;
        }
        Some(self.buf.drain(..self.chunk_bytes).collect())
    }

    pub fn buffered_bytes(&self) -> usize {
        self.buf.len()
    }

    pub fn chunk_bytes(&self) -> usize {
        self.chunk_bytes
    }
}
