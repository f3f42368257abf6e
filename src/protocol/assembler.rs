//! Chunk reassembly for the stream transport.
//!
//! The HTTP-upgraded channel delivers *physical* chunks, each marked final or
//! continued. A single physical delivery may contain zero, one, or several
//! *logical* frames, and a frame's bytes may span multiple chunks. The
//! [`ChunkAssembler`] decouples chunk boundaries from frame boundaries:
//! chunks accumulate until a final delivery, then a single walk extracts
//! every complete frame.
//!
//! Two rules of the walk are deliberate and load-bearing:
//! - A length prefix is only decoded when the current buffer holds at least
//!   3 unread bytes; a trailing remainder below 3 bytes advances the buffer
//!   pointer instead of peeking into the next buffer.
//! - All accumulation is cleared after the walk, whether or not bytes were
//!   left over. Partial frames are never delivered and never carried across
//!   final deliveries.

use bytes::{Bytes, BytesMut};

use super::wire_format::{decode_length, LENGTH_SIZE};

/// Accumulates physical chunks and extracts logical frames on final delivery.
#[derive(Debug, Default)]
pub struct ChunkAssembler {
    parts: Vec<Bytes>,
}

impl ChunkAssembler {
    /// Create an empty assembler.
    pub fn new() -> Self {
        Self { parts: Vec::with_capacity(5) }
    }

    /// Push one physical chunk.
    ///
    /// Returns the complete frames extracted by this delivery. A chunk not
    /// marked final only accumulates and always returns an empty vector; a
    /// final chunk triggers the walk and clears all accumulation afterwards.
    pub fn push(&mut self, chunk: Bytes, last: bool) -> Vec<Bytes> {
        self.parts.push(chunk);
        if !last {
            return Vec::new();
        }

        let frames = self.walk();
        self.parts.clear();
        frames
    }

    /// Discard all accumulated chunks, e.g. on session close.
    pub fn clear(&mut self) {
        self.parts.clear();
    }

    /// Walk the accumulated buffers from the start, extracting every frame
    /// that is complete within this delivery group.
    fn walk(&self) -> Vec<Bytes> {
        let mut frames = Vec::new();
        let mut idx = 0;
        let mut pos = 0;
        let mut owed: i32 = 0;
        let mut dest = BytesMut::new();

        while idx < self.parts.len() {
            let part = &self.parts[idx];

            if owed <= 0 {
                if part.len() - pos >= LENGTH_SIZE {
                    owed = decode_length(&[part[pos], part[pos + 1], part[pos + 2]]);
                    pos += LENGTH_SIZE;
                }

                // Zero or negative length is a protocol violation: stop
                // walking, deliver nothing further from this group.
                if owed <= 0 {
                    break;
                }

                dest = BytesMut::with_capacity(owed as usize);
            }

            let available = part.len() - pos;
            let take = available.min(owed as usize);
            dest.extend_from_slice(&part[pos..pos + take]);
            pos += take;

            // A remainder below one length prefix is carried by advancing
            // the buffer pointer, never by reading a prefix split across
            // buffers.
            if part.len() - pos < LENGTH_SIZE {
                idx += 1;
                pos = 0;
            }

            owed -= take as i32;
            if owed <= 0 {
                frames.push(std::mem::take(&mut dest).freeze());
            }
        }

        frames
    }
}
