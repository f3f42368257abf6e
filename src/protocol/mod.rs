//! Protocol module - wire format and frame extraction.
//!
//! This module implements the framing shared by both transports:
//! - 3-byte big-endian length prefix encoding/decoding
//! - Chunk reassembly for the stream transport
//! - The header/payload read cycle for the raw transport

mod assembler;
mod read_cycle;
mod wire_format;

pub use assembler::ChunkAssembler;
pub use read_cycle::{ReadCycle, Step};
pub use wire_format::{decode_length, encode_frame, encode_length, LENGTH_SIZE, MAX_PAYLOAD_SIZE};
