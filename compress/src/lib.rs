//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! # Switchable Output Compression
//!
//! This crate provides [`Compressor`], a synchronous, buffer-to-buffer compressor for
//! outbound Telnet traffic. It starts in pass-through mode and can be switched to a
//! deflate-family algorithm at any point in the stream, which is exactly what the
//! MUD Client Compression Protocol (MCCP2, telnet option 86) requires: everything the
//! server sends after `IAC SB COMPRESS2 IAC SE` is one continuous zlib stream.
//!
//! Every call to [`Compressor::compress`] ends with a sync flush, so the peer can
//! decode each chunk as soon as it arrives without waiting for the stream to close.
//!
//! ```rust
//! use bytes::BytesMut;
//! use linewise_compress::{Algorithm, Compressor};
//!
//! # fn example() -> std::io::Result<()> {
//! let mut compressor = Compressor::new(Algorithm::None);
//! let mut out = BytesMut::new();
//!
//! compressor.compress(b"plain", &mut out)?;
//! assert_eq!(&out[..], b"plain");
//!
//! compressor.switch_algorithm(Algorithm::Zlib, &mut out)?;
//! compressor.compress(b"compressed from here on", &mut out)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Algorithm Switching
//!
//! Switching away from a compressing algorithm finishes the current stream (writing the
//! zlib trailer into the output buffer) before the new one begins, so the bytes on the
//! wire are always a sequence of complete, independently decodable segments.

use bytes::BytesMut;
use flate2::{Compress, Compression, FlushCompress, Status};
use std::io;
use tracing::trace;

/// Scratch size for a single deflate call.
const CHUNK_SIZE: usize = 4096;

/// Compression algorithms supported by [`Compressor`].
///
/// - **`Algorithm::None`**: pass-through
/// - **`Algorithm::Deflate`**: raw DEFLATE, no header or trailer
/// - **`Algorithm::Zlib`**: DEFLATE with the zlib wrapper (MCCP2)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// No compression
    None,
    /// Raw DEFLATE
    Deflate,
    /// Zlib-wrapped DEFLATE
    Zlib,
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Algorithm::None => write!(f, "none"),
            Algorithm::Deflate => write!(f, "deflate"),
            Algorithm::Zlib => write!(f, "zlib"),
        }
    }
}

/// Outbound compressor with runtime algorithm switching.
pub struct Compressor {
    algorithm: Algorithm,
    level: Compression,
    engine: Option<Compress>,
}

impl Compressor {
    /// Create a compressor using the default compression level.
    pub fn new(algorithm: Algorithm) -> Self {
        Self::with_level(algorithm, Compression::default())
    }

    /// Create a compressor with an explicit compression level.
    pub fn with_level(algorithm: Algorithm, level: Compression) -> Self {
        Self {
            algorithm,
            level,
            engine: engine_for(algorithm, level),
        }
    }

    /// Algorithm currently applied to [`Compressor::compress`] input.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Whether output is currently being compressed.
    pub fn is_active(&self) -> bool {
        self.engine.is_some()
    }

    /// Total uncompressed bytes consumed by the current stream.
    pub fn total_in(&self) -> u64 {
        self.engine.as_ref().map_or(0, Compress::total_in)
    }

    /// Total compressed bytes produced by the current stream.
    pub fn total_out(&self) -> u64 {
        self.engine.as_ref().map_or(0, Compress::total_out)
    }

    /// Change algorithm mid-stream.
    ///
    /// A running compressed stream is finished into `dst` first. Switching to the
    /// algorithm already in use is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the deflate engine fails while finishing the old stream.
    pub fn switch_algorithm(&mut self, algorithm: Algorithm, dst: &mut BytesMut) -> io::Result<()> {
        if algorithm == self.algorithm {
            return Ok(());
        }
        if let Some(engine) = self.engine.as_mut() {
            drain(engine, &[], dst, FlushCompress::Finish)?;
        }
        trace!(from = %self.algorithm, to = %algorithm, "Switching compression algorithm");
        self.algorithm = algorithm;
        self.engine = engine_for(algorithm, self.level);
        Ok(())
    }

    /// Append `input` to `dst`, compressed with the current algorithm and sync flushed.
    ///
    /// # Errors
    ///
    /// Returns an error if the deflate engine reports a failure.
    pub fn compress(&mut self, input: &[u8], dst: &mut BytesMut) -> io::Result<()> {
        match self.engine.as_mut() {
            None => {
                dst.extend_from_slice(input);
                Ok(())
            }
            Some(engine) => drain(engine, input, dst, FlushCompress::Sync),
        }
    }
}

impl std::fmt::Debug for Compressor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compressor")
            .field("algorithm", &self.algorithm)
            .field("total_in", &self.total_in())
            .field("total_out", &self.total_out())
            .finish()
    }
}

fn engine_for(algorithm: Algorithm, level: Compression) -> Option<Compress> {
    match algorithm {
        Algorithm::None => None,
        Algorithm::Deflate => Some(Compress::new(level, false)),
        Algorithm::Zlib => Some(Compress::new(level, true)),
    }
}

/// Run `input` through `engine` with `flush`, appending everything produced to `dst`.
fn drain(
    engine: &mut Compress,
    mut input: &[u8],
    dst: &mut BytesMut,
    flush: FlushCompress,
) -> io::Result<()> {
    let mut chunk = [0u8; CHUNK_SIZE];
    loop {
        let before_in = engine.total_in();
        let before_out = engine.total_out();
        let status = engine
            .compress(input, &mut chunk, flush)
            .map_err(io::Error::other)?;
        let consumed = usize::try_from(engine.total_in() - before_in).map_err(io::Error::other)?;
        let produced = usize::try_from(engine.total_out() - before_out).map_err(io::Error::other)?;

        dst.extend_from_slice(&chunk[..produced]);
        input = &input[consumed..];

        match status {
            Status::StreamEnd => return Ok(()),
            Status::BufError if consumed == 0 && produced == 0 => return Ok(()),
            _ if input.is_empty() && produced < chunk.len() && flush != FlushCompress::Finish => {
                return Ok(());
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{Decompress, FlushDecompress};

    fn inflate(data: &[u8], zlib_header: bool) -> Vec<u8> {
        let mut decompress = Decompress::new(zlib_header);
        let mut out = Vec::with_capacity(256 * 1024);
        decompress
            .decompress_vec(data, &mut out, FlushDecompress::Sync)
            .unwrap();
        out
    }

    #[test]
    fn none_is_pass_through() {
        let mut compressor = Compressor::new(Algorithm::None);
        let mut out = BytesMut::new();
        compressor.compress(b"Enter name: ", &mut out).unwrap();
        assert_eq!(&out[..], b"Enter name: ");
        assert!(!compressor.is_active());
        assert_eq!(compressor.total_in(), 0);
    }

    #[test]
    fn zlib_chunks_decode_after_each_sync_flush() {
        let mut compressor = Compressor::new(Algorithm::Zlib);
        let mut out = BytesMut::new();
        compressor.compress(b"Welcome, alice!\r\n", &mut out).unwrap();
        assert_eq!(&out[out.len() - 4..], &[0x00, 0x00, 0xFF, 0xFF], "sync flush marker");
        assert_eq!(inflate(&out, true), b"Welcome, alice!\r\n");

        let first = out.len();
        compressor.compress(b"bob: \"hi\"\r\n", &mut out).unwrap();
        assert!(out.len() > first);
        assert_eq!(inflate(&out, true), b"Welcome, alice!\r\nbob: \"hi\"\r\n");
        assert_eq!(compressor.total_in(), 28);
    }

    #[test]
    fn switch_from_none_keeps_earlier_bytes_plain() {
        let mut compressor = Compressor::new(Algorithm::None);
        let mut out = BytesMut::new();
        compressor.compress(b"plain", &mut out).unwrap();
        compressor.switch_algorithm(Algorithm::Zlib, &mut out).unwrap();
        assert_eq!(&out[..], b"plain");
        compressor.compress(b"packed", &mut out).unwrap();
        assert_eq!(&out[..5], b"plain");
        assert_eq!(inflate(&out[5..], true), b"packed");
    }

    #[test]
    fn switch_back_to_none_finishes_stream() {
        let mut compressor = Compressor::new(Algorithm::Deflate);
        let mut out = BytesMut::new();
        compressor.compress(b"raw deflate", &mut out).unwrap();
        compressor.switch_algorithm(Algorithm::None, &mut out).unwrap();
        let compressed_len = out.len();
        compressor.compress(b"tail", &mut out).unwrap();
        assert_eq!(&out[compressed_len..], b"tail");
        assert_eq!(inflate(&out[..compressed_len], false), b"raw deflate");
        assert_eq!(compressor.algorithm(), Algorithm::None);
    }

    #[test]
    fn large_input_spans_multiple_chunks() {
        let input: Vec<u8> = (0..64 * 1024u32).map(|i| (i * 7919 % 251) as u8).collect();
        let mut compressor = Compressor::new(Algorithm::Zlib);
        let mut out = BytesMut::new();
        compressor.compress(&input, &mut out).unwrap();
        assert_eq!(inflate(&out, true), input);
    }
}
