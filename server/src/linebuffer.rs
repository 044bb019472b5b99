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

//! Line reassembly
//!
//! [`LineBuffer`] turns the decoded byte stream of one session into lines. It
//! knows nothing about sockets or the protocol layer; bytes go in one at a time
//! and a [`Line`] comes out whenever one is complete.
//!
//! Terminators follow the Telnet NVT convention:
//!
//! - `CR LF` ends a line. The `CR` is not part of the line.
//! - `CR NUL` is an escaped bare carriage return. The `NUL` is dropped and the
//!   `CR` stays in the buffer.
//!
//! When a line does not fit, the buffer is delivered early with a non-zero
//! [`Line::overflow`] count and reassembly starts over.

const CR: u8 = b'\r';
const LF: u8 = b'\n';
const NUL: u8 = 0;

/// Smallest usable capacity: one content byte plus the slot given up on overflow.
pub const MIN_CAPACITY: usize = 2;

/// A completed line, borrowed from the buffer that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    /// Line content without the terminator
    pub bytes: &'a [u8],
    /// Number of input bytes discarded to produce this line, zero for a normal line
    pub overflow: usize,
}

impl Line<'_> {
    /// Whether this line was cut short.
    pub fn is_truncated(&self) -> bool {
        self.overflow > 0
    }
}

/// Fixed-capacity line reassembly state for one session.
#[derive(Debug, Clone)]
pub struct LineBuffer {
    buffer: Box<[u8]>,
    position: usize,
}

impl LineBuffer {
    /// Create an empty buffer. Capacities below [`MIN_CAPACITY`] are raised to it.
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0; capacity.max(MIN_CAPACITY)].into_boxed_slice(),
            position: 0,
        }
    }

    /// Maximum number of buffered bytes.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Number of bytes currently buffered.
    pub fn len(&self) -> usize {
        self.position
    }

    /// Whether nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.position == 0
    }

    /// Bytes buffered so far.
    pub fn pending(&self) -> &[u8] {
        &self.buffer[..self.position]
    }

    /// Discard any partial line.
    pub fn clear(&mut self) {
        self.position = 0;
    }

    /// Feed one byte, returning a line if this byte completed one.
    ///
    /// ```
    /// use linewise_server::LineBuffer;
    ///
    /// let mut buffer = LineBuffer::new(16);
    /// let mut lines = Vec::new();
    /// for &byte in b"hi\r\n" {
    ///     if let Some(line) = buffer.push(byte) {
    ///         lines.push(line.bytes.to_vec());
    ///     }
    /// }
    /// assert_eq!(lines, vec![b"hi".to_vec()]);
    /// ```
    pub fn push(&mut self, byte: u8) -> Option<Line<'_>> {
        let after_cr = self.position > 0 && self.buffer[self.position - 1] == CR;
        match byte {
            LF if after_cr => {
                let end = self.position - 1;
                self.position = 0;
                Some(Line {
                    bytes: &self.buffer[..end],
                    overflow: 0,
                })
            }
            NUL if after_cr => None,
            _ if self.position < self.buffer.len() => {
                self.buffer[self.position] = byte;
                self.position += 1;
                None
            }
            _ => {
                // Give up the last slot and the incoming byte.
                let end = self.buffer.len() - 1;
                self.position = 0;
                Some(Line {
                    bytes: &self.buffer[..end],
                    overflow: 2,
                })
            }
        }
    }
}
