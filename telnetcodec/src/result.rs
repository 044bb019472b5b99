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

/// Result Type for Codec Operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Represents possible errors that can occur in the codec handling process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// An I/O error occurred, typically inside the output compressor.
    IOError {
        /// The kind of I/O error that occurred
        kind: std::io::ErrorKind,
        /// Description of the operation that failed
        operation: String,
    },

    /// A frame reached the negotiation state machine that it cannot act on.
    NegotiationError {
        /// Description of what went wrong during negotiation
        reason: String,
        /// The frame type that caused the error, if available
        frame_type: Option<String>,
    },

    /// A subnegotiation payload grew past the configured limit before `IAC SE`.
    SubnegotiationOverflow {
        /// The telnet option being subnegotiated
        option: u8,
        /// Maximum accepted payload length
        limit: usize,
    },
}

impl std::error::Error for CodecError {}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecError::IOError { kind, operation } => {
                write!(f, "I/O error during {operation}: {kind:?}")
            }
            CodecError::NegotiationError { reason, frame_type } => {
                if let Some(ft) = frame_type {
                    write!(f, "Negotiation error ({ft}): {reason}")
                } else {
                    write!(f, "Negotiation error: {reason}")
                }
            }
            CodecError::SubnegotiationOverflow { option, limit } => {
                write!(
                    f,
                    "Subnegotiation for option {option} exceeded {limit} bytes"
                )
            }
        }
    }
}

impl From<std::io::Error> for CodecError {
    fn from(err: std::io::Error) -> Self {
        CodecError::IOError {
            kind: err.kind(),
            operation: err.to_string(),
        }
    }
}
