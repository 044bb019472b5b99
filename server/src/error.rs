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

//! Error types for the line server

use crate::types::SlotId;
use std::net::SocketAddr;
use thiserror::Error;

/// Result type for server operations
pub type Result<T> = std::result::Result<T, ServerError>;

/// Server error types
///
/// Connection-level trouble (peer resets, protocol errors, a full table) never
/// surfaces here; it is handled by tearing down or rejecting the one session.
/// Everything that does reach this type ends [`TelnetServer::run`](crate::TelnetServer::run).
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listening socket could not be set up
    #[error("Failed to listen on {address}: {source}")]
    Bind {
        /// Address that was requested
        address: SocketAddr,
        /// Underlying failure
        #[source]
        source: std::io::Error,
    },

    /// Waiting for socket readiness failed
    #[error("Poll failed: {0}")]
    Poll(#[source] std::io::Error),

    /// A session socket failed in a way that is not a disconnect
    #[error("Read on {slot} failed: {source}")]
    Read {
        /// Slot whose socket failed
        slot: SlotId,
        /// Underlying failure
        #[source]
        source: std::io::Error,
    },

    /// Configuration rejected by [`ServerConfig::validate`](crate::ServerConfig::validate)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error outside the categories above
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// Check if the error stops the server loop
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ServerError::InvalidConfig(_))
    }

    /// Check if the error comes from configuration
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, ServerError::InvalidConfig(_) | ServerError::Bind { .. })
    }
}
