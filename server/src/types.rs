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

//! Core types for the line server

use std::fmt;

/// Position of a session in the connection table.
///
/// Slot ids are reused: once a session is torn down its slot goes back to the
/// pool and the next accepted connection may land in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(usize);

impl SlotId {
    /// Create a slot id
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    /// Index into the table
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot-{}", self.0)
    }
}

/// Why a session is being torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisconnectReason {
    /// Peer closed or reset the connection
    Closed,
    /// The protocol session reported an unrecoverable error
    ProtocolError,
    /// The application ended the session
    Quit,
    /// Output could not be delivered fast enough
    Backlog,
}

impl DisconnectReason {
    /// Text shown to the remaining users when a named session leaves.
    pub fn announcement(self) -> &'static str {
        match self {
            DisconnectReason::Closed | DisconnectReason::Backlog => "** HAS DISCONNECTED **",
            DisconnectReason::ProtocolError => "** HAS HAD AN ERROR **",
            DisconnectReason::Quit => "** HAS QUIT **",
        }
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectReason::Closed => write!(f, "closed"),
            DisconnectReason::ProtocolError => write!(f, "protocol error"),
            DisconnectReason::Quit => write!(f, "quit"),
            DisconnectReason::Backlog => write!(f, "output backlog"),
        }
    }
}
