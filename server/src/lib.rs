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

//! # Linewise Telnet Line Server
//!
//! A single-process, multi-user Telnet server. Every connection's input is
//! decoded by a protocol session, split into lines and handed to a
//! [`SessionHandler`]. The bundled [`ChatHandler`] implements a small chat room
//! with name login, broadcast, whispers and quit.
//!
//! # Architecture
//!
//! ```text
//! TelnetServer (accept + readiness loop)
//!     ↓
//! ConnectionTable<Session>
//!     ↓
//! adapter → ProtocolSession → LineBuffer → SessionHandler
//! ```
//!
//! Everything runs on one task. [`TelnetServer::poll_once`] waits a bounded
//! time for the listener or any session socket to become ready, then services
//! the listener first and the sessions in table order. Reads and writes never
//! wait: output the socket cannot take right away is kept in a per-session
//! backlog and flushed when the socket becomes writable.
//!
//! # Example
//!
//! ```no_run
//! use linewise_server::{ChatHandler, ServerConfig, TelnetServer};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::new("127.0.0.1:2323".parse()?).with_max_connections(32);
//!     let handler = ChatHandler::new(config.announce_departures);
//!     let mut server = TelnetServer::bind(config, handler).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod adapter;
mod chat;
mod config;
mod error;
mod handler;
mod linebuffer;
mod server;
mod session;
mod table;
pub mod transport;
mod types;

pub use self::chat::{ChatHandler, MAX_NAME_LENGTH};
pub use self::config::{Arguments, DEFAULT_TELNET_OPTIONS, ServerConfig};
pub use self::error::{Result, ServerError};
pub use self::handler::{SessionContext, SessionHandler};
pub use self::linebuffer::{Line, LineBuffer, MIN_CAPACITY};
pub use self::server::{ProtocolFactory, REJECT_MESSAGE, TelnetServer};
pub use self::session::Session;
pub use self::table::{ConnectionTable, Named};
pub use self::types::{DisconnectReason, SlotId};

// Re-export the protocol layer so handlers and custom factories need one dependency.
pub use linewise_telnetcodec::{
    CodecError, Disposition, OptionSupport, ProtocolSession, SessionEvent, TelnetOption,
    TelnetSession,
};
