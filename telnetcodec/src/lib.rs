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

//! # Linewise Telnet Protocol Layer
//!
//! This crate turns a raw Telnet byte stream into application data and back. It is split into
//! two layers:
//!
//! - [`TelnetCodec`], a byte-at-a-time `tokio_util::codec` [`Decoder`](tokio_util::codec::Decoder)
//!   and [`Encoder`](tokio_util::codec::Encoder) that strips IAC framing and runs option
//!   negotiation through the RFC 1143 Q-method.
//! - [`TelnetSession`], an implementation of the [`ProtocolSession`] trait that wraps a codec and
//!   an output [`Compressor`](linewise_compress::Compressor). The session batches decoded bytes,
//!   queues negotiation replies, translates outgoing text to NVT line endings and switches the
//!   output to MCCP2 on request.
//!
//! ## Usage Example
//!
//! ```rust
//! use linewise_telnetcodec::{
//!     Disposition, OptionSupport, ProtocolSession, SessionEvent, TelnetOption, TelnetSession,
//! };
//!
//! let mut session = TelnetSession::new(&[OptionSupport::new(TelnetOption::Compress2, true, true)]);
//!
//! // Offer MCCP2; the returned event carries IAC WILL COMPRESS2 for the wire.
//! let offer = session.negotiate(Disposition::Will, TelnetOption::Compress2);
//! assert!(matches!(offer.as_slice(), [SessionEvent::Send(_)]));
//!
//! // Peer agrees, then types a line.
//! let events = session.feed(b"\xFF\xFD\x56hello\r\n");
//! assert_eq!(
//!     events[0],
//!     SessionEvent::Negotiation(Disposition::Do, TelnetOption::Compress2)
//! );
//! assert!(matches!(&events[1], SessionEvent::Data(bytes) if &bytes[..] == b"hello\r\n"));
//! ```
//!
//! ## Protocol Details
//!
//! All Telnet commands start with the IAC (Interpret As Command) byte (0xFF):
//!
//! - 2-byte commands: `IAC <command>` (e.g., `IAC NOP`)
//! - 3-byte negotiation: `IAC <DO|DONT|WILL|WONT> <option>`
//! - Subnegotiation: `IAC SB <option> <data...> IAC SE`
//!
//! A literal 0xFF in the data stream is sent as `IAC IAC`.
//!
//! ## Related RFCs
//!
//! - RFC 854: Telnet Protocol Specification
//! - RFC 855: Telnet Option Specifications
//! - RFC 1143: The Q Method of Implementing TELNET Option Negotiation

#![warn(
    clippy::cargo,
    missing_docs,
    clippy::pedantic,
    future_incompatible,
    rust_2018_idioms
)]
#![allow(
    clippy::option_if_let_else,
    clippy::module_name_repetitions,
    clippy::missing_errors_doc
)]

mod codec;
mod consts;
mod event;
mod frame;
mod options;
mod result;
mod session;

pub use self::codec::{MAX_SUBNEGOTIATION, TelnetCodec};
pub use self::event::TelnetEvent;
pub use self::frame::TelnetFrame;
pub use self::options::{OptionSupport, TelnetOption, TelnetOptions, TelnetSide};
pub use self::result::{CodecError, CodecResult};
pub use self::session::{Disposition, ProtocolSession, SessionEvent, TelnetSession};
