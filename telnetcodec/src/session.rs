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

//! Per-connection protocol session.
//!
//! A [`ProtocolSession`] sits between a socket and the line layer. Raw bytes
//! from the peer go in through [`ProtocolSession::feed`]; application text goes
//! out through [`ProtocolSession::send_text`]. Both directions answer with a
//! list of [`SessionEvent`]s that the caller acts on in order.

use crate::{CodecError, OptionSupport, TelnetCodec, TelnetEvent, TelnetFrame, TelnetOption, TelnetSide, consts};
use bytes::{BufMut, Bytes, BytesMut};
use linewise_compress::{Algorithm, Compressor};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, trace};

/// The four negotiation verbs, as seen from our side of the connection.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Disposition {
    /// We perform the option
    Will,
    /// We refuse to perform the option
    Wont,
    /// The peer performs the option
    Do,
    /// The peer must not perform the option
    Dont,
}

impl std::fmt::Display for Disposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Disposition::Will => write!(f, "WILL"),
            Disposition::Wont => write!(f, "WONT"),
            Disposition::Do => write!(f, "DO"),
            Disposition::Dont => write!(f, "DONT"),
        }
    }
}

/// Something the owner of a [`ProtocolSession`] has to act on.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    /// Application bytes received from the peer, protocol framing removed
    Data(Bytes),
    /// Bytes ready for the wire, already escaped and compressed as required
    Send(Bytes),
    /// An option settled into a new state.
    ///
    /// `Do`/`Dont` report our side switching on or off at the peer's request,
    /// `Will`/`Wont` report the peer's side.
    Negotiation(Disposition, TelnetOption),
    /// The protocol stream is unusable
    Error(CodecError),
}

/// Protocol layer for one connection.
///
/// Implementations are owned by exactly one connection and driven from the
/// server loop, so they only need to be [`Send`].
pub trait ProtocolSession: Send {
    /// Consume bytes read from the peer.
    fn feed(&mut self, input: &[u8]) -> Vec<SessionEvent>;

    /// Start a negotiation from our side.
    fn negotiate(&mut self, disposition: Disposition, option: TelnetOption) -> Vec<SessionEvent>;

    /// Announce MCCP2 and compress every later byte of output.
    fn begin_compression(&mut self) -> Vec<SessionEvent>;

    /// Whether output is currently compressed.
    fn is_compressing(&self) -> bool;

    /// Queue application text for the peer.
    ///
    /// Newlines go out as CR LF, a bare CR as CR NUL.
    fn send_text(&mut self, text: &str) -> Vec<SessionEvent>;
}

/// [`ProtocolSession`] speaking Telnet with optional MCCP2 output compression.
pub struct TelnetSession {
    codec: TelnetCodec,
    compressor: Compressor,
}

impl TelnetSession {
    /// Create a session advertising `support`.
    ///
    /// ```
    /// use linewise_telnetcodec::{OptionSupport, ProtocolSession, TelnetOption, TelnetSession};
    ///
    /// let session = TelnetSession::new(&[OptionSupport::new(TelnetOption::Compress2, true, true)]);
    /// assert!(!session.is_compressing());
    /// ```
    pub fn new(support: &[OptionSupport]) -> Self {
        TelnetSession {
            codec: TelnetCodec::with_support(support),
            compressor: Compressor::new(Algorithm::None),
        }
    }

    /// Underlying codec, for inspecting option state.
    pub fn codec(&self) -> &TelnetCodec {
        &self.codec
    }

    /// Push raw wire bytes through the compressor and emit them.
    fn transmit(&mut self, raw: &[u8], events: &mut Vec<SessionEvent>) {
        if raw.is_empty() {
            return;
        }
        let mut out = BytesMut::with_capacity(raw.len());
        match self.compressor.compress(raw, &mut out) {
            Ok(()) => events.push(SessionEvent::Send(out.freeze())),
            Err(err) => events.push(SessionEvent::Error(err.into())),
        }
    }

    fn transmit_frames(&mut self, frames: Vec<TelnetFrame>, events: &mut Vec<SessionEvent>) {
        let mut raw = BytesMut::new();
        for frame in frames {
            trace!(%frame, "Sending frame");
            if let Err(err) = self.codec.encode(frame, &mut raw) {
                events.push(SessionEvent::Error(err));
                return;
            }
        }
        self.transmit(&raw, events);
    }

    fn flush_responses(&mut self, events: &mut Vec<SessionEvent>) {
        if self.codec.has_pending_responses() {
            let responses = self.codec.take_responses();
            self.transmit_frames(responses, events);
        }
    }
}

fn flush_data(data: &mut BytesMut, events: &mut Vec<SessionEvent>) {
    if !data.is_empty() {
        events.push(SessionEvent::Data(data.split().freeze()));
    }
}

fn disposition_for(side: TelnetSide, enabled: bool) -> Disposition {
    match (side, enabled) {
        (TelnetSide::Local, true) => Disposition::Do,
        (TelnetSide::Local, false) => Disposition::Dont,
        (TelnetSide::Remote, true) => Disposition::Will,
        (TelnetSide::Remote, false) => Disposition::Wont,
    }
}

impl ProtocolSession for TelnetSession {
    fn feed(&mut self, input: &[u8]) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        let mut src = BytesMut::from(input);
        let mut data = BytesMut::with_capacity(input.len());

        loop {
            let decoded = self.codec.decode(&mut src);
            if let Ok(Some(TelnetEvent::Data(byte))) = decoded {
                // Replies queued while scanning ahead belong before this byte.
                if self.codec.has_pending_responses() {
                    flush_data(&mut data, &mut events);
                    self.flush_responses(&mut events);
                }
                data.put_u8(byte);
                continue;
            }

            flush_data(&mut data, &mut events);
            self.flush_responses(&mut events);
            match decoded {
                Ok(None) => break,
                Ok(Some(TelnetEvent::OptionStatus(option, side, enabled))) => {
                    let disposition = disposition_for(side, enabled);
                    debug!(%disposition, %option, "Option negotiated");
                    events.push(SessionEvent::Negotiation(disposition, option));
                }
                Ok(Some(TelnetEvent::Subnegotiate(option, payload))) => {
                    trace!(%option, len = payload.len(), "Ignoring subnegotiation");
                }
                Ok(Some(other)) => {
                    trace!(event = ?other, "Ignoring telnet command");
                }
                Err(err) => {
                    debug!(error = %err, "Telnet decode failed");
                    events.push(SessionEvent::Error(err));
                    break;
                }
            }
        }
        events
    }

    fn negotiate(&mut self, disposition: Disposition, option: TelnetOption) -> Vec<SessionEvent> {
        let request = match disposition {
            Disposition::Will => self.codec.enable_local(option),
            Disposition::Wont => self.codec.disable_local(option),
            Disposition::Do => self.codec.enable_remote(option),
            Disposition::Dont => self.codec.disable_remote(option),
        };
        let mut events = Vec::new();
        match request {
            Some(frame) => self.transmit_frames(vec![frame], &mut events),
            None => trace!(%disposition, %option, "Negotiation already settled"),
        }
        events
    }

    fn begin_compression(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if self.compressor.is_active() {
            return events;
        }
        // The start marker itself still travels uncompressed.
        self.transmit_frames(
            vec![TelnetFrame::Subnegotiate(TelnetOption::Compress2, Bytes::new())],
            &mut events,
        );
        let mut trailer = BytesMut::new();
        match self.compressor.switch_algorithm(Algorithm::Zlib, &mut trailer) {
            Ok(()) => debug!("MCCP2 compression started"),
            Err(err) => events.push(SessionEvent::Error(err.into())),
        }
        events
    }

    fn is_compressing(&self) -> bool {
        self.compressor.is_active()
    }

    fn send_text(&mut self, text: &str) -> Vec<SessionEvent> {
        let mut raw = BytesMut::with_capacity(text.len() + 8);
        let mut bytes = text.bytes().peekable();
        while let Some(byte) = bytes.next() {
            match byte {
                consts::LF => raw.put_slice(&[consts::CR, consts::LF]),
                consts::CR if bytes.peek() == Some(&consts::LF) => {
                    bytes.next();
                    raw.put_slice(&[consts::CR, consts::LF]);
                }
                consts::CR => raw.put_slice(&[consts::CR, consts::NUL]),
                _ => {
                    if let Err(err) = self.codec.encode(byte, &mut raw) {
                        return vec![SessionEvent::Error(err)];
                    }
                }
            }
        }
        let mut events = Vec::new();
        self.transmit(&raw, &mut events);
        events
    }
}

impl std::fmt::Debug for TelnetSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelnetSession")
            .field("compressor", &self.compressor)
            .finish_non_exhaustive()
    }
}
