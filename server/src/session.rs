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

//! Server-side state for one connected peer

use crate::linebuffer::LineBuffer;
use crate::table::Named;
use crate::transport::{WriteOutcome, write_nonblocking};
use crate::types::DisconnectReason;
use bytes::{Buf, BytesMut};
use linewise_telnetcodec::{Disposition, ProtocolSession, SessionEvent, TelnetOption};
use metrics::counter;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tracing::{debug, trace, warn};

/// One active connection.
///
/// A session owns its socket and protocol layer outright; dropping it closes
/// the connection. Output that the socket cannot take right away is kept in an
/// ordered backlog and flushed when the socket becomes writable again.
pub struct Session {
    stream: TcpStream,
    peer_addr: SocketAddr,
    protocol: Box<dyn ProtocolSession>,
    name: Option<String>,
    line: LineBuffer,
    outbound: BytesMut,
    max_pending_output: usize,
    closing: Option<DisconnectReason>,
    connected_at: Instant,
}

impl Session {
    /// Wrap an accepted stream.
    pub fn new(
        stream: TcpStream,
        peer_addr: SocketAddr,
        protocol: Box<dyn ProtocolSession>,
        line_capacity: usize,
        max_pending_output: usize,
    ) -> Self {
        Self {
            stream,
            peer_addr,
            protocol,
            name: None,
            line: LineBuffer::new(line_capacity),
            outbound: BytesMut::new(),
            max_pending_output,
            closing: None,
            connected_at: Instant::now(),
        }
    }

    /// Remote address
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Chosen display name
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Record the display name. Uniqueness is the caller's concern.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    /// How long the session has been connected
    pub fn connected_for(&self) -> Duration {
        self.connected_at.elapsed()
    }

    /// Whether the protocol layer is compressing output.
    pub fn is_compressing(&self) -> bool {
        self.protocol.is_compressing()
    }

    /// Bytes waiting for the socket to become writable.
    pub fn pending_output(&self) -> usize {
        self.outbound.len()
    }

    /// Whether anything is waiting for the socket to become writable.
    pub fn has_backlog(&self) -> bool {
        !self.outbound.is_empty()
    }

    /// Reason the session is being torn down, if it is.
    pub fn closing(&self) -> Option<DisconnectReason> {
        self.closing
    }

    /// Whether teardown has been requested.
    pub fn is_closing(&self) -> bool {
        self.closing.is_some()
    }

    /// Request teardown. The first reason given sticks.
    pub fn mark_closing(&mut self, reason: DisconnectReason) {
        if self.closing.is_none() {
            debug!(peer_addr = %self.peer_addr, %reason, "Session marked for teardown");
            self.closing = Some(reason);
        }
    }

    /// Send application text through the protocol layer.
    pub fn print(&mut self, text: &str) {
        let events = self.protocol.send_text(text);
        self.apply_output(events);
    }

    /// Start an option negotiation from our side.
    pub fn negotiate(&mut self, disposition: Disposition, option: TelnetOption) {
        let events = self.protocol.negotiate(disposition, option);
        self.apply_output(events);
    }

    /// Act on events produced by an output-side protocol call.
    pub fn apply_output(&mut self, events: Vec<SessionEvent>) {
        for event in events {
            match event {
                SessionEvent::Send(bytes) => self.send_raw(&bytes),
                SessionEvent::Error(err) => {
                    warn!(peer_addr = %self.peer_addr, error = %err, "Protocol output failed");
                    self.mark_closing(DisconnectReason::ProtocolError);
                }
                other => trace!(event = ?other, "Ignoring inbound event on output path"),
            }
        }
    }

    /// Write wire bytes, queueing whatever the socket does not take now.
    pub fn send_raw(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        if self.has_backlog() {
            // Earlier bytes are still waiting; keep the order.
            self.enqueue(bytes);
            return;
        }
        let outcome = write_nonblocking(&self.stream, bytes);
        counter!("linewise.bytes.sent").increment(outcome.written(bytes.len()) as u64);
        if let WriteOutcome::Blocked(written) = outcome {
            self.enqueue(&bytes[written..]);
        }
    }

    /// Write as much of the backlog as the socket takes.
    pub fn flush_pending(&mut self) {
        if self.outbound.is_empty() {
            return;
        }
        let outcome = write_nonblocking(&self.stream, &self.outbound);
        let written = outcome.written(self.outbound.len());
        counter!("linewise.bytes.sent").increment(written as u64);
        match outcome {
            WriteOutcome::Blocked(_) => self.outbound.advance(written),
            WriteOutcome::Complete | WriteOutcome::Abandoned(_) => self.outbound.clear(),
        }
    }

    fn enqueue(&mut self, bytes: &[u8]) {
        if self.outbound.len() + bytes.len() > self.max_pending_output {
            warn!(
                peer_addr = %self.peer_addr,
                pending = self.outbound.len(),
                limit = self.max_pending_output,
                "Output backlog exceeded"
            );
            self.outbound.clear();
            self.mark_closing(DisconnectReason::Backlog);
            return;
        }
        self.outbound.extend_from_slice(bytes);
    }

    pub(crate) fn stream(&self) -> &TcpStream {
        &self.stream
    }

    pub(crate) fn protocol_mut(&mut self) -> &mut dyn ProtocolSession {
        self.protocol.as_mut()
    }

    pub(crate) fn line_mut(&mut self) -> &mut LineBuffer {
        &mut self.line
    }
}

impl Named for Session {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("peer_addr", &self.peer_addr)
            .field("name", &self.name)
            .field("buffered", &self.line.len())
            .field("pending_output", &self.outbound.len())
            .field("closing", &self.closing)
            .finish_non_exhaustive()
    }
}
