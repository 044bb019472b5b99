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

//! Glue between the protocol layer and the application
//!
//! Bytes read from a socket are fed to the session's protocol layer. The events
//! it answers with are acted on in order: decoded data goes through line
//! reassembly to the handler, wire bytes go out, a compression request starts
//! MCCP2 and an error ends the session.

use crate::handler::{SessionContext, SessionHandler};
use crate::session::Session;
use crate::table::ConnectionTable;
use crate::types::{DisconnectReason, SlotId};
use linewise_telnetcodec::{Disposition, SessionEvent, TelnetOption};
use metrics::counter;
use tracing::{debug, trace, warn};

/// Feed bytes read from `slot`'s socket into its protocol layer.
pub fn receive<H: SessionHandler>(
    table: &mut ConnectionTable<Session>,
    handler: &mut H,
    slot: SlotId,
    input: &[u8],
) {
    let Some(session) = table.get_mut(slot) else {
        return;
    };
    counter!("linewise.bytes.received").increment(input.len() as u64);
    trace!(%slot, len = input.len(), "Received bytes");
    let events = session.protocol_mut().feed(input);
    dispatch(table, handler, slot, events);
}

/// Act on protocol events for `slot`, stopping once the session is closing.
pub fn dispatch<H: SessionHandler>(
    table: &mut ConnectionTable<Session>,
    handler: &mut H,
    slot: SlotId,
    events: Vec<SessionEvent>,
) {
    for event in events {
        let Some(session) = table.get_mut(slot) else {
            return;
        };
        if session.is_closing() {
            return;
        }
        match event {
            SessionEvent::Data(bytes) => deliver(table, handler, slot, &bytes),
            SessionEvent::Send(bytes) => session.send_raw(&bytes),
            SessionEvent::Negotiation(Disposition::Do, TelnetOption::Compress2) => {
                debug!(%slot, "Peer accepted MCCP2");
                let events = session.protocol_mut().begin_compression();
                dispatch(table, handler, slot, events);
            }
            SessionEvent::Negotiation(disposition, option) => {
                debug!(%slot, %disposition, %option, "Negotiation settled");
            }
            SessionEvent::Error(err) => {
                warn!(%slot, error = %err, "Protocol error");
                session.mark_closing(DisconnectReason::ProtocolError);
            }
        }
    }
}

/// Run decoded bytes through `slot`'s line buffer, handing each line to `handler`.
pub fn deliver<H: SessionHandler>(
    table: &mut ConnectionTable<Session>,
    handler: &mut H,
    slot: SlotId,
    bytes: &[u8],
) {
    for &byte in bytes {
        let Some(session) = table.get_mut(slot) else {
            return;
        };
        if session.is_closing() {
            return;
        }
        let Some(line) = session.line_mut().push(byte) else {
            continue;
        };
        let overflow = line.overflow;
        let text = String::from_utf8_lossy(line.bytes).into_owned();

        counter!("linewise.lines.received").increment(1);
        if overflow > 0 {
            counter!("linewise.lines.overflowed").increment(1);
            debug!(%slot, overflow, "Line overflowed");
        }
        let mut ctx = SessionContext::new(table);
        handler.on_line(&mut ctx, slot, &text, overflow);
    }
}
