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

//! Handler trait and the context it works through

use crate::session::Session;
use crate::table::ConnectionTable;
use crate::types::{DisconnectReason, SlotId};
use std::net::SocketAddr;

/// Application logic driven by the server loop.
///
/// Hooks run inline on the loop, so they must not block. Everything a hook may
/// do to sessions goes through the [`SessionContext`] it is handed.
///
/// # Example
///
/// ```no_run
/// use linewise_server::{SessionContext, SessionHandler, SlotId};
///
/// struct Echo;
///
/// impl SessionHandler for Echo {
///     fn on_line(&mut self, ctx: &mut SessionContext<'_>, slot: SlotId, line: &str, _overflow: usize) {
///         ctx.send(slot, &format!("{line}\n"));
///     }
/// }
/// ```
pub trait SessionHandler: Send + 'static {
    /// Called once a new session holds its slot
    fn on_connect(&mut self, _ctx: &mut SessionContext<'_>, _slot: SlotId) {}

    /// Called for every completed line
    ///
    /// `overflow` is non-zero when the line was cut short because it did not
    /// fit the line buffer; the remainder arrives as a following line.
    fn on_line(&mut self, ctx: &mut SessionContext<'_>, slot: SlotId, line: &str, overflow: usize);

    /// Called before a session is removed
    ///
    /// The departing session is still in the table, so its name can be read.
    fn on_disconnect(
        &mut self,
        _ctx: &mut SessionContext<'_>,
        _slot: SlotId,
        _reason: DisconnectReason,
    ) {
    }
}

/// Handler-side view of the connection table.
pub struct SessionContext<'a> {
    table: &'a mut ConnectionTable<Session>,
}

impl<'a> SessionContext<'a> {
    pub(crate) fn new(table: &'a mut ConnectionTable<Session>) -> Self {
        Self { table }
    }

    /// Display name of `slot`, if it has logged in.
    pub fn name(&self, slot: SlotId) -> Option<&str> {
        self.table.get(slot)?.name()
    }

    /// Record the display name of `slot`.
    pub fn set_name(&mut self, slot: SlotId, name: impl Into<String>) {
        if let Some(session) = self.table.get_mut(slot) {
            session.set_name(name);
        }
    }

    /// Slot of the session named `name`.
    pub fn find_by_name(&self, name: &str) -> Option<SlotId> {
        self.table.find_by_name(name)
    }

    /// Remote address of `slot`.
    pub fn peer_addr(&self, slot: SlotId) -> Option<SocketAddr> {
        self.table.get(slot).map(Session::peer_addr)
    }

    /// Names of every logged-in session in table order.
    pub fn names(&self) -> Vec<String> {
        self.table
            .iter()
            .filter_map(|(_, session)| session.name().map(str::to_owned))
            .collect()
    }

    /// Number of active sessions, logged in or not.
    pub fn active_count(&self) -> usize {
        self.table.len()
    }

    /// Send text to one session.
    pub fn send(&mut self, slot: SlotId, text: &str) {
        if let Some(session) = self.table.get_mut(slot) {
            session.print(text);
        }
    }

    /// Send `{name}: "{text}"` to every other logged-in session.
    ///
    /// Does nothing if `from` has no name.
    pub fn message(&mut self, from: SlotId, text: &str) {
        let Some(name) = self.name(from) else {
            return;
        };
        let line = format!("{name}: \"{text}\"\n");
        let targets: Vec<SlotId> = self
            .table
            .iter()
            .filter(|(slot, session)| {
                *slot != from && session.name().is_some() && !session.is_closing()
            })
            .map(|(slot, _)| slot)
            .collect();
        for slot in targets {
            self.send(slot, &line);
        }
    }

    /// Tear `slot` down once the current event has been handled.
    pub fn disconnect(&mut self, slot: SlotId, reason: DisconnectReason) {
        if let Some(session) = self.table.get_mut(slot) {
            session.mark_closing(reason);
        }
    }
}
