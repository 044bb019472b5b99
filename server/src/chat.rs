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

//! Multi-user chat
//!
//! A new session is asked for a name. Once it has a unique one, every line it
//! sends goes to all other logged-in users, except for a handful of commands:
//!
//! - `quit` or `/quit` ends the session
//! - `/msg <name> <text>` whispers to one user
//! - `/who` lists who is logged in

use crate::handler::{SessionContext, SessionHandler};
use crate::types::{DisconnectReason, SlotId};
use tracing::info;

/// Longest accepted display name, in characters.
pub const MAX_NAME_LENGTH: usize = 32;

const PROMPT: &str = "Enter name: ";
const INVALID_NAME: &str = "Invalid name. Enter name: ";
const NAME_IN_USE: &str = "Name already in use. Enter name: ";
const TRUNCATED: &str = "Line too long, truncated.\n";

/// [`SessionHandler`] implementing login and chat.
#[derive(Debug, Clone)]
pub struct ChatHandler {
    announce_departures: bool,
}

impl ChatHandler {
    /// Create a chat handler. `announce_departures` controls whether the
    /// remaining users are told when someone leaves.
    pub fn new(announce_departures: bool) -> Self {
        Self {
            announce_departures,
        }
    }

    fn login(ctx: &mut SessionContext<'_>, slot: SlotId, name: &str) {
        if name.is_empty() || name.chars().count() > MAX_NAME_LENGTH {
            ctx.send(slot, INVALID_NAME);
        } else if ctx.find_by_name(name).is_some() {
            ctx.send(slot, NAME_IN_USE);
        } else {
            info!(%slot, name, "User logged in");
            ctx.set_name(slot, name);
            ctx.send(slot, &format!("Welcome, {name}!\n"));
        }
    }

    fn whisper(ctx: &mut SessionContext<'_>, slot: SlotId, args: &str) {
        let (target, text) = args.split_once(' ').unwrap_or((args, ""));
        match ctx.find_by_name(target) {
            Some(to) => {
                let from = ctx.name(slot).unwrap_or_default().to_owned();
                ctx.send(to, &format!("{from} whispers: \"{text}\"\n"));
            }
            None => ctx.send(slot, &format!("No such user: {target}\n")),
        }
    }

    fn who(ctx: &mut SessionContext<'_>, slot: SlotId) {
        let names = ctx.names();
        ctx.send(slot, &format!("Users online: {}\n", names.join(", ")));
    }
}

impl Default for ChatHandler {
    fn default() -> Self {
        Self::new(true)
    }
}

impl SessionHandler for ChatHandler {
    fn on_connect(&mut self, ctx: &mut SessionContext<'_>, slot: SlotId) {
        ctx.send(slot, PROMPT);
    }

    fn on_line(&mut self, ctx: &mut SessionContext<'_>, slot: SlotId, line: &str, overflow: usize) {
        if overflow > 0 {
            ctx.send(slot, TRUNCATED);
        }
        if ctx.name(slot).is_none() {
            Self::login(ctx, slot, line);
            return;
        }
        match line {
            "" => {}
            "quit" | "/quit" => ctx.disconnect(slot, DisconnectReason::Quit),
            "/who" => Self::who(ctx, slot),
            _ => match line.strip_prefix("/msg ") {
                Some(args) => Self::whisper(ctx, slot, args),
                None => ctx.message(slot, line),
            },
        }
    }

    fn on_disconnect(&mut self, ctx: &mut SessionContext<'_>, slot: SlotId, reason: DisconnectReason) {
        if self.announce_departures {
            ctx.message(slot, reason.announcement());
        }
    }
}
