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

use super::TelnetOption;
use crate::options::TelnetSide;
use bytes::Bytes;

///
/// `TelnetEvent` represents decoded input from the Telnet codec.
/// Unlike `TelnetFrame`, negotiation verbs never surface directly; the decoder
/// reports `OptionStatus` when the Q-method state for an option changes.
///
#[derive(Clone, Debug, PartialEq)]
pub enum TelnetEvent {
    /// One byte of application data
    Data(u8),
    /// `IAC NOP`
    NoOperation,
    /// `IAC DM`, the Synch marker
    DataMark,
    /// `IAC BRK`
    Break,
    /// `IAC IP`
    InterruptProcess,
    /// `IAC AO`
    AbortOutput,
    /// `IAC AYT`
    AreYouThere,
    /// `IAC EC`
    EraseCharacter,
    /// `IAC EL`
    EraseLine,
    /// `IAC GA`
    GoAhead,
    /// `IAC EOR`, sent after a prompt by some peers
    EndOfRecord,
    /// An option changed state: (option, side, enabled)
    OptionStatus(TelnetOption, TelnetSide, bool),
    /// Completed subnegotiation payload, IAC escapes removed
    Subnegotiate(TelnetOption, Bytes),
}
