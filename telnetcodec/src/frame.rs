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
use bytes::Bytes;

///
/// `TelnetFrame` is a single unit on the Telnet wire, as written by the encoder.
///
/// Negotiation verbs are kept as raw frames here; the decoder folds them into
/// [`crate::TelnetEvent::OptionStatus`] once the Q-method state machine settles.
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TelnetFrame {
    /// Single data byte, IAC escaped on encode
    Data(u8),
    /// No Operation
    NoOperation,
    /// End of urgent Data Stream
    DataMark,
    /// Break
    Break,
    /// Interrupt Process
    InterruptProcess,
    /// Abort Output
    AbortOutput,
    /// Are You There
    AreYouThere,
    /// Erase Character
    EraseCharacter,
    /// Erase Line
    EraseLine,
    /// Go Ahead
    GoAhead,
    /// End of Record
    EndOfRecord,
    /// Request the peer enable an option
    Do(TelnetOption),
    /// Request the peer disable an option
    Dont(TelnetOption),
    /// Offer to enable an option locally
    Will(TelnetOption),
    /// Refuse or disable an option locally
    Wont(TelnetOption),
    /// `IAC SB <option> <payload> IAC SE`
    Subnegotiate(TelnetOption, Bytes),
}

impl TelnetFrame {
    /// Number of bytes this frame occupies before IAC escaping.
    pub fn encoded_len(&self) -> usize {
        match self {
            TelnetFrame::Data(_) => 1,
            TelnetFrame::Do(_)
            | TelnetFrame::Dont(_)
            | TelnetFrame::Will(_)
            | TelnetFrame::Wont(_) => 3,
            TelnetFrame::Subnegotiate(_, payload) => 5 + payload.len(),
            _ => 2,
        }
    }
}

impl std::fmt::Display for TelnetFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TelnetFrame::Data(byte) => write!(f, "DATA 0x{byte:02X}"),
            TelnetFrame::NoOperation => write!(f, "NOP"),
            TelnetFrame::DataMark => write!(f, "DM"),
            TelnetFrame::Break => write!(f, "BRK"),
            TelnetFrame::InterruptProcess => write!(f, "IP"),
            TelnetFrame::AbortOutput => write!(f, "AO"),
            TelnetFrame::AreYouThere => write!(f, "AYT"),
            TelnetFrame::EraseCharacter => write!(f, "EC"),
            TelnetFrame::EraseLine => write!(f, "EL"),
            TelnetFrame::GoAhead => write!(f, "GA"),
            TelnetFrame::EndOfRecord => write!(f, "EOR"),
            TelnetFrame::Do(option) => write!(f, "DO {option}"),
            TelnetFrame::Dont(option) => write!(f, "DONT {option}"),
            TelnetFrame::Will(option) => write!(f, "WILL {option}"),
            TelnetFrame::Wont(option) => write!(f, "WONT {option}"),
            TelnetFrame::Subnegotiate(option, payload) => {
                write!(f, "SB {option} ({} bytes)", payload.len())
            }
        }
    }
}
