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

use crate::{CodecError, CodecResult, TelnetFrame, consts};
use std::fmt::Formatter;

///
/// [Telnet Terminal Options](https://www.iana.org/assignments/telnet-options/telnet-options.xhtml)
///
/// Only the options a line server is likely to see are named; everything else
/// round-trips through [`TelnetOption::Unknown`].
///
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TelnetOption {
    /// Telnet Binary Transmission [RFC856](https://tools.ietf.org/html/rfc856)
    TransmitBinary,
    /// Telnet Echo Option [RFC857](https://tools.ietf.org/html/rfc857)
    Echo,
    /// Suppress Go ahead [RFC858](https://tools.ietf.org/html/rfc858)
    SuppressGoAhead,
    /// Telnet Status Option [RFC859](http://www.iana.org/go/rfc859)
    Status,
    /// Telnet Timing Mark Option [RFC860](http://www.iana.org/go/rfc860)
    TimingMark,
    /// Terminal Type [RFC1091](http://www.iana.org/go/rfc1091)
    TTYPE,
    /// End of Record [RFC885](http://www.iana.org/go/rfc885)
    EOR,
    /// Negotiate About Window Size [RFC1073](http://www.iana.org/go/rfc1073)
    NAWS,
    /// Linemode [RFC1184](http://www.iana.org/go/rfc1184)
    Linemode,
    /// New Environment Option [RFC1572](http://www.iana.org/go/rfc1572)
    NewEnvironment,
    /// Charset [RFC2066](http://www.iana.org/go/rfc2066)
    Charset,
    /// Mud Server Data Protocol
    MSDP,
    /// Mud Server Status Protocol
    MSSP,
    /// Mud Client Compression Protocol version 1
    Compress1,
    /// Mud Client Compression Protocol version 2
    Compress2,
    /// Zenith Mud Protocol
    ZMP,
    /// Generic Mud Communication Protocol
    GMCP,
    /// Any other option code
    Unknown(u8),
}

impl TelnetOption {
    /// Wire code for this option.
    pub fn to_u8(&self) -> u8 {
        match self {
            TelnetOption::TransmitBinary => consts::option::BINARY,
            TelnetOption::Echo => consts::option::ECHO,
            TelnetOption::SuppressGoAhead => consts::option::SGA,
            TelnetOption::Status => consts::option::STATUS,
            TelnetOption::TimingMark => consts::option::TM,
            TelnetOption::TTYPE => consts::option::TTYPE,
            TelnetOption::EOR => consts::option::EOR,
            TelnetOption::NAWS => consts::option::NAWS,
            TelnetOption::Linemode => consts::option::LINEMODE,
            TelnetOption::NewEnvironment => consts::option::NEW_ENVIRONMENT,
            TelnetOption::Charset => consts::option::CHARSET,
            TelnetOption::MSDP => consts::option::MSDP,
            TelnetOption::MSSP => consts::option::MSSP,
            TelnetOption::Compress1 => consts::option::COMPRESS1,
            TelnetOption::Compress2 => consts::option::COMPRESS2,
            TelnetOption::ZMP => consts::option::ZMP,
            TelnetOption::GMCP => consts::option::GMCP,
            TelnetOption::Unknown(byte) => *byte,
        }
    }

    /// Option for a wire code; unnamed codes become [`TelnetOption::Unknown`].
    pub fn from_u8(byte: u8) -> Self {
        match byte {
            consts::option::BINARY => TelnetOption::TransmitBinary,
            consts::option::ECHO => TelnetOption::Echo,
            consts::option::SGA => TelnetOption::SuppressGoAhead,
            consts::option::STATUS => TelnetOption::Status,
            consts::option::TM => TelnetOption::TimingMark,
            consts::option::TTYPE => TelnetOption::TTYPE,
            consts::option::EOR => TelnetOption::EOR,
            consts::option::NAWS => TelnetOption::NAWS,
            consts::option::LINEMODE => TelnetOption::Linemode,
            consts::option::NEW_ENVIRONMENT => TelnetOption::NewEnvironment,
            consts::option::CHARSET => TelnetOption::Charset,
            consts::option::MSDP => TelnetOption::MSDP,
            consts::option::MSSP => TelnetOption::MSSP,
            consts::option::COMPRESS1 => TelnetOption::Compress1,
            consts::option::COMPRESS2 => TelnetOption::Compress2,
            consts::option::ZMP => TelnetOption::ZMP,
            consts::option::GMCP => TelnetOption::GMCP,
            byte => TelnetOption::Unknown(byte),
        }
    }
}

impl std::fmt::Display for TelnetOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TelnetOption::TransmitBinary => write!(f, "TransmitBinary"),
            TelnetOption::Echo => write!(f, "Echo"),
            TelnetOption::SuppressGoAhead => write!(f, "SuppressGoAhead"),
            TelnetOption::Status => write!(f, "Status"),
            TelnetOption::TimingMark => write!(f, "TimingMark"),
            TelnetOption::TTYPE => write!(f, "TTYPE"),
            TelnetOption::EOR => write!(f, "EOR"),
            TelnetOption::NAWS => write!(f, "NAWS"),
            TelnetOption::Linemode => write!(f, "Linemode"),
            TelnetOption::NewEnvironment => write!(f, "NewEnvironment"),
            TelnetOption::Charset => write!(f, "Charset"),
            TelnetOption::MSDP => write!(f, "MSDP"),
            TelnetOption::MSSP => write!(f, "MSSP"),
            TelnetOption::Compress1 => write!(f, "Compress1"),
            TelnetOption::Compress2 => write!(f, "Compress2"),
            TelnetOption::ZMP => write!(f, "ZMP"),
            TelnetOption::GMCP => write!(f, "GMCP"),
            TelnetOption::Unknown(option) => write!(f, "Unknown({option})"),
        }
    }
}

impl From<u8> for TelnetOption {
    fn from(byte: u8) -> Self {
        Self::from_u8(byte)
    }
}

impl From<TelnetOption> for u8 {
    fn from(option: TelnetOption) -> Self {
        option.to_u8()
    }
}

/// One row of the advertised option table.
///
/// `local` means we are willing to perform the option (answer `DO` with `WILL`),
/// `remote` means we want the peer to perform it (answer `WILL` with `DO`).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct OptionSupport {
    /// Option this row describes
    pub option: TelnetOption,
    /// Offered as WILL
    pub local: bool,
    /// Accepted as DO
    pub remote: bool,
}

impl OptionSupport {
    /// Build a table row.
    pub const fn new(option: TelnetOption, local: bool, remote: bool) -> Self {
        Self {
            option,
            local,
            remote,
        }
    }
}

/// Per-connection RFC 1143 ("Q method") negotiation state for every option code.
///
/// Support is fixed at construction from an [`OptionSupport`] table; anything
/// not listed is refused.
#[derive(Clone, Debug)]
pub struct TelnetOptions {
    config: [SupportState; 256],
    state: [OptionState; 256],
}

impl TelnetOptions {
    /// Options state with the given support table.
    pub fn with_support(table: &[OptionSupport]) -> Self {
        let mut options = Self::default();
        for row in table {
            options.config[usize::from(row.option.to_u8())] = SupportState {
                local: row.local,
                remote: row.remote,
            };
        }
        options
    }

    /// Checks if we support the given option locally
    pub fn is_supported_local(&self, option: TelnetOption) -> bool {
        self.config[index(option)].local
    }

    /// Checks if we support the given option remotely
    pub fn is_supported_remote(&self, option: TelnetOption) -> bool {
        self.config[index(option)].remote
    }

    /// Whether we are currently performing the option.
    ///
    /// An option on its way out (`WantNo*`) still counts until the peer confirms.
    pub fn local_enabled(&self, option: TelnetOption) -> bool {
        self.qstate(TelnetSide::Local, option).is_enabled()
    }

    /// Whether the peer is currently performing the option.
    pub fn remote_enabled(&self, option: TelnetOption) -> bool {
        self.qstate(TelnetSide::Remote, option).is_enabled()
    }

    /// Whether `side` is currently performing the option.
    pub fn enabled(&self, side: TelnetSide, option: TelnetOption) -> bool {
        self.qstate(side, option).is_enabled()
    }

    /// Ask to start performing an option ourselves (`WILL`).
    pub fn enable_local(&mut self, option: TelnetOption) -> Option<TelnetFrame> {
        self.request_enable(TelnetSide::Local, option)
    }

    /// Ask to stop performing an option ourselves (`WONT`).
    pub fn disable_local(&mut self, option: TelnetOption) -> Option<TelnetFrame> {
        self.request_disable(TelnetSide::Local, option)
    }

    /// Ask the peer to start performing an option (`DO`).
    pub fn enable_remote(&mut self, option: TelnetOption) -> Option<TelnetFrame> {
        self.request_enable(TelnetSide::Remote, option)
    }

    /// Ask the peer to stop performing an option (`DONT`).
    pub fn disable_remote(&mut self, option: TelnetOption) -> Option<TelnetFrame> {
        self.request_disable(TelnetSide::Remote, option)
    }

    /// Feed a negotiation verb received from the peer through the state machine.
    ///
    /// Returns the reply that must go back on the wire, if any.
    ///
    /// # Errors
    ///
    /// [`CodecError::NegotiationError`] if `frame` is not `DO`, `DONT`, `WILL` or `WONT`.
    pub fn handle_received(&mut self, frame: TelnetFrame) -> CodecResult<Option<TelnetFrame>> {
        match frame {
            TelnetFrame::Do(option) => Ok(self.receive_enable(TelnetSide::Local, option)),
            TelnetFrame::Dont(option) => Ok(self.receive_disable(TelnetSide::Local, option)),
            TelnetFrame::Will(option) => Ok(self.receive_enable(TelnetSide::Remote, option)),
            TelnetFrame::Wont(option) => Ok(self.receive_disable(TelnetSide::Remote, option)),
            _ => Err(CodecError::NegotiationError {
                reason: "Unsupported frame type".into(),
                frame_type: Some(format!("{frame:?}")),
            }),
        }
    }

    pub(crate) fn qstate(&self, side: TelnetSide, option: TelnetOption) -> QState {
        let state = &self.state[index(option)];
        match side {
            TelnetSide::Local => state.local,
            TelnetSide::Remote => state.remote,
        }
    }

    fn set_qstate(&mut self, side: TelnetSide, option: TelnetOption, qstate: QState) {
        let state = &mut self.state[index(option)];
        match side {
            TelnetSide::Local => state.local = qstate,
            TelnetSide::Remote => state.remote = qstate,
        }
    }

    fn supported(&self, side: TelnetSide, option: TelnetOption) -> bool {
        match side {
            TelnetSide::Local => self.is_supported_local(option),
            TelnetSide::Remote => self.is_supported_remote(option),
        }
    }

    // #### Outgoing requests ##################################################

    fn request_enable(&mut self, side: TelnetSide, option: TelnetOption) -> Option<TelnetFrame> {
        if !self.supported(side, option) {
            return None;
        }
        match self.qstate(side, option) {
            QState::No => {
                self.set_qstate(side, option, QState::WantYes);
                Some(side.affirm(option))
            }
            QState::WantNo => {
                // Queue the enable until the pending disable is answered.
                self.set_qstate(side, option, QState::WantNoOpposite);
                None
            }
            QState::WantYesOpposite => {
                self.set_qstate(side, option, QState::WantYes);
                None
            }
            QState::Yes | QState::WantYes | QState::WantNoOpposite => None,
        }
    }

    fn request_disable(&mut self, side: TelnetSide, option: TelnetOption) -> Option<TelnetFrame> {
        match self.qstate(side, option) {
            QState::Yes => {
                self.set_qstate(side, option, QState::WantNo);
                Some(side.refuse(option))
            }
            QState::WantYes => {
                self.set_qstate(side, option, QState::WantYesOpposite);
                None
            }
            QState::WantNoOpposite => {
                self.set_qstate(side, option, QState::WantNo);
                None
            }
            QState::No | QState::WantNo | QState::WantYesOpposite => None,
        }
    }

    // #### Incoming verbs #####################################################

    /// Peer sent `DO` (local side) or `WILL` (remote side).
    fn receive_enable(&mut self, side: TelnetSide, option: TelnetOption) -> Option<TelnetFrame> {
        match self.qstate(side, option) {
            QState::No => {
                if self.supported(side, option) {
                    self.set_qstate(side, option, QState::Yes);
                    Some(side.affirm(option))
                } else {
                    Some(side.refuse(option))
                }
            }
            QState::Yes => None,
            QState::WantNo => {
                // Peer answered our refusal with an enable; RFC 1143 settles on No.
                self.set_qstate(side, option, QState::No);
                None
            }
            QState::WantNoOpposite | QState::WantYes => {
                self.set_qstate(side, option, QState::Yes);
                None
            }
            QState::WantYesOpposite => {
                self.set_qstate(side, option, QState::WantNo);
                Some(side.refuse(option))
            }
        }
    }

    /// Peer sent `DONT` (local side) or `WONT` (remote side).
    fn receive_disable(&mut self, side: TelnetSide, option: TelnetOption) -> Option<TelnetFrame> {
        match self.qstate(side, option) {
            QState::No => None,
            QState::Yes => {
                self.set_qstate(side, option, QState::No);
                Some(side.refuse(option))
            }
            QState::WantNoOpposite => {
                self.set_qstate(side, option, QState::WantYes);
                Some(side.affirm(option))
            }
            QState::WantNo | QState::WantYes | QState::WantYesOpposite => {
                self.set_qstate(side, option, QState::No);
                None
            }
        }
    }
}

impl Default for TelnetOptions {
    fn default() -> Self {
        TelnetOptions {
            config: core::array::from_fn(|_| SupportState::default()),
            state: core::array::from_fn(|_| OptionState::default()),
        }
    }
}

fn index(option: TelnetOption) -> usize {
    usize::from(option.to_u8())
}

/// Which half of an option a negotiation concerns.
///
/// `Local` is what we perform (`WILL`/`WONT` out, `DO`/`DONT` back),
/// `Remote` is what the peer performs (`DO`/`DONT` out, `WILL`/`WONT` back).
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TelnetSide {
    /// The local side of the Telnet connection (what we want to do)
    Local,
    /// The remote side of the Telnet connection (what the peer wants to do)
    Remote,
}

impl TelnetSide {
    fn affirm(self, option: TelnetOption) -> TelnetFrame {
        match self {
            TelnetSide::Local => TelnetFrame::Will(option),
            TelnetSide::Remote => TelnetFrame::Do(option),
        }
    }

    fn refuse(self, option: TelnetOption) -> TelnetFrame {
        match self {
            TelnetSide::Local => TelnetFrame::Wont(option),
            TelnetSide::Remote => TelnetFrame::Dont(option),
        }
    }
}

impl std::fmt::Display for TelnetSide {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TelnetSide::Local => write!(f, "Local"),
            TelnetSide::Remote => write!(f, "Remote"),
        }
    }
}

#[derive(Clone, Debug, Default)]
struct OptionState {
    local: QState,
    remote: QState,
}

/// RFC 1143 per-side negotiation state.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub(crate) enum QState {
    #[default]
    No,
    WantNo,
    WantNoOpposite,
    Yes,
    WantYes,
    WantYesOpposite,
}

impl QState {
    fn is_enabled(self) -> bool {
        matches!(self, QState::Yes | QState::WantNo | QState::WantNoOpposite)
    }
}

#[derive(Clone, Debug, Default)]
struct SupportState {
    local: bool,
    remote: bool,
}
