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

//! Telnet wire constants (RFC 854 and friends).

#![allow(dead_code)]

/// NUL, used after a bare CR
pub const NUL: u8 = 0x00;
/// Line Feed
pub const LF: u8 = 0x0A;
/// Carriage Return
pub const CR: u8 = 0x0D;

/// End of Record
pub const EOR: u8 = 239;
/// Subnegotiation End
pub const SE: u8 = 240;
/// No Operation
pub const NOP: u8 = 241;
/// Data Mark
pub const DM: u8 = 242;
/// Break
pub const BRK: u8 = 243;
/// Interrupt Process
pub const IP: u8 = 244;
/// Abort Output
pub const AO: u8 = 245;
/// Are You There
pub const AYT: u8 = 246;
/// Erase Character
pub const EC: u8 = 247;
/// Erase Line
pub const EL: u8 = 248;
/// Go Ahead
pub const GA: u8 = 249;
/// Subnegotiation Begin
pub const SB: u8 = 250;
/// WILL
pub const WILL: u8 = 251;
/// WONT
pub const WONT: u8 = 252;
/// DO
pub const DO: u8 = 253;
/// DONT
pub const DONT: u8 = 254;
/// Interpret As Command
pub const IAC: u8 = 255;

/// Option codes from the IANA telnet options registry.
pub mod option {
    pub const BINARY: u8 = 0;
    pub const ECHO: u8 = 1;
    pub const SGA: u8 = 3;
    pub const STATUS: u8 = 5;
    pub const TM: u8 = 6;
    pub const TTYPE: u8 = 24;
    pub const EOR: u8 = 25;
    pub const NAWS: u8 = 31;
    pub const LINEMODE: u8 = 34;
    pub const NEW_ENVIRONMENT: u8 = 39;
    pub const CHARSET: u8 = 42;
    pub const MSDP: u8 = 69;
    pub const MSSP: u8 = 70;
    pub const COMPRESS1: u8 = 85;
    pub const COMPRESS2: u8 = 86;
    pub const ZMP: u8 = 93;
    pub const GMCP: u8 = 201;
}
