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

//! Telnet negotiation, compression and protocol failure tests

mod common;

use bytes::Bytes;
use common::{Client, plain_config, spawn, spawn_chat};
use flate2::{Decompress, FlushDecompress};
use linewise_server::{
    ChatHandler, CodecError, Disposition, OptionSupport, ProtocolSession, ServerConfig, SessionEvent,
    TelnetOption, TelnetServer,
};
use std::sync::Arc;

// Telnet sidechannel constants
const IAC: u8 = 255; // Interpret As Command
const WILL: u8 = 251;
const DO: u8 = 253;
const DONT: u8 = 254;
const SB: u8 = 250; // Subnegotiation Begin
const SE: u8 = 240; // Subnegotiation End

// Telnet options
const ECHO: u8 = 1;
const TERMINAL_TYPE: u8 = 24;
const COMPRESS2: u8 = 86;

fn inflate(inflater: &mut Decompress, input: &[u8], output: &mut Vec<u8>) {
    let mut offset = 0;
    while offset < input.len() {
        output.reserve(4096);
        let before = inflater.total_in();
        inflater
            .decompress_vec(&input[offset..], output, FlushDecompress::Sync)
            .unwrap();
        offset += (inflater.total_in() - before) as usize;
    }
}

// ============================================================================
// Negotiation
// ============================================================================

#[tokio::test]
async fn test_compression_offered_before_prompt() {
    let addr = spawn_chat(ServerConfig::new("127.0.0.1:0".parse().unwrap())).await;

    let mut client = Client::connect(addr).await;
    let greeting = client.expect(b"Enter name: ").await;
    assert_eq!(greeting, [IAC, WILL, COMPRESS2]);
}

#[tokio::test]
async fn test_no_offer_when_compression_disabled() {
    let addr = spawn_chat(plain_config()).await;

    let mut client = Client::connect(addr).await;
    assert!(client.expect(b"Enter name: ").await.is_empty());
}

#[tokio::test]
async fn test_unsupported_option_is_refused() {
    let addr = spawn_chat(plain_config()).await;
    let mut alice = Client::login(addr, "alice").await;
    let mut bob = Client::login(addr, "bob").await;

    alice.send(&[b'h', b'i', IAC, WILL, ECHO, b'!', b'\r', b'\n']).await;
    alice.expect(&[IAC, DONT, ECHO]).await;
    bob.expect(b"alice: \"hi!\"\r\n").await;
}

#[tokio::test]
async fn test_escaped_iac_reaches_the_line() {
    let addr = spawn_chat(plain_config()).await;
    let mut alice = Client::login(addr, "alice").await;
    let mut bob = Client::login(addr, "bob").await;

    alice.send(&[b'a', IAC, IAC, b'b', b'\r', b'\n']).await;
    bob.expect("alice: \"a\u{FFFD}b\"\r\n".as_bytes()).await;
}

// ============================================================================
// MCCP2
// ============================================================================

#[tokio::test]
async fn test_output_is_compressed_after_acceptance() {
    let addr = spawn_chat(ServerConfig::new("127.0.0.1:0".parse().unwrap())).await;
    let mut bob = Client::login(addr, "bob").await;

    let mut alice = Client::connect(addr).await;
    alice.expect(&[IAC, WILL, COMPRESS2]).await;
    alice.expect(b"Enter name: ").await;
    alice.send(&[IAC, DO, COMPRESS2]).await;
    alice.expect(&[IAC, SB, COMPRESS2, IAC, SE]).await;

    alice.send_line("alice").await;
    let mut inflater = Decompress::new(true);
    let mut plain = Vec::new();
    let welcome = b"Welcome, alice!\r\n";
    while plain.len() < welcome.len() {
        let chunk = alice.take_available().await;
        inflate(&mut inflater, &chunk, &mut plain);
    }
    assert_eq!(plain, welcome);

    plain.clear();
    bob.send_line("hi").await;
    let chat = b"bob: \"hi\"\r\n";
    while plain.len() < chat.len() {
        let chunk = alice.take_available().await;
        inflate(&mut inflater, &chunk, &mut plain);
    }
    assert_eq!(plain, chat);
}

// ============================================================================
// Protocol failures
// ============================================================================

#[tokio::test]
async fn test_runaway_subnegotiation_ends_the_session() {
    let addr = spawn_chat(plain_config()).await;
    let mut alice = Client::login(addr, "alice").await;
    let mut bob = Client::login(addr, "bob").await;

    let mut flood = vec![IAC, SB, TERMINAL_TYPE];
    flood.extend(std::iter::repeat_n(b'x', 9 * 1024));
    bob.send(&flood).await;

    alice.expect(b"bob: \"** HAS HAD AN ERROR **\"\r\n").await;
    bob.expect_eof().await;
}

/// Passes bytes straight through and fails on BEL.
struct RawProtocol;

impl ProtocolSession for RawProtocol {
    fn feed(&mut self, input: &[u8]) -> Vec<SessionEvent> {
        match input.iter().position(|&byte| byte == 0x07) {
            Some(at) => vec![
                SessionEvent::Data(Bytes::copy_from_slice(&input[..at])),
                SessionEvent::Error(CodecError::NegotiationError {
                    reason: "bell".to_string(),
                    frame_type: None,
                }),
            ],
            None => vec![SessionEvent::Data(Bytes::copy_from_slice(input))],
        }
    }

    fn negotiate(&mut self, _disposition: Disposition, _option: TelnetOption) -> Vec<SessionEvent> {
        Vec::new()
    }

    fn begin_compression(&mut self) -> Vec<SessionEvent> {
        Vec::new()
    }

    fn is_compressing(&self) -> bool {
        false
    }

    fn send_text(&mut self, text: &str) -> Vec<SessionEvent> {
        vec![SessionEvent::Send(Bytes::copy_from_slice(text.as_bytes()))]
    }
}

async fn raw_login(client: &mut Client, name: &str) {
    client.expect(b"Enter name: ").await;
    client.send_line(name).await;
    client.expect(format!("Welcome, {name}!\n").as_bytes()).await;
}

#[tokio::test]
async fn test_custom_protocol_factory() {
    let server = TelnetServer::bind(plain_config(), ChatHandler::default())
        .await
        .unwrap()
        .with_protocol_factory(Arc::new(|_: &[OptionSupport]| {
            Box::new(RawProtocol) as Box<dyn ProtocolSession>
        }));
    let addr = spawn(server);

    let mut alice = Client::connect(addr).await;
    raw_login(&mut alice, "alice").await;
    let mut bob = Client::connect(addr).await;
    raw_login(&mut bob, "bob").await;

    alice.send(b"plain\r\n").await;
    bob.expect(b"alice: \"plain\"\n").await;

    // Data ahead of the error is still delivered.
    alice.send(b"last\r\n\x07").await;
    bob.expect(b"alice: \"last\"\n").await;
    bob.expect(b"alice: \"** HAS HAD AN ERROR **\"\n").await;
    alice.expect_eof().await;
}
