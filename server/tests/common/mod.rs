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

//! Shared helpers for the integration tests

#![allow(dead_code)]

use linewise_server::{ChatHandler, ServerConfig, SessionHandler, TelnetServer};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// How long a test waits for any expected output
pub const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Loopback config with an ephemeral port and compression off.
pub fn plain_config() -> ServerConfig {
    ServerConfig::new("127.0.0.1:0".parse().unwrap()).with_compression(false)
}

/// Bind a chat server for `config` and run it in the background.
pub async fn spawn_chat(config: ServerConfig) -> SocketAddr {
    let handler = ChatHandler::new(config.announce_departures);
    let server = TelnetServer::bind(config, handler).await.unwrap();
    spawn(server)
}

/// Run an already bound server in the background.
pub fn spawn<H: SessionHandler>(mut server: TelnetServer<H>) -> SocketAddr {
    let addr = server.local_addr();
    tokio::spawn(async move { server.run().await });
    addr
}

/// Test client keeping whatever arrived past the last expectation.
pub struct Client {
    stream: TcpStream,
    buffer: Vec<u8>,
}

impl Client {
    pub async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        Self {
            stream,
            buffer: Vec::new(),
        }
    }

    /// Connect and log in as `name`.
    pub async fn login(addr: SocketAddr, name: &str) -> Self {
        let mut client = Self::connect(addr).await;
        client.expect(b"Enter name: ").await;
        client.send_line(name).await;
        client.expect(format!("Welcome, {name}!\r\n").as_bytes()).await;
        client
    }

    pub async fn send(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).await.unwrap();
        self.stream.flush().await.unwrap();
    }

    pub async fn send_line(&mut self, line: &str) {
        self.send(format!("{line}\r\n").as_bytes()).await;
    }

    /// Wait for `needle` and return everything received before it.
    pub async fn expect(&mut self, needle: &[u8]) -> Vec<u8> {
        loop {
            if let Some(at) = find(&self.buffer, needle) {
                let before = self.buffer[..at].to_vec();
                self.buffer.drain(..at + needle.len());
                return before;
            }
            if self.fill().await == 0 {
                panic!(
                    "connection closed while waiting for {:?}, got {:?}",
                    String::from_utf8_lossy(needle),
                    String::from_utf8_lossy(&self.buffer)
                );
            }
        }
    }

    /// Read until the server closes the connection, returning what was left.
    pub async fn expect_eof(&mut self) -> Vec<u8> {
        while self.fill().await > 0 {}
        std::mem::take(&mut self.buffer)
    }

    /// Wait for at least `count` unconsumed bytes and take them.
    pub async fn take(&mut self, count: usize) -> Vec<u8> {
        while self.buffer.len() < count {
            assert!(self.fill().await > 0, "connection closed early");
        }
        self.buffer.drain(..count).collect()
    }

    /// Take whatever has arrived, waiting for at least one byte.
    pub async fn take_available(&mut self) -> Vec<u8> {
        if self.buffer.is_empty() {
            assert!(self.fill().await > 0, "connection closed early");
        }
        std::mem::take(&mut self.buffer)
    }

    /// Whether nothing arrives within `wait`.
    pub async fn is_quiet_for(&mut self, wait: Duration) -> bool {
        if !self.buffer.is_empty() {
            return false;
        }
        let mut chunk = [0u8; 256];
        match tokio::time::timeout(wait, self.stream.read(&mut chunk)).await {
            Err(_) => true,
            Ok(Ok(n)) => {
                self.buffer.extend_from_slice(&chunk[..n]);
                n == 0
            }
            Ok(Err(_)) => false,
        }
    }

    async fn fill(&mut self) -> usize {
        let mut chunk = [0u8; 1024];
        let read = tokio::time::timeout(READ_TIMEOUT, self.stream.read(&mut chunk))
            .await
            .unwrap_or_else(|_| {
                panic!(
                    "timed out, unconsumed: {:?}",
                    String::from_utf8_lossy(&self.buffer)
                )
            });
        // A reset after the server closes counts as end of stream.
        let n = read.unwrap_or(0);
        self.buffer.extend_from_slice(&chunk[..n]);
        n
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack.windows(needle.len()).position(|window| window == needle)
}
