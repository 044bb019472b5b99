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

//! Non-blocking socket helpers

use std::io::{self, Write};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tracing::{debug, warn};

/// What happened to a buffer handed to [`write_nonblocking`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Every byte was accepted by the socket
    Complete,
    /// The socket stopped accepting data after this many bytes
    Blocked(usize),
    /// The write failed and the rest of the buffer was dropped
    Abandoned(usize),
}

impl WriteOutcome {
    /// Number of bytes the socket accepted.
    pub fn written(self, total: usize) -> usize {
        match self {
            WriteOutcome::Complete => total,
            WriteOutcome::Blocked(written) | WriteOutcome::Abandoned(written) => written,
        }
    }
}

/// Write as much of `buf` as the socket takes without waiting.
///
/// Interrupted writes are retried. A reset or broken pipe is expected when a
/// peer goes away and is only logged at debug; the read side notices the close.
pub fn write_nonblocking(stream: &TcpStream, buf: &[u8]) -> WriteOutcome {
    write_with(|chunk| stream.try_write(chunk), buf)
}

/// Send `message` on a connection that is about to be dropped, then close it.
///
/// The stream is taken out of the reactor first so the write goes straight to
/// the kernel instead of waiting for a readiness event that will never be polled.
pub fn reject(stream: TcpStream, message: &[u8]) -> WriteOutcome {
    match stream.into_std() {
        Ok(mut stream) => write_with(|chunk| stream.write(chunk), message),
        Err(err) => {
            debug!(error = %err, "Could not detach rejected stream");
            WriteOutcome::Abandoned(0)
        }
    }
}

fn write_with(mut write: impl FnMut(&[u8]) -> io::Result<usize>, buf: &[u8]) -> WriteOutcome {
    let mut written = 0;
    while written < buf.len() {
        match write(&buf[written..]) {
            Ok(0) => {
                warn!(written, remaining = buf.len() - written, "Socket accepted zero bytes");
                return WriteOutcome::Abandoned(written);
            }
            Ok(n) => written += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                return WriteOutcome::Blocked(written);
            }
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::ConnectionReset | io::ErrorKind::BrokenPipe
                ) =>
            {
                debug!(error = %err, "Peer went away during write");
                return WriteOutcome::Abandoned(written);
            }
            Err(err) => {
                warn!(error = %err, written, "Write failed");
                return WriteOutcome::Abandoned(written);
            }
        }
    }
    WriteOutcome::Complete
}

/// Open a listening socket with `SO_REUSEADDR` set.
pub fn listen(address: SocketAddr, backlog: u32) -> io::Result<TcpListener> {
    let socket = if address.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket.bind(address)?;
    socket.listen(backlog)
}
