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

//! The accept and multiplexing loop

use crate::adapter;
use crate::config::ServerConfig;
use crate::handler::{SessionContext, SessionHandler};
use crate::session::Session;
use crate::table::ConnectionTable;
use crate::transport;
use crate::types::{DisconnectReason, SlotId};
use crate::{Result, ServerError};
use futures_util::future::poll_fn;
use linewise_telnetcodec::{Disposition, OptionSupport, ProtocolSession, TelnetOption, TelnetSession};
use metrics::{counter, gauge};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Sent to a connection that finds the table full, right before it is closed.
pub const REJECT_MESSAGE: &[u8] = b"Too many users.\n";

/// Builds the protocol layer for each accepted connection from the configured option table.
pub type ProtocolFactory =
    Arc<dyn Fn(&[OptionSupport]) -> Box<dyn ProtocolSession> + Send + Sync + 'static>;

/// Single-threaded Telnet line server.
///
/// The server owns the listening socket, the connection table and the
/// handler. One call to [`TelnetServer::poll_once`] waits a bounded time for
/// any socket to become ready and then services, in order, the listener and
/// every ready session. Nothing else runs concurrently with it, so the table
/// needs no locking.
///
/// # Example
///
/// ```no_run
/// use linewise_server::{ChatHandler, ServerConfig, TelnetServer};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = ServerConfig::new("0.0.0.0:2323".parse()?);
///     let mut server = TelnetServer::bind(config, ChatHandler::default()).await?;
///     server.run().await?;
///     Ok(())
/// }
/// ```
pub struct TelnetServer<H: SessionHandler> {
    config: ServerConfig,
    listener: TcpListener,
    local_addr: SocketAddr,
    table: ConnectionTable<Session>,
    handler: H,
    factory: ProtocolFactory,
    scratch: Vec<u8>,
}

impl<H: SessionHandler> TelnetServer<H> {
    /// Validate `config` and start listening.
    pub async fn bind(config: ServerConfig, handler: H) -> Result<Self> {
        config.validate()?;

        let address = config.bind_address;
        let listener = transport::listen(address, config.backlog)
            .map_err(|source| ServerError::Bind { address, source })?;
        let local_addr = listener.local_addr()?;

        info!(
            %local_addr,
            max_connections = config.max_connections,
            compression = config.enable_compression,
            "Telnet server listening"
        );
        gauge!("linewise.connections.active").set(0.0);

        Ok(Self {
            table: ConnectionTable::new(config.max_connections),
            scratch: vec![0; config.read_buffer_size],
            factory: Arc::new(|support: &[OptionSupport]| {
                Box::new(TelnetSession::new(support)) as Box<dyn ProtocolSession>
            }),
            config,
            listener,
            local_addr,
            handler,
        })
    }

    /// Replace the protocol layer built for new connections.
    #[must_use]
    pub fn with_protocol_factory(mut self, factory: ProtocolFactory) -> Self {
        self.factory = factory;
        self
    }

    /// Address actually bound, useful when the configured port was 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of active sessions
    pub fn connection_count(&self) -> usize {
        self.table.len()
    }

    /// Get the configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The application handler
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Serve until a fatal error.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            self.poll_once().await?;
        }
    }

    /// Run a single wait-and-service iteration.
    ///
    /// Returns once the wait bound elapses or every ready socket has been
    /// serviced.
    pub async fn poll_once(&mut self) -> Result<()> {
        let waited = timeout(
            self.config.poll_timeout,
            wait_ready(&self.listener, &mut self.table),
        )
        .await;
        let readiness = match waited {
            Err(_) => return Ok(()),
            Ok(Err(err)) if err.kind() == io::ErrorKind::Interrupted => return Ok(()),
            Ok(Err(err)) => {
                error!(error = %err, "Poll failed");
                return Err(ServerError::Poll(err));
            }
            Ok(Ok(readiness)) => readiness,
        };

        if let Some(accepted) = readiness.accepted {
            self.accept(accepted);
            self.reap();
        }
        for ready in readiness.sessions {
            if ready.writable {
                if let Some(session) = self.table.get_mut(ready.slot) {
                    session.flush_pending();
                }
            }
            if ready.readable {
                self.service_read(ready.slot)?;
            }
            self.reap();
        }
        Ok(())
    }

    fn accept(&mut self, accepted: io::Result<(TcpStream, SocketAddr)>) {
        let (stream, peer_addr) = match accepted {
            Ok(accepted) => accepted,
            Err(err) => {
                error!(error = %err, "Accept failed");
                return;
            }
        };

        if self.table.is_full() {
            warn!(%peer_addr, "Connection table full, rejecting");
            counter!("linewise.connections.rejected").increment(1);
            transport::reject(stream, REJECT_MESSAGE);
            return;
        }

        let protocol = (self.factory)(&self.config.telnet_options);
        let session = Session::new(
            stream,
            peer_addr,
            protocol,
            self.config.line_capacity,
            self.config.max_pending_output,
        );
        let Ok(slot) = self.table.allocate(session) else {
            return;
        };

        info!(%slot, %peer_addr, "New connection");
        counter!("linewise.connections.total").increment(1);
        gauge!("linewise.connections.active").set(self.table.len() as f64);

        if self.config.enable_compression {
            if let Some(session) = self.table.get_mut(slot) {
                session.negotiate(Disposition::Will, TelnetOption::Compress2);
            }
        }
        let mut ctx = SessionContext::new(&mut self.table);
        self.handler.on_connect(&mut ctx, slot);
    }

    fn service_read(&mut self, slot: SlotId) -> Result<()> {
        let Some(session) = self.table.get_mut(slot) else {
            return Ok(());
        };
        match session.stream().try_read(&mut self.scratch) {
            Ok(0) => session.mark_closing(DisconnectReason::Closed),
            Ok(n) => adapter::receive(&mut self.table, &mut self.handler, slot, &self.scratch[..n]),
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) => {}
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted
                ) =>
            {
                debug!(%slot, error = %err, "Connection reset by peer");
                session.mark_closing(DisconnectReason::Closed);
            }
            Err(source) => {
                error!(%slot, error = %source, "Read failed");
                return Err(ServerError::Read { slot, source });
            }
        }
        Ok(())
    }

    /// Tear down every session marked as closing.
    fn reap(&mut self) {
        loop {
            let next = self
                .table
                .iter()
                .find_map(|(slot, session)| session.closing().map(|reason| (slot, reason)));
            let Some((slot, reason)) = next else {
                break;
            };
            let mut ctx = SessionContext::new(&mut self.table);
            self.handler.on_disconnect(&mut ctx, slot, reason);
            if let Some(session) = self.table.release(slot) {
                info!(
                    %slot,
                    peer_addr = %session.peer_addr(),
                    name = session.name().unwrap_or("-"),
                    %reason,
                    connected_for = ?session.connected_for(),
                    "Connection closed"
                );
            }
            gauge!("linewise.connections.active").set(self.table.len() as f64);
        }
    }
}

impl<H: SessionHandler> std::fmt::Debug for TelnetServer<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelnetServer")
            .field("local_addr", &self.local_addr)
            .field("connections", &self.table.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Sockets found ready by one wait.
#[derive(Default)]
struct Readiness {
    accepted: Option<io::Result<(TcpStream, SocketAddr)>>,
    sessions: Vec<SlotReadiness>,
}

struct SlotReadiness {
    slot: SlotId,
    readable: bool,
    writable: bool,
}

/// Wait until the listener or any session socket is ready.
///
/// Sessions are only polled for writability while they have a backlog.
async fn wait_ready(
    listener: &TcpListener,
    table: &mut ConnectionTable<Session>,
) -> io::Result<Readiness> {
    poll_fn(move |cx| poll_readiness(listener, &*table, cx)).await
}

fn poll_readiness(
    listener: &TcpListener,
    table: &ConnectionTable<Session>,
    cx: &mut Context<'_>,
) -> Poll<io::Result<Readiness>> {
    let mut readiness = Readiness::default();
    if let Poll::Ready(accepted) = listener.poll_accept(cx) {
        readiness.accepted = Some(accepted);
    }
    for (slot, session) in table.iter() {
        let readable = match session.stream().poll_read_ready(cx) {
            Poll::Ready(Ok(())) => true,
            Poll::Ready(Err(err)) => return Poll::Ready(Err(err)),
            Poll::Pending => false,
        };
        let writable = session.has_backlog()
            && match session.stream().poll_write_ready(cx) {
                Poll::Ready(Ok(())) => true,
                Poll::Ready(Err(err)) => return Poll::Ready(Err(err)),
                Poll::Pending => false,
            };
        if readable || writable {
            readiness.sessions.push(SlotReadiness {
                slot,
                readable,
                writable,
            });
        }
    }
    if readiness.accepted.is_none() && readiness.sessions.is_empty() {
        Poll::Pending
    } else {
        Poll::Ready(Ok(readiness))
    }
}
