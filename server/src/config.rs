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

//! Server configuration

use crate::linebuffer::MIN_CAPACITY;
use crate::{Result, ServerError};
use clap::Parser;
use linewise_telnetcodec::{OptionSupport, TelnetOption};
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Options advertised to every new connection unless configured otherwise.
pub const DEFAULT_TELNET_OPTIONS: [OptionSupport; 5] = [
    OptionSupport::new(TelnetOption::Compress2, true, true),
    OptionSupport::new(TelnetOption::ZMP, true, true),
    OptionSupport::new(TelnetOption::MSSP, true, false),
    OptionSupport::new(TelnetOption::NewEnvironment, true, false),
    OptionSupport::new(TelnetOption::TTYPE, true, false),
];

/// Server configuration
///
/// This structure contains all configuration options for the line server.
/// Use the builder pattern methods to customize the configuration.
///
/// # Example
///
/// ```
/// use linewise_server::ServerConfig;
/// use std::time::Duration;
///
/// let config = ServerConfig::default()
///     .with_max_connections(64)
///     .with_poll_timeout(Duration::from_millis(5))
///     .with_compression(false);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to
    pub bind_address: SocketAddr,

    /// Number of slots in the connection table
    ///
    /// Connections beyond this are told so and closed immediately.
    pub max_connections: usize,

    /// Upper bound on a single readiness wait
    pub poll_timeout: Duration,

    /// Listen queue length passed to the kernel
    pub backlog: u32,

    /// Line buffer size per session, terminator included
    pub line_capacity: usize,

    /// Scratch buffer size for a single socket read
    pub read_buffer_size: usize,

    /// Bytes a session may have waiting for a writable socket before it is dropped
    pub max_pending_output: usize,

    /// Offer MCCP2 (`WILL COMPRESS2`) to every new connection
    pub enable_compression: bool,

    /// Tell the remaining users when someone leaves
    pub announce_departures: bool,

    /// Option table handed to each new protocol session
    pub telnet_options: Vec<OptionSupport>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 23)),
            max_connections: 16,
            poll_timeout: Duration::from_millis(10),
            backlog: 3,
            line_capacity: 255,
            read_buffer_size: 512,
            max_pending_output: 64 * 1024,
            enable_compression: true,
            announce_departures: true,
            telnet_options: DEFAULT_TELNET_OPTIONS.to_vec(),
        }
    }
}

impl ServerConfig {
    /// Create a new configuration with the given bind address
    ///
    /// All other settings will use their default values.
    pub fn new(bind_address: SocketAddr) -> Self {
        Self {
            bind_address,
            ..Default::default()
        }
    }

    /// Set the number of connection slots
    #[must_use]
    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the readiness wait bound
    #[must_use]
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Set the listen backlog
    #[must_use]
    pub fn with_backlog(mut self, backlog: u32) -> Self {
        self.backlog = backlog;
        self
    }

    /// Set the per-session line buffer size
    #[must_use]
    pub fn with_line_capacity(mut self, capacity: usize) -> Self {
        self.line_capacity = capacity;
        self
    }

    /// Set the read scratch buffer size
    #[must_use]
    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    /// Set the outbound backlog limit
    #[must_use]
    pub fn with_max_pending_output(mut self, limit: usize) -> Self {
        self.max_pending_output = limit;
        self
    }

    /// Enable or disable compression
    #[must_use]
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.enable_compression = enabled;
        self
    }

    /// Enable or disable departure announcements
    #[must_use]
    pub fn with_departure_announcements(mut self, enabled: bool) -> Self {
        self.announce_departures = enabled;
        self
    }

    /// Replace the advertised option table
    #[must_use]
    pub fn with_telnet_options(mut self, options: impl Into<Vec<OptionSupport>>) -> Self {
        self.telnet_options = options.into();
        self
    }

    /// Validate the configuration
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.max_connections == 0 {
            return Err(invalid("max_connections must be greater than 0"));
        }

        if self.poll_timeout.is_zero() {
            return Err(invalid("poll_timeout must be greater than 0"));
        }

        if self.backlog == 0 {
            return Err(invalid("backlog must be greater than 0"));
        }

        if self.line_capacity < MIN_CAPACITY {
            return Err(invalid("line_capacity must be at least 2"));
        }

        if self.read_buffer_size == 0 {
            return Err(invalid("read_buffer_size must be greater than 0"));
        }

        if self.max_pending_output == 0 {
            return Err(invalid("max_pending_output must be greater than 0"));
        }

        Ok(())
    }
}

/// Command line arguments for `linewised`
#[derive(Debug, Parser)]
#[command(name = "linewised", version, about = "Multi-user Telnet line server")]
pub struct Arguments {
    #[arg(
        short = 'b',
        long = "bind",
        env = "LINEWISE_BIND",
        help = "Address to listen on",
        default_value = "0.0.0.0:23"
    )]
    pub bind: SocketAddr,

    #[arg(
        short = 'm',
        long = "max-connections",
        help = "Number of connection slots",
        default_value_t = 16
    )]
    pub max_connections: usize,

    #[arg(
        long = "poll-timeout-ms",
        help = "Upper bound on a single readiness wait, in milliseconds",
        default_value_t = 10
    )]
    pub poll_timeout_ms: u64,

    #[arg(
        long = "line-capacity",
        help = "Line buffer size per session",
        default_value_t = 255
    )]
    pub line_capacity: usize,

    #[arg(long = "no-compression", help = "Do not offer MCCP2 compression")]
    pub no_compression: bool,

    #[arg(long = "quiet-departures", help = "Do not announce users leaving")]
    pub quiet_departures: bool,
}

impl Arguments {
    /// Build a server configuration from the parsed arguments.
    pub fn into_config(self) -> ServerConfig {
        ServerConfig::new(self.bind)
            .with_max_connections(self.max_connections)
            .with_poll_timeout(Duration::from_millis(self.poll_timeout_ms))
            .with_line_capacity(self.line_capacity)
            .with_compression(!self.no_compression)
            .with_departure_announcements(!self.quiet_departures)
    }
}

fn invalid(reason: &str) -> ServerError {
    ServerError::InvalidConfig(reason.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_address, "0.0.0.0:23".parse().unwrap());
        assert_eq!(config.max_connections, 16);
        assert_eq!(config.poll_timeout, Duration::from_millis(10));
        assert_eq!(config.backlog, 3);
        assert_eq!(config.line_capacity, 255);
        assert_eq!(config.read_buffer_size, 512);
        assert!(config.enable_compression);
        assert!(config.announce_departures);
        assert_eq!(config.telnet_options.len(), 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = ServerConfig::new("127.0.0.1:4000".parse().unwrap())
            .with_max_connections(2)
            .with_line_capacity(16)
            .with_compression(false)
            .with_departure_announcements(false)
            .with_telnet_options([OptionSupport::new(TelnetOption::TTYPE, true, false)]);

        assert_eq!(config.bind_address.port(), 4000);
        assert_eq!(config.max_connections, 2);
        assert_eq!(config.line_capacity, 16);
        assert!(!config.enable_compression);
        assert!(!config.announce_departures);
        assert_eq!(config.telnet_options.len(), 1);
    }

    #[test]
    fn test_arguments() {
        let config = Arguments::parse_from([
            "linewised",
            "--bind",
            "127.0.0.1:2323",
            "--max-connections",
            "4",
            "--poll-timeout-ms",
            "25",
            "--no-compression",
        ])
        .into_config();
        assert_eq!(config.bind_address, "127.0.0.1:2323".parse().unwrap());
        assert_eq!(config.max_connections, 4);
        assert_eq!(config.poll_timeout, Duration::from_millis(25));
        assert_eq!(config.line_capacity, 255);
        assert!(!config.enable_compression);
        assert!(config.announce_departures);
    }

    #[test]
    fn test_validation() {
        let mut config = ServerConfig::default();

        // Valid config
        assert!(config.validate().is_ok());

        // Invalid: zero max_connections
        config.max_connections = 0;
        assert!(matches!(config.validate(), Err(ServerError::InvalidConfig(_))));

        // Invalid: zero poll timeout
        config.max_connections = 16;
        config.poll_timeout = Duration::ZERO;
        assert!(config.validate().is_err());

        // Invalid: a line buffer that cannot hold a byte after overflow
        config.poll_timeout = Duration::from_millis(10);
        config.line_capacity = 1;
        assert!(config.validate().is_err());

        config.line_capacity = 2;
        assert!(config.validate().is_ok());

        config.read_buffer_size = 0;
        assert!(config.validate().is_err());

        config.read_buffer_size = 512;
        config.backlog = 0;
        assert!(config.validate().is_err());

        config.backlog = 3;
        config.max_pending_output = 0;
        assert!(config.validate().is_err());
    }
}
