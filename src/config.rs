//! Command-line configuration

use clap::Parser;

/// Default server address
pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";

/// Channel buffer size for server commands
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// Longest inbound line accepted, in bytes
pub const DEFAULT_MAX_LINE_LENGTH: usize = 4096;

/// Unsent messages a client may have queued before it is evicted
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 128;

/// Per-connection limits handed to the connection handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_line_length: usize,
    pub outbound_capacity: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
        }
    }
}

/// Line-oriented multi-user chat server
///
/// Log verbosity is controlled through RUST_LOG.
#[derive(Debug, Clone, Parser)]
#[command(name = "line_chat", version, about)]
pub struct Config {
    /// Address to listen on
    #[arg(default_value = DEFAULT_ADDR)]
    pub addr: String,

    /// Capacity of the chat server's command queue
    #[arg(long, default_value_t = DEFAULT_CHANNEL_BUFFER)]
    pub channel_buffer: usize,

    /// Longest inbound line accepted; longer lines end the session
    #[arg(long, default_value_t = DEFAULT_MAX_LINE_LENGTH)]
    pub max_line_length: usize,

    /// Unsent messages a client may have queued; a client that falls further behind is disconnected
    #[arg(long, default_value_t = DEFAULT_OUTBOUND_CAPACITY)]
    pub outbound_capacity: usize,
}

impl Config {
    pub fn limits(&self) -> Limits {
        Limits {
            max_line_length: self.max_line_length,
            outbound_capacity: self.outbound_capacity,
        }
    }
}
