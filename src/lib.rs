//! Line-oriented multi-user chat server library
//!
//! Clients connect over TCP, pick a display name and exchange broadcast or
//! direct messages, one line per message.
//!
//! # Protocol
//! - The first accepted line is the display name (`[A-Za-z0-9_]+`, unique
//!   ignoring case, must not contain "server")
//! - `/name <new>` renames, `/list` lists users, `/whisper <user> <text>`
//!   sends a direct message, `/exit` leaves
//! - Any other line is broadcast to everyone else
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `ChatServer` owns the `ParticipantRegistry`; it is the only place
//!   membership is read or changed, so registry operations never interleave
//! - Each connection runs a `ClientSession` that talks to the actor through
//!   a `ServerHandle`
//! - Outbound lines go through a bounded per-client queue drained by a
//!   writer task, so the actor never waits on a socket; a client whose
//!   queue fills up is evicted
//!
//! # Example
//! ```ignore
//! use tokio::net::TcpListener;
//! use line_chat::{serve, ChatServer, Limits};
//!
//! #[tokio::main]
//! async fn main() {
//!     let listener = TcpListener::bind("127.0.0.1:8080").await.unwrap();
//!     let server = ChatServer::start(256);
//!     serve(listener, server, Limits::default()).await;
//! }
//! ```

pub mod codec;
pub mod command;
pub mod config;
pub mod error;
pub mod handler;
pub mod message;
pub mod name;
pub mod participant;
pub mod registry;
pub mod server;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use codec::{ChatCodec, CodecError};
pub use command::Command;
pub use config::{Config, Limits};
pub use error::{AppError, Rejection, SendError};
pub use handler::{handle_connection, serve};
pub use message::ServerMessage;
pub use participant::{Outbound, Participant};
pub use registry::{ParticipantRegistry, Registration};
pub use server::{ChatServer, ServerCommand, ServerHandle, WhisperOutcome};
pub use session::{ClientSession, SessionState};
pub use types::{ClientId, NameKey};
