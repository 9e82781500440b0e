//! Message protocol definitions
//!
//! Every server → client line, as a typed enum rendered to its exact wire
//! text through `Display`. The writer task appends the line terminator.

use std::fmt;

use crate::error::Rejection;

/// Server → Client message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Login prompt
    Prompt,
    /// Name claimed (login or rename)
    NameAccepted { name: String },
    /// Name failed syntax checks
    InvalidName,
    /// Name held by someone else, or reserved
    NameTaken,
    /// Another participant logged in
    UserJoined { name: String },
    /// Another participant renamed
    UserRenamed { old: String, new: String },
    /// Blank line received
    Spam,
    /// Sorted list of active names
    UserList { names: Vec<String> },
    /// Direct message from another participant
    Private { from: String, body: String },
    /// Whisper addressed to oneself
    Lonely,
    /// Whisper recipient not found
    NoSuchUser { name: String },
    /// Broadcast chat line
    Chat { from: String, text: String },
    /// Another participant left
    UserLeft { name: String },
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMessage::Prompt => write!(f, "server: Enter the username (without spaces)"),
            ServerMessage::NameAccepted { name } => {
                write!(f, "server: You are now known as {}", name)
            }
            ServerMessage::InvalidName => write!(f, "server: Invalid name."),
            ServerMessage::NameTaken => write!(f, "server: Name taken."),
            ServerMessage::UserJoined { name } => {
                write!(f, "server: User {} joined the chat.", name)
            }
            ServerMessage::UserRenamed { old, new } => {
                write!(f, "server: User {} is now known as {}.", old, new)
            }
            ServerMessage::Spam => write!(f, "server: Please don't spam."),
            ServerMessage::UserList { names } => {
                write!(f, "server: List of users\n[{}]", names.join(", "))
            }
            ServerMessage::Private { from, body } => write!(f, "Private from {}: {}", from, body),
            ServerMessage::Lonely => write!(f, "server: You're lonely?"),
            ServerMessage::NoSuchUser { name } => {
                write!(f, "server: There is no active user {}.", name)
            }
            ServerMessage::Chat { from, text } => write!(f, "{}: {}", from, text),
            ServerMessage::UserLeft { name } => {
                write!(f, "server: User {} has left the chat.", name)
            }
        }
    }
}

/// Convert a registration rejection to the message shown to the client
impl From<Rejection> for ServerMessage {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::InvalidName => ServerMessage::InvalidName,
            Rejection::NameTaken => ServerMessage::NameTaken,
        }
    }
}
