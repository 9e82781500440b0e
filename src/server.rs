//! ChatServer Actor implementation
//!
//! The central actor that owns the participant registry. Every registry
//! operation arrives as a `ServerCommand` and is applied one at a time, so
//! register, rename and unregister are linearizable. Membership notices are
//! queued in the same step as the change they announce. Fan-out never waits:
//! a client whose bounded outbound queue is full is evicted.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::error::{AppError, Rejection};
use crate::message::ServerMessage;
use crate::participant::Outbound;
use crate::registry::{ParticipantRegistry, Registration};
use crate::types::ClientId;

/// Result of a whisper request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhisperOutcome {
    /// Queued for the recipient
    Delivered,
    /// The recipient name resolves to the sender's own connection
    ToSelf,
    /// No active participant holds that name
    NoRecipient,
    /// The sender itself is no longer registered
    NotMember,
}

/// Commands sent from sessions to the ChatServer actor
#[derive(Debug)]
pub enum ServerCommand {
    /// Claim a name (login or rename) and announce it to everyone else
    Register {
        client_id: ClientId,
        name: String,
        sender: Outbound,
        reply: oneshot::Sender<Result<Registration, Rejection>>,
    },
    /// Leave the registry and announce the departure; replies with the removed name
    Leave {
        client_id: ClientId,
        reply: oneshot::Sender<Option<String>>,
    },
    /// Leave the registry silently; replies with the removed name
    Unregister {
        client_id: ClientId,
        reply: oneshot::Sender<Option<String>>,
    },
    /// Broadcast a chat line under the sender's current name
    Chat { client_id: ClientId, text: String },
    /// Direct message to one participant
    Whisper {
        client_id: ClientId,
        target: String,
        body: String,
        reply: oneshot::Sender<WhisperOutcome>,
    },
    /// Snapshot of sorted names
    ListNames { reply: oneshot::Sender<Vec<String>> },
}

/// The main ChatServer actor
pub struct ChatServer {
    /// All logged-in participants
    registry: ParticipantRegistry,
    /// Command receiver channel
    receiver: mpsc::Receiver<ServerCommand>,
}

impl ChatServer {
    /// Create a new ChatServer with the given command receiver
    pub fn new(receiver: mpsc::Receiver<ServerCommand>) -> Self {
        Self {
            registry: ParticipantRegistry::new(),
            receiver,
        }
    }

    /// Spawn a fresh ChatServer and return a handle to it
    pub fn start(buffer: usize) -> ServerHandle {
        let (cmd_tx, cmd_rx) = mpsc::channel(buffer);
        tokio::spawn(ChatServer::new(cmd_rx).run());
        ServerHandle::new(cmd_tx)
    }

    /// Run the ChatServer event loop
    ///
    /// Continuously receives and processes commands until all senders are dropped.
    pub async fn run(mut self) {
        info!("ChatServer started");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        info!("ChatServer shutting down");
    }

    /// Process a single command
    ///
    /// Replies are best effort: a requester that has gone away is ignored.
    fn handle_command(&mut self, cmd: ServerCommand) {
        match cmd {
            ServerCommand::Register {
                client_id,
                name,
                sender,
                reply,
            } => {
                let result = self.handle_register(client_id, &name, sender);
                let _ = reply.send(result);
            }
            ServerCommand::Leave { client_id, reply } => {
                let _ = reply.send(self.handle_leave(client_id));
            }
            ServerCommand::Unregister { client_id, reply } => {
                let _ = reply.send(self.handle_unregister(client_id));
            }
            ServerCommand::Chat { client_id, text } => {
                self.handle_chat(client_id, text);
            }
            ServerCommand::Whisper {
                client_id,
                target,
                body,
                reply,
            } => {
                let _ = reply.send(self.handle_whisper(client_id, &target, body));
            }
            ServerCommand::ListNames { reply } => {
                let _ = reply.send(self.registry.list_names());
            }
        }
    }

    /// Handle login or rename
    fn handle_register(
        &mut self,
        client_id: ClientId,
        name: &str,
        sender: Outbound,
    ) -> Result<Registration, Rejection> {
        let registration = match self.registry.try_register(client_id, name, sender) {
            Ok(registration) => registration,
            Err(rejection) => {
                debug!("Client {} rejected '{}': {}", client_id, name, rejection);
                return Err(rejection);
            }
        };

        let notice = match (&registration.previous, registration.renamed_from()) {
            (None, _) => {
                info!("Client {} logged in as '{}'", client_id, registration.name);
                debug!("Total participants: {}", self.registry.len());
                Some(ServerMessage::UserJoined {
                    name: registration.name.clone(),
                })
            }
            (Some(_), Some(old)) => {
                info!("Client {} renamed '{}' -> '{}'", client_id, old, registration.name);
                Some(ServerMessage::UserRenamed {
                    old: old.to_string(),
                    new: registration.name.clone(),
                })
            }
            (Some(_), None) => None,
        };
        if let Some(notice) = notice {
            self.broadcast(client_id, notice);
        }

        Ok(registration)
    }

    /// Handle `/exit`: removal and departure notice in one step
    fn handle_leave(&mut self, client_id: ClientId) -> Option<String> {
        let name = self.handle_unregister(client_id)?;
        self.broadcast(client_id, ServerMessage::UserLeft { name: name.clone() });
        Some(name)
    }

    /// Handle removal from the registry
    fn handle_unregister(&mut self, client_id: ClientId) -> Option<String> {
        let participant = self.registry.unregister(client_id)?;
        info!("Client {} ('{}') unregistered", client_id, participant.name());
        debug!("Total participants: {}", self.registry.len());
        Some(participant.name().to_string())
    }

    /// Fan out a prepared message
    fn broadcast(&mut self, client_id: ClientId, message: ServerMessage) {
        let delivered = self.registry.broadcast(client_id, &message);
        debug!("Broadcast from {} queued for {} participants", client_id, delivered);
    }

    /// Handle chat message
    fn handle_chat(&mut self, client_id: ClientId, text: String) {
        let Some(sender) = self.registry.get(client_id) else {
            debug!("Dropping chat from unregistered client {}", client_id);
            return;
        };

        let message = ServerMessage::Chat {
            from: sender.name().to_string(),
            text,
        };
        self.broadcast(client_id, message);
    }

    /// Handle direct message
    ///
    /// Both names are resolved against the registry's current copy.
    fn handle_whisper(
        &mut self,
        client_id: ClientId,
        target: &str,
        body: String,
    ) -> WhisperOutcome {
        let Some(sender) = self.registry.get(client_id) else {
            return WhisperOutcome::NotMember;
        };
        let Some(recipient) = self.registry.find_by_name(target) else {
            return WhisperOutcome::NoRecipient;
        };
        let recipient_id = recipient.id;
        if recipient_id == client_id {
            return WhisperOutcome::ToSelf;
        }

        let message = ServerMessage::Private {
            from: sender.name().to_string(),
            body,
        };
        if !self.registry.send_to(recipient_id, message) {
            debug!("Whisper to {} dropped", recipient_id);
        }
        WhisperOutcome::Delivered
    }
}

/// Cloneable handle used by sessions to talk to the ChatServer actor
///
/// Every method fails with `AppError::ChannelSend` once the actor is gone.
#[derive(Debug, Clone)]
pub struct ServerHandle {
    sender: mpsc::Sender<ServerCommand>,
}

impl ServerHandle {
    pub fn new(sender: mpsc::Sender<ServerCommand>) -> Self {
        Self { sender }
    }

    async fn send(&self, cmd: ServerCommand) -> Result<(), AppError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| AppError::ChannelSend)
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> ServerCommand,
    ) -> Result<T, AppError> {
        let (reply, response) = oneshot::channel();
        self.send(make(reply)).await?;
        response.await.map_err(|_| AppError::ChannelSend)
    }

    /// Claim `name` for `client_id`, as a login or a rename
    ///
    /// On success everyone else is told about the join or the name change.
    pub async fn try_register(
        &self,
        client_id: ClientId,
        name: &str,
        sender: Outbound,
    ) -> Result<Result<Registration, Rejection>, AppError> {
        let name = name.to_string();
        self.request(|reply| ServerCommand::Register {
            client_id,
            name,
            sender,
            reply,
        })
        .await
    }

    /// Remove `client_id` and tell everyone else it left
    pub async fn leave(&self, client_id: ClientId) -> Result<Option<String>, AppError> {
        self.request(|reply| ServerCommand::Leave { client_id, reply })
            .await
    }

    /// Remove `client_id`; returns its last name, or None if it was not registered.
    /// Safe to call any number of times from any task.
    pub async fn unregister(&self, client_id: ClientId) -> Result<Option<String>, AppError> {
        self.request(|reply| ServerCommand::Unregister { client_id, reply })
            .await
    }

    pub async fn chat(&self, client_id: ClientId, text: &str) -> Result<(), AppError> {
        self.send(ServerCommand::Chat {
            client_id,
            text: text.to_string(),
        })
        .await
    }

    pub async fn whisper(
        &self,
        client_id: ClientId,
        target: &str,
        body: &str,
    ) -> Result<WhisperOutcome, AppError> {
        let target = target.to_string();
        let body = body.to_string();
        self.request(|reply| ServerCommand::Whisper {
            client_id,
            target,
            body,
            reply,
        })
        .await
    }

    pub async fn list_names(&self) -> Result<Vec<String>, AppError> {
        self.request(|reply| ServerCommand::ListNames { reply })
            .await
    }
}
