//! Participant struct definition
//!
//! Represents a logged-in client: its connection identity, current display
//! name and the handle to its outbound queue.

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;

use crate::error::SendError;
use crate::message::ServerMessage;
use crate::types::ClientId;

/// Server → Client message queue handle
///
/// The queue is bounded and never waited on: a full queue means the client
/// stopped reading. Eviction is signalled through a token the connection
/// handler watches.
#[derive(Debug, Clone)]
pub struct Outbound {
    sender: mpsc::Sender<ServerMessage>,
    evicted: CancellationToken,
}

impl Outbound {
    /// Create a queue holding at most `capacity` unsent messages
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ServerMessage>) {
        let (sender, receiver) = mpsc::channel(capacity);
        let outbound = Self {
            sender,
            evicted: CancellationToken::new(),
        };
        (outbound, receiver)
    }

    /// Queue a message without waiting
    pub fn send(&self, msg: ServerMessage) -> Result<(), SendError> {
        self.sender.try_send(msg).map_err(|err| match err {
            TrySendError::Full(_) => SendError::QueueFull,
            TrySendError::Closed(_) => SendError::ChannelClosed,
        })
    }

    /// Mark the owning connection for disconnection
    pub fn evict(&self) {
        self.evicted.cancel();
    }

    pub fn is_evicted(&self) -> bool {
        self.evicted.is_cancelled()
    }

    /// Token cancelled on eviction; holding it does not keep the queue open
    pub fn eviction_token(&self) -> CancellationToken {
        self.evicted.clone()
    }
}

/// Active chat participant
#[derive(Debug)]
pub struct Participant {
    /// Connection identity, stable across renames
    pub id: ClientId,
    /// Current display name
    name: String,
    /// Server → Client message channel
    outbound: Outbound,
}

impl Participant {
    /// Create a participant with the given ID, name and outbound queue
    pub fn new(id: ClientId, name: String, outbound: Outbound) -> Self {
        Self { id, name, outbound }
    }

    /// Send a message to this participant
    ///
    /// Fails if the client disconnected or its queue is full.
    pub fn send(&self, msg: ServerMessage) -> Result<(), SendError> {
        self.outbound.send(msg)
    }

    /// Get the display name for this participant
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Swap in a new display name, returning the previous one
    pub fn rename(&mut self, name: String) -> String {
        std::mem::replace(&mut self.name, name)
    }

    /// Signal the connection to close
    pub fn evict(&self) {
        self.outbound.evict();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_participant_send() {
        let (tx, mut rx) = Outbound::channel(4);
        let participant = Participant::new(ClientId::new(), "alice".to_string(), tx);

        participant.send(ServerMessage::Spam).unwrap();
        assert_eq!(rx.recv().await, Some(ServerMessage::Spam));
    }

    #[test]
    fn test_participant_send_after_disconnect() {
        let (tx, rx) = Outbound::channel(4);
        let participant = Participant::new(ClientId::new(), "alice".to_string(), tx);
        drop(rx);

        assert!(matches!(
            participant.send(ServerMessage::Spam),
            Err(SendError::ChannelClosed)
        ));
    }

    #[test]
    fn test_full_queue_reports_slow_reader() {
        let (tx, _rx) = Outbound::channel(2);
        let participant = Participant::new(ClientId::new(), "alice".to_string(), tx);

        participant.send(ServerMessage::Spam).unwrap();
        participant.send(ServerMessage::Spam).unwrap();
        assert!(matches!(
            participant.send(ServerMessage::Spam),
            Err(SendError::QueueFull)
        ));
    }

    #[test]
    fn test_evict_cancels_token() {
        let (tx, _rx) = Outbound::channel(2);
        let token = tx.eviction_token();
        let participant = Participant::new(ClientId::new(), "alice".to_string(), tx.clone());

        assert!(!tx.is_evicted());
        participant.evict();
        assert!(token.is_cancelled());
        assert!(tx.is_evicted());
    }

    #[test]
    fn test_participant_rename() {
        let (tx, _rx) = Outbound::channel(2);
        let mut participant = Participant::new(ClientId::new(), "alice".to_string(), tx);

        let previous = participant.rename("Alicia".to_string());

        assert_eq!(previous, "alice");
        assert_eq!(participant.name(), "Alicia");
    }
}
