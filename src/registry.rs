//! Participant registry
//!
//! The membership table behind the chat server. Every method takes the
//! whole table (`&self` / `&mut self`), so whoever owns the registry is its
//! single mutual-exclusion domain; in the server that owner is the
//! `ChatServer` actor.
//!
//! Invariant: no two members share a case-insensitive display name, and no
//! member's name contains "server".
//!
//! A member whose outbound queue is full when a message is queued for it is
//! evicted: unregistered and its connection signalled to close.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::error::{Rejection, SendError};
use crate::message::ServerMessage;
use crate::name;
use crate::participant::{Outbound, Participant};
use crate::types::{ClientId, NameKey};

/// Outcome of a successful `try_register`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// The name now held
    pub name: String,
    /// The name held before, if this was a rename
    pub previous: Option<String>,
}

impl Registration {
    /// The old name, if this was a rename that actually changed the name
    pub fn renamed_from(&self) -> Option<&str> {
        self.previous.as_deref().filter(|old| *old != self.name)
    }
}

/// Active participants, indexed by connection and by case-folded name
#[derive(Debug, Default)]
pub struct ParticipantRegistry {
    /// ClientId -> Participant
    members: HashMap<ClientId, Participant>,
    /// NameKey -> ClientId
    names: HashMap<NameKey, ClientId>,
}

impl ParticipantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `candidate` for `client_id`
    ///
    /// Inserts a new member, or renames an existing one in place. The
    /// availability check and the insert happen in this one call. A member
    /// re-claiming its own name (in any case) is accepted.
    pub fn try_register(
        &mut self,
        client_id: ClientId,
        candidate: &str,
        sender: Outbound,
    ) -> Result<Registration, Rejection> {
        name::validate(candidate)?;

        let key = NameKey::from_name(candidate);
        if let Some(holder) = self.names.get(&key) {
            if *holder != client_id {
                return Err(Rejection::NameTaken);
            }
        }

        let name = candidate.to_string();
        let previous = match self.members.get_mut(&client_id) {
            Some(participant) => {
                let previous = participant.rename(name.clone());
                self.names.remove(&NameKey::from_name(&previous));
                Some(previous)
            }
            None => {
                let participant = Participant::new(client_id, name.clone(), sender);
                self.members.insert(client_id, participant);
                None
            }
        };
        self.names.insert(key, client_id);

        Ok(Registration { name, previous })
    }

    /// Remove a member; a no-op if it is not registered
    pub fn unregister(&mut self, client_id: ClientId) -> Option<Participant> {
        let participant = self.members.remove(&client_id)?;
        self.names.remove(&NameKey::from_name(participant.name()));
        Some(participant)
    }

    /// Remove a member and signal its connection to close
    pub fn evict(&mut self, client_id: ClientId) -> Option<Participant> {
        let participant = self.unregister(client_id)?;
        warn!(
            "Evicting {} ('{}'): outbound queue full",
            client_id,
            participant.name()
        );
        participant.evict();
        Some(participant)
    }

    /// Deliver `msg` to every member except `from`
    ///
    /// Returns the number of members the message was queued for. Members
    /// whose queue is full are evicted.
    pub fn broadcast(&mut self, from: ClientId, msg: &ServerMessage) -> usize {
        let mut delivered = 0;
        let mut lagging = Vec::new();
        for participant in self.members.values().filter(|p| p.id != from) {
            match participant.send(msg.clone()) {
                Ok(()) => delivered += 1,
                Err(SendError::QueueFull) => lagging.push(participant.id),
                Err(SendError::ChannelClosed) => {
                    debug!("Skipping closed outbound queue of {}", participant.id)
                }
            }
        }
        for client_id in lagging {
            self.evict(client_id);
        }
        delivered
    }

    /// Deliver `msg` to one member, evicting it if its queue is full
    ///
    /// Returns whether the message was queued.
    pub fn send_to(&mut self, client_id: ClientId, msg: ServerMessage) -> bool {
        let Some(participant) = self.members.get(&client_id) else {
            return false;
        };
        match participant.send(msg) {
            Ok(()) => true,
            Err(SendError::QueueFull) => {
                self.evict(client_id);
                false
            }
            Err(SendError::ChannelClosed) => {
                debug!("Skipping closed outbound queue of {}", client_id);
                false
            }
        }
    }

    /// Case-insensitive exact lookup
    pub fn find_by_name(&self, name: &str) -> Option<&Participant> {
        let id = self.names.get(&NameKey::from_name(name))?;
        self.members.get(id)
    }

    pub fn get(&self, client_id: ClientId) -> Option<&Participant> {
        self.members.get(&client_id)
    }

    /// All current display names, sorted ascending
    pub fn list_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .members
            .values()
            .map(|p| p.name().to_string())
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
