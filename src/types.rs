//! Basic type definitions for the chat server
//!
//! Provides newtype wrappers for type safety:
//! - `ClientId`: UUID-based connection identifier
//! - `NameKey`: case-folded display name used as the registry index key

use uuid::Uuid;

/// Unique connection identifier (newtype pattern)
///
/// Participant identity is by connection, not by name, so a participant
/// keeps the same `ClientId` across renames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub Uuid);

impl ClientId {
    /// Create a new random client ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Case-insensitive name key
///
/// Two display names collide exactly when their keys are equal.
/// Names are ASCII-only once validated, so ASCII folding is sufficient.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NameKey(String);

impl NameKey {
    /// Fold a display name into its index key
    pub fn from_name(name: &str) -> Self {
        Self(name.to_ascii_lowercase())
    }
}
