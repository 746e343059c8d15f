//! Contracts for the external collaborators.
//!
//! The surrounding chat platform provides message delivery and channel
//! aliases ([`Messenger`]), and a data-access layer owns persisted character
//! records ([`CharacterStore`]). This crate only depends on these traits;
//! [`InMemoryCharacterStore`] ships as a reference implementation for tests
//! and local use.

use std::fmt;

use serde::{Deserialize, Serialize};

mod messenger;
mod store;

pub use messenger::{
    ChannelAlias, IncomingMessage, MessageField, MessageFilter, Messenger, StructuredMessage,
};
pub use store::{CharacterStore, InMemoryCharacterStore};

/// Identifier of a multi-user space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpaceId(pub u64);

/// Identifier of a member of the chat platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub u64);

/// Identifier of a conversation channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(pub u64);

/// Identifier of a provisioned channel alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AliasId(pub u64);

impl fmt::Display for SpaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for AliasId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
