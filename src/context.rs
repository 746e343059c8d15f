//! Per-invocation command context.

use crate::interfaces::{ChannelId, SpaceId, UserId};
use crate::utilities::errors::CharacterError;

/// Where a command came from: which space (if any), channel, and author.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandContext {
    space: Option<SpaceId>,
    pub channel: ChannelId,
    pub author: UserId,
}

impl CommandContext {
    /// Context for a command issued inside a multi-user space.
    pub fn in_space(space: SpaceId, channel: ChannelId, author: UserId) -> Self {
        Self {
            space: Some(space),
            channel,
            author,
        }
    }

    /// Context for a one-to-one private channel.
    pub fn private(channel: ChannelId, author: UserId) -> Self {
        Self {
            space: None,
            channel,
            author,
        }
    }

    /// The surrounding space; every character command requires one.
    pub fn space(&self) -> Result<SpaceId, CharacterError> {
        self.space.ok_or(CharacterError::PrivateChannel)
    }
}
