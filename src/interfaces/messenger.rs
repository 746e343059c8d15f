//! The messaging-platform contract.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{AliasId, ChannelId, SpaceId, UserId};

/// A message received from the chat surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub channel: ChannelId,
    pub author: UserId,
    pub content: String,
}

/// Restricts a reply wait to one author in one channel.
///
/// Dialogue waits are parameterized with a filter so that messages from any
/// other user or channel never reach the waiting task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageFilter {
    pub channel: ChannelId,
    pub author: UserId,
}

impl MessageFilter {
    /// Whether `message` is addressed to this wait.
    pub fn matches(&self, message: &IncomingMessage) -> bool {
        message.channel == self.channel && message.author == self.author
    }
}

/// A named, space-scoped resource used to post messages under a character's
/// identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelAlias {
    pub id: AliasId,
    pub space: SpaceId,
    pub name: String,
}

/// One labeled field of a [`StructuredMessage`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageField {
    pub name: String,
    pub value: String,
}

/// Platform-agnostic rich response.
///
/// The host renders this however its surface allows; this crate only decides
/// the content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredMessage {
    /// Name shown as the message author, if any.
    pub author: Option<String>,
    /// Body text.
    pub description: String,
    /// Thumbnail image URL, if any.
    pub thumbnail: Option<String>,
    /// Labeled fields, rendered in order.
    pub fields: Vec<MessageField>,
}

impl StructuredMessage {
    /// A message with only a body.
    pub fn with_description(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }

    /// Builder: set the author name.
    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Builder: set the thumbnail URL.
    pub fn thumbnail(mut self, url: impl Into<String>) -> Self {
        self.thumbnail = Some(url.into());
        self
    }

    /// Builder: append a labeled field.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(MessageField {
            name: name.into(),
            value: value.into(),
        });
        self
    }
}

/// The messaging collaborator: delivery, reply waits, and channel aliases.
///
/// All methods may fault (transport errors, missing permissions on the
/// platform side); faults are opaque to this crate and propagate as
/// [`anyhow::Error`].
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Deliver plain text to a channel.
    async fn send_text(&self, channel: ChannelId, text: &str) -> anyhow::Result<()>;

    /// Deliver a rich message to a channel.
    async fn send_structured(
        &self,
        channel: ChannelId,
        message: StructuredMessage,
    ) -> anyhow::Result<()>;

    /// Suspend until the next message matching `filter` arrives.
    ///
    /// Returns `Ok(None)` when `timeout` elapses with no matching message;
    /// an `Err` is a transport fault, never a timeout.
    async fn wait_for_reply(
        &self,
        filter: MessageFilter,
        timeout: Duration,
    ) -> anyhow::Result<Option<IncomingMessage>>;

    /// All aliases currently provisioned in a space.
    async fn list_channel_aliases(&self, space: SpaceId) -> anyhow::Result<Vec<ChannelAlias>>;

    /// Provision a new alias named `name` in a space.
    async fn create_channel_alias(
        &self,
        space: SpaceId,
        name: &str,
    ) -> anyhow::Result<ChannelAlias>;

    /// Tear down a provisioned alias.
    async fn delete_channel_alias(&self, alias: AliasId) -> anyhow::Result<()>;
}
