//! Shared test doubles for the collaborator traits.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::interfaces::{
    AliasId, ChannelAlias, ChannelId, IncomingMessage, MessageFilter, Messenger, SpaceId,
    StructuredMessage, UserId,
};
use crate::policy::ModeratorLookup;

/// Something a [`ScriptedMessenger`] delivered, in order.
#[derive(Debug, Clone)]
pub enum Sent {
    Text(ChannelId, String),
    Structured(ChannelId, StructuredMessage),
}

/// Messenger double: replies come from a script, sends are recorded, and
/// aliases are tracked with a delete counter.
///
/// `wait_for_reply` pops the script front to back, discarding entries the
/// filter rejects (the real host primitive filters the same way); an empty
/// script behaves as an elapsed wait window.
#[derive(Default)]
pub struct ScriptedMessenger {
    replies: Mutex<VecDeque<IncomingMessage>>,
    sent: Mutex<Vec<Sent>>,
    aliases: Mutex<Vec<ChannelAlias>>,
    next_alias: AtomicU64,
    deleted_aliases: AtomicU64,
}

impl ScriptedMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for a later `wait_for_reply`.
    pub fn script_reply(&self, channel: ChannelId, author: UserId, content: &str) {
        self.replies.lock().push_back(IncomingMessage {
            channel,
            author,
            content: content.to_string(),
        });
    }

    /// Provision an alias without going through `create_channel_alias`.
    pub fn seed_alias(&self, space: SpaceId, name: &str) {
        let id = AliasId(self.next_alias.fetch_add(1, Ordering::SeqCst));
        self.aliases.lock().push(ChannelAlias {
            id,
            space,
            name: name.to_string(),
        });
    }

    /// All plain-text sends, in order.
    pub fn texts_sent(&self) -> Vec<String> {
        self.sent
            .lock()
            .iter()
            .filter_map(|sent| match sent {
                Sent::Text(_, text) => Some(text.clone()),
                Sent::Structured(..) => None,
            })
            .collect()
    }

    /// All structured sends, in order.
    pub fn structured_sent(&self) -> Vec<StructuredMessage> {
        self.sent
            .lock()
            .iter()
            .filter_map(|sent| match sent {
                Sent::Structured(_, message) => Some(message.clone()),
                Sent::Text(..) => None,
            })
            .collect()
    }

    /// Names of the aliases currently provisioned in `space`.
    pub fn alias_names(&self, space: SpaceId) -> Vec<String> {
        self.aliases
            .lock()
            .iter()
            .filter(|alias| alias.space == space)
            .map(|alias| alias.name.clone())
            .collect()
    }

    /// How many aliases have been deleted over the double's lifetime.
    pub fn deleted_alias_count(&self) -> u64 {
        self.deleted_aliases.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Messenger for ScriptedMessenger {
    async fn send_text(&self, channel: ChannelId, text: &str) -> anyhow::Result<()> {
        self.sent.lock().push(Sent::Text(channel, text.to_string()));
        Ok(())
    }

    async fn send_structured(
        &self,
        channel: ChannelId,
        message: StructuredMessage,
    ) -> anyhow::Result<()> {
        self.sent.lock().push(Sent::Structured(channel, message));
        Ok(())
    }

    async fn wait_for_reply(
        &self,
        filter: MessageFilter,
        _timeout: Duration,
    ) -> anyhow::Result<Option<IncomingMessage>> {
        let mut replies = self.replies.lock();
        while let Some(message) = replies.pop_front() {
            if filter.matches(&message) {
                return Ok(Some(message));
            }
        }
        Ok(None)
    }

    async fn list_channel_aliases(&self, space: SpaceId) -> anyhow::Result<Vec<ChannelAlias>> {
        Ok(self
            .aliases
            .lock()
            .iter()
            .filter(|alias| alias.space == space)
            .cloned()
            .collect())
    }

    async fn create_channel_alias(
        &self,
        space: SpaceId,
        name: &str,
    ) -> anyhow::Result<ChannelAlias> {
        let alias = ChannelAlias {
            id: AliasId(self.next_alias.fetch_add(1, Ordering::SeqCst)),
            space,
            name: name.to_string(),
        };
        self.aliases.lock().push(alias.clone());
        Ok(alias)
    }

    async fn delete_channel_alias(&self, alias: AliasId) -> anyhow::Result<()> {
        self.aliases.lock().retain(|existing| existing.id != alias);
        self.deleted_aliases.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Role lookup returning a fixed answer.
pub struct StaticRoles(pub bool);

#[async_trait]
impl ModeratorLookup for StaticRoles {
    async fn is_moderator_or_admin(
        &self,
        _user: UserId,
        _space: SpaceId,
    ) -> anyhow::Result<bool> {
        Ok(self.0)
    }
}

/// Role lookup that always faults, for fail-closed tests.
pub struct FailingRoles;

#[async_trait]
impl ModeratorLookup for FailingRoles {
    async fn is_moderator_or_admin(
        &self,
        _user: UserId,
        _space: SpaceId,
    ) -> anyhow::Result<bool> {
        Err(anyhow::anyhow!("role backend unavailable"))
    }
}
