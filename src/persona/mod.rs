//! Persona assumption sessions.
//!
//! A session temporarily binds a user to a character identity, backed by a
//! space-scoped channel alias named after the character. Sessions expire
//! after a fixed lifetime. Expiry runs as a deferred task that is never
//! cancelled; instead, both expiry and explicit release perform the same
//! staleness-checked teardown, so an expiry scheduled for an old assumption
//! never destroys a newer one and the alias is deleted exactly once.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use log::{debug, info, warn};

use crate::interfaces::{Messenger, SpaceId, UserId};

/// An active binding of a user to a character identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssumedPersona {
    /// The assumed character's name.
    pub character: String,
    pub assumed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Tracks every active persona session in the process.
///
/// At most one session exists per `(space, user)` pair; assuming a second
/// character overwrites the first. Cloning is cheap and clones share the
/// session table.
#[derive(Clone)]
pub struct PersonaManager {
    sessions: Arc<DashMap<(SpaceId, UserId), AssumedPersona>>,
    messenger: Arc<dyn Messenger>,
}

impl PersonaManager {
    pub fn new(messenger: Arc<dyn Messenger>) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            messenger,
        }
    }

    /// The session currently bound to `(space, user)`, if any.
    pub fn current(&self, space: SpaceId, user: UserId) -> Option<AssumedPersona> {
        self.sessions
            .get(&(space, user))
            .map(|entry| entry.value().clone())
    }

    /// Bind `user` to `character` for `ttl`, superseding any current binding.
    ///
    /// Ensures a channel alias named after the character exists in the
    /// space; an existing alias with that name is reused, even if it was
    /// provisioned for a different character that happened to share the
    /// name. A deferred expiry fires after `ttl`.
    ///
    /// The staleness identity is the character name: re-assuming the same
    /// character refreshes the session entry, but the earlier expiry still
    /// matches it by name and tears it down at its own deadline.
    pub async fn assume(
        &self,
        space: SpaceId,
        user: UserId,
        character: &str,
        ttl: Duration,
    ) -> anyhow::Result<()> {
        let now = Utc::now();
        let session = AssumedPersona {
            character: character.to_string(),
            assumed_at: now,
            expires_at: now + chrono::Duration::seconds(ttl.as_secs() as i64),
        };
        if let Some(old) = self.sessions.insert((space, user), session) {
            debug!(
                "user {user} in space {space} superseded persona {:?}",
                old.character
            );
        }

        self.ensure_alias(space, character).await?;
        info!(
            "user {user} in space {space} assumed persona {character:?} for {}s",
            ttl.as_secs()
        );

        let manager = self.clone();
        let name = character.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            if let Err(err) = manager.finish(space, user, &name).await {
                warn!("persona expiry for {name:?} failed: {err}");
            }
        });
        Ok(())
    }

    /// Immediately end the binding of `(space, user)` to `character`.
    ///
    /// Performs the identical staleness-checked teardown as a deferred
    /// expiry, with zero wait. Returns whether a session was actually
    /// ended; a pending expiry racing with this call observes the cleared
    /// entry and becomes a no-op.
    pub async fn release(
        &self,
        space: SpaceId,
        user: UserId,
        character: &str,
    ) -> anyhow::Result<bool> {
        self.finish(space, user, character).await
    }

    /// Staleness-checked teardown: atomically remove the session only if it
    /// still names `character`, then delete the alias. A superseded or
    /// already-released session makes this a no-op.
    async fn finish(&self, space: SpaceId, user: UserId, character: &str) -> anyhow::Result<bool> {
        let removed = self
            .sessions
            .remove_if(&(space, user), |_, session| session.character == character)
            .is_some();
        if !removed {
            debug!("persona teardown for {character:?} is stale; nothing to do");
            return Ok(false);
        }
        self.delete_alias(space, character).await?;
        info!("user {user} in space {space} released persona {character:?}");
        Ok(true)
    }

    async fn ensure_alias(&self, space: SpaceId, name: &str) -> anyhow::Result<()> {
        let aliases = self.messenger.list_channel_aliases(space).await?;
        if aliases.iter().any(|alias| alias.name == name) {
            return Ok(());
        }
        self.messenger.create_channel_alias(space, name).await?;
        debug!("created channel alias {name:?} in space {space}");
        Ok(())
    }

    async fn delete_alias(&self, space: SpaceId, name: &str) -> anyhow::Result<()> {
        let aliases = self.messenger.list_channel_aliases(space).await?;
        if let Some(alias) = aliases.iter().find(|alias| alias.name == name) {
            self.messenger.delete_channel_alias(alias.id).await?;
            debug!("deleted channel alias {name:?} in space {space}");
        }
        Ok(())
    }
}
