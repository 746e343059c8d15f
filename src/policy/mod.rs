//! Authorization for character mutation.
//!
//! Mutation is allowed to the character's owner or to a space moderator.
//! Moderator status comes from an external role lookup that can itself
//! fail (the actor may have no resolvable role set in the current
//! context); a failed lookup counts as "not a moderator". The fold from
//! `Err` to `false` happens in exactly one place, [`resolve_moderator`],
//! so the fail-closed decision stays visible and testable.

use async_trait::async_trait;
use log::warn;

use crate::characters::Character;
use crate::interfaces::{SpaceId, UserId};

/// External role/permission lookup.
#[async_trait]
pub trait ModeratorLookup: Send + Sync {
    /// Whether `user` holds a moderator or admin role in `space`.
    async fn is_moderator_or_admin(&self, user: UserId, space: SpaceId) -> anyhow::Result<bool>;
}

/// Resolve moderator status, failing closed.
///
/// A lookup fault is downgraded to `false`, never surfaced as a grant and
/// never allowed to abort the surrounding command.
pub async fn resolve_moderator(
    lookup: &dyn ModeratorLookup,
    user: UserId,
    space: SpaceId,
) -> bool {
    match lookup.is_moderator_or_admin(user, space).await {
        Ok(is_moderator) => is_moderator,
        Err(err) => {
            warn!(
                "moderator lookup failed for user {user} in space {space}: {err}; \
                 treating as non-moderator"
            );
            false
        }
    }
}

/// Whether `acting_user` may mutate `character`.
pub fn can_mutate(character: &Character, acting_user: UserId, is_moderator: bool) -> bool {
    character.owner == acting_user || is_moderator
}
