//! The data-access contract for persisted character records.

use std::collections::HashMap;

use anyhow::anyhow;
use async_trait::async_trait;
use parking_lot::RwLock;

use crate::characters::{Character, TeamEntry};

use super::SpaceId;

/// Owns persisted character records, keyed by name within a space.
#[async_trait]
pub trait CharacterStore: Send + Sync {
    /// All characters in a space, keyed by name.
    async fn get_characters(&self, space: SpaceId)
        -> anyhow::Result<HashMap<String, Character>>;

    /// Insert or replace the character stored under its name.
    async fn add_character(&self, space: SpaceId, character: Character) -> anyhow::Result<()>;

    /// Remove the character stored under `name`.
    async fn remove_character(&self, space: SpaceId, name: &str) -> anyhow::Result<()>;

    /// Atomically move a record from `old` to `new`, updating its embedded
    /// `name` field in the same step. Renaming onto an existing name
    /// replaces that record.
    async fn rename_character(&self, space: SpaceId, old: &str, new: &str) -> anyhow::Result<()>;

    /// Companion entries for a character.
    async fn get_team(&self, space: SpaceId, name: &str) -> anyhow::Result<Vec<TeamEntry>>;
}

/// In-memory [`CharacterStore`] for tests and single-process use.
#[derive(Default)]
pub struct InMemoryCharacterStore {
    spaces: RwLock<HashMap<SpaceId, HashMap<String, Character>>>,
    teams: RwLock<HashMap<(SpaceId, String), Vec<TeamEntry>>>,
}

impl InMemoryCharacterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a team to a character; the trait has no write path for teams,
    /// they come from elsewhere in the host.
    pub fn set_team(&self, space: SpaceId, name: &str, team: Vec<TeamEntry>) {
        self.teams.write().insert((space, name.to_string()), team);
    }
}

#[async_trait]
impl CharacterStore for InMemoryCharacterStore {
    async fn get_characters(
        &self,
        space: SpaceId,
    ) -> anyhow::Result<HashMap<String, Character>> {
        Ok(self.spaces.read().get(&space).cloned().unwrap_or_default())
    }

    async fn add_character(&self, space: SpaceId, character: Character) -> anyhow::Result<()> {
        self.spaces
            .write()
            .entry(space)
            .or_default()
            .insert(character.name.clone(), character);
        Ok(())
    }

    async fn remove_character(&self, space: SpaceId, name: &str) -> anyhow::Result<()> {
        let mut spaces = self.spaces.write();
        let characters = spaces
            .get_mut(&space)
            .ok_or_else(|| anyhow!("no characters in space {space}"))?;
        characters
            .remove(name)
            .ok_or_else(|| anyhow!("character not found: {name}"))?;
        Ok(())
    }

    async fn rename_character(&self, space: SpaceId, old: &str, new: &str) -> anyhow::Result<()> {
        let mut spaces = self.spaces.write();
        let characters = spaces
            .get_mut(&space)
            .ok_or_else(|| anyhow!("no characters in space {space}"))?;
        let mut character = characters
            .remove(old)
            .ok_or_else(|| anyhow!("character not found: {old}"))?;
        character.name = new.to_string();
        characters.insert(new.to_string(), character);
        Ok(())
    }

    async fn get_team(&self, space: SpaceId, name: &str) -> anyhow::Result<Vec<TeamEntry>> {
        Ok(self
            .teams
            .read()
            .get(&(space, name.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::UserId;

    const SPACE: SpaceId = SpaceId(1);

    #[tokio::test]
    async fn test_add_is_upsert() {
        let store = InMemoryCharacterStore::new();
        let mut kevin = Character::new("Kevin", UserId(7));
        store.add_character(SPACE, kevin.clone()).await.unwrap();

        kevin.description = "A brave knight".to_string();
        store.add_character(SPACE, kevin).await.unwrap();

        let all = store.get_characters(SPACE).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all["Kevin"].description, "A brave knight");
    }

    #[tokio::test]
    async fn test_rename_moves_record_and_field() {
        let store = InMemoryCharacterStore::new();
        store
            .add_character(SPACE, Character::new("Kevin", UserId(7)))
            .await
            .unwrap();

        store.rename_character(SPACE, "Kevin", "Sir Kevin").await.unwrap();

        let all = store.get_characters(SPACE).await.unwrap();
        assert!(!all.contains_key("Kevin"));
        assert_eq!(all["Sir Kevin"].name, "Sir Kevin");
    }

    #[tokio::test]
    async fn test_rename_missing_is_error() {
        let store = InMemoryCharacterStore::new();
        store
            .add_character(SPACE, Character::new("Kevin", UserId(7)))
            .await
            .unwrap();

        assert!(store.rename_character(SPACE, "Nobody", "Someone").await.is_err());
        // The existing record is untouched.
        let all = store.get_characters(SPACE).await.unwrap();
        assert!(all.contains_key("Kevin"));
    }

    #[tokio::test]
    async fn test_teams_are_space_scoped() {
        let store = InMemoryCharacterStore::new();
        store.set_team(
            SPACE,
            "Kevin",
            vec![TeamEntry {
                name: "Pidgey".to_string(),
                kind: "bird".to_string(),
            }],
        );

        let team = store.get_team(SPACE, "Kevin").await.unwrap();
        assert_eq!(team.len(), 1);
        assert!(store.get_team(SpaceId(2), "Kevin").await.unwrap().is_empty());
    }
}
