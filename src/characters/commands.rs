//! The command surface for characters.
//!
//! One method per command exposed to the dispatch layer. Each command body
//! runs with typed errors; [`CharactersService::report`] is the single
//! boundary that turns a recoverable error into exactly one user-facing
//! message and leaves persisted state unchanged. Collaborator faults pass
//! through to the dispatch layer untouched.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use log::info;

use crate::characters::attributes::parse_attributes;
use crate::characters::dialogue::{CreationDialogue, DialogueOutcome};
use crate::characters::{Character, IMAGE_KEY, MAX_ATTRIBUTE, MAX_DESCRIPTION};
use crate::context::CommandContext;
use crate::interfaces::{
    CharacterStore, MessageFilter, Messenger, SpaceId, StructuredMessage, UserId,
};
use crate::persona::PersonaManager;
use crate::policy::{can_mutate, resolve_moderator, ModeratorLookup};
use crate::utilities::errors::CharacterError;
use crate::utilities::i18n::I18N;

/// Attribute names addressing structured fields in `edit`.
const ATTR_NAME: &str = "name";
const ATTR_DESCRIPTION: &str = "description";
const ATTR_LEVEL: &str = "level";
const ATTR_META: &str = "meta";

/// Default persona assumption lifetime.
pub const ASSUME_TTL: Duration = Duration::from_secs(3600);

/// Command handlers for the character surface.
pub struct CharactersService {
    store: Arc<dyn CharacterStore>,
    messenger: Arc<dyn Messenger>,
    roles: Arc<dyn ModeratorLookup>,
    personas: PersonaManager,
    i18n: I18N,
}

impl CharactersService {
    pub fn new(
        store: Arc<dyn CharacterStore>,
        messenger: Arc<dyn Messenger>,
        roles: Arc<dyn ModeratorLookup>,
    ) -> Self {
        let personas = PersonaManager::new(Arc::clone(&messenger));
        Self {
            store,
            messenger,
            roles,
            personas,
            i18n: I18N::default(),
        }
    }

    /// Swap the message catalog.
    pub fn with_catalog(mut self, i18n: I18N) -> Self {
        self.i18n = i18n;
        self
    }

    /// Session read access for the dispatch layer.
    pub fn personas(&self) -> &PersonaManager {
        &self.personas
    }

    /// List the character names owned by `user` (the author when omitted).
    pub async fn characters(
        &self,
        ctx: &CommandContext,
        user: Option<UserId>,
    ) -> Result<(), CharacterError> {
        let outcome = self.try_characters(ctx, user).await;
        self.finish(ctx, outcome).await
    }

    /// List every character name in the space, grouped by first letter.
    pub async fn allchars(&self, ctx: &CommandContext) -> Result<(), CharacterError> {
        let outcome = self.try_allchars(ctx).await;
        self.finish(ctx, outcome).await
    }

    /// Show one character's detail view.
    pub async fn show(&self, ctx: &CommandContext, name: &str) -> Result<(), CharacterError> {
        let outcome = self.try_show(ctx, name).await;
        self.finish(ctx, outcome).await
    }

    /// Run the creation dialogue for a new character.
    ///
    /// Creating on behalf of another member requires moderator rights.
    pub async fn create(
        &self,
        ctx: &CommandContext,
        name: &str,
        target: Option<UserId>,
    ) -> Result<(), CharacterError> {
        let outcome = self.try_create(ctx, name, target).await;
        self.finish(ctx, outcome).await
    }

    /// Remove a character (owner or moderator only).
    pub async fn delete(&self, ctx: &CommandContext, name: &str) -> Result<(), CharacterError> {
        let outcome = self.try_delete(ctx, name).await;
        self.finish(ctx, outcome).await
    }

    /// Edit a single attribute of a character.
    ///
    /// `name`, `description`, `level` and `meta` address the structured
    /// fields; `meta` replaces the whole attribute bag from a parsed block.
    /// Any other attribute name sets that single key in the bag.
    pub async fn edit(
        &self,
        ctx: &CommandContext,
        name: &str,
        attribute: &str,
        value: &str,
    ) -> Result<(), CharacterError> {
        let outcome = self.try_edit(ctx, name, attribute, value).await;
        self.finish(ctx, outcome).await
    }

    /// Remove one key from a character's attribute bag.
    pub async fn remove_attribute(
        &self,
        ctx: &CommandContext,
        name: &str,
        attribute: &str,
    ) -> Result<(), CharacterError> {
        let outcome = self.try_remove_attribute(ctx, name, attribute).await;
        self.finish(ctx, outcome).await
    }

    /// Start a one-hour persona session as `name`.
    pub async fn assume(&self, ctx: &CommandContext, name: &str) -> Result<(), CharacterError> {
        let outcome = self.try_assume(ctx, name).await;
        self.finish(ctx, outcome).await
    }

    /// Immediately end a persona session as `name`.
    pub async fn unassume(&self, ctx: &CommandContext, name: &str) -> Result<(), CharacterError> {
        let outcome = self.try_unassume(ctx, name).await;
        self.finish(ctx, outcome).await
    }

    // ------------------------------------------------------------------
    // Command bodies
    // ------------------------------------------------------------------

    async fn try_characters(
        &self,
        ctx: &CommandContext,
        user: Option<UserId>,
    ) -> Result<(), CharacterError> {
        let space = ctx.space()?;
        let user = user.unwrap_or(ctx.author);
        let all = self.store.get_characters(space).await?;
        let mut names: Vec<&str> = all
            .values()
            .filter(|character| character.owner == user)
            .map(|character| character.name.as_str())
            .collect();
        if names.is_empty() {
            let text = I18N::format(
                &self.i18n.characters("no_characters"),
                &[&user.to_string()],
            );
            return self.send(ctx, &text).await;
        }
        names.sort_unstable();
        let message =
            StructuredMessage::with_description(names.join("\n")).author(user.to_string());
        self.messenger.send_structured(ctx.channel, message).await?;
        Ok(())
    }

    async fn try_allchars(&self, ctx: &CommandContext) -> Result<(), CharacterError> {
        let space = ctx.space()?;
        let all = self.store.get_characters(space).await?;
        if all.is_empty() {
            return self
                .send(ctx, &self.i18n.characters("no_characters_in_space"))
                .await;
        }

        let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for name in all.keys() {
            let initial = name
                .chars()
                .next()
                .map(|c| c.to_lowercase().to_string())
                .unwrap_or_default();
            groups.entry(initial).or_default().push(name.clone());
        }

        let mut message = StructuredMessage::default();
        for (initial, mut names) in groups {
            names.sort_unstable();
            message = message.field(initial.to_uppercase(), names.join("\n"));
        }
        self.messenger.send_structured(ctx.channel, message).await?;
        Ok(())
    }

    async fn try_show(&self, ctx: &CommandContext, name: &str) -> Result<(), CharacterError> {
        let space = ctx.space()?;
        let all = self.store.get_characters(space).await?;
        let character = Self::find(&all, name)?;

        let mut message = StructuredMessage::with_description(character.description.clone())
            .author(character.name.clone())
            .field(self.i18n.fields("name"), character.name.clone())
            .field(self.i18n.fields("owner"), character.owner.to_string());
        if let Some(image) = character.meta.get(IMAGE_KEY) {
            message = message.thumbnail(image.clone());
        }
        if let Some(level) = character.level {
            message = message.field(self.i18n.fields("level"), level.to_string());
        }

        let team = self.store.get_team(space, name).await?;
        let team_text = if team.is_empty() {
            self.i18n.characters("empty_team")
        } else {
            team.iter()
                .map(|entry| format!("{} ({})", entry.name, entry.kind))
                .collect::<Vec<_>>()
                .join("\n")
        };
        message = message.field(self.i18n.fields("team"), team_text);

        let mut meta_lines: Vec<String> = character
            .meta
            .iter()
            .map(|(key, value)| format!("**{key}:** {value}"))
            .collect();
        meta_lines.sort_unstable();
        let additional = meta_lines.join("\n");
        if !additional.trim().is_empty() {
            message = message.field(self.i18n.fields("additional_info"), additional);
        }

        self.messenger.send_structured(ctx.channel, message).await?;
        Ok(())
    }

    async fn try_create(
        &self,
        ctx: &CommandContext,
        name: &str,
        target: Option<UserId>,
    ) -> Result<(), CharacterError> {
        let space = ctx.space()?;
        let owner = target.unwrap_or(ctx.author);
        if owner != ctx.author
            && !resolve_moderator(self.roles.as_ref(), ctx.author, space).await
        {
            return Err(CharacterError::validation(
                self.i18n.errors("create_for_others"),
            ));
        }

        let existing = self.store.get_characters(space).await?;
        if existing.contains_key(name) {
            return Err(CharacterError::validation(
                self.i18n.errors("already_exists"),
            ));
        }

        let filter = MessageFilter {
            channel: ctx.channel,
            author: ctx.author,
        };
        let dialogue = CreationDialogue::new(self.messenger.as_ref(), &self.i18n, filter);
        match dialogue.run(Character::new(name, owner)).await? {
            DialogueOutcome::Committed(character) => {
                self.store.add_character(space, character).await?;
                info!("character {name:?} created in space {space}");
                self.send(ctx, &self.i18n.characters("created")).await
            }
            // The dialogue already told the user why it ended.
            DialogueOutcome::Cancelled(_) => Ok(()),
        }
    }

    async fn try_delete(&self, ctx: &CommandContext, name: &str) -> Result<(), CharacterError> {
        let space = ctx.space()?;
        let all = self.store.get_characters(space).await?;
        let character = Self::find(&all, name)?;
        self.ensure_authorized(ctx, space, character).await?;

        self.store.remove_character(space, name).await?;
        info!("character {name:?} deleted from space {space}");
        self.send(ctx, &self.i18n.characters("deleted")).await
    }

    async fn try_edit(
        &self,
        ctx: &CommandContext,
        name: &str,
        attribute: &str,
        value: &str,
    ) -> Result<(), CharacterError> {
        let space = ctx.space()?;
        let all = self.store.get_characters(space).await?;
        let character = Self::find(&all, name)?;
        self.ensure_authorized(ctx, space, character).await?;

        if attribute == ATTR_DESCRIPTION {
            if value.len() > MAX_DESCRIPTION {
                return Err(CharacterError::validation(
                    self.i18n.errors("description_too_long"),
                ));
            }
        } else if attribute.len() + value.len() > MAX_ATTRIBUTE {
            return Err(CharacterError::validation(
                self.i18n.errors("attribute_too_long"),
            ));
        }

        if attribute == ATTR_NAME {
            // One atomic move in the store; no remove-then-insert window.
            self.store.rename_character(space, name, value).await?;
            info!("character {name:?} renamed to {value:?} in space {space}");
            return self.send(ctx, &self.i18n.characters("edited")).await;
        }

        let mut character = character.clone();
        match attribute {
            ATTR_DESCRIPTION => character.description = value.to_string(),
            ATTR_LEVEL => {
                let level = value.trim().parse::<i64>().map_err(|_| {
                    CharacterError::validation(self.i18n.errors("invalid_level"))
                })?;
                character.level = Some(level);
            }
            // Full overwrite of the bag, unlike creation's merge.
            ATTR_META => character.meta = parse_attributes(value)?,
            other => {
                character.meta.insert(other.to_string(), value.to_string());
            }
        }

        self.store.add_character(space, character).await?;
        self.send(ctx, &self.i18n.characters("edited")).await
    }

    async fn try_remove_attribute(
        &self,
        ctx: &CommandContext,
        name: &str,
        attribute: &str,
    ) -> Result<(), CharacterError> {
        let space = ctx.space()?;
        let all = self.store.get_characters(space).await?;
        let character = Self::find(&all, name)?;
        self.ensure_authorized(ctx, space, character).await?;

        let mut character = character.clone();
        if character.meta.remove(attribute).is_none() {
            return Err(CharacterError::UnknownAttribute {
                name: attribute.to_string(),
            });
        }
        self.store.add_character(space, character).await?;
        self.send(ctx, &self.i18n.characters("attribute_removed")).await
    }

    async fn try_assume(&self, ctx: &CommandContext, name: &str) -> Result<(), CharacterError> {
        let space = ctx.space()?;
        let all = self.store.get_characters(space).await?;
        let character = Self::find(&all, name)?;
        self.ensure_authorized(ctx, space, character).await?;

        self.personas
            .assume(space, ctx.author, name, ASSUME_TTL)
            .await?;
        let text = I18N::format(&self.i18n.characters("assumed"), &[name]);
        self.send(ctx, &text).await
    }

    async fn try_unassume(&self, ctx: &CommandContext, name: &str) -> Result<(), CharacterError> {
        let space = ctx.space()?;
        self.personas.release(space, ctx.author, name).await?;
        self.send(ctx, &self.i18n.characters("unassumed")).await
    }

    // ------------------------------------------------------------------
    // Shared plumbing
    // ------------------------------------------------------------------

    fn find<'a>(
        all: &'a HashMap<String, Character>,
        name: &str,
    ) -> Result<&'a Character, CharacterError> {
        all.get(name).ok_or_else(|| CharacterError::NotFound {
            name: name.to_string(),
        })
    }

    /// Owner-or-moderator gate; the moderator lookup fails closed.
    async fn ensure_authorized(
        &self,
        ctx: &CommandContext,
        space: SpaceId,
        character: &Character,
    ) -> Result<(), CharacterError> {
        let is_moderator = resolve_moderator(self.roles.as_ref(), ctx.author, space).await;
        if can_mutate(character, ctx.author, is_moderator) {
            Ok(())
        } else {
            Err(CharacterError::Unauthorized)
        }
    }

    /// Resolve a command body's outcome: recoverable errors become exactly
    /// one explanatory message, collaborator faults propagate.
    async fn finish(
        &self,
        ctx: &CommandContext,
        outcome: Result<(), CharacterError>,
    ) -> Result<(), CharacterError> {
        let err = match outcome {
            Ok(()) => return Ok(()),
            Err(err) => err,
        };
        let text = match err {
            CharacterError::Validation { message } => message,
            CharacterError::NotFound { name } => {
                I18N::format(&self.i18n.errors("character_not_found"), &[&name])
            }
            CharacterError::UnknownAttribute { .. } => self.i18n.errors("attribute_not_found"),
            CharacterError::Unauthorized => self.i18n.errors("not_owner"),
            CharacterError::PrivateChannel => self.i18n.errors("server_only"),
            CharacterError::DialogueTimeout => self.i18n.characters("dialogue_timed_out"),
            err @ CharacterError::Collaborator(_) => return Err(err),
        };
        self.send(ctx, &text).await
    }

    async fn send(&self, ctx: &CommandContext, text: &str) -> Result<(), CharacterError> {
        self.messenger.send_text(ctx.channel, text).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::{ChannelId, InMemoryCharacterStore};
    use crate::testing::{FailingRoles, ScriptedMessenger, StaticRoles};

    const SPACE: SpaceId = SpaceId(1);
    const CHANNEL: ChannelId = ChannelId(5);
    const OWNER: UserId = UserId(10);
    const OTHER: UserId = UserId(20);

    struct Fixture {
        service: CharactersService,
        store: Arc<InMemoryCharacterStore>,
        messenger: Arc<ScriptedMessenger>,
    }

    fn fixture(roles: Arc<dyn ModeratorLookup>) -> Fixture {
        let store = Arc::new(InMemoryCharacterStore::new());
        let messenger = Arc::new(ScriptedMessenger::new());
        let service = CharactersService::new(store.clone(), messenger.clone(), roles);
        Fixture {
            service,
            store,
            messenger,
        }
    }

    fn member_ctx(author: UserId) -> CommandContext {
        CommandContext::in_space(SPACE, CHANNEL, author)
    }

    async fn seed_kevin(fix: &Fixture) {
        let mut kevin = Character::new("Kevin", OWNER);
        kevin.description = "A brave knight".to_string();
        fix.store.add_character(SPACE, kevin).await.unwrap();
    }

    fn reply(fix: &Fixture, author: UserId, content: &str) {
        fix.messenger.script_reply(CHANNEL, author, content);
    }

    #[tokio::test]
    async fn test_private_context_is_rejected() {
        let fix = fixture(Arc::new(StaticRoles(false)));
        let ctx = CommandContext::private(CHANNEL, OWNER);
        fix.service.characters(&ctx, None).await.unwrap();

        let texts = fix.messenger.texts_sent();
        assert_eq!(texts.len(), 1);
        assert!(texts[0].contains("multi-user space"));
    }

    #[tokio::test]
    async fn test_characters_lists_only_own_names() {
        let fix = fixture(Arc::new(StaticRoles(false)));
        seed_kevin(&fix).await;
        fix.store
            .add_character(SPACE, Character::new("Morgana", OTHER))
            .await
            .unwrap();

        fix.service.characters(&member_ctx(OWNER), None).await.unwrap();

        let structured = fix.messenger.structured_sent();
        assert_eq!(structured.len(), 1);
        assert_eq!(structured[0].description, "Kevin");
    }

    #[tokio::test]
    async fn test_characters_empty_sends_notice() {
        let fix = fixture(Arc::new(StaticRoles(false)));
        fix.service.characters(&member_ctx(OWNER), None).await.unwrap();

        let texts = fix.messenger.texts_sent();
        assert!(texts[0].contains("has no characters"));
    }

    #[tokio::test]
    async fn test_allchars_groups_by_first_letter() {
        let fix = fixture(Arc::new(StaticRoles(false)));
        seed_kevin(&fix).await;
        fix.store
            .add_character(SPACE, Character::new("kira", OTHER))
            .await
            .unwrap();
        fix.store
            .add_character(SPACE, Character::new("Morgana", OTHER))
            .await
            .unwrap();

        fix.service.allchars(&member_ctx(OWNER)).await.unwrap();

        let structured = fix.messenger.structured_sent();
        let message = &structured[0];
        assert_eq!(message.fields.len(), 2);
        assert_eq!(message.fields[0].name, "K");
        assert_eq!(message.fields[0].value, "Kevin\nkira");
        assert_eq!(message.fields[1].name, "M");
        assert_eq!(message.fields[1].value, "Morgana");
    }

    #[tokio::test]
    async fn test_show_unknown_character() {
        let fix = fixture(Arc::new(StaticRoles(false)));
        fix.service.show(&member_ctx(OWNER), "Nobody").await.unwrap();

        let texts = fix.messenger.texts_sent();
        assert!(texts[0].contains("Nobody does not exist"));
    }

    #[tokio::test]
    async fn test_show_renders_detail_view() {
        let fix = fixture(Arc::new(StaticRoles(false)));
        seed_kevin(&fix).await;
        fix.service
            .edit(&member_ctx(OWNER), "Kevin", "image", "http://img/kevin.png")
            .await
            .unwrap();

        fix.service.show(&member_ctx(OWNER), "Kevin").await.unwrap();

        let structured = fix.messenger.structured_sent();
        let message = &structured[0];
        assert_eq!(message.description, "A brave knight");
        assert_eq!(message.thumbnail.as_deref(), Some("http://img/kevin.png"));
        let field_names: Vec<&str> =
            message.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(field_names, ["Name", "Owner", "Team", "Additional Info"]);
        assert_eq!(message.fields[2].value, "Empty");
    }

    #[tokio::test]
    async fn test_show_renders_team_entries() {
        let fix = fixture(Arc::new(StaticRoles(false)));
        seed_kevin(&fix).await;
        fix.store.set_team(
            SPACE,
            "Kevin",
            vec![crate::characters::TeamEntry {
                name: "Pidgey".to_string(),
                kind: "bird".to_string(),
            }],
        );

        fix.service.show(&member_ctx(OWNER), "Kevin").await.unwrap();

        let structured = fix.messenger.structured_sent();
        let team = structured[0]
            .fields
            .iter()
            .find(|f| f.name == "Team")
            .unwrap();
        assert_eq!(team.value, "Pidgey (bird)");
    }

    #[tokio::test]
    async fn test_create_then_edit_level_then_show() {
        // The end-to-end walk: create Kevin, set level 5, check the view.
        let fix = fixture(Arc::new(StaticRoles(false)));
        let ctx = member_ctx(OWNER);
        reply(&fix, OWNER, "A brave knight");
        reply(&fix, OWNER, "done");
        reply(&fix, OWNER, "skip");

        fix.service.create(&ctx, "Kevin", None).await.unwrap();
        fix.service.edit(&ctx, "Kevin", "level", "5").await.unwrap();
        fix.service.show(&ctx, "Kevin").await.unwrap();

        let all = fix.store.get_characters(SPACE).await.unwrap();
        assert_eq!(all["Kevin"].level, Some(5));

        let structured = fix.messenger.structured_sent();
        let message = &structured[0];
        let level = message.fields.iter().find(|f| f.name == "Level").unwrap();
        assert_eq!(level.value, "5");
        // No meta entries, so no additional-info section.
        assert!(!message.fields.iter().any(|f| f.name == "Additional Info"));
    }

    #[tokio::test]
    async fn test_create_duplicate_name_is_rejected() {
        let fix = fixture(Arc::new(StaticRoles(false)));
        seed_kevin(&fix).await;

        fix.service
            .create(&member_ctx(OWNER), "Kevin", None)
            .await
            .unwrap();

        let texts = fix.messenger.texts_sent();
        assert!(texts[0].contains("already exists"));
    }

    #[tokio::test]
    async fn test_create_for_other_requires_moderator() {
        let fix = fixture(Arc::new(StaticRoles(false)));
        fix.service
            .create(&member_ctx(OWNER), "Kevin", Some(OTHER))
            .await
            .unwrap();

        let texts = fix.messenger.texts_sent();
        assert!(texts[0].contains("Only moderators"));
        assert!(fix
            .store
            .get_characters(SPACE)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_moderator_creates_for_other() {
        let fix = fixture(Arc::new(StaticRoles(true)));
        reply(&fix, OWNER, "done");
        reply(&fix, OWNER, "skip");

        fix.service
            .create(&member_ctx(OWNER), "Kevin", Some(OTHER))
            .await
            .unwrap();

        let all = fix.store.get_characters(SPACE).await.unwrap();
        assert_eq!(all["Kevin"].owner, OTHER);
    }

    #[tokio::test]
    async fn test_cancelled_creation_persists_nothing() {
        let fix = fixture(Arc::new(StaticRoles(false)));
        reply(&fix, OWNER, "done");
        reply(&fix, OWNER, "cancel");

        fix.service
            .create(&member_ctx(OWNER), "Kevin", None)
            .await
            .unwrap();

        assert!(fix.store.get_characters(SPACE).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_timed_out_creation_persists_nothing() {
        let fix = fixture(Arc::new(StaticRoles(false)));
        // No scripted replies at all: the first wait times out.

        fix.service
            .create(&member_ctx(OWNER), "Kevin", None)
            .await
            .unwrap();

        assert!(fix.store.get_characters(SPACE).await.unwrap().is_empty());
        let texts = fix.messenger.texts_sent();
        assert!(texts.iter().any(|t| t.contains("timed out")));
    }

    #[tokio::test]
    async fn test_invalid_level_in_creation_persists_nothing() {
        let fix = fixture(Arc::new(StaticRoles(false)));
        reply(&fix, OWNER, "done");
        reply(&fix, OWNER, "level: over 9000");

        fix.service
            .create(&member_ctx(OWNER), "Kevin", None)
            .await
            .unwrap();

        assert!(fix.store.get_characters(SPACE).await.unwrap().is_empty());
        let texts = fix.messenger.texts_sent();
        assert!(texts.iter().any(|t| t.contains("whole number")));
    }

    #[tokio::test]
    async fn test_delete_by_non_owner_is_denied() {
        let fix = fixture(Arc::new(StaticRoles(false)));
        seed_kevin(&fix).await;

        fix.service.delete(&member_ctx(OTHER), "Kevin").await.unwrap();

        assert!(fix
            .store
            .get_characters(SPACE)
            .await
            .unwrap()
            .contains_key("Kevin"));
        let texts = fix.messenger.texts_sent();
        assert!(texts[0].contains("do not own"));
    }

    #[tokio::test]
    async fn test_delete_by_moderator_succeeds() {
        let fix = fixture(Arc::new(StaticRoles(true)));
        seed_kevin(&fix).await;

        fix.service.delete(&member_ctx(OTHER), "Kevin").await.unwrap();
        assert!(fix.store.get_characters(SPACE).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_faulting_role_lookup_never_aborts_owner_command() {
        let fix = fixture(Arc::new(FailingRoles));
        seed_kevin(&fix).await;

        fix.service.delete(&member_ctx(OWNER), "Kevin").await.unwrap();
        assert!(fix.store.get_characters(SPACE).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_faulting_role_lookup_denies_non_owner() {
        let fix = fixture(Arc::new(FailingRoles));
        seed_kevin(&fix).await;

        fix.service.delete(&member_ctx(OTHER), "Kevin").await.unwrap();
        assert!(fix
            .store
            .get_characters(SPACE)
            .await
            .unwrap()
            .contains_key("Kevin"));
    }

    #[tokio::test]
    async fn test_edit_meta_replaces_whole_bag() {
        let fix = fixture(Arc::new(StaticRoles(false)));
        seed_kevin(&fix).await;
        let ctx = member_ctx(OWNER);
        fix.service
            .edit(&ctx, "Kevin", "hair_color", "blond")
            .await
            .unwrap();
        fix.service
            .edit(&ctx, "Kevin", "meta", "nickname: Kev")
            .await
            .unwrap();

        let all = fix.store.get_characters(SPACE).await.unwrap();
        let meta = &all["Kevin"].meta;
        assert_eq!(meta.len(), 1);
        assert_eq!(meta["nickname"], "Kev");
        assert!(!meta.contains_key("hair_color"));
    }

    #[tokio::test]
    async fn test_edit_arbitrary_attribute_merges_single_key() {
        let fix = fixture(Arc::new(StaticRoles(false)));
        seed_kevin(&fix).await;
        let ctx = member_ctx(OWNER);
        fix.service
            .edit(&ctx, "Kevin", "hair_color", "blond")
            .await
            .unwrap();
        fix.service
            .edit(&ctx, "Kevin", "nickname", "Kev")
            .await
            .unwrap();

        let all = fix.store.get_characters(SPACE).await.unwrap();
        let meta = &all["Kevin"].meta;
        assert_eq!(meta["hair_color"], "blond");
        assert_eq!(meta["nickname"], "Kev");
    }

    #[tokio::test]
    async fn test_edit_invalid_meta_block_changes_nothing() {
        let fix = fixture(Arc::new(StaticRoles(false)));
        seed_kevin(&fix).await;
        let ctx = member_ctx(OWNER);
        fix.service
            .edit(&ctx, "Kevin", "hair_color", "blond")
            .await
            .unwrap();

        fix.service
            .edit(&ctx, "Kevin", "meta", "not a block")
            .await
            .unwrap();

        let all = fix.store.get_characters(SPACE).await.unwrap();
        assert_eq!(all["Kevin"].meta["hair_color"], "blond");
        let texts = fix.messenger.texts_sent();
        assert!(texts.iter().any(|t| t.contains("Invalid formatting")));
    }

    #[tokio::test]
    async fn test_edit_name_renames_record() {
        let fix = fixture(Arc::new(StaticRoles(false)));
        seed_kevin(&fix).await;

        fix.service
            .edit(&member_ctx(OWNER), "Kevin", "name", "Sir Kevin")
            .await
            .unwrap();

        let all = fix.store.get_characters(SPACE).await.unwrap();
        assert!(!all.contains_key("Kevin"));
        assert_eq!(all["Sir Kevin"].name, "Sir Kevin");
        assert_eq!(all["Sir Kevin"].description, "A brave knight");
    }

    #[tokio::test]
    async fn test_edit_level_rejects_non_numeric() {
        let fix = fixture(Arc::new(StaticRoles(false)));
        seed_kevin(&fix).await;

        fix.service
            .edit(&member_ctx(OWNER), "Kevin", "level", "over 9000")
            .await
            .unwrap();

        let all = fix.store.get_characters(SPACE).await.unwrap();
        assert_eq!(all["Kevin"].level, None);
        let texts = fix.messenger.texts_sent();
        assert!(texts[0].contains("whole number"));
    }

    #[tokio::test]
    async fn test_edit_description_length_limit() {
        let fix = fixture(Arc::new(StaticRoles(false)));
        seed_kevin(&fix).await;

        fix.service
            .edit(
                &member_ctx(OWNER),
                "Kevin",
                "description",
                &"x".repeat(MAX_DESCRIPTION + 1),
            )
            .await
            .unwrap();

        let all = fix.store.get_characters(SPACE).await.unwrap();
        assert_eq!(all["Kevin"].description, "A brave knight");
        let texts = fix.messenger.texts_sent();
        assert!(texts[0].contains("3500"));
    }

    #[tokio::test]
    async fn test_edit_attribute_length_limit() {
        let fix = fixture(Arc::new(StaticRoles(false)));
        seed_kevin(&fix).await;

        fix.service
            .edit(
                &member_ctx(OWNER),
                "Kevin",
                "nickname",
                &"x".repeat(MAX_ATTRIBUTE),
            )
            .await
            .unwrap();

        let all = fix.store.get_characters(SPACE).await.unwrap();
        assert!(all["Kevin"].meta.is_empty());
        let texts = fix.messenger.texts_sent();
        assert!(texts[0].contains("1024"));
    }

    #[tokio::test]
    async fn test_remove_attribute() {
        let fix = fixture(Arc::new(StaticRoles(false)));
        seed_kevin(&fix).await;
        let ctx = member_ctx(OWNER);
        fix.service
            .edit(&ctx, "Kevin", "hair_color", "blond")
            .await
            .unwrap();

        fix.service
            .remove_attribute(&ctx, "Kevin", "hair_color")
            .await
            .unwrap();

        let all = fix.store.get_characters(SPACE).await.unwrap();
        assert!(all["Kevin"].meta.is_empty());
    }

    #[tokio::test]
    async fn test_remove_missing_attribute() {
        let fix = fixture(Arc::new(StaticRoles(false)));
        seed_kevin(&fix).await;

        fix.service
            .remove_attribute(&member_ctx(OWNER), "Kevin", "hair_color")
            .await
            .unwrap();

        let texts = fix.messenger.texts_sent();
        assert!(texts[0].contains("doesn't exist"));
    }

    #[tokio::test]
    async fn test_assume_requires_ownership() {
        let fix = fixture(Arc::new(StaticRoles(false)));
        seed_kevin(&fix).await;

        fix.service.assume(&member_ctx(OTHER), "Kevin").await.unwrap();

        assert!(fix.service.personas().current(SPACE, OTHER).is_none());
        let texts = fix.messenger.texts_sent();
        assert!(texts[0].contains("do not own"));
    }

    #[tokio::test]
    async fn test_assume_and_unassume_roundtrip() {
        let fix = fixture(Arc::new(StaticRoles(false)));
        seed_kevin(&fix).await;
        let ctx = member_ctx(OWNER);

        fix.service.assume(&ctx, "Kevin").await.unwrap();
        assert_eq!(
            fix.service.personas().current(SPACE, OWNER).unwrap().character,
            "Kevin"
        );
        assert_eq!(fix.messenger.alias_names(SPACE), vec!["Kevin".to_string()]);

        fix.service.unassume(&ctx, "Kevin").await.unwrap();
        assert!(fix.service.personas().current(SPACE, OWNER).is_none());
        assert!(fix.messenger.alias_names(SPACE).is_empty());

        let texts = fix.messenger.texts_sent();
        assert!(texts.iter().any(|t| t.contains("You are now Kevin")));
        assert!(texts.iter().any(|t| t.contains("unassumed")));
    }
}
