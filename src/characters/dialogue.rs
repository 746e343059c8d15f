//! The multi-turn character creation dialogue.
//!
//! Two collection phases drive consecutive replies from exactly one user in
//! exactly one channel: first the free-form description, then the attribute
//! block. Every wait is bounded; a wait that elapses cancels the dialogue
//! with a message rather than faulting the command.

use std::collections::HashMap;
use std::time::Duration;

use log::debug;

use crate::characters::attributes::parse_attributes;
use crate::characters::{Character, LEVEL_KEY, MAX_DESCRIPTION};
use crate::interfaces::{MessageFilter, Messenger};
use crate::utilities::errors::CharacterError;
use crate::utilities::i18n::I18N;

/// How long each wait for the next reply lasts.
pub const REPLY_TIMEOUT: Duration = Duration::from_secs(300);

/// Token ending the description phase.
const DONE: &str = "done";
/// Token aborting the whole dialogue.
const CANCEL: &str = "cancel";
/// Token committing with no attributes.
const SKIP: &str = "skip";

/// Why a dialogue ended without committing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The user sent `cancel`.
    UserCancelled,
    /// A wait window elapsed with no reply.
    TimedOut,
}

/// Terminal state of a creation dialogue.
#[derive(Debug)]
pub enum DialogueOutcome {
    /// The dialogue finished; the character is ready to persist.
    Committed(Character),
    /// The dialogue was abandoned; nothing may be persisted.
    Cancelled(CancelReason),
}

/// Result of the attribute collection phase.
enum MetaPhase {
    Committed(HashMap<String, String>),
    Cancelled,
    TimedOut,
}

/// Drives the two-phase creation dialogue for one character shell.
pub struct CreationDialogue<'a> {
    messenger: &'a dyn Messenger,
    i18n: &'a I18N,
    filter: MessageFilter,
    timeout: Duration,
}

impl<'a> CreationDialogue<'a> {
    pub fn new(messenger: &'a dyn Messenger, i18n: &'a I18N, filter: MessageFilter) -> Self {
        Self {
            messenger,
            i18n,
            filter,
            timeout: REPLY_TIMEOUT,
        }
    }

    /// Override the per-wait timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Drive the dialogue to a terminal state.
    ///
    /// `character` is the shell built by the create command, name and owner
    /// already set. A commit fills in description, meta and level; any
    /// cancellation discards all collected state.
    pub async fn run(&self, mut character: Character) -> Result<DialogueOutcome, CharacterError> {
        match self.collect_description().await? {
            Some(description) => character.description = description,
            None => return self.cancel_timed_out().await,
        }

        match self.collect_meta().await? {
            MetaPhase::Committed(meta) => character.meta = meta,
            MetaPhase::Cancelled => {
                return Ok(DialogueOutcome::Cancelled(CancelReason::UserCancelled))
            }
            MetaPhase::TimedOut => return self.cancel_timed_out().await,
        }

        if let Some(raw) = character.meta.remove(LEVEL_KEY) {
            let level = raw
                .trim()
                .parse::<i64>()
                .map_err(|_| CharacterError::validation(self.i18n.errors("invalid_level")))?;
            character.level = Some(level);
        }

        debug!("creation dialogue committed for character {:?}", character.name);
        Ok(DialogueOutcome::Committed(character))
    }

    /// Description phase: accumulate replies until `done`.
    ///
    /// Returns `None` when a wait times out. A reply that would push the
    /// running total past [`MAX_DESCRIPTION`] is rejected with a warning
    /// and the phase keeps waiting.
    async fn collect_description(&self) -> Result<Option<String>, CharacterError> {
        self.send(&self.i18n.characters("describe_prompt")).await?;
        let mut buffer = String::new();
        loop {
            let content = match self.next_reply().await {
                Ok(content) => content,
                Err(CharacterError::DialogueTimeout) => return Ok(None),
                Err(other) => return Err(other),
            };
            if content.trim().eq_ignore_ascii_case(DONE) {
                return Ok(Some(buffer));
            }
            if buffer.len() + content.len() > MAX_DESCRIPTION {
                self.send(&self.i18n.errors("description_too_long")).await?;
                continue;
            }
            buffer.push_str(&content);
            buffer.push('\n');
        }
    }

    /// Attribute phase: one parsed block, `skip`, or `cancel`.
    ///
    /// A block the parser rejects sends the retry message and stays in the
    /// phase; it never aborts the dialogue.
    async fn collect_meta(&self) -> Result<MetaPhase, CharacterError> {
        self.send(&self.i18n.characters("meta_prompt")).await?;
        loop {
            let content = match self.next_reply().await {
                Ok(content) => content,
                Err(CharacterError::DialogueTimeout) => return Ok(MetaPhase::TimedOut),
                Err(other) => return Err(other),
            };
            let trimmed = content.trim();
            if trimmed.eq_ignore_ascii_case(CANCEL) {
                self.send(&self.i18n.characters("cancelling")).await?;
                return Ok(MetaPhase::Cancelled);
            }
            if trimmed.eq_ignore_ascii_case(SKIP) {
                self.send(&self.i18n.characters("skipping")).await?;
                return Ok(MetaPhase::Committed(HashMap::new()));
            }
            match parse_attributes(&content) {
                Ok(pairs) => return Ok(MetaPhase::Committed(pairs)),
                Err(CharacterError::Validation { message }) => {
                    self.send(&message).await?;
                }
                Err(other) => return Err(other),
            }
        }
    }

    /// The next matching reply, or [`CharacterError::DialogueTimeout`] when
    /// the wait window elapses. The phases convert that fault into a
    /// cancelled transition; it never escapes the dialogue.
    async fn next_reply(&self) -> Result<String, CharacterError> {
        let reply = self
            .messenger
            .wait_for_reply(self.filter, self.timeout)
            .await?;
        reply
            .map(|message| message.content)
            .ok_or(CharacterError::DialogueTimeout)
    }

    async fn cancel_timed_out(&self) -> Result<DialogueOutcome, CharacterError> {
        debug!("creation dialogue timed out waiting for {:?}", self.filter);
        self.send(&self.i18n.characters("dialogue_timed_out")).await?;
        Ok(DialogueOutcome::Cancelled(CancelReason::TimedOut))
    }

    async fn send(&self, text: &str) -> Result<(), CharacterError> {
        self.messenger.send_text(self.filter.channel, text).await?;
        Ok(())
    }
}
