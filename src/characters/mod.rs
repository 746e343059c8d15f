//! The character data model.

pub mod attributes;
pub mod commands;
pub mod dialogue;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::interfaces::UserId;

/// Longest allowed character description.
pub const MAX_DESCRIPTION: usize = 3500;

/// Longest allowed combined `key` + `value` for one attribute entry.
pub const MAX_ATTRIBUTE: usize = 1024;

/// Meta key extracted into [`Character::level`] when a creation commits.
pub(crate) const LEVEL_KEY: &str = "level";

/// Meta key rendered as the thumbnail of the character detail view.
pub(crate) const IMAGE_KEY: &str = "image";

/// A role-play character owned by a member of a space.
///
/// Names are unique within a space, case-sensitive as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    /// The controlling user.
    pub owner: UserId,
    /// Free-form character sheet, at most [`MAX_DESCRIPTION`] characters.
    pub description: String,
    /// Tracked level; `None` means no level is tracked.
    pub level: Option<i64>,
    /// Free-form key/value attribute bag.
    pub meta: HashMap<String, String>,
    /// Ordered companion entries, supplied by the data-access collaborator.
    pub team: Vec<TeamEntry>,
}

impl Character {
    /// A blank character shell owned by `owner`.
    pub fn new(name: impl Into<String>, owner: UserId) -> Self {
        Self {
            name: name.into(),
            owner,
            description: String::new(),
            level: None,
            meta: HashMap::new(),
            team: Vec::new(),
        }
    }
}

/// One companion in a character's team, rendered as `name (kind)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamEntry {
    pub name: String,
    pub kind: String,
}
