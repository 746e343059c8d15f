//! Embedded message catalog.
//!
//! The catalog is organized into sections:
//! - `characters`: command responses and dialogue prompts
//! - `errors`: rejection messages
//! - `fields`: field labels for the character detail view

/// Raw English catalog JSON, embedded at compile time.
///
/// Used by [`crate::utilities::i18n::I18N`] as the default catalog.
pub const EN_JSON: &str = include_str!("en.json");
