//! Message catalog for user-facing text.
//!
//! Every string shown to a user is looked up by kind and key so that the
//! host can swap in a localized catalog. The default English catalog is
//! embedded at compile time.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::translations::EN_JSON;

/// Handles loading and retrieving localized messages.
///
/// Messages are stored in a nested map: `kind -> key -> template`.
#[derive(Debug, Clone)]
pub struct I18N {
    messages: HashMap<String, HashMap<String, String>>,
}

impl Default for I18N {
    fn default() -> Self {
        Self::embedded()
    }
}

impl I18N {
    /// Load the embedded English catalog.
    pub fn embedded() -> Self {
        let messages = serde_json::from_str(EN_JSON)
            .expect("embedded en.json message catalog is malformed");
        Self { messages }
    }

    /// Load a catalog from a JSON string with the same nested layout.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let messages = serde_json::from_str(json)?;
        Ok(Self { messages })
    }

    /// Retrieve a command response or dialogue prompt by key.
    pub fn characters(&self, key: &str) -> String {
        self.retrieve("characters", key)
    }

    /// Retrieve a rejection message by key.
    pub fn errors(&self, key: &str) -> String {
        self.retrieve("errors", key)
    }

    /// Retrieve a field label for the character detail view.
    pub fn fields(&self, key: &str) -> String {
        self.retrieve("fields", key)
    }

    /// Retrieve a message template by `kind` and `key`.
    ///
    /// # Panics
    /// Panics if the key is missing; the embedded catalog defines every key
    /// this crate uses, so a custom catalog must be a superset of it.
    pub fn retrieve(&self, kind: &str, key: &str) -> String {
        self.messages
            .get(kind)
            .and_then(|section| section.get(key))
            .cloned()
            .unwrap_or_else(|| panic!("message for '{kind}':'{key}' not found"))
    }

    /// Substitute `{}` placeholders in order of appearance.
    pub fn format(template: &str, args: &[&str]) -> String {
        let mut out = template.to_string();
        for arg in args {
            out = out.replacen("{}", arg, 1);
        }
        out
    }
}

/// Global cached catalog (embedded English).
static DEFAULT_I18N: Lazy<I18N> = Lazy::new(I18N::embedded);

/// Get the global cached catalog.
pub fn get_i18n() -> &'static I18N {
    &DEFAULT_I18N
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_catalog_loads() {
        let i18n = I18N::embedded();
        assert_eq!(i18n.characters("created"), "Character created!");
        assert!(i18n.errors("already_exists").contains("already exists"));
    }

    #[test]
    fn test_format_substitutes_in_order() {
        assert_eq!(
            I18N::format("You are now {} for the next hour", &["Kevin"]),
            "You are now Kevin for the next hour"
        );
        assert_eq!(I18N::format("{} and {}", &["a", "b"]), "a and b");
    }

    #[test]
    #[should_panic(expected = "not found")]
    fn test_missing_key_panics() {
        I18N::embedded().retrieve("characters", "no_such_key");
    }
}
