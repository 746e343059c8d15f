//! The attribute mini-language.
//!
//! Free-form attribute blocks are delimited `key: value` text, e.g.
//! `image: http://image.com/image.jpg, hair_color: blond, nickname: Kevin`.
//! Blocks containing a newline are split on newlines, otherwise on commas.

use std::collections::HashMap;

use crate::characters::MAX_ATTRIBUTE;
use crate::utilities::errors::CharacterError;
use crate::utilities::i18n::get_i18n;

/// Reserved key that is silently dropped rather than stored.
const RESERVED_MAPS: &str = "maps";

/// Separator between a key and its value within one segment.
const KEY_VALUE_SEP: &str = ": ";

/// Parse a block of attribute text into a key/value map.
///
/// Each segment is split on its first `": "`; both halves are trimmed. A
/// segment without the separator, or a pair whose combined key and value
/// length exceeds [`MAX_ATTRIBUTE`], fails the whole block; no pairs are
/// applied partially, the caller re-prompts instead. An empty block yields
/// an empty map.
pub fn parse_attributes(input: &str) -> Result<HashMap<String, String>, CharacterError> {
    let mut pairs = HashMap::new();
    if input.trim().is_empty() {
        return Ok(pairs);
    }

    let segments: Vec<&str> = if input.contains('\n') {
        input.split('\n').collect()
    } else {
        input.split(',').collect()
    };

    for segment in segments {
        let (key, value) = segment
            .split_once(KEY_VALUE_SEP)
            .ok_or_else(|| CharacterError::validation(get_i18n().errors("invalid_formatting")))?;
        let key = key.trim();
        let value = value.trim();
        if key.len() + value.len() > MAX_ATTRIBUTE {
            return Err(CharacterError::validation(
                get_i18n().errors("attribute_too_long"),
            ));
        }
        if key == RESERVED_MAPS {
            continue;
        }
        pairs.insert(key.to_string(), value.to_string());
    }

    Ok(pairs)
}
