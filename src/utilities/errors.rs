//! Error types for the character service.

use thiserror::Error;

/// Failure taxonomy for character operations.
///
/// `Validation`, `NotFound`, `UnknownAttribute` and `Unauthorized` are
/// user-correctable and terminal for the current command only; none of them
/// ever leaves persisted state changed. `Collaborator` wraps opaque faults
/// from the storage or messaging side and propagates to the dispatch layer.
#[derive(Debug, Error)]
pub enum CharacterError {
    /// Length or format violation; the user can correct and retry.
    #[error("{message}")]
    Validation { message: String },

    /// No character with this name exists in the space.
    #[error("character not found: {name}")]
    NotFound { name: String },

    /// No such key in the character's attribute bag.
    #[error("attribute not found: {name}")]
    UnknownAttribute { name: String },

    /// Acting user is neither the owner nor a moderator.
    #[error("not authorized to modify this character")]
    Unauthorized,

    /// Command was invoked outside a multi-user space.
    #[error("command requires a multi-user space")]
    PrivateChannel,

    /// A dialogue wait window elapsed with no reply.
    #[error("timed out waiting for a reply")]
    DialogueTimeout,

    /// Fault in an external collaborator (storage, messaging).
    #[error(transparent)]
    Collaborator(#[from] anyhow::Error),
}

impl CharacterError {
    /// Shorthand for a validation failure.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}
