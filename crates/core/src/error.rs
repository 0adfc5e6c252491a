use thiserror::Error;

use crate::session::SessionState;

/// A caller-supplied identifier failed format validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{field} must be between {min} and {max} characters")]
    Length {
        field: &'static str,
        min: usize,
        max: usize,
    },

    #[error("{0} contains invalid characters")]
    InvalidCharacters(&'static str),
}

/// An event was applied to a [`Session`](crate::Session) in a state that
/// does not accept it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("cannot {event} while {state}")]
    IllegalTransition {
        event: &'static str,
        state: SessionState,
    },
}
