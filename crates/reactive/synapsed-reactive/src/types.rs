//! Core types for the reactive subjects

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Result type for reactive operations
pub type ReactiveResult<T> = Result<T, ReactiveError>;

/// Errors that can occur in reactive operations
///
/// Binding failures during [`next`](crate::Subjectable::next) are not errors:
/// a subscriber whose signature does not fit an emission is skipped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReactiveError {
    #[error("Invalid callback: {0}")]
    InvalidCallback(String),
    #[error("Subscription not found in subject: {0}")]
    UnknownSubscription(Token),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ReactiveError {
    pub fn invalid_callback<T: fmt::Display>(msg: T) -> Self {
        Self::InvalidCallback(msg.to_string())
    }

    pub fn invalid_config<T: fmt::Display>(msg: T) -> Self {
        Self::InvalidConfig(msg.to_string())
    }
}

/// Unique identifier for subjects
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Id(Uuid);

impl Id {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The id carried by the empty token; never handed out by [`Id::new`]
    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl Default for Id {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque handle for one registered callback.
///
/// A token pairs the id of the subject that minted it with a sequence number
/// taken from that subject's monotonic counter, so a token is never reused by
/// its subject and never matches a registration on another subject.
/// Sequence numbers start at 1; `Token::default()` is the empty token returned
/// conceptually alongside failed subscribe calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    subject: Id,
    seq: u64,
}

impl Token {
    pub(crate) fn new(subject: Id, seq: u64) -> Self {
        Self { subject, seq }
    }

    /// The sentinel "no subscription created"
    pub const fn empty() -> Self {
        Self {
            subject: Id::nil(),
            seq: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.seq == 0 && self.subject.is_nil()
    }

    /// Id of the subject that minted this token
    pub fn subject_id(&self) -> Id {
        self.subject
    }
}

impl Default for Token {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "<empty>")
        } else {
            write!(f, "{}#{}", self.subject, self.seq)
        }
    }
}
