//! Identifier and primitive types for the clinic queue workflow.
//!
//! Everything that crosses a boundary (CLI input, REST payload, server snapshot) is parsed into
//! one of these types first, so the rest of the workspace can assume it is well formed.
//!
//! ## Canonical identifier form
//! Entry and counter identifiers are UUIDs rendered as **32 lowercase hexadecimal characters**
//! (no hyphens), the same value `Uuid::new_v4().simple().to_string()` produces. Externally
//! supplied identifiers must already be canonical; uppercase or hyphenated forms are rejected
//! rather than normalised.
//!
//! ## Contents
//! - [`EntryId`] / [`CounterId`]: canonical identifiers
//! - [`QueueNumber`]: the positive ticket number shown to patients
//! - [`ActionStamp`]: monotonic stamp used to order operator actions (last writer wins)
//! - [`NonEmptyText`]: trimmed, non-empty display text

mod id;
mod number;
mod stamp;
mod text;

pub use id::{CounterId, EntryId, Uuid};
pub use number::QueueNumber;
pub use stamp::ActionStamp;
pub use text::NonEmptyText;

/// Error type for identifier and number parsing.
#[derive(Debug, thiserror::Error)]
pub enum IdError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type IdResult<T> = Result<T, IdError>;

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
}
