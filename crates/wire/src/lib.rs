//! JSON wire/boundary support for the clinic queue service.
//!
//! This crate provides **wire models** and **translation helpers** for everything the queue
//! service sends or receives over HTTP:
//! - queue entries and counter states
//! - the "now serving" board
//! - error bodies
//!
//! Wire structs are strict (`#[serde(deny_unknown_fields)]`) and carry identifiers as
//! canonical strings. Translation into `queue-core` types is where identifiers, numbers and
//! display text are validated, so a payload that parses here is safe to hand to the
//! serving controller.

pub mod counter;
pub mod display;
pub mod entry;
pub mod error;

pub use counter::{
    counter_from_wire, counter_to_wire, CounterListWire, CounterStateWire, ServingWire,
    WaitingListWire,
};
pub use display::{board_from_wire, board_to_wire, BoardWire, CounterDisplayWire};
pub use entry::{
    entry_from_wire, entry_to_wire, EntryListWire, EntryStatusWire, PatientWire, PriorityWire,
    QueueEntryWire,
};
pub use error::{error_from_wire, error_to_wire, ErrorWire};

use queue_types::{CounterId, EntryId, NonEmptyText, QueueNumber};
use serde::de::DeserializeOwned;

/// Errors returned by the `queue-wire` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("translation error: {0}")]
    Translation(String),

    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

/// Type alias for Results that can fail with a [`WireError`].
pub type WireResult<T> = Result<T, WireError>;

/// Parse JSON text into a wire struct.
///
/// This uses `serde_path_to_error` to surface the path (e.g. `entries[2].status`) of the
/// failing field when the JSON does not match the wire schema. `what` names the payload in
/// the error message.
///
/// # Errors
///
/// Returns [`WireError::Translation`] if the JSON is malformed, has an unexpected type, or
/// contains unknown keys.
pub fn parse_json<T: DeserializeOwned>(what: &str, json_text: &str) -> WireResult<T> {
    let mut deserializer = serde_json::Deserializer::from_str(json_text);
    serde_path_to_error::deserialize::<_, T>(&mut deserializer).map_err(|err| {
        let path = err.path().to_string();
        let source = err.into_inner();
        let path = if path.is_empty() || path == "." {
            "<root>"
        } else {
            path.as_str()
        };
        WireError::Translation(format!("{what} schema mismatch at {path}: {source}"))
    })
}

/// Same as [`parse_json`] for a raw response or request body.
pub fn parse_json_bytes<T: DeserializeOwned>(what: &str, body: &[u8]) -> WireResult<T> {
    let text = std::str::from_utf8(body)
        .map_err(|e| WireError::InvalidInput(format!("{what} is not UTF-8: {e}")))?;
    parse_json(what, text)
}

pub(crate) fn parse_entry_id(field: &str, value: &str) -> WireResult<EntryId> {
    EntryId::parse(value).map_err(|_| WireError::InvalidId(format!("{field}: {value}")))
}

pub(crate) fn parse_counter_id(field: &str, value: &str) -> WireResult<CounterId> {
    CounterId::parse(value).map_err(|_| WireError::InvalidId(format!("{field}: {value}")))
}

pub(crate) fn parse_number(field: &str, value: u32) -> WireResult<QueueNumber> {
    QueueNumber::new(value).map_err(|_| WireError::InvalidInput(format!("{field} must be positive")))
}

pub(crate) fn parse_text(field: &str, value: &str) -> WireResult<NonEmptyText> {
    NonEmptyText::new(value).map_err(|_| WireError::InvalidInput(format!("{field} cannot be empty")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_json_is_a_translation_error() {
        let err = parse_json::<EntryListWire>("entry list", "{not json").expect_err("malformed");
        match err {
            WireError::Translation(msg) => assert!(msg.starts_with("entry list schema mismatch")),
            other => panic!("expected Translation error, got {other:?}"),
        }
    }

    #[test]
    fn non_utf8_body_is_invalid_input() {
        let err = parse_json_bytes::<EntryListWire>("entry list", &[0xff, 0xfe]).expect_err("bytes");
        assert!(matches!(err, WireError::InvalidInput(_)));
    }
}
