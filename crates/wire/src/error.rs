//! Error body returned by the REST API.
//!
//! `kind` is the stable name from [`QueueError::kind`]; `message` is for people. The optional
//! fields carry the payload of the error so a client can rebuild the same [`QueueError`].

use crate::{parse_counter_id, parse_entry_id, parse_number};
use queue_core::QueueError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ErrorWire {
    pub kind: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counter_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

pub fn error_to_wire(err: &QueueError) -> ErrorWire {
    let mut wire = ErrorWire {
        kind: err.kind().to_string(),
        message: err.to_string(),
        counter_id: None,
        entry_id: None,
        number: None,
        detail: None,
    };
    match err {
        QueueError::EmptyQueue(id)
        | QueueError::CounterInactive(id)
        | QueueError::NothingServing(id)
        | QueueError::CounterNotFound(id)
        | QueueError::ActionInFlight(id) => wire.counter_id = Some(id.to_string()),
        QueueError::AlreadyServing { counter_id, number } => {
            wire.counter_id = Some(counter_id.to_string());
            wire.number = Some(number.get());
        }
        QueueError::NotFound(id) | QueueError::DuplicateId(id) => {
            wire.entry_id = Some(id.to_string())
        }
        QueueError::InvalidOrder(detail)
        | QueueError::InvalidTransition(detail)
        | QueueError::Superseded(detail)
        | QueueError::ServiceUnavailable(detail)
        | QueueError::InvalidInput(detail) => wire.detail = Some(detail.clone()),
    }
    wire
}

/// Rebuild a [`QueueError`] from an error body.
///
/// Bodies that are unknown or missing their payload become
/// [`QueueError::ServiceUnavailable`] carrying the message, so nothing is silently dropped.
pub fn error_from_wire(wire: ErrorWire) -> QueueError {
    let counter = || {
        wire.counter_id
            .as_deref()
            .and_then(|id| parse_counter_id("counter_id", id).ok())
    };
    let entry = || {
        wire.entry_id
            .as_deref()
            .and_then(|id| parse_entry_id("entry_id", id).ok())
    };
    let detail = || wire.detail.clone().unwrap_or_else(|| wire.message.clone());

    let rebuilt = match wire.kind.as_str() {
        "empty_queue" => counter().map(QueueError::EmptyQueue),
        "counter_inactive" => counter().map(QueueError::CounterInactive),
        "nothing_serving" => counter().map(QueueError::NothingServing),
        "counter_not_found" => counter().map(QueueError::CounterNotFound),
        "action_in_flight" => counter().map(QueueError::ActionInFlight),
        "already_serving" => counter().zip(
            wire.number
                .and_then(|n| parse_number("number", n).ok()),
        )
        .map(|(counter_id, number)| QueueError::AlreadyServing { counter_id, number }),
        "not_found" => entry().map(QueueError::NotFound),
        "duplicate_id" => entry().map(QueueError::DuplicateId),
        "invalid_order" => Some(QueueError::InvalidOrder(detail())),
        "invalid_transition" => Some(QueueError::InvalidTransition(detail())),
        "superseded" => Some(QueueError::Superseded(detail())),
        "service_unavailable" => Some(QueueError::ServiceUnavailable(detail())),
        "invalid_input" => Some(QueueError::InvalidInput(detail())),
        _ => None,
    };

    rebuilt.unwrap_or_else(|| {
        QueueError::ServiceUnavailable(format!("{}: {}", wire.kind, wire.message))
    })
}
