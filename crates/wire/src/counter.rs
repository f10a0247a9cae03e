//! Counter state wire models and translation helpers.
//!
//! Notes:
//! - `current_entry_id` and `current_number` are either both present or both absent
//! - `waiting_count` is informational; clients derive it from the waiting list they fetch

use crate::entry::QueueEntryWire;
use crate::{parse_counter_id, parse_entry_id, parse_number, parse_text, WireError, WireResult};
use queue_core::CounterState;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Wire representation of one counter's serving state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CounterStateWire {
    pub id: String,
    pub title: String,
    pub counter_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_entry_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_called: Option<u32>,
    pub is_active: bool,
    pub waiting_count: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CounterListWire {
    pub counters: Vec<CounterStateWire>,
}

/// A counter's waiting sequence, head first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct WaitingListWire {
    pub counter_id: String,
    pub entries: Vec<QueueEntryWire>,
}

/// The entry a counter is serving; `entry` is absent when the counter is idle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ServingWire {
    pub counter_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<QueueEntryWire>,
}

pub fn counter_to_wire(counter: &CounterState, waiting_count: usize) -> CounterStateWire {
    CounterStateWire {
        id: counter.id().to_string(),
        title: counter.title().to_string(),
        counter_number: counter.counter_number(),
        current_entry_id: counter.current_entry().map(|id| id.to_string()),
        current_number: counter.current_number().map(|n| n.get()),
        last_called: counter.last_called().map(|n| n.get()),
        is_active: counter.is_active(),
        waiting_count,
    }
}

/// Convert a wire counter into a domain [`CounterState`].
///
/// # Errors
///
/// Returns [`WireError`] if an identifier is not canonical, the title is blank, a number is
/// zero, or only one of `current_entry_id`/`current_number` is present.
pub fn counter_from_wire(wire: CounterStateWire) -> WireResult<CounterState> {
    let id = parse_counter_id("id", &wire.id)?;
    let title = parse_text("title", &wire.title)?;

    let current = match (wire.current_entry_id.as_deref(), wire.current_number) {
        (Some(entry_id), Some(number)) => Some((
            parse_entry_id("current_entry_id", entry_id)?,
            parse_number("current_number", number)?,
        )),
        (None, None) => None,
        _ => {
            return Err(WireError::InvalidInput(format!(
                "counter {}: current_entry_id and current_number must be given together",
                wire.id
            )))
        }
    };
    let last_called = wire
        .last_called
        .map(|n| parse_number("last_called", n))
        .transpose()?;

    Ok(CounterState::restore(
        id,
        title,
        wire.counter_number,
        current,
        last_called,
        wire.is_active,
    ))
}
