//! Queue entry wire models and translation helpers.
//!
//! Responsibilities:
//! - Define the strict JSON shape of a queue entry
//! - Translate between [`QueueEntry`] and [`QueueEntryWire`]
//!
//! Timestamps travel as RFC 3339 strings in UTC.

use crate::{parse_counter_id, parse_entry_id, parse_number, parse_text, WireError, WireResult};
use chrono::{DateTime, SecondsFormat, Utc};
use queue_core::{EntryStatus, PatientRef, Priority, QueueEntry};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatusWire {
    Waiting,
    Serving,
    Completed,
    Skipped,
}

impl From<EntryStatus> for EntryStatusWire {
    fn from(status: EntryStatus) -> Self {
        match status {
            EntryStatus::Waiting => EntryStatusWire::Waiting,
            EntryStatus::Serving => EntryStatusWire::Serving,
            EntryStatus::Completed => EntryStatusWire::Completed,
            EntryStatus::Skipped => EntryStatusWire::Skipped,
        }
    }
}

impl From<EntryStatusWire> for EntryStatus {
    fn from(status: EntryStatusWire) -> Self {
        match status {
            EntryStatusWire::Waiting => EntryStatus::Waiting,
            EntryStatusWire::Serving => EntryStatus::Serving,
            EntryStatusWire::Completed => EntryStatus::Completed,
            EntryStatusWire::Skipped => EntryStatus::Skipped,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PriorityWire {
    High,
    #[default]
    Normal,
    Low,
}

impl From<Priority> for PriorityWire {
    fn from(priority: Priority) -> Self {
        match priority {
            Priority::High => PriorityWire::High,
            Priority::Normal => PriorityWire::Normal,
            Priority::Low => PriorityWire::Low,
        }
    }
}

impl From<PriorityWire> for Priority {
    fn from(priority: PriorityWire) -> Self {
        match priority {
            PriorityWire::High => Priority::High,
            PriorityWire::Normal => Priority::Normal,
            PriorityWire::Low => Priority::Low,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct PatientWire {
    pub display_name: String,
    pub initials: String,
}

/// Wire representation of a queue entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct QueueEntryWire {
    pub id: String,
    pub patient: PatientWire,
    pub queue_number: u32,
    pub status: EntryStatusWire,
    pub priority: PriorityWire,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counter_id: Option<String>,
    pub checked_in_at: String,
}

/// Entries that are not tied to one counter's sequence, e.g. the unassigned pool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct EntryListWire {
    pub entries: Vec<QueueEntryWire>,
}

pub fn entry_to_wire(entry: &QueueEntry) -> QueueEntryWire {
    QueueEntryWire {
        id: entry.id.to_string(),
        patient: PatientWire {
            display_name: entry.patient.display_name().to_string(),
            initials: entry.patient.initials().to_string(),
        },
        queue_number: entry.queue_number.get(),
        status: entry.status.into(),
        priority: entry.priority.into(),
        counter_id: entry.counter_id.map(|id| id.to_string()),
        checked_in_at: entry
            .checked_in_at
            .to_rfc3339_opts(SecondsFormat::Millis, true),
    }
}

/// Convert a wire entry into a domain [`QueueEntry`].
///
/// # Errors
///
/// Returns [`WireError`] if an identifier is not canonical, the queue number is zero, the
/// display name is blank, or `checked_in_at` is not RFC 3339.
pub fn entry_from_wire(wire: QueueEntryWire) -> WireResult<QueueEntry> {
    let id = parse_entry_id("id", &wire.id)?;
    let display_name = parse_text("patient.display_name", &wire.patient.display_name)?;
    let queue_number = parse_number("queue_number", wire.queue_number)?;
    let counter_id = wire
        .counter_id
        .as_deref()
        .map(|value| parse_counter_id("counter_id", value))
        .transpose()?;
    let checked_in_at = DateTime::parse_from_rfc3339(&wire.checked_in_at)
        .map_err(|e| {
            WireError::InvalidInput(format!(
                "checked_in_at is not RFC 3339 ({}): {e}",
                wire.checked_in_at
            ))
        })?
        .with_timezone(&Utc);

    Ok(QueueEntry {
        id,
        patient: PatientRef::new(display_name, Some(wire.patient.initials)),
        queue_number,
        status: wire.status.into(),
        priority: wire.priority.into(),
        counter_id,
        checked_in_at,
    })
}
