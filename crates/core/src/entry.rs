//! Queue entries: one patient ticket and its status.

use crate::constants::MAX_INITIALS;
use chrono::{DateTime, Utc};
use queue_types::{CounterId, EntryId, NonEmptyText, QueueNumber};
use std::fmt;

/// Lifecycle status of a queue entry.
///
/// ```text
/// waiting ──► serving ──► completed
///    ▲           │
///    │           ▼
///    └──────── skipped
/// ```
///
/// `completed` is terminal. A skipped entry sits at the tail of its counter's waiting
/// sequence and counts as waiting until it is recalled or reached by serve-next.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntryStatus {
    Waiting,
    Serving,
    Completed,
    Skipped,
}

impl EntryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryStatus::Waiting => "waiting",
            EntryStatus::Serving => "serving",
            EntryStatus::Completed => "completed",
            EntryStatus::Skipped => "skipped",
        }
    }

    /// True for entries that belong in a waiting sequence.
    pub fn is_waiting(self) -> bool {
        matches!(self, EntryStatus::Waiting | EntryStatus::Skipped)
    }

    /// Whether a direct transition from `self` to `next` is allowed.
    ///
    /// `skipped -> serving` is the recall path: the entry re-enters waiting and is served in
    /// the same step.
    pub fn can_transition_to(self, next: EntryStatus) -> bool {
        use EntryStatus::*;
        matches!(
            (self, next),
            (Waiting, Serving)
                | (Serving, Completed)
                | (Serving, Skipped)
                | (Skipped, Waiting)
                | (Skipped, Serving)
        )
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Triage priority. Does not affect automatic ordering; see [`crate::reorder::prioritised`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Priority {
    High,
    #[default]
    Normal,
    Low,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Normal => "normal",
            Priority::Low => "low",
        }
    }
}

/// Patient identification shown on counter cards and the sidebar.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatientRef {
    display_name: NonEmptyText,
    initials: String,
}

impl PatientRef {
    /// Creates a patient reference. When `initials` is missing or blank they are derived from
    /// the first letter of each word of the name, uppercased and capped at three letters.
    pub fn new(display_name: NonEmptyText, initials: Option<String>) -> Self {
        let initials = initials
            .map(|i| i.trim().to_string())
            .filter(|i| !i.is_empty())
            .unwrap_or_else(|| derive_initials(&display_name));
        Self {
            display_name,
            initials,
        }
    }

    pub fn display_name(&self) -> &NonEmptyText {
        &self.display_name
    }

    pub fn initials(&self) -> &str {
        &self.initials
    }
}

fn derive_initials(name: &NonEmptyText) -> String {
    name.words()
        .filter_map(|w| w.chars().find(|c| c.is_alphanumeric()))
        .flat_map(char::to_uppercase)
        .take(MAX_INITIALS)
        .collect()
}

/// One patient's ticket in the queue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueueEntry {
    pub id: EntryId,
    pub patient: PatientRef,
    pub queue_number: QueueNumber,
    pub status: EntryStatus,
    pub priority: Priority,
    pub counter_id: Option<CounterId>,
    pub checked_in_at: DateTime<Utc>,
}

impl QueueEntry {
    /// A freshly checked-in entry, waiting, stamped with the current time.
    pub fn check_in(
        patient: PatientRef,
        queue_number: QueueNumber,
        priority: Priority,
        counter_id: Option<CounterId>,
    ) -> Self {
        Self {
            id: EntryId::new(),
            patient,
            queue_number,
            status: EntryStatus::Waiting,
            priority,
            counter_id,
            checked_in_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> NonEmptyText {
        NonEmptyText::new(s).expect("non-empty")
    }

    #[test]
    fn initials_are_derived_when_missing() {
        let patient = PatientRef::new(name("mary anne o'neil jones"), None);
        assert_eq!(patient.initials(), "MAO");

        let patient = PatientRef::new(name("Bo"), Some("   ".into()));
        assert_eq!(patient.initials(), "B");
    }

    #[test]
    fn explicit_initials_are_kept() {
        let patient = PatientRef::new(name("Mary Jones"), Some(" MJ ".into()));
        assert_eq!(patient.initials(), "MJ");
    }

    #[test]
    fn transitions_follow_state_machine() {
        use EntryStatus::*;
        assert!(Waiting.can_transition_to(Serving));
        assert!(Serving.can_transition_to(Skipped));
        assert!(Skipped.can_transition_to(Waiting));
        assert!(Skipped.can_transition_to(Serving));
        assert!(Serving.can_transition_to(Completed));

        assert!(!Completed.can_transition_to(Waiting));
        assert!(!Completed.can_transition_to(Serving));
        assert!(!Waiting.can_transition_to(Completed));
        assert!(!Waiting.can_transition_to(Skipped));
    }

    #[test]
    fn skipped_counts_as_waiting() {
        assert!(EntryStatus::Skipped.is_waiting());
        assert!(EntryStatus::Waiting.is_waiting());
        assert!(!EntryStatus::Serving.is_waiting());
        assert!(!EntryStatus::Completed.is_waiting());
    }
}
