//! Per-counter serving state.

use crate::entry::QueueEntry;
use crate::{QueueError, QueueResult};
use queue_types::{CounterId, EntryId, NonEmptyText, QueueNumber};

/// Single source of truth for what one counter is doing.
///
/// The waiting count is derived from the entry store and is not held here.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CounterState {
    id: CounterId,
    title: NonEmptyText,
    counter_number: u32,
    current: Option<(EntryId, QueueNumber)>,
    last_called: Option<QueueNumber>,
    is_active: bool,
}

impl CounterState {
    /// A new, active counter serving nobody.
    pub fn new(id: CounterId, title: NonEmptyText, counter_number: u32) -> Self {
        Self {
            id,
            title,
            counter_number,
            current: None,
            last_called: None,
            is_active: true,
        }
    }

    /// Rebuilds a counter from a confirmed server snapshot.
    pub fn restore(
        id: CounterId,
        title: NonEmptyText,
        counter_number: u32,
        current: Option<(EntryId, QueueNumber)>,
        last_called: Option<QueueNumber>,
        is_active: bool,
    ) -> Self {
        Self {
            id,
            title,
            counter_number,
            current,
            last_called,
            is_active,
        }
    }

    pub fn id(&self) -> CounterId {
        self.id
    }

    pub fn title(&self) -> &NonEmptyText {
        &self.title
    }

    pub fn counter_number(&self) -> u32 {
        self.counter_number
    }

    pub fn current_number(&self) -> Option<QueueNumber> {
        self.current.map(|(_, number)| number)
    }

    pub fn current_entry(&self) -> Option<EntryId> {
        self.current.map(|(id, _)| id)
    }

    pub fn last_called(&self) -> Option<QueueNumber> {
        self.last_called
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn activate(&mut self) {
        self.is_active = true;
    }

    /// Stops the counter taking new patients. Whoever is being served stays current.
    pub fn deactivate(&mut self) {
        self.is_active = false;
    }

    /// Points the counter at `entry`, or clears it with `None`.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::InvalidTransition`] when setting an entry on an inactive counter.
    /// Clearing is always allowed so an inactive counter can still finish its last patient.
    pub fn set_current(&mut self, entry: Option<&QueueEntry>) -> QueueResult<()> {
        match entry {
            None => {
                self.current = None;
                Ok(())
            }
            Some(_) if !self.is_active => Err(QueueError::InvalidTransition(format!(
                "counter {} is inactive",
                self.id
            ))),
            Some(entry) => {
                self.current = Some((entry.id, entry.queue_number));
                Ok(())
            }
        }
    }

    pub(crate) fn mark_called(&mut self, number: QueueNumber) {
        self.last_called = Some(number);
    }
}
