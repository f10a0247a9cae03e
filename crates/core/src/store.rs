//! Queue entry store.
//!
//! Holds every known entry plus, per counter, the ordered waiting sequence. Entries not yet
//! assigned to a counter wait in a shared pool.
//!
//! ## Ordering
//! A counter's sequence is kept in issue order (check-in date, then queue number) until an
//! explicit order is imposed, either by [`QueueEntryStore::reorder`] or by a skipped entry
//! being sent to the tail. From then on new entries are appended. The lane falls back to
//! issue order once it drains.
//!
//! Public mutators validate before touching anything, so a returned error means nothing
//! changed.

use crate::entry::{EntryStatus, QueueEntry};
use crate::{QueueError, QueueResult};
use chrono::NaiveDate;
use queue_types::{CounterId, EntryId, QueueNumber};
use std::collections::{HashMap, HashSet};

/// Numbers restart every UTC day, so the check-in date ranks first.
fn issue_order(entry: &QueueEntry) -> (NaiveDate, QueueNumber) {
    (entry.checked_in_at.date_naive(), entry.queue_number)
}

#[derive(Clone, Debug, Default)]
struct Lane {
    sequence: Vec<EntryId>,
    hand_ordered: bool,
}

impl Lane {
    fn position(&self, id: EntryId) -> Option<usize> {
        self.sequence.iter().position(|e| *e == id)
    }

    fn remove(&mut self, id: EntryId) -> bool {
        match self.position(id) {
            Some(pos) => {
                self.sequence.remove(pos);
                if self.sequence.is_empty() {
                    self.hand_ordered = false;
                }
                true
            }
            None => false,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct QueueEntryStore {
    entries: HashMap<EntryId, QueueEntry>,
    lanes: HashMap<CounterId, Lane>,
    unassigned: Vec<EntryId>,
}

impl QueueEntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: EntryId) -> Option<&QueueEntry> {
        self.entries.get(&id)
    }

    pub fn contains(&self, id: EntryId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every entry, in no particular order.
    pub fn entries(&self) -> impl Iterator<Item = &QueueEntry> {
        self.entries.values()
    }

    /// The waiting sequence for `counter_id`, head first.
    pub fn list(&self, counter_id: CounterId) -> Vec<&QueueEntry> {
        self.resolve(self.waiting_ids(counter_id))
    }

    /// Ids of the waiting sequence for `counter_id`, head first.
    pub fn waiting_ids(&self, counter_id: CounterId) -> &[EntryId] {
        self.lanes
            .get(&counter_id)
            .map(|lane| lane.sequence.as_slice())
            .unwrap_or(&[])
    }

    pub fn waiting_count(&self, counter_id: CounterId) -> usize {
        self.waiting_ids(counter_id).len()
    }

    /// Entries checked in without a counter, in check-in order.
    pub fn list_unassigned(&self) -> Vec<&QueueEntry> {
        self.resolve(&self.unassigned)
    }

    fn resolve(&self, ids: &[EntryId]) -> Vec<&QueueEntry> {
        ids.iter().filter_map(|id| self.entries.get(id)).collect()
    }

    /// Replaces the waiting order of `counter_id` with `new_order`.
    ///
    /// # Errors
    ///
    /// [`QueueError::InvalidOrder`] unless `new_order` holds exactly the current waiting ids,
    /// each once.
    pub fn reorder(&mut self, counter_id: CounterId, new_order: &[EntryId]) -> QueueResult<()> {
        let current = self.waiting_ids(counter_id);

        if new_order.len() != current.len() {
            return Err(QueueError::InvalidOrder(format!(
                "expected {} entries for counter {}, got {}",
                current.len(),
                counter_id,
                new_order.len()
            )));
        }

        let expected: HashSet<EntryId> = current.iter().copied().collect();
        let mut seen = HashSet::with_capacity(new_order.len());
        for id in new_order {
            if !seen.insert(*id) {
                return Err(QueueError::InvalidOrder(format!("entry {id} listed twice")));
            }
            if !expected.contains(id) {
                return Err(QueueError::InvalidOrder(format!(
                    "entry {id} is not waiting at counter {counter_id}"
                )));
            }
        }

        if new_order.is_empty() {
            return Ok(());
        }

        let lane = self.lanes.entry(counter_id).or_default();
        lane.sequence = new_order.to_vec();
        lane.hand_ordered = true;
        Ok(())
    }

    /// Adds a waiting entry to its counter's sequence, or to the unassigned pool.
    ///
    /// # Errors
    ///
    /// - [`QueueError::DuplicateId`] if the id is already in the store, whatever its status.
    /// - [`QueueError::InvalidTransition`] if the entry is not `waiting`.
    pub fn enqueue(&mut self, entry: QueueEntry) -> QueueResult<()> {
        if self.entries.contains_key(&entry.id) {
            return Err(QueueError::DuplicateId(entry.id));
        }
        if entry.status != EntryStatus::Waiting {
            return Err(QueueError::InvalidTransition(format!(
                "only waiting entries can be enqueued, entry {} is {}",
                entry.id, entry.status
            )));
        }

        let id = entry.id;
        let counter_id = entry.counter_id;
        self.entries.insert(id, entry);

        match counter_id {
            Some(counter_id) => self.insert_into_lane(counter_id, id),
            None => self.unassigned.push(id),
        }
        Ok(())
    }

    /// Moves an unassigned waiting entry onto the tail of `counter_id`.
    pub fn assign(&mut self, entry_id: EntryId, counter_id: CounterId) -> QueueResult<()> {
        let Some(pos) = self.unassigned.iter().position(|id| *id == entry_id) else {
            return Err(QueueError::NotFound(entry_id));
        };

        self.unassigned.remove(pos);
        if let Some(entry) = self.entries.get_mut(&entry_id) {
            entry.counter_id = Some(counter_id);
        }
        self.insert_into_lane(counter_id, entry_id);
        Ok(())
    }

    /// Removes an entry regardless of status.
    ///
    /// Idempotent: removing an unknown id returns `None` and changes nothing.
    pub fn remove(&mut self, id: EntryId) -> Option<QueueEntry> {
        let entry = self.entries.remove(&id)?;
        self.detach(id, entry.counter_id);
        Some(entry)
    }

    /// Drops completed entries, returning how many were removed.
    pub fn purge_completed(&mut self) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| entry.status != EntryStatus::Completed);
        before - self.entries.len()
    }

    /// Overwrites this store's view of one counter with a confirmed snapshot.
    ///
    /// Waiting, skipped and serving entries of `counter_id` that are not in the snapshot are
    /// dropped; completed history is kept. The snapshot order becomes the lane order.
    ///
    /// # Errors
    ///
    /// - [`QueueError::DuplicateId`] if an id appears twice in the snapshot.
    /// - [`QueueError::InvalidTransition`] if `serving` is not serving or a waiting entry is
    ///   not waiting/skipped.
    pub fn replace_counter(
        &mut self,
        counter_id: CounterId,
        serving: Option<QueueEntry>,
        waiting: Vec<QueueEntry>,
    ) -> QueueResult<()> {
        let mut seen = HashSet::new();
        for entry in serving.iter().chain(waiting.iter()) {
            if !seen.insert(entry.id) {
                return Err(QueueError::DuplicateId(entry.id));
            }
        }
        if let Some(entry) = &serving {
            if entry.status != EntryStatus::Serving {
                return Err(QueueError::InvalidTransition(format!(
                    "serving entry {} is {}",
                    entry.id, entry.status
                )));
            }
        }
        if let Some(entry) = waiting.iter().find(|e| !e.status.is_waiting()) {
            return Err(QueueError::InvalidTransition(format!(
                "waiting entry {} is {}",
                entry.id, entry.status
            )));
        }

        let stale: Vec<EntryId> = self
            .entries
            .values()
            .filter(|e| e.counter_id == Some(counter_id) && e.status != EntryStatus::Completed)
            .map(|e| e.id)
            .collect();
        for id in stale {
            self.remove(id);
        }

        for id in &seen {
            self.remove(*id);
        }

        if let Some(mut entry) = serving {
            entry.counter_id = Some(counter_id);
            self.entries.insert(entry.id, entry);
        }

        let sequence: Vec<EntryId> = waiting.iter().map(|e| e.id).collect();
        for mut entry in waiting {
            entry.counter_id = Some(counter_id);
            self.entries.insert(entry.id, entry);
        }

        let lane = self.lanes.entry(counter_id).or_default();
        lane.hand_ordered = !sequence.is_empty();
        lane.sequence = sequence;
        Ok(())
    }

    fn insert_into_lane(&mut self, counter_id: CounterId, id: EntryId) {
        let key = self.entries.get(&id).map(issue_order);
        let lane = self.lanes.entry(counter_id).or_default();

        if lane.hand_ordered {
            lane.sequence.push(id);
            return;
        }

        let entries = &self.entries;
        let pos = lane
            .sequence
            .partition_point(|other| entries.get(other).map(issue_order) <= key);
        lane.sequence.insert(pos, id);
    }

    fn detach(&mut self, id: EntryId, counter_id: Option<CounterId>) {
        match counter_id {
            Some(counter_id) => {
                if let Some(lane) = self.lanes.get_mut(&counter_id) {
                    lane.remove(id);
                }
            }
            None => self.unassigned.retain(|other| *other != id),
        }
    }

    pub(crate) fn entry_mut(&mut self, id: EntryId) -> Option<&mut QueueEntry> {
        self.entries.get_mut(&id)
    }

    /// Position of `id` in the counter's waiting sequence.
    pub(crate) fn lane_position(&self, counter_id: CounterId, id: EntryId) -> Option<usize> {
        self.lanes.get(&counter_id).and_then(|lane| lane.position(id))
    }

    pub(crate) fn take_from_lane(&mut self, counter_id: CounterId, id: EntryId) -> bool {
        self.lanes
            .get_mut(&counter_id)
            .map(|lane| lane.remove(id))
            .unwrap_or(false)
    }

    /// Appends to the tail and pins the lane to explicit ordering.
    pub(crate) fn push_tail(&mut self, counter_id: CounterId, id: EntryId) {
        let lane = self.lanes.entry(counter_id).or_default();
        if lane.position(id).is_none() {
            lane.sequence.push(id);
        }
        lane.hand_ordered = true;
    }
}
