//! Serving controller.
//!
//! The controller is the only writer of entry status, counter assignment and counter serving
//! state. Each operation checks every precondition before mutating, so the store and counter
//! move together or not at all.

use crate::config::AlreadyServingPolicy;
use crate::counter::CounterState;
use crate::entry::{EntryStatus, QueueEntry};
use crate::reorder;
use crate::store::QueueEntryStore;
use crate::{QueueError, QueueResult};
use queue_types::{CounterId, EntryId};
use std::collections::HashMap;

/// One counter's slice of queue state, as confirmed by the queue service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub counter: CounterState,
    pub serving: Option<QueueEntry>,
    pub waiting: Vec<QueueEntry>,
}

#[derive(Clone, Debug)]
pub struct ServingController {
    store: QueueEntryStore,
    counters: HashMap<CounterId, CounterState>,
    policy: AlreadyServingPolicy,
}

impl ServingController {
    pub fn new(policy: AlreadyServingPolicy) -> Self {
        Self {
            store: QueueEntryStore::new(),
            counters: HashMap::new(),
            policy,
        }
    }

    pub fn policy(&self) -> AlreadyServingPolicy {
        self.policy
    }

    pub fn store(&self) -> &QueueEntryStore {
        &self.store
    }

    pub fn counter(&self, counter_id: CounterId) -> QueueResult<&CounterState> {
        self.counters
            .get(&counter_id)
            .ok_or(QueueError::CounterNotFound(counter_id))
    }

    /// All counters ordered by counter number.
    pub fn counters(&self) -> Vec<&CounterState> {
        let mut counters: Vec<&CounterState> = self.counters.values().collect();
        counters.sort_by_key(|c| (c.counter_number(), c.id()));
        counters
    }

    /// Waiting sequence of a known counter, head first.
    pub fn waiting(&self, counter_id: CounterId) -> QueueResult<Vec<&QueueEntry>> {
        self.counter(counter_id)?;
        Ok(self.store.list(counter_id))
    }

    /// The entry currently being served at `counter_id`, if the store knows it.
    pub fn serving(&self, counter_id: CounterId) -> QueueResult<Option<&QueueEntry>> {
        let counter = self.counter(counter_id)?;
        Ok(counter.current_entry().and_then(|id| self.store.get(id)))
    }

    /// Registers a counter.
    ///
    /// # Errors
    ///
    /// [`QueueError::InvalidInput`] if the id or counter number is already in use.
    pub fn add_counter(&mut self, counter: CounterState) -> QueueResult<()> {
        if self.counters.contains_key(&counter.id()) {
            return Err(QueueError::InvalidInput(format!(
                "counter {} already exists",
                counter.id()
            )));
        }
        if self
            .counters
            .values()
            .any(|c| c.counter_number() == counter.counter_number())
        {
            return Err(QueueError::InvalidInput(format!(
                "counter number {} is already in use",
                counter.counter_number()
            )));
        }
        self.counters.insert(counter.id(), counter);
        Ok(())
    }

    pub fn activate(&mut self, counter_id: CounterId) -> QueueResult<()> {
        self.counter_mut(counter_id)?.activate();
        Ok(())
    }

    pub fn deactivate(&mut self, counter_id: CounterId) -> QueueResult<()> {
        self.counter_mut(counter_id)?.deactivate();
        Ok(())
    }

    /// Adds a checked-in entry to the store.
    ///
    /// # Errors
    ///
    /// [`QueueError::CounterNotFound`] if the entry names an unknown counter, otherwise as
    /// [`QueueEntryStore::enqueue`].
    pub fn enqueue(&mut self, entry: QueueEntry) -> QueueResult<()> {
        if let Some(counter_id) = entry.counter_id {
            self.counter(counter_id)?;
        }
        self.store.enqueue(entry)
    }

    pub fn assign(&mut self, entry_id: EntryId, counter_id: CounterId) -> QueueResult<()> {
        self.counter(counter_id)?;
        self.store.assign(entry_id, counter_id)
    }

    pub fn reorder(&mut self, counter_id: CounterId, new_order: &[EntryId]) -> QueueResult<()> {
        self.counter(counter_id)?;
        self.store.reorder(counter_id, new_order)
    }

    /// Applies a sidebar drag-and-drop: the entry at `from` is dropped at `to`.
    pub fn move_waiting(
        &mut self,
        counter_id: CounterId,
        from: usize,
        to: usize,
    ) -> QueueResult<()> {
        self.counter(counter_id)?;
        let new_order = reorder::move_entry(self.store.waiting_ids(counter_id), from, to)?;
        self.store.reorder(counter_id, &new_order)
    }

    /// Removes an entry from the store. Removing the serving entry also clears its counter.
    ///
    /// Idempotent: unknown ids return `None`.
    pub fn remove_entry(&mut self, entry_id: EntryId) -> Option<QueueEntry> {
        let removed = self.store.remove(entry_id)?;
        if let Some(counter) = removed
            .counter_id
            .and_then(|id| self.counters.get_mut(&id))
        {
            if counter.current_entry() == Some(entry_id) {
                // Clearing never fails.
                let _ = counter.set_current(None);
            }
        }
        Some(removed)
    }

    pub fn purge_completed(&mut self) -> usize {
        self.store.purge_completed()
    }

    /// Serves the head of the counter's waiting sequence.
    ///
    /// # Errors
    ///
    /// - [`QueueError::CounterNotFound`]
    /// - [`QueueError::CounterInactive`] if the counter is deactivated
    /// - [`QueueError::EmptyQueue`] if nobody is waiting
    /// - [`QueueError::AlreadyServing`] if someone is being served and the policy is `Reject`
    pub fn serve_next(&mut self, counter_id: CounterId) -> QueueResult<QueueEntry> {
        self.ensure_active(counter_id)?;
        let head = self
            .store
            .waiting_ids(counter_id)
            .first()
            .copied()
            .ok_or(QueueError::EmptyQueue(counter_id))?;
        self.serve_entry(counter_id, head)
    }

    /// Moves the serving entry to the tail of the waiting sequence as `skipped`.
    pub fn skip_patient(&mut self, counter_id: CounterId) -> QueueResult<QueueEntry> {
        let current = self.current_entry_id(counter_id)?;
        if !self.store.contains(current) {
            return Err(QueueError::NotFound(current));
        }

        self.counter_mut(counter_id)?.set_current(None)?;
        self.store.push_tail(counter_id, current);
        self.finish_entry(current, EntryStatus::Skipped)
    }

    /// Serves a specific waiting or skipped entry of this counter, out of order.
    ///
    /// # Errors
    ///
    /// - [`QueueError::CounterInactive`]
    /// - [`QueueError::NotFound`] if the entry is not in this counter's waiting sequence
    /// - [`QueueError::AlreadyServing`] as for [`ServingController::serve_next`]
    pub fn recall_patient(
        &mut self,
        counter_id: CounterId,
        entry_id: EntryId,
    ) -> QueueResult<QueueEntry> {
        self.ensure_active(counter_id)?;
        if self.store.lane_position(counter_id, entry_id).is_none() {
            return Err(QueueError::NotFound(entry_id));
        }
        self.serve_entry(counter_id, entry_id)
    }

    /// Marks the serving entry completed and clears the counter.
    pub fn complete_current(&mut self, counter_id: CounterId) -> QueueResult<QueueEntry> {
        let current = self.current_entry_id(counter_id)?;
        if !self.store.contains(current) {
            return Err(QueueError::NotFound(current));
        }

        self.counter_mut(counter_id)?.set_current(None)?;
        self.finish_entry(current, EntryStatus::Completed)
    }

    /// Checks that `entry_id` is the entry being served at `counter_id`.
    ///
    /// Commit endpoints name the entry they act on, so a skip or complete built on a stale
    /// view of the counter is refused instead of hitting whoever is serving now.
    pub fn ensure_serving(&self, counter_id: CounterId, entry_id: EntryId) -> QueueResult<()> {
        match self.counter(counter_id)?.current_entry() {
            None => Err(QueueError::NothingServing(counter_id)),
            Some(current) if current == entry_id => Ok(()),
            Some(current) => Err(QueueError::InvalidTransition(format!(
                "entry {entry_id} is not being served at counter {counter_id} (serving {current})"
            ))),
        }
    }

    /// Captures one counter's slice of state, for rollback or for serving to clients.
    pub fn snapshot(&self, counter_id: CounterId) -> QueueResult<CounterSnapshot> {
        let counter = self.counter(counter_id)?.clone();
        let serving = self.serving(counter_id)?.cloned();
        let waiting = self.store.list(counter_id).into_iter().cloned().collect();
        Ok(CounterSnapshot {
            counter,
            serving,
            waiting,
        })
    }

    /// Overwrites one counter's slice of state with `snapshot`.
    pub fn apply_snapshot(&mut self, snapshot: CounterSnapshot) -> QueueResult<()> {
        let counter_id = snapshot.counter.id();
        if let Some(serving) = &snapshot.serving {
            if snapshot.counter.current_entry() != Some(serving.id) {
                return Err(QueueError::InvalidInput(format!(
                    "snapshot serving entry {} does not match counter {}",
                    serving.id, counter_id
                )));
            }
        }

        self.store
            .replace_counter(counter_id, snapshot.serving, snapshot.waiting)?;
        self.counters.insert(counter_id, snapshot.counter);
        Ok(())
    }

    fn counter_mut(&mut self, counter_id: CounterId) -> QueueResult<&mut CounterState> {
        self.counters
            .get_mut(&counter_id)
            .ok_or(QueueError::CounterNotFound(counter_id))
    }

    fn ensure_active(&self, counter_id: CounterId) -> QueueResult<()> {
        if self.counter(counter_id)?.is_active() {
            Ok(())
        } else {
            Err(QueueError::CounterInactive(counter_id))
        }
    }

    fn current_entry_id(&self, counter_id: CounterId) -> QueueResult<EntryId> {
        self.counter(counter_id)?
            .current_entry()
            .ok_or(QueueError::NothingServing(counter_id))
    }

    /// Serves `entry_id`, which the caller has checked is in the counter's lane.
    fn serve_entry(&mut self, counter_id: CounterId, entry_id: EntryId) -> QueueResult<QueueEntry> {
        let previous = self.counter(counter_id)?.current_entry();
        if let Some(previous) = previous {
            if self.policy == AlreadyServingPolicy::Reject {
                let number = self
                    .counter(counter_id)?
                    .current_number()
                    .ok_or(QueueError::NothingServing(counter_id))?;
                return Err(QueueError::AlreadyServing { counter_id, number });
            }
            if !self.store.contains(previous) {
                return Err(QueueError::NotFound(previous));
            }
        }

        let entry = self
            .store
            .get(entry_id)
            .ok_or(QueueError::NotFound(entry_id))?;
        if !entry.status.can_transition_to(EntryStatus::Serving) {
            return Err(QueueError::InvalidTransition(format!(
                "entry {} is {} and cannot be served",
                entry_id, entry.status
            )));
        }
        let number = entry.queue_number;

        // Only fallible mutation; nothing has changed if it fails.
        let counter = self
            .counters
            .get_mut(&counter_id)
            .ok_or(QueueError::CounterNotFound(counter_id))?;
        counter.set_current(Some(entry))?;
        counter.mark_called(number);

        if let Some(previous) = previous {
            if let Some(prev) = self.store.entry_mut(previous) {
                prev.status = EntryStatus::Completed;
            }
        }

        self.store.take_from_lane(counter_id, entry_id);
        let entry = self
            .store
            .entry_mut(entry_id)
            .ok_or(QueueError::NotFound(entry_id))?;
        entry.status = EntryStatus::Serving;
        entry.counter_id = Some(counter_id);
        Ok(entry.clone())
    }

    fn finish_entry(&mut self, entry_id: EntryId, status: EntryStatus) -> QueueResult<QueueEntry> {
        let entry = self
            .store
            .entry_mut(entry_id)
            .ok_or(QueueError::NotFound(entry_id))?;
        entry.status = status;
        Ok(entry.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{PatientRef, Priority};
    use queue_types::{NonEmptyText, QueueNumber};

    struct Fixture {
        controller: ServingController,
        counter: CounterId,
    }

    impl Fixture {
        fn new(policy: AlreadyServingPolicy) -> Self {
            let counter = CounterId::new();
            let mut controller = ServingController::new(policy);
            controller
                .add_counter(CounterState::new(
                    counter,
                    NonEmptyText::new("Vitals").expect("title"),
                    1,
                ))
                .expect("add counter");
            Self {
                controller,
                counter,
            }
        }

        fn check_in(&mut self, number: u32) -> EntryId {
            let entry = QueueEntry::check_in(
                PatientRef::new(NonEmptyText::new("Test Patient").expect("name"), None),
                QueueNumber::new(number).expect("number"),
                Priority::Normal,
                Some(self.counter),
            );
            let id = entry.id;
            self.controller.enqueue(entry).expect("enqueue");
            id
        }

        fn waiting_ids(&self) -> Vec<EntryId> {
            self.controller
                .waiting(self.counter)
                .expect("counter")
                .iter()
                .map(|e| e.id)
                .collect()
        }

        fn current_number(&self) -> Option<u32> {
            self.controller
                .counter(self.counter)
                .expect("counter")
                .current_number()
                .map(QueueNumber::get)
        }

        fn status(&self, id: EntryId) -> EntryStatus {
            self.controller.store().get(id).expect("entry").status
        }
    }

    #[test]
    fn serve_skip_serve_scenario() {
        let mut f = Fixture::new(AlreadyServingPolicy::Reject);
        let a = f.check_in(10);
        let b = f.check_in(11);
        let c = f.check_in(12);

        let served = f.controller.serve_next(f.counter).expect("serve A");
        assert_eq!(served.id, a);
        assert_eq!(f.current_number(), Some(10));
        assert_eq!(f.waiting_ids(), vec![b, c]);

        let skipped = f.controller.skip_patient(f.counter).expect("skip A");
        assert_eq!(skipped.status, EntryStatus::Skipped);
        assert_eq!(f.current_number(), None);
        assert_eq!(f.waiting_ids(), vec![b, c, a]);

        f.controller.complete_current(f.counter).expect_err("nothing serving");
        f.controller.serve_next(f.counter).expect("serve B");
        assert_eq!(f.current_number(), Some(11));
        assert_eq!(f.waiting_ids(), vec![c, a]);

        let counter = f.controller.counter(f.counter).expect("counter");
        assert_eq!(counter.last_called().map(QueueNumber::get), Some(11));
    }

    #[test]
    fn serve_next_drains_in_fifo_order() {
        let mut f = Fixture::new(AlreadyServingPolicy::Reject);
        let ids: Vec<EntryId> = (1..=5).map(|n| f.check_in(n)).collect();

        for (i, expected) in ids.iter().enumerate() {
            let served = f.controller.serve_next(f.counter).expect("serve");
            assert_eq!(served.id, *expected);
            assert_eq!(f.waiting_ids().len(), ids.len() - i - 1);
            f.controller.complete_current(f.counter).expect("complete");
            assert_eq!(f.status(*expected), EntryStatus::Completed);
        }

        let before = f.controller.counter(f.counter).expect("counter").clone();
        let err = f.controller.serve_next(f.counter).expect_err("empty");
        assert_eq!(err, QueueError::EmptyQueue(f.counter));
        assert_eq!(f.controller.counter(f.counter).expect("counter"), &before);
    }

    #[test]
    fn reorder_then_serve_uses_new_head() {
        let mut f = Fixture::new(AlreadyServingPolicy::Reject);
        let a = f.check_in(10);
        let b = f.check_in(11);
        let c = f.check_in(12);

        f.controller.reorder(f.counter, &[c, a, b]).expect("reorder");
        assert_eq!(f.waiting_ids(), vec![c, a, b]);

        let err = f.controller.reorder(f.counter, &[c, a]).expect_err("mismatch");
        assert!(matches!(err, QueueError::InvalidOrder(_)));
        assert_eq!(f.waiting_ids(), vec![c, a, b]);

        let served = f.controller.serve_next(f.counter).expect("serve");
        assert_eq!(served.id, c);
        assert_eq!(f.current_number(), Some(12));
    }

    #[test]
    fn inactive_counter_rejects_serve_and_keeps_queue() {
        let mut f = Fixture::new(AlreadyServingPolicy::Reject);
        let a = f.check_in(1);
        f.controller.deactivate(f.counter).expect("deactivate");

        let err = f.controller.serve_next(f.counter).expect_err("inactive");
        assert_eq!(err, QueueError::CounterInactive(f.counter));
        assert_eq!(f.waiting_ids(), vec![a]);
        assert_eq!(f.status(a), EntryStatus::Waiting);

        let err = f.controller.recall_patient(f.counter, a).expect_err("inactive");
        assert_eq!(err, QueueError::CounterInactive(f.counter));
    }

    #[test]
    fn already_serving_is_rejected_under_reject_policy() {
        let mut f = Fixture::new(AlreadyServingPolicy::Reject);
        let a = f.check_in(1);
        let b = f.check_in(2);
        f.controller.serve_next(f.counter).expect("serve");

        let err = f.controller.serve_next(f.counter).expect_err("busy");
        assert!(matches!(err, QueueError::AlreadyServing { .. }));
        assert_eq!(f.status(a), EntryStatus::Serving);
        assert_eq!(f.waiting_ids(), vec![b]);
    }

    #[test]
    fn auto_complete_policy_finishes_current_first() {
        let mut f = Fixture::new(AlreadyServingPolicy::AutoComplete);
        let a = f.check_in(1);
        let b = f.check_in(2);
        f.controller.serve_next(f.counter).expect("serve a");
        f.controller.serve_next(f.counter).expect("serve b");

        assert_eq!(f.status(a), EntryStatus::Completed);
        assert_eq!(f.status(b), EntryStatus::Serving);
        assert_eq!(f.current_number(), Some(2));
    }

    #[test]
    fn skip_requeues_exactly_once() {
        let mut f = Fixture::new(AlreadyServingPolicy::Reject);
        let a = f.check_in(1);
        let b = f.check_in(2);

        f.controller.serve_next(f.counter).expect("serve a");
        f.controller.skip_patient(f.counter).expect("skip a");
        let err = f.controller.skip_patient(f.counter).expect_err("nothing serving");
        assert_eq!(err, QueueError::NothingServing(f.counter));

        assert_eq!(f.waiting_ids(), vec![b, a]);
        assert_eq!(f.waiting_ids().iter().filter(|id| **id == a).count(), 1);
    }

    #[test]
    fn recall_serves_target_regardless_of_position() {
        let mut f = Fixture::new(AlreadyServingPolicy::Reject);
        let a = f.check_in(10);
        let b = f.check_in(11);
        let c = f.check_in(12);

        f.controller.serve_next(f.counter).expect("serve a");
        f.controller.skip_patient(f.counter).expect("skip a");

        let recalled = f.controller.recall_patient(f.counter, a).expect("recall a");
        assert_eq!(recalled.status, EntryStatus::Serving);
        assert_eq!(f.current_number(), Some(10));
        assert_eq!(f.waiting_ids(), vec![b, c]);

        f.controller.complete_current(f.counter).expect("complete");
        f.controller.recall_patient(f.counter, c).expect("recall c");
        assert_eq!(f.current_number(), Some(12));
        assert_eq!(f.waiting_ids(), vec![b]);
    }

    #[test]
    fn recall_unknown_entry_is_not_found() {
        let mut f = Fixture::new(AlreadyServingPolicy::Reject);
        f.check_in(1);
        let stranger = EntryId::new();
        let err = f
            .controller
            .recall_patient(f.counter, stranger)
            .expect_err("unknown");
        assert_eq!(err, QueueError::NotFound(stranger));
    }

    #[test]
    fn complete_current_requires_serving_entry() {
        let mut f = Fixture::new(AlreadyServingPolicy::Reject);
        let err = f.controller.complete_current(f.counter).expect_err("idle");
        assert_eq!(err, QueueError::NothingServing(f.counter));

        let a = f.check_in(3);
        f.controller.serve_next(f.counter).expect("serve");
        let done = f.controller.complete_current(f.counter).expect("complete");
        assert_eq!(done.id, a);
        assert_eq!(f.current_number(), None);
    }

    #[test]
    fn enqueue_to_unknown_counter_fails() {
        let mut f = Fixture::new(AlreadyServingPolicy::Reject);
        let entry = QueueEntry::check_in(
            PatientRef::new(NonEmptyText::new("Lost Patient").expect("name"), None),
            QueueNumber::FIRST,
            Priority::Normal,
            Some(CounterId::new()),
        );
        assert!(matches!(
            f.controller.enqueue(entry),
            Err(QueueError::CounterNotFound(_))
        ));
    }

    #[test]
    fn remove_serving_entry_clears_counter() {
        let mut f = Fixture::new(AlreadyServingPolicy::Reject);
        let a = f.check_in(1);
        f.controller.serve_next(f.counter).expect("serve");
        assert!(f.controller.remove_entry(a).is_some());
        assert_eq!(f.current_number(), None);
        assert!(f.controller.remove_entry(a).is_none());
    }

    #[test]
    fn move_waiting_applies_drag_and_drop() {
        let mut f = Fixture::new(AlreadyServingPolicy::Reject);
        let a = f.check_in(1);
        let b = f.check_in(2);
        let c = f.check_in(3);

        f.controller.move_waiting(f.counter, 2, 0).expect("move");
        assert_eq!(f.waiting_ids(), vec![c, a, b]);

        let err = f.controller.move_waiting(f.counter, 5, 0).expect_err("bad index");
        assert!(matches!(err, QueueError::InvalidOrder(_)));
        assert_eq!(f.waiting_ids(), vec![c, a, b]);
    }

    #[test]
    fn snapshot_round_trips_through_apply() {
        let mut f = Fixture::new(AlreadyServingPolicy::Reject);
        f.check_in(1);
        f.check_in(2);
        f.controller.serve_next(f.counter).expect("serve");
        let before = f.controller.snapshot(f.counter).expect("snapshot");

        f.controller.complete_current(f.counter).expect("complete");
        f.controller.serve_next(f.counter).expect("serve next");
        f.controller.apply_snapshot(before.clone()).expect("restore");

        assert_eq!(f.controller.snapshot(f.counter).expect("snapshot"), before);
    }

    #[test]
    fn add_counter_rejects_duplicate_number() {
        let mut f = Fixture::new(AlreadyServingPolicy::Reject);
        let err = f
            .controller
            .add_counter(CounterState::new(
                CounterId::new(),
                NonEmptyText::new("Pharmacy").expect("title"),
                1,
            ))
            .expect_err("number taken");
        assert!(matches!(err, QueueError::InvalidInput(_)));
    }
}
