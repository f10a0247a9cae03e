//! Client-side mirror of the queue service.
//!
//! [`QueueSession`] applies each operator action to a local [`ServingController`] straight
//! away, commits it to the [`QueueService`], and then settles:
//!
//! - **committed**: local state for the counter is overwritten with the service's confirmed
//!   snapshot (if that fetch fails the optimistic state is kept until the next refresh);
//! - **rejected**: the counter is rolled back to how it was before the action;
//! - **superseded**: a newer action was issued on the same counter while this one was in
//!   flight. Its result is discarded and [`QueueError::Superseded`] is returned. When it is
//!   the last action to settle, the counter is refreshed from the service.
//!
//! Actions are ordered by [`ActionStamp`] at issue time, never by response arrival. A second
//! serve-next on a counter is refused while one is still in flight.
//!
//! The lock is never held across an await on the service.

use crate::controller::{CounterSnapshot, ServingController};
use crate::display::{DisplayProjection, NowServingBoard};
use crate::entry::QueueEntry;
use crate::service::QueueService;
use crate::{AlreadyServingPolicy, QueueError, QueueResult};
use queue_types::{ActionStamp, CounterId, EntryId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionKind {
    ServeNext,
    Skip,
    Recall,
    Complete,
    Reorder,
}

#[derive(Debug, Default)]
struct ActionTracker {
    last_issued: Option<ActionStamp>,
    in_flight: Vec<(ActionStamp, ActionKind)>,
    generation: u64,
}

impl ActionTracker {
    fn ensure_can_start(&self, counter_id: CounterId, kind: ActionKind) -> QueueResult<()> {
        if kind == ActionKind::ServeNext
            && self
                .in_flight
                .iter()
                .any(|(_, k)| *k == ActionKind::ServeNext)
        {
            return Err(QueueError::ActionInFlight(counter_id));
        }
        Ok(())
    }

    fn begin(&mut self, kind: ActionKind) -> ActionStamp {
        let stamp = ActionStamp::generate(self.last_issued.as_ref());
        self.last_issued = Some(stamp);
        self.in_flight.push((stamp, kind));
        self.generation += 1;
        stamp
    }

    fn is_latest(&self, stamp: ActionStamp) -> bool {
        self.last_issued == Some(stamp)
    }

    fn finish(&mut self, stamp: ActionStamp) {
        self.in_flight.retain(|(s, _)| *s != stamp);
        self.generation += 1;
    }

    fn is_idle(&self) -> bool {
        self.in_flight.is_empty()
    }
}

struct SessionState {
    controller: ServingController,
    trackers: HashMap<CounterId, ActionTracker>,
}

struct Pending {
    stamp: ActionStamp,
    kind: ActionKind,
    rollback: CounterSnapshot,
}

pub struct QueueSession<S> {
    service: Arc<S>,
    state: Mutex<SessionState>,
}

impl<S: QueueService> QueueSession<S> {
    /// An empty mirror. Call [`QueueSession::refresh`] for each counter of interest.
    pub fn new(service: Arc<S>, policy: AlreadyServingPolicy) -> Self {
        Self {
            service,
            state: Mutex::new(SessionState {
                controller: ServingController::new(policy),
                trackers: HashMap::new(),
            }),
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Runs `f` against the current local view.
    pub async fn view<R>(&self, f: impl FnOnce(&ServingController) -> R) -> R {
        let state = self.state.lock().await;
        f(&state.controller)
    }

    pub async fn board(&self, projection: &DisplayProjection) -> NowServingBoard {
        self.view(|controller| projection.board(controller)).await
    }

    /// Pulls the confirmed state of `counter_id` from the service.
    ///
    /// Returns `false` without changing anything if an action on the counter was issued or
    /// settled while the fetch was running; that action's own settlement is newer.
    pub async fn refresh(&self, counter_id: CounterId) -> QueueResult<bool> {
        let generation = {
            let mut state = self.state.lock().await;
            let tracker = state.trackers.entry(counter_id).or_default();
            if !tracker.is_idle() {
                tracing::debug!("skipping refresh of counter {counter_id}: action in flight");
                return Ok(false);
            }
            tracker.generation
        };

        let snapshot = self.service.fetch_snapshot(counter_id).await?;

        let mut state = self.state.lock().await;
        let SessionState {
            controller,
            trackers,
        } = &mut *state;
        let tracker = trackers.entry(counter_id).or_default();
        if tracker.generation != generation || !tracker.is_idle() {
            tracing::debug!("discarding stale refresh of counter {counter_id}");
            return Ok(false);
        }
        controller.apply_snapshot(snapshot)?;
        Ok(true)
    }

    pub async fn serve_next(&self, counter_id: CounterId) -> QueueResult<QueueEntry> {
        let (pending, _) = self
            .begin(counter_id, ActionKind::ServeNext, |c| c.serve_next(counter_id))
            .await?;
        let outcome = self.service.commit_serve_next(counter_id).await;
        self.settle(counter_id, pending, outcome).await
    }

    pub async fn skip_patient(&self, counter_id: CounterId) -> QueueResult<QueueEntry> {
        let (pending, skipped) = self
            .begin(counter_id, ActionKind::Skip, |c| c.skip_patient(counter_id))
            .await?;
        let outcome = self
            .service
            .commit_skip(counter_id, skipped.id)
            .await
            .map(|()| skipped);
        self.settle(counter_id, pending, outcome).await
    }

    pub async fn recall_patient(
        &self,
        counter_id: CounterId,
        entry_id: EntryId,
    ) -> QueueResult<QueueEntry> {
        let (pending, recalled) = self
            .begin(counter_id, ActionKind::Recall, |c| {
                c.recall_patient(counter_id, entry_id)
            })
            .await?;
        let outcome = self
            .service
            .commit_recall(counter_id, entry_id)
            .await
            .map(|()| recalled);
        self.settle(counter_id, pending, outcome).await
    }

    pub async fn complete_current(&self, counter_id: CounterId) -> QueueResult<QueueEntry> {
        let (pending, completed) = self
            .begin(counter_id, ActionKind::Complete, |c| {
                c.complete_current(counter_id)
            })
            .await?;
        let outcome = self
            .service
            .commit_complete(counter_id, completed.id)
            .await
            .map(|()| completed);
        self.settle(counter_id, pending, outcome).await
    }

    pub async fn reorder(&self, counter_id: CounterId, new_order: Vec<EntryId>) -> QueueResult<()> {
        let (pending, ()) = self
            .begin(counter_id, ActionKind::Reorder, |c| {
                c.reorder(counter_id, &new_order)
            })
            .await?;
        let outcome = self.service.commit_reorder(counter_id, &new_order).await;
        self.settle(counter_id, pending, outcome).await
    }

    /// Applies `local` optimistically and stamps the action.
    async fn begin<T>(
        &self,
        counter_id: CounterId,
        kind: ActionKind,
        local: impl FnOnce(&mut ServingController) -> QueueResult<T>,
    ) -> QueueResult<(Pending, T)> {
        let mut state = self.state.lock().await;
        let SessionState {
            controller,
            trackers,
        } = &mut *state;
        let tracker = trackers.entry(counter_id).or_default();

        tracker.ensure_can_start(counter_id, kind)?;
        let rollback = controller.snapshot(counter_id)?;
        let value = local(controller)?;
        let stamp = tracker.begin(kind);
        tracing::debug!("{kind:?} on counter {counter_id} issued as {stamp}");

        Ok((
            Pending {
                stamp,
                kind,
                rollback,
            },
            value,
        ))
    }

    async fn settle<T>(
        &self,
        counter_id: CounterId,
        pending: Pending,
        outcome: QueueResult<T>,
    ) -> QueueResult<T> {
        let confirmed = match &outcome {
            Ok(_) => Some(self.service.fetch_snapshot(counter_id).await),
            Err(_) => None,
        };

        let mut state = self.state.lock().await;
        let SessionState {
            controller,
            trackers,
        } = &mut *state;
        let tracker = trackers.entry(counter_id).or_default();
        let latest = tracker.is_latest(pending.stamp);
        tracker.finish(pending.stamp);

        if !latest {
            tracing::warn!(
                "{:?} {} on counter {counter_id} superseded; discarding its result",
                pending.kind,
                pending.stamp
            );
            // Newer actions settled on top of this one's optimistic state, and its commit may
            // have landed after their confirming fetch. Once the counter is quiet, re-read it.
            let idle = tracker.is_idle();
            drop(state);
            if idle {
                if let Err(e) = self.refresh(counter_id).await {
                    tracing::warn!("could not reconcile counter {counter_id}: {e}");
                }
            }
            return Err(QueueError::Superseded(pending.stamp.to_string()));
        }

        match (outcome, confirmed) {
            (Ok(value), Some(Ok(snapshot))) => {
                if let Err(e) = controller.apply_snapshot(snapshot) {
                    tracing::warn!("keeping optimistic state for counter {counter_id}: {e}");
                }
                Ok(value)
            }
            (Ok(value), _) => {
                tracing::warn!(
                    "{:?} committed but counter {counter_id} could not be re-fetched; keeping optimistic state",
                    pending.kind
                );
                Ok(value)
            }
            (Err(e), _) => {
                tracing::warn!(
                    "{:?} on counter {counter_id} rejected ({e}); rolling back",
                    pending.kind
                );
                if let Err(rollback_err) = controller.apply_snapshot(pending.rollback) {
                    tracing::error!("rollback of counter {counter_id} failed: {rollback_err}");
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counter::CounterState;
    use crate::entry::{PatientRef, Priority};
    use async_trait::async_trait;
    use queue_types::{NonEmptyText, QueueNumber};
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::Notify;

    /// Authoritative in-memory queue service.
    struct FakeService {
        controller: std::sync::Mutex<ServingController>,
        gate: Option<Arc<Notify>>,
        unavailable: AtomicBool,
    }

    impl FakeService {
        fn new(controller: ServingController) -> Self {
            Self {
                controller: std::sync::Mutex::new(controller),
                gate: None,
                unavailable: AtomicBool::new(false),
            }
        }

        fn with<R>(&self, f: impl FnOnce(&mut ServingController) -> QueueResult<R>) -> QueueResult<R> {
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(QueueError::ServiceUnavailable("offline".into()));
            }
            let mut controller = self.controller.lock().expect("service lock");
            f(&mut controller)
        }
    }

    #[async_trait]
    impl QueueService for FakeService {
        async fn fetch_waiting(&self, counter_id: CounterId) -> QueueResult<Vec<QueueEntry>> {
            self.with(|c| Ok(c.waiting(counter_id)?.into_iter().cloned().collect()))
        }

        async fn fetch_counter_state(&self, counter_id: CounterId) -> QueueResult<CounterState> {
            self.with(|c| Ok(c.counter(counter_id)?.clone()))
        }

        async fn fetch_serving(&self, counter_id: CounterId) -> QueueResult<Option<QueueEntry>> {
            self.with(|c| Ok(c.serving(counter_id)?.cloned()))
        }

        async fn commit_serve_next(&self, counter_id: CounterId) -> QueueResult<QueueEntry> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.with(|c| c.serve_next(counter_id))
        }

        async fn commit_skip(&self, counter_id: CounterId, entry_id: EntryId) -> QueueResult<()> {
            self.with(|c| {
                c.ensure_serving(counter_id, entry_id)?;
                c.skip_patient(counter_id).map(|_| ())
            })
        }

        async fn commit_recall(&self, counter_id: CounterId, entry_id: EntryId) -> QueueResult<()> {
            self.with(|c| c.recall_patient(counter_id, entry_id).map(|_| ()))
        }

        async fn commit_complete(
            &self,
            counter_id: CounterId,
            entry_id: EntryId,
        ) -> QueueResult<()> {
            self.with(|c| {
                c.ensure_serving(counter_id, entry_id)?;
                c.complete_current(counter_id).map(|_| ())
            })
        }

        async fn commit_reorder(
            &self,
            counter_id: CounterId,
            ordered_ids: &[EntryId],
        ) -> QueueResult<()> {
            self.with(|c| c.reorder(counter_id, ordered_ids))
        }
    }

    struct Setup {
        counter: CounterId,
        ids: Vec<EntryId>,
        server: ServingController,
    }

    /// A server-side controller with one counter and patients #10, #11, #12.
    fn setup(policy: AlreadyServingPolicy) -> Setup {
        let counter = CounterId::new();
        let mut server = ServingController::new(policy);
        server
            .add_counter(CounterState::new(
                counter,
                NonEmptyText::new("Vitals").expect("title"),
                1,
            ))
            .expect("add counter");
        let ids = [10, 11, 12]
            .into_iter()
            .map(|n| {
                let entry = QueueEntry::check_in(
                    PatientRef::new(NonEmptyText::new("Pat Doe").expect("name"), None),
                    QueueNumber::new(n).expect("number"),
                    Priority::Normal,
                    Some(counter),
                );
                let id = entry.id;
                server.enqueue(entry).expect("enqueue");
                id
            })
            .collect();
        Setup {
            counter,
            ids,
            server,
        }
    }

    async fn current_number(session: &QueueSession<FakeService>, counter: CounterId) -> Option<u32> {
        session
            .view(|c| c.counter(counter).ok().and_then(|c| c.current_number()))
            .await
            .map(QueueNumber::get)
    }

    async fn waiting_ids(session: &QueueSession<FakeService>, counter: CounterId) -> Vec<EntryId> {
        session
            .view(|c| c.store().waiting_ids(counter).to_vec())
            .await
    }

    #[tokio::test]
    async fn refresh_mirrors_server_state() {
        let s = setup(AlreadyServingPolicy::Reject);
        let session = QueueSession::new(
            Arc::new(FakeService::new(s.server)),
            AlreadyServingPolicy::Reject,
        );

        assert!(session.refresh(s.counter).await.expect("refresh"));
        assert_eq!(waiting_ids(&session, s.counter).await, s.ids);
        assert_eq!(current_number(&session, s.counter).await, None);
    }

    #[tokio::test]
    async fn serve_skip_serve_round_trip() {
        let s = setup(AlreadyServingPolicy::Reject);
        let session = QueueSession::new(
            Arc::new(FakeService::new(s.server)),
            AlreadyServingPolicy::Reject,
        );
        session.refresh(s.counter).await.expect("refresh");

        let served = session.serve_next(s.counter).await.expect("serve");
        assert_eq!(served.id, s.ids[0]);
        assert_eq!(current_number(&session, s.counter).await, Some(10));

        session.skip_patient(s.counter).await.expect("skip");
        assert_eq!(current_number(&session, s.counter).await, None);
        assert_eq!(
            waiting_ids(&session, s.counter).await,
            vec![s.ids[1], s.ids[2], s.ids[0]]
        );

        session.serve_next(s.counter).await.expect("serve");
        assert_eq!(current_number(&session, s.counter).await, Some(11));
    }

    #[tokio::test]
    async fn failed_commit_rolls_back() {
        let s = setup(AlreadyServingPolicy::Reject);
        let service = Arc::new(FakeService::new(s.server));
        let session = QueueSession::new(service.clone(), AlreadyServingPolicy::Reject);
        session.refresh(s.counter).await.expect("refresh");

        service.unavailable.store(true, Ordering::SeqCst);
        let err = session.serve_next(s.counter).await.expect_err("offline");
        assert!(matches!(err, QueueError::ServiceUnavailable(_)));

        assert_eq!(current_number(&session, s.counter).await, None);
        assert_eq!(waiting_ids(&session, s.counter).await, s.ids);
    }

    #[tokio::test]
    async fn local_failure_never_reaches_service() {
        let s = setup(AlreadyServingPolicy::Reject);
        let session = QueueSession::new(
            Arc::new(FakeService::new(s.server)),
            AlreadyServingPolicy::Reject,
        );
        session.refresh(s.counter).await.expect("refresh");

        let err = session.skip_patient(s.counter).await.expect_err("idle");
        assert_eq!(err, QueueError::NothingServing(s.counter));
        let server_current = session
            .service()
            .with(|c| Ok(c.counter(s.counter)?.current_number()))
            .expect("server view");
        assert_eq!(server_current, None);
    }

    #[tokio::test]
    async fn confirmed_snapshot_overrides_stale_optimism() {
        let mut s = setup(AlreadyServingPolicy::Reject);
        let session_service = {
            // Another desk already served and finished #10 on the server.
            s.server.serve_next(s.counter).expect("serve");
            s.server.complete_current(s.counter).expect("complete");
            FakeService::new(s.server.clone())
        };

        let stale = setup_stale_mirror(&s);
        let session = QueueSession::new(Arc::new(session_service), AlreadyServingPolicy::Reject);
        {
            let mut state = session.state.lock().await;
            state.controller = stale;
        }

        let served = session.serve_next(s.counter).await.expect("serve");
        assert_eq!(served.id, s.ids[1]);
        assert_eq!(current_number(&session, s.counter).await, Some(11));
        assert_eq!(waiting_ids(&session, s.counter).await, vec![s.ids[2]]);
    }

    /// A mirror that still believes #10 is waiting.
    fn setup_stale_mirror(s: &Setup) -> ServingController {
        let mut mirror = ServingController::new(AlreadyServingPolicy::Reject);
        let counter = s.server.counter(s.counter).expect("counter").clone();
        mirror
            .add_counter(CounterState::new(
                counter.id(),
                counter.title().clone(),
                counter.counter_number(),
            ))
            .expect("add");
        for id in &s.ids {
            let mut entry = s.server.store().get(*id).expect("entry").clone();
            entry.status = crate::entry::EntryStatus::Waiting;
            mirror.enqueue(entry).expect("enqueue");
        }
        mirror
    }

    #[tokio::test]
    async fn second_serve_next_in_flight_is_rejected() {
        let s = setup(AlreadyServingPolicy::AutoComplete);
        let gate = Arc::new(Notify::new());
        let mut service = FakeService::new(s.server);
        service.gate = Some(gate.clone());
        let session = QueueSession::new(Arc::new(service), AlreadyServingPolicy::AutoComplete);
        session.refresh(s.counter).await.expect("refresh");

        let (first, second) = tokio::join!(session.serve_next(s.counter), async {
            tokio::task::yield_now().await;
            let result = session.serve_next(s.counter).await;
            gate.notify_one();
            result
        });

        assert_eq!(first.expect("first serve").id, s.ids[0]);
        assert_eq!(
            second.expect_err("in flight"),
            QueueError::ActionInFlight(s.counter)
        );
        assert_eq!(current_number(&session, s.counter).await, Some(10));
    }

    #[tokio::test]
    async fn superseded_response_is_discarded() {
        let s = setup(AlreadyServingPolicy::Reject);
        let gate = Arc::new(Notify::new());
        let mut service = FakeService::new(s.server);
        service.gate = Some(gate.clone());
        let session = QueueSession::new(Arc::new(service), AlreadyServingPolicy::Reject);
        session.refresh(s.counter).await.expect("refresh");

        let (first, second) = tokio::join!(session.serve_next(s.counter), async {
            tokio::task::yield_now().await;
            // Issued after the serve-next; the server has not served anyone yet, so it fails
            // and rolls back to the optimistic serve.
            let result = session.skip_patient(s.counter).await;
            gate.notify_one();
            result
        });

        assert_eq!(
            second.expect_err("server has nothing serving"),
            QueueError::NothingServing(s.counter)
        );
        assert!(matches!(first, Err(QueueError::Superseded(_))));
        assert_eq!(current_number(&session, s.counter).await, Some(10));
        assert_eq!(
            waiting_ids(&session, s.counter).await,
            vec![s.ids[1], s.ids[2]]
        );
    }

    #[tokio::test]
    async fn late_superseded_commit_is_reconciled() {
        let s = setup(AlreadyServingPolicy::AutoComplete);
        let gate = Arc::new(Notify::new());
        let mut service = FakeService::new(s.server);
        service.gate = Some(gate.clone());
        let session = QueueSession::new(Arc::new(service), AlreadyServingPolicy::AutoComplete);
        session.refresh(s.counter).await.expect("refresh");

        let (first, second) = tokio::join!(session.serve_next(s.counter), async {
            tokio::task::yield_now().await;
            // Lands on the server first; the held serve-next then auto-completes #12 and
            // serves #10.
            let result = session.recall_patient(s.counter, s.ids[2]).await;
            gate.notify_one();
            result
        });

        assert_eq!(second.expect("recall").id, s.ids[2]);
        assert!(matches!(first, Err(QueueError::Superseded(_))));

        let server_current = session
            .service()
            .with(|c| Ok(c.counter(s.counter)?.current_number()))
            .expect("server view")
            .map(QueueNumber::get);
        assert_eq!(server_current, Some(10));
        assert_eq!(current_number(&session, s.counter).await, Some(10));
        assert_eq!(waiting_ids(&session, s.counter).await, vec![s.ids[1]]);
    }

    #[tokio::test]
    async fn reorder_is_committed_and_mirrored() {
        let s = setup(AlreadyServingPolicy::Reject);
        let session = QueueSession::new(
            Arc::new(FakeService::new(s.server)),
            AlreadyServingPolicy::Reject,
        );
        session.refresh(s.counter).await.expect("refresh");

        let order = vec![s.ids[2], s.ids[0], s.ids[1]];
        session
            .reorder(s.counter, order.clone())
            .await
            .expect("reorder");
        assert_eq!(waiting_ids(&session, s.counter).await, order);

        let served = session.serve_next(s.counter).await.expect("serve");
        assert_eq!(served.id, s.ids[2]);
    }

    #[tokio::test]
    async fn recall_and_complete_flow() {
        let s = setup(AlreadyServingPolicy::Reject);
        let session = QueueSession::new(
            Arc::new(FakeService::new(s.server)),
            AlreadyServingPolicy::Reject,
        );
        session.refresh(s.counter).await.expect("refresh");

        let recalled = session
            .recall_patient(s.counter, s.ids[2])
            .await
            .expect("recall");
        assert_eq!(recalled.id, s.ids[2]);
        assert_eq!(current_number(&session, s.counter).await, Some(12));

        let done = session.complete_current(s.counter).await.expect("complete");
        assert_eq!(done.id, s.ids[2]);
        assert_eq!(current_number(&session, s.counter).await, None);
    }
}
