//! The queue service collaborator.
//!
//! The external queue service owns persisted queue state. The client-side mirror reaches it
//! only through this trait; `queue-client` implements it over HTTP and tests implement it in
//! memory.

use crate::controller::CounterSnapshot;
use crate::counter::CounterState;
use crate::entry::QueueEntry;
use crate::{QueueError, QueueResult};
use async_trait::async_trait;
use queue_types::{CounterId, EntryId};

#[async_trait]
pub trait QueueService: Send + Sync {
    /// Waiting sequence for a counter, head first.
    async fn fetch_waiting(&self, counter_id: CounterId) -> QueueResult<Vec<QueueEntry>>;

    async fn fetch_counter_state(&self, counter_id: CounterId) -> QueueResult<CounterState>;

    /// The entry the counter is serving, if any.
    async fn fetch_serving(&self, counter_id: CounterId) -> QueueResult<Option<QueueEntry>>;

    /// Atomically claims the head of the counter's queue.
    async fn commit_serve_next(&self, counter_id: CounterId) -> QueueResult<QueueEntry>;

    async fn commit_skip(&self, counter_id: CounterId, entry_id: EntryId) -> QueueResult<()>;

    async fn commit_recall(&self, counter_id: CounterId, entry_id: EntryId) -> QueueResult<()>;

    async fn commit_complete(&self, counter_id: CounterId, entry_id: EntryId) -> QueueResult<()>;

    async fn commit_reorder(
        &self,
        counter_id: CounterId,
        ordered_ids: &[EntryId],
    ) -> QueueResult<()>;

    /// Confirmed state of one counter, assembled from the three fetches.
    async fn fetch_snapshot(&self, counter_id: CounterId) -> QueueResult<CounterSnapshot> {
        let counter = self.fetch_counter_state(counter_id).await?;
        let serving = self.fetch_serving(counter_id).await?;
        let waiting = self.fetch_waiting(counter_id).await?;

        if let Some(entry) = &serving {
            if counter.current_entry() != Some(entry.id) {
                return Err(QueueError::ServiceUnavailable(format!(
                    "counter {counter_id} changed while its snapshot was being fetched"
                )));
            }
        }

        Ok(CounterSnapshot {
            counter,
            serving,
            waiting,
        })
    }
}
