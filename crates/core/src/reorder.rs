//! Sidebar reorder binding.
//!
//! Translates drag-and-drop gestures and the "sort by priority" suggestion into a full id
//! order, which is then applied with [`crate::ServingController::reorder`].

use crate::entry::QueueEntry;
use crate::{QueueError, QueueResult};
use queue_types::EntryId;

/// Returns `order` with the item at `from` dropped at index `to`.
pub fn move_entry(order: &[EntryId], from: usize, to: usize) -> QueueResult<Vec<EntryId>> {
    if from >= order.len() || to >= order.len() {
        return Err(QueueError::InvalidOrder(format!(
            "cannot move position {from} to {to} in a list of {}",
            order.len()
        )));
    }

    let mut moved = order.to_vec();
    let id = moved.remove(from);
    moved.insert(to, id);
    Ok(moved)
}

/// Suggested order: high priority first, then by queue number. Stable for equal keys.
pub fn prioritised(entries: &[&QueueEntry]) -> Vec<EntryId> {
    let mut sorted = entries.to_vec();
    sorted.sort_by_key(|e| (e.priority, e.queue_number));
    sorted.into_iter().map(|e| e.id).collect()
}
