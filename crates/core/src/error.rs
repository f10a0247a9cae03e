use queue_types::{CounterId, EntryId, QueueNumber};

/// Errors raised by queue operations.
///
/// Every serving-controller operation fails closed: when one of these is returned the store
/// and counter state are exactly as they were before the call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("no patients are waiting at counter {0}")]
    EmptyQueue(CounterId),
    #[error("counter {0} is not active")]
    CounterInactive(CounterId),
    #[error("counter {0} is not serving anyone")]
    NothingServing(CounterId),
    #[error("counter {counter_id} is already serving number {number}")]
    AlreadyServing {
        counter_id: CounterId,
        number: QueueNumber,
    },
    #[error("entry not found: {0}")]
    NotFound(EntryId),
    #[error("counter not found: {0}")]
    CounterNotFound(CounterId),
    #[error("invalid order: {0}")]
    InvalidOrder(String),
    #[error("entry already exists: {0}")]
    DuplicateId(EntryId),
    #[error("invalid transition: {0}")]
    InvalidTransition(String),
    #[error("a serve-next is already in flight on counter {0}")]
    ActionInFlight(CounterId),
    #[error("action {0} was superseded by a newer action")]
    Superseded(String),
    #[error("queue service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl QueueError {
    /// Stable machine-readable name, used in REST error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            QueueError::EmptyQueue(_) => "empty_queue",
            QueueError::CounterInactive(_) => "counter_inactive",
            QueueError::NothingServing(_) => "nothing_serving",
            QueueError::AlreadyServing { .. } => "already_serving",
            QueueError::NotFound(_) => "not_found",
            QueueError::CounterNotFound(_) => "counter_not_found",
            QueueError::InvalidOrder(_) => "invalid_order",
            QueueError::DuplicateId(_) => "duplicate_id",
            QueueError::InvalidTransition(_) => "invalid_transition",
            QueueError::ActionInFlight(_) => "action_in_flight",
            QueueError::Superseded(_) => "superseded",
            QueueError::ServiceUnavailable(_) => "service_unavailable",
            QueueError::InvalidInput(_) => "invalid_input",
        }
    }
}

pub type QueueResult<T> = std::result::Result<T, QueueError>;
