use queue_core::{
    CoreConfig, CounterId, CounterState, DisplayProjection, QueueError, QueueResult,
    ServingController, TicketDispenser,
};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Authoritative queue state. Every handler takes the lock for the whole of its read or
/// transition, which makes serve-next an atomic claim across clients.
pub struct QueueState {
    pub controller: ServingController,
    pub dispenser: TicketDispenser,
}

/// Application state for the REST API server
///
/// Shared by all request handlers; cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub(crate) cfg: Arc<CoreConfig>,
    pub(crate) queue: Arc<Mutex<QueueState>>,
}

impl AppState {
    /// Builds the state and creates the configured seed counters, numbered from 1.
    pub fn new(cfg: Arc<CoreConfig>) -> QueueResult<Self> {
        let mut controller = ServingController::new(cfg.already_serving());
        for (number, title) in (1u32..).zip(cfg.seed_counters()) {
            let id = CounterId::new();
            controller.add_counter(CounterState::new(id, title.clone(), number))?;
            tracing::info!("-- Counter {number} '{title}' opened as {id}");
        }

        Ok(Self {
            cfg,
            queue: Arc::new(Mutex::new(QueueState {
                controller,
                dispenser: TicketDispenser::starting_today(),
            })),
        })
    }

    pub(crate) fn projection(&self) -> DisplayProjection {
        DisplayProjection::new(self.cfg.display_next_up())
    }
}

/// Next free counter number: one above the highest in use.
pub(crate) fn next_counter_number(controller: &ServingController) -> QueueResult<u32> {
    controller
        .counters()
        .iter()
        .map(|c| c.counter_number())
        .max()
        .unwrap_or(0)
        .checked_add(1)
        .ok_or_else(|| QueueError::InvalidInput("no counter numbers left".into()))
}
