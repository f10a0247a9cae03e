//! # Queue Core
//!
//! Core business logic for the clinic counter queue.
//!
//! This crate holds the queue state and every rule that changes it:
//! - Queue entries and per-counter waiting sequences ([`QueueEntryStore`])
//! - Counter serving state ([`CounterState`])
//! - Serve-next, skip, recall and complete transitions ([`ServingController`])
//! - The "now serving" board ([`DisplayProjection`])
//! - Drag-style reordering of a waiting sequence ([`reorder`])
//! - The client-side mirror with optimistic updates ([`QueueSession`])
//!
//! **No API concerns**: HTTP servers, JSON wire formats and clients belong in `api-rest`,
//! `queue-wire` and `queue-client`.

pub mod config;
pub mod constants;
pub mod controller;
pub mod counter;
pub mod dispenser;
pub mod display;
pub mod entry;
pub mod error;
pub mod reorder;
pub mod service;
pub mod session;
pub mod store;

pub use config::{AlreadyServingPolicy, CoreConfig};
pub use controller::{CounterSnapshot, ServingController};
pub use counter::CounterState;
pub use dispenser::TicketDispenser;
pub use display::{CounterDisplay, DisplayProjection, NowServing, NowServingBoard};
pub use entry::{EntryStatus, PatientRef, Priority, QueueEntry};
pub use error::{QueueError, QueueResult};
pub use service::QueueService;
pub use session::{ActionKind, QueueSession};
pub use store::QueueEntryStore;

pub use queue_types::{ActionStamp, CounterId, EntryId, NonEmptyText, QueueNumber};
