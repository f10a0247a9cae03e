//! # API Shared
//!
//! Shared request/response definitions for the queue APIs.
//!
//! Contains:
//! - Request bodies (`dto` module)
//! - Shared services like `HealthService`
//!
//! Used by `api-rest` and `queue-client` so both sides of the HTTP boundary agree on shape.

pub mod dto;
pub mod health;

pub use dto::{
    AssignReq, CheckInReq, CreateCounterReq, EntryActionReq, HealthRes, PurgeRes, ReorderReq,
    ServerConfigRes,
};
pub use health::HealthService;
