//! # API REST
//!
//! REST API implementation for the clinic queue.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI documentation (served at `/api-docs/openapi.json`)
//! - REST-specific concerns (JSON error bodies, status codes, CORS)
//!
//! Uses `api-shared` for request bodies and `queue-wire` for queue records. The server binary
//! in the workspace root builds an [`AppState`] and serves [`router`].

#![warn(rust_2018_idioms)]

mod error;
mod handlers;
mod state;

pub use error::{status_for, ApiError, ApiResult};
pub use state::{AppState, QueueState};

use axum::{
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::server_config,
        handlers::list_counters,
        handlers::create_counter,
        handlers::get_counter,
        handlers::activate_counter,
        handlers::deactivate_counter,
        handlers::waiting,
        handlers::serving,
        handlers::serve_next,
        handlers::skip,
        handlers::recall,
        handlers::complete,
        handlers::reorder,
        handlers::check_in,
        handlers::remove_entry,
        handlers::unassigned,
        handlers::assign,
        handlers::purge_completed,
        handlers::display,
    ),
    components(schemas(
        api_shared::HealthRes,
        api_shared::ServerConfigRes,
        api_shared::CreateCounterReq,
        api_shared::CheckInReq,
        api_shared::EntryActionReq,
        api_shared::AssignReq,
        api_shared::ReorderReq,
        api_shared::PurgeRes,
        queue_wire::QueueEntryWire,
        queue_wire::PatientWire,
        queue_wire::EntryStatusWire,
        queue_wire::PriorityWire,
        queue_wire::EntryListWire,
        queue_wire::CounterStateWire,
        queue_wire::CounterListWire,
        queue_wire::WaitingListWire,
        queue_wire::ServingWire,
        queue_wire::BoardWire,
        queue_wire::CounterDisplayWire,
        queue_wire::ErrorWire,
    ))
)]
pub struct ApiDoc;

/// All queue routes, with permissive CORS for waiting-room displays served from elsewhere.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::server_config))
        .route(
            "/counters",
            get(handlers::list_counters).post(handlers::create_counter),
        )
        .route("/counters/:id", get(handlers::get_counter))
        .route("/counters/:id/activate", post(handlers::activate_counter))
        .route("/counters/:id/deactivate", post(handlers::deactivate_counter))
        .route("/counters/:id/waiting", get(handlers::waiting))
        .route("/counters/:id/serving", get(handlers::serving))
        .route("/counters/:id/serve-next", post(handlers::serve_next))
        .route("/counters/:id/skip", post(handlers::skip))
        .route("/counters/:id/recall", post(handlers::recall))
        .route("/counters/:id/complete", post(handlers::complete))
        .route("/counters/:id/order", put(handlers::reorder))
        .route("/entries", post(handlers::check_in))
        .route("/entries/unassigned", get(handlers::unassigned))
        .route("/entries/purge-completed", post(handlers::purge_completed))
        .route("/entries/:id", delete(handlers::remove_entry))
        .route("/entries/:id/assign", post(handlers::assign))
        .route("/display", get(handlers::display))
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
