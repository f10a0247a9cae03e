//! Request handlers.
//!
//! Bodies are read as raw bytes and parsed with `queue_wire::parse_json_bytes`, so a payload
//! that does not match its schema is answered with the failing field path in an
//! [`ErrorWire`] body rather than axum's plain-text rejection.

use crate::error::{ApiError, ApiResult};
use crate::state::{next_counter_number, AppState};
use api_shared::{
    AssignReq, CheckInReq, CreateCounterReq, EntryActionReq, HealthRes, HealthService, PurgeRes,
    ReorderReq, ServerConfigRes,
};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use queue_core::{
    CounterId, CounterState, EntryId, NonEmptyText, PatientRef, QueueEntry, QueueError,
    ServingController,
};
use queue_wire::{
    board_to_wire, counter_to_wire, entry_to_wire, parse_json_bytes, BoardWire, CounterListWire,
    CounterStateWire, EntryListWire, ErrorWire, QueueEntryWire, ServingWire, WaitingListWire,
};

fn parse_counter_id(value: &str) -> ApiResult<CounterId> {
    CounterId::parse(value).map_err(|_| {
        ApiError::Queue(QueueError::InvalidInput(format!(
            "invalid counter id: {value}"
        )))
    })
}

fn parse_entry_id(value: &str) -> ApiResult<EntryId> {
    EntryId::parse(value).map_err(|_| {
        ApiError::Queue(QueueError::InvalidInput(format!(
            "invalid entry id: {value}"
        )))
    })
}

fn counter_wire(
    controller: &ServingController,
    counter_id: CounterId,
) -> ApiResult<CounterStateWire> {
    let counter = controller.counter(counter_id)?;
    Ok(counter_to_wire(
        counter,
        controller.store().waiting_count(counter_id),
    ))
}

fn waiting_wire(
    controller: &ServingController,
    counter_id: CounterId,
) -> ApiResult<WaitingListWire> {
    Ok(WaitingListWire {
        counter_id: counter_id.to_string(),
        entries: controller
            .waiting(counter_id)?
            .into_iter()
            .map(entry_to_wire)
            .collect(),
    })
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// Used for monitoring and load balancer health checks; never touches queue state.
#[axum::debug_handler]
pub(crate) async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    get,
    path = "/config",
    responses(
        (status = 200, description = "Serving policy and board settings", body = ServerConfigRes)
    )
)]
/// Server settings that clients mirror
///
/// Client sessions build their local controller with the same already-serving policy, so an
/// auto-completing serve-next is predicted locally instead of refused.
#[axum::debug_handler]
pub(crate) async fn server_config(State(state): State<AppState>) -> Json<ServerConfigRes> {
    Json(ServerConfigRes {
        already_serving_policy: state.cfg.already_serving().to_string(),
        display_next_up: state.cfg.display_next_up(),
    })
}

#[utoipa::path(
    get,
    path = "/counters",
    responses(
        (status = 200, description = "Counters ordered by counter number", body = CounterListWire)
    )
)]
#[axum::debug_handler]
pub(crate) async fn list_counters(State(state): State<AppState>) -> Json<CounterListWire> {
    let queue = state.queue.lock().await;
    let controller = &queue.controller;
    let counters = controller
        .counters()
        .into_iter()
        .map(|c| counter_to_wire(c, controller.store().waiting_count(c.id())))
        .collect();
    Json(CounterListWire { counters })
}

#[utoipa::path(
    post,
    path = "/counters",
    request_body = CreateCounterReq,
    responses(
        (status = 201, description = "Counter created", body = CounterStateWire),
        (status = 400, description = "Invalid title or duplicate counter number", body = ErrorWire)
    )
)]
/// Create a counter
///
/// The counter starts active and idle. When `counter_number` is omitted the next number above
/// the highest in use is taken.
#[axum::debug_handler]
pub(crate) async fn create_counter(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<CounterStateWire>)> {
    let req: CreateCounterReq = parse_json_bytes("create counter request", &body)?;
    let title = NonEmptyText::new(&req.title)
        .map_err(|_| QueueError::InvalidInput("counter title cannot be empty".into()))?;

    let mut queue = state.queue.lock().await;
    let controller = &mut queue.controller;
    let number = match req.counter_number {
        Some(n) => n,
        None => next_counter_number(controller)?,
    };
    let id = CounterId::new();
    controller.add_counter(CounterState::new(id, title, number))?;
    tracing::info!("Counter {number} '{}' created as {id}", req.title.trim());

    Ok((StatusCode::CREATED, Json(counter_wire(controller, id)?)))
}

#[utoipa::path(
    get,
    path = "/counters/{id}",
    params(("id" = String, Path, description = "Counter id (32 lowercase hex)")),
    responses(
        (status = 200, description = "Counter state", body = CounterStateWire),
        (status = 404, description = "Unknown counter", body = ErrorWire)
    )
)]
#[axum::debug_handler]
pub(crate) async fn get_counter(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<CounterStateWire>> {
    let counter_id = parse_counter_id(&id)?;
    let queue = state.queue.lock().await;
    Ok(Json(counter_wire(&queue.controller, counter_id)?))
}

#[utoipa::path(
    post,
    path = "/counters/{id}/activate",
    params(("id" = String, Path, description = "Counter id")),
    responses(
        (status = 200, description = "Counter activated", body = CounterStateWire),
        (status = 404, description = "Unknown counter", body = ErrorWire)
    )
)]
#[axum::debug_handler]
pub(crate) async fn activate_counter(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<CounterStateWire>> {
    let counter_id = parse_counter_id(&id)?;
    let mut queue = state.queue.lock().await;
    queue.controller.activate(counter_id)?;
    tracing::info!("Counter {counter_id} activated");
    Ok(Json(counter_wire(&queue.controller, counter_id)?))
}

#[utoipa::path(
    post,
    path = "/counters/{id}/deactivate",
    params(("id" = String, Path, description = "Counter id")),
    responses(
        (status = 200, description = "Counter deactivated", body = CounterStateWire),
        (status = 404, description = "Unknown counter", body = ErrorWire)
    )
)]
/// Deactivate a counter
///
/// The entry being served, if any, stays on the counter until it is skipped or completed.
#[axum::debug_handler]
pub(crate) async fn deactivate_counter(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<CounterStateWire>> {
    let counter_id = parse_counter_id(&id)?;
    let mut queue = state.queue.lock().await;
    queue.controller.deactivate(counter_id)?;
    tracing::info!("Counter {counter_id} deactivated");
    Ok(Json(counter_wire(&queue.controller, counter_id)?))
}

#[utoipa::path(
    get,
    path = "/counters/{id}/waiting",
    params(("id" = String, Path, description = "Counter id")),
    responses(
        (status = 200, description = "Waiting sequence, head first", body = WaitingListWire),
        (status = 404, description = "Unknown counter", body = ErrorWire)
    )
)]
#[axum::debug_handler]
pub(crate) async fn waiting(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<WaitingListWire>> {
    let counter_id = parse_counter_id(&id)?;
    let queue = state.queue.lock().await;
    Ok(Json(waiting_wire(&queue.controller, counter_id)?))
}

#[utoipa::path(
    get,
    path = "/counters/{id}/serving",
    params(("id" = String, Path, description = "Counter id")),
    responses(
        (status = 200, description = "Entry being served, if any", body = ServingWire),
        (status = 404, description = "Unknown counter", body = ErrorWire)
    )
)]
#[axum::debug_handler]
pub(crate) async fn serving(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ServingWire>> {
    let counter_id = parse_counter_id(&id)?;
    let queue = state.queue.lock().await;
    let entry = queue.controller.serving(counter_id)?.map(entry_to_wire);
    Ok(Json(ServingWire {
        counter_id: counter_id.to_string(),
        entry,
    }))
}

#[utoipa::path(
    post,
    path = "/counters/{id}/serve-next",
    params(("id" = String, Path, description = "Counter id")),
    responses(
        (status = 200, description = "Entry now being served", body = QueueEntryWire),
        (status = 404, description = "Unknown counter", body = ErrorWire),
        (status = 409, description = "Inactive, empty, or already serving", body = ErrorWire)
    )
)]
/// Serve the head of a counter's waiting sequence
///
/// The claim is atomic: two clients racing on the same counter can never be handed the same
/// entry.
#[axum::debug_handler]
pub(crate) async fn serve_next(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<QueueEntryWire>> {
    let counter_id = parse_counter_id(&id)?;
    let mut queue = state.queue.lock().await;
    let entry = queue.controller.serve_next(counter_id)?;
    tracing::info!(
        "Counter {counter_id} now serving #{} ({})",
        entry.queue_number,
        entry.id
    );
    Ok(Json(entry_to_wire(&entry)))
}

#[utoipa::path(
    post,
    path = "/counters/{id}/skip",
    params(("id" = String, Path, description = "Counter id")),
    request_body = EntryActionReq,
    responses(
        (status = 200, description = "Entry skipped to the tail", body = QueueEntryWire),
        (status = 409, description = "Nothing serving, or a different entry is serving", body = ErrorWire)
    )
)]
#[axum::debug_handler]
pub(crate) async fn skip(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<QueueEntryWire>> {
    let counter_id = parse_counter_id(&id)?;
    let req: EntryActionReq = parse_json_bytes("skip request", &body)?;
    let entry_id = parse_entry_id(&req.entry_id)?;

    let mut queue = state.queue.lock().await;
    queue.controller.ensure_serving(counter_id, entry_id)?;
    let entry = queue.controller.skip_patient(counter_id)?;
    tracing::info!("Counter {counter_id} skipped #{}", entry.queue_number);
    Ok(Json(entry_to_wire(&entry)))
}

#[utoipa::path(
    post,
    path = "/counters/{id}/recall",
    params(("id" = String, Path, description = "Counter id")),
    request_body = EntryActionReq,
    responses(
        (status = 200, description = "Entry now being served", body = QueueEntryWire),
        (status = 404, description = "Entry not waiting at this counter", body = ErrorWire),
        (status = 409, description = "Inactive or already serving", body = ErrorWire)
    )
)]
#[axum::debug_handler]
pub(crate) async fn recall(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<QueueEntryWire>> {
    let counter_id = parse_counter_id(&id)?;
    let req: EntryActionReq = parse_json_bytes("recall request", &body)?;
    let entry_id = parse_entry_id(&req.entry_id)?;

    let mut queue = state.queue.lock().await;
    let entry = queue.controller.recall_patient(counter_id, entry_id)?;
    tracing::info!("Counter {counter_id} recalled #{}", entry.queue_number);
    Ok(Json(entry_to_wire(&entry)))
}

#[utoipa::path(
    post,
    path = "/counters/{id}/complete",
    params(("id" = String, Path, description = "Counter id")),
    request_body = EntryActionReq,
    responses(
        (status = 200, description = "Entry completed", body = QueueEntryWire),
        (status = 409, description = "Nothing serving, or a different entry is serving", body = ErrorWire)
    )
)]
#[axum::debug_handler]
pub(crate) async fn complete(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<QueueEntryWire>> {
    let counter_id = parse_counter_id(&id)?;
    let req: EntryActionReq = parse_json_bytes("complete request", &body)?;
    let entry_id = parse_entry_id(&req.entry_id)?;

    let mut queue = state.queue.lock().await;
    queue.controller.ensure_serving(counter_id, entry_id)?;
    let entry = queue.controller.complete_current(counter_id)?;
    tracing::info!("Counter {counter_id} completed #{}", entry.queue_number);
    Ok(Json(entry_to_wire(&entry)))
}

#[utoipa::path(
    put,
    path = "/counters/{id}/order",
    params(("id" = String, Path, description = "Counter id")),
    request_body = ReorderReq,
    responses(
        (status = 200, description = "New waiting sequence", body = WaitingListWire),
        (status = 422, description = "Ids do not match the waiting set", body = ErrorWire)
    )
)]
/// Replace the order of a counter's waiting sequence
///
/// `entry_ids` must name every waiting entry exactly once.
#[axum::debug_handler]
pub(crate) async fn reorder(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<WaitingListWire>> {
    let counter_id = parse_counter_id(&id)?;
    let req: ReorderReq = parse_json_bytes("reorder request", &body)?;
    let order = req
        .entry_ids
        .iter()
        .map(|id| parse_entry_id(id))
        .collect::<ApiResult<Vec<_>>>()?;

    let mut queue = state.queue.lock().await;
    queue.controller.reorder(counter_id, &order)?;
    tracing::info!("Counter {counter_id} reordered ({} waiting)", order.len());
    Ok(Json(waiting_wire(&queue.controller, counter_id)?))
}

#[utoipa::path(
    post,
    path = "/entries",
    request_body = CheckInReq,
    responses(
        (status = 201, description = "Patient checked in", body = QueueEntryWire),
        (status = 400, description = "Invalid request", body = ErrorWire),
        (status = 404, description = "Unknown counter", body = ErrorWire)
    )
)]
/// Check a patient in
///
/// The server issues the queue number. Without `counter_id` the entry joins the unassigned
/// pool.
#[axum::debug_handler]
pub(crate) async fn check_in(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<QueueEntryWire>)> {
    let req: CheckInReq = parse_json_bytes("check-in request", &body)?;
    let display_name = NonEmptyText::new(&req.display_name)
        .map_err(|_| QueueError::InvalidInput("display_name cannot be empty".into()))?;
    let counter_id = req
        .counter_id
        .as_deref()
        .map(parse_counter_id)
        .transpose()?;

    let mut queue = state.queue.lock().await;
    if let Some(counter_id) = counter_id {
        // Refuse before a number is issued for an unknown counter.
        queue.controller.counter(counter_id)?;
    }
    let number = queue.dispenser.issue_now();
    let entry = QueueEntry::check_in(
        PatientRef::new(display_name, req.initials),
        number,
        req.priority.into(),
        counter_id,
    );
    queue.controller.enqueue(entry.clone())?;
    tracing::info!("Checked in #{number} as {}", entry.id);

    Ok((StatusCode::CREATED, Json(entry_to_wire(&entry))))
}

#[utoipa::path(
    delete,
    path = "/entries/{id}",
    params(("id" = String, Path, description = "Entry id")),
    responses(
        (status = 204, description = "Entry removed, or was already absent")
    )
)]
#[axum::debug_handler]
pub(crate) async fn remove_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let entry_id = parse_entry_id(&id)?;
    let mut queue = state.queue.lock().await;
    if let Some(entry) = queue.controller.remove_entry(entry_id) {
        tracing::info!("Removed #{} ({entry_id})", entry.queue_number);
    }
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/entries/unassigned",
    responses(
        (status = 200, description = "Waiting entries not assigned to a counter", body = EntryListWire)
    )
)]
#[axum::debug_handler]
pub(crate) async fn unassigned(State(state): State<AppState>) -> Json<EntryListWire> {
    let queue = state.queue.lock().await;
    let entries = queue
        .controller
        .store()
        .list_unassigned()
        .into_iter()
        .map(entry_to_wire)
        .collect();
    Json(EntryListWire { entries })
}

#[utoipa::path(
    post,
    path = "/entries/{id}/assign",
    params(("id" = String, Path, description = "Entry id")),
    request_body = AssignReq,
    responses(
        (status = 200, description = "Entry assigned", body = QueueEntryWire),
        (status = 404, description = "Unknown entry or counter", body = ErrorWire),
        (status = 409, description = "Entry is not an unassigned waiting entry", body = ErrorWire)
    )
)]
#[axum::debug_handler]
pub(crate) async fn assign(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<QueueEntryWire>> {
    let entry_id = parse_entry_id(&id)?;
    let req: AssignReq = parse_json_bytes("assign request", &body)?;
    let counter_id = parse_counter_id(&req.counter_id)?;

    let mut queue = state.queue.lock().await;
    queue.controller.assign(entry_id, counter_id)?;
    let entry = queue
        .controller
        .store()
        .get(entry_id)
        .ok_or(QueueError::NotFound(entry_id))?;
    tracing::info!("Assigned #{} to counter {counter_id}", entry.queue_number);
    Ok(Json(entry_to_wire(entry)))
}

#[utoipa::path(
    post,
    path = "/entries/purge-completed",
    responses(
        (status = 200, description = "Completed entries dropped", body = PurgeRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn purge_completed(State(state): State<AppState>) -> Json<PurgeRes> {
    let mut queue = state.queue.lock().await;
    let purged = queue.controller.purge_completed();
    tracing::info!("Purged {purged} completed entries");
    Json(PurgeRes { purged })
}

#[utoipa::path(
    get,
    path = "/display",
    responses(
        (status = 200, description = "Now-serving board", body = BoardWire)
    )
)]
/// Now-serving board for every counter
///
/// Counters without a current entry show a placeholder rather than an error.
#[axum::debug_handler]
pub(crate) async fn display(State(state): State<AppState>) -> Json<BoardWire> {
    let projection = state.projection();
    let queue = state.queue.lock().await;
    Json(board_to_wire(&projection.board(&queue.controller)))
}
