use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use queue_core::QueueError;
use queue_wire::{error_to_wire, ErrorWire, WireError};

/// Error returned by every handler. Renders as an [`ErrorWire`] body.
#[derive(Debug)]
pub enum ApiError {
    Queue(QueueError),
    Wire(WireError),
}

impl From<QueueError> for ApiError {
    fn from(err: QueueError) -> Self {
        ApiError::Queue(err)
    }
}

impl From<WireError> for ApiError {
    fn from(err: WireError) -> Self {
        ApiError::Wire(err)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// HTTP status for a queue error.
pub fn status_for(err: &QueueError) -> StatusCode {
    match err {
        QueueError::NotFound(_) | QueueError::CounterNotFound(_) => StatusCode::NOT_FOUND,
        QueueError::EmptyQueue(_)
        | QueueError::CounterInactive(_)
        | QueueError::NothingServing(_)
        | QueueError::AlreadyServing { .. }
        | QueueError::InvalidTransition(_)
        | QueueError::ActionInFlight(_)
        | QueueError::Superseded(_) => StatusCode::CONFLICT,
        QueueError::InvalidOrder(_) | QueueError::DuplicateId(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        QueueError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        QueueError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Queue(err) => (status_for(err), error_to_wire(err)),
            ApiError::Wire(err) => (
                StatusCode::BAD_REQUEST,
                ErrorWire {
                    kind: "invalid_input".into(),
                    message: err.to_string(),
                    counter_id: None,
                    entry_id: None,
                    number: None,
                    detail: Some(err.to_string()),
                },
            ),
        };

        if status.is_server_error() {
            tracing::error!("{} {}: {}", status.as_u16(), body.kind, body.message);
        } else {
            tracing::debug!("{} {}: {}", status.as_u16(), body.kind, body.message);
        }

        (status, Json(body)).into_response()
    }
}
