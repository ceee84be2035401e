use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::client::ClientError;
use crate::messages;
use crate::orchestrator::FlowError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorObject,
}

#[derive(Debug, Serialize)]
pub struct ErrorObject {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldError>,
}

/// One failed form rule, keyed by the form field it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

impl FieldError {
    pub fn new(field: &'static str, message: &'static str) -> Self {
        Self { field, message }
    }
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(&'static str, String),
    Unprocessable(&'static str, String, Vec<FieldError>),
    NotFound(&'static str, String),
    Conflict(&'static str, String),
    BadGateway(&'static str, String),
    Internal(String),
}

impl ApiError {
    pub fn validation(fields: Vec<FieldError>) -> Self {
        ApiError::Unprocessable("VALIDATION_FAILED", messages::VALIDATION_FAILED.into(), fields)
    }

    fn to_error_response(code: &str, message: &str, fields: Vec<FieldError>) -> Json<ErrorResponse> {
        Json(ErrorResponse {
            error: ErrorObject {
                code: code.to_string(),
                message: message.to_string(),
                fields,
            },
        })
    }
}

impl From<ClientError> for ApiError {
    fn from(e: ClientError) -> Self {
        match e.status() {
            Some(404) => ApiError::NotFound("NOT_FOUND", messages::NOT_FOUND.into()),
            Some(s) if (400..500).contains(&s) => {
                tracing::warn!(error = %e, "upstream rejected request");
                upstream_rejection(s, &e.message())
            }
            _ => {
                tracing::error!(error = %e, "upstream call failed");
                ApiError::BadGateway("UPSTREAM_UNAVAILABLE", messages::LOAD_FAILED.into())
            }
        }
    }
}

/// Upstream refusals are shown through a fixed set of localized texts; the
/// server's own wording only reaches the log.
fn upstream_rejection(status: u16, message: &str) -> ApiError {
    let lower = message.to_lowercase();
    if lower.contains("appointment") || lower.contains("agendamento") {
        ApiError::Conflict("RECORD_IN_USE", messages::RECORD_IN_USE.into())
    } else if status == 409 || lower.contains("already exists") || lower.contains("duplicate") {
        ApiError::Conflict("DUPLICATE", messages::RECORD_DUPLICATE.into())
    } else {
        ApiError::BadRequest("UPSTREAM_REJECTED", messages::UPSTREAM_REJECTED.into())
    }
}

impl From<FlowError> for ApiError {
    fn from(e: FlowError) -> Self {
        match e {
            FlowError::Validation(fields) => ApiError::validation(fields),
            FlowError::Conflict(msg) => ApiError::Conflict("CONFLICT", msg),
            FlowError::InFlight(key) => {
                tracing::info!(%key, "duplicate submission rejected");
                ApiError::Conflict("IN_FLIGHT", messages::IN_FLIGHT.into())
            }
            FlowError::InvalidTransition { from, to } => {
                tracing::info!(%from, %to, "status transition refused");
                ApiError::Conflict("INVALID_TRANSITION", messages::INVALID_TRANSITION.into())
            }
            FlowError::ConfirmationRequired => {
                ApiError::Conflict("CONFIRMATION_REQUIRED", messages::CONFIRM_PERMANENT_DELETE.into())
            }
            FlowError::PaymentUnavailable => {
                ApiError::Conflict("PAYMENT_UNAVAILABLE", messages::PAYMENT_UNAVAILABLE.into())
            }
            FlowError::NotFound(what) => {
                tracing::info!(%what, "record not found");
                ApiError::NotFound("NOT_FOUND", messages::NOT_FOUND.into())
            }
            FlowError::Persist(e) if e.status() == Some(404) => {
                ApiError::NotFound("NOT_FOUND", messages::NOT_FOUND.into())
            }
            FlowError::Persist(e) => {
                tracing::error!(error = %e, "mutation failed upstream");
                ApiError::BadGateway("SAVE_FAILED", messages::SAVE_FAILED.into())
            }
            FlowError::Load(e) if e.status() == Some(404) => {
                ApiError::NotFound("NOT_FOUND", messages::NOT_FOUND.into())
            }
            FlowError::Load(e) => {
                tracing::error!(error = %e, "loading failed upstream");
                ApiError::BadGateway("LOAD_FAILED", messages::LOAD_FAILED.into())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(code, msg) => {
                (StatusCode::BAD_REQUEST, ApiError::to_error_response(code, &msg, vec![])).into_response()
            }
            ApiError::Unprocessable(code, msg, fields) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ApiError::to_error_response(code, &msg, fields),
            )
                .into_response(),
            ApiError::NotFound(code, msg) => {
                (StatusCode::NOT_FOUND, ApiError::to_error_response(code, &msg, vec![])).into_response()
            }
            ApiError::Conflict(code, msg) => {
                (StatusCode::CONFLICT, ApiError::to_error_response(code, &msg, vec![])).into_response()
            }
            ApiError::BadGateway(code, msg) => {
                (StatusCode::BAD_GATEWAY, ApiError::to_error_response(code, &msg, vec![])).into_response()
            }
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::to_error_response("INTERNAL", &msg, vec![]),
            )
                .into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected(status: u16, message: &str) -> ApiError {
        ApiError::from(ClientError::Status {
            path: "/customers/c1".into(),
            status,
            message: message.into(),
        })
    }

    #[test]
    fn upstream_wording_is_replaced() {
        match rejected(400, "Cannot delete customer with existing appointments") {
            ApiError::Conflict(code, msg) => {
                assert_eq!(code, "RECORD_IN_USE");
                assert_eq!(msg, messages::RECORD_IN_USE);
            }
            other => panic!("unexpected {other:?}"),
        }
        match rejected(422, "price must be a number") {
            ApiError::BadRequest(code, msg) => {
                assert_eq!(code, "UPSTREAM_REJECTED");
                assert_eq!(msg, messages::UPSTREAM_REJECTED);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(rejected(409, "E11000 duplicate key"), ApiError::Conflict("DUPLICATE", _)));
    }

    #[test]
    fn missing_and_failing_upstream() {
        assert!(matches!(rejected(404, "Customer not found"), ApiError::NotFound("NOT_FOUND", _)));
        match rejected(503, "upstream down") {
            ApiError::BadGateway(_, msg) => assert_eq!(msg, messages::LOAD_FAILED),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn validation_lists_fields() {
        let response = ApiError::validation(vec![FieldError::new("title", messages::TITLE_REQUIRED)]).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
