// src/routes/appointment_routes.rs

use axum::{
    body::Bytes,
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    calendar::CalendarEvent,
    error::ApiError,
    finance::{self, FinanceView},
    models::{AppState, ApiOk, AppointmentDraft, AppointmentRecord},
    orchestrator::MutationOutcome,
    payment::{self, PaymentForm},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/appointments", post(create_appointment))
        .route("/appointments/{id}", get(get_appointment).patch(update_appointment))
        .route("/appointments/{id}/complete", post(complete_appointment))
        .route("/appointments/{id}/cancel", post(cancel_appointment))
        .route("/appointments/{id}/payment", post(register_payment))
}

/* -------------------------
   DTOs
--------------------------*/

#[derive(Debug, Serialize)]
pub struct AppointmentDetail {
    pub record: AppointmentRecord,
    pub finance: FinanceView,
    pub event: Option<CalendarEvent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequest {
    #[serde(default)]
    pub confirm_permanent: bool,
}

/* -------------------------
   Handlers
--------------------------*/

pub async fn create_appointment(
    State(state): State<AppState>,
    Json(mut draft): Json<AppointmentDraft>,
) -> Result<Json<ApiOk<MutationOutcome>>, ApiError> {
    draft.id = None;
    let outcome = state.agenda.submit(draft).await?;
    Ok(Json(ApiOk { data: outcome }))
}

pub async fn get_appointment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiOk<AppointmentDetail>>, ApiError> {
    let record = state.agenda.fetch_record(&id).await?;
    let detail = AppointmentDetail {
        finance: finance::finance_view(&record),
        event: state.agenda.formatter().format_event(&record),
        record,
    };
    Ok(Json(ApiOk { data: detail }))
}

pub async fn update_appointment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(mut draft): Json<AppointmentDraft>,
) -> Result<Json<ApiOk<MutationOutcome>>, ApiError> {
    draft.id = Some(id);
    let outcome = state.agenda.submit(draft).await?;
    Ok(Json(ApiOk { data: outcome }))
}

pub async fn complete_appointment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiOk<MutationOutcome>>, ApiError> {
    let outcome = state.agenda.complete(&id).await?;
    Ok(Json(ApiOk { data: outcome }))
}

/// Body is optional; an empty one means "not confirmed".
pub async fn cancel_appointment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<ApiOk<MutationOutcome>>, ApiError> {
    let req: CancelRequest = if body.is_empty() {
        CancelRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest("INVALID_BODY", format!("invalid cancel request: {e}")))?
    };
    let outcome = state.agenda.cancel(&id, req.confirm_permanent).await?;
    Ok(Json(ApiOk { data: outcome }))
}

pub async fn register_payment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(form): Json<PaymentForm>,
) -> Result<Json<ApiOk<MutationOutcome>>, ApiError> {
    let outcome = payment::register_payment(&state.agenda, &id, form).await?;
    Ok(Json(ApiOk { data: outcome }))
}
