// src/routes/calendar_routes.rs

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

use crate::{
    calendar::{CalendarEvent, FormRoute, Selection},
    error::ApiError,
    models::{AppState, ApiOk, AppointmentDraft},
    orchestrator::MutationOutcome,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/calendar/events", get(list_events))
        .route("/calendar/select", post(select_range))
        .route("/calendar/open", post(open_event))
        .route("/calendar/move", post(move_event))
}

pub async fn list_events(State(state): State<AppState>) -> Result<Json<ApiOk<Vec<CalendarEvent>>>, ApiError> {
    let events = state.agenda.reload().await?;
    Ok(Json(ApiOk { data: events }))
}

pub async fn select_range(
    State(state): State<AppState>,
    Json(sel): Json<Selection>,
) -> Result<Json<ApiOk<AppointmentDraft>>, ApiError> {
    if sel.end <= sel.start {
        return Err(ApiError::BadRequest(
            "INVALID_RANGE",
            "Selection must end after it starts".into(),
        ));
    }
    let draft = state.agenda.formatter().draft_from_selection(&sel.start, &sel.end);
    Ok(Json(ApiOk { data: draft }))
}

pub async fn open_event(
    State(state): State<AppState>,
    Json(event): Json<CalendarEvent>,
) -> Json<ApiOk<FormRoute>> {
    Json(ApiOk {
        data: state.agenda.formatter().open_event(&event),
    })
}

pub async fn move_event(
    State(state): State<AppState>,
    Json(event): Json<CalendarEvent>,
) -> Result<Json<ApiOk<MutationOutcome>>, ApiError> {
    let outcome = state.agenda.move_event(&event).await?;
    Ok(Json(ApiOk { data: outcome }))
}
