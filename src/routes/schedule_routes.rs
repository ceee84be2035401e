// src/routes/schedule_routes.rs

use axum::{
    extract::{Path, Query, State},
    routing::{get, patch, post},
    Json, Router,
};
use serde_json::Value;

use crate::{
    client::{ClientError, Resource, ScheduleFilter},
    error::ApiError,
    messages,
    models::{self, AppState, ApiOk, Schedule},
    routes::{Saved, saved},
    schedule::{self, ScheduleForm, ScheduleSeries},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/schedules", post(create_schedule))
        .route(
            "/schedules/{id}",
            get(get_schedule).patch(update_schedule).delete(delete_schedule),
        )
        .route("/schedules/professional/{id}", get(list_for_professional))
        .route(
            "/schedules/professional/{id}/future/{schedule_id}",
            patch(update_future).delete(delete_future),
        )
}

fn payload(state: &AppState, form: ScheduleForm) -> Result<Value, ApiError> {
    let payload = form
        .into_payload(state.timezone.name())
        .map_err(ApiError::validation)?;
    serde_json::to_value(payload).map_err(|e| ApiError::Internal(format!("encode error: {e}")))
}

pub async fn create_schedule(
    State(state): State<AppState>,
    Json(form): Json<ScheduleForm>,
) -> Result<Json<ApiOk<Saved<Value>>>, ApiError> {
    let body = payload(&state, form)?;
    let record = state.client.create(Resource::Schedules, &body).await?;
    tracing::info!("schedule created");
    Ok(saved(&state, messages::RECORD_SAVED, record))
}

pub async fn get_schedule(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiOk<Value>>, ApiError> {
    let data = state.client.get(Resource::Schedules, &id).await?;
    Ok(Json(ApiOk { data }))
}

pub async fn update_schedule(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(form): Json<ScheduleForm>,
) -> Result<Json<ApiOk<Saved<Value>>>, ApiError> {
    let body = payload(&state, form)?;
    let record = state.client.update(Resource::Schedules, &id, &body).await?;
    tracing::info!(%id, "schedule updated");
    Ok(saved(&state, messages::RECORD_SAVED, record))
}

pub async fn delete_schedule(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiOk<Saved<Value>>>, ApiError> {
    let record = state
        .client
        .remove(Resource::Schedules, &id)
        .await
        .map_err(schedule::translate_delete_error)?;
    tracing::info!(%id, "schedule removed");
    Ok(saved(&state, messages::RECORD_DELETED, record))
}

pub async fn list_for_professional(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(filter): Query<ScheduleFilter>,
) -> Result<Json<ApiOk<Vec<ScheduleSeries>>>, ApiError> {
    let body = state.client.schedules_by_professional(&id, &filter).await?;
    let items: Vec<Value> = serde_json::from_value(body).map_err(|e| ClientError::Decode {
        path: format!("/schedules/professional/{id}"),
        reason: e.to_string(),
    })?;
    let schedules: Vec<Schedule> = models::decode_each(items, "schedule");
    Ok(Json(ApiOk {
        data: schedule::group_by_series(schedules),
    }))
}

pub async fn update_future(
    State(state): State<AppState>,
    Path((id, schedule_id)): Path<(String, String)>,
    Json(mut form): Json<ScheduleForm>,
) -> Result<Json<ApiOk<Saved<Value>>>, ApiError> {
    form.professional = Some(id.clone());
    let body = payload(&state, form)?;
    let record = state
        .client
        .update_future_schedules(&id, &schedule_id, &body)
        .await?;
    tracing::info!(professional = %id, %schedule_id, "future schedules updated");
    Ok(saved(&state, messages::RECORD_SAVED, record))
}

pub async fn delete_future(
    State(state): State<AppState>,
    Path((id, schedule_id)): Path<(String, String)>,
) -> Result<Json<ApiOk<Saved<Value>>>, ApiError> {
    let record = state
        .client
        .delete_future_schedules(&id, &schedule_id)
        .await
        .map_err(schedule::translate_delete_error)?;
    tracing::info!(professional = %id, %schedule_id, "future schedules removed");
    Ok(saved(&state, messages::RECORD_DELETED, record))
}
