use axum::{Json, Router};
use serde::Serialize;

use crate::models::{AppState, ApiOk};

pub mod account_routes;
pub mod appointment_routes;
pub mod calendar_routes;
pub mod home_routes;
pub mod payment_routes;
pub mod report_routes;
pub mod resource_routes;
pub mod schedule_routes;

/// Body of a successful mutation outside the appointment flows.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Saved<T> {
    pub message: &'static str,
    pub close_after_ms: u64,
    pub record: T,
}

pub fn saved<T>(state: &AppState, message: &'static str, record: T) -> Json<ApiOk<Saved<T>>> {
    Json(ApiOk {
        data: Saved {
            message,
            close_after_ms: state.agenda.close_after_ms(),
            record,
        },
    })
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .merge(calendar_routes::router())
        .merge(appointment_routes::router())
        .merge(resource_routes::router())
        .merge(schedule_routes::router())
        .merge(payment_routes::router())
        .merge(account_routes::router())
        .merge(report_routes::router())
        .merge(home_routes::router());

    Router::new().nest("/api/v1", api).with_state(state)
}
