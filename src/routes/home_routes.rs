use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::models::{AppState, ApiOk};

#[derive(Serialize)]
pub struct HealthData {
    pub status: &'static str,
    pub timezone: &'static str,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

pub async fn health(State(state): State<AppState>) -> Json<ApiOk<HealthData>> {
    Json(ApiOk {
        data: HealthData {
            status: "ok",
            timezone: state.timezone.name(),
        },
    })
}
