// src/routes/resource_routes.rs
//
// Pass-through CRUD for the reference-data screens.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde_json::Value;

use crate::{
    client::Resource,
    error::ApiError,
    messages,
    models::{AppState, ApiOk},
    routes::{Saved, saved},
};

pub fn router() -> Router<AppState> {
    let mut router = Router::new()
        .route("/professionals/{id}/services", get(professional_services))
        .route("/professionals/insurances/available", get(available_insurances));
    for resource in [Resource::Customers, Resource::Professionals, Resource::Services] {
        router = router.merge(crud_router(resource));
    }
    router
}

fn crud_router(resource: Resource) -> Router<AppState> {
    let collection = format!("/{}", resource.segment());
    let item = format!("/{}/{{id}}", resource.segment());

    Router::new()
        .route(
            &collection,
            get(move |State(state): State<AppState>| list(state, resource)).post(
                move |State(state): State<AppState>, Json(body): Json<Value>| create(state, resource, body),
            ),
        )
        .route(
            &item,
            get(move |State(state): State<AppState>, Path(id): Path<String>| get_one(state, resource, id))
                .patch(
                    move |State(state): State<AppState>, Path(id): Path<String>, Json(body): Json<Value>| {
                        update(state, resource, id, body)
                    },
                )
                .delete(move |State(state): State<AppState>, Path(id): Path<String>| remove(state, resource, id)),
        )
}

async fn list(state: AppState, resource: Resource) -> Result<Json<ApiOk<Value>>, ApiError> {
    let data = state.client.list(resource).await?;
    Ok(Json(ApiOk { data }))
}

async fn get_one(state: AppState, resource: Resource, id: String) -> Result<Json<ApiOk<Value>>, ApiError> {
    let data = state.client.get(resource, &id).await?;
    Ok(Json(ApiOk { data }))
}

async fn create(state: AppState, resource: Resource, body: Value) -> Result<Json<ApiOk<Saved<Value>>>, ApiError> {
    let record = state.client.create(resource, &body).await?;
    tracing::info!(resource = resource.segment(), "record created");
    Ok(saved(&state, messages::RECORD_SAVED, record))
}

async fn update(
    state: AppState,
    resource: Resource,
    id: String,
    body: Value,
) -> Result<Json<ApiOk<Saved<Value>>>, ApiError> {
    let record = state.client.update(resource, &id, &body).await?;
    tracing::info!(resource = resource.segment(), %id, "record updated");
    Ok(saved(&state, messages::RECORD_SAVED, record))
}

async fn remove(state: AppState, resource: Resource, id: String) -> Result<Json<ApiOk<Saved<Value>>>, ApiError> {
    let record = state.client.remove(resource, &id).await?;
    tracing::info!(resource = resource.segment(), %id, "record removed");
    Ok(saved(&state, messages::RECORD_DELETED, record))
}

pub async fn professional_services(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiOk<Value>>, ApiError> {
    let data = state.client.professional_services_raw(&id).await?;
    Ok(Json(ApiOk { data }))
}

pub async fn available_insurances(State(state): State<AppState>) -> Result<Json<ApiOk<Value>>, ApiError> {
    let data = state.client.available_insurances().await?;
    Ok(Json(ApiOk { data }))
}
