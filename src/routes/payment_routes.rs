// src/routes/payment_routes.rs

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    client::{ClientError, Resource},
    error::ApiError,
    messages,
    models::{AppState, ApiOk, PaymentMethod},
    payment::{self, PaymentMethodInput, PaymentQuote},
    routes::{Saved, saved},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/payment-methods", get(list_methods).post(create_method))
        .route(
            "/payment-methods/{id}",
            get(get_method).patch(update_method).delete(delete_method),
        )
        .route("/payment-methods/{id}/quote", get(quote))
}

#[derive(Debug, Deserialize)]
pub struct QuoteParams {
    pub value: f64,
    pub installments: Option<u32>,
}

fn encode(input: PaymentMethodInput) -> Result<Value, ApiError> {
    let input = input.normalized().map_err(ApiError::validation)?;
    serde_json::to_value(input).map_err(|e| ApiError::Internal(format!("encode error: {e}")))
}

pub async fn list_methods(State(state): State<AppState>) -> Result<Json<ApiOk<Value>>, ApiError> {
    let data = state.client.list(Resource::PaymentMethods).await?;
    Ok(Json(ApiOk { data }))
}

pub async fn get_method(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiOk<Value>>, ApiError> {
    let data = state.client.get(Resource::PaymentMethods, &id).await?;
    Ok(Json(ApiOk { data }))
}

pub async fn create_method(
    State(state): State<AppState>,
    Json(input): Json<PaymentMethodInput>,
) -> Result<Json<ApiOk<Saved<Value>>>, ApiError> {
    let body = encode(input)?;
    let record = state.client.create(Resource::PaymentMethods, &body).await?;
    tracing::info!("payment method created");
    Ok(saved(&state, messages::RECORD_SAVED, record))
}

pub async fn update_method(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<PaymentMethodInput>,
) -> Result<Json<ApiOk<Saved<Value>>>, ApiError> {
    let body = encode(input)?;
    let record = state.client.update(Resource::PaymentMethods, &id, &body).await?;
    tracing::info!(%id, "payment method updated");
    Ok(saved(&state, messages::RECORD_SAVED, record))
}

pub async fn delete_method(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiOk<Saved<Value>>>, ApiError> {
    let record = state.client.remove(Resource::PaymentMethods, &id).await?;
    tracing::info!(%id, "payment method removed");
    Ok(saved(&state, messages::RECORD_DELETED, record))
}

pub async fn quote(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<QuoteParams>,
) -> Result<Json<ApiOk<PaymentQuote>>, ApiError> {
    let raw = state.client.get(Resource::PaymentMethods, &id).await?;
    let method: PaymentMethod = serde_json::from_value(raw).map_err(|e| ClientError::Decode {
        path: format!("/payment-methods/{id}"),
        reason: e.to_string(),
    })?;
    let quote = payment::quote(&method, params.value, params.installments)
        .map_err(|e| ApiError::validation(vec![e]))?;
    Ok(Json(ApiOk { data: quote }))
}
