// src/routes/account_routes.rs

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    accounts::{self, AccountAction, AccountEntry, AccountFilter, AccountRow, Ledger, NewAccount},
    client::ClientError,
    error::ApiError,
    messages,
    models::{self, AppState, ApiOk},
    routes::{Saved, saved},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/accounts/{ledger}", get(list_accounts).post(create_account))
        .route(
            "/accounts/{ledger}/{id}/{action}",
            axum::routing::post(transition_account).patch(set_payment_method),
        )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodPatch {
    pub payment_method_id: String,
}

fn ledger(segment: &str) -> Result<Ledger, ApiError> {
    Ledger::from_segment(segment)
        .ok_or_else(|| ApiError::NotFound("UNKNOWN_LEDGER", messages::NOT_FOUND.into()))
}

pub async fn list_accounts(
    State(state): State<AppState>,
    Path(segment): Path<String>,
    Query(filter): Query<AccountFilter>,
) -> Result<Json<ApiOk<Vec<AccountRow>>>, ApiError> {
    let ledger = ledger(&segment)?;
    let body = state.client.list(ledger.resource()).await?;
    let items: Vec<Value> = serde_json::from_value(body).map_err(|e| ClientError::Decode {
        path: format!("/{}", ledger.resource().segment()),
        reason: e.to_string(),
    })?;
    let entries: Vec<AccountEntry> = models::decode_each(items, "account entry");
    let today = Utc::now().with_timezone(&state.timezone).date_naive();

    Ok(Json(ApiOk {
        data: accounts::rows(entries, &filter, today),
    }))
}

pub async fn create_account(
    State(state): State<AppState>,
    Path(segment): Path<String>,
    Json(input): Json<NewAccount>,
) -> Result<Json<ApiOk<Saved<Value>>>, ApiError> {
    let ledger = ledger(&segment)?;
    let body = input.into_payload().map_err(ApiError::validation)?;
    let record = state.client.create(ledger.resource(), &body).await?;
    tracing::info!(ledger = ledger.resource().segment(), "account entry created");
    Ok(saved(&state, messages::RECORD_SAVED, record))
}

pub async fn transition_account(
    State(state): State<AppState>,
    Path((segment, id, action)): Path<(String, String, String)>,
) -> Result<Json<ApiOk<Saved<Value>>>, ApiError> {
    let ledger = ledger(&segment)?;
    let action = AccountAction::from_segment(&action)
        .ok_or_else(|| ApiError::NotFound("UNKNOWN_ACTION", messages::NOT_FOUND.into()))?;
    let record = state
        .client
        .update(ledger.resource(), &id, &action.patch())
        .await?;
    tracing::info!(ledger = ledger.resource().segment(), %id, target = ?action.target(), "account entry status changed");
    Ok(saved(&state, messages::RECORD_SAVED, record))
}

/// Only receivables carry a payment method.
pub async fn set_payment_method(
    State(state): State<AppState>,
    Path((segment, id, action)): Path<(String, String, String)>,
    Json(req): Json<PaymentMethodPatch>,
) -> Result<Json<ApiOk<Saved<Value>>>, ApiError> {
    if ledger(&segment)? != Ledger::Receivable || action != "payment-method" {
        return Err(ApiError::NotFound("NOT_FOUND", messages::NOT_FOUND.into()));
    }
    let record = state
        .client
        .update(
            Ledger::Receivable.resource(),
            &id,
            &json!({ "paymentMethodId": req.payment_method_id }),
        )
        .await?;
    tracing::info!(%id, "receivable payment method set");
    Ok(saved(&state, messages::RECORD_SAVED, record))
}
