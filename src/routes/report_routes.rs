// src/routes/report_routes.rs

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::{Datelike, Months, NaiveDate, Utc};
use serde::Deserialize;

use crate::{
    error::{ApiError, FieldError},
    messages,
    models::{AppState, ApiOk, CashFlowReport, wire},
};

pub fn router() -> Router<AppState> {
    Router::new().route("/cash-flow-report", get(cash_flow_report))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportParams {
    #[serde(default, with = "wire::opt_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, with = "wire::opt_date")]
    pub end_date: Option<NaiveDate>,
}

/// First and last day of the month containing `today`.
pub fn month_bounds(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = today.with_day(1).unwrap_or(today);
    let last = first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(today);
    (first, last)
}

pub async fn cash_flow_report(
    State(state): State<AppState>,
    Query(params): Query<ReportParams>,
) -> Result<Json<ApiOk<CashFlowReport>>, ApiError> {
    let today = Utc::now().with_timezone(&state.timezone).date_naive();
    let (first, last) = month_bounds(today);
    let start = params.start_date.unwrap_or(first);
    let end = params.end_date.unwrap_or(last);
    if start > end {
        return Err(ApiError::validation(vec![FieldError::new(
            "endDate",
            messages::END_BEFORE_START,
        )]));
    }

    let report = state.client.cash_flow_report(start, end).await?;
    Ok(Json(ApiOk { data: report }))
}
