//! Billing state of agenda entries.
//!
//! Blocks never carry billing. Appointments are billed from the sum of
//! their services' catalog prices and move `expected -> pending -> paid`
//! as they are created, completed and paid.

use serde::Serialize;

use crate::messages;
use crate::models::{
    AppointmentRecord, AppointmentStatus, EntryKind, Finance, FinanceStatus, ServiceOffering,
    StatusPatch,
};

pub fn should_track_finance(kind: EntryKind, status: AppointmentStatus) -> bool {
    kind != EntryKind::Block && status != AppointmentStatus::Blocked
}

/// Sum of catalog prices; services without a price count as zero.
pub fn derive_initial_amount(services: &[ServiceOffering]) -> f64 {
    services
        .iter()
        .fold(0.0, |acc, s| acc + s.price.unwrap_or(0.0))
}

/// Billing attached to a create or a service-changing update.
pub fn derive_finance_payload(
    kind: EntryKind,
    status: AppointmentStatus,
    services: &[ServiceOffering],
) -> Option<Finance> {
    should_track_finance(kind, status).then(|| Finance {
        amount: Some(derive_initial_amount(services)),
        status: Some(FinanceStatus::Expected),
        ..Default::default()
    })
}

pub fn derive_completion_payload(kind: EntryKind, status: AppointmentStatus) -> StatusPatch {
    StatusPatch {
        status: Some(AppointmentStatus::Completed),
        finance: should_track_finance(kind, status).then(|| Finance {
            status: Some(FinanceStatus::Pending),
            ..Default::default()
        }),
    }
}

pub fn derive_payment_payload(method_id: &str) -> StatusPatch {
    StatusPatch {
        status: None,
        finance: Some(Finance {
            status: Some(FinanceStatus::Paid),
            method: Some(method_id.to_string()),
            ..Default::default()
        }),
    }
}

/// What the actions panel shows for one entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceView {
    pub tracked: bool,
    pub status: Option<FinanceStatus>,
    pub label: &'static str,
    pub amount: f64,
    pub method: Option<String>,
    pub can_complete: bool,
    pub can_register_payment: bool,
}

pub fn finance_label(status: Option<FinanceStatus>) -> &'static str {
    match status {
        Some(FinanceStatus::Expected) => messages::FINANCE_EXPECTED,
        Some(FinanceStatus::Pending) => messages::FINANCE_PENDING,
        Some(FinanceStatus::Paid) => messages::FINANCE_PAID,
        None => messages::FINANCE_UNDEFINED,
    }
}

pub fn finance_view(record: &AppointmentRecord) -> FinanceView {
    let tracked = should_track_finance(record.kind, record.status);
    let finance = record.finance.as_ref().filter(|_| tracked);
    let status = finance.and_then(|f| f.status);

    FinanceView {
        tracked,
        status,
        label: if tracked {
            finance_label(status)
        } else {
            messages::FINANCE_NOT_APPLICABLE
        },
        amount: finance
            .and_then(|f| f.amount)
            .or(record.amount)
            .filter(|_| tracked)
            .unwrap_or(0.0),
        method: finance.and_then(|f| f.method.clone()),
        can_complete: can_complete(record),
        can_register_payment: can_register_payment(record),
    }
}

/// Blocks are never completed, whatever status legacy data gives them.
pub fn can_complete(record: &AppointmentRecord) -> bool {
    should_track_finance(record.kind, record.status)
        && record.status.can_transition_to(AppointmentStatus::Completed)
}

/// Billing already past `expected`; edits must not reset it.
pub fn finance_settled(record: &AppointmentRecord) -> bool {
    matches!(
        record.finance.as_ref().and_then(|f| f.status),
        Some(FinanceStatus::Pending | FinanceStatus::Paid)
    )
}

pub fn can_register_payment(record: &AppointmentRecord) -> bool {
    should_track_finance(record.kind, record.status)
        && record.status == AppointmentStatus::Completed
        && record.finance.as_ref().and_then(|f| f.status) == Some(FinanceStatus::Pending)
}
