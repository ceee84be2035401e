// src/orchestrator.rs
//
// Create/update/complete/cancel flows for agenda entries: validate,
// check availability, persist with billing, reload the calendar.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use serde_json::Value;
use tracing::Instrument;
use uuid::Uuid;

use crate::calendar::{self, CalendarEvent, EventFormatter};
use crate::client::{AgendaBackend, ClientError};
use crate::error::FieldError;
use crate::finance;
use crate::messages;
use crate::models::{
    AppointmentDraft, AppointmentPayload, AppointmentRecord, AppointmentStatus, AvailabilityQuery,
    EntryKind, ServiceOffering, StatusPatch,
};

#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("validation failed on {} field(s)", .0.len())]
    Validation(Vec<FieldError>),
    #[error("{0}")]
    Conflict(String),
    #[error("an operation is already running for {0}")]
    InFlight(String),
    #[error("cannot move from {from} to {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },
    #[error("permanent deletion needs confirmation")]
    ConfirmationRequired,
    #[error("payment not available for this entry")]
    PaymentUnavailable,
    #[error("{0} not found")]
    NotFound(String),
    #[error("persisting failed: {0}")]
    Persist(#[source] ClientError),
    #[error("loading failed: {0}")]
    Load(#[source] ClientError),
}

/// Result of a successful mutation: feedback text, the delay before the
/// dashboard closes its form, and the refreshed calendar.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub message: &'static str,
    pub close_after_ms: u64,
    pub events: Vec<CalendarEvent>,
}

/* -------------------------
   In-flight guard
--------------------------*/

/// Keys of mutations currently running. A second submission for the same
/// key is refused until the first one finishes.
#[derive(Debug, Default)]
pub struct InFlight {
    keys: Mutex<HashSet<String>>,
}

pub struct InFlightGuard<'a> {
    owner: &'a InFlight,
    key: String,
}

impl InFlight {
    pub fn acquire(&self, key: String) -> Result<InFlightGuard<'_>, FlowError> {
        let mut keys = self.keys.lock().unwrap_or_else(PoisonError::into_inner);
        if !keys.insert(key.clone()) {
            return Err(FlowError::InFlight(key));
        }
        Ok(InFlightGuard { owner: self, key })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut keys = self.owner.keys.lock().unwrap_or_else(PoisonError::into_inner);
        keys.remove(&self.key);
    }
}

/* -------------------------
   Validation
--------------------------*/

#[derive(Debug, Clone)]
struct ValidEntry {
    title: String,
    description: String,
    customer: Option<String>,
    professional: String,
    services: Vec<String>,
    start_date: NaiveDate,
    start_time: NaiveTime,
    end_date: NaiveDate,
    end_time: NaiveTime,
    status: AppointmentStatus,
}

fn present(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Checks a draft and returns every failed rule at once.
fn validate_entry(draft: &AppointmentDraft) -> Result<ValidEntry, Vec<FieldError>> {
    let mut errors = Vec::new();
    let is_block = draft.kind == EntryKind::Block;

    let title = draft.title.trim().to_string();
    if title.is_empty() {
        let msg = if is_block {
            messages::BLOCK_NAME_REQUIRED
        } else {
            messages::TITLE_REQUIRED
        };
        errors.push(FieldError::new("title", msg));
    }

    let professional = present(&draft.professional);
    if professional.is_none() {
        errors.push(FieldError::new("professional", messages::PROFESSIONAL_REQUIRED));
    }

    let customer = present(&draft.customer);
    let services: Vec<String> = draft
        .services
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if !is_block {
        if customer.is_none() {
            errors.push(FieldError::new("customer", messages::CUSTOMER_REQUIRED));
        }
        if services.is_empty() {
            errors.push(FieldError::new("services", messages::SERVICES_REQUIRED));
        }
    }

    let required = [
        (draft.start_date.is_none(), "startDate", messages::START_DATE_REQUIRED),
        (draft.start_time.is_none(), "startTime", messages::START_TIME_REQUIRED),
        (draft.end_date.is_none(), "endDate", messages::END_DATE_REQUIRED),
        (draft.end_time.is_none(), "endTime", messages::END_TIME_REQUIRED),
    ];
    for (missing, field, msg) in required {
        if missing {
            errors.push(FieldError::new(field, msg));
        }
    }

    if let (Some(sd), Some(st), Some(ed), Some(et)) =
        (draft.start_date, draft.start_time, draft.end_date, draft.end_time)
    {
        if ed.and_time(et) <= sd.and_time(st) {
            errors.push(FieldError::new("endTime", messages::END_BEFORE_START));
        }
    }

    let status = match (draft.kind, draft.status) {
        (_, Some(AppointmentStatus::Cancelled)) => {
            errors.push(FieldError::new("status", messages::CANCELLED_READ_ONLY));
            AppointmentStatus::Cancelled
        }
        (EntryKind::Block, _) => AppointmentStatus::Blocked,
        (EntryKind::Appointment, None) => AppointmentStatus::Scheduled,
        (EntryKind::Appointment, Some(s @ (AppointmentStatus::Scheduled | AppointmentStatus::PreScheduled))) => s,
        (EntryKind::Appointment, Some(_)) => {
            errors.push(FieldError::new("status", messages::STATUS_INVALID));
            AppointmentStatus::Scheduled
        }
    };

    match (professional, draft.start_date, draft.start_time, draft.end_date, draft.end_time) {
        (Some(professional), Some(start_date), Some(start_time), Some(end_date), Some(end_time))
            if errors.is_empty() =>
        {
            Ok(ValidEntry {
                title,
                description: draft.description.trim().to_string(),
                customer: if is_block { None } else { customer },
                professional,
                services: if is_block { Vec::new() } else { services },
                start_date,
                start_time,
                end_date,
                end_time,
                status,
            })
        }
        _ => Err(errors),
    }
}

/* -------------------------
   Orchestrator
--------------------------*/

pub struct AppointmentOrchestrator {
    backend: Arc<dyn AgendaBackend>,
    formatter: EventFormatter,
    close_after_ms: u64,
    in_flight: InFlight,
}

impl AppointmentOrchestrator {
    pub fn new(backend: Arc<dyn AgendaBackend>, formatter: EventFormatter, close_after: Duration) -> Self {
        Self {
            backend,
            formatter,
            close_after_ms: u64::try_from(close_after.as_millis()).unwrap_or(u64::MAX),
            in_flight: InFlight::default(),
        }
    }

    pub fn formatter(&self) -> &EventFormatter {
        &self.formatter
    }

    pub fn close_after_ms(&self) -> u64 {
        self.close_after_ms
    }

    pub(crate) fn backend(&self) -> &dyn AgendaBackend {
        self.backend.as_ref()
    }

    pub(crate) fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    pub(crate) fn outcome(&self, id: Option<String>, message: &'static str, events: Vec<CalendarEvent>) -> MutationOutcome {
        MutationOutcome {
            id,
            message,
            close_after_ms: self.close_after_ms,
            events,
        }
    }

    /// Fresh calendar from the upstream list.
    pub async fn reload(&self) -> Result<Vec<CalendarEvent>, FlowError> {
        let records = self.backend.list_appointments().await.map_err(FlowError::Load)?;
        Ok(self.formatter.format_all(records))
    }

    pub async fn fetch_record(&self, id: &str) -> Result<AppointmentRecord, FlowError> {
        let raw = self.backend.get_appointment(id).await.map_err(|e| match e.status() {
            Some(404) => FlowError::NotFound(format!("appointment {id}")),
            _ => FlowError::Load(e),
        })?;
        serde_json::from_value(raw).map_err(|e| {
            FlowError::Load(ClientError::Decode {
                path: format!("/appointments/{id}"),
                reason: e.to_string(),
            })
        })
    }

    /// Create or update an appointment or block.
    pub async fn submit(&self, draft: AppointmentDraft) -> Result<MutationOutcome, FlowError> {
        let flow_id = Uuid::new_v4();
        let span = tracing::info_span!("submit_entry", %flow_id, kind = ?draft.kind, id = ?draft.id);
        self.submit_inner(draft).instrument(span).await
    }

    async fn submit_inner(&self, mut draft: AppointmentDraft) -> Result<MutationOutcome, FlowError> {
        calendar::apply_all_day(&mut draft);
        let entry = validate_entry(&draft).map_err(FlowError::Validation)?;

        let key = match &draft.id {
            Some(id) => format!("entry:{id}"),
            None => format!(
                "new:{}:{}T{}",
                entry.professional, entry.start_date, entry.start_time
            ),
        };
        let _guard = self.in_flight.acquire(key)?;

        let stored = match draft.id.as_deref() {
            Some(id) => Some(self.editable_record(id, draft.kind, entry.status).await?),
            None => None,
        };

        tracing::info!(
            professional = %entry.professional,
            slot = %calendar::describe_slot(entry.start_date, entry.start_time),
            "checking availability"
        );
        let query = AvailabilityQuery {
            professional: entry.professional.clone(),
            start_date: entry.start_date,
            start_time: entry.start_time,
            end_date: entry.end_date,
            end_time: entry.end_time,
            exclude_id: draft.id.clone(),
        };
        let availability = self
            .backend
            .check_availability(&query)
            .await
            .map_err(FlowError::Persist)?;
        if !availability.available {
            tracing::info!("slot unavailable, nothing persisted");
            return Err(FlowError::Conflict(messages::conflict(draft.kind).to_string()));
        }

        let offerings = match draft.kind {
            EntryKind::Appointment => self.selected_services(&entry).await?,
            EntryKind::Block => Vec::new(),
        };
        let mut payload = build_payload(draft.kind, entry, &offerings, &self.formatter);
        if stored.as_ref().is_some_and(finance::finance_settled) {
            payload.finance = None;
            payload.amount = None;
        }

        let saved = match draft.id.as_deref() {
            Some(id) => self.backend.update_appointment(id, &payload).await,
            None => self.backend.create_appointment(&payload).await,
        }
        .map_err(FlowError::Persist)?;

        let id = saved_id(&saved).or(draft.id);
        tracing::info!(id = ?id, "entry saved");

        let events = self.reload().await?;
        Ok(self.outcome(id, messages::saved(draft.kind), events))
    }

    /// Stored entry behind an edit, refused when the edit would leave the
    /// lifecycle.
    async fn editable_record(
        &self,
        id: &str,
        kind: EntryKind,
        next: AppointmentStatus,
    ) -> Result<AppointmentRecord, FlowError> {
        let record = self.fetch_record(id).await?;
        if record.status == AppointmentStatus::Cancelled {
            return Err(FlowError::Validation(vec![FieldError::new(
                "status",
                messages::CANCELLED_READ_ONLY,
            )]));
        }
        // legacy blocks carry a non-block status until their first save
        let normalizes_block = record.kind == EntryKind::Block
            && kind == EntryKind::Block
            && next == AppointmentStatus::Blocked;
        if !normalizes_block && !record.status.can_transition_to(next) {
            return Err(FlowError::InvalidTransition {
                from: record.status,
                to: next,
            });
        }
        Ok(record)
    }

    async fn selected_services(&self, entry: &ValidEntry) -> Result<Vec<ServiceOffering>, FlowError> {
        let catalog = self
            .backend
            .professional_services(&entry.professional)
            .await
            .map_err(FlowError::Persist)?;
        Ok(catalog
            .into_iter()
            .filter(|s| entry.services.contains(&s.id))
            .collect())
    }

    /// Reschedule after a drag or resize; the event carries its new instants.
    pub async fn move_event(&self, event: &CalendarEvent) -> Result<MutationOutcome, FlowError> {
        let draft = self.formatter.draft_from_event(event);

        let mut outcome = self.submit(draft).await?;
        outcome.message = messages::APPOINTMENT_MOVED;
        Ok(outcome)
    }

    pub async fn complete(&self, id: &str) -> Result<MutationOutcome, FlowError> {
        let flow_id = Uuid::new_v4();
        let span = tracing::info_span!("complete_entry", %flow_id, %id);
        async move {
            let _guard = self.in_flight.acquire(format!("entry:{id}"))?;
            let record = self.fetch_record(id).await?;
            if !finance::can_complete(&record) {
                return Err(FlowError::InvalidTransition {
                    from: record.status,
                    to: AppointmentStatus::Completed,
                });
            }

            let patch = finance::derive_completion_payload(record.kind, record.status);
            self.backend
                .update_appointment_status(id, &patch)
                .await
                .map_err(FlowError::Persist)?;
            tracing::info!("entry completed");

            let events = self.reload().await?;
            Ok(self.outcome(Some(id.to_string()), messages::APPOINTMENT_COMPLETED, events))
        }
        .instrument(span)
        .await
    }

    /// Cancels an active entry. An entry that is already cancelled is
    /// removed for good, but only with explicit confirmation.
    pub async fn cancel(&self, id: &str, confirm_permanent: bool) -> Result<MutationOutcome, FlowError> {
        let flow_id = Uuid::new_v4();
        let span = tracing::info_span!("cancel_entry", %flow_id, %id, confirm_permanent);
        async move {
            let _guard = self.in_flight.acquire(format!("entry:{id}"))?;
            let record = self.fetch_record(id).await?;

            let message = if record.status == AppointmentStatus::Cancelled {
                if !confirm_permanent {
                    return Err(FlowError::ConfirmationRequired);
                }
                self.backend
                    .remove_appointment(id)
                    .await
                    .map_err(FlowError::Persist)?;
                tracing::info!("entry removed permanently");
                messages::APPOINTMENT_DELETED
            } else {
                let patch = StatusPatch {
                    status: Some(AppointmentStatus::Cancelled),
                    finance: None,
                };
                self.backend
                    .update_appointment_status(id, &patch)
                    .await
                    .map_err(FlowError::Persist)?;
                tracing::info!("entry cancelled");
                messages::APPOINTMENT_CANCELLED
            };

            let events = self.reload().await?;
            Ok(self.outcome(Some(id.to_string()), message, events))
        }
        .instrument(span)
        .await
    }
}

fn build_payload(
    kind: EntryKind,
    entry: ValidEntry,
    offerings: &[ServiceOffering],
    formatter: &EventFormatter,
) -> AppointmentPayload {
    let finance = finance::derive_finance_payload(kind, entry.status, offerings);
    AppointmentPayload {
        kind,
        title: entry.title,
        description: entry.description,
        customer: entry.customer,
        professional: entry.professional,
        services: entry.services,
        start_date: entry.start_date,
        start_time: entry.start_time,
        end_date: entry.end_date,
        end_time: entry.end_time,
        timezone: formatter.timezone().name().to_string(),
        status: entry.status,
        amount: finance.as_ref().and_then(|f| f.amount),
        finance,
    }
}

fn saved_id(saved: &Value) -> Option<String> {
    saved
        .get("_id")
        .or_else(|| saved.get("id"))
        .and_then(Value::as_str)
        .map(str::to_string)
}
