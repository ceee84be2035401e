use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::Notify;

use agenda_admin::calendar::EventFormatter;
use agenda_admin::client::{AgendaBackend, ClientError};
use agenda_admin::messages;
use agenda_admin::models::{
    AppointmentDraft, AppointmentPayload, AppointmentStatus, Availability, AvailabilityQuery,
    EntryKind, FinanceStatus, PaymentMethod, ServiceOffering, StatusPatch,
};
use agenda_admin::orchestrator::{AppointmentOrchestrator, FlowError};
use agenda_admin::payment::{self, PaymentForm};

struct MockBackend {
    records: Mutex<Vec<Value>>,
    services: Vec<ServiceOffering>,
    methods: Vec<PaymentMethod>,
    available: bool,
    gate: Option<Arc<Notify>>,
    calls: Mutex<Vec<String>>,
    queries: Mutex<Vec<AvailabilityQuery>>,
    payloads: Mutex<Vec<AppointmentPayload>>,
    patches: Mutex<Vec<StatusPatch>>,
}

impl MockBackend {
    fn new(records: Vec<Value>) -> Self {
        Self {
            records: Mutex::new(records),
            services: vec![
                ServiceOffering { id: "s1".into(), name: "Limpeza".into(), duration: Some(30.0), price: Some(120.0) },
                ServiceOffering { id: "s2".into(), name: "Avaliação".into(), duration: Some(30.0), price: Some(80.0) },
                ServiceOffering { id: "s3".into(), name: "Retorno".into(), duration: None, price: None },
            ],
            methods: vec![
                PaymentMethod { id: "pix".into(), name: "PIX".into(), kind: None, allow_partial: false, installments: 1 },
                PaymentMethod { id: "credit".into(), name: "Cartão de Crédito".into(), kind: None, allow_partial: true, installments: 12 },
            ],
            available: true,
            gate: None,
            calls: Mutex::new(Vec::new()),
            queries: Mutex::new(Vec::new()),
            payloads: Mutex::new(Vec::new()),
            patches: Mutex::new(Vec::new()),
        }
    }

    fn log(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// The availability check that preceded the nth persisted payload.
    fn checked_slot(&self, n: usize) -> (AvailabilityQuery, AppointmentPayload) {
        (
            self.queries.lock().unwrap()[n].clone(),
            self.payloads.lock().unwrap()[n].clone(),
        )
    }
}

fn assert_same_slot(query: &AvailabilityQuery, payload: &AppointmentPayload) {
    assert_eq!(query.professional, payload.professional);
    assert_eq!(query.start_date, payload.start_date);
    assert_eq!(query.start_time, payload.start_time);
    assert_eq!(query.end_date, payload.end_date);
    assert_eq!(query.end_time, payload.end_time);
}

#[async_trait]
impl AgendaBackend for MockBackend {
    async fn list_appointments(&self) -> Result<Vec<Value>, ClientError> {
        self.log("list");
        Ok(self.records.lock().unwrap().clone())
    }

    async fn get_appointment(&self, id: &str) -> Result<Value, ClientError> {
        self.log(format!("get {id}"));
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r["_id"] == id)
            .cloned()
            .ok_or_else(|| ClientError::Status {
                path: format!("/appointments/{id}"),
                status: 404,
                message: "Appointment not found".into(),
            })
    }

    async fn check_availability(&self, query: &AvailabilityQuery) -> Result<Availability, ClientError> {
        self.log("availability");
        self.queries.lock().unwrap().push(query.clone());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        Ok(Availability { available: self.available, schedule_id: None })
    }

    async fn create_appointment(&self, payload: &AppointmentPayload) -> Result<Value, ClientError> {
        self.log("create");
        self.payloads.lock().unwrap().push(payload.clone());
        let mut saved = serde_json::to_value(payload).unwrap();
        saved["_id"] = json!("new-1");
        self.records.lock().unwrap().push(saved.clone());
        Ok(saved)
    }

    async fn update_appointment(&self, id: &str, payload: &AppointmentPayload) -> Result<Value, ClientError> {
        self.log(format!("update {id}"));
        self.payloads.lock().unwrap().push(payload.clone());
        let mut saved = serde_json::to_value(payload).unwrap();
        saved["_id"] = json!(id);
        Ok(saved)
    }

    async fn update_appointment_status(&self, id: &str, patch: &StatusPatch) -> Result<Value, ClientError> {
        self.log(format!("status {id}"));
        self.patches.lock().unwrap().push(patch.clone());
        Ok(json!({ "_id": id }))
    }

    async fn remove_appointment(&self, id: &str) -> Result<(), ClientError> {
        self.log(format!("remove {id}"));
        self.records.lock().unwrap().retain(|r| r["_id"] != id);
        Ok(())
    }

    async fn professional_services(&self, professional_id: &str) -> Result<Vec<ServiceOffering>, ClientError> {
        self.log(format!("services {professional_id}"));
        Ok(self.services.clone())
    }

    async fn payment_method(&self, id: &str) -> Result<PaymentMethod, ClientError> {
        self.log(format!("method {id}"));
        self.methods
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or_else(|| ClientError::Status {
                path: format!("/payment-methods/{id}"),
                status: 404,
                message: "Payment method not found".into(),
            })
    }
}

fn orchestrator(backend: Arc<MockBackend>) -> AppointmentOrchestrator {
    AppointmentOrchestrator::new(
        backend,
        EventFormatter::new(chrono_tz::America::Sao_Paulo),
        Duration::from_millis(1500),
    )
}

fn draft() -> AppointmentDraft {
    serde_json::from_value(json!({
        "title": "Consulta",
        "customer": "c1",
        "professional": "p1",
        "services": ["s1", "s2"],
        "startDate": "2025-03-10",
        "startTime": "10:00",
        "endDate": "2025-03-10",
        "endTime": "11:00"
    }))
    .unwrap()
}

fn record(id: &str, status: &str, finance: Value) -> Value {
    json!({
        "_id": id,
        "title": "Consulta",
        "customerId": "c1",
        "professionalId": "p1",
        "serviceIds": ["s1"],
        "startDate": "2025-03-10",
        "startTime": "10:00",
        "endDate": "2025-03-10",
        "endTime": "11:00",
        "status": status,
        "finance": finance
    })
}

#[tokio::test]
async fn create_checks_availability_then_persists_with_expected_finance() {
    let backend = Arc::new(MockBackend::new(vec![]));
    let agenda = orchestrator(backend.clone());

    let outcome = agenda.submit(draft()).await.unwrap();

    assert_eq!(backend.calls(), vec!["availability", "services p1", "create", "list"]);
    let (query, payload) = backend.checked_slot(0);
    assert_same_slot(&query, &payload);
    assert_eq!(query.exclude_id, None);
    assert_eq!(payload.kind, EntryKind::Appointment);
    assert_eq!(payload.status, AppointmentStatus::Scheduled);
    assert_eq!(payload.timezone, "America/Sao_Paulo");
    let finance = payload.finance.unwrap();
    assert_eq!(finance.amount, Some(200.0));
    assert_eq!(finance.status, Some(FinanceStatus::Expected));

    assert_eq!(outcome.id.as_deref(), Some("new-1"));
    assert_eq!(outcome.message, messages::APPOINTMENT_SAVED);
    assert_eq!(outcome.close_after_ms, 1500);
    assert_eq!(outcome.events.len(), 1);
}

#[tokio::test]
async fn unavailable_slot_is_a_conflict_and_nothing_is_saved() {
    let mut mock = MockBackend::new(vec![]);
    mock.available = false;
    let backend = Arc::new(mock);
    let agenda = orchestrator(backend.clone());

    let err = agenda.submit(draft()).await.unwrap_err();

    match err {
        FlowError::Conflict(msg) => assert_eq!(msg, messages::APPOINTMENT_CONFLICT),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(backend.calls(), vec!["availability"]);
    assert!(backend.payloads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn block_is_saved_without_finance_or_customer() {
    let backend = Arc::new(MockBackend::new(vec![]));
    let agenda = orchestrator(backend.clone());
    let block = AppointmentDraft {
        kind: EntryKind::Block,
        title: "Almoço".into(),
        customer: Some("c1".into()),
        services: vec!["s1".into()],
        ..draft()
    };

    let outcome = agenda.submit(block).await.unwrap();

    assert_eq!(outcome.message, messages::BLOCK_SAVED);
    assert_eq!(backend.calls(), vec!["availability", "create", "list"]);
    let payload = backend.payloads.lock().unwrap()[0].clone();
    assert_eq!(payload.kind, EntryKind::Block);
    assert_eq!(payload.status, AppointmentStatus::Blocked);
    assert!(payload.finance.is_none());
    assert!(payload.customer.is_none());
    assert!(payload.services.is_empty());
}

#[tokio::test]
async fn invalid_draft_never_reaches_backend() {
    let backend = Arc::new(MockBackend::new(vec![]));
    let agenda = orchestrator(backend.clone());
    let empty = AppointmentDraft { services: vec![], ..draft() };

    let err = agenda.submit(empty).await.unwrap_err();

    assert!(matches!(err, FlowError::Validation(ref f) if f.len() == 1 && f[0].field == "services"));
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn all_day_entry_ends_at_end_of_start_date() {
    let backend = Arc::new(MockBackend::new(vec![]));
    let agenda = orchestrator(backend.clone());
    let all_day = AppointmentDraft { all_day: true, end_date: None, end_time: None, ..draft() };

    agenda.submit(all_day).await.unwrap();

    let payload = backend.payloads.lock().unwrap()[0].clone();
    assert_eq!(payload.end_date, payload.start_date);
    assert_eq!(payload.end_time.format("%H:%M").to_string(), "23:59");
}

#[tokio::test]
async fn complete_moves_finance_to_pending() {
    let backend = Arc::new(MockBackend::new(vec![record("a1", "SCHEDULED", json!({"amount": 120.0, "status": "expected"}))]));
    let agenda = orchestrator(backend.clone());

    let outcome = agenda.complete("a1").await.unwrap();

    assert_eq!(outcome.message, messages::APPOINTMENT_COMPLETED);
    let patch = backend.patches.lock().unwrap()[0].clone();
    assert_eq!(patch.status, Some(AppointmentStatus::Completed));
    assert_eq!(patch.finance.and_then(|f| f.status), Some(FinanceStatus::Pending));
}

#[tokio::test]
async fn blocks_cannot_be_completed() {
    let backend = Arc::new(MockBackend::new(vec![json!({
        "_id": "b1", "status": "BLOCKED", "startDate": "2025-03-10", "startTime": "12:00", "endTime": "13:00"
    })]));
    let agenda = orchestrator(backend.clone());

    let err = agenda.complete("b1").await.unwrap_err();

    assert!(matches!(err, FlowError::InvalidTransition { .. }));
    assert!(backend.patches.lock().unwrap().is_empty());
}

#[tokio::test]
async fn legacy_block_with_scheduled_status_cannot_be_completed() {
    let backend = Arc::new(MockBackend::new(vec![json!({
        "_id": "b1", "title": "Almoço", "customerId": null, "serviceIds": [], "status": "SCHEDULED",
        "startDate": "2025-03-10", "startTime": "12:00", "endTime": "13:00"
    })]));
    let agenda = orchestrator(backend.clone());

    let err = agenda.complete("b1").await.unwrap_err();

    assert!(matches!(err, FlowError::InvalidTransition { .. }));
    assert_eq!(backend.calls(), vec!["get b1"]);
    assert!(backend.patches.lock().unwrap().is_empty());
}

#[tokio::test]
async fn update_checks_the_same_slot_excluding_itself() {
    let backend = Arc::new(MockBackend::new(vec![record("a1", "SCHEDULED", json!({"amount": 120.0, "status": "expected"}))]));
    let agenda = orchestrator(backend.clone());
    let edit = AppointmentDraft {
        id: Some("a1".into()),
        start_time: chrono::NaiveTime::from_hms_opt(15, 0, 0),
        end_time: chrono::NaiveTime::from_hms_opt(16, 0, 0),
        ..draft()
    };

    agenda.submit(edit).await.unwrap();

    assert_eq!(
        backend.calls(),
        vec!["get a1", "availability", "services p1", "update a1", "list"]
    );
    let (query, payload) = backend.checked_slot(0);
    assert_same_slot(&query, &payload);
    assert_eq!(query.exclude_id.as_deref(), Some("a1"));
    assert_eq!(payload.finance.and_then(|f| f.status), Some(FinanceStatus::Expected));
}

#[tokio::test]
async fn completed_entry_is_not_reopened_by_an_edit() {
    let backend = Arc::new(MockBackend::new(vec![record("a1", "COMPLETED", json!({"amount": 120.0, "status": "paid"}))]));
    let agenda = orchestrator(backend.clone());
    let edit = AppointmentDraft { id: Some("a1".into()), ..draft() };

    let err = agenda.submit(edit).await.unwrap_err();

    assert!(matches!(
        err,
        FlowError::InvalidTransition { from: AppointmentStatus::Completed, to: AppointmentStatus::Scheduled }
    ));
    assert_eq!(backend.calls(), vec!["get a1"]);
    assert!(backend.payloads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn cancelled_entry_is_read_only_to_edits() {
    let backend = Arc::new(MockBackend::new(vec![record("a1", "CANCELLED", Value::Null)]));
    let agenda = orchestrator(backend.clone());
    let edit = AppointmentDraft { id: Some("a1".into()), ..draft() };

    let err = agenda.submit(edit).await.unwrap_err();

    match err {
        FlowError::Validation(fields) => {
            assert_eq!(fields.len(), 1);
            assert_eq!(fields[0].field, "status");
            assert_eq!(fields[0].message, messages::CANCELLED_READ_ONLY);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(backend.calls(), vec!["get a1"]);
}

#[tokio::test]
async fn edit_keeps_billing_that_moved_past_expected() {
    let backend = Arc::new(MockBackend::new(vec![record("a1", "SCHEDULED", json!({"amount": 120.0, "status": "pending"}))]));
    let agenda = orchestrator(backend.clone());
    let edit = AppointmentDraft { id: Some("a1".into()), ..draft() };

    agenda.submit(edit).await.unwrap();

    let payload = backend.payloads.lock().unwrap()[0].clone();
    assert!(payload.finance.is_none());
    assert!(payload.amount.is_none());
    assert_eq!(payload.status, AppointmentStatus::Scheduled);
}

#[tokio::test]
async fn legacy_block_is_saved_as_blocked() {
    let backend = Arc::new(MockBackend::new(vec![json!({
        "_id": "b1", "title": "Almoço", "professionalId": "p1", "status": "SCHEDULED",
        "startDate": "2025-03-10", "startTime": "12:00", "endTime": "13:00"
    })]));
    let agenda = orchestrator(backend.clone());
    let edit = AppointmentDraft {
        id: Some("b1".into()),
        kind: EntryKind::Block,
        title: "Almoço".into(),
        status: Some(AppointmentStatus::Scheduled),
        ..draft()
    };

    agenda.submit(edit).await.unwrap();

    let payload = backend.payloads.lock().unwrap()[0].clone();
    assert_eq!(payload.kind, EntryKind::Block);
    assert_eq!(payload.status, AppointmentStatus::Blocked);
    assert!(payload.finance.is_none());
}

#[tokio::test]
async fn cancel_active_entry_patches_status() {
    let backend = Arc::new(MockBackend::new(vec![record("a1", "SCHEDULED", Value::Null)]));
    let agenda = orchestrator(backend.clone());

    let outcome = agenda.cancel("a1", false).await.unwrap();

    assert_eq!(outcome.message, messages::APPOINTMENT_CANCELLED);
    assert_eq!(backend.calls(), vec!["get a1", "status a1", "list"]);
    assert_eq!(backend.patches.lock().unwrap()[0].status, Some(AppointmentStatus::Cancelled));
}

#[tokio::test]
async fn cancelled_entry_needs_confirmation_then_is_removed() {
    let backend = Arc::new(MockBackend::new(vec![record("a1", "CANCELLED", Value::Null)]));
    let agenda = orchestrator(backend.clone());

    let err = agenda.cancel("a1", false).await.unwrap_err();
    assert!(matches!(err, FlowError::ConfirmationRequired));
    assert_eq!(backend.calls(), vec!["get a1"]);

    let outcome = agenda.cancel("a1", true).await.unwrap();
    assert_eq!(outcome.message, messages::APPOINTMENT_DELETED);
    assert_eq!(backend.calls(), vec!["get a1", "get a1", "remove a1", "list"]);
    assert!(backend.patches.lock().unwrap().is_empty());
    assert!(outcome.events.is_empty());
}

#[tokio::test]
async fn payment_on_completed_pending_marks_paid() {
    let backend = Arc::new(MockBackend::new(vec![record("a1", "COMPLETED", json!({"amount": 120.0, "status": "pending"}))]));
    let agenda = orchestrator(backend.clone());
    let form = PaymentForm {
        date: chrono::NaiveDate::from_ymd_opt(2025, 3, 10),
        method: Some("credit".into()),
        value: 120.0,
        installments: Some(3),
    };

    let outcome = payment::register_payment(&agenda, "a1", form).await.unwrap();

    assert_eq!(outcome.message, messages::PAYMENT_REGISTERED);
    let finance = backend.patches.lock().unwrap()[0].finance.clone().unwrap();
    assert_eq!(finance.status, Some(FinanceStatus::Paid));
    assert_eq!(finance.method.as_deref(), Some("credit"));
    assert_eq!(finance.installments, Some(3));
    assert_eq!(finance.amount, Some(120.0));
}

#[tokio::test]
async fn non_partial_method_always_pays_in_one_installment() {
    let backend = Arc::new(MockBackend::new(vec![record("a1", "COMPLETED", json!({"status": "pending"}))]));
    let agenda = orchestrator(backend.clone());
    let form = PaymentForm {
        date: None,
        method: Some("pix".into()),
        value: 90.0,
        installments: Some(6),
    };

    payment::register_payment(&agenda, "a1", form).await.unwrap();

    let finance = backend.patches.lock().unwrap()[0].finance.clone().unwrap();
    assert_eq!(finance.installments, Some(1));
    assert!(finance.payment_date.is_some());
}

#[tokio::test]
async fn payment_requires_completed_with_pending_finance() {
    let backend = Arc::new(MockBackend::new(vec![record("a1", "SCHEDULED", json!({"status": "expected"}))]));
    let agenda = orchestrator(backend.clone());
    let form = PaymentForm { method: Some("pix".into()), value: 50.0, ..Default::default() };

    let err = payment::register_payment(&agenda, "a1", form).await.unwrap_err();

    assert!(matches!(err, FlowError::PaymentUnavailable));
    assert!(backend.patches.lock().unwrap().is_empty());
}

#[tokio::test]
async fn payment_without_method_is_rejected_before_any_call() {
    let backend = Arc::new(MockBackend::new(vec![]));
    let agenda = orchestrator(backend.clone());
    let form = PaymentForm { value: 50.0, ..Default::default() };

    let err = payment::register_payment(&agenda, "a1", form).await.unwrap_err();

    assert!(matches!(err, FlowError::Validation(ref f) if f[0].field == "method"));
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn second_submission_of_same_entry_is_refused_while_first_runs() {
    let gate = Arc::new(Notify::new());
    let mut mock = MockBackend::new(vec![record("a1", "SCHEDULED", Value::Null)]);
    mock.gate = Some(gate.clone());
    let backend = Arc::new(mock);
    let agenda = orchestrator(backend.clone());
    let edit = AppointmentDraft { id: Some("a1".into()), ..draft() };

    let (first, second) = tokio::join!(agenda.submit(edit.clone()), async {
        let result = agenda.submit(edit.clone()).await;
        gate.notify_one();
        result
    });

    assert!(first.is_ok());
    assert!(matches!(second, Err(FlowError::InFlight(_))));
    assert_eq!(
        backend.calls().iter().filter(|c| c.as_str() == "update a1").count(),
        1
    );
}

#[tokio::test]
async fn moving_an_event_resubmits_with_new_wall_clock() {
    let backend = Arc::new(MockBackend::new(vec![record("a1", "SCHEDULED", Value::Null)]));
    let agenda = orchestrator(backend.clone());
    let events = agenda.reload().await.unwrap();
    let mut event = events[0].clone();
    event.start = chrono::DateTime::parse_from_rfc3339("2025-03-11T14:00:00-03:00").unwrap();
    event.end = chrono::DateTime::parse_from_rfc3339("2025-03-11T15:30:00-03:00").unwrap();

    let outcome = agenda.move_event(&event).await.unwrap();

    assert_eq!(outcome.message, messages::APPOINTMENT_MOVED);
    assert_eq!(
        backend.calls(),
        vec!["list", "get a1", "availability", "services p1", "update a1", "list"]
    );
    let (query, payload) = backend.checked_slot(0);
    assert_same_slot(&query, &payload);
    assert_eq!(query.exclude_id.as_deref(), Some("a1"));
    assert_eq!(payload.title, "Consulta");
    assert_eq!(payload.start_date.to_string(), "2025-03-11");
    assert_eq!(payload.start_time.format("%H:%M").to_string(), "14:00");
    assert_eq!(payload.end_time.format("%H:%M").to_string(), "15:30");
}
