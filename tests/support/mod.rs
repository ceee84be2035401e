#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use serde_json::{Value, json};

use agenda_admin::client::ResourceClient;
use agenda_admin::models::AppState;

/// In-memory stand-in for the agenda REST API.
#[derive(Debug)]
pub struct Upstream {
    pub appointments: Vec<Value>,
    pub services: Vec<Value>,
    pub payment_methods: Vec<Value>,
    pub customers: Vec<Value>,
    pub available: bool,
    pub calls: Vec<String>,
    pub last_body: Option<Value>,
    pub next_id: u32,
}

impl Default for Upstream {
    fn default() -> Self {
        Self {
            appointments: Vec::new(),
            services: Vec::new(),
            payment_methods: Vec::new(),
            customers: Vec::new(),
            available: true,
            calls: Vec::new(),
            last_body: None,
            next_id: 1,
        }
    }
}

pub type Shared = Arc<Mutex<Upstream>>;

pub fn shared(upstream: Upstream) -> Shared {
    Arc::new(Mutex::new(upstream))
}

fn not_found(what: &str) -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "message": format!("{what} not found") }))).into_response()
}

fn merge(target: &mut Value, patch: &Value) {
    let (Some(target), Some(patch)) = (target.as_object_mut(), patch.as_object()) else {
        return;
    };
    for (key, value) in patch {
        match (target.get_mut(key), value) {
            (Some(existing @ Value::Object(_)), Value::Object(_)) => merge(existing, value),
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

fn find<'a>(items: &'a mut [Value], id: &str) -> Option<&'a mut Value> {
    items.iter_mut().find(|v| v["_id"] == id)
}

async fn list_appointments(State(s): State<Shared>) -> Json<Value> {
    let mut up = s.lock().unwrap();
    up.calls.push("GET /appointments".into());
    Json(Value::Array(up.appointments.clone()))
}

async fn get_appointment(State(s): State<Shared>, Path(id): Path<String>) -> Response {
    let mut up = s.lock().unwrap();
    up.calls.push(format!("GET /appointments/{id}"));
    match find(&mut up.appointments, &id) {
        Some(v) => Json(v.clone()).into_response(),
        None => not_found("Appointment"),
    }
}

async fn create_appointment(State(s): State<Shared>, Json(mut body): Json<Value>) -> Json<Value> {
    let mut up = s.lock().unwrap();
    up.calls.push("POST /appointments".into());
    up.last_body = Some(body.clone());
    let id = format!("apt-{}", up.next_id);
    up.next_id += 1;
    body["_id"] = json!(id);
    up.appointments.push(body.clone());
    Json(body)
}

async fn update_appointment(
    State(s): State<Shared>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut up = s.lock().unwrap();
    up.calls.push(format!("PATCH /appointments/{id}"));
    up.last_body = Some(body.clone());
    match find(&mut up.appointments, &id) {
        Some(v) => {
            merge(v, &body);
            Json(v.clone()).into_response()
        }
        None => not_found("Appointment"),
    }
}

async fn update_status(
    State(s): State<Shared>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut up = s.lock().unwrap();
    up.calls.push(format!("PATCH /appointments/{id}/status"));
    up.last_body = Some(body.clone());
    match find(&mut up.appointments, &id) {
        Some(v) => {
            merge(v, &body);
            Json(v.clone()).into_response()
        }
        None => not_found("Appointment"),
    }
}

async fn delete_appointment(State(s): State<Shared>, Path(id): Path<String>) -> Response {
    let mut up = s.lock().unwrap();
    up.calls.push(format!("DELETE /appointments/{id}"));
    let before = up.appointments.len();
    up.appointments.retain(|v| v["_id"] != id.as_str());
    if up.appointments.len() == before {
        return not_found("Appointment");
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn check_availability(State(s): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    let mut up = s.lock().unwrap();
    up.calls.push("POST /appointments/check-availability".into());
    up.last_body = Some(body);
    Json(json!({ "available": up.available }))
}

async fn professional_services(State(s): State<Shared>, Path(id): Path<String>) -> Json<Value> {
    let mut up = s.lock().unwrap();
    up.calls.push(format!("GET /professionals/{id}/services"));
    Json(Value::Array(up.services.clone()))
}

async fn list_customers(State(s): State<Shared>) -> Json<Value> {
    let mut up = s.lock().unwrap();
    up.calls.push("GET /customers".into());
    Json(Value::Array(up.customers.clone()))
}

async fn get_customer(State(s): State<Shared>, Path(id): Path<String>) -> Response {
    let mut up = s.lock().unwrap();
    up.calls.push(format!("GET /customers/{id}"));
    match find(&mut up.customers, &id) {
        Some(v) => Json(v.clone()).into_response(),
        None => not_found("Customer"),
    }
}

async fn delete_customer(State(s): State<Shared>, Path(id): Path<String>) -> Response {
    let mut up = s.lock().unwrap();
    up.calls.push(format!("DELETE /customers/{id}"));
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "message": "Cannot delete customer with existing appointments" })),
    )
        .into_response()
}

async fn get_payment_method(State(s): State<Shared>, Path(id): Path<String>) -> Response {
    let mut up = s.lock().unwrap();
    up.calls.push(format!("GET /payment-methods/{id}"));
    match find(&mut up.payment_methods, &id) {
        Some(v) => Json(v.clone()).into_response(),
        None => not_found("Payment method"),
    }
}

async fn delete_schedule(State(s): State<Shared>, Path(id): Path<String>) -> Response {
    let mut up = s.lock().unwrap();
    up.calls.push(format!("DELETE /schedules/{id}"));
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "message": "Cannot delete schedule with existing appointments" })),
    )
        .into_response()
}

async fn cash_flow(State(s): State<Shared>, Query(q): Query<HashMap<String, String>>) -> Json<Value> {
    let mut up = s.lock().unwrap();
    up.calls.push(format!(
        "GET /cash-flow-report?startDate={}&endDate={}",
        q.get("startDate").map(String::as_str).unwrap_or(""),
        q.get("endDate").map(String::as_str).unwrap_or("")
    ));
    Json(json!({
        "summary": { "totalInflow": 500.0, "totalOutflow": 200.0, "netBalance": 300.0 },
        "monthly": [{ "month": "2025-03", "inflow": 500.0, "outflow": 200.0, "balance": 300.0 }]
    }))
}

pub fn upstream_router(state: Shared) -> Router {
    Router::new()
        .route("/appointments", get(list_appointments).post(create_appointment))
        .route("/appointments/check-availability", post(check_availability))
        .route(
            "/appointments/{id}",
            get(get_appointment)
                .patch(update_appointment)
                .delete(delete_appointment),
        )
        .route("/appointments/{id}/status", patch(update_status))
        .route("/professionals/{id}/services", get(professional_services))
        .route("/customers", get(list_customers))
        .route("/customers/{id}", get(get_customer).delete(delete_customer))
        .route("/payment-methods/{id}", get(get_payment_method))
        .route("/schedules/{id}", axum::routing::delete(delete_schedule))
        .route("/cash-flow-report", get(cash_flow))
        .with_state(state)
}

/// Serves the fake upstream on an ephemeral port and returns its base URL.
pub async fn spawn_upstream(state: Shared) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = upstream_router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

pub fn client(base_url: &str) -> ResourceClient {
    ResourceClient::new(base_url, Duration::from_secs(5)).unwrap()
}

pub fn app_state(base_url: &str) -> AppState {
    AppState::with_client(
        client(base_url),
        chrono_tz::America::Sao_Paulo,
        Duration::from_millis(1500),
    )
}

pub fn calls(state: &Shared) -> Vec<String> {
    state.lock().unwrap().calls.clone()
}

pub fn appointment(id: &str, status: &str) -> Value {
    json!({
        "_id": id,
        "kind": "appointment",
        "title": "Consulta",
        "customerId": "c1",
        "professionalId": "p1",
        "serviceIds": ["s1"],
        "startDate": "2025-03-10",
        "startTime": "10:00",
        "endDate": "2025-03-10",
        "endTime": "11:00",
        "status": status
    })
}
