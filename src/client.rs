// src/client.rs
//
// HTTP client for the agenda REST API. Generic CRUD per collection plus the
// few endpoints that do not fit that shape.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, Method, Url};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::models::{
    Availability, AvailabilityQuery, AppointmentPayload, CashFlowReport, PaymentMethod,
    ServiceOffering, StatusPatch, wire,
};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request to {path} failed: {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{path} answered {status}: {message}")]
    Status {
        path: String,
        status: u16,
        message: String,
    },
    #[error("unexpected response from {path}: {reason}")]
    Decode { path: String, reason: String },
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Server-provided message when there is one, else the error text.
    pub fn message(&self) -> String {
        match self {
            ClientError::Status { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Collections exposed through plain CRUD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Customers,
    Professionals,
    Services,
    Schedules,
    Appointments,
    AccountsReceivable,
    AccountsPayable,
    PaymentMethods,
}

impl Resource {
    pub fn segment(self) -> &'static str {
        match self {
            Resource::Customers => "customers",
            Resource::Professionals => "professionals",
            Resource::Services => "services",
            Resource::Schedules => "schedules",
            Resource::Appointments => "appointments",
            Resource::AccountsReceivable => "accounts-receivable",
            Resource::AccountsPayable => "accounts-payable",
            Resource::PaymentMethods => "payment-methods",
        }
    }
}

/// Filters accepted by `GET /schedules/professional/:id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleFilter {
    #[serde(default)]
    pub status: Option<crate::models::ScheduleStatus>,
    #[serde(default, with = "wire::opt_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, with = "wire::opt_date")]
    pub end_date: Option<NaiveDate>,
}

impl ScheduleFilter {
    fn query(&self) -> Vec<(&'static str, String)> {
        let mut q = Vec::new();
        if let Some(status) = self.status {
            if let Ok(Value::String(s)) = serde_json::to_value(status) {
                q.push(("status", s));
            }
        }
        if let Some(d) = self.start_date {
            q.push(("startDate", d.format(wire::DATE_FORMAT).to_string()));
        }
        if let Some(d) = self.end_date {
            q.push(("endDate", d.format(wire::DATE_FORMAT).to_string()));
        }
        q
    }
}

#[derive(Clone)]
pub struct ResourceClient {
    http: Client,
    base_url: Url,
}

impl ResourceClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url).map_err(|e| ClientError::Decode {
            path: base_url.to_string(),
            reason: format!("invalid base url: {e}"),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::Decode {
                path: base_url.to_string(),
                reason: "base url cannot carry a path".into(),
            });
        }
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| ClientError::Transport {
                path: base_url.to_string(),
                source,
            })?;
        Ok(Self { http, base_url })
    }

    async fn send(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<Value, ClientError> {
        let path = format!("/{}", segments.join("/"));
        let mut url = self.base_url.clone();
        if let Ok(mut parts) = url.path_segments_mut() {
            parts.pop_if_empty().extend(segments);
        }

        tracing::debug!(%method, %path, "upstream request");
        let mut req = self.http.request(method, url);
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }

        let resp = req.send().await.map_err(|source| ClientError::Transport {
            path: path.clone(),
            source,
        })?;
        let status = resp.status();
        let text = resp.text().await.map_err(|source| ClientError::Transport {
            path: path.clone(),
            source,
        })?;

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());
            return Err(ClientError::Status {
                path,
                status: status.as_u16(),
                message,
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| ClientError::Decode {
            path,
            reason: e.to_string(),
        })
    }

    /* -------------------------
       Generic CRUD
    --------------------------*/

    pub async fn list(&self, resource: Resource) -> Result<Value, ClientError> {
        self.send(Method::GET, &[resource.segment()], &[], None).await
    }

    pub async fn get(&self, resource: Resource, id: &str) -> Result<Value, ClientError> {
        self.send(Method::GET, &[resource.segment(), id], &[], None).await
    }

    pub async fn create(&self, resource: Resource, payload: &Value) -> Result<Value, ClientError> {
        self.send(Method::POST, &[resource.segment()], &[], Some(payload.clone()))
            .await
    }

    pub async fn update(&self, resource: Resource, id: &str, payload: &Value) -> Result<Value, ClientError> {
        self.send(Method::PATCH, &[resource.segment(), id], &[], Some(payload.clone()))
            .await
    }

    pub async fn remove(&self, resource: Resource, id: &str) -> Result<Value, ClientError> {
        self.send(Method::DELETE, &[resource.segment(), id], &[], None).await
    }

    /* -------------------------
       Extensions
    --------------------------*/

    pub async fn professional_services_raw(&self, professional_id: &str) -> Result<Value, ClientError> {
        self.send(Method::GET, &["professionals", professional_id, "services"], &[], None)
            .await
    }

    pub async fn available_insurances(&self) -> Result<Value, ClientError> {
        self.send(Method::GET, &["professionals", "insurances", "available"], &[], None)
            .await
    }

    pub async fn schedules_by_professional(
        &self,
        professional_id: &str,
        filter: &ScheduleFilter,
    ) -> Result<Value, ClientError> {
        self.send(
            Method::GET,
            &["schedules", "professional", professional_id],
            &filter.query(),
            None,
        )
        .await
    }

    pub async fn update_future_schedules(
        &self,
        professional_id: &str,
        schedule_id: &str,
        payload: &Value,
    ) -> Result<Value, ClientError> {
        self.send(
            Method::PATCH,
            &["schedules", "professional", professional_id, "future", schedule_id],
            &[],
            Some(payload.clone()),
        )
        .await
    }

    pub async fn delete_future_schedules(
        &self,
        professional_id: &str,
        schedule_id: &str,
    ) -> Result<Value, ClientError> {
        self.send(
            Method::DELETE,
            &["schedules", "professional", professional_id, "future", schedule_id],
            &[],
            None,
        )
        .await
    }

    pub async fn cash_flow_report(&self, start: NaiveDate, end: NaiveDate) -> Result<CashFlowReport, ClientError> {
        let query = [
            ("startDate", start.format(wire::DATE_FORMAT).to_string()),
            ("endDate", end.format(wire::DATE_FORMAT).to_string()),
        ];
        let body = self.send(Method::GET, &["cash-flow-report"], &query, None).await?;
        decode("/cash-flow-report", body)
    }
}

fn decode<T: DeserializeOwned>(path: &str, value: Value) -> Result<T, ClientError> {
    serde_json::from_value(value).map_err(|e| ClientError::Decode {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

fn encode<T: Serialize>(path: &str, payload: &T) -> Result<Value, ClientError> {
    serde_json::to_value(payload).map_err(|e| ClientError::Decode {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

/// Upstream operations the appointment flows depend on.
#[async_trait]
pub trait AgendaBackend: Send + Sync {
    async fn list_appointments(&self) -> Result<Vec<Value>, ClientError>;
    async fn get_appointment(&self, id: &str) -> Result<Value, ClientError>;
    async fn check_availability(&self, query: &AvailabilityQuery) -> Result<Availability, ClientError>;
    async fn create_appointment(&self, payload: &AppointmentPayload) -> Result<Value, ClientError>;
    async fn update_appointment(&self, id: &str, payload: &AppointmentPayload) -> Result<Value, ClientError>;
    async fn update_appointment_status(&self, id: &str, patch: &StatusPatch) -> Result<Value, ClientError>;
    async fn remove_appointment(&self, id: &str) -> Result<(), ClientError>;
    async fn professional_services(&self, professional_id: &str) -> Result<Vec<ServiceOffering>, ClientError>;
    async fn payment_method(&self, id: &str) -> Result<PaymentMethod, ClientError>;
}

#[async_trait]
impl AgendaBackend for ResourceClient {
    async fn list_appointments(&self) -> Result<Vec<Value>, ClientError> {
        let body = self.list(Resource::Appointments).await?;
        decode("/appointments", body)
    }

    async fn get_appointment(&self, id: &str) -> Result<Value, ClientError> {
        self.get(Resource::Appointments, id).await
    }

    async fn check_availability(&self, query: &AvailabilityQuery) -> Result<Availability, ClientError> {
        let path = "/appointments/check-availability";
        let body = self
            .send(
                Method::POST,
                &["appointments", "check-availability"],
                &[],
                Some(encode(path, query)?),
            )
            .await?;
        decode(path, body)
    }

    async fn create_appointment(&self, payload: &AppointmentPayload) -> Result<Value, ClientError> {
        self.create(Resource::Appointments, &encode("/appointments", payload)?)
            .await
    }

    async fn update_appointment(&self, id: &str, payload: &AppointmentPayload) -> Result<Value, ClientError> {
        self.update(Resource::Appointments, id, &encode("/appointments", payload)?)
            .await
    }

    async fn update_appointment_status(&self, id: &str, patch: &StatusPatch) -> Result<Value, ClientError> {
        let body = encode("/appointments/status", patch)?;
        self.send(Method::PATCH, &["appointments", id, "status"], &[], Some(body))
            .await
    }

    async fn remove_appointment(&self, id: &str) -> Result<(), ClientError> {
        self.remove(Resource::Appointments, id).await.map(|_| ())
    }

    async fn professional_services(&self, professional_id: &str) -> Result<Vec<ServiceOffering>, ClientError> {
        let body = self.professional_services_raw(professional_id).await?;
        decode("/professionals/services", body)
    }

    async fn payment_method(&self, id: &str) -> Result<PaymentMethod, ClientError> {
        let body = self.get(Resource::PaymentMethods, id).await?;
        decode("/payment-methods", body)
    }
}
