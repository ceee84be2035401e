use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::calendar::EventFormatter;
use crate::client::{ClientError, ResourceClient};
use crate::config::Config;
use crate::orchestrator::AppointmentOrchestrator;

#[derive(Clone)]
pub struct AppState {
    pub client: ResourceClient,
    pub agenda: Arc<AppointmentOrchestrator>,
    pub timezone: Tz,
}

impl AppState {
    pub fn from_config(cfg: &Config) -> Result<Self, ClientError> {
        let client = ResourceClient::new(&cfg.api_base_url, cfg.api_timeout)?;
        Ok(Self::with_client(client, cfg.business_timezone, cfg.success_close_delay))
    }

    pub fn with_client(client: ResourceClient, timezone: Tz, close_after: Duration) -> Self {
        let agenda = AppointmentOrchestrator::new(
            Arc::new(client.clone()),
            EventFormatter::new(timezone),
            close_after,
        );
        Self {
            client,
            agenda: Arc::new(agenda),
            timezone,
        }
    }
}

/* -------------------------
   API envelopes
--------------------------*/

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiOk<T> {
    pub data: T,
}

/* -------------------------
   Agenda entries
--------------------------*/

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    #[default]
    Scheduled,
    PreScheduled,
    Completed,
    Cancelled,
    Blocked,
}

impl AppointmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "SCHEDULED",
            AppointmentStatus::PreScheduled => "PRE_SCHEDULED",
            AppointmentStatus::Completed => "COMPLETED",
            AppointmentStatus::Cancelled => "CANCELLED",
            AppointmentStatus::Blocked => "BLOCKED",
        }
    }

    /// Lifecycle moves the dashboard may request. Re-cancelling is not a
    /// transition: an already cancelled entry can only be removed.
    pub fn can_transition_to(self, next: AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        match (self, next) {
            (Cancelled, _) => false,
            (_, Cancelled) => true,
            (Scheduled | PreScheduled, Scheduled | PreScheduled | Completed) => true,
            (Blocked, Blocked) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Explicit discriminant between a billable appointment and a blocked slot
/// sharing the same calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    #[default]
    Appointment,
    Block,
}

/// A reference to another record: either a bare id or the populated object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reference {
    Id(String),
    Embedded(EmbeddedRef),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedRef {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(rename = "fullName", default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

impl Reference {
    pub fn id(&self) -> &str {
        match self {
            Reference::Id(id) => id,
            Reference::Embedded(r) => &r.id,
        }
    }

    /// Human label: full name, then name, then the raw id.
    pub fn label(&self) -> &str {
        match self {
            Reference::Id(id) => id,
            Reference::Embedded(r) => r
                .full_name
                .as_deref()
                .or(r.name.as_deref())
                .unwrap_or(&r.id),
        }
    }

    fn is_blank(&self) -> bool {
        self.id().trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinanceStatus {
    Expected,
    Pending,
    Paid,
}

/// Billing sub-object embedded in an agenda entry. Also used as the patch
/// shape, so every field is optional and omitted when unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<FinanceStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(
        default,
        with = "wire::opt_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub payment_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installments: Option<u32>,
}

/// Appointment as the upstream API returns it.
///
/// The entry kind is resolved once here, on ingestion: an explicit `kind`
/// wins, then a `BLOCKED` status, then the legacy shape of a record with
/// neither customer nor services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawAppointmentRecord", rename_all = "camelCase")]
pub struct AppointmentRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub kind: EntryKind,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "customerId")]
    pub customer: Option<Reference>,
    #[serde(rename = "professionalId")]
    pub professional: Option<Reference>,
    #[serde(rename = "serviceIds")]
    pub services: Vec<Reference>,
    #[serde(with = "wire::opt_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(with = "wire::opt_time")]
    pub start_time: Option<NaiveTime>,
    #[serde(with = "wire::opt_date")]
    pub end_date: Option<NaiveDate>,
    #[serde(with = "wire::opt_time")]
    pub end_time: Option<NaiveTime>,
    pub timezone: Option<String>,
    pub status: AppointmentStatus,
    pub amount: Option<f64>,
    pub finance: Option<Finance>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAppointmentRecord {
    #[serde(rename = "_id", alias = "id")]
    id: String,
    #[serde(default)]
    kind: Option<EntryKind>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(rename = "customerId", alias = "customer", default)]
    customer: Option<Reference>,
    #[serde(rename = "professionalId", alias = "professional", default)]
    professional: Option<Reference>,
    #[serde(
        rename = "serviceIds",
        alias = "services",
        default,
        deserialize_with = "wire::null_as_empty"
    )]
    services: Vec<Reference>,
    #[serde(default, with = "wire::opt_date")]
    start_date: Option<NaiveDate>,
    #[serde(default, with = "wire::opt_time")]
    start_time: Option<NaiveTime>,
    #[serde(default, with = "wire::opt_date")]
    end_date: Option<NaiveDate>,
    #[serde(default, with = "wire::opt_time")]
    end_time: Option<NaiveTime>,
    #[serde(default)]
    timezone: Option<String>,
    #[serde(default)]
    status: Option<AppointmentStatus>,
    #[serde(default)]
    amount: Option<f64>,
    #[serde(default)]
    finance: Option<Finance>,
}

impl From<RawAppointmentRecord> for AppointmentRecord {
    fn from(raw: RawAppointmentRecord) -> Self {
        let status = raw.status.unwrap_or_default();
        let customer = raw.customer.filter(|c| !c.is_blank());
        let services: Vec<Reference> = raw.services.into_iter().filter(|s| !s.is_blank()).collect();

        let kind = match raw.kind {
            Some(kind) => kind,
            None if status == AppointmentStatus::Blocked => EntryKind::Block,
            None if customer.is_none() && services.is_empty() => EntryKind::Block,
            None => EntryKind::Appointment,
        };

        Self {
            id: raw.id,
            kind,
            title: raw.title,
            description: raw.description,
            customer,
            professional: raw.professional.filter(|p| !p.is_blank()),
            services,
            start_date: raw.start_date,
            start_time: raw.start_time,
            end_date: raw.end_date,
            end_time: raw.end_time,
            timezone: raw.timezone,
            status,
            amount: raw.amount,
            finance: raw.finance,
        }
    }
}

/// Form state for an appointment or block, as edited in the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub kind: EntryKind,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub professional: Option<String>,
    #[serde(default, deserialize_with = "wire::null_as_empty")]
    pub services: Vec<String>,
    #[serde(default, with = "wire::opt_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, with = "wire::opt_time")]
    pub start_time: Option<NaiveTime>,
    #[serde(default, with = "wire::opt_date")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, with = "wire::opt_time")]
    pub end_time: Option<NaiveTime>,
    #[serde(default)]
    pub status: Option<AppointmentStatus>,
    #[serde(default)]
    pub all_day: bool,
}

/// Create/update body sent upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentPayload {
    pub kind: EntryKind,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<String>,
    pub professional: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<String>,
    #[serde(with = "wire::date")]
    pub start_date: NaiveDate,
    #[serde(with = "wire::time")]
    pub start_time: NaiveTime,
    #[serde(with = "wire::date")]
    pub end_date: NaiveDate,
    #[serde(with = "wire::time")]
    pub end_time: NaiveTime,
    pub timezone: String,
    pub status: AppointmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finance: Option<Finance>,
}

/// Body of `PATCH /appointments/:id/status`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AppointmentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finance: Option<Finance>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityQuery {
    pub professional: String,
    #[serde(with = "wire::date")]
    pub start_date: NaiveDate,
    #[serde(with = "wire::time")]
    pub start_time: NaiveTime,
    #[serde(with = "wire::date")]
    pub end_date: NaiveDate,
    #[serde(with = "wire::time")]
    pub end_time: NaiveTime,
    pub exclude_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    pub available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_id: Option<String>,
}

/* -------------------------
   Reference data
--------------------------*/

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceOffering {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethodKind {
    Cash,
    Credit,
    Debit,
    Pix,
    Transfer,
}

impl PaymentMethodKind {
    pub fn label(self) -> &'static str {
        match self {
            PaymentMethodKind::Cash => "Dinheiro",
            PaymentMethodKind::Credit => "Cartão de Crédito",
            PaymentMethodKind::Debit => "Cartão de Débito",
            PaymentMethodKind::Pix => "PIX",
            PaymentMethodKind::Transfer => "Transferência",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethod {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<PaymentMethodKind>,
    #[serde(default)]
    pub allow_partial: bool,
    #[serde(default = "one")]
    pub installments: u32,
}

impl PaymentMethod {
    /// Methods without partial payment are always settled in one installment.
    pub fn max_installments(&self) -> u32 {
        if self.allow_partial {
            self.installments.max(1)
        } else {
            1
        }
    }
}

fn one() -> u32 {
    1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleStatus {
    #[default]
    Scheduled,
    Cancelled,
    Completed,
    Blocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecurrenceDay {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(alias = "professionalId", default, skip_serializing_if = "Option::is_none")]
    pub professional: Option<Reference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_id: Option<String>,
    #[serde(default, with = "wire::opt_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, with = "wire::opt_time")]
    pub start_time: Option<NaiveTime>,
    #[serde(default, with = "wire::opt_date")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, with = "wire::opt_time")]
    pub end_time: Option<NaiveTime>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub status: ScheduleStatus,
    #[serde(default)]
    pub recurrence: Recurrence,
    #[serde(default, with = "wire::opt_date")]
    pub repeat_until: Option<NaiveDate>,
    #[serde(default, deserialize_with = "wire::null_as_empty")]
    pub custom_recurrence_days: Vec<RecurrenceDay>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashFlowSummary {
    #[serde(default)]
    pub total_inflow: f64,
    #[serde(default)]
    pub total_outflow: f64,
    #[serde(default)]
    pub net_balance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyCashFlow {
    pub month: String,
    #[serde(default)]
    pub inflow: f64,
    #[serde(default)]
    pub outflow: f64,
    #[serde(default)]
    pub balance: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CashFlowReport {
    #[serde(default)]
    pub summary: CashFlowSummary,
    #[serde(default)]
    pub monthly: Vec<MonthlyCashFlow>,
}

/* -------------------------
   Helpers
--------------------------*/

/// Decode every element that fits `T`, logging and skipping the rest.
pub fn decode_each<T: DeserializeOwned>(values: Vec<Value>, what: &'static str) -> Vec<T> {
    values
        .into_iter()
        .filter_map(|v| match serde_json::from_value::<T>(v) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::warn!(error = %e, what, "skipping malformed upstream record");
                None
            }
        })
        .collect()
}

/// `YYYY-MM-DD` dates and `HH:mm` times as the upstream API exchanges them.
pub mod wire {
    use chrono::{NaiveDate, NaiveTime};
    use serde::{Deserialize, Deserializer};

    pub const DATE_FORMAT: &str = "%Y-%m-%d";
    pub const TIME_FORMAT: &str = "%H:%M";

    pub fn parse_date(raw: &str) -> Option<NaiveDate> {
        let raw = raw.trim();
        // ISO timestamps carry the calendar day in their first ten characters
        let day = raw.get(..10).unwrap_or(raw);
        NaiveDate::parse_from_str(day, DATE_FORMAT).ok()
    }

    pub fn parse_time(raw: &str) -> Option<NaiveTime> {
        let raw = raw.trim();
        NaiveTime::parse_from_str(raw, TIME_FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
            .ok()
    }

    pub fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
    }

    pub mod date {
        use chrono::NaiveDate;
        use serde::{Deserialize, Deserializer, Serializer, de::Error};

        pub fn serialize<S: Serializer>(value: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
            s.collect_str(&value.format(super::DATE_FORMAT))
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDate, D::Error> {
            let raw = String::deserialize(d)?;
            super::parse_date(&raw)
                .ok_or_else(|| D::Error::custom(format!("invalid date `{raw}`, expected YYYY-MM-DD")))
        }
    }

    pub mod time {
        use chrono::NaiveTime;
        use serde::{Deserialize, Deserializer, Serializer, de::Error};

        pub fn serialize<S: Serializer>(value: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
            s.collect_str(&value.format(super::TIME_FORMAT))
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
            let raw = String::deserialize(d)?;
            super::parse_time(&raw)
                .ok_or_else(|| D::Error::custom(format!("invalid time `{raw}`, expected HH:mm")))
        }
    }

    pub mod opt_date {
        use chrono::NaiveDate;
        use serde::{Deserialize, Deserializer, Serializer, de::Error};

        pub fn serialize<S: Serializer>(value: &Option<NaiveDate>, s: S) -> Result<S::Ok, S::Error> {
            match value {
                Some(d) => s.collect_str(&d.format(super::DATE_FORMAT)),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
            match Option::<String>::deserialize(d)?.as_deref().map(str::trim) {
                None | Some("") => Ok(None),
                Some(raw) => super::parse_date(raw)
                    .map(Some)
                    .ok_or_else(|| D::Error::custom(format!("invalid date `{raw}`, expected YYYY-MM-DD"))),
            }
        }
    }

    pub mod opt_time {
        use chrono::NaiveTime;
        use serde::{Deserialize, Deserializer, Serializer, de::Error};

        pub fn serialize<S: Serializer>(value: &Option<NaiveTime>, s: S) -> Result<S::Ok, S::Error> {
            match value {
                Some(t) => s.collect_str(&t.format(super::TIME_FORMAT)),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveTime>, D::Error> {
            match Option::<String>::deserialize(d)?.as_deref().map(str::trim) {
                None | Some("") => Ok(None),
                Some(raw) => super::parse_time(raw)
                    .map(Some)
                    .ok_or_else(|| D::Error::custom(format!("invalid time `{raw}`, expected HH:mm"))),
            }
        }
    }
}
