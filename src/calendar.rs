use chrono::{DateTime, Duration, FixedOffset, LocalResult, NaiveDate, NaiveTime, Offset, TimeZone, Timelike};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::messages;
use crate::models::{
    AppointmentDraft, AppointmentRecord, AppointmentStatus, EntryKind, Finance, Reference, wire,
};

/// Entry rendered on the calendar, instants already anchored in the
/// business timezone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    #[serde(default)]
    pub all_day: bool,
    pub color: String,
    pub text_color: String,
    #[serde(default)]
    pub class_names: Vec<String>,
    pub kind: EntryKind,
    #[serde(default)]
    pub extended_props: ExtendedProps,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedProps {
    /// Stored title; `None` when the event shows the fallback title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub professional: Option<String>,
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default)]
    pub status: AppointmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finance: Option<Finance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

/// Which form a clicked event opens.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "form", content = "draft", rename_all = "lowercase")]
pub enum FormRoute {
    Appointment(AppointmentDraft),
    Block(AppointmentDraft),
}

pub fn status_color(status: AppointmentStatus) -> &'static str {
    match status {
        AppointmentStatus::Scheduled => "#2196f3",
        AppointmentStatus::PreScheduled => "#8c8c8c",
        AppointmentStatus::Completed => "#4caf50",
        AppointmentStatus::Cancelled => "#f44336",
        AppointmentStatus::Blocked => "#faad14",
    }
}

pub fn status_class(status: AppointmentStatus) -> &'static str {
    match status {
        AppointmentStatus::Scheduled => "scheduled",
        AppointmentStatus::PreScheduled => "pre-scheduled",
        AppointmentStatus::Completed => "completed",
        AppointmentStatus::Cancelled => "cancelled",
        AppointmentStatus::Blocked => "blocked",
    }
}

pub const ALL_DAY_END: NaiveTime = match NaiveTime::from_hms_opt(23, 59, 0) {
    Some(t) => t,
    None => NaiveTime::MIN,
};

/// All-day entries end at 23:59 of their start date, whatever end was set.
pub fn apply_all_day(draft: &mut AppointmentDraft) {
    if draft.all_day {
        draft.end_date = draft.start_date;
        draft.end_time = Some(ALL_DAY_END);
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EventFormatter {
    tz: Tz,
}

impl EventFormatter {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    fn instant(&self, date: NaiveDate, time: NaiveTime) -> Option<DateTime<FixedOffset>> {
        let local = date.and_time(time);
        match self.tz.from_local_datetime(&local) {
            LocalResult::Single(dt) => Some(dt.fixed_offset()),
            LocalResult::Ambiguous(earliest, _) => Some(earliest.fixed_offset()),
            // skipped by a DST jump: read with the offset in force before it
            LocalResult::None => {
                let before = self.tz.from_local_datetime(&(local - Duration::days(1))).earliest()?;
                let offset = i64::from(before.offset().fix().local_minus_utc());
                let utc = local - Duration::seconds(offset);
                Some(self.tz.from_utc_datetime(&utc).fixed_offset())
            }
        }
    }

    /// Calendar date and minute-precision wall time of an instant in the
    /// business timezone.
    pub fn local_parts(&self, instant: &DateTime<FixedOffset>) -> (NaiveDate, NaiveTime) {
        let local = instant.with_timezone(&self.tz);
        let time = NaiveTime::from_hms_opt(local.hour(), local.minute(), 0).unwrap_or(NaiveTime::MIN);
        (local.date_naive(), time)
    }

    /// `None` when the record has no usable start or end.
    pub fn format_event(&self, record: &AppointmentRecord) -> Option<CalendarEvent> {
        let start_date = record.start_date?;
        let start = self.instant(start_date, record.start_time?)?;
        let end = self.instant(record.end_date.unwrap_or(start_date), record.end_time?)?;

        let title = match &record.title {
            Some(title) => title.clone(),
            None => fallback_title(record),
        };

        Some(CalendarEvent {
            id: record.id.clone(),
            title,
            start,
            end,
            all_day: false,
            color: status_color(record.status).to_string(),
            text_color: "#ffffff".to_string(),
            class_names: vec![status_class(record.status).to_string()],
            kind: record.kind,
            extended_props: ExtendedProps {
                title: record.title.clone(),
                description: record.description.clone().unwrap_or_default(),
                customer: record.customer.as_ref().map(|c| c.id().to_string()),
                customer_name: record.customer.as_ref().map(|c| c.label().to_string()),
                professional: record.professional.as_ref().map(|p| p.id().to_string()),
                services: record.services.iter().map(|s| s.id().to_string()).collect(),
                status: record.status,
                amount: record.amount,
                finance: record.finance.clone(),
                timezone: record.timezone.clone(),
            },
        })
    }

    /// Formats every record that parses and has dates; the rest are logged
    /// and left off the calendar.
    pub fn format_all(&self, records: Vec<Value>) -> Vec<CalendarEvent> {
        records
            .into_iter()
            .filter_map(|raw| match serde_json::from_value::<AppointmentRecord>(raw) {
                Ok(record) => {
                    let event = self.format_event(&record);
                    if event.is_none() {
                        tracing::debug!(id = %record.id, "entry without start/end left off the calendar");
                    }
                    event
                }
                Err(e) => {
                    tracing::warn!(error = %e, "skipping malformed appointment record");
                    None
                }
            })
            .collect()
    }

    /// Draft for editing an existing event, dates taken from the event's
    /// current instants (so a drag or resize carries through).
    pub fn draft_from_event(&self, event: &CalendarEvent) -> AppointmentDraft {
        let (start_date, start_time) = self.local_parts(&event.start);
        let (end_date, end_time) = self.local_parts(&event.end);
        let props = &event.extended_props;

        AppointmentDraft {
            id: Some(event.id.clone()),
            kind: event.kind,
            title: props.title.clone().unwrap_or_default(),
            description: props.description.clone(),
            customer: props.customer.clone(),
            professional: props.professional.clone(),
            services: props.services.clone(),
            start_date: Some(start_date),
            start_time: Some(start_time),
            end_date: Some(end_date),
            end_time: Some(end_time),
            status: Some(props.status),
            all_day: event.all_day,
        }
    }

    /// Draft for a new appointment over a selected range.
    pub fn draft_from_selection(
        &self,
        start: &DateTime<FixedOffset>,
        end: &DateTime<FixedOffset>,
    ) -> AppointmentDraft {
        let (start_date, start_time) = self.local_parts(start);
        let (end_date, end_time) = self.local_parts(end);

        AppointmentDraft {
            kind: EntryKind::Appointment,
            start_date: Some(start_date),
            start_time: Some(start_time),
            end_date: Some(end_date),
            end_time: Some(end_time),
            status: Some(AppointmentStatus::Scheduled),
            ..Default::default()
        }
    }

    pub fn open_event(&self, event: &CalendarEvent) -> FormRoute {
        let draft = self.draft_from_event(event);
        match event.kind {
            EntryKind::Appointment => FormRoute::Appointment(draft),
            EntryKind::Block => FormRoute::Block(draft),
        }
    }
}

fn fallback_title(record: &AppointmentRecord) -> String {
    let customer = record
        .customer
        .as_ref()
        .map(Reference::label)
        .unwrap_or(messages::NO_CUSTOMER);
    let service = record
        .services
        .first()
        .map(Reference::label)
        .unwrap_or(messages::NO_SERVICE);
    format!("{customer} - {service}")
}

/// Selection range sent by the calendar.
#[derive(Debug, Clone, Deserialize)]
pub struct Selection {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

/// Short `dd/MM/yyyy HH:mm` rendering used in log lines.
pub fn describe_slot(date: NaiveDate, time: NaiveTime) -> String {
    format!("{} {}", date.format("%d/%m/%Y"), time.format(wire::TIME_FORMAT))
}
