use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::client::ClientError;
use crate::error::FieldError;
use crate::messages;
use crate::models::{Recurrence, RecurrenceDay, Schedule, ScheduleStatus, wire};
use crate::orchestrator::FlowError;

/// Professional availability window as edited in the schedule form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleForm {
    #[serde(default)]
    pub professional: Option<String>,
    #[serde(default, with = "wire::opt_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, with = "wire::opt_time")]
    pub start_time: Option<NaiveTime>,
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

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulePayload {
    pub professional: String,
    #[serde(with = "wire::date")]
    pub start_date: NaiveDate,
    #[serde(with = "wire::time")]
    pub start_time: NaiveTime,
    #[serde(with = "wire::date")]
    pub end_date: NaiveDate,
    #[serde(with = "wire::time")]
    pub end_time: NaiveTime,
    pub timezone: String,
    pub status: ScheduleStatus,
    pub recurrence: Recurrence,
    #[serde(with = "wire::opt_date", skip_serializing_if = "Option::is_none")]
    pub repeat_until: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub custom_recurrence_days: Vec<RecurrenceDay>,
}

impl ScheduleForm {
    /// A schedule covers one day; recurring ones also need an end date.
    pub fn into_payload(self, default_timezone: &str) -> Result<SchedulePayload, Vec<FieldError>> {
        let mut errors = Vec::new();

        let professional = self
            .professional
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string);
        if professional.is_none() {
            errors.push(FieldError::new("professional", messages::PROFESSIONAL_REQUIRED));
        }
        if self.start_date.is_none() {
            errors.push(FieldError::new("startDate", messages::START_DATE_REQUIRED));
        }
        if self.start_time.is_none() {
            errors.push(FieldError::new("startTime", messages::START_TIME_REQUIRED));
        }
        if self.end_time.is_none() {
            errors.push(FieldError::new("endTime", messages::END_TIME_REQUIRED));
        }
        if let (Some(st), Some(et)) = (self.start_time, self.end_time) {
            if et <= st {
                errors.push(FieldError::new("endTime", messages::END_BEFORE_START));
            }
        }

        let recurring = self.recurrence != Recurrence::None;
        match (recurring, self.repeat_until, self.start_date) {
            (true, None, _) => {
                errors.push(FieldError::new("repeatUntil", messages::SCHEDULE_REPEAT_UNTIL_REQUIRED))
            }
            (true, Some(until), Some(start)) if until < start => errors.push(FieldError::new(
                "repeatUntil",
                messages::SCHEDULE_REPEAT_UNTIL_BEFORE_START,
            )),
            _ => {}
        }

        match (professional, self.start_date, self.start_time, self.end_time) {
            (Some(professional), Some(start_date), Some(start_time), Some(end_time)) if errors.is_empty() => {
                Ok(SchedulePayload {
                    professional,
                    start_date,
                    start_time,
                    end_date: start_date,
                    end_time,
                    timezone: self
                        .timezone
                        .filter(|tz| !tz.trim().is_empty())
                        .unwrap_or_else(|| default_timezone.to_string()),
                    status: self.status,
                    recurrence: self.recurrence,
                    repeat_until: self.repeat_until.filter(|_| recurring),
                    custom_recurrence_days: if self.recurrence == Recurrence::Custom {
                        self.custom_recurrence_days
                    } else {
                        Vec::new()
                    },
                })
            }
            _ => Err(errors),
        }
    }
}

/// Maps an upstream refusal to delete a schedule that still has
/// appointments to a readable conflict.
pub fn translate_delete_error(err: ClientError) -> FlowError {
    let blocked_by_appointments = match &err {
        ClientError::Status { status: 409, .. } => true,
        ClientError::Status { status, message, .. } if (400..500).contains(status) => {
            let lower = message.to_lowercase();
            lower.contains("appointment") || lower.contains("agendamento")
        }
        _ => false,
    };
    if blocked_by_appointments {
        FlowError::Conflict(messages::SCHEDULE_HAS_APPOINTMENTS.to_string())
    } else {
        FlowError::Persist(err)
    }
}

/// Occurrences of one recurring schedule, or a single one-off schedule.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSeries {
    pub series_id: String,
    pub schedules: Vec<Schedule>,
}

/// Groups by series id, falling back to the schedule's own id; series keep
/// the order in which they first appear.
pub fn group_by_series(schedules: Vec<Schedule>) -> Vec<ScheduleSeries> {
    let mut series: Vec<ScheduleSeries> = Vec::new();
    for schedule in schedules {
        let key = schedule
            .series_id
            .clone()
            .unwrap_or_else(|| schedule.id.clone());
        match series.iter_mut().find(|s| s.series_id == key) {
            Some(group) => group.schedules.push(schedule),
            None => series.push(ScheduleSeries {
                series_id: key,
                schedules: vec![schedule],
            }),
        }
    }
    series
}
