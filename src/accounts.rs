// src/accounts.rs
//
// Receivable and payable ledgers: due-state classification, filtering and
// status changes.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::client::Resource;
use crate::error::FieldError;
use crate::messages;
use crate::models::wire;

/// Days ahead of the due date at which a pending entry is flagged.
pub const DUE_SOON_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ledger {
    Receivable,
    Payable,
}

impl Ledger {
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "receivable" => Some(Ledger::Receivable),
            "payable" => Some(Ledger::Payable),
            _ => None,
        }
    }

    pub fn resource(self) -> Resource {
        match self {
            Ledger::Receivable => Resource::AccountsReceivable,
            Ledger::Payable => Resource::AccountsPayable,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    Pending,
    Paid,
    Cancelled,
    Overdue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountEntry {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub amount: f64,
    #[serde(default, with = "wire::opt_date")]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: Option<AccountStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appointment_id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method_id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DueState {
    Paid,
    Cancelled,
    Overdue,
    DueSoon,
    Pending,
    Unknown,
}

impl DueState {
    pub fn label(self) -> &'static str {
        match self {
            DueState::Paid => "Pago",
            DueState::Cancelled => "Cancelado",
            DueState::Overdue => "Vencido",
            DueState::DueSoon => "Próximo ao Vencimento",
            DueState::Pending => "Pendente",
            DueState::Unknown => "-",
        }
    }
}

pub fn due_state(entry: &AccountEntry, today: NaiveDate) -> DueState {
    match entry.status {
        Some(AccountStatus::Paid) => DueState::Paid,
        Some(AccountStatus::Cancelled) => DueState::Cancelled,
        Some(AccountStatus::Overdue) => DueState::Overdue,
        Some(AccountStatus::Pending) => match entry.due_date {
            Some(due) => {
                let days = (due - today).num_days();
                if days < 0 {
                    DueState::Overdue
                } else if days <= DUE_SOON_DAYS {
                    DueState::DueSoon
                } else {
                    DueState::Pending
                }
            }
            None => DueState::Pending,
        },
        None => DueState::Unknown,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountFilter {
    #[serde(default)]
    pub status: Option<AccountStatus>,
    #[serde(default, with = "wire::opt_date")]
    pub from: Option<NaiveDate>,
    #[serde(default, with = "wire::opt_date")]
    pub to: Option<NaiveDate>,
}

impl AccountFilter {
    /// Both date bounds are inclusive. Entries without a due date only pass
    /// when no bound is set.
    pub fn matches(&self, entry: &AccountEntry) -> bool {
        if self.status.is_some() && entry.status != self.status {
            return false;
        }
        if self.from.is_none() && self.to.is_none() {
            return true;
        }
        let Some(due) = entry.due_date else {
            return false;
        };
        self.from.is_none_or(|from| due >= from) && self.to.is_none_or(|to| due <= to)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRow {
    #[serde(flatten)]
    pub entry: AccountEntry,
    pub due_state: DueState,
    pub due_label: &'static str,
}

pub fn rows(entries: Vec<AccountEntry>, filter: &AccountFilter, today: NaiveDate) -> Vec<AccountRow> {
    entries
        .into_iter()
        .filter(|e| filter.matches(e))
        .map(|entry| {
            let state = due_state(&entry, today);
            AccountRow {
                entry,
                due_state: state,
                due_label: state.label(),
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountAction {
    Pay,
    Reopen,
    Cancel,
}

impl AccountAction {
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "pay" => Some(AccountAction::Pay),
            "reopen" => Some(AccountAction::Reopen),
            "cancel" => Some(AccountAction::Cancel),
            _ => None,
        }
    }

    pub fn target(self) -> AccountStatus {
        match self {
            AccountAction::Pay => AccountStatus::Paid,
            AccountAction::Reopen => AccountStatus::Pending,
            AccountAction::Cancel => AccountStatus::Cancelled,
        }
    }

    pub fn patch(self) -> Value {
        json!({ "status": self.target() })
    }
}

/// New ledger entry. Fields beyond amount and due date pass through as-is.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAccount {
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default, with = "wire::opt_date")]
    pub due_date: Option<NaiveDate>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl NewAccount {
    pub fn into_payload(self) -> Result<Value, Vec<FieldError>> {
        let mut errors = Vec::new();
        let amount = self.amount.filter(|a| *a > 0.0);
        if amount.is_none() {
            errors.push(FieldError::new("amount", messages::ACCOUNT_AMOUNT_REQUIRED));
        }
        if self.due_date.is_none() {
            errors.push(FieldError::new("dueDate", messages::ACCOUNT_DUE_DATE_REQUIRED));
        }

        match (amount, self.due_date) {
            (Some(amount), Some(due)) if errors.is_empty() => {
                let mut body = self.rest;
                body.remove("status");
                body.insert("amount".into(), json!(amount));
                body.insert("dueDate".into(), json!(due.format(wire::DATE_FORMAT).to_string()));
                body.insert("status".into(), json!(AccountStatus::Pending));
                Ok(Value::Object(body))
            }
            _ => Err(errors),
        }
    }
}
