use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::Instrument;
use uuid::Uuid;

use crate::error::FieldError;
use crate::finance;
use crate::messages;
use crate::models::{PaymentMethod, PaymentMethodKind, wire};
use crate::orchestrator::{AppointmentOrchestrator, FlowError, MutationOutcome};

/// Payment form as submitted from the actions panel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentForm {
    #[serde(default, with = "wire::opt_date")]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub value: f64,
    #[serde(default)]
    pub installments: Option<u32>,
}

impl PaymentForm {
    /// Submission stays disabled until a method is chosen.
    pub fn can_submit(&self) -> bool {
        self.method.as_deref().is_some_and(|m| !m.trim().is_empty())
    }
}

pub fn installment_value(total: f64, installments: u32) -> f64 {
    total / f64::from(installments.max(1))
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentQuote {
    pub method: String,
    pub shows_installments: bool,
    pub max_installments: u32,
    pub installments: u32,
    pub installment_value: f64,
    pub installment_value_rounded: f64,
}

/// Installment breakdown for a method. Methods without partial payment
/// always quote exactly one installment.
pub fn quote(method: &PaymentMethod, value: f64, requested: Option<u32>) -> Result<PaymentQuote, FieldError> {
    let max = method.max_installments();
    let installments = if method.allow_partial {
        let n = requested.unwrap_or(max);
        if n < 1 || n > max {
            return Err(FieldError::new("installments", messages::INSTALLMENTS_OUT_OF_RANGE));
        }
        n
    } else {
        1
    };

    let per = installment_value(value, installments);
    Ok(PaymentQuote {
        method: method.id.clone(),
        shows_installments: method.allow_partial,
        max_installments: max,
        installments,
        installment_value: per,
        installment_value_rounded: round_cents(per),
    })
}

/// Marks a completed appointment with pending billing as paid.
pub async fn register_payment(
    agenda: &AppointmentOrchestrator,
    id: &str,
    form: PaymentForm,
) -> Result<MutationOutcome, FlowError> {
    let flow_id = Uuid::new_v4();
    let span = tracing::info_span!("register_payment", %flow_id, %id);
    async move {
        let mut errors = Vec::new();
        if !form.can_submit() {
            errors.push(FieldError::new("method", messages::PAYMENT_METHOD_REQUIRED));
        }
        if !(form.value > 0.0) {
            errors.push(FieldError::new("value", messages::PAYMENT_VALUE_REQUIRED));
        }
        let method_id = match form.method.as_deref().map(str::trim) {
            Some(m) if errors.is_empty() => m.to_string(),
            _ => return Err(FlowError::Validation(errors)),
        };

        let _guard = agenda.in_flight().acquire(format!("entry:{id}"))?;
        let record = agenda.fetch_record(id).await?;
        if !finance::can_register_payment(&record) {
            return Err(FlowError::PaymentUnavailable);
        }

        let method = agenda
            .backend()
            .payment_method(&method_id)
            .await
            .map_err(|e| match e.status() {
                Some(404) => FlowError::Validation(vec![FieldError::new(
                    "method",
                    messages::PAYMENT_METHOD_REQUIRED,
                )]),
                _ => FlowError::Load(e),
            })?;
        let quote = quote(&method, form.value, form.installments)
            .map_err(|e| FlowError::Validation(vec![e]))?;

        let mut patch = finance::derive_payment_payload(&method.id);
        if let Some(f) = patch.finance.as_mut() {
            f.amount = Some(form.value);
            f.installments = Some(quote.installments);
            f.payment_date = Some(
                form.date
                    .unwrap_or_else(|| Utc::now().with_timezone(&agenda.formatter().timezone()).date_naive()),
            );
        }

        agenda
            .backend()
            .update_appointment_status(id, &patch)
            .await
            .map_err(FlowError::Persist)?;
        tracing::info!(method = %method.id, installments = quote.installments, "payment registered");

        let events = agenda.reload().await?;
        Ok(agenda.outcome(Some(id.to_string()), messages::PAYMENT_REGISTERED, events))
    }
    .instrument(span)
    .await
}

/* -------------------------
   Payment method catalog
--------------------------*/

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodInput {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<PaymentMethodKind>,
    #[serde(default)]
    pub allow_partial: bool,
    #[serde(default)]
    pub installments: Option<u32>,
}

impl PaymentMethodInput {
    /// Non-partial methods are stored with a single installment.
    pub fn normalized(mut self) -> Result<Self, Vec<FieldError>> {
        let mut errors = Vec::new();
        self.name = self.name.trim().to_string();
        if self.name.is_empty() {
            errors.push(FieldError::new("name", messages::PAYMENT_METHOD_NAME_REQUIRED));
        }
        if self.allow_partial {
            match self.installments {
                Some(0) => errors.push(FieldError::new("installments", messages::INSTALLMENTS_OUT_OF_RANGE)),
                None => self.installments = Some(1),
                Some(_) => {}
            }
        } else {
            self.installments = Some(1);
        }

        if errors.is_empty() { Ok(self) } else { Err(errors) }
    }
}

pub fn default_methods() -> Vec<PaymentMethodInput> {
    let method = |kind: PaymentMethodKind, allow_partial: bool, installments: u32| PaymentMethodInput {
        name: kind.label().to_string(),
        kind: Some(kind),
        allow_partial,
        installments: Some(installments),
    };
    vec![
        method(PaymentMethodKind::Cash, false, 1),
        method(PaymentMethodKind::Credit, true, 12),
        method(PaymentMethodKind::Debit, false, 1),
        method(PaymentMethodKind::Pix, false, 1),
        method(PaymentMethodKind::Transfer, false, 1),
    ]
}
