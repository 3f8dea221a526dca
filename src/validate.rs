use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::decimal::Money;
use crate::events::{EventKind, LoanEvent};
use crate::types::{AdjustmentType, LoanSnapshot};

/// field -> error messages map produced by validation. Empty means valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&[String]> {
        self.0.get(name).map(|v| v.as_slice())
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|k| k.as_str())
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// validate an event against the current loan state. Purely rule-based; no
/// mutation happens until this returns an empty map.
pub fn validate_event(loan: &LoanSnapshot, event: &LoanEvent) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    if event.loan_id != loan.loan_id {
        errors.add("loan_id", "event does not belong to this loan");
    }
    if event.event_date < loan.start_date {
        errors.add(
            "event_date",
            format!("must not be before loan start date {}", loan.start_date),
        );
    }

    match &event.kind {
        EventKind::ExtraPayment { amount } => {
            if !amount.is_positive() {
                errors.add("amount", "must be greater than zero");
            } else if *amount > loan.current_balance {
                errors.add(
                    "amount",
                    format!("exceeds current balance {}", loan.current_balance),
                );
            }
        }
        EventKind::SkipPayment { months } => {
            if !(1..=12).contains(months) {
                errors.add("months", "must be between 1 and 12");
            }
        }
        EventKind::RateChange { new_rate } => {
            if !new_rate.in_bounds() {
                errors.add("new_rate", "must be between 0 and 1");
            }
        }
        EventKind::LoanModification { adjustment, value } => match adjustment {
            AdjustmentType::Principal => {
                if loan.principal + *value <= Money::ZERO {
                    errors.add("value", "adjustment would make principal non-positive");
                }
            }
            AdjustmentType::Term => {
                let delta = value.as_decimal();
                if delta.fract() != rust_decimal::Decimal::ZERO {
                    errors.add("value", "term adjustment must be a whole number of months");
                }
                let months: i64 = delta.trunc().to_string().parse().unwrap_or(i64::MIN);
                if months + i64::from(loan.term_months) < 1 {
                    errors.add("value", "adjustment would make term shorter than one month");
                }
            }
        },
        EventKind::GracePeriod { months } => {
            if *months == 0 {
                errors.add("months", "must be at least 1");
            }
        }
        EventKind::PaymentApplied { amount, .. } => {
            if !amount.is_positive() {
                errors.add("amount", "must be greater than zero");
            }
        }
        EventKind::Accrual { amount } => {
            if !amount.is_positive() {
                errors.add("amount", "must be greater than zero");
            }
        }
    }

    errors
}
