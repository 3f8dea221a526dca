use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{Money, Rate};
use crate::types::{AdjustmentType, AppliedTo, LoanId};

/// unique identifier for an event
pub type EventId = Uuid;

/// the kinds of loan events, with their typed payloads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum EventKind {
    /// lump-sum principal reduction
    ExtraPayment { amount: Money },
    /// defer payments; interest compounds onto the balance
    SkipPayment { months: u32 },
    /// new annual rate effective from the event date
    RateChange { new_rate: Rate },
    /// signed adjustment to principal or term
    LoanModification {
        adjustment: AdjustmentType,
        value: Money,
    },
    /// no payments due; simple interest accrues
    GracePeriod { months: u32 },
    /// standalone payment outside the schedule
    PaymentApplied { amount: Money, applied_to: AppliedTo },
    /// interest accrued outside the schedule
    Accrual { amount: Money },
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::ExtraPayment { .. } => "extra_payment",
            EventKind::SkipPayment { .. } => "skip_payment",
            EventKind::RateChange { .. } => "rate_change",
            EventKind::LoanModification { .. } => "loan_modification",
            EventKind::GracePeriod { .. } => "grace_period",
            EventKind::PaymentApplied { .. } => "payment_applied",
            EventKind::Accrual { .. } => "accrual",
        }
    }
}

/// a loan event: created by the caller, validated, applied exactly once.
/// Never mutated after creation; the event list is an append-only audit
/// trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanEvent {
    pub event_id: EventId,
    pub loan_id: LoanId,
    pub event_date: NaiveDate,
    #[serde(flatten)]
    pub kind: EventKind,
    #[serde(default)]
    pub notes: Option<String>,
}

impl LoanEvent {
    pub fn new(loan_id: LoanId, event_date: NaiveDate, kind: EventKind) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            loan_id,
            event_date,
            kind,
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// append-only event log for a single run; storage-backed callers use
/// [`crate::repository::EventRepository`] instead
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<LoanEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn record(&mut self, event: LoanEvent) -> EventId {
        let id = event.event_id;
        self.events.push(event);
        id
    }

    pub fn events(&self) -> &[LoanEvent] {
        &self.events
    }

    /// events for one loan, ordered by event date
    pub fn for_loan(&self, loan_id: LoanId) -> Vec<LoanEvent> {
        let mut events: Vec<LoanEvent> = self
            .events
            .iter()
            .filter(|e| e.loan_id == loan_id)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.event_date);
        events
    }

    pub fn take_events(&mut self) -> Vec<LoanEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_event_log_orders_by_date() {
        let loan_id = Uuid::new_v4();
        let mut log = EventLog::new();
        log.record(LoanEvent::new(
            loan_id,
            date(2024, 6, 1),
            EventKind::SkipPayment { months: 1 },
        ));
        log.record(LoanEvent::new(
            loan_id,
            date(2024, 3, 1),
            EventKind::ExtraPayment {
                amount: Money::from_decimal(dec!(2000)),
            },
        ));
        log.record(LoanEvent::new(
            Uuid::new_v4(),
            date(2024, 1, 1),
            EventKind::Accrual {
                amount: Money::from_decimal(dec!(10)),
            },
        ));

        let events = log.for_loan(loan_id);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_date, date(2024, 3, 1));
        assert_eq!(events[1].event_date, date(2024, 6, 1));
    }

    #[test]
    fn test_event_serde_tags_by_type() {
        let event = LoanEvent::new(
            Uuid::new_v4(),
            date(2024, 2, 15),
            EventKind::RateChange {
                new_rate: Rate::from_percentage(6),
            },
        );
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event_type\":\"rate_change\""));
        let back: LoanEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
