//! Narrow storage seams consumed by the core's callers. The core itself
//! only passes plain values through these traits; persistence, locking and
//! optimistic-concurrency checks live behind them.

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::errors::{LoanError, Result};
use crate::events::{EventId, LoanEvent};
use crate::types::{LoanId, LoanSnapshot, ScheduleRow};

pub trait LoanRepository {
    fn get(&self, loan_id: LoanId) -> Result<LoanSnapshot>;
    fn update(&mut self, snapshot: LoanSnapshot) -> Result<()>;
}

pub trait ScheduleRepository {
    fn insert_rows(&mut self, loan_id: LoanId, rows: Vec<ScheduleRow>) -> Result<()>;
    fn delete_rows_after(&mut self, loan_id: LoanId, date: NaiveDate) -> Result<()>;
    /// swap the whole schedule in one step; recalculation output goes
    /// through here so delete-then-insert cannot be observed half done
    fn replace_rows(&mut self, loan_id: LoanId, rows: Vec<ScheduleRow>) -> Result<()>;
    fn rows(&self, loan_id: LoanId) -> Result<Vec<ScheduleRow>>;
}

pub trait EventRepository {
    fn insert(&mut self, event: LoanEvent) -> Result<EventId>;
    fn list_by_loan(&self, loan_id: LoanId) -> Result<Vec<LoanEvent>>;
}

/// in-memory repositories for tests and examples
#[derive(Debug, Default)]
pub struct InMemoryStore {
    loans: HashMap<LoanId, LoanSnapshot>,
    schedules: HashMap<LoanId, Vec<ScheduleRow>>,
    events: Vec<LoanEvent>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_loan(&mut self, snapshot: LoanSnapshot) {
        self.loans.insert(snapshot.loan_id, snapshot);
    }
}

impl LoanRepository for InMemoryStore {
    fn get(&self, loan_id: LoanId) -> Result<LoanSnapshot> {
        self.loans
            .get(&loan_id)
            .cloned()
            .ok_or(LoanError::NotFound {
                entity: "loan",
                id: loan_id,
            })
    }

    fn update(&mut self, snapshot: LoanSnapshot) -> Result<()> {
        if !self.loans.contains_key(&snapshot.loan_id) {
            return Err(LoanError::NotFound {
                entity: "loan",
                id: snapshot.loan_id,
            });
        }
        self.loans.insert(snapshot.loan_id, snapshot);
        Ok(())
    }
}

impl ScheduleRepository for InMemoryStore {
    fn insert_rows(&mut self, loan_id: LoanId, rows: Vec<ScheduleRow>) -> Result<()> {
        self.schedules.entry(loan_id).or_default().extend(rows);
        Ok(())
    }

    fn delete_rows_after(&mut self, loan_id: LoanId, date: NaiveDate) -> Result<()> {
        if let Some(rows) = self.schedules.get_mut(&loan_id) {
            rows.retain(|row| row.payment_date <= date);
        }
        Ok(())
    }

    fn replace_rows(&mut self, loan_id: LoanId, rows: Vec<ScheduleRow>) -> Result<()> {
        self.schedules.insert(loan_id, rows);
        Ok(())
    }

    fn rows(&self, loan_id: LoanId) -> Result<Vec<ScheduleRow>> {
        Ok(self.schedules.get(&loan_id).cloned().unwrap_or_default())
    }
}

impl EventRepository for InMemoryStore {
    fn insert(&mut self, event: LoanEvent) -> Result<EventId> {
        let id = event.event_id;
        self.events.push(event);
        Ok(id)
    }

    fn list_by_loan(&self, loan_id: LoanId) -> Result<Vec<LoanEvent>> {
        let mut events: Vec<LoanEvent> = self
            .events
            .iter()
            .filter(|e| e.loan_id == loan_id)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.event_date);
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::{Money, Rate};
    use crate::effects::apply_event;
    use crate::events::EventKind;
    use crate::frequency::Frequency;
    use crate::recalc::recalculate;
    use crate::schedule::calculate_schedule;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_missing_loan_is_not_found() {
        let store = InMemoryStore::new();
        assert!(matches!(
            store.get(Uuid::new_v4()).unwrap_err(),
            LoanError::NotFound { entity: "loan", .. }
        ));
    }

    #[test]
    fn test_delete_rows_after_keeps_anchor() {
        let mut store = InMemoryStore::new();
        let loan = LoanSnapshot::new(
            Money::from_major(10_000),
            Rate::from_percentage(5),
            12,
            date(2024, 1, 1),
            Frequency::Monthly,
        );
        let schedule = calculate_schedule(&loan).unwrap();
        store.insert_rows(loan.loan_id, schedule.clone()).unwrap();

        store
            .delete_rows_after(loan.loan_id, schedule[2].payment_date)
            .unwrap();
        assert_eq!(store.rows(loan.loan_id).unwrap().len(), 3);
    }

    // end-to-end: store a loan, apply an event, replace the schedule in one
    // step
    #[test]
    fn test_event_application_round_trip() {
        let mut store = InMemoryStore::new();
        let loan = LoanSnapshot::new(
            Money::from_major(10_000),
            Rate::from_percentage(5),
            12,
            date(2024, 1, 1),
            Frequency::Monthly,
        );
        store.insert_loan(loan.clone());
        let schedule = calculate_schedule(&loan).unwrap();
        store.insert_rows(loan.loan_id, schedule.clone()).unwrap();

        let event = LoanEvent::new(
            loan.loan_id,
            schedule[1].payment_date,
            EventKind::ExtraPayment {
                amount: Money::from_major(2_000),
            },
        );
        let (updated, directive) = apply_event(&loan, &event).unwrap();
        assert!(directive.is_required());
        store.update(updated.clone()).unwrap();
        store.insert(event.clone()).unwrap();

        let events = store.list_by_loan(loan.loan_id).unwrap();
        let existing = store.rows(loan.loan_id).unwrap();
        let new_schedule =
            recalculate(&loan, &events, &existing, schedule[1].payment_date).unwrap();
        store
            .replace_rows(loan.loan_id, new_schedule.clone())
            .unwrap();

        let stored = store.rows(loan.loan_id).unwrap();
        assert_eq!(stored, new_schedule);
        assert_eq!(stored.last().unwrap().ending_balance, Money::ZERO);
        assert_eq!(
            store.get(loan.loan_id).unwrap().current_balance,
            Money::from_major(8_000)
        );
    }
}
