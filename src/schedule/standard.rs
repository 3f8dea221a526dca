//! Standard amortization: level payments from the closed-form PMT formula.

use crate::decimal::Money;
use crate::errors::Result;
use crate::schedule::{amortize, level_payment};
use crate::types::{LoanSnapshot, ScheduleRow};

/// applies when the loan has no balloon amount and no rate periods
pub fn supports(loan: &LoanSnapshot) -> bool {
    loan.rate_periods.is_empty() && !loan.balloon_amount.is_some_and(|b| b.is_positive())
}

pub fn calculate_payment(loan: &LoanSnapshot) -> Result<Money> {
    Ok(level_payment(
        loan.current_balance,
        loan.periodic_rate(),
        loan.payment_count(),
    ))
}

pub fn calculate_schedule(loan: &LoanSnapshot) -> Result<Vec<ScheduleRow>> {
    schedule_tail(loan, loan.payment_count(), 1)
}

pub(crate) fn schedule_tail(
    loan: &LoanSnapshot,
    payments: u32,
    first_number: u32,
) -> Result<Vec<ScheduleRow>> {
    let periodic = loan.periodic_rate();
    let payment = level_payment(loan.current_balance, periodic, payments);
    amortize(
        loan,
        loan.current_balance,
        periodic,
        payment,
        payments,
        first_number,
    )
}
