//! Balloon amortization: level payments computed on the effective principal
//! (principal minus balloon), with the balloon settled on the final row.

use crate::decimal::Money;
use crate::errors::{LoanError, Result};
use crate::schedule::{amortize, level_payment, payment_date};
use crate::types::{LoanSnapshot, ScheduleRow};

/// applies when a positive balloon amount is set
pub fn supports(loan: &LoanSnapshot) -> bool {
    loan.balloon_amount.is_some_and(|b| b.is_positive())
}

fn balloon_amount(loan: &LoanSnapshot) -> Result<Money> {
    let balloon = loan
        .balloon_amount
        .ok_or_else(|| LoanError::configuration("balloon strategy requires a balloon amount"))?;
    if balloon >= loan.principal {
        return Err(LoanError::configuration(format!(
            "balloon amount {} must be less than principal {}",
            balloon, loan.principal
        )));
    }
    Ok(balloon)
}

pub fn calculate_payment(loan: &LoanSnapshot) -> Result<Money> {
    let balloon = balloon_amount(loan)?;
    let payments = loan.payment_count();
    if payments == 1 {
        // a 1-period loan settles the full principal plus one period's
        // interest in a single payment
        let interest = (loan.current_balance * loan.periodic_rate().as_decimal()).round_cents();
        return Ok(loan.current_balance + interest);
    }
    let effective = (loan.current_balance - balloon).max(Money::ZERO);
    Ok(level_payment(effective, loan.periodic_rate(), payments))
}

pub fn calculate_schedule(loan: &LoanSnapshot) -> Result<Vec<ScheduleRow>> {
    schedule_tail(loan, loan.payment_count(), 1)
}

pub(crate) fn schedule_tail(
    loan: &LoanSnapshot,
    payments: u32,
    first_number: u32,
) -> Result<Vec<ScheduleRow>> {
    let balloon = balloon_amount(loan)?;
    let periodic = loan.periodic_rate();

    if payments == 1 {
        let balance = loan.current_balance;
        let interest = (balance * periodic.as_decimal()).round_cents();
        return Ok(vec![ScheduleRow {
            payment_number: first_number,
            payment_date: payment_date(loan.start_date, loan.payment_frequency, 1)?,
            beginning_balance: balance,
            payment_amount: balance + interest,
            principal_portion: balance,
            interest_portion: interest,
            ending_balance: Money::ZERO,
            balloon_amount: None,
            rate_period_id: None,
            rate: None,
        }]);
    }

    let effective = (loan.current_balance - balloon).max(Money::ZERO);
    let payment = level_payment(effective, periodic, payments);
    let mut rows = amortize(loan, effective, periodic, payment, payments, first_number)?;

    // the balloon settles with the final row, recorded separately from the
    // principal/interest split
    if let Some(last) = rows.last_mut() {
        last.payment_amount += balloon;
        last.balloon_amount = Some(balloon);
    }

    Ok(rows)
}
