//! Variable-rate amortization. No closed form exists when the rate changes
//! mid-schedule, so the level payment starts from a day-weighted average
//! rate and is refined by bisection until the simulated final balance falls
//! within one cent of zero.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::decimal::{Money, Rate};
use crate::errors::{LoanError, Result};
use crate::schedule::{level_payment, payment_date};
use crate::types::{LoanSnapshot, RatePeriodId, ScheduleRow};

const BISECTION_ITERATIONS: u32 = 80;

/// applies when one or more rate periods are present
pub fn supports(loan: &LoanSnapshot) -> bool {
    !loan.rate_periods.is_empty()
}

/// rate periods must be contiguous, non-overlapping, and cover the loan's
/// payment horizon
pub(crate) fn validate_periods(loan: &LoanSnapshot) -> Result<()> {
    let periods = &loan.rate_periods;
    for period in periods {
        if period.end_date <= period.start_date {
            return Err(LoanError::configuration(format!(
                "rate period {} has non-positive duration",
                period.id
            )));
        }
        if !period.rate.in_bounds() {
            return Err(LoanError::configuration(format!(
                "rate period {} rate {} outside [0, 1]",
                period.id, period.rate
            )));
        }
    }
    for pair in periods.windows(2) {
        if pair[1].start_date != pair[0].end_date {
            return Err(LoanError::configuration(format!(
                "rate periods {} and {} are not contiguous",
                pair[0].id, pair[1].id
            )));
        }
    }

    let (Some(first), Some(last)) = (periods.first(), periods.last()) else {
        return Err(LoanError::configuration(
            "variable-rate strategy requires rate periods",
        ));
    };
    let final_date = payment_date(loan.start_date, loan.payment_frequency, loan.payment_count())?;
    if first.start_date > loan.start_date || last.end_date <= final_date {
        return Err(LoanError::configuration(format!(
            "rate periods cover [{}, {}) but the loan runs from {} to {}",
            first.start_date, last.end_date, loan.start_date, final_date
        )));
    }
    Ok(())
}

/// resolve the rate in force on a date. Dates past the last period (a tail
/// regenerated beyond the original horizon) stay on the last period's rate.
fn rate_on(loan: &LoanSnapshot, date: NaiveDate) -> (Rate, Option<RatePeriodId>) {
    if let Some(period) = loan.rate_periods.iter().find(|p| p.contains(date)) {
        return (period.rate, Some(period.id));
    }
    match loan.rate_periods.last() {
        Some(last) => (last.rate, Some(last.id)),
        None => (loan.annual_rate, None),
    }
}

/// day-weighted average of the period rates over the payment horizon; seeds
/// the bisection bracket
fn weighted_average_rate(loan: &LoanSnapshot, final_date: NaiveDate) -> Rate {
    let mut weighted = Decimal::ZERO;
    let mut total_days = Decimal::ZERO;
    for period in &loan.rate_periods {
        let start = period.start_date.max(loan.start_date);
        let end = period.end_date.min(final_date);
        if end <= start {
            continue;
        }
        let days = Decimal::from((end - start).num_days());
        weighted += period.rate.as_decimal() * days;
        total_days += days;
    }
    if total_days.is_zero() {
        return loan.annual_rate;
    }
    Rate::from_decimal(weighted / total_days)
}

/// simulate the period loop for a candidate payment and return the balance
/// left after the last period (floored at zero by the principal clamp)
fn final_balance(loan: &LoanSnapshot, payment: Money, payments: u32) -> Result<Money> {
    let mut balance = loan.current_balance;
    for i in 1..=payments {
        let date = payment_date(loan.start_date, loan.payment_frequency, i)?;
        let (annual, _) = rate_on(loan, date);
        let periodic = annual.periodic(loan.payment_frequency);
        let interest = (balance * periodic.as_decimal()).round_cents();
        let principal = (payment - interest).max(Money::ZERO).min(balance);
        balance -= principal;
        if balance.is_zero() {
            break;
        }
    }
    Ok(balance)
}

pub fn calculate_payment(loan: &LoanSnapshot) -> Result<Money> {
    payment_for(loan, loan.payment_count())
}

pub(crate) fn payment_for(loan: &LoanSnapshot, payments: u32) -> Result<Money> {
    require_periods(loan)?;
    let final_date = payment_date(loan.start_date, loan.payment_frequency, payments)?;

    let min_rate = loan
        .rate_periods
        .iter()
        .map(|p| p.rate)
        .min()
        .unwrap_or(loan.annual_rate);
    let max_rate = loan
        .rate_periods
        .iter()
        .map(|p| p.rate)
        .max()
        .unwrap_or(loan.annual_rate);

    if min_rate == max_rate {
        return Ok(level_payment(
            loan.current_balance,
            min_rate.periodic(loan.payment_frequency),
            payments,
        ));
    }

    // bracket the payoff payment: the min-rate payment underpays, the
    // max-rate payment overpays
    let estimate = level_payment(
        loan.current_balance,
        weighted_average_rate(loan, final_date).periodic(loan.payment_frequency),
        payments,
    );
    let mut lo = level_payment(
        loan.current_balance,
        min_rate.periodic(loan.payment_frequency),
        payments,
    )
    .min(estimate);
    let mut hi = level_payment(
        loan.current_balance,
        max_rate.periodic(loan.payment_frequency),
        payments,
    )
    .max(estimate);

    for _ in 0..BISECTION_ITERATIONS {
        if hi - lo <= Money::CENT {
            break;
        }
        let mid = Money::from_decimal((lo + hi).as_decimal() / Decimal::from(2));
        if final_balance(loan, mid, payments)? > Money::CENT {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    Ok(hi.round_cents())
}

fn require_periods(loan: &LoanSnapshot) -> Result<()> {
    if loan.rate_periods.is_empty() {
        return Err(LoanError::configuration(
            "variable-rate strategy requires rate periods",
        ));
    }
    Ok(())
}

pub fn calculate_schedule(loan: &LoanSnapshot) -> Result<Vec<ScheduleRow>> {
    schedule_tail(loan, loan.payment_count(), 1)
}

pub(crate) fn schedule_tail(
    loan: &LoanSnapshot,
    payments: u32,
    first_number: u32,
) -> Result<Vec<ScheduleRow>> {
    let payment = payment_for(loan, payments)?;
    let mut rows = Vec::with_capacity(payments as usize);
    let mut balance = loan.current_balance;

    for i in 1..=payments {
        let number = first_number + i - 1;
        let date = payment_date(loan.start_date, loan.payment_frequency, i)?;
        let (annual, period_id) = rate_on(loan, date);
        let periodic = annual.periodic(loan.payment_frequency);
        let interest = (balance * periodic.as_decimal()).round_cents();
        let is_last = i == payments;

        let mut principal = (payment - interest).max(Money::ZERO);
        let mut amount = payment;
        if is_last || principal >= balance {
            principal = balance;
            amount = principal + interest;
        }
        let ending = balance - principal;

        rows.push(ScheduleRow {
            payment_number: number,
            payment_date: date,
            beginning_balance: balance,
            payment_amount: amount,
            principal_portion: principal,
            interest_portion: interest,
            ending_balance: ending,
            balloon_amount: None,
            rate_period_id: period_id,
            rate: Some(annual),
        });

        balance = ending;
        if balance.is_zero() && !is_last {
            break;
        }
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frequency::Frequency;
    use crate::schedule::select_strategy;
    use crate::types::RatePeriod;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn two_rate_loan() -> LoanSnapshot {
        LoanSnapshot::new(
            Money::from_major(20_000),
            Rate::from_percentage(4),
            24,
            date(2024, 1, 1),
            Frequency::Monthly,
        )
        .with_rate_periods(vec![
            RatePeriod::new(date(2024, 1, 1), date(2025, 1, 1), Rate::from_percentage(4)),
            RatePeriod::new(date(2025, 1, 1), date(2026, 2, 1), Rate::from_percentage(7)),
        ])
    }

    #[test]
    fn test_schedule_ends_at_exactly_zero() {
        let schedule = calculate_schedule(&two_rate_loan()).unwrap();
        assert_eq!(schedule.len(), 24);
        assert_eq!(schedule.last().unwrap().ending_balance, Money::ZERO);
    }

    #[test]
    fn test_refined_payment_nearly_zeroes_balance() {
        // the forced final row must only absorb rounding residue, not a
        // drifted approximation
        let loan = two_rate_loan();
        let payment = calculate_payment(&loan).unwrap();
        let residue = final_balance(&loan, payment, 24).unwrap();
        assert!(residue < Money::ONE, "residue {residue} too large");
    }

    #[test]
    fn test_payment_sits_between_constant_rate_payments() {
        let loan = two_rate_loan();
        let payment = calculate_payment(&loan).unwrap();
        let low = level_payment(
            Money::from_major(20_000),
            Rate::from_percentage(4).monthly(),
            24,
        );
        let high = level_payment(
            Money::from_major(20_000),
            Rate::from_percentage(7).monthly(),
            24,
        );
        assert!(payment > low && payment < high);
    }

    #[test]
    fn test_rows_record_rate_and_period() {
        let loan = two_rate_loan();
        let schedule = calculate_schedule(&loan).unwrap();
        let first_period = loan.rate_periods[0].id;
        let second_period = loan.rate_periods[1].id;

        // payments 1..=11 fall in 2024, 12 lands on 2025-01-01
        assert_eq!(schedule[0].rate, Some(Rate::from_percentage(4)));
        assert_eq!(schedule[0].rate_period_id, Some(first_period));
        assert_eq!(schedule[11].rate, Some(Rate::from_percentage(7)));
        assert_eq!(schedule[11].rate_period_id, Some(second_period));
        assert_eq!(schedule[23].rate_period_id, Some(second_period));
    }

    #[test]
    fn test_interest_steps_up_at_rate_change() {
        let schedule = calculate_schedule(&two_rate_loan()).unwrap();
        // balance declines monthly, yet the 7% period opens with more
        // interest than the 4% period closed with
        assert!(schedule[11].interest_portion > schedule[10].interest_portion);
    }

    #[test]
    fn test_adjacent_rows_link() {
        let schedule = calculate_schedule(&two_rate_loan()).unwrap();
        for pair in schedule.windows(2) {
            assert!(pair[0].links_to(&pair[1]));
        }
    }

    #[test]
    fn test_single_rate_period_matches_standard_payment() {
        let loan = LoanSnapshot::new(
            Money::from_major(10_000),
            Rate::from_percentage(5),
            12,
            date(2024, 1, 1),
            Frequency::Monthly,
        )
        .with_rate_periods(vec![RatePeriod::new(
            date(2024, 1, 1),
            date(2025, 2, 1),
            Rate::from_percentage(5),
        )]);
        let payment = calculate_payment(&loan).unwrap();
        assert_eq!(payment, Money::from_decimal(dec!(856.07)));
    }

    #[test]
    fn test_gap_between_periods_rejected() {
        let loan = LoanSnapshot::new(
            Money::from_major(10_000),
            Rate::from_percentage(5),
            24,
            date(2024, 1, 1),
            Frequency::Monthly,
        )
        .with_rate_periods(vec![
            RatePeriod::new(date(2024, 1, 1), date(2024, 6, 1), Rate::from_percentage(4)),
            RatePeriod::new(date(2024, 7, 1), date(2026, 2, 1), Rate::from_percentage(6)),
        ]);
        assert!(select_strategy(&loan).is_err());
    }

    #[test]
    fn test_short_coverage_rejected() {
        let loan = LoanSnapshot::new(
            Money::from_major(10_000),
            Rate::from_percentage(5),
            24,
            date(2024, 1, 1),
            Frequency::Monthly,
        )
        .with_rate_periods(vec![RatePeriod::new(
            date(2024, 1, 1),
            date(2025, 1, 1),
            Rate::from_percentage(4),
        )]);
        assert!(select_strategy(&loan).is_err());
    }
}
