pub mod balloon;
pub mod standard;
pub mod variable_rate;

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;

use crate::decimal::{Money, Rate};
use crate::errors::{LoanError, Result};
use crate::frequency::Frequency;
use crate::types::{LoanSnapshot, ScheduleRow};

/// the closed set of schedule calculation strategies. Exactly one applies to
/// any valid loan; [`select_strategy`] performs the dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalculationStrategy {
    Standard,
    Balloon,
    VariableRate,
}

impl CalculationStrategy {
    /// whether this strategy applies to the given loan
    pub fn supports(&self, loan: &LoanSnapshot) -> bool {
        match self {
            CalculationStrategy::Standard => standard::supports(loan),
            CalculationStrategy::Balloon => balloon::supports(loan),
            CalculationStrategy::VariableRate => variable_rate::supports(loan),
        }
    }

    /// periodic payment for the loan, rounded to cents
    pub fn calculate_payment(&self, loan: &LoanSnapshot) -> Result<Money> {
        match self {
            CalculationStrategy::Standard => standard::calculate_payment(loan),
            CalculationStrategy::Balloon => balloon::calculate_payment(loan),
            CalculationStrategy::VariableRate => variable_rate::calculate_payment(loan),
        }
    }

    /// full schedule for the loan's current horizon
    pub fn calculate_schedule(&self, loan: &LoanSnapshot) -> Result<Vec<ScheduleRow>> {
        self.schedule_tail(loan, loan.payment_count(), 1)
    }

    /// schedule segment with an explicit payment count and first payment
    /// number; used by recalculation to regenerate a tail
    pub(crate) fn schedule_tail(
        &self,
        loan: &LoanSnapshot,
        payments: u32,
        first_number: u32,
    ) -> Result<Vec<ScheduleRow>> {
        match self {
            CalculationStrategy::Standard => standard::schedule_tail(loan, payments, first_number),
            CalculationStrategy::Balloon => balloon::schedule_tail(loan, payments, first_number),
            CalculationStrategy::VariableRate => {
                variable_rate::schedule_tail(loan, payments, first_number)
            }
        }
    }
}

/// pick the single applicable strategy for a loan.
///
/// Rate periods select VariableRate; a balloon amount selects Balloon;
/// everything else is Standard. A loan matching more than one predicate is
/// an ambiguous configuration and is rejected outright.
pub fn select_strategy(loan: &LoanSnapshot) -> Result<CalculationStrategy> {
    let has_rate_periods = !loan.rate_periods.is_empty();
    let has_balloon = loan.balloon_amount.is_some_and(|b| b.is_positive());

    if has_rate_periods && has_balloon {
        return Err(LoanError::configuration(
            "loan has both rate periods and a balloon amount; strategies are mutually exclusive",
        ));
    }
    if !loan.annual_rate.in_bounds() {
        return Err(LoanError::configuration(format!(
            "annual rate {} outside [0, 1]",
            loan.annual_rate
        )));
    }
    if loan.term_months == 0 {
        return Err(LoanError::configuration("term must be at least one month"));
    }

    if has_rate_periods {
        variable_rate::validate_periods(loan)?;
        return Ok(CalculationStrategy::VariableRate);
    }
    if let Some(balloon) = loan.balloon_amount {
        if balloon.is_negative() || balloon >= loan.principal {
            return Err(LoanError::configuration(format!(
                "balloon amount {} must be in [0, principal {})",
                balloon, loan.principal
            )));
        }
        if balloon.is_positive() {
            return Ok(CalculationStrategy::Balloon);
        }
    }
    Ok(CalculationStrategy::Standard)
}

/// periodic payment for a loan (public core surface)
pub fn calculate_payment(loan: &LoanSnapshot) -> Result<Money> {
    select_strategy(loan)?.calculate_payment(loan)
}

/// full amortization schedule for a loan (public core surface)
pub fn calculate_schedule(loan: &LoanSnapshot) -> Result<Vec<ScheduleRow>> {
    select_strategy(loan)?.calculate_schedule(loan)
}

/// closed-form PMT: P * r * (1+r)^n / ((1+r)^n - 1), rounded to cents.
/// Zero rate degenerates to P / n.
pub(crate) fn level_payment(balance: Money, periodic: Rate, payments: u32) -> Money {
    if payments == 0 {
        return balance.round_cents();
    }
    if periodic.as_decimal().is_zero() {
        return (balance / Decimal::from(payments)).round_cents();
    }
    let factor = periodic.compound_factor(payments);
    let numerator = balance.as_decimal() * periodic.as_decimal() * factor;
    let denominator = factor - Decimal::ONE;
    Money::from_decimal(numerator / denominator).round_cents()
}

/// step a date forward by whole calendar months, clamping the day of month
pub(crate) fn add_months(date: NaiveDate, months: u32) -> Result<NaiveDate> {
    date.checked_add_months(chrono::Months::new(months))
        .ok_or_else(|| LoanError::calculation(format!("date overflow adding {months} months")))
}

/// date of the i-th payment (1-based) counted from a starting date.
/// Month-shaped frequencies step by calendar months; the rest use the
/// approximate day interval from the frequency table.
pub(crate) fn payment_date(start: NaiveDate, frequency: Frequency, index: u32) -> Result<NaiveDate> {
    match frequency.calendar_months() {
        Some(months) => add_months(start, months * index),
        None => {
            let days = i64::from(frequency.payment_interval_days()) * i64::from(index);
            start
                .checked_add_signed(Duration::days(days))
                .ok_or_else(|| LoanError::calculation(format!("date overflow adding {days} days")))
        }
    }
}

/// shared fixed-payment period loop.
///
/// Each period: interest = balance * r rounded to cents, principal = payment
/// - interest clamped to the outstanding balance. The final row forces
/// principal = balance and recomputes the payment so the ending balance is
/// exactly zero; every strategy relies on this same rule.
pub(crate) fn amortize(
    loan: &LoanSnapshot,
    opening_balance: Money,
    periodic: Rate,
    payment: Money,
    payments: u32,
    first_number: u32,
) -> Result<Vec<ScheduleRow>> {
    let mut rows = Vec::with_capacity(payments as usize);
    let mut balance = opening_balance;

    for i in 1..=payments {
        let number = first_number + i - 1;
        let date = payment_date(loan.start_date, loan.payment_frequency, i)?;
        let interest = (balance * periodic.as_decimal()).round_cents();
        let is_last = i == payments;

        let mut principal = (payment - interest).max(Money::ZERO);
        let mut amount = payment;
        if is_last || principal >= balance {
            // force the balance to exactly zero; the final payment absorbs
            // any accumulated rounding residue
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
            rate_period_id: None,
            rate: None,
        });

        balance = ending;
        if balance.is_zero() && !is_last {
            break;
        }
    }

    Ok(rows)
}

/// number of periods to pay a balance off at a fixed periodic rate and
/// payment amount, walking the balance forward period by period. A residue
/// under one major unit counts as paid off, since the final row's forcing
/// rule absorbs it. Errors when the payment does not even cover one period's
/// interest.
pub(crate) fn periods_to_payoff(balance: Money, periodic: Rate, payment: Money) -> Result<u32> {
    const MAX_PERIODS: u32 = 10_000;

    let mut remaining = balance;
    let mut periods = 0;

    while remaining >= Money::ONE && periods < MAX_PERIODS {
        let interest = (remaining * periodic.as_decimal()).round_cents();
        let principal = payment - interest;
        if !principal.is_positive() {
            return Err(LoanError::calculation(format!(
                "payment {payment} does not cover periodic interest {interest}"
            )));
        }
        remaining = (remaining - principal).max(Money::ZERO);
        periods += 1;
    }

    Ok(periods.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RatePeriod;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn standard_loan() -> LoanSnapshot {
        LoanSnapshot::new(
            Money::from_major(10_000),
            Rate::from_percentage(5),
            360,
            date(2024, 1, 1),
            Frequency::Monthly,
        )
    }

    #[test]
    fn test_selector_dispatch_order() {
        let loan = standard_loan();
        assert_eq!(select_strategy(&loan).unwrap(), CalculationStrategy::Standard);

        let balloon = loan.clone().with_balloon(Money::from_major(2_000));
        assert_eq!(select_strategy(&balloon).unwrap(), CalculationStrategy::Balloon);

        let variable = loan.clone().with_rate_periods(vec![RatePeriod::new(
            date(2024, 1, 1),
            date(2055, 1, 1),
            Rate::from_percentage(5),
        )]);
        assert_eq!(
            select_strategy(&variable).unwrap(),
            CalculationStrategy::VariableRate
        );
    }

    #[test]
    fn test_ambiguous_configuration_rejected() {
        let loan = standard_loan()
            .with_balloon(Money::from_major(2_000))
            .with_rate_periods(vec![RatePeriod::new(
                date(2024, 1, 1),
                date(2055, 1, 1),
                Rate::from_percentage(5),
            )]);
        let err = select_strategy(&loan).unwrap_err();
        assert!(matches!(err, LoanError::Configuration { .. }));
    }

    #[test]
    fn test_balloon_bounds_rejected() {
        let loan = standard_loan().with_balloon(Money::from_major(10_000));
        assert!(matches!(
            select_strategy(&loan).unwrap_err(),
            LoanError::Configuration { .. }
        ));
    }

    #[test]
    fn test_level_payment_scenario_a() {
        // principal=10000.00, 5% annual, monthly, 360 payments => ~53.68
        let payment = level_payment(
            Money::from_major(10_000),
            Rate::from_percentage(5).monthly(),
            360,
        );
        assert_eq!(payment, Money::from_decimal(dec!(53.68)));
    }

    #[test]
    fn test_level_payment_zero_rate() {
        let payment = level_payment(Money::from_major(1_200), Rate::ZERO, 12);
        assert_eq!(payment, Money::from_major(100));
    }

    #[test]
    fn test_payment_date_calendar_and_interval() {
        let start = date(2024, 1, 31);
        // monthly steps clamp to end of month
        assert_eq!(
            payment_date(start, Frequency::Monthly, 1).unwrap(),
            date(2024, 2, 29)
        );
        assert_eq!(
            payment_date(start, Frequency::Monthly, 3).unwrap(),
            date(2024, 4, 30)
        );
        // biweekly steps by 14 days
        assert_eq!(
            payment_date(start, Frequency::Biweekly, 2).unwrap(),
            date(2024, 2, 28)
        );
    }

    #[test]
    fn test_periods_to_payoff_matches_term() {
        let balance = Money::from_major(10_000);
        let rate = Rate::from_percentage(5).monthly();
        let payment = level_payment(balance, rate, 12);
        assert_eq!(periods_to_payoff(balance, rate, payment).unwrap(), 12);
    }

    #[test]
    fn test_periods_to_payoff_insufficient_payment() {
        let balance = Money::from_major(10_000);
        let rate = Rate::from_percentage(12).monthly();
        // 100/month interest, payment below it
        let err = periods_to_payoff(balance, rate, Money::from_major(50)).unwrap_err();
        assert!(matches!(err, LoanError::CalculationError { .. }));
    }
}
