use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{Money, Rate};
use crate::frequency::Frequency;

/// unique identifier for a loan
pub type LoanId = Uuid;

/// unique identifier for a rate period
pub type RatePeriodId = Uuid;

/// immutable view of a loan at a point in time.
///
/// Event handlers never mutate a snapshot; they return a new one, so
/// recalculation stays idempotent and replayable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanSnapshot {
    pub loan_id: LoanId,
    /// original financed amount
    pub principal: Money,
    pub current_balance: Money,
    /// annual rate as a decimal fraction, 0.05 = 5%
    pub annual_rate: Rate,
    /// payment horizon in months measured from start_date
    pub term_months: u32,
    pub start_date: NaiveDate,
    pub payment_frequency: Frequency,
    pub interest_calc_frequency: Frequency,
    pub balloon_amount: Option<Money>,
    /// ordered, contiguous rate periods; non-empty selects the
    /// variable-rate strategy
    #[serde(default)]
    pub rate_periods: Vec<RatePeriod>,
    /// interest accrued outside the schedule (accrual events, grace periods)
    #[serde(default)]
    pub accrued_interest: Money,
    /// rate in force before the most recent rate change
    #[serde(default)]
    pub previous_rate: Option<Rate>,
}

impl LoanSnapshot {
    /// create a fresh snapshot for an unamortized loan
    pub fn new(
        principal: Money,
        annual_rate: Rate,
        term_months: u32,
        start_date: NaiveDate,
        payment_frequency: Frequency,
    ) -> Self {
        Self {
            loan_id: Uuid::new_v4(),
            principal,
            current_balance: principal,
            annual_rate,
            term_months,
            start_date,
            payment_frequency,
            interest_calc_frequency: payment_frequency,
            balloon_amount: None,
            rate_periods: Vec::new(),
            accrued_interest: Money::ZERO,
            previous_rate: None,
        }
    }

    pub fn with_balloon(mut self, balloon: Money) -> Self {
        self.balloon_amount = Some(balloon);
        self
    }

    pub fn with_rate_periods(mut self, periods: Vec<RatePeriod>) -> Self {
        self.rate_periods = periods;
        self
    }

    /// total number of scheduled payments for the current horizon:
    /// term_months scaled by periods per year, rounded, floored at 1.
    /// The intermediate product is widened so long daily-frequency terms
    /// cannot overflow.
    pub fn payment_count(&self) -> u32 {
        let ppy = u64::from(self.payment_frequency.periods_per_year());
        let scaled = (u64::from(self.term_months) * ppy * 2 + 12) / 24;
        u32::try_from(scaled.max(1)).unwrap_or(u32::MAX)
    }

    /// periodic rate for the payment frequency
    pub fn periodic_rate(&self) -> Rate {
        self.annual_rate.periodic(self.payment_frequency)
    }
}

/// a contiguous date range with a fixed rate, for variable-rate loans.
/// covers dates where start_date <= d < end_date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatePeriod {
    pub id: RatePeriodId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub rate: Rate,
}

impl RatePeriod {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate, rate: Rate) -> Self {
        Self {
            id: Uuid::new_v4(),
            start_date,
            end_date,
            rate,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date < self.end_date
    }
}

/// one row of an amortization schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRow {
    /// 1-based, strictly increasing
    pub payment_number: u32,
    pub payment_date: NaiveDate,
    pub beginning_balance: Money,
    pub payment_amount: Money,
    pub principal_portion: Money,
    pub interest_portion: Money,
    pub ending_balance: Money,
    /// balloon settled with this row, recorded separately from the
    /// principal/interest split
    #[serde(default)]
    pub balloon_amount: Option<Money>,
    #[serde(default)]
    pub rate_period_id: Option<RatePeriodId>,
    /// rate applied in this period, recorded for variable-rate schedules
    #[serde(default)]
    pub rate: Option<Rate>,
}

impl ScheduleRow {
    /// row i's ending balance must equal row i+1's beginning balance
    pub fn links_to(&self, next: &ScheduleRow) -> bool {
        self.ending_balance == next.beginning_balance
            && next.payment_number == self.payment_number + 1
    }
}

/// whether an event requires the schedule tail to be regenerated, and from
/// which date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecalculationDirective {
    None,
    From(NaiveDate),
}

impl RecalculationDirective {
    pub fn is_required(&self) -> bool {
        matches!(self, RecalculationDirective::From(_))
    }
}

/// loan modification target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdjustmentType {
    Principal,
    Term,
}

/// where a standalone payment is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppliedTo {
    Principal,
    Interest,
    Auto,
}
