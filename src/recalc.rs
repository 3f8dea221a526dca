//! Recalculation orchestration: decide which portion of an existing
//! schedule survives an event history, derive the adjusted starting balance,
//! and regenerate the tail with the applicable strategy.
//!
//! `recalculate` is pure: it returns the complete replacement schedule
//! (retained head plus regenerated tail) and touches no storage, so the
//! stale tail and its replacement swap in a single repository operation.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::decimal::{Money, Rate};
use crate::errors::{LoanError, Result};
use crate::events::{EventKind, LoanEvent};
use crate::schedule::{add_months, periods_to_payoff, select_strategy};
use crate::types::{AdjustmentType, AppliedTo, LoanSnapshot, ScheduleRow};

/// the last schedule row unaffected by the event window, from which
/// regeneration resumes
#[derive(Debug, Clone, PartialEq)]
struct Anchor {
    payment_number: u32,
    payment_date: NaiveDate,
    ending_balance: Money,
}

/// regenerate the affected tail of a schedule after events.
///
/// Events dated on or before `target_date` are replayed in chronological
/// order against the anchor row's ending balance; rows after the anchor are
/// replaced by a tail regenerated from the replayed balance, rate, and
/// horizon. Rows before the anchor are preserved untouched. Principal
/// reductions settle through the anchor row's payment split; capitalized
/// interest lands on its ending balance, so adjacent rows stay linked either
/// way. When no in-window event requires regeneration the existing schedule
/// is returned unchanged.
pub fn recalculate(
    loan: &LoanSnapshot,
    events: &[LoanEvent],
    existing_schedule: &[ScheduleRow],
    target_date: NaiveDate,
) -> Result<Vec<ScheduleRow>> {
    if existing_schedule.is_empty() {
        return Err(LoanError::NotFound {
            entity: "schedule",
            id: loan.loan_id,
        });
    }

    let mut window: Vec<&LoanEvent> = events
        .iter()
        .filter(|e| e.loan_id == loan.loan_id && e.event_date <= target_date)
        .collect();
    window.sort_by_key(|e| e.event_date);

    if !window.iter().any(|e| triggers_recalculation(&e.kind)) {
        return Ok(existing_schedule.to_vec());
    }

    let anchor = existing_schedule
        .iter()
        .filter(|row| row.payment_date <= target_date)
        .next_back()
        .map(|row| Anchor {
            payment_number: row.payment_number,
            payment_date: row.payment_date,
            ending_balance: row.ending_balance,
        });

    // with no anchor, regeneration starts at the loan's origin with the
    // original principal
    let (anchor_number, anchor_date, anchor_balance) = match &anchor {
        Some(a) => (a.payment_number, a.payment_date, a.ending_balance),
        None => (0, loan.start_date, loan.principal),
    };

    let replay = replay_events(loan, &window, anchor_balance);
    let adjusted_balance = replay.balance;

    let mut head: Vec<ScheduleRow> = existing_schedule
        .iter()
        .filter(|row| row.payment_number <= anchor_number)
        .cloned()
        .collect();

    if let Some(last) = head.last_mut() {
        if adjusted_balance < last.ending_balance {
            // principal reductions settle through the anchor row, keeping
            // ending = beginning - principal intact on that row
            let reduction = last.ending_balance - adjusted_balance;
            last.principal_portion += reduction;
            last.payment_amount += reduction;
            last.ending_balance = adjusted_balance;
        } else if adjusted_balance > last.ending_balance {
            // capitalized interest from skips and grace periods lands on
            // the ending balance only; the row's own split is history
            last.ending_balance = adjusted_balance;
        }
    }

    if !adjusted_balance.is_positive() {
        // the events paid the loan off; every row past the anchor is stale
        return Ok(head);
    }

    let remaining = if replay.reshapes_tail {
        // rate or horizon changed: keep the original payment count, shifted
        // by term-extending events, and let the tail re-level its payment
        let horizon = existing_schedule[existing_schedule.len() - 1].payment_number;
        let base = i64::from(horizon) - i64::from(anchor_number) + replay.extra_periods;
        base.max(1) as u32
    } else {
        // balance-only events: hold the rate and the original level payment
        // fixed and solve for the payoff period count, rather than scaling
        // the original count by the balance ratio
        let reference_payment = existing_schedule[0].payment_amount;
        periods_to_payoff(adjusted_balance, loan.periodic_rate(), reference_payment)?
    };

    // strategy selection runs against the original snapshot; the synthetic
    // one repositions the balance, rate, and horizon for the tail
    let strategy = select_strategy(loan)?;

    let mut synthetic = loan.clone();
    synthetic.current_balance = adjusted_balance;
    synthetic.annual_rate = replay.annual_rate;
    synthetic.start_date = if replay.deferral_months > 0 {
        add_months(anchor_date, replay.deferral_months)?
    } else {
        anchor_date
    };

    let tail = strategy.schedule_tail(&synthetic, remaining, anchor_number + 1)?;

    let mut schedule = head;
    schedule.extend(tail);
    Ok(schedule)
}

/// whether an event kind forces the schedule tail to be regenerated,
/// mirroring the directives issued by [`crate::effects::apply_event`]
fn triggers_recalculation(kind: &EventKind) -> bool {
    match kind {
        EventKind::ExtraPayment { .. }
        | EventKind::SkipPayment { .. }
        | EventKind::RateChange { .. }
        | EventKind::LoanModification { .. }
        | EventKind::GracePeriod { .. } => true,
        EventKind::PaymentApplied { applied_to, .. } => {
            !matches!(applied_to, AppliedTo::Interest)
        }
        EventKind::Accrual { .. } => false,
    }
}

/// net effect of the event window on the regenerated tail
struct Replay {
    balance: Money,
    annual_rate: Rate,
    /// payment periods gained (or lost) through skips, grace periods, and
    /// term modifications
    extra_periods: i64,
    /// months the first regenerated payment is pushed out by grace periods
    deferral_months: u32,
    /// true when the tail must be re-leveled over the original horizon
    /// instead of solved against the original payment
    reshapes_tail: bool,
}

/// months expressed in payment periods, rounded half-up, sign preserved
fn months_to_periods(months: i64, ppy: i64) -> i64 {
    let periods = (months.abs() * ppy * 2 + 12) / 24;
    if months < 0 {
        -periods
    } else {
        periods
    }
}

/// replay the event window in chronological order against the anchor
/// balance, tracking the rate in force so later skips and grace periods
/// compound at the rate an earlier change put in place
fn replay_events(loan: &LoanSnapshot, window: &[&LoanEvent], anchor_balance: Money) -> Replay {
    let mut replay = Replay {
        balance: anchor_balance,
        annual_rate: loan.annual_rate,
        extra_periods: 0,
        deferral_months: 0,
        reshapes_tail: false,
    };
    let mut accrued = loan.accrued_interest;
    let ppy = i64::from(loan.payment_frequency.periods_per_year());

    for event in window {
        match &event.kind {
            EventKind::ExtraPayment { amount } => {
                replay.balance = (replay.balance - *amount).max(Money::ZERO);
            }
            EventKind::SkipPayment { months } => {
                let monthly = replay.annual_rate.monthly();
                for _ in 0..*months {
                    let interest = (replay.balance * monthly.as_decimal()).round_cents();
                    replay.balance += interest;
                }
                replay.extra_periods += months_to_periods(i64::from(*months), ppy);
                replay.reshapes_tail = true;
            }
            EventKind::RateChange { new_rate } => {
                replay.annual_rate = *new_rate;
                replay.reshapes_tail = true;
            }
            EventKind::LoanModification { adjustment, value } => match adjustment {
                AdjustmentType::Principal => {
                    replay.balance = (replay.balance + *value).max(Money::ZERO);
                }
                AdjustmentType::Term => {
                    // whole-month value enforced by validation
                    let months: i64 =
                        value.as_decimal().trunc().to_string().parse().unwrap_or(0);
                    replay.extra_periods += months_to_periods(months, ppy);
                    replay.reshapes_tail = true;
                }
            },
            EventKind::GracePeriod { months } => {
                let monthly = replay.annual_rate.monthly();
                let interest = (replay.balance
                    * monthly.as_decimal()
                    * Decimal::from(*months))
                .round_cents();
                replay.balance += interest;
                replay.extra_periods += months_to_periods(i64::from(*months), ppy);
                replay.deferral_months += months;
                replay.reshapes_tail = true;
            }
            EventKind::PaymentApplied { amount, applied_to } => {
                let to_interest = match applied_to {
                    AppliedTo::Interest => *amount,
                    AppliedTo::Principal => Money::ZERO,
                    AppliedTo::Auto => (*amount).min(accrued),
                };
                accrued = (accrued - to_interest).max(Money::ZERO);
                let to_principal = *amount - to_interest;
                if to_principal.is_positive() {
                    replay.balance = (replay.balance - to_principal).max(Money::ZERO);
                }
            }
            EventKind::Accrual { amount } => {
                accrued += *amount;
            }
        }
    }
    replay
}
