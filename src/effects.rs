//! Event effect handlers: pure transformations from a loan snapshot and a
//! validated event to a new snapshot plus a recalculation directive. The
//! input snapshot is never mutated, so event application stays replayable.

use crate::decimal::Money;
use crate::errors::{LoanError, Result};
use crate::events::{EventKind, LoanEvent};
use crate::schedule::add_months;
use crate::types::{AdjustmentType, AppliedTo, LoanSnapshot, RecalculationDirective};
use crate::validate::validate_event;

/// validate and apply an event, returning the updated snapshot and whether
/// the schedule tail must be regenerated. All-or-nothing: invalid events
/// leave no partial state behind.
pub fn apply_event(
    loan: &LoanSnapshot,
    event: &LoanEvent,
) -> Result<(LoanSnapshot, RecalculationDirective)> {
    let errors = validate_event(loan, event);
    if !errors.is_empty() {
        return Err(LoanError::Validation { errors });
    }

    let mut next = loan.clone();
    let directive = match &event.kind {
        EventKind::ExtraPayment { amount } => {
            next.current_balance = (next.current_balance - *amount).max(Money::ZERO);
            RecalculationDirective::From(event.event_date)
        }
        EventKind::SkipPayment { months } => {
            // interest for each skipped month compounds onto the balance
            let monthly = next.annual_rate.monthly();
            for _ in 0..*months {
                let accrued = (next.current_balance * monthly.as_decimal()).round_cents();
                next.current_balance += accrued;
            }
            next.term_months += months;
            RecalculationDirective::From(event.event_date)
        }
        EventKind::RateChange { new_rate } => {
            next.previous_rate = Some(next.annual_rate);
            next.annual_rate = *new_rate;
            RecalculationDirective::From(event.event_date)
        }
        EventKind::LoanModification { adjustment, value } => {
            match adjustment {
                AdjustmentType::Principal => {
                    next.principal += *value;
                    next.current_balance = (next.current_balance + *value).max(Money::ZERO);
                }
                AdjustmentType::Term => {
                    // whole-month value enforced by validation
                    let months: i64 = value
                        .as_decimal()
                        .trunc()
                        .to_string()
                        .parse()
                        .map_err(|_| LoanError::calculation("term adjustment out of range"))?;
                    next.term_months = (i64::from(next.term_months) + months) as u32;
                }
            }
            RecalculationDirective::From(event.event_date)
        }
        EventKind::GracePeriod { months } => {
            // simple interest on the unchanged balance, capitalized so the
            // regenerated schedule amortizes it; the first regular payment
            // begins after the grace window
            let monthly = next.annual_rate.monthly();
            let accrued = (next.current_balance
                * monthly.as_decimal()
                * rust_decimal::Decimal::from(*months))
            .round_cents();
            next.current_balance += accrued;
            next.accrued_interest += accrued;
            next.term_months += months;
            next.start_date = add_months(event.event_date, *months)?;
            RecalculationDirective::From(event.event_date)
        }
        EventKind::PaymentApplied { amount, applied_to } => match applied_to {
            AppliedTo::Principal => {
                next.current_balance = (next.current_balance - *amount).max(Money::ZERO);
                RecalculationDirective::From(event.event_date)
            }
            AppliedTo::Interest => {
                next.accrued_interest = (next.accrued_interest - *amount).max(Money::ZERO);
                RecalculationDirective::None
            }
            AppliedTo::Auto => {
                // accrued interest first, remainder to principal
                let to_interest = (*amount).min(next.accrued_interest);
                let to_principal = *amount - to_interest;
                next.accrued_interest -= to_interest;
                if to_principal.is_positive() {
                    next.current_balance =
                        (next.current_balance - to_principal).max(Money::ZERO);
                    RecalculationDirective::From(event.event_date)
                } else {
                    RecalculationDirective::None
                }
            }
        },
        EventKind::Accrual { amount } => {
            next.accrued_interest += *amount;
            RecalculationDirective::None
        }
    };

    Ok((next, directive))
}
