use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;

use crate::frequency::Frequency;

/// Money type with 8 decimal places of internal precision.
///
/// All arithmetic re-rounds to 8 places so hundreds of compounding periods
/// cannot accumulate binary-float style drift. Externally visible amounts go
/// through [`Money::round_cents`], which is the single presentation rounding
/// point: 2 decimal places, half-away-from-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);
    pub const ONE: Money = Money(Decimal::ONE);
    /// one cent, the reconciliation tolerance absorbed by the final payment
    pub const CENT: Money = Money(Decimal::from_parts(1, 0, 0, false, 2));

    /// create from decimal
    pub fn from_decimal(d: Decimal) -> Self {
        Money(d.round_dp(8))
    }

    /// create from string with exact parsing
    pub fn from_str_exact(s: &str) -> Result<Self, rust_decimal::Error> {
        Ok(Money(Decimal::from_str(s)?.round_dp(8)))
    }

    /// create from whole currency units (dollars, euros, etc)
    pub fn from_major(amount: i64) -> Self {
        Money(Decimal::from(amount))
    }

    /// create from cents
    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::new(cents, 2))
    }

    /// get underlying decimal
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// round to cents: 2 decimal places, half-away-from-zero
    pub fn round_cents(&self) -> Self {
        Money(
            self.0
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// check if zero
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// check if strictly positive
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// check if strictly negative
    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// absolute value
    pub fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// minimum of two values
    pub fn min(self, other: Self) -> Self {
        Money(self.0.min(other.0))
    }

    /// maximum of two values
    pub fn max(self, other: Self) -> Self {
        Money(self.0.max(other.0))
    }

    /// true when within one cent of the other value
    pub fn reconciles_with(&self, other: Money) -> bool {
        (*self - other).abs() <= Money::CENT
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Money::from_str_exact(s)
    }
}

impl From<Decimal> for Money {
    fn from(d: Decimal) -> Self {
        Money::from_decimal(d)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, other: Money) -> Money {
        Money((self.0 + other.0).round_dp(8))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Money) {
        self.0 = (self.0 + other.0).round_dp(8);
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, other: Money) -> Money {
        Money((self.0 - other.0).round_dp(8))
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Money) {
        self.0 = (self.0 - other.0).round_dp(8);
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl Mul<Decimal> for Money {
    type Output = Money;

    fn mul(self, other: Decimal) -> Money {
        Money((self.0 * other).round_dp(8))
    }
}

impl Div<Decimal> for Money {
    type Output = Money;

    fn div(self, other: Decimal) -> Money {
        Money((self.0 / other).round_dp(8))
    }
}

/// rate type for annual interest rates, expressed as a decimal fraction
/// (0.05 = 5%)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Rate(Decimal);

impl Rate {
    pub const ZERO: Rate = Rate(Decimal::ZERO);
    pub const ONE: Rate = Rate(Decimal::ONE);

    /// create from decimal fraction (e.g., 0.05 for 5%)
    pub fn from_decimal(d: Decimal) -> Self {
        Rate(d)
    }

    /// create from percentage (e.g., 5 for 5%)
    pub fn from_percentage(p: u32) -> Self {
        Rate(Decimal::from(p) / Decimal::from(100))
    }

    /// create from basis points (e.g., 500 for 5%)
    pub fn from_bps(bps: u32) -> Self {
        Rate(Decimal::from(bps) / Decimal::from(10000))
    }

    /// get as decimal fraction
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// get as percentage
    pub fn as_percentage(&self) -> Decimal {
        self.0 * Decimal::from(100)
    }

    /// valid annual rates sit in [0, 1]
    pub fn in_bounds(&self) -> bool {
        self.0 >= Decimal::ZERO && self.0 <= Decimal::ONE
    }

    /// periodic rate for a payment frequency: annual rate / periods per year
    pub fn periodic(&self, frequency: Frequency) -> Rate {
        Rate(self.0 / Decimal::from(frequency.periods_per_year()))
    }

    /// monthly rate from annual rate
    pub fn monthly(&self) -> Rate {
        Rate(self.0 / Decimal::from(12))
    }

    /// (1 + r)^n by repeated multiplication, no float powf
    pub fn compound_factor(&self, periods: u32) -> Decimal {
        let base = Decimal::ONE + self.0;
        let mut factor = Decimal::ONE;
        for _ in 0..periods {
            factor *= base;
        }
        factor
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.as_percentage())
    }
}

impl From<Decimal> for Rate {
    fn from(d: Decimal) -> Self {
        Rate::from_decimal(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_precision() {
        let m = Money::from_str_exact("100.123456789").unwrap();
        assert_eq!(m.to_string(), "100.12345679"); // rounded to 8 places
    }

    #[test]
    fn test_round_cents_half_away_from_zero() {
        assert_eq!(
            Money::from_decimal(dec!(10.005)).round_cents(),
            Money::from_decimal(dec!(10.01))
        );
        assert_eq!(
            Money::from_decimal(dec!(-10.005)).round_cents(),
            Money::from_decimal(dec!(-10.01))
        );
        assert_eq!(
            Money::from_decimal(dec!(10.004999)).round_cents(),
            Money::from_decimal(dec!(10.00))
        );
    }

    #[test]
    fn test_reconciliation_tolerance() {
        let a = Money::from_decimal(dec!(100.00));
        assert!(a.reconciles_with(Money::from_decimal(dec!(100.01))));
        assert!(a.reconciles_with(Money::from_decimal(dec!(99.99))));
        assert!(!a.reconciles_with(Money::from_decimal(dec!(100.02))));
    }

    #[test]
    fn test_periodic_rate() {
        let annual = Rate::from_percentage(12);
        assert_eq!(annual.periodic(Frequency::Monthly).as_decimal(), dec!(0.01));
        assert_eq!(annual.monthly().as_decimal(), dec!(0.01));
        assert_eq!(
            annual.periodic(Frequency::Semiannual).as_decimal(),
            dec!(0.06)
        );
    }

    #[test]
    fn test_compound_factor() {
        let r = Rate::from_decimal(dec!(0.10));
        assert_eq!(r.compound_factor(0), dec!(1));
        assert_eq!(r.compound_factor(1), dec!(1.10));
        assert_eq!(r.compound_factor(2), dec!(1.21));
    }

    #[test]
    fn test_rate_bounds() {
        assert!(Rate::from_decimal(dec!(0)).in_bounds());
        assert!(Rate::from_decimal(dec!(1)).in_bounds());
        assert!(!Rate::from_decimal(dec!(1.01)).in_bounds());
        assert!(!Rate::from_decimal(dec!(-0.01)).in_bounds());
    }
}
