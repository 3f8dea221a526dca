use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::LoanError;

/// payment / interest frequency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Monthly,
    Biweekly,
    Weekly,
    Daily,
    Semiannual,
    Annual,
}

impl Frequency {
    pub const ALL: [Frequency; 6] = [
        Frequency::Monthly,
        Frequency::Biweekly,
        Frequency::Weekly,
        Frequency::Daily,
        Frequency::Semiannual,
        Frequency::Annual,
    ];

    /// number of payment periods per year
    pub fn periods_per_year(&self) -> u32 {
        match self {
            Frequency::Monthly => 12,
            Frequency::Biweekly => 26,
            Frequency::Weekly => 52,
            Frequency::Daily => 365,
            Frequency::Semiannual => 2,
            Frequency::Annual => 1,
        }
    }

    /// approximate interval in days: round(365 / periods per year), half-up.
    /// Used for date stepping only when the frequency has no exact calendar
    /// unit; see [`Frequency::calendar_months`].
    pub fn payment_interval_days(&self) -> u32 {
        let ppy = self.periods_per_year();
        (365 * 2 + ppy) / (2 * ppy)
    }

    /// exact calendar-month step where one exists
    pub fn calendar_months(&self) -> Option<u32> {
        match self {
            Frequency::Monthly => Some(1),
            Frequency::Semiannual => Some(6),
            Frequency::Annual => Some(12),
            Frequency::Biweekly | Frequency::Weekly | Frequency::Daily => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Monthly => "monthly",
            Frequency::Biweekly => "biweekly",
            Frequency::Weekly => "weekly",
            Frequency::Daily => "daily",
            Frequency::Semiannual => "semiannual",
            Frequency::Annual => "annual",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = LoanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monthly" => Ok(Frequency::Monthly),
            "biweekly" => Ok(Frequency::Biweekly),
            "weekly" => Ok(Frequency::Weekly),
            "daily" => Ok(Frequency::Daily),
            "semiannual" => Ok(Frequency::Semiannual),
            "annual" => Ok(Frequency::Annual),
            other => Err(LoanError::UnknownFrequency {
                value: other.to_string(),
            }),
        }
    }
}
