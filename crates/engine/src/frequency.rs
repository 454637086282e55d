//! Recurring transfer frequencies.
//!
//! The frequency is a closed variant: both [`fires_in_month`] and
//! [`monthly_equivalent`] match exhaustively, so adding a frequency forces
//! updating the firing rule and the scaling rule together.
//!
//! [`fires_in_month`]: TransferFrequency::fires_in_month
//! [`monthly_equivalent`]: TransferFrequency::monthly_equivalent

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferFrequency {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Annually,
}

impl TransferFrequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Annually => "annually",
        }
    }

    /// Whether a transfer with this frequency fires during the given
    /// simulated month (0-based).
    pub fn fires_in_month(self, month: u32) -> bool {
        match self {
            Self::Daily | Self::Weekly | Self::Monthly => true,
            Self::Quarterly => month % 3 == 0,
            Self::Annually => month % 12 == 0,
        }
    }

    /// Scales a per-period amount to its monthly equivalent.
    ///
    /// Daily assumes 30 days per month and Weekly 4 weeks per month;
    /// Quarterly and Annually move the per-period amount in their firing
    /// month without scaling.
    pub fn monthly_equivalent(self, amount: Decimal) -> Decimal {
        match self {
            Self::Daily => amount * Decimal::from(30),
            Self::Weekly => amount * Decimal::from(4),
            Self::Monthly | Self::Quarterly | Self::Annually => amount,
        }
    }
}

impl TryFrom<&str> for TransferFrequency {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "quarterly" => Ok(Self::Quarterly),
            "annually" => Ok(Self::Annually),
            other => Err(EngineError::Validation(format!(
                "invalid transfer frequency: {other}"
            ))),
        }
    }
}
