//! Internal helpers for model validation and conversion.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation and mapping logic so the engine enforces consistent invariants.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

/// Parse a UUID from storage and return a labeled error on failure.
pub(crate) fn parse_uuid(value: &str, label: &str) -> ResultEngine<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| EngineError::Validation(format!("invalid {label} id: {value}")))
}

/// Parse a decimal stored as TEXT into a strongly typed `Decimal`.
pub(crate) fn parse_decimal(value: &str, label: &str) -> ResultEngine<Decimal> {
    Decimal::from_str_exact(value)
        .map_err(|_| EngineError::Validation(format!("invalid {label}: {value}")))
}

/// Validate goal fields for a space: a target amount must be >= 0 and a
/// target date must not lie in the past at set-time.
pub(crate) fn validate_goal_fields(
    target_amount: Option<Decimal>,
    target_date: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> ResultEngine<()> {
    if let Some(amount) = target_amount
        && amount < Decimal::ZERO
    {
        return Err(EngineError::Validation(
            "target_amount must be >= 0".to_string(),
        ));
    }
    if let Some(date) = target_date
        && date < now
    {
        return Err(EngineError::Validation(
            "target_date must not be in the past".to_string(),
        ));
    }
    Ok(())
}
