//! The module contains the errors the engine can throw.
//!
//! Every public operation returns one of these as its failure case:
//!
//! - [`Validation`] for missing, malformed or out-of-range input.
//! - [`NotFound`] when a referenced space or account is absent.
//! - [`InvalidState`] when the operation is not permitted in the current
//!   state (delete a funded space, unfreeze a space that is not frozen).
//! - [`InsufficientFunds`] when a transfer exceeds the source balance.
//! - [`Conflict`] when a concurrent writer won the compare-and-swap.
//!
//! [`Validation`]: EngineError::Validation
//! [`NotFound`]: EngineError::NotFound
//! [`InvalidState`]: EngineError::InvalidState
//! [`InsufficientFunds`]: EngineError::InsufficientFunds
//! [`Conflict`]: EngineError::Conflict
use rust_decimal::Decimal;
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("\"{0}\" not found")]
    NotFound(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds {
        available: Decimal,
        requested: Decimal,
    },
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::InvalidState(a), Self::InvalidState(b)) => a == b,
            (
                Self::InsufficientFunds {
                    available: a,
                    requested: ar,
                },
                Self::InsufficientFunds {
                    available: b,
                    requested: br,
                },
            ) => a == b && ar == br,
            (Self::Conflict(a), Self::Conflict(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
