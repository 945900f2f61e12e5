//! The module contains the errors the engine can throw.
//!
//! The ones callers are expected to match on are:
//!
//! - [`InsufficientStock`] thrown when a withdrawal would drive a stock row
//!   below zero.
//! - [`InsufficientBalance`] thrown when an expense would overdraw an account
//!   that rejects negative balances.
//! - [`StaleReference`] thrown when a reversal points at a stock row that no
//!   longer exists.
//!
//! A missing account during ledger synchronization is **not** an error: see
//! [`SyncOutcome::NoAccount`].
//!
//!  [`InsufficientStock`]: EngineError::InsufficientStock
//!  [`InsufficientBalance`]: EngineError::InsufficientBalance
//!  [`StaleReference`]: EngineError::StaleReference
//!  [`SyncOutcome::NoAccount`]: crate::SyncOutcome::NoAccount
use sea_orm::DbErr;
use thiserror::Error;

use crate::{Money, Quantity};

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Insufficient stock for \"{item}\": available {available}, requested {requested}")]
    InsufficientStock {
        item: String,
        available: Quantity,
        requested: Quantity,
    },
    #[error("Insufficient balance on \"{account}\": balance {balance}, requested {requested}")]
    InsufficientBalance {
        account: String,
        balance: Money,
        requested: Money,
    },
    #[error("Stale reference: {0}")]
    StaleReference(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Still in use: {0}")]
    InUse(String),
    #[error("Managed entry: {0}")]
    ManagedEntry(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Self::InsufficientStock {
                    item: a,
                    available: b,
                    requested: c,
                },
                Self::InsufficientStock {
                    item: x,
                    available: y,
                    requested: z,
                },
            ) => a == x && b == y && c == z,
            (
                Self::InsufficientBalance {
                    account: a,
                    balance: b,
                    requested: c,
                },
                Self::InsufficientBalance {
                    account: x,
                    balance: y,
                    requested: z,
                },
            ) => a == x && b == y && c == z,
            (Self::StaleReference(a), Self::StaleReference(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::InUse(a), Self::InUse(b)) => a == b,
            (Self::ManagedEntry(a), Self::ManagedEntry(b)) => a == b,
            (Self::Forbidden(a), Self::Forbidden(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidQuantity(a), Self::InvalidQuantity(b)) => a == b,
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_stock_message_is_itemized() {
        let err = EngineError::InsufficientStock {
            item: "Rice".to_string(),
            available: Quantity::from_milli(1_500),
            requested: Quantity::from_milli(2_000),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for \"Rice\": available 1.500, requested 2.000"
        );
    }

    #[test]
    fn insufficient_balance_message_names_account() {
        let err = EngineError::InsufficientBalance {
            account: "Checking".to_string(),
            balance: Money::new(1_000),
            requested: Money::new(2_500),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient balance on \"Checking\": balance 10.00, requested 25.00"
        );
    }
}
