//! Error types for settlement graph reduction

use crate::types::{Amount, PartyId};
use thiserror::Error;

/// Result type for settlement graph operations
pub type Result<T> = std::result::Result<T, Error>;

/// Settlement graph errors
#[derive(Error, Debug)]
pub enum Error {
    /// Rejected input expense (non-positive amount or self-loop)
    #[error("Invalid expense {borrower} -> {lender} ({amount}): {reason}")]
    InvalidExpense {
        /// Borrowing party
        borrower: PartyId,
        /// Lending party
        lender: PartyId,
        /// Offending amount
        amount: Amount,
        /// Why it was rejected
        reason: String,
    },

    /// Aggregated amounts do not fit the amount type
    #[error("Amount overflow while aggregating {borrower} -> {lender}")]
    AmountOverflow {
        /// Borrowing party
        borrower: PartyId,
        /// Lending party
        lender: PartyId,
    },

    /// Internal graph invariant broken; indicates a bug
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Reduction needed more productive passes than the configured cap
    #[error("Reduction pass limit exceeded after {passes} productive passes")]
    PassLimitExceeded {
        /// Passes performed before giving up
        passes: usize,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl Error {
    /// Build an `InvalidExpense` error
    pub(crate) fn invalid_expense(
        borrower: &PartyId,
        lender: &PartyId,
        amount: Amount,
        reason: impl Into<String>,
    ) -> Self {
        Error::InvalidExpense {
            borrower: borrower.clone(),
            lender: lender.clone(),
            amount,
            reason: reason.into(),
        }
    }

    /// Whether this error comes from rejected input rather than a defect
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidExpense { .. } | Error::AmountOverflow { .. }
        )
    }
}
