use rust_decimal::Decimal;
use thiserror::Error;

/// Rejection reasons returned by the position reconciliation engine.
///
/// The engine never performs I/O; these are pure decisions. Callers must not
/// persist any part of the triggering event when one is returned.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ReconciliationError {
    /// The event would drive the investment's position below zero.
    #[error("Sale quantity cannot exceed the current position (held {current}, would become {resulting})")]
    InsufficientPosition { current: Decimal, resulting: Decimal },

    /// A transaction's own quantity must be strictly positive; only the
    /// derived investment position may be zero.
    #[error("Transaction quantity must be greater than zero (got {supplied})")]
    InvalidQuantity { supplied: Decimal },
}
