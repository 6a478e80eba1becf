//! Position reconciliation engine.
//!
//! Keeps an investment's lot quantity consistent with its transaction
//! history. Transactions are signed deltas against the position: BUY adds
//! the transaction quantity, SELL subtracts it. Deleting a transaction
//! reverses its delta; updating one reverses the old delta and applies the
//! new one in a single computation.
//!
//! The engine is a pure function over decimals. It holds no state and
//! performs no I/O; persisting an accepted result (and serializing
//! reconciliations per investment) is the caller's job.

use rust_decimal::Decimal;

use crate::domain::entities::transaction::TransactionType;
use crate::domain::errors::ReconciliationError;
use crate::domain::value_objects::lots::Lots;

/// A transaction lifecycle event to reconcile against an investment.
///
/// Quantities are raw decimals rather than [`Lots`]: the engine itself
/// decides whether a supplied quantity is acceptable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PositionEvent {
    /// A new transaction is being recorded.
    Create {
        kind: TransactionType,
        quantity: Decimal,
    },
    /// An existing transaction changes type and/or quantity. The old pair
    /// comes from the store, the new pair from the caller.
    Update {
        old_kind: TransactionType,
        old_quantity: Decimal,
        new_kind: TransactionType,
        new_quantity: Decimal,
    },
    /// An existing transaction is being removed.
    Delete {
        kind: TransactionType,
        quantity: Decimal,
    },
}

fn signed_delta(kind: TransactionType, quantity: Decimal) -> Decimal {
    match kind {
        TransactionType::Buy => quantity,
        TransactionType::Sell => -quantity,
    }
}

fn require_positive(quantity: Decimal) -> Result<(), ReconciliationError> {
    if quantity > Decimal::ZERO {
        Ok(())
    } else {
        Err(ReconciliationError::InvalidQuantity { supplied: quantity })
    }
}

/// Derive the post-event position for an investment.
///
/// Caller-supplied quantities (Create, and the new half of Update) must be
/// strictly positive; stored quantities being reversed are trusted as
/// previously validated. A result below zero rejects the whole event with
/// `InsufficientPosition` and the caller must persist nothing.
pub fn reconcile(current: Lots, event: &PositionEvent) -> Result<Lots, ReconciliationError> {
    let delta = match *event {
        PositionEvent::Create { kind, quantity } => {
            require_positive(quantity)?;
            signed_delta(kind, quantity)
        }
        PositionEvent::Update {
            old_kind,
            old_quantity,
            new_kind,
            new_quantity,
        } => {
            require_positive(new_quantity)?;
            -signed_delta(old_kind, old_quantity) + signed_delta(new_kind, new_quantity)
        }
        PositionEvent::Delete { kind, quantity } => -signed_delta(kind, quantity),
    };

    let resulting = current.value() + delta;
    Lots::new(resulting).map_err(|_| ReconciliationError::InsufficientPosition {
        current: current.value(),
        resulting,
    })
}
