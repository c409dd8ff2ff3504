//! Error taxonomy for the core. Every fallible operation returns a
//! `CoreError` rather than panicking; none of these are logged by the core
//! itself, since an `Err` here is a caller-visible result, not a fault.

use thiserror::Error;

/// The reason an order failed validation before ever touching a book.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidOrderReason {
    #[error("pair {0:?} is not in the supported-pairs allow-list")]
    BadPair(String),

    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(String),

    #[error("price must be positive, got {0}")]
    NonPositivePrice(String),

    #[error("side must be \"buy\" or \"sell\", got {0:?}")]
    BadSide(String),

    #[error("order type must be \"limit\" or \"market\", got {0:?}")]
    BadType(String),

    #[error("{0:?} is not a valid decimal amount")]
    BadNumeric(String),
}

/// Top-level error returned by every `BookRegistry` and `OrderBook` operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("invalid order: {0}")]
    InvalidOrder(#[from] InvalidOrderReason),

    #[error("order {0} not found")]
    NotFound(u64),

    #[error("order {0} does not belong to the requesting user")]
    NotOwner(u64),

    #[error("order {0} is not in a cancellable state")]
    NotCancellable(u64),

    /// Defensive only: a `MARKET` order is designed to never rest, so in
    /// practice this arm is unreachable on the submit path, but it is kept
    /// so a future matching strategy that can leave a market order resting
    /// has somewhere to report the resulting inconsistency.
    #[error("order {0} cannot be matched")]
    CannotMatch(u64),
}
