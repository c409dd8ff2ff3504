//! Order, trade, and book-key types shared by [`crate::book`], [`crate::matching`],
//! and [`crate::registry`].

use crate::decimal::Amount;
use crate::error::InvalidOrderReason;
use std::cell::UnsafeCell;
use std::cmp::Ordering;
use std::fmt;

/// Identifies an order across its whole lifetime, unique per [`crate::registry::BookRegistry`].
pub type OrderId = u64;

/// Identifies the account an order was submitted on behalf of.
pub type UserId = u64;

/// Identifies a trade, unique per registry.
pub type TradeId = u64;

/// A trading pair such as `BTC/USD`, validated against the configured
/// supported-pairs allow-list at submission time, not parsed here.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pair(String);

impl Pair {
    pub fn new(raw: impl Into<String>) -> Self {
        Pair(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validates the `BASE/QUOTE` shape: exactly one `/` separating two
    /// non-empty tokens. Independent of the supported-pairs allow-list,
    /// which is checked separately once the pair is known to be well-formed.
    pub fn is_well_formed(&self) -> bool {
        match self.0.split_once('/') {
            Some((base, quote)) => !base.is_empty() && !quote.is_empty() && !quote.contains('/'),
            None => false,
        }
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pair({:?})", self.0)
    }
}

/// Side indicates the direction of the order.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
pub enum Side {
    /// The order wants to acquire the base asset, matching against resting sells.
    Buy,
    /// The order wants to dispose of the base asset, matching against resting buys.
    Sell,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl TryFrom<&str> for Side {
    type Error = InvalidOrderReason;
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "buy" => Ok(Side::Buy),
            "sell" => Ok(Side::Sell),
            other => Err(InvalidOrderReason::BadSide(other.to_string())),
        }
    }
}

/// OrderType determines how the order is matched against the book.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum OrderType {
    /// Rests on the book at its limit price if not immediately fully matched.
    Limit,
    /// Matches immediately against the best available prices and never rests.
    Market,
}

impl TryFrom<&str> for OrderType {
    type Error = InvalidOrderReason;
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "limit" => Ok(OrderType::Limit),
            "market" => Ok(OrderType::Market),
            other => Err(InvalidOrderReason::BadType(other.to_string())),
        }
    }
}

/// OrderStatus represents the current, caller-visible state of an order.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum OrderStatus {
    /// Resting on the book, matched so far for less than its full amount.
    Open,
    /// Matched for less than its full amount and still resting.
    PartiallyFilled,
    /// Matched for its full amount; no longer resting.
    Filled,
    /// Removed from the book before being fully matched.
    Cancelled,
    /// Removed from the book by an external expiry sweep before being fully
    /// matched; distinct from `Cancelled` so a transport layer can tell the
    /// two terminal paths apart without inspecting `CancelReason`.
    Expired,
}

/// CancelReason records why an order left the book without being fully filled.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum CancelReason {
    /// The owning user requested the cancellation.
    UserRequested,
    /// An `IOC`-style market order's unmatched remainder was discarded
    /// rather than left resting, since market orders never rest.
    UnfilledRemainderDiscarded,
}

/// BookKey is the skip-list ordering key for a resting order: price-time
/// priority, with the price comparison direction flipped by side so a
/// single ascending skip list sorts both book sides correctly.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct BookKey {
    pub price: Amount,
    pub priority: u64,
    pub side: Side,
}

impl Ord for BookKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.side {
            Side::Buy => self
                .price
                .cmp(&other.price)
                .reverse()
                .then(self.priority.cmp(&other.priority)),
            Side::Sell => self
                .price
                .cmp(&other.price)
                .then(self.priority.cmp(&other.priority)),
        }
    }
}

impl PartialOrd for BookKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A validated request to place a new order, produced by the caller and
/// consumed by [`crate::registry::BookRegistry::submit`].
#[derive(Clone, Debug)]
pub struct NewOrder {
    pub user_id: UserId,
    pub pair: Pair,
    pub side: Side,
    pub order_type: OrderType,
    /// Required for `Limit` orders; ignored for `Market` orders, which take
    /// whatever price the opposite book offers.
    pub price: Option<Amount>,
    pub amount: Amount,
    /// Opaque chain identifier, forwarded unexamined to any `Trade` this
    /// order takes part in. The core does not interpret it.
    pub chain_id: u64,
    /// Opaque replay-protection value forwarded unexamined; the core
    /// treats it as bytes, never as something to verify.
    pub nonce: Vec<u8>,
    /// Opaque signature bytes forwarded unexamined; signature verification
    /// is an external predicate applied before the order ever reaches
    /// `submit`, not something the core re-checks.
    pub signature: Vec<u8>,
}

/// A live or historical order. `remaining` and `status` are mutated in
/// place by the matching walk through `UnsafeCell`, so a partially filled
/// order keeps its original skip-list position instead of being removed
/// and reinserted on every fill.
///
/// SAFETY: every mutation of `remaining`/`status` happens while the owning
/// book's write lock (`OrderBook`'s per-book `Mutex<()>`) is held, so there
/// is never a second writer; reads through a shared reference (snapshots,
/// `get_order`) are safe because `Amount` and `OrderStatus` are `Copy` and
/// each read observes a value some write left whole.
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub pair: Pair,
    pub side: Side,
    pub order_type: OrderType,
    /// The limit price for `Limit` orders. `Market` orders never rest, so
    /// this field is only ever read while the order is being walked, but is
    /// still populated with `Amount::ZERO` for symmetry with `Order::clone`.
    pub price: Amount,
    pub amount: Amount,
    remaining: UnsafeCell<Amount>,
    status: UnsafeCell<OrderStatus>,
    cancel_reason: UnsafeCell<Option<CancelReason>>,
    /// Monotonic per-book sequence number assigned at insertion; doubles as
    /// the FIFO tiebreaker within a price level.
    pub priority: u64,
    pub created_at: u64,
    /// Opaque fields carried through unexamined from `NewOrder` to every
    /// `Trade` this order takes part in.
    pub chain_id: u64,
    pub nonce: Vec<u8>,
    pub signature: Vec<u8>,
}

unsafe impl Sync for Order {}

impl Order {
    pub fn new(id: OrderId, priority: u64, created_at: u64, request: &NewOrder) -> Self {
        Order {
            id,
            user_id: request.user_id,
            pair: request.pair.clone(),
            side: request.side,
            order_type: request.order_type,
            price: request.price.unwrap_or(Amount::ZERO),
            amount: request.amount,
            remaining: UnsafeCell::new(request.amount),
            status: UnsafeCell::new(OrderStatus::Open),
            cancel_reason: UnsafeCell::new(None),
            priority,
            created_at,
            chain_id: request.chain_id,
            nonce: request.nonce.clone(),
            signature: request.signature.clone(),
        }
    }

    #[inline]
    pub fn remaining(&self) -> Amount {
        unsafe { *self.remaining.get() }
    }

    #[inline]
    pub fn status(&self) -> OrderStatus {
        unsafe { *self.status.get() }
    }

    #[inline]
    pub fn cancel_reason(&self) -> Option<CancelReason> {
        unsafe { *self.cancel_reason.get() }
    }

    #[inline]
    pub fn is_resting(&self) -> bool {
        matches!(self.status(), OrderStatus::Open | OrderStatus::PartiallyFilled)
    }

    #[inline]
    pub fn book_key(&self) -> BookKey {
        BookKey {
            price: self.price,
            priority: self.priority,
            side: self.side,
        }
    }

    /// Reduces `remaining` by `traded` and updates `status` accordingly.
    /// Caller must hold the owning book's write lock.
    pub(crate) fn apply_fill(&self, traded: Amount) {
        let left = unsafe {
            let left = (*self.remaining.get()).saturating_sub(traded);
            *self.remaining.get() = left;
            left
        };
        let status = if left.is_zero() {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };
        unsafe { *self.status.get() = status };
    }

    /// Marks the order cancelled. Caller must hold the owning book's write lock.
    pub(crate) fn apply_cancel(&self, reason: CancelReason) {
        unsafe {
            *self.status.get() = OrderStatus::Cancelled;
            *self.cancel_reason.get() = Some(reason);
        }
    }

    /// Marks the order expired. Distinct from cancellation: an expiry sweep
    /// is not a `CancelReason`, it is its own terminal status. Caller must
    /// hold the owning book's write lock.
    pub(crate) fn apply_expire(&self) {
        unsafe {
            *self.status.get() = OrderStatus::Expired;
        }
    }

    /// Snapshot copy safe to hand to a caller outside the book's lock.
    pub fn snapshot(&self) -> OrderView {
        OrderView {
            id: self.id,
            user_id: self.user_id,
            pair: self.pair.clone(),
            side: self.side,
            order_type: self.order_type,
            price: self.price,
            amount: self.amount,
            remaining: self.remaining(),
            status: self.status(),
            cancel_reason: self.cancel_reason(),
            created_at: self.created_at,
            chain_id: self.chain_id,
            nonce: self.nonce.clone(),
            signature: self.signature.clone(),
        }
    }
}

/// A point-in-time, fully `Copy`/owned view of an [`Order`], safe to return
/// from any read path without exposing the internal `UnsafeCell`s.
#[derive(Clone, Debug)]
pub struct OrderView {
    pub id: OrderId,
    pub user_id: UserId,
    pub pair: Pair,
    pub side: Side,
    pub order_type: OrderType,
    pub price: Amount,
    pub amount: Amount,
    pub remaining: Amount,
    pub status: OrderStatus,
    pub cancel_reason: Option<CancelReason>,
    pub created_at: u64,
    pub chain_id: u64,
    pub nonce: Vec<u8>,
    pub signature: Vec<u8>,
}

/// A single executed match between a resting maker order and an incoming
/// taker order. The data model carries exactly one `fee`, charged to the
/// taker; see `crate::matching` for the rationale.
#[derive(Clone, Debug)]
pub struct Trade {
    pub id: TradeId,
    pub pair: Pair,
    pub maker_order_id: OrderId,
    pub taker_order_id: OrderId,
    /// The taker's side — `Buy` if the incoming order was a buy, `Sell`
    /// otherwise. The maker's side is always the opposite.
    pub side: Side,
    pub price: Amount,
    pub amount: Amount,
    pub fee: Amount,
    pub created_at: u64,
    /// Forwarded from the taker order's `chain_id`; opaque to the core.
    pub chain_id: u64,
}

/// One side of the book at a given price, as returned by a snapshot.
#[derive(Clone, Debug)]
pub struct PriceLevel {
    pub price: Amount,
    pub total_amount: Amount,
    pub order_count: usize,
}
