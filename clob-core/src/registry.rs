//! Routes operations to the right pair's book, owns the global id
//! generators and the event bus, and enforces the supported-pairs
//! allow-list before any order reaches a book.

use crate::book::OrderBook;
use crate::config::CoreConfig;
use crate::error::CoreError;
use crate::event::{Event, EventBus, SubscriberId};
use crate::matching;
use crate::types::{CancelReason, NewOrder, Order, OrderId, OrderView, Pair, PriceLevel, Side, TradeId, UserId};
use crossbeam::channel::Receiver;
use flurry::HashMap as ConcurrentHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, instrument};

/// The entry point of the crate: one registry per venue, fanning out
/// across however many trading pairs it is configured to support.
pub struct BookRegistry {
    config: CoreConfig,
    books: ConcurrentHashMap<Pair, Arc<OrderBook>>,
    order_locations: ConcurrentHashMap<OrderId, Pair>,
    event_bus: EventBus,
    next_order_id: AtomicU64,
    next_trade_id: AtomicU64,
}

impl BookRegistry {
    pub fn new(config: CoreConfig) -> Self {
        let event_bus = EventBus::new(config.event_channel_capacity);
        BookRegistry {
            config,
            books: ConcurrentHashMap::new(),
            order_locations: ConcurrentHashMap::new(),
            event_bus,
            next_order_id: AtomicU64::new(1),
            next_trade_id: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn subscribe(&self) -> (SubscriberId, Receiver<Event>) {
        self.event_bus.subscribe()
    }

    pub fn unsubscribe(&self, id: SubscriberId) {
        self.event_bus.unsubscribe(id);
    }

    /// Returns the book for `pair`, creating it on first use. Two callers
    /// racing to create the same never-before-seen pair may both build an
    /// `OrderBook`, but `flurry`'s `insert` only lets one of them win, so
    /// every caller ends up looking at the same book either way.
    fn book_for(&self, pair: &Pair) -> Arc<OrderBook> {
        let pinned = self.books.pin();
        if let Some(book) = pinned.get(pair) {
            return book.clone();
        }
        let created = Arc::new(OrderBook::new(pair.clone()));
        pinned.insert(pair.clone(), created);
        pinned.get(pair).expect("just inserted").clone()
    }

    /// Builds the full-level-array `OrderBookUpdated` event for `book`,
    /// per §4.3: subscribers always get the complete book, not a delta.
    fn book_update_event(&self, book: &OrderBook) -> Event {
        Event::OrderBookUpdated {
            pair: book.pair().clone(),
            bids: book.snapshot_side(Side::Buy),
            asks: book.snapshot_side(Side::Sell),
            last_update: book.last_update(),
        }
    }

    fn validate(&self, request: &NewOrder) -> Result<(), CoreError> {
        if !request.pair.is_well_formed() {
            return Err(crate::error::InvalidOrderReason::BadPair(request.pair.to_string()).into());
        }
        if !self.config.is_supported(&request.pair) {
            return Err(crate::error::InvalidOrderReason::BadPair(request.pair.to_string()).into());
        }
        if !request.amount.is_positive() {
            return Err(crate::error::InvalidOrderReason::NonPositiveAmount(request.amount.to_string()).into());
        }
        if let crate::types::OrderType::Limit = request.order_type {
            match request.price {
                Some(price) if price.is_positive() => {}
                Some(price) => {
                    return Err(crate::error::InvalidOrderReason::NonPositivePrice(price.to_string()).into());
                }
                None => {
                    return Err(
                        crate::error::InvalidOrderReason::NonPositivePrice("missing".to_string()).into(),
                    );
                }
            }
        }
        Ok(())
    }

    /// Validates, inserts, and matches a new order against the book for its
    /// pair, all within this one call: the whole operation runs under that
    /// book's write lock, so events are always published in submission
    /// order and no other writer can interleave with the walk.
    #[instrument(skip(self, request), fields(pair = %request.pair, side = ?request.side))]
    pub fn submit(&self, request: NewOrder) -> Result<OrderView, CoreError> {
        self.validate(&request)?;

        let book = self.book_for(&request.pair);
        let guard = book.lock();

        let priority = book.next_priority();
        let order_id = self.next_order_id.fetch_add(1, Ordering::Relaxed);
        let taker = Arc::new(Order::new(order_id, priority, priority, &request));
        book.record(&guard, &taker);
        self.order_locations.pin().insert(order_id, request.pair.clone());
        self.event_bus.publish(Event::OrderAdded(taker.snapshot()));

        let outcome = matching::walk(&book, &guard, &taker, self.config.taker_fee_rate, || {
            self.next_trade_id.fetch_add(1, Ordering::Relaxed) as TradeId
        });

        for step in &outcome.steps {
            let matching::WalkStep::Matched { trade, maker } = step;
            self.event_bus.publish(Event::TradeExecuted(trade.clone()));
            self.event_bus.publish(Event::OrderUpdated(maker.snapshot()));
            self.event_bus.publish(Event::OrderUpdated(taker.snapshot()));
        }

        let rests = matches!(request.order_type, crate::types::OrderType::Limit) && taker.remaining().is_positive();
        if rests {
            book.insert(&guard, taker.clone());
        } else if taker.remaining().is_positive() {
            taker.apply_cancel(CancelReason::UnfilledRemainderDiscarded);
        }

        if rests || !outcome.trades.is_empty() || !outcome.self_trades_skipped.is_empty() {
            self.event_bus.publish(self.book_update_event(&book));
        }

        if !rests && !taker.remaining().is_zero() {
            self.event_bus
                .publish(Event::OrderCancelled(taker.snapshot(), CancelReason::UnfilledRemainderDiscarded));
        }

        debug!(order_id, trades = outcome.trades.len(), "order submitted");
        Ok(taker.snapshot())
    }

    /// Cancels a resting order. Fails with `NotOwner` if `user_id` does not
    /// match the order's owner, and `NotCancellable` if the order already
    /// left the book (filled or previously cancelled).
    #[instrument(skip(self))]
    pub fn cancel(&self, user_id: UserId, order_id: OrderId) -> Result<OrderView, CoreError> {
        let pair = self
            .order_locations
            .pin()
            .get(&order_id)
            .cloned()
            .ok_or(CoreError::NotFound(order_id))?;
        let book = self.book_for(&pair);
        let guard = book.lock();

        let existing = book.get(order_id).ok_or(CoreError::NotFound(order_id))?;
        if existing.user_id != user_id {
            return Err(CoreError::NotOwner(order_id));
        }
        if !existing.is_resting() {
            return Err(CoreError::NotCancellable(order_id));
        }

        let order = book.remove(&guard, order_id, CancelReason::UserRequested)?;
        drop(guard);

        self.event_bus
            .publish(Event::OrderCancelled(order.snapshot(), CancelReason::UserRequested));
        self.event_bus.publish(self.book_update_event(&book));
        Ok(order.snapshot())
    }

    /// Removes a resting order because an external expiry sweep decided its
    /// time is up. Behaves exactly like `cancel` except the terminal status
    /// recorded is `Expired`, not `Cancelled`, and no `CancelReason` is
    /// attached — expiry is its own terminal state, not a cancellation
    /// variant. `user_id` is not required: an expiry sweep acts on behalf of
    /// the book itself, not a specific caller.
    #[instrument(skip(self))]
    pub fn expire(&self, order_id: OrderId) -> Result<OrderView, CoreError> {
        let pair = self
            .order_locations
            .pin()
            .get(&order_id)
            .cloned()
            .ok_or(CoreError::NotFound(order_id))?;
        let book = self.book_for(&pair);
        let guard = book.lock();

        let existing = book.get(order_id).ok_or(CoreError::NotFound(order_id))?;
        if !existing.is_resting() {
            return Err(CoreError::NotCancellable(order_id));
        }

        let order = book.expire(&guard, order_id)?;
        drop(guard);

        self.event_bus.publish(Event::OrderExpired(order.snapshot()));
        self.event_bus.publish(self.book_update_event(&book));
        Ok(order.snapshot())
    }

    /// Cancels and reinserts a resting order at a new price, assigning it a
    /// fresh, last priority at that price level.
    #[instrument(skip(self))]
    pub fn modify(&self, user_id: UserId, order_id: OrderId, new_price: crate::decimal::Amount) -> Result<OrderView, CoreError> {
        if !new_price.is_positive() {
            return Err(crate::error::InvalidOrderReason::NonPositivePrice(new_price.to_string()).into());
        }

        let pair = self
            .order_locations
            .pin()
            .get(&order_id)
            .cloned()
            .ok_or(CoreError::NotFound(order_id))?;
        let book = self.book_for(&pair);
        let guard = book.lock();

        let existing = book.get(order_id).ok_or(CoreError::NotFound(order_id))?;
        if existing.user_id != user_id {
            return Err(CoreError::NotOwner(order_id));
        }
        if !existing.is_resting() {
            return Err(CoreError::NotCancellable(order_id));
        }
        if let crate::types::OrderType::Market = existing.order_type {
            return Err(CoreError::NotCancellable(order_id));
        }

        let removed = book.remove(&guard, order_id, CancelReason::UserRequested)?;
        let priority = book.next_priority();
        let request = NewOrder {
            user_id,
            pair: pair.clone(),
            side: removed.side,
            order_type: removed.order_type,
            price: Some(new_price),
            amount: removed.remaining(),
            chain_id: removed.chain_id,
            nonce: removed.nonce.clone(),
            signature: removed.signature.clone(),
        };
        let replacement = Arc::new(Order::new(order_id, priority, priority, &request));
        book.record(&guard, &replacement);
        book.insert(&guard, replacement.clone());
        drop(guard);

        self.event_bus.publish(Event::OrderUpdated(replacement.snapshot()));
        self.event_bus.publish(self.book_update_event(&book));
        Ok(replacement.snapshot())
    }

    pub fn get_order(&self, order_id: OrderId) -> Option<OrderView> {
        let pair = self.order_locations.pin().get(&order_id).cloned()?;
        let book = self.book_for(&pair);
        book.get(order_id).map(|o| o.snapshot())
    }

    /// Lists every currently-resting order belonging to `user_id` across
    /// all pairs.
    pub fn orders_for_user(&self, user_id: UserId) -> Vec<OrderView> {
        let mut out = Vec::new();
        for (pair, _) in self.books.pin().iter() {
            let book = self.book_for(pair);
            for side in [Side::Buy, Side::Sell] {
                let epoch_guard = &crossbeam::epoch::pin();
                let side_book = match side {
                    Side::Buy => book.bids(),
                    Side::Sell => book.asks(),
                };
                for entry in side_book.iter(epoch_guard) {
                    let order = entry.value();
                    if order.user_id == user_id {
                        out.push(order.snapshot());
                    }
                }
            }
        }
        out
    }

    /// A full snapshot of one pair's book, best price first on each side.
    pub fn snapshot(&self, pair: &Pair) -> (Vec<PriceLevel>, Vec<PriceLevel>) {
        let book = self.book_for(pair);
        (book.snapshot_side(Side::Buy), book.snapshot_side(Side::Sell))
    }

    /// Publishes `OrderBookSnapshot` for `pair` to every current subscriber.
    /// Useful for a newly-connected subscriber to bootstrap its view of the
    /// book before consuming incremental `OrderBookUpdated` events.
    pub fn publish_snapshot(&self, pair: &Pair) {
        let book = self.book_for(pair);
        self.event_bus.publish(Event::OrderBookSnapshot {
            pair: pair.clone(),
            bids: book.snapshot_side(Side::Buy),
            asks: book.snapshot_side(Side::Sell),
            last_update: book.last_update(),
        });
    }
}
