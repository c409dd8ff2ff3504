//! A single trading pair's order book: two price-time-ordered skip lists
//! (bids and asks) plus an id index, all readable lock-free. Every mutation
//! — insert, cancel, or the matching walk itself — runs under the book's
//! own write lock, so the book is single-threaded-per-writer even though
//! its storage is built from concurrent structures.

use crate::decimal::Amount;
use crate::error::CoreError;
use crate::types::{BookKey, CancelReason, Order, OrderId, Pair, PriceLevel, Side};
use crossbeam::epoch;
use crossbeam_skiplist::SkipList;
use flurry::HashMap as ConcurrentHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Guards mutating access to one book. Held for the whole duration of a
/// submit/cancel/modify call so the matching walk that call performs never
/// interleaves with another writer.
pub struct BookWriteGuard<'a>(#[allow(dead_code)] MutexGuard<'a, ()>);

pub struct OrderBook {
    pair: Pair,
    bids: SkipList<BookKey, Arc<Order>>,
    asks: SkipList<BookKey, Arc<Order>>,
    order_index: ConcurrentHashMap<OrderId, BookKey>,
    /// Every order ever admitted to this book, resting or not, kept for the
    /// lifetime of the process so a terminal order is still a valid
    /// `get_order` target — orders are historical records once they reach a
    /// terminal state, not tombstoned.
    orders: ConcurrentHashMap<OrderId, Arc<Order>>,
    write_lock: Mutex<()>,
    next_priority: AtomicU64,
    last_update: AtomicU64,
}

impl OrderBook {
    pub fn new(pair: Pair) -> Self {
        let collector = epoch::default_collector().clone();
        OrderBook {
            pair,
            bids: SkipList::new(collector.clone()),
            asks: SkipList::new(collector),
            order_index: ConcurrentHashMap::new(),
            orders: ConcurrentHashMap::new(),
            write_lock: Mutex::new(()),
            next_priority: AtomicU64::new(0),
            last_update: AtomicU64::new(0),
        }
    }

    pub fn pair(&self) -> &Pair {
        &self.pair
    }

    /// Acquires the per-book write lock. Every mutating `BookRegistry`
    /// operation holds this for its full duration.
    pub fn lock(&self) -> BookWriteGuard<'_> {
        BookWriteGuard(self.write_lock.lock().unwrap())
    }

    /// Assigns the next FIFO priority within this book. Monotonically
    /// increasing, so it doubles as this book's logical clock: callers use
    /// it both as the skip-list tiebreaker and as an event timestamp. Also
    /// advances `last_update` to the value it hands out, since every call
    /// site calls this exactly when the book is about to mutate.
    pub fn next_priority(&self) -> u64 {
        let assigned = self.next_priority.fetch_add(1, Ordering::Relaxed);
        self.last_update.store(assigned, Ordering::Relaxed);
        assigned
    }

    /// The timestamp of the most recent mutation to this book (insert,
    /// match, cancel, or expiry), per §3's `last_update` field.
    pub fn last_update(&self) -> u64 {
        self.last_update.load(Ordering::Relaxed)
    }

    fn side_book(&self, side: Side) -> &SkipList<BookKey, Arc<Order>> {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    pub fn bids(&self) -> &SkipList<BookKey, Arc<Order>> {
        &self.bids
    }

    pub fn asks(&self) -> &SkipList<BookKey, Arc<Order>> {
        &self.asks
    }

    /// Registers an order as part of this book's permanent history,
    /// independent of whether it ever rests. Must be called for every order
    /// admitted to this book, resting or not, so `get` can find it for the
    /// rest of the process's lifetime.
    pub fn record(&self, _guard: &BookWriteGuard<'_>, order: &Arc<Order>) {
        self.orders.pin().insert(order.id, order.clone());
    }

    /// Inserts a resting order. Requires the write lock. Does not register
    /// the order in the historical id map — callers are expected to have
    /// already called `record` for every order they admit.
    pub fn insert(&self, _guard: &BookWriteGuard<'_>, order: Arc<Order>) {
        let epoch_guard = &epoch::pin();
        let key = order.book_key();
        self.side_book(order.side).get_or_insert(key, order.clone(), epoch_guard);
        self.order_index.pin().insert(order.id, key);
    }

    /// Looks up any order ever admitted to this book by id, resting or
    /// terminal: orders are historical records once filled, cancelled, or
    /// expired, not removed from the index entirely.
    pub fn get(&self, order_id: OrderId) -> Option<Arc<Order>> {
        self.orders.pin().get(&order_id).cloned()
    }

    /// Removes a resting order from its book and the id index. Requires the
    /// write lock. Returns `NotFound` if the order never rested or already
    /// left the book.
    pub fn remove(
        &self,
        _guard: &BookWriteGuard<'_>,
        order_id: OrderId,
        reason: CancelReason,
    ) -> Result<Arc<Order>, CoreError> {
        let key = *self
            .order_index
            .pin()
            .get(&order_id)
            .ok_or(CoreError::NotFound(order_id))?;
        let epoch_guard = &epoch::pin();
        let entry = self
            .side_book(key.side)
            .get(&key, epoch_guard)
            .ok_or(CoreError::NotFound(order_id))?;
        let order = entry.value().clone();
        order.apply_cancel(reason);
        entry.remove();
        self.order_index.pin().remove(&order_id);
        self.next_priority();
        Ok(order)
    }

    /// Removes a resting order from its book and the id index, marking it
    /// expired rather than cancelled. Requires the write lock. Returns
    /// `NotFound` if the order never rested or already left the book.
    pub fn expire(&self, _guard: &BookWriteGuard<'_>, order_id: OrderId) -> Result<Arc<Order>, CoreError> {
        let key = *self
            .order_index
            .pin()
            .get(&order_id)
            .ok_or(CoreError::NotFound(order_id))?;
        let epoch_guard = &epoch::pin();
        let entry = self
            .side_book(key.side)
            .get(&key, epoch_guard)
            .ok_or(CoreError::NotFound(order_id))?;
        let order = entry.value().clone();
        order.apply_expire();
        entry.remove();
        self.order_index.pin().remove(&order_id);
        self.next_priority();
        Ok(order)
    }

    /// Drops `order_id` from the id index only. Used by the matching walk
    /// right after it removes a filled maker's skip-list entry directly —
    /// it already holds that entry, so re-looking it up here via `remove`
    /// would be wasted work. Leaves the order's entry in `orders` alone, so
    /// it remains a valid historical `get` target.
    pub fn forget(&self, _guard: &BookWriteGuard<'_>, order_id: OrderId) {
        self.order_index.pin().remove(&order_id);
    }

    pub fn best_price(&self, side: Side) -> Option<Amount> {
        let epoch_guard = &epoch::pin();
        self.side_book(side).front(epoch_guard).map(|e| e.key().price)
    }

    /// Aggregates resting orders into price levels, best price first.
    pub fn snapshot_side(&self, side: Side) -> Vec<PriceLevel> {
        let epoch_guard = &epoch::pin();
        let mut levels: Vec<PriceLevel> = Vec::new();
        for entry in self.side_book(side).iter(epoch_guard) {
            let order = entry.value();
            let remaining = order.remaining();
            match levels.last_mut() {
                Some(level) if level.price == entry.key().price => {
                    level.total_amount = level.total_amount + remaining;
                    level.order_count += 1;
                }
                _ => levels.push(PriceLevel {
                    price: entry.key().price,
                    total_amount: remaining,
                    order_count: 1,
                }),
            }
        }
        levels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NewOrder, Order as RestingOrder, OrderType};

    fn order(id: OrderId, side: Side, price: &str, amount: &str) -> Arc<RestingOrder> {
        let req = NewOrder {
            user_id: 1,
            pair: Pair::new("BTC/USD"),
            side,
            order_type: OrderType::Limit,
            price: Some(Amount::parse(price).unwrap()),
            amount: Amount::parse(amount).unwrap(),
            chain_id: 1,
            nonce: Vec::new(),
            signature: Vec::new(),
        };
        Arc::new(RestingOrder::new(id, id, id, &req))
    }

    #[test]
    fn insert_and_get_round_trips() {
        let book = OrderBook::new(Pair::new("BTC/USD"));
        let guard = book.lock();
        let resting = order(1, Side::Buy, "100", "1");
        book.record(&guard, &resting);
        book.insert(&guard, resting);
        drop(guard);
        assert!(book.get(1).is_some());
        assert_eq!(book.best_price(Side::Buy).unwrap().to_string(), "100");
    }

    #[test]
    fn remove_clears_book_but_keeps_the_order_as_history() {
        let book = OrderBook::new(Pair::new("BTC/USD"));
        let guard = book.lock();
        let resting = order(1, Side::Buy, "100", "1");
        book.record(&guard, &resting);
        book.insert(&guard, resting);
        book.remove(&guard, 1, CancelReason::UserRequested).unwrap();
        drop(guard);
        assert_eq!(book.get(1).unwrap().status(), crate::types::OrderStatus::Cancelled);
        assert!(book.best_price(Side::Buy).is_none());
    }

    #[test]
    fn snapshot_aggregates_same_price_level() {
        let book = OrderBook::new(Pair::new("BTC/USD"));
        let guard = book.lock();
        book.insert(&guard, order(1, Side::Buy, "100", "1"));
        book.insert(&guard, order(2, Side::Buy, "100", "2"));
        drop(guard);
        let levels = book.snapshot_side(Side::Buy);
        assert_eq!(levels.len(), 1);
        assert_eq!(levels[0].order_count, 2);
        assert_eq!(levels[0].total_amount.to_string(), "3");
    }
}
