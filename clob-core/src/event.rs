//! Typed event bus. Replaces the callback-trait style a caller would
//! otherwise have to implement per sink: subscribers get a receiving end of
//! a bounded channel and read events off it at their own pace.

use crate::types::{CancelReason, OrderId, OrderView, Pair, PriceLevel, Trade};
use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use std::sync::Mutex;
use tracing::warn;

/// Default capacity of a subscriber's event channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Everything the core publishes about order and book state changes.
///
/// Every submit publishes `OrderAdded` for the incoming order first, before
/// matching is attempted. Exactly one `TradeExecuted` is emitted per match
/// (see `crate::matching` for why the data model carries a single trade,
/// not a maker/taker pair) followed by an `OrderUpdated` for the maker it
/// touched. A closing `OrderBookUpdated` is published once after the whole
/// walk completes — never one per match — whenever the walk changed book
/// state (a match happened, a self-trade was prevented, or the taker now
/// rests).
#[derive(Clone, Debug)]
pub enum Event {
    OrderAdded(OrderView),
    OrderCancelled(OrderView, CancelReason),
    /// An external expiry sweep removed this order. Distinct from
    /// `OrderCancelled`: expiry carries no `CancelReason`, it is its own
    /// terminal state (see `crate::registry::BookRegistry::expire`).
    OrderExpired(OrderView),
    OrderUpdated(OrderView),
    TradeExecuted(Trade),
    /// The full bid/ask level array after a mutation, not a partial delta —
    /// per §4.3, a subscriber never has to reconstruct book state from a
    /// sequence of small diffs.
    OrderBookUpdated {
        pair: Pair,
        bids: Vec<PriceLevel>,
        asks: Vec<PriceLevel>,
        last_update: u64,
    },
    /// Same shape as `OrderBookUpdated`, emitted on demand (typically right
    /// after a subscriber registers) rather than in response to a mutation.
    OrderBookSnapshot {
        pair: Pair,
        bids: Vec<PriceLevel>,
        asks: Vec<PriceLevel>,
        last_update: u64,
    },
}

/// Recorded when a subscriber's queue saturated and it was dropped from
/// the bus, per §5's backpressure policy.
#[derive(Debug)]
pub struct SubscriberLagged {
    pub subscriber: SubscriberId,
}

pub type SubscriberId = u64;

struct Subscriber {
    id: SubscriberId,
    sender: Sender<Event>,
}

/// Fans published events out to every live subscriber. Each subscriber owns
/// a bounded channel; a subscriber that cannot keep up is dropped from the
/// bus entirely rather than stalling every other subscriber or the
/// publishing matching walk. The drop is surfaced, via `tracing::warn!`, as
/// operational telemetry rather than a domain event.
pub struct EventBus {
    subscribers: Mutex<Vec<Subscriber>>,
    next_id: std::sync::atomic::AtomicU64,
    capacity: usize,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        EventBus {
            subscribers: Mutex::new(Vec::new()),
            next_id: std::sync::atomic::AtomicU64::new(1),
            capacity,
        }
    }

    /// Registers a new subscriber and returns its receiving end.
    pub fn subscribe(&self) -> (SubscriberId, Receiver<Event>) {
        let id = self
            .next_id
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let (sender, receiver) = channel::bounded(self.capacity);
        self.subscribers.lock().unwrap().push(Subscriber { id, sender });
        (id, receiver)
    }

    pub fn unsubscribe(&self, id: SubscriberId) {
        self.subscribers.lock().unwrap().retain(|s| s.id != id);
    }

    /// Publishes one event to every current subscriber. Never blocks: a
    /// subscriber whose channel is full is dropped from the bus entirely
    /// (per §5's backpressure policy), not merely skipped for this one
    /// event — every other subscriber still receives the event that
    /// triggered the drop.
    pub fn publish(&self, event: Event) {
        let mut subscribers = self.subscribers.lock().unwrap();
        let mut lagging = Vec::new();
        for subscriber in subscribers.iter() {
            if let Err(TrySendError::Full(_)) = subscriber.sender.try_send(event.clone()) {
                lagging.push(SubscriberLagged { subscriber: subscriber.id });
            }
        }
        if !lagging.is_empty() {
            subscribers.retain(|s| !lagging.iter().any(|l| l.subscriber == s.id));
            for lag in &lagging {
                warn!(subscriber = lag.subscriber, "dropped lagging subscriber from event bus");
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        EventBus::new(DEFAULT_CHANNEL_CAPACITY)
    }
}
