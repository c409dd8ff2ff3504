//! The price-time-priority matching walk: given an incoming taker order and
//! the book it is being submitted into, finds and fills against resting
//! makers on the opposite side, best price first.

use crate::book::{BookWriteGuard, OrderBook};
use crate::decimal::Amount;
use crate::types::{Order, Side, Trade, TradeId};
use crossbeam::epoch;
use std::sync::Arc;

/// One thing that happened while walking the book, in the exact order the
/// walk produced it. `crate::registry::BookRegistry::submit` replays this
/// list to publish events in true walk order, rather than batched by kind.
pub enum WalkStep {
    /// One match: the maker it filled against, alongside the trade it
    /// produced.
    Matched { trade: Trade, maker: Arc<Order> },
}

/// Everything that happened while walking the book for one incoming order.
/// The caller (`crate::registry::BookRegistry`) turns this into the ordered
/// sequence of events the rest of the crate's documentation describes.
pub struct MatchOutcome {
    pub trades: Vec<Trade>,
    /// Resting makers touched by at least one fill, in the order they were
    /// matched.
    pub maker_fills: Vec<Arc<Order>>,
    /// Resting orders sharing the taker's owner that the walk skipped over
    /// rather than matched against. Self-trade prevention does not cancel
    /// or otherwise touch these orders — they are left exactly as they were,
    /// still resting at their original price and priority; the walk simply
    /// continues past them to the next candidate.
    pub self_trades_skipped: Vec<Arc<Order>>,
    /// `trades`/`maker_fills`, in the exact order the walk produced them.
    /// Self-trade skips are not events and so are not part of this list.
    pub steps: Vec<WalkStep>,
}

impl MatchOutcome {
    fn empty() -> Self {
        MatchOutcome {
            trades: Vec::new(),
            maker_fills: Vec::new(),
            self_trades_skipped: Vec::new(),
            steps: Vec::new(),
        }
    }
}

/// Walks `book`'s opposite side against `taker`, filling both in place.
///
/// `taker`'s own `remaining`/`status` are mutated by this walk the same way
/// a maker's are; the caller is responsible for inserting the taker into
/// its resting side afterward if (and only if) it is a `Limit` order that
/// still has `remaining > 0`, since a `Market` order never rests regardless
/// of how much of it went unfilled.
pub fn walk(
    book: &OrderBook,
    guard: &BookWriteGuard<'_>,
    taker: &Arc<Order>,
    taker_fee_rate: Amount,
    mut next_trade_id: impl FnMut() -> TradeId,
) -> MatchOutcome {
    let opposite = taker.side.opposite();
    let limit_price = match taker.order_type {
        crate::types::OrderType::Limit => Some(taker.price),
        crate::types::OrderType::Market => None,
    };

    let mut outcome = MatchOutcome::empty();
    let epoch_guard = &epoch::pin();
    let opposite_book = match opposite {
        Side::Buy => book.bids(),
        Side::Sell => book.asks(),
    };

    let mut entry = opposite_book.front(epoch_guard);
    while let Some(e) = entry {
        if taker.remaining().is_zero() {
            break;
        }

        let maker = e.value().clone();

        if let Some(limit) = limit_price {
            let crosses = match opposite {
                Side::Buy => maker.price >= limit,
                Side::Sell => maker.price <= limit,
            };
            if !crosses {
                break;
            }
        }

        if maker.user_id == taker.user_id {
            // Left in place: self-trade prevention skips this candidate
            // without touching it, and the walk continues to the next one.
            outcome.self_trades_skipped.push(maker);
            entry = e.next();
            continue;
        }

        let match_amount = taker.remaining().min(maker.remaining());
        if match_amount.is_zero() {
            break;
        }

        let trade_price = maker.price;
        let fee = match_amount.mul(taker_fee_rate);

        maker.apply_fill(match_amount);
        taker.apply_fill(match_amount);

        let (maker_order_id, taker_order_id) = (maker.id, taker.id);
        let trade = Trade {
            id: next_trade_id(),
            pair: book.pair().clone(),
            maker_order_id,
            taker_order_id,
            side: taker.side,
            price: trade_price,
            amount: match_amount,
            fee,
            created_at: book.next_priority(),
            chain_id: taker.chain_id,
        };
        outcome.trades.push(trade.clone());
        outcome.maker_fills.push(maker.clone());
        outcome.steps.push(WalkStep::Matched { trade, maker: maker.clone() });

        if maker.remaining().is_zero() {
            if e.remove() {
                book.forget(guard, maker.id);
            }
        }
        entry = e.next();
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Amount;
    use crate::types::{NewOrder, OrderType, Pair};

    fn limit_order(id: u64, side: Side, user: u64, price: &str, amount: &str) -> Arc<Order> {
        let req = NewOrder {
            user_id: user,
            pair: Pair::new("BTC/USD"),
            side,
            order_type: OrderType::Limit,
            price: Some(Amount::parse(price).unwrap()),
            amount: Amount::parse(amount).unwrap(),
            chain_id: 1,
            nonce: Vec::new(),
            signature: Vec::new(),
        };
        Arc::new(Order::new(id, id, id, &req))
    }

    fn market_order(id: u64, side: Side, user: u64, amount: &str) -> Arc<Order> {
        let req = NewOrder {
            user_id: user,
            pair: Pair::new("BTC/USD"),
            side,
            order_type: OrderType::Market,
            price: None,
            amount: Amount::parse(amount).unwrap(),
            chain_id: 1,
            nonce: Vec::new(),
            signature: Vec::new(),
        };
        Arc::new(Order::new(id, id, id, &req))
    }

    #[test]
    fn crossing_limit_orders_trade_at_maker_price() {
        let book = OrderBook::new(Pair::new("BTC/USD"));
        let guard = book.lock();
        let maker = limit_order(1, Side::Sell, 10, "100", "5");
        book.insert(&guard, maker);

        let taker = limit_order(2, Side::Buy, 20, "101", "3");
        let outcome = walk(&book, &guard, &taker, Amount::ZERO, {
            let mut next = 0u64;
            move || {
                next += 1;
                next
            }
        });

        assert_eq!(outcome.trades.len(), 1);
        assert_eq!(outcome.trades[0].price.to_string(), "100");
        assert_eq!(outcome.trades[0].amount.to_string(), "3");
        assert!(taker.remaining().is_zero());
    }

    #[test]
    fn non_crossing_limit_order_does_not_match() {
        let book = OrderBook::new(Pair::new("BTC/USD"));
        let guard = book.lock();
        book.insert(&guard, limit_order(1, Side::Sell, 10, "100", "5"));

        let taker = limit_order(2, Side::Buy, 20, "99", "3");
        let outcome = walk(&book, &guard, &taker, Amount::ZERO, {
            let mut next = 0u64;
            move || {
                next += 1;
                next
            }
        });
        assert!(outcome.trades.is_empty());
        assert_eq!(taker.remaining().to_string(), "3");
    }

    #[test]
    fn self_trade_skips_resting_order_and_leaves_it_in_place() {
        let book = OrderBook::new(Pair::new("BTC/USD"));
        let guard = book.lock();
        book.insert(&guard, limit_order(1, Side::Sell, 42, "100", "5"));

        let taker = limit_order(2, Side::Buy, 42, "100", "3");
        let outcome = walk(&book, &guard, &taker, Amount::ZERO, {
            let mut next = 0u64;
            move || {
                next += 1;
                next
            }
        });
        assert!(outcome.trades.is_empty());
        assert_eq!(outcome.self_trades_skipped.len(), 1);
        assert_eq!(taker.remaining().to_string(), "3");

        let resting = book.get(1).unwrap();
        assert!(resting.is_resting(), "self-trade prevention must not cancel the resting order");
        assert_eq!(resting.remaining().to_string(), "5");
    }

    #[test]
    fn self_trade_skip_lets_the_walk_continue_to_the_next_candidate() {
        let book = OrderBook::new(Pair::new("BTC/USD"));
        let guard = book.lock();
        book.insert(&guard, limit_order(1, Side::Sell, 42, "100", "5"));
        book.insert(&guard, limit_order(2, Side::Sell, 7, "100", "4"));

        let taker = limit_order(3, Side::Buy, 42, "100", "4");
        let outcome = walk(&book, &guard, &taker, Amount::ZERO, {
            let mut next = 0u64;
            move || {
                next += 1;
                next
            }
        });
        assert_eq!(outcome.self_trades_skipped.len(), 1);
        assert_eq!(outcome.trades.len(), 1);
        assert_eq!(outcome.trades[0].maker_order_id, 2);
        assert!(taker.remaining().is_zero());
        assert!(book.get(1).unwrap().is_resting(), "order 1 was only skipped, not consumed");
    }

    #[test]
    fn market_order_matches_without_a_limit_price() {
        let book = OrderBook::new(Pair::new("BTC/USD"));
        let guard = book.lock();
        book.insert(&guard, limit_order(1, Side::Sell, 10, "100", "2"));
        book.insert(&guard, limit_order(2, Side::Sell, 10, "101", "5"));

        let taker = market_order(3, Side::Buy, 20, "4");
        let outcome = walk(&book, &guard, &taker, Amount::ZERO, {
            let mut next = 0u64;
            move || {
                next += 1;
                next
            }
        });
        assert_eq!(outcome.trades.len(), 2);
        assert!(taker.remaining().is_zero());
    }
}
