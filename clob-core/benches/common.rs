use clob_core::prelude::*;

/// Builds a single supported pair with no fees, ready for throughput
/// benchmarks that don't care about fee accounting.
pub fn bench_registry() -> BookRegistry {
    let mut config = CoreConfig::default();
    config.supported_pairs.insert("BTC/USD".to_string());
    BookRegistry::new(config)
}

/// Quickly assembles a limit order request for a given integer price/qty,
/// avoiding decimal-string parsing in the hot loop.
pub fn make_limit_order(user_id: UserId, side: Side, price: u64, qty: u64) -> NewOrder {
    NewOrder {
        user_id,
        pair: Pair::new("BTC/USD"),
        side,
        order_type: OrderType::Limit,
        price: Some(Amount::parse(&price.to_string()).unwrap()),
        amount: Amount::parse(&qty.to_string()).unwrap(),
        chain_id: 1,
        nonce: Vec::new(),
        signature: Vec::new(),
    }
}

/// Quickly assembles a market order request.
pub fn make_market_order(user_id: UserId, side: Side, qty: u64) -> NewOrder {
    NewOrder {
        user_id,
        pair: Pair::new("BTC/USD"),
        side,
        order_type: OrderType::Market,
        price: None,
        amount: Amount::parse(&qty.to_string()).unwrap(),
        chain_id: 1,
        nonce: Vec::new(),
        signature: Vec::new(),
    }
}
