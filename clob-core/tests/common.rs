use clob_core::prelude::*;

/// A registry configured with a single supported pair and zero fees,
/// ready for order-flow tests that don't care about fee accounting.
pub fn test_registry() -> BookRegistry {
    let mut config = CoreConfig::default();
    config.supported_pairs.insert("BTC/USD".to_string());
    BookRegistry::new(config)
}

/// A registry with a non-zero taker fee, for fee-accounting tests.
pub fn test_registry_with_taker_fee(rate: &str) -> BookRegistry {
    let mut config = CoreConfig::default();
    config.supported_pairs.insert("BTC/USD".to_string());
    config.taker_fee_rate = Amount::parse(rate).unwrap();
    BookRegistry::new(config)
}

pub fn amount(raw: &str) -> Amount {
    Amount::parse(raw).unwrap()
}

pub fn limit(user_id: UserId, side: Side, price: &str, qty: &str) -> NewOrder {
    NewOrder {
        user_id,
        pair: Pair::new("BTC/USD"),
        side,
        order_type: OrderType::Limit,
        price: Some(amount(price)),
        amount: amount(qty),
        chain_id: 1,
        nonce: Vec::new(),
        signature: Vec::new(),
    }
}

pub fn market(user_id: UserId, side: Side, qty: &str) -> NewOrder {
    NewOrder {
        user_id,
        pair: Pair::new("BTC/USD"),
        side,
        order_type: OrderType::Market,
        price: None,
        amount: amount(qty),
        chain_id: 1,
        nonce: Vec::new(),
        signature: Vec::new(),
    }
}
