//! Core configuration: fee rates, the supported-pairs allow-list, and the
//! event bus capacity. Read once at [`crate::registry::BookRegistry`]
//! construction; there is no runtime reload.

use crate::decimal::{self, Amount};
use crate::error::InvalidOrderReason;
use crate::event::DEFAULT_CHANNEL_CAPACITY;
use crate::types::Pair;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;

/// Configuration for one [`crate::registry::BookRegistry`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Fee rate charged to the taker on every match, as a fraction (e.g.
    /// `0.001` for 10 bps).
    pub taker_fee_rate: Amount,
    /// Fee rate a downstream settlement consumer should charge the maker.
    /// Not applied by the core itself; see `crate::matching` for why only
    /// one fee is carried on the `Trade` event.
    pub maker_fee_rate: Amount,
    /// Fee rate a downstream on-chain settlement consumer applies when it
    /// batches trades for submission. Never read by the core's own
    /// matching path; carried here purely so one config value answers
    /// every fee question a transport layer might have.
    #[serde(default)]
    pub settlement_fee_rate: Amount,
    /// Pairs the registry will accept orders for. An order for any other
    /// pair is rejected with `InvalidOrderReason::BadPair` before it ever
    /// reaches a book.
    pub supported_pairs: HashSet<String>,
    /// Capacity of each subscriber's event channel.
    #[serde(default = "default_channel_capacity")]
    pub event_channel_capacity: usize,
    /// Fractional digits every `Amount` is normalized to. Fixed at
    /// [`decimal::PRECISION`]; present for auditability in serialized
    /// config, not for runtime tuning — the core does not honor any other
    /// value here.
    #[serde(default = "default_decimal_precision")]
    pub decimal_precision: u32,
}

fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

fn default_decimal_precision() -> u32 {
    decimal::PRECISION
}

impl CoreConfig {
    /// An empty allow-list means "accept any well-formed pair" — the default
    /// used by tests and benches. A non-empty allow-list restricts `submit`
    /// to exactly the pairs it names.
    pub fn is_supported(&self, pair: &Pair) -> bool {
        self.supported_pairs.is_empty() || self.supported_pairs.contains(pair.as_str())
    }

    /// Builds a config from environment variables:
    /// `CLOB_TAKER_FEE_RATE`, `CLOB_MAKER_FEE_RATE`, `CLOB_SETTLEMENT_FEE_RATE`
    /// (decimal strings, default `"0"`), `CLOB_SUPPORTED_PAIRS`
    /// (comma-separated, required), and `CLOB_EVENT_CHANNEL_CAPACITY`
    /// (default [`DEFAULT_CHANNEL_CAPACITY`]).
    pub fn from_env() -> Result<Self, InvalidOrderReason> {
        let rate_var = |name: &str| -> Result<Amount, InvalidOrderReason> {
            match env::var(name) {
                Ok(raw) => Amount::parse(&raw),
                Err(_) => Ok(Amount::ZERO),
            }
        };
        let taker_fee_rate = rate_var("CLOB_TAKER_FEE_RATE")?;
        let maker_fee_rate = rate_var("CLOB_MAKER_FEE_RATE")?;
        let settlement_fee_rate = rate_var("CLOB_SETTLEMENT_FEE_RATE")?;
        let supported_pairs = env::var("CLOB_SUPPORTED_PAIRS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        let event_channel_capacity = env::var("CLOB_EVENT_CHANNEL_CAPACITY")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_else(default_channel_capacity);

        Ok(CoreConfig {
            taker_fee_rate,
            maker_fee_rate,
            settlement_fee_rate,
            supported_pairs,
            event_channel_capacity,
            decimal_precision: decimal::PRECISION,
        })
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        CoreConfig {
            taker_fee_rate: Amount::ZERO,
            maker_fee_rate: Amount::ZERO,
            settlement_fee_rate: Amount::ZERO,
            supported_pairs: HashSet::new(),
            event_channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            decimal_precision: decimal::PRECISION,
        }
    }
}
