//! Central-limit order book matching core.
//!
//! The crate is organized around the four cooperating parts of the engine:
//! the [`decimal`] Numeric Kernel, the order/trade [`types`], the per-pair
//! [`book`] and its [`matching`] walk, the [`event`] bus, and the
//! [`registry`] that routes operations to the right book.

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

pub mod book;
pub mod config;
pub mod decimal;
pub mod error;
pub mod event;
pub mod matching;
pub mod registry;
pub mod types;

pub mod prelude {
    pub use super::book::*;
    pub use super::config::*;
    pub use super::decimal::*;
    pub use super::error::*;
    pub use super::event::*;
    pub use super::matching::*;
    pub use super::registry::*;
    pub use super::types::*;
}
