//! Async REST client for the FTX exchange trading API.
//!
//! Requests are HMAC-SHA256 signed, paced by a 50 ms throttle floor, and
//! unwrapped from the exchange's `success`/`error`/`result` envelope.
//! [`FtxClient::get_all_trades`] pages backward through the rate-limited
//! trades listing to return a complete, deduplicated history window.

pub mod client;
pub mod credentials;
pub mod error;
pub mod history;
pub mod signer;
pub mod throttle;
pub mod types;

pub use client::{DEFAULT_BASE_URL, FtxClient};
pub use credentials::Credentials;
pub use error::ApiError;
pub use history::{PAGE_LIMIT, TradeSource, fetch_all_trades};
pub use signer::Signer;
pub use throttle::Throttle;
pub use types::{
    Balance, Candle, DepositAddress, Fill, ModifyOrderRequest, ModifyTriggerOrderRequest, Order,
    PlaceOrderRequest, PlaceTriggerOrderRequest, Position, Trade, TriggerOrderType,
};
